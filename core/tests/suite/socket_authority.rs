#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use core_test_support::FakeBridge;
use core_test_support::Reply;
use core_test_support::Script;
use pkauth_core::ActionId;
use pkauth_core::Authority;
use pkauth_core::AuthorityError;
use pkauth_core::AuthorityService;
use pkauth_core::ProcessHelper;
use pkauth_core::ProcessIdentity;
use pkauth_core::SocketAuthority;
use pkauth_core::Unavailable;
use pkauth_protocol::wire::AuthorityCall;
use pkauth_protocol::wire::ServiceErrorCode;
use pretty_assertions::assert_eq;
use serde_json::json;

const MOUNT: &str = "org.example.mount";
const REBOOT: &str = "org.example.reboot";

fn action(raw: &str) -> ActionId {
    ActionId::new(raw).expect("valid action id")
}

fn subject() -> ProcessIdentity {
    ProcessIdentity {
        pid: 4242,
        uid: 1000,
        gid: 100,
    }
}

fn authority_for(bridge: &FakeBridge) -> Authority {
    Authority::new(
        Arc::new(SocketAuthority::new(bridge.socket_path())),
        Arc::new(ProcessHelper::new("/bin/false")),
    )
}

#[tokio::test]
async fn catalog_round_trips() -> Result<()> {
    let bridge = FakeBridge::scripted(Script::new(&[MOUNT, REBOOT]))?;
    let authority = authority_for(&bridge);

    assert_eq!(authority.list_actions().await?, vec![action(MOUNT), action(REBOOT)]);

    let metadata = authority.describe_action(&action(REBOOT)).await?;
    assert_eq!(metadata.description, "Run org.example.reboot");
    assert_eq!(metadata.vendor_url, "https://example.org");
    assert_eq!(
        metadata.annotation("org.example.exec.path"),
        Some("/usr/bin/true")
    );

    assert_eq!(
        authority.describe_action(&action("org.example.format")).await,
        Err(AuthorityError::UnknownAction(action("org.example.format")))
    );
    Ok(())
}

#[tokio::test]
async fn batch_check_is_one_call_decoded_by_position() -> Result<()> {
    let bridge = FakeBridge::scripted(Script::new(&[MOUNT, REBOOT]).granting(&[REBOOT]))?;
    let authority = authority_for(&bridge);
    let requested = vec![action(MOUNT), action(REBOOT), action(MOUNT)];

    let granted = authority.check_batch(subject(), &requested).await?;

    assert_eq!(granted, HashSet::from([action(REBOOT)]));
    assert_eq!(
        bridge.calls(),
        vec![AuthorityCall::CheckAuthorizations {
            uid: 1000,
            gid: 100,
            pid: 4242,
            action_ids: requested,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn empty_batch_never_connects() -> Result<()> {
    let bridge = FakeBridge::scripted(Script::new(&[MOUNT]))?;

    let granted = authority_for(&bridge).check_batch(subject(), &[]).await?;

    assert!(granted.is_empty());
    assert_eq!(bridge.calls(), Vec::new());
    Ok(())
}

#[tokio::test]
async fn rejected_identity_is_surfaced() -> Result<()> {
    let bridge = FakeBridge::start(|_| {
        Reply::Error(ServiceErrorCode::IdentityRejected, "pid 4242 is gone".to_string())
    })?;

    let result = authority_for(&bridge)
        .check_batch(subject(), &[action(MOUNT)])
        .await;

    assert_eq!(
        result,
        Err(AuthorityError::IdentityRejected {
            message: "pid 4242 is gone".to_string()
        })
    );
    Ok(())
}

#[tokio::test]
async fn internal_error_is_service_unavailable() -> Result<()> {
    let bridge = FakeBridge::start(|_| Reply::Error(ServiceErrorCode::Internal, "boom".to_string()))?;

    let err = authority_for(&bridge)
        .list_actions()
        .await
        .expect_err("service error");

    assert!(matches!(
        err,
        AuthorityError::ServiceUnavailable(Unavailable::Service(_))
    ));
    assert_eq!(err.code(), "service_unavailable");
    Ok(())
}

#[tokio::test]
async fn mismatched_response_id_is_a_transport_error() -> Result<()> {
    let bridge = FakeBridge::start(|_| Reply::WrongId(json!({ "bitmask": 1 })))?;

    let err = authority_for(&bridge)
        .check_batch(subject(), &[action(MOUNT)])
        .await
        .expect_err("id mismatch");

    assert!(matches!(
        err,
        AuthorityError::ServiceUnavailable(Unavailable::Transport(_))
    ));
    Ok(())
}

#[tokio::test]
async fn closed_connection_is_a_transport_error() -> Result<()> {
    let bridge = FakeBridge::start(|_| Reply::Close)?;

    let err = authority_for(&bridge)
        .list_actions()
        .await
        .expect_err("no reply");

    assert!(matches!(
        err,
        AuthorityError::ServiceUnavailable(Unavailable::Transport(_))
    ));
    Ok(())
}

#[tokio::test]
async fn silent_service_times_out() -> Result<()> {
    let bridge = FakeBridge::start(|_| Reply::Hang)?;
    let authority = authority_for(&bridge).with_timeout(Duration::from_millis(100));

    let err = authority
        .check_batch(subject(), &[action(MOUNT)])
        .await
        .expect_err("deadline");

    assert!(err.is_timeout());
    assert_eq!(err.code(), "timeout");
    Ok(())
}

#[tokio::test]
async fn missing_socket_is_unavailable() {
    let service = SocketAuthority::new("/nonexistent/pkauth/authority.sock");

    let err = service
        .enumerate_actions()
        .await
        .expect_err("nothing listens there");

    assert_eq!(err.code(), "service_unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_use_separate_connections() -> Result<()> {
    let bridge = FakeBridge::scripted(Script::new(&[MOUNT, REBOOT]).granting(&[MOUNT]))?;
    let authority = authority_for(&bridge);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let authority = authority.clone();
        tasks.push(tokio::spawn(async move {
            authority
                .check_batch(subject(), &[action(MOUNT), action(REBOOT)])
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await??, HashSet::from([action(MOUNT)]));
    }

    assert_eq!(bridge.calls_to("check_authorizations"), 16);
    Ok(())
}
