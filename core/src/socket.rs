//! [`AuthorityService`] over a Unix domain socket speaking the line-delimited
//! JSON framing in [`pkauth_protocol::wire`].
//!
//! Every call opens its own connection, so a single `SocketAuthority` can be
//! shared freely between tasks.

use std::path::Path;
use std::path::PathBuf;

use pkauth_protocol::ActionId;
use pkauth_protocol::ActionMetadata;
use pkauth_protocol::ProcessIdentity;
use pkauth_protocol::WindowToken;
use pkauth_protocol::wire::AuthorityCall;
use pkauth_protocol::wire::AuthorityRequest;
use pkauth_protocol::wire::AuthorityResponse;
use pkauth_protocol::wire::CheckReply;
use pkauth_protocol::wire::InteractiveReply;
use pkauth_protocol::wire::ServiceError;
use pkauth_protocol::wire::ServiceErrorCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::UnixStream;

use crate::error::AuthorityError;
use crate::error::Result;
use crate::error::Unavailable;
use crate::service::AuthorityService;

/// Upper bound on a single response line.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SocketAuthority {
    socket_path: PathBuf,
}

impl SocketAuthority {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn call<T>(&self, call: AuthorityCall) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = AuthorityRequest::new(call);
        let method = request.call.method();
        tracing::debug!(id = %request.id, method, "sending authority request");

        let response = self.exchange(&request).await?;
        if response.id != request.id {
            return Err(AuthorityError::transport(format!(
                "response id {} does not match request id {}",
                response.id, request.id
            )));
        }
        let result = response
            .into_result()
            .map_err(|err| map_service_error(&request.call, err))?;
        serde_json::from_value(result).map_err(|err| {
            AuthorityError::transport(format!("malformed `{method}` result: {err}"))
        })
    }

    async fn exchange(&self, request: &AuthorityRequest) -> Result<AuthorityResponse> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|err| {
                AuthorityError::transport(format!(
                    "failed to connect to {}: {err}",
                    self.socket_path.display()
                ))
            })?;
        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_string(request)
            .map_err(|err| AuthorityError::transport(format!("failed to encode request: {err}")))?;
        line.push('\n');
        write_half
            .write_all(line.as_bytes())
            .await
            .map_err(|err| AuthorityError::transport(format!("failed to send request: {err}")))?;
        write_half
            .flush()
            .await
            .map_err(|err| AuthorityError::transport(format!("failed to send request: {err}")))?;

        let mut reader = BufReader::new(read_half.take(MAX_RESPONSE_BYTES));
        let mut buf = String::new();
        let read = reader
            .read_line(&mut buf)
            .await
            .map_err(|err| AuthorityError::transport(format!("failed to read response: {err}")))?;
        if read == 0 {
            return Err(AuthorityError::transport(
                "service closed the connection without replying",
            ));
        }
        if !buf.ends_with('\n') {
            return Err(AuthorityError::transport(
                "response was truncated or exceeded the size limit",
            ));
        }
        serde_json::from_str(&buf)
            .map_err(|err| AuthorityError::transport(format!("malformed response: {err}")))
    }
}

fn map_service_error(call: &AuthorityCall, err: ServiceError) -> AuthorityError {
    let ServiceError { code, message } = err;
    match (code, call) {
        (ServiceErrorCode::UnknownAction, AuthorityCall::DescribeAction { action_id })
        | (
            ServiceErrorCode::UnknownAction,
            AuthorityCall::RequestInteractiveAuthorization { action_id, .. },
        ) => AuthorityError::UnknownAction(action_id.clone()),
        (ServiceErrorCode::IdentityRejected, _) => AuthorityError::IdentityRejected { message },
        (code, call) => AuthorityError::ServiceUnavailable(Unavailable::Service(format!(
            "`{}` failed with {code:?}: {message}",
            call.method()
        ))),
    }
}

#[async_trait::async_trait]
impl AuthorityService for SocketAuthority {
    async fn enumerate_actions(&self) -> Result<Vec<ActionId>> {
        self.call(AuthorityCall::EnumerateActions).await
    }

    async fn describe_action(&self, action_id: &ActionId) -> Result<ActionMetadata> {
        self.call(AuthorityCall::DescribeAction {
            action_id: action_id.clone(),
        })
        .await
    }

    async fn check_authorizations(
        &self,
        identity: ProcessIdentity,
        action_ids: &[ActionId],
    ) -> Result<u64> {
        let reply: CheckReply = self
            .call(AuthorityCall::CheckAuthorizations {
                uid: identity.uid,
                gid: identity.gid,
                pid: identity.pid,
                action_ids: action_ids.to_vec(),
            })
            .await?;
        Ok(reply.bitmask)
    }

    async fn request_interactive_authorization(
        &self,
        action_id: &ActionId,
        window: WindowToken,
        pid: u32,
    ) -> Result<InteractiveReply> {
        self.call(AuthorityCall::RequestInteractiveAuthorization {
            action_id: action_id.clone(),
            window,
            pid,
        })
        .await
    }
}
