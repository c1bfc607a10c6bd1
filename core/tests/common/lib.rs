//! An in-process authority bridge for integration tests.
//!
//! [`FakeBridge`] listens on a Unix socket inside a temporary directory,
//! answers each request with whatever its handler returns and records every
//! call it receives.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use pkauth_protocol::wire::AuthorityCall;
use pkauth_protocol::wire::AuthorityRequest;
use pkauth_protocol::wire::AuthorityResponse;
use pkauth_protocol::wire::InteractiveReply;
use pkauth_protocol::wire::ServiceErrorCode;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// What the bridge does with one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error(ServiceErrorCode, String),
    /// Never answers; the connection stays open.
    Hang,
    /// Closes the connection without writing anything.
    Close,
    /// Answers with `result` under a freshly generated id.
    WrongId(Value),
}

type Handler = dyn Fn(&AuthorityCall) -> Reply + Send + Sync;

pub struct FakeBridge {
    _dir: TempDir,
    socket_path: PathBuf,
    calls: Arc<Mutex<Vec<AuthorityCall>>>,
    accept_loop: JoinHandle<()>,
}

impl FakeBridge {
    /// Binds the socket and starts serving. Must be called from within a
    /// tokio runtime.
    pub fn start<F>(handler: F) -> anyhow::Result<Self>
    where
        F: Fn(&AuthorityCall) -> Reply + Send + Sync + 'static,
    {
        let dir = tempfile::tempdir()?;
        let socket_path = dir.path().join("authority.sock");
        let listener = UnixListener::bind(&socket_path)?;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let accept_loop = tokio::spawn({
            let calls = Arc::clone(&calls);
            async move {
                loop {
                    let stream = match listener.accept().await {
                        Ok((stream, _)) => stream,
                        Err(err) => {
                            tracing::warn!("fake bridge accept failed: {err}");
                            return;
                        }
                    };
                    let calls = Arc::clone(&calls);
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(err) = serve(stream, &calls, handler.as_ref()).await {
                            tracing::warn!("fake bridge connection failed: {err}");
                        }
                    });
                }
            }
        });

        Ok(Self {
            _dir: dir,
            socket_path,
            calls,
            accept_loop,
        })
    }

    /// Serves `script` for every call.
    pub fn scripted(script: Script) -> anyhow::Result<Self> {
        Self::start(move |call| script.reply(call))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn calls(&self) -> Vec<AuthorityCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }
}

impl Drop for FakeBridge {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn serve(
    stream: UnixStream,
    calls: &Mutex<Vec<AuthorityCall>>,
    handler: &Handler,
) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut line = String::new();
    BufReader::new(read_half).read_line(&mut line).await?;
    let request: AuthorityRequest = serde_json::from_str(&line)?;

    if let Ok(mut calls) = calls.lock() {
        calls.push(request.call.clone());
    }

    let response = match handler(&request.call) {
        Reply::Result(result) => AuthorityResponse::success(request.id, result),
        Reply::Error(code, message) => AuthorityResponse::failure(request.id, code, message),
        Reply::Hang => {
            std::future::pending::<()>().await;
            return Ok(());
        }
        Reply::Close => return Ok(()),
        Reply::WrongId(result) => {
            AuthorityResponse::success(AuthorityRequest::new(request.call).id, result)
        }
    };

    let mut encoded = serde_json::to_vec(&response)?;
    encoded.push(b'\n');
    write_half.write_all(&encoded).await?;
    write_half.flush().await?;
    Ok(())
}

/// A small policy: a fixed catalog, a set of already granted actions and a
/// canned agent answer.
#[derive(Debug, Clone)]
pub struct Script {
    pub actions: Vec<String>,
    pub granted: Vec<String>,
    pub interactive: InteractiveReply,
}

impl Script {
    pub fn new(actions: &[&str]) -> Self {
        Self {
            actions: actions.iter().map(ToString::to_string).collect(),
            granted: Vec::new(),
            interactive: InteractiveReply::AgentUnreachable,
        }
    }

    pub fn granting(mut self, granted: &[&str]) -> Self {
        self.granted = granted.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_interactive(mut self, interactive: InteractiveReply) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn reply(&self, call: &AuthorityCall) -> Reply {
        match call {
            AuthorityCall::EnumerateActions => Reply::Result(json!(self.actions)),
            AuthorityCall::DescribeAction { action_id } => {
                if self.knows(action_id.as_str()) {
                    Reply::Result(json!({
                        "description": format!("Run {action_id}"),
                        "message": "Authentication is required",
                        "vendor": "Example",
                        "vendor_url": "https://example.org",
                        "icon_name": "system-run",
                        "annotations": {"org.example.exec.path": "/usr/bin/true"},
                    }))
                } else {
                    Reply::Error(
                        ServiceErrorCode::UnknownAction,
                        format!("no action `{action_id}`"),
                    )
                }
            }
            AuthorityCall::CheckAuthorizations { action_ids, .. } => {
                let bitmask = action_ids
                    .iter()
                    .enumerate()
                    .filter(|(_, action_id)| self.granted.iter().any(|g| g == action_id.as_str()))
                    .fold(0u64, |mask, (index, _)| mask | (1 << index));
                Reply::Result(json!({ "bitmask": bitmask }))
            }
            AuthorityCall::RequestInteractiveAuthorization { action_id, .. } => {
                if self.knows(action_id.as_str()) {
                    Reply::Result(json!(self.interactive))
                } else {
                    Reply::Error(
                        ServiceErrorCode::UnknownAction,
                        format!("no action `{action_id}`"),
                    )
                }
            }
        }
    }

    fn knows(&self, action_id: &str) -> bool {
        self.actions.iter().any(|known| known == action_id)
    }
}
