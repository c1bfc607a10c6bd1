use std::time::Duration;

use pkauth_protocol::ActionId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthorityError>;

/// Everything that can keep an action from being authorized.
///
/// Callers must treat every variant as "not authorized".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("no such process: {pid}")]
    NoSuchProcess { pid: u32 },

    #[error("unknown action `{0}`")]
    UnknownAction(ActionId),

    #[error("authorization service unavailable: {0}")]
    ServiceUnavailable(#[from] Unavailable),

    #[error("authorization service rejected the subject identity: {message}")]
    IdentityRejected { message: String },

    #[error("authentication agent reported {code}: {message}")]
    AgentDenied { code: String, message: String },

    #[error("no authentication agent is reachable and the session is not attended")]
    NoAgentAvailable,

    #[error("local authentication helper exited with status {exit_code}")]
    HelperFailed { exit_code: i32 },

    #[error("local authentication helper could not be started: {message}")]
    HelperUnavailable { message: String },

    #[error("cannot check {requested} actions in one request (limit is {max})")]
    TooManyActions { requested: usize, max: usize },

    #[error("authorization request was cancelled")]
    Cancelled,
}

/// Why the authorization service could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service failure: {0}")]
    Service(String),
}

impl AuthorityError {
    /// Stable, machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthorityError::NoSuchProcess { .. } => "no_such_process",
            AuthorityError::UnknownAction(_) => "unknown_action",
            AuthorityError::ServiceUnavailable(Unavailable::Timeout(_)) => "timeout",
            AuthorityError::ServiceUnavailable(_) => "service_unavailable",
            AuthorityError::IdentityRejected { .. } => "identity_rejected",
            AuthorityError::AgentDenied { .. } => "agent_denied",
            AuthorityError::NoAgentAvailable => "no_agent_available",
            AuthorityError::HelperFailed { .. } => "helper_failed",
            AuthorityError::HelperUnavailable { .. } => "helper_unavailable",
            AuthorityError::TooManyActions { .. } => "too_many_actions",
            AuthorityError::Cancelled => "cancelled",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AuthorityError::ServiceUnavailable(Unavailable::Timeout(_))
        )
    }

    pub(crate) fn timeout(limit: Duration) -> Self {
        AuthorityError::ServiceUnavailable(Unavailable::Timeout(limit))
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        AuthorityError::ServiceUnavailable(Unavailable::Transport(message.into()))
    }
}
