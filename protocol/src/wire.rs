//! Line-delimited JSON messages exchanged with the authority bridge.
//!
//! Each connection carries exactly one exchange:
//!
//! ```text
//! client                                   bridge
//!   o--{"id":..,"call":{"method":..}}\n---->o
//!   o<----{"id":..,"result":..}\n-----------o   (or "error")
//!   x                                       x
//! ```
//!
//! The bridge owns policy evaluation and agent brokering; these types only
//! describe what crosses the socket.

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::ActionId;
use crate::WindowToken;

/// Sent by the client, one per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRequest {
    pub id: Uuid,
    pub call: AuthorityCall,
}

impl AuthorityRequest {
    pub fn new(call: AuthorityCall) -> Self {
        Self {
            id: Uuid::new_v4(),
            call,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthorityCall {
    EnumerateActions,
    DescribeAction {
        action_id: ActionId,
    },
    /// Bit `i` of the reply refers to `action_ids[i]`.
    CheckAuthorizations {
        uid: u32,
        gid: u32,
        pid: u32,
        action_ids: Vec<ActionId>,
    },
    RequestInteractiveAuthorization {
        action_id: ActionId,
        window: WindowToken,
        pid: u32,
    },
}

impl AuthorityCall {
    pub fn method(&self) -> &'static str {
        match self {
            AuthorityCall::EnumerateActions => "enumerate_actions",
            AuthorityCall::DescribeAction { .. } => "describe_action",
            AuthorityCall::CheckAuthorizations { .. } => "check_authorizations",
            AuthorityCall::RequestInteractiveAuthorization { .. } => {
                "request_interactive_authorization"
            }
        }
    }
}

/// Sent by the bridge. Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityResponse {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

impl AuthorityResponse {
    pub fn success(id: Uuid, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Uuid, code: ServiceErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ServiceError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Splits the envelope. A response carrying neither field is reported as
    /// an `internal` service error.
    pub fn into_result(self) -> Result<serde_json::Value, ServiceError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ServiceError {
                code: ServiceErrorCode::Internal,
                message: "response carried neither result nor error".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub code: ServiceErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorCode {
    UnknownAction,
    IdentityRejected,
    InvalidRequest,
    #[serde(other)]
    Internal,
}

/// `result` payload of `check_authorizations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReply {
    pub bitmask: u64,
}

/// `result` payload of `request_interactive_authorization`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InteractiveReply {
    /// An agent showed the dialog and the user answered.
    Decided { granted: bool },
    /// An agent was reached but reported a failure of its own.
    Error { code: String, message: String },
    /// No authentication agent is registered for the caller's session.
    AgentUnreachable,
}
