use pkauth_protocol::ActionId;
use pkauth_protocol::ProcessIdentity;
use pkauth_protocol::WindowToken;
use pkauth_protocol::wire::InteractiveReply;
use tokio_util::sync::CancellationToken;

use crate::authority::Authority;
use crate::error::AuthorityError;
use crate::error::Result;
use crate::identity::ProcessSelector;
use crate::service::with_deadline;

/// Terminal state of one escalation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    Granted,
    /// The user was asked and said no.
    Denied,
    /// No answer could be obtained. Never means "authorized".
    Failed(AuthorityError),
}

impl EscalationOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, EscalationOutcome::Granted)
    }

    pub fn error(&self) -> Option<&AuthorityError> {
        match self {
            EscalationOutcome::Failed(err) => Some(err),
            EscalationOutcome::Granted | EscalationOutcome::Denied => None,
        }
    }
}

impl Authority {
    /// Tries to get `action_id` authorized for `identity`.
    ///
    /// An already authorized action is granted without prompting. Otherwise
    /// the service is asked to run an agent dialog; if no agent is reachable
    /// and the session is attended, the local helper prompts on the terminal.
    /// Nothing is retried.
    pub async fn escalate(
        &self,
        action_id: &ActionId,
        window: WindowToken,
        identity: ProcessIdentity,
        cancel: &CancellationToken,
    ) -> EscalationOutcome {
        let outcome = match self.try_escalate(action_id, window, identity, cancel).await {
            Ok(outcome) => outcome,
            Err(err) => EscalationOutcome::Failed(err),
        };
        match &outcome {
            EscalationOutcome::Granted => tracing::info!("{action_id} granted to {identity}"),
            EscalationOutcome::Denied => tracing::info!("{action_id} denied to {identity}"),
            EscalationOutcome::Failed(err) => {
                tracing::info!("{action_id} not obtained for {identity}: {err}");
            }
        }
        outcome
    }

    /// Resolves `selector`, then [`Authority::escalate`]s for it.
    pub async fn obtain(
        &self,
        action_id: &ActionId,
        window: WindowToken,
        selector: ProcessSelector,
        cancel: &CancellationToken,
    ) -> EscalationOutcome {
        match selector.resolve() {
            Ok(identity) => self.escalate(action_id, window, identity, cancel).await,
            Err(err) => EscalationOutcome::Failed(err),
        }
    }

    async fn try_escalate(
        &self,
        action_id: &ActionId,
        window: WindowToken,
        identity: ProcessIdentity,
        cancel: &CancellationToken,
    ) -> Result<EscalationOutcome> {
        let action = std::slice::from_ref(action_id);
        let granted = tokio::select! {
            granted = self.check_batch(identity, action) => granted?,
            () = cancel.cancelled() => return Err(AuthorityError::Cancelled),
        };
        if granted.contains(action_id) {
            tracing::debug!("{action_id} already authorized for {identity}");
            return Ok(EscalationOutcome::Granted);
        }

        let reply = tokio::select! {
            reply = with_deadline(
                self.interactive_timeout,
                self.service
                    .request_interactive_authorization(action_id, window, identity.pid),
            ) => reply?,
            () = cancel.cancelled() => return Err(AuthorityError::Cancelled),
        };

        match reply {
            InteractiveReply::Decided { granted: true } => Ok(EscalationOutcome::Granted),
            InteractiveReply::Decided { granted: false } => Ok(EscalationOutcome::Denied),
            InteractiveReply::Error { code, message } => {
                Err(AuthorityError::AgentDenied { code, message })
            }
            InteractiveReply::AgentUnreachable => {
                if !self.attendance.is_attended() {
                    return Err(AuthorityError::NoAgentAvailable);
                }
                tracing::debug!("no agent for {identity}; falling back to the local helper");
                let exit_code = self
                    .helper
                    .run(action_id, identity.pid, self.interactive_timeout, cancel)
                    .await?;
                match exit_code {
                    0 => Ok(EscalationOutcome::Granted),
                    exit_code => Err(AuthorityError::HelperFailed { exit_code }),
                }
            }
        }
    }
}
