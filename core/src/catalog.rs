use pkauth_protocol::ActionId;
use pkauth_protocol::ActionMetadata;

use crate::authority::Authority;
use crate::error::Result;
use crate::service::with_deadline;

impl Authority {
    /// Every action the service currently knows, in the service's order.
    pub async fn list_actions(&self) -> Result<Vec<ActionId>> {
        let actions = with_deadline(self.timeout, self.service.enumerate_actions()).await?;
        tracing::debug!("service lists {} actions", actions.len());
        Ok(actions)
    }

    /// Fresh metadata for `action_id`; never served from a cache.
    pub async fn describe_action(&self, action_id: &ActionId) -> Result<ActionMetadata> {
        with_deadline(self.timeout, self.service.describe_action(action_id)).await
    }
}
