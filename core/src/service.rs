use std::future::Future;
use std::time::Duration;

use pkauth_protocol::ActionId;
use pkauth_protocol::ActionMetadata;
use pkauth_protocol::ProcessIdentity;
use pkauth_protocol::WindowToken;
use pkauth_protocol::wire::InteractiveReply;

use crate::error::AuthorityError;
use crate::error::Result;

/// The external authorization service: the sole source of truth for which
/// actions exist and who may perform them.
///
/// Implementations must not cache. Every call reflects the service's state at
/// the time it is answered, since grants can be revoked at any moment.
#[async_trait::async_trait]
pub trait AuthorityService: Send + Sync {
    async fn enumerate_actions(&self) -> Result<Vec<ActionId>>;

    /// Fails with [`AuthorityError::UnknownAction`] when `action_id` is not
    /// registered.
    async fn describe_action(&self, action_id: &ActionId) -> Result<ActionMetadata>;

    /// Returns a bitmask where bit `i` is set iff `action_ids[i]` is
    /// authorized for `identity` right now.
    async fn check_authorizations(
        &self,
        identity: ProcessIdentity,
        action_ids: &[ActionId],
    ) -> Result<u64>;

    /// Asks the session's authentication agent to show a consent dialog.
    async fn request_interactive_authorization(
        &self,
        action_id: &ActionId,
        window: WindowToken,
        pid: u32,
    ) -> Result<InteractiveReply>;
}

/// Bounds a service round trip. Dropping the in-flight future releases
/// whatever connection it holds.
pub(crate) async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AuthorityError::timeout(limit)),
    }
}
