use std::collections::HashSet;

use pkauth_protocol::ActionId;
use pkauth_protocol::ProcessIdentity;

use crate::authority::Authority;
use crate::error::AuthorityError;
use crate::error::Result;
use crate::identity::ProcessSelector;
use crate::service::with_deadline;

/// The reply bitmask is a `u64`, one bit per requested action.
pub const MAX_BATCH_ACTIONS: usize = u64::BITS as usize;

impl Authority {
    /// Returns the subset of `actions` that `identity` may perform right now.
    ///
    /// One round trip for the whole batch; an empty batch makes none. Either
    /// the whole batch is answered or the call fails.
    pub async fn check_batch(
        &self,
        identity: ProcessIdentity,
        actions: &[ActionId],
    ) -> Result<HashSet<ActionId>> {
        if actions.is_empty() {
            return Ok(HashSet::new());
        }
        if actions.len() > MAX_BATCH_ACTIONS {
            return Err(AuthorityError::TooManyActions {
                requested: actions.len(),
                max: MAX_BATCH_ACTIONS,
            });
        }

        let bitmask = with_deadline(
            self.timeout,
            self.service.check_authorizations(identity, actions),
        )
        .await?;
        tracing::debug!(
            "{identity}: {} actions checked, bitmask {bitmask:#b}",
            actions.len()
        );
        Ok(decode_bitmask(actions, bitmask))
    }

    /// Resolves `selector` and checks `actions` for it.
    pub async fn check(
        &self,
        selector: ProcessSelector,
        actions: &[ActionId],
    ) -> Result<HashSet<ActionId>> {
        let identity = selector.resolve()?;
        self.check_batch(identity, actions).await
    }

    pub async fn is_authorized(
        &self,
        selector: ProcessSelector,
        action: &ActionId,
    ) -> Result<bool> {
        let granted = self.check(selector, std::slice::from_ref(action)).await?;
        Ok(granted.contains(action))
    }
}

/// Maps bit `i` of `bitmask` to `actions[i]`.
///
/// A repeated action is authorized if any of its positions has its bit set.
/// Bits past the end of `actions` are ignored.
pub fn decode_bitmask(actions: &[ActionId], bitmask: u64) -> HashSet<ActionId> {
    let stray = match u32::try_from(actions.len()) {
        Ok(len) => bitmask.checked_shr(len).unwrap_or(0),
        Err(_) => 0,
    };
    if stray != 0 {
        tracing::warn!(
            "ignoring reply bits beyond the {} requested actions: {bitmask:#b}",
            actions.len()
        );
    }

    let mut granted = HashSet::with_capacity(actions.len());
    for (index, action) in actions.iter().enumerate() {
        let bit = u32::try_from(index)
            .ok()
            .and_then(|index| 1u64.checked_shl(index))
            .unwrap_or(0);
        if bitmask & bit != 0 {
            granted.insert(action.clone());
        }
    }
    granted
}
