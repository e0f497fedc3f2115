//! Per-group moderation permission check.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use gm_common::Membership;
use tracing::{debug, warn};

use super::fetcher::RoleFetcher;
use super::policy::grants_moderation;
use crate::api::GroupApi;
use crate::ratelimit::RateLimiter;

/// Verification timestamps further in the future than this (in seconds) are
/// clock skew or tampering and are not trusted.
const MAX_FUTURE_SKEW_SECS: i64 = 5 * 60;

/// Decides whether a user may moderate a single group.
///
/// Never errors: anything that prevents a positive answer is `false`.
pub struct PermissionVerifier {
    fetcher: Arc<RoleFetcher>,
    api: Arc<dyn GroupApi>,
    limiter: RateLimiter,
    trust_window: TimeDelta,
}

impl PermissionVerifier {
    pub fn new(
        fetcher: Arc<RoleFetcher>,
        api: Arc<dyn GroupApi>,
        limiter: RateLimiter,
        trust_window: TimeDelta,
    ) -> Self {
        Self {
            fetcher,
            api,
            limiter,
            trust_window,
        }
    }

    /// Check whether `user_id` holds a moderation permission in the group.
    ///
    /// A recent `last_verified_at` short-circuits with no network call.
    /// On a positive remote check `last_verified_at` is stamped with now.
    #[tracing::instrument(skip(self, membership), fields(group_id = %membership.group_id))]
    pub async fn has_moderation_permission(
        &self,
        user_id: &str,
        membership: &mut Membership,
    ) -> bool {
        let now = Utc::now();
        if self.is_trusted(membership.last_verified_at, now) {
            debug!("Within trust window, skipping remote check");
            return true;
        }

        self.limiter.acquire().await;

        let role_ids = if membership.role_ids.is_empty() {
            match self
                .api
                .fetch_group_member_role_ids(&membership.group_id, user_id)
                .await
            {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch member roles");
                    return false;
                }
            }
        } else {
            membership.role_ids.clone()
        };

        if role_ids.is_empty() {
            debug!("User holds no roles in group");
            return false;
        }

        let Some(roles) = self.fetcher.get_roles(&membership.group_id).await else {
            warn!("Role definitions unavailable, denying");
            return false;
        };

        if !grants_moderation(&roles, &role_ids) {
            return false;
        }

        membership.role_ids = role_ids;
        membership.last_verified_at = Some(Utc::now());
        true
    }

    /// Whether a previous verification is recent enough to reuse.
    fn is_trusted(&self, verified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(at) = verified_at else {
            return false;
        };

        let age = now.signed_duration_since(at);
        if age < -TimeDelta::seconds(MAX_FUTURE_SKEW_SECS) {
            warn!(verified_at = %at, "Verification timestamp is in the future, ignoring");
            return false;
        }
        age < self.trust_window
    }

    /// The configured trust window.
    pub const fn trust_window(&self) -> TimeDelta {
        self.trust_window
    }
}
