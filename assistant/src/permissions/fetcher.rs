//! Retrying role fetcher.
//!
//! The platform answers throttled role requests with non-list garbage
//! instead of a 429. Malformed payloads and network failures are both
//! retried with exponential backoff; exhausting the budget yields `None`,
//! never an empty list.

use std::sync::Arc;
use std::time::Duration;

use gm_common::RoleDefinition;
use tracing::{debug, warn};

use super::role_cache::RoleCache;
use crate::api::{ApiResponse, GroupApi};

/// Fetches group roles through the cache, retrying bad responses.
pub struct RoleFetcher {
    api: Arc<dyn GroupApi>,
    cache: Arc<RoleCache>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl RoleFetcher {
    /// Create a fetcher over `api` that fills `cache`.
    pub fn new(
        api: Arc<dyn GroupApi>,
        cache: Arc<RoleCache>,
        max_attempts: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Roles for a group, from cache when live.
    ///
    /// Returns `None` when the roles could not be determined.
    #[tracing::instrument(skip(self))]
    pub async fn get_roles(&self, group_id: &str) -> Option<Arc<Vec<RoleDefinition>>> {
        if let Some(roles) = self.cache.get(group_id).await {
            debug!(group_id = %group_id, "Role cache hit");
            return Some(roles);
        }

        self.fetch_and_store(group_id).await
    }

    /// Refetch roles for a group, ignoring any cached entry.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, group_id: &str) -> Option<Arc<Vec<RoleDefinition>>> {
        self.fetch_and_store(group_id).await
    }

    /// The cache this fetcher fills.
    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    async fn fetch_and_store(&self, group_id: &str) -> Option<Arc<Vec<RoleDefinition>>> {
        // Capture the generation before the network round-trip
        let generation = self.cache.generation(group_id);

        for attempt in 0..self.max_attempts {
            match self.api.fetch_group_roles(group_id).await {
                ApiResponse::Ok(roles) => {
                    let roles = Arc::new(roles);
                    if !self
                        .cache
                        .insert_if_current(group_id, Arc::clone(&roles), generation)
                        .await
                    {
                        debug!(group_id = %group_id, "Group invalidated during fetch, not caching roles");
                    }
                    return Some(roles);
                }
                ApiResponse::Malformed => {
                    warn!(
                        group_id = %group_id,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        "Malformed role list (likely silent rate limit)"
                    );
                }
                ApiResponse::NetworkError(e) => {
                    warn!(
                        group_id = %group_id,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        rate_limited = e.is_rate_limited(),
                        "Role fetch failed"
                    );
                }
            }

            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        warn!(group_id = %group_id, "Giving up on role fetch after retries");
        None
    }

    /// Delay before retrying after `attempt` (zero-based): `base * 2^attempt`,
    /// capped at [`Duration::MAX`].
    fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.backoff_base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}
