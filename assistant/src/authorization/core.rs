//! Bulk Authorization
//!
//! Decides which of the operator's groups may be moderated and commits the
//! result to the [`AuthorizationStore`]. Owned groups are resolved locally;
//! every other membership goes through the [`PermissionVerifier`] in small
//! concurrent batches.
//!
//! Each pass takes a fresh `process_id`. A pass that finds a newer id after
//! any await point abandons its work, so two overlapping logins can never
//! interleave their writes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use gm_common::{has_group_prefix, AuthorizedGroups, GroupDisplay, Membership};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::AuthorizeError;
use super::events::{AuthorizationEvent, EventBus};
use super::refresher::{PredictiveRefresher, RefreshSettings};
use super::store::AuthorizationStore;
use crate::api::GroupApi;
use crate::config::Config;
use crate::permissions::{PermissionVerifier, RoleCache, RoleFetcher};
use crate::ratelimit::RateLimiter;
use crate::storage::StorageError;

/// Owner of the authorized group set's write path.
pub struct AuthorizationCore {
    api: Arc<dyn GroupApi>,
    store: Arc<AuthorizationStore>,
    fetcher: Arc<RoleFetcher>,
    verifier: PermissionVerifier,
    refresher: PredictiveRefresher,
    events: EventBus,
    process_id: AtomicU64,
    batch_size: usize,
    group_id_prefix: String,
}

impl AuthorizationCore {
    /// Build the core and its verification pipeline.
    pub fn new(
        config: &Config,
        api: Arc<dyn GroupApi>,
        store: Arc<AuthorizationStore>,
        limiter: RateLimiter,
    ) -> Self {
        let cache = Arc::new(RoleCache::new(
            config.role_cache_capacity,
            config.role_cache_ttl(),
        ));
        let fetcher = Arc::new(RoleFetcher::new(
            Arc::clone(&api),
            cache,
            config.fetch_max_attempts,
            config.fetch_backoff_base(),
        ));
        let verifier = PermissionVerifier::new(
            Arc::clone(&fetcher),
            Arc::clone(&api),
            limiter.clone(),
            config.trust_window(),
        );
        let refresher = PredictiveRefresher::new(
            Arc::clone(&fetcher),
            limiter,
            RefreshSettings::from_config(config),
        );

        Self {
            api,
            store,
            fetcher,
            verifier,
            refresher,
            events: EventBus::new(),
            process_id: AtomicU64::new(0),
            batch_size: config.verify_batch_size.max(1),
            group_id_prefix: config.group_id_prefix.clone(),
        }
    }

    /// Authorize `user_id` against their memberships and commit the result.
    ///
    /// Groups that fail verification are left out. Returns
    /// [`AuthorizeError::Superseded`] without writing anything if another
    /// pass started meanwhile.
    #[tracing::instrument(skip(self, memberships), fields(memberships = memberships.len()))]
    pub async fn authorize(
        &self,
        memberships: Vec<Membership>,
        user_id: &str,
    ) -> Result<AuthorizedGroups, AuthorizeError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AuthorizeError::MissingUserId);
        }

        let process_id = self.process_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        // Stored verification times only apply to the identity that earned them
        let hydrate = self.store.is_owned_by(user_id);

        let mut owned = Vec::new();
        let mut pending = Vec::new();
        for mut membership in memberships {
            if !has_group_prefix(&membership.group_id, &self.group_id_prefix) {
                warn!(group_id = %membership.group_id, "Skipping membership with invalid group ID");
                continue;
            }

            if membership.is_owned_by(user_id) {
                membership.last_verified_at = Some(now);
                owned.push(membership);
                continue;
            }

            if hydrate {
                if let Some(stored) = self.store.verified_at(&membership.group_id) {
                    if membership.last_verified_at.map_or(true, |at| stored > at) {
                        membership.last_verified_at = Some(stored);
                    }
                }
            }
            pending.push(membership);
        }

        info!(
            owned = owned.len(),
            to_verify = pending.len(),
            process_id,
            "Starting authorization pass"
        );

        let mut verified = Vec::new();
        let mut pending = pending.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<Membership> = pending.by_ref().take(self.batch_size).collect();
            let results = join_all(batch.into_iter().map(|mut membership| async move {
                let allowed = self
                    .verifier
                    .has_moderation_permission(user_id, &mut membership)
                    .await;
                (membership, allowed)
            }))
            .await;

            if self.is_superseded(process_id) {
                info!(process_id, "Authorization pass superseded, discarding results");
                return Err(AuthorizeError::Superseded);
            }

            for (membership, allowed) in results {
                if allowed {
                    verified.push(membership);
                } else {
                    debug!(group_id = %membership.group_id, "Not authorized to moderate group");
                }
            }
        }

        let refresh_targets: Vec<String> = verified.iter().map(|m| m.group_id.clone()).collect();

        // Owner entries win over verified duplicates
        let mut merged: BTreeMap<String, Membership> = BTreeMap::new();
        for membership in owned.into_iter().chain(verified) {
            merged
                .entry(membership.group_id.clone())
                .or_insert(membership);
        }

        let committed = self
            .store
            .replace(user_id, merged.values(), || !self.is_superseded(process_id))?;
        if !committed {
            info!(process_id, "Authorization pass superseded before commit");
            return Err(AuthorizeError::Superseded);
        }

        let group_ids: Vec<String> = merged.into_keys().collect();
        info!(authorized = group_ids.len(), "Authorization pass committed");

        self.events.publish(AuthorizationEvent::GroupsChanged {
            group_ids: group_ids.clone(),
            owner_user_id: user_id.to_string(),
        });

        self.refresher.targets().replace(refresh_targets);
        self.refresher.start();

        Ok(AuthorizedGroups {
            group_ids,
            owner_user_id: Some(user_id.to_string()),
        })
    }

    /// Fetch the memberships of `user_id` and authorize them.
    ///
    /// If the fetch fails nothing is granted; a set stored for a different
    /// identity is wiped so it can never be honored for this one.
    #[tracing::instrument(skip(self))]
    pub async fn authorize_user(&self, user_id: &str) -> Result<AuthorizedGroups, AuthorizeError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AuthorizeError::MissingUserId);
        }

        match self.api.fetch_user_group_memberships(user_id).await {
            Ok(memberships) => self.authorize(memberships, user_id).await,
            Err(e) => {
                warn!(error = %e, "Failed to fetch group memberships");
                if self.store.owner().is_some() && !self.store.is_owned_by(user_id) {
                    warn!("Stored authorization belongs to another user, clearing");
                    self.clear().await?;
                }
                Err(AuthorizeError::Upstream(e))
            }
        }
    }

    /// Force a full remote check of `group_id` on the next pass.
    #[tracing::instrument(skip(self))]
    pub async fn force_reverify(&self, group_id: &str) -> Result<(), StorageError> {
        self.store.forget_verification(group_id)?;
        self.fetcher.cache().invalidate(group_id).await;
        Ok(())
    }

    /// Wipe the authorized set, the role cache and the refresh targets.
    ///
    /// Any pass in flight is superseded and will not write. Memory is wiped
    /// and [`AuthorizationEvent::Cleared`] is published even if erasing the
    /// persisted copy fails; that error is returned afterwards.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.process_id.fetch_add(1, Ordering::SeqCst);
        self.refresher.targets().clear();
        self.fetcher.cache().clear().await;
        let result = self.store.clear();
        if let Err(e) = &result {
            warn!(error = %e, "Failed to erase persisted authorization");
        }
        self.events.publish(AuthorizationEvent::Cleared);
        result
    }

    fn is_superseded(&self, process_id: u64) -> bool {
        self.process_id.load(Ordering::SeqCst) != process_id
    }

    /// Read handle on the authorized set.
    pub fn store(&self) -> &Arc<AuthorizationStore> {
        &self.store
    }

    /// Cached display objects of the authorized groups.
    pub fn cached_displays(&self) -> Vec<GroupDisplay> {
        self.store.cached_displays()
    }

    /// Receive authorization change events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.events.subscribe()
    }

    /// The background role refresher.
    pub fn refresher(&self) -> &PredictiveRefresher {
        &self.refresher
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        self.refresher.shutdown().await;
    }
}
