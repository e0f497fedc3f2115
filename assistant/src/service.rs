//! Moderation Service
//!
//! Owned handle wiring the authorization pipeline together. Consumers get
//! the [`AccessGate`] for action checks and the event stream for UI
//! updates; only the service can start or wipe authorization.
//!
//! Lifecycle: `new -> init -> authorize* -> clear_on_logout? -> shutdown`.

use std::sync::Arc;

use gm_common::{AuthorizedGroups, GroupAction, GroupDisplay, Membership};
use tokio::sync::broadcast;
use tracing::info;

use crate::api::GroupApi;
use crate::authorization::{
    AuthorizationCore, AuthorizationEvent, AuthorizationStore, AuthorizeError,
};
use crate::config::Config;
use crate::gate::{AccessCheck, AccessDenied, AccessGate};
use crate::ratelimit::RateLimiter;
use crate::storage::{KeyValueStore, StorageError};

/// Group moderation authorization service.
pub struct ModerationService {
    core: AuthorizationCore,
    gate: Arc<AccessGate>,
}

impl ModerationService {
    /// Wire the service over a platform client and a persistence backend.
    ///
    /// Nothing is read from `kv` until [`init`](Self::init).
    pub fn new(config: &Config, api: Arc<dyn GroupApi>, kv: Arc<dyn KeyValueStore>) -> Self {
        let store = Arc::new(AuthorizationStore::new(kv));
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let gate = Arc::new(AccessGate::new(
            Arc::clone(&store),
            config.group_id_prefix.clone(),
        ));
        let core = AuthorizationCore::new(config, api, store, limiter);

        Self { core, gate }
    }

    /// Load the persisted authorization state.
    ///
    /// The loaded set is usable for display immediately; it is only
    /// re-bound to a user by the next [`authorize`](Self::authorize).
    pub fn init(&self) -> Result<(), StorageError> {
        self.core.store().load()
    }

    /// Authorize `user_id` against the given memberships.
    pub async fn authorize(
        &self,
        memberships: Vec<Membership>,
        user_id: &str,
    ) -> Result<AuthorizedGroups, AuthorizeError> {
        self.core.authorize(memberships, user_id).await
    }

    /// Fetch memberships for `user_id` and authorize them.
    pub async fn authorize_user(&self, user_id: &str) -> Result<AuthorizedGroups, AuthorizeError> {
        self.core.authorize_user(user_id).await
    }

    /// Shared handle on the access gate.
    pub fn gate(&self) -> Arc<AccessGate> {
        Arc::clone(&self.gate)
    }

    pub fn validate_access(&self, group_id: &str, action: GroupAction) -> Result<(), AccessDenied> {
        self.gate.validate_access(group_id, action)
    }

    pub fn try_validate_access(&self, group_id: &str, action: GroupAction) -> AccessCheck {
        self.gate.try_validate_access(group_id, action)
    }

    pub fn is_allowed(&self, group_id: &str) -> bool {
        self.gate.is_allowed(group_id)
    }

    pub fn allowed_group_ids(&self) -> Vec<String> {
        self.gate.allowed_group_ids()
    }

    pub fn cached_displays(&self) -> Vec<GroupDisplay> {
        self.core.cached_displays()
    }

    /// Current authorized set and its owner.
    pub fn snapshot(&self) -> AuthorizedGroups {
        self.core.store().snapshot()
    }

    /// Receive authorization change events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.core.subscribe()
    }

    /// Wipe every authorization artifact, in memory and on disk.
    pub async fn clear_on_logout(&self) -> Result<(), StorageError> {
        let result = self.core.clear().await;
        self.gate.clear_rejections();
        result?;
        info!("Cleared authorization on logout");
        Ok(())
    }

    /// Force a full remote check of `group_id` on the next pass.
    pub async fn force_reverify(&self, group_id: &str) -> Result<(), StorageError> {
        self.core.force_reverify(group_id).await
    }

    /// Stop background work.
    pub async fn shutdown(&self) {
        self.core.shutdown().await;
        info!("Moderation service stopped");
    }
}
