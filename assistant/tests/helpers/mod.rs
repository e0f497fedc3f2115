//! Reusable test helpers for authorization integration tests.
//!
//! Provides [`MockGroupApi`], a scriptable platform client with call
//! counters, and constructors for a [`ModerationService`] over an
//! in-memory or on-disk store.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gm_assistant::api::{ApiError, ApiResponse, GroupApi};
use gm_assistant::config::Config;
use gm_assistant::storage::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError,
};
use gm_assistant::ModerationService;
use gm_common::{Membership, RoleDefinition};
use tokio::sync::Notify;

/// Role ID the mock assigns to the acting user in every group.
pub const MEMBER_ROLE: &str = "r1";

/// Scriptable [`GroupApi`].
///
/// Groups are registered as moderator groups (the user's role grants
/// `group-bans-manage`), plain member groups, or malformed groups (every
/// role fetch returns garbage). Unknown groups answer `NotFound`.
#[derive(Default)]
pub struct MockGroupApi {
    memberships: Mutex<Vec<Membership>>,
    roles: Mutex<HashMap<String, ApiResponse<Vec<RoleDefinition>>>>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
    fail_memberships: AtomicBool,
    membership_calls: AtomicUsize,
    member_role_calls: AtomicUsize,
    role_calls: Mutex<HashMap<String, usize>>,
}

impl MockGroupApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The acting user's role in `group_id` grants a moderation permission.
    pub fn moderator_of(&self, group_id: &str) {
        self.set_roles(
            group_id,
            ApiResponse::Ok(vec![RoleDefinition::new(MEMBER_ROLE, ["group-bans-manage"])]),
        );
    }

    /// The acting user's role in `group_id` grants nothing moderation-related.
    pub fn member_of(&self, group_id: &str) {
        self.set_roles(
            group_id,
            ApiResponse::Ok(vec![RoleDefinition::new(
                MEMBER_ROLE,
                ["group-galleries-manage"],
            )]),
        );
    }

    /// Role fetches for `group_id` always come back malformed.
    pub fn malformed(&self, group_id: &str) {
        self.set_roles(group_id, ApiResponse::Malformed);
    }

    pub fn set_roles(&self, group_id: &str, response: ApiResponse<Vec<RoleDefinition>>) {
        self.roles
            .lock()
            .unwrap()
            .insert(group_id.to_string(), response);
    }

    /// Memberships returned by `fetch_user_group_memberships`.
    pub fn set_memberships(&self, memberships: Vec<Membership>) {
        *self.memberships.lock().unwrap() = memberships;
    }

    pub fn fail_memberships(&self, fail: bool) {
        self.fail_memberships.store(fail, Ordering::SeqCst);
    }

    /// Block role fetches for `group_id` until the returned handle is notified.
    pub fn hold_roles(&self, group_id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.held
            .lock()
            .unwrap()
            .insert(group_id.to_string(), Arc::clone(&notify));
        notify
    }

    pub fn role_calls(&self, group_id: &str) -> usize {
        self.role_calls
            .lock()
            .unwrap()
            .get(group_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_role_calls(&self) -> usize {
        self.role_calls.lock().unwrap().values().sum()
    }

    pub fn member_role_calls(&self) -> usize {
        self.member_role_calls.load(Ordering::SeqCst)
    }

    pub fn membership_calls(&self) -> usize {
        self.membership_calls.load(Ordering::SeqCst)
    }

    /// Role lookups of either kind.
    pub fn network_calls(&self) -> usize {
        self.total_role_calls() + self.member_role_calls()
    }
}

#[async_trait]
impl GroupApi for MockGroupApi {
    async fn fetch_user_group_memberships(
        &self,
        _user_id: &str,
    ) -> Result<Vec<Membership>, ApiError> {
        self.membership_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_memberships.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                code: 503,
                message: "Service Unavailable".into(),
            });
        }
        Ok(self.memberships.lock().unwrap().clone())
    }

    async fn fetch_group_member_role_ids(
        &self,
        group_id: &str,
        _user_id: &str,
    ) -> Result<Vec<String>, ApiError> {
        self.member_role_calls.fetch_add(1, Ordering::SeqCst);
        if self.roles.lock().unwrap().contains_key(group_id) {
            Ok(vec![MEMBER_ROLE.to_string()])
        } else {
            Err(ApiError::NotFound)
        }
    }

    async fn fetch_group_roles(&self, group_id: &str) -> ApiResponse<Vec<RoleDefinition>> {
        *self
            .role_calls
            .lock()
            .unwrap()
            .entry(group_id.to_string())
            .or_insert(0) += 1;

        let held = self.held.lock().unwrap().get(group_id).cloned();
        if let Some(notify) = held {
            notify.notified().await;
        }

        self.roles
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .unwrap_or(ApiResponse::NetworkError(ApiError::NotFound))
    }
}

/// Service over `api` with an in-memory store. Also returns the store so
/// tests can inspect what was persisted.
pub fn service_with(api: &Arc<MockGroupApi>) -> (ModerationService, Arc<MemoryKeyValueStore>) {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let service = ModerationService::new(
        &Config::default_for_test(),
        Arc::clone(api) as Arc<dyn GroupApi>,
        Arc::clone(&kv) as Arc<dyn KeyValueStore>,
    );
    service.init().unwrap();
    (service, kv)
}

/// Service over `api` persisting to an `SQLite` file at `path`.
pub fn service_on_disk(api: &Arc<MockGroupApi>, path: &Path) -> ModerationService {
    let kv = Arc::new(SqliteKeyValueStore::open(path).unwrap());
    let service = ModerationService::new(
        &Config::default_for_test(),
        Arc::clone(api) as Arc<dyn GroupApi>,
        kv,
    );
    service.init().unwrap();
    service
}

/// In-memory store that refuses to be wiped.
#[derive(Default)]
pub struct StuckKeyValueStore {
    inner: MemoryKeyValueStore,
}

impl KeyValueStore for StuckKeyValueStore {
    fn get(&self, key: &str) -> gm_assistant::storage::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> gm_assistant::storage::Result<()> {
        self.inner.set(key, value)
    }

    fn clear_all(&self) -> gm_assistant::storage::Result<()> {
        Err(StorageError::Poisoned)
    }

    fn len(&self) -> gm_assistant::storage::Result<usize> {
        self.inner.len()
    }
}

/// Service over `api` whose store cannot be erased.
pub fn service_with_stuck_store(api: &Arc<MockGroupApi>) -> ModerationService {
    let service = ModerationService::new(
        &Config::default_for_test(),
        Arc::clone(api) as Arc<dyn GroupApi>,
        Arc::new(StuckKeyValueStore::default()),
    );
    service.init().unwrap();
    service
}
