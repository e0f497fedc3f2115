//! Authorized Group Store
//!
//! Durable, ownership-bound set of group IDs the operator may moderate,
//! plus display data and per-group verification times. The whole state is
//! persisted as one JSON blob so a restart can unlock the UI before the
//! first network round-trip.
//!
//! The stored set is only meaningful for the identity recorded as its
//! owner. Callers must check [`AuthorizationStore::is_owned_by`] before
//! trusting anything loaded from disk.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use gm_common::{AuthorizedGroups, GroupDisplay, Membership};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, Result, StorageError};

/// Key the authorization state is persisted under.
pub const STORAGE_KEY: &str = "authorized_groups";

/// Serialized authorization state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationState {
    #[serde(default)]
    group_ids: BTreeSet<String>,
    #[serde(default)]
    owner_user_id: Option<String>,
    #[serde(default)]
    displays: BTreeMap<String, GroupDisplay>,
    #[serde(default)]
    verified_at: BTreeMap<String, DateTime<Utc>>,
}

/// Persistent store of the authorized group set.
pub struct AuthorizationStore {
    kv: Arc<dyn KeyValueStore>,
    state: RwLock<AuthorizationState>,
}

impl AuthorizationStore {
    /// Create an empty store over `kv`. Call [`load`](Self::load) to read
    /// the persisted state.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            state: RwLock::new(AuthorizationState::default()),
        }
    }

    /// Replace the in-memory state with the persisted one.
    ///
    /// A corrupt blob is discarded and the store starts empty.
    pub fn load(&self) -> Result<()> {
        let loaded = match self.kv.get(STORAGE_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupt authorization state, starting empty");
                AuthorizationState::default()
            }),
            None => AuthorizationState::default(),
        };

        info!(
            groups = loaded.group_ids.len(),
            has_owner = loaded.owner_user_id.is_some(),
            "Loaded authorization state"
        );

        let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
        *state = loaded;
        Ok(())
    }

    /// Persist the in-memory state.
    pub fn save(&self) -> Result<()> {
        let state = self.read()?;
        self.persist(&state)
    }

    fn persist(&self, state: &AuthorizationState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.kv.set(STORAGE_KEY, &json)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, AuthorizationState>> {
        self.state.read().map_err(|_| StorageError::Poisoned)
    }

    /// Whether the stored set was produced for `user_id`.
    ///
    /// Compares trimmed IDs, case-sensitively. A store without an owner is
    /// owned by nobody.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return false;
        }

        let Ok(state) = self.read() else {
            return false;
        };
        state
            .owner_user_id
            .as_deref()
            .map(str::trim)
            .is_some_and(|owner| !owner.is_empty() && owner == user_id)
    }

    /// Recorded owner of the stored set.
    pub fn owner(&self) -> Option<String> {
        self.read().ok()?.owner_user_id.clone()
    }

    /// Atomically replace the whole state with `memberships` owned by
    /// `owner_user_id`.
    ///
    /// `is_current` is evaluated under the write lock; if it returns
    /// `false` nothing is written and `Ok(false)` is returned.
    pub fn replace<'a, I, F>(
        &self,
        owner_user_id: &str,
        memberships: I,
        is_current: F,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = &'a Membership>,
        F: FnOnce() -> bool,
    {
        let mut next = AuthorizationState {
            owner_user_id: Some(owner_user_id.to_string()),
            ..AuthorizationState::default()
        };
        for membership in memberships {
            next.group_ids.insert(membership.group_id.clone());
            if let Some(display) = &membership.display {
                next.displays
                    .insert(membership.group_id.clone(), display.clone());
            }
            if let Some(at) = membership.last_verified_at {
                next.verified_at.insert(membership.group_id.clone(), at);
            }
        }

        let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
        if !is_current() {
            return Ok(false);
        }

        self.persist(&next)?;
        *state = next;
        Ok(true)
    }

    /// Drop the recorded verification time of a group so the next pass
    /// checks it remotely.
    ///
    /// Returns whether a time was recorded.
    pub fn forget_verification(&self, group_id: &str) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| StorageError::Poisoned)?;
        if state.verified_at.remove(group_id).is_none() {
            return Ok(false);
        }
        self.persist(&state)?;
        debug!(group_id = %group_id, "Dropped stored verification time");
        Ok(true)
    }

    /// Wipe memory and the persisted state.
    pub fn clear(&self) -> Result<()> {
        {
            // Wiping is safe even if a writer panicked mid-update.
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = AuthorizationState::default();
        }
        self.kv.clear_all()?;
        info!("Authorization state cleared");
        Ok(())
    }

    /// Whether `group_id` is in the authorized set.
    pub fn contains(&self, group_id: &str) -> bool {
        self.read()
            .map(|state| state.group_ids.contains(group_id))
            .unwrap_or(false)
    }

    /// Authorized group IDs, sorted.
    pub fn allowed_group_ids(&self) -> Vec<String> {
        self.read()
            .map(|state| state.group_ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Cached display objects of the authorized groups.
    pub fn cached_displays(&self) -> Vec<GroupDisplay> {
        self.read()
            .map(|state| {
                state
                    .displays
                    .iter()
                    .filter(|(id, _)| state.group_ids.contains(*id))
                    .map(|(_, display)| display.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last recorded verification time of a group.
    pub fn verified_at(&self, group_id: &str) -> Option<DateTime<Utc>> {
        self.read().ok()?.verified_at.get(group_id).copied()
    }

    /// The authorized set and its owner.
    pub fn snapshot(&self) -> AuthorizedGroups {
        self.read()
            .map(|state| AuthorizedGroups {
                group_ids: state.group_ids.iter().cloned().collect(),
                owner_user_id: state.owner_user_id.clone(),
            })
            .unwrap_or_default()
    }
}
