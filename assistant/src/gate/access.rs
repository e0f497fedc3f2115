//! Access validation for group actions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use gm_common::{has_group_prefix, GroupAction};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::AccessDenied;
use super::rejections::{RejectionLog, RejectionLogEntry};
use crate::authorization::AuthorizationStore;

/// Outcome of [`AccessGate::try_validate_access`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessCheck {
    pub allowed: bool,
    /// Why access was refused. `None` when allowed.
    pub reason: Option<String>,
}

impl AccessCheck {
    const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }
}

/// Gate that every mutating group action must pass.
pub struct AccessGate {
    store: Arc<AuthorizationStore>,
    group_id_prefix: String,
    rejections: RejectionLog,
}

impl AccessGate {
    /// Gate over `store`, accepting only IDs that start with `group_id_prefix`.
    pub fn new(store: Arc<AuthorizationStore>, group_id_prefix: impl Into<String>) -> Self {
        Self {
            store,
            group_id_prefix: group_id_prefix.into(),
            rejections: RejectionLog::new(),
        }
    }

    /// Allow `action` on `group_id` only if the group is authorized.
    ///
    /// Refusals are logged and recorded in the rejection log.
    pub fn validate_access(&self, group_id: &str, action: GroupAction) -> Result<(), AccessDenied> {
        if let Err(denied) = self.check(group_id, action) {
            warn!(
                group_id = %group_id,
                action = %action,
                reason = %denied,
                "Blocked group action"
            );
            self.rejections.record(RejectionLogEntry {
                timestamp: Utc::now(),
                group_id: group_id.to_string(),
                action,
                reason: denied.to_string(),
            });
            return Err(denied);
        }

        debug!(group_id = %group_id, action = %action, "Group action allowed");
        Ok(())
    }

    /// [`validate_access`](Self::validate_access) as a value instead of an error.
    pub fn try_validate_access(&self, group_id: &str, action: GroupAction) -> AccessCheck {
        match self.validate_access(group_id, action) {
            Ok(()) => AccessCheck::allowed(),
            Err(denied) => AccessCheck {
                allowed: false,
                reason: Some(denied.to_string()),
            },
        }
    }

    /// Whether `group_id` is authorized. Records nothing.
    pub fn is_allowed(&self, group_id: &str) -> bool {
        self.has_valid_id(group_id) && self.store.contains(group_id)
    }

    /// Keep only the items whose group is authorized.
    pub fn filter_allowed<T, F>(&self, items: Vec<T>, group_id_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let allowed: HashSet<String> = self.store.allowed_group_ids().into_iter().collect();
        items
            .into_iter()
            .filter(|item| allowed.contains(group_id_of(item)))
            .collect()
    }

    /// Authorized group IDs, sorted.
    pub fn allowed_group_ids(&self) -> Vec<String> {
        self.store.allowed_group_ids()
    }

    /// Up to `limit` of the newest refusals, newest first.
    pub fn recent_rejections(&self, limit: usize) -> Vec<RejectionLogEntry> {
        self.rejections.recent(limit)
    }

    /// Forget every recorded refusal.
    pub fn clear_rejections(&self) {
        self.rejections.clear();
    }

    fn has_valid_id(&self, group_id: &str) -> bool {
        !group_id.trim().is_empty() && has_group_prefix(group_id, &self.group_id_prefix)
    }

    fn check(&self, group_id: &str, action: GroupAction) -> Result<(), AccessDenied> {
        if !self.has_valid_id(group_id) {
            return Err(AccessDenied::InvalidGroupId {
                group_id: group_id.to_string(),
                action,
            });
        }

        if !self.store.contains(group_id) {
            return Err(AccessDenied::NotAuthorized {
                group_id: group_id.to_string(),
                action,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gm_common::Membership;

    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn gate_with(groups: &[&str]) -> AccessGate {
        let store = Arc::new(AuthorizationStore::new(Arc::new(MemoryKeyValueStore::new())));
        let memberships: Vec<Membership> = groups.iter().map(|id| Membership::new(*id)).collect();
        store.replace("usr_a", &memberships, || true).unwrap();
        AccessGate::new(store, "grp_")
    }

    #[test]
    fn test_authorized_group_passes() {
        let gate = gate_with(&["grp_1"]);

        assert!(gate.validate_access("grp_1", GroupAction::Kick).is_ok());
        assert!(gate.is_allowed("grp_1"));
        assert!(gate.recent_rejections(10).is_empty());
    }

    #[test]
    fn test_unauthorized_group_is_rejected_and_recorded() {
        let gate = gate_with(&["grp_1"]);

        let err = gate.validate_access("grp_2", GroupAction::Ban).unwrap_err();
        assert_eq!(
            err,
            AccessDenied::NotAuthorized {
                group_id: "grp_2".into(),
                action: GroupAction::Ban,
            }
        );

        let rejections = gate.recent_rejections(10);
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].group_id, "grp_2");
        assert_eq!(rejections[0].action, GroupAction::Ban);
    }

    #[test]
    fn test_malformed_ids_are_rejected_for_every_action() {
        // Present in the set, but without the platform prefix
        let gate = gate_with(&["grp_1", "usr_1"]);

        for action in GroupAction::all() {
            for group_id in ["", "   ", "grp_", "usr_1", "GRP_1"] {
                let err = gate.validate_access(group_id, *action).unwrap_err();
                assert!(matches!(err, AccessDenied::InvalidGroupId { .. }));
                assert!(!gate.is_allowed(group_id));
            }
        }
    }

    #[test]
    fn test_try_validate_access_reports_reason() {
        let gate = gate_with(&["grp_1"]);

        assert_eq!(
            gate.try_validate_access("grp_1", GroupAction::AcceptJoinRequest),
            AccessCheck {
                allowed: true,
                reason: None,
            }
        );

        let check = gate.try_validate_access("grp_9", GroupAction::RejectJoinRequest);
        assert!(!check.allowed);
        assert!(check.reason.unwrap().contains("grp_9"));
    }

    #[test]
    fn test_is_allowed_records_nothing() {
        let gate = gate_with(&["grp_1"]);

        assert!(!gate.is_allowed("grp_2"));
        assert!(!gate.is_allowed(""));
        assert!(gate.recent_rejections(10).is_empty());
    }

    #[test]
    fn test_filter_allowed() {
        let gate = gate_with(&["grp_1", "grp_3"]);
        let requests = vec![("grp_1", "a"), ("grp_2", "b"), ("grp_3", "c")];

        let kept = gate.filter_allowed(requests, |(group_id, _)| *group_id);
        assert_eq!(kept, vec![("grp_1", "a"), ("grp_3", "c")]);
    }

    #[test]
    fn test_clear_rejections() {
        let gate = gate_with(&[]);
        let _ = gate.validate_access("grp_1", GroupAction::Kick);
        assert_eq!(gate.recent_rejections(10).len(), 1);

        gate.clear_rejections();
        assert!(gate.recent_rejections(10).is_empty());
    }
}
