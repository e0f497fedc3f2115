//! Group Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace prefix carried by every platform group ID.
pub const GROUP_ID_PREFIX: &str = "grp_";

/// Check whether `group_id` carries `prefix` and has something after it.
#[must_use]
pub fn has_group_prefix(group_id: &str, prefix: &str) -> bool {
    group_id.len() > prefix.len() && group_id.starts_with(prefix)
}

/// Display-only projection of a group.
///
/// Persisted next to the authorized set so a UI can render the group list
/// before the first network round-trip. Never used for access decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDisplay {
    /// Group ID.
    pub group_id: String,
    /// Group name.
    pub name: String,
    /// Short code shown next to the name.
    #[serde(default)]
    pub short_code: Option<String>,
    /// Icon image URL.
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Banner image URL.
    #[serde(default)]
    pub banner_url: Option<String>,
    /// Total member count.
    #[serde(default)]
    pub member_count: u32,
    /// Members currently online.
    #[serde(default)]
    pub online_member_count: u32,
}

/// The acting user's membership in one group, as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Group ID.
    pub group_id: String,
    /// Owner of the group. `None` when the platform did not report it.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Role IDs assigned to the acting user. May be empty.
    #[serde(default)]
    pub role_ids: Vec<String>,
    /// Last time moderation permission was confirmed for this group.
    #[serde(default)]
    pub last_verified_at: Option<DateTime<Utc>>,
    /// Display data delivered with the membership payload.
    #[serde(default)]
    pub display: Option<GroupDisplay>,
}

impl Membership {
    /// Create a bare membership with no roles or display data.
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            owner_id: None,
            role_ids: Vec::new(),
            last_verified_at: None,
            display: None,
        }
    }

    /// Set the group owner.
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Set the acting user's role IDs.
    #[must_use]
    pub fn with_roles<I, S>(mut self, role_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_ids = role_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the last verification timestamp.
    #[must_use]
    pub fn with_last_verified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_verified_at = Some(at);
        self
    }

    /// Attach display data.
    #[must_use]
    pub fn with_display(mut self, display: GroupDisplay) -> Self {
        self.display = Some(display);
        self
    }

    /// Whether `user_id` owns this group.
    ///
    /// An unknown owner never matches.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id
            .as_deref()
            .is_some_and(|owner| !owner.is_empty() && owner == user_id)
    }
}

/// Result of an authorization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedGroups {
    /// Group IDs the owner may moderate, sorted.
    pub group_ids: Vec<String>,
    /// Identity that produced this set.
    pub owner_user_id: Option<String>,
}

impl AuthorizedGroups {
    /// Whether the set contains `group_id`.
    pub fn contains(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|id| id == group_id)
    }

    /// Number of authorized groups.
    pub fn len(&self) -> usize {
        self.group_ids.len()
    }

    /// Whether no group is authorized.
    pub fn is_empty(&self) -> bool {
        self.group_ids.is_empty()
    }
}
