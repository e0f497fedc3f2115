//! Role Types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A group role and the permission strings it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    /// Role ID.
    pub id: String,
    /// Role name.
    #[serde(default)]
    pub name: Option<String>,
    /// Permission strings granted by this role.
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl RoleDefinition {
    /// Create a role with the given permissions.
    pub fn new<I, S>(id: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: None,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this role grants `permission`.
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
