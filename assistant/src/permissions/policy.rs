//! Moderation permission policy.
//!
//! The allow-list is a static policy constant. It is deliberately not
//! configurable.

use gm_common::RoleDefinition;

/// Permission strings that make a role moderation-capable.
pub const MODERATION_PERMISSIONS: &[&str] = &[
    "group-bans-manage",
    "group-members-manage",
    "group-members-remove",
    "group-data-manage",
    "group-audit-view",
    "group-joinrequests-manage",
    "group-instance-moderate",
    "group-instance-open-create",
    "group-instance-close",
];

/// Check if a single permission string is moderation-capable.
pub fn is_moderation_permission(permission: &str) -> bool {
    MODERATION_PERMISSIONS.contains(&permission)
}

/// Check if any role in `role_ids` grants a moderation permission.
///
/// Role IDs with no matching definition contribute nothing.
pub fn grants_moderation(roles: &[RoleDefinition], role_ids: &[String]) -> bool {
    roles
        .iter()
        .filter(|role| role_ids.iter().any(|id| *id == role.id))
        .any(|role| role.permissions.iter().any(|p| is_moderation_permission(p)))
}
