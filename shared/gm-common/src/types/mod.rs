//! Shared Types

mod action;
mod group;
mod role;

pub use action::GroupAction;
pub use group::{has_group_prefix, AuthorizedGroups, GroupDisplay, Membership, GROUP_ID_PREFIX};
pub use role::RoleDefinition;
