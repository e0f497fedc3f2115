//! Access Gate Error Types

use gm_common::GroupAction;
use thiserror::Error;

/// Why a group action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// The group ID is blank or lacks the platform prefix.
    #[error("Invalid group ID {group_id:?} for {action}")]
    InvalidGroupId {
        group_id: String,
        action: GroupAction,
    },

    /// The operator is not authorized to moderate the group.
    #[error("Not authorized to {action} in group {group_id}")]
    NotAuthorized {
        group_id: String,
        action: GroupAction,
    },
}

impl AccessDenied {
    /// The refused group ID.
    pub fn group_id(&self) -> &str {
        match self {
            Self::InvalidGroupId { group_id, .. } | Self::NotAuthorized { group_id, .. } => {
                group_id
            }
        }
    }

    /// The refused action.
    pub const fn action(&self) -> GroupAction {
        match self {
            Self::InvalidGroupId { action, .. } | Self::NotAuthorized { action, .. } => *action,
        }
    }
}
