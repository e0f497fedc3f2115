//! Moderation Actions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A mutating action an operator can take against a group.
///
/// Every one of these must pass the access gate before it reaches the
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAction {
    /// Ban a member.
    Ban,
    /// Lift a ban.
    Unban,
    /// Remove a member.
    Kick,
    /// Accept a pending join request.
    AcceptJoinRequest,
    /// Reject a pending join request.
    RejectJoinRequest,
    /// Assign or remove a role.
    ChangeRole,
    /// Close a group instance.
    CloseInstance,
    /// Read the group audit log.
    ViewAuditLog,
}

impl GroupAction {
    /// Returns the string identifier for this action (used in logs).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Kick => "kick",
            Self::AcceptJoinRequest => "accept_join_request",
            Self::RejectJoinRequest => "reject_join_request",
            Self::ChangeRole => "change_role",
            Self::CloseInstance => "close_instance",
            Self::ViewAuditLog => "view_audit_log",
        }
    }

    /// Returns all actions.
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ban,
            Self::Unban,
            Self::Kick,
            Self::AcceptJoinRequest,
            Self::RejectJoinRequest,
            Self::ChangeRole,
            Self::CloseInstance,
            Self::ViewAuditLog,
        ]
    }
}

impl fmt::Display for GroupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}
