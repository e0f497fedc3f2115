//! Platform API collaborator.
//!
//! The remote platform client lives outside this crate. The authorization
//! core only sees the [`GroupApi`] trait, whose role fetch returns a tagged
//! [`ApiResponse`] so every call site has to handle the malformed payloads
//! the platform sends instead of a proper 429.

mod error;

use async_trait::async_trait;
use gm_common::{Membership, RoleDefinition};

pub use error::ApiError;

/// Outcome of a platform call that may come back as garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    /// Well-formed payload.
    Ok(T),
    /// The platform answered, but not with the expected shape. Observed when
    /// the platform is rate limiting without saying so.
    Malformed,
    /// The request did not complete.
    NetworkError(ApiError),
}

impl ApiResponse<Vec<RoleDefinition>> {
    /// Type-guard a raw JSON body into a role list.
    ///
    /// Anything other than an array of role objects is [`ApiResponse::Malformed`].
    pub fn from_json(body: serde_json::Value) -> Self {
        if !body.is_array() {
            return Self::Malformed;
        }
        match serde_json::from_value(body) {
            Ok(roles) => Self::Ok(roles),
            Err(_) => Self::Malformed,
        }
    }
}

impl<T> ApiResponse<T> {
    /// Whether the payload is usable.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Remote group endpoints consumed by the authorization core.
#[async_trait]
pub trait GroupApi: Send + Sync {
    /// Every group the user belongs to, with owner and role data when the
    /// platform provides it.
    async fn fetch_user_group_memberships(
        &self,
        user_id: &str,
    ) -> Result<Vec<Membership>, ApiError>;

    /// Role IDs held by `user_id` in `group_id`.
    async fn fetch_group_member_role_ids(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, ApiError>;

    /// Role definitions of `group_id`.
    async fn fetch_group_roles(&self, group_id: &str) -> ApiResponse<Vec<RoleDefinition>>;
}
