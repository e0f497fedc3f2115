//! Group permission verification.
//!
//! Three layers, leaves first:
//! - [`RoleCache`]: time-bound LRU of each group's role definitions
//! - [`RoleFetcher`]: retrying, type-guarded role fetch that fills the cache
//! - [`PermissionVerifier`]: decides whether a user moderates one group

pub mod fetcher;
pub mod policy;
pub mod role_cache;
pub mod verifier;

pub use fetcher::RoleFetcher;
pub use policy::{grants_moderation, is_moderation_permission, MODERATION_PERMISSIONS};
pub use role_cache::{Generation, RoleCache};
pub use verifier::PermissionVerifier;
