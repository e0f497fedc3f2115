//! Group Moderation Common Library
//!
//! Shared types used by the authorization core and the subsystems that
//! consult it (automation, notifications, UI bridges).

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
