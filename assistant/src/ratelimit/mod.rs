//! Rate limiting for outbound platform calls.
//!
//! A single token bucket is shared by every verification and refresh call
//! so bulk authorization never floods the platform API.

pub mod config;
pub mod error;
pub mod limiter;

pub use config::*;
pub use error::*;
pub use limiter::*;
