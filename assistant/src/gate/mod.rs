//! Access gate.
//!
//! Single choke point every destructive group action passes through before
//! it reaches the platform. Reads the authorized set, never writes it.

mod access;
mod error;
mod rejections;

pub use access::{AccessCheck, AccessGate};
pub use error::AccessDenied;
pub use rejections::{RejectionLog, RejectionLogEntry};
