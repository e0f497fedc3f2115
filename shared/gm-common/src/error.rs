//! Common Error Types

use thiserror::Error;

/// Errors produced when parsing shared types from external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Unknown moderation action name.
    #[error("Unknown group action: {0}")]
    UnknownAction(String),
}

/// Common result type.
pub type Result<T> = std::result::Result<T, Error>;
