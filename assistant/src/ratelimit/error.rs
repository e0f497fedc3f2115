//! Rate limiting error types.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by non-blocking rate limit checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// No token is available right now.
    #[error("Rate limit exhausted, retry in {retry_after:?}")]
    Exhausted { retry_after: Duration },
}
