//! Platform API Error Types

use thiserror::Error;

/// Errors reported by the platform API collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport failure (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The platform answered with an error status.
    #[error("Platform returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The requested resource does not exist or is hidden from this user.
    #[error("Not found")]
    NotFound,
}

impl ApiError {
    /// Whether the platform reported throttling.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { code: 429, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_429_is_rate_limited() {
        let throttled = ApiError::Status {
            code: 429,
            message: "Too Many Requests".into(),
        };
        let unavailable = ApiError::Status {
            code: 503,
            message: "Service Unavailable".into(),
        };

        assert!(throttled.is_rate_limited());
        assert!(!unavailable.is_rate_limited());
        assert!(!ApiError::NotFound.is_rate_limited());
    }
}
