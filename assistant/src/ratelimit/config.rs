//! Rate limiting configuration.

/// Configuration for the outbound rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,
    /// Token bucket shape
    pub bucket: BucketConfig,
}

/// Token bucket shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    /// Maximum tokens held (burst size)
    pub capacity: u32,
    /// Tokens added per second
    pub refill_per_sec: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bucket: BucketConfig::default(),
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_per_sec: 2,
        }
    }
}

impl RateLimitConfig {
    /// Creates configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RATE_LIMIT_ENABLED`: Enable/disable rate limiting (default: true)
    /// - `RATE_LIMIT_BUCKET`: Bucket as "capacity,refill_per_sec" (default: "5,2")
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            config.enabled = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("RATE_LIMIT_BUCKET") {
            if let Some(bucket) = parse_bucket_config(&val) {
                config.bucket = bucket;
            }
        }

        config
    }
}

/// Parses a bucket config from "capacity,refill_per_sec" format.
///
/// Zero values are rejected: an empty or non-refilling bucket would block
/// every caller forever.
fn parse_bucket_config(val: &str) -> Option<BucketConfig> {
    let parts: Vec<&str> = val.split(',').collect();
    if parts.len() == 2 {
        let capacity = parts[0].trim().parse().ok().filter(|c| *c > 0)?;
        let refill_per_sec = parts[1].trim().parse().ok().filter(|r| *r > 0)?;
        Some(BucketConfig {
            capacity,
            refill_per_sec,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.bucket.capacity, 5);
        assert_eq!(config.bucket.refill_per_sec, 2);
    }

    #[test]
    fn test_parse_bucket_config() {
        let bucket = parse_bucket_config("10,3").unwrap();
        assert_eq!(bucket.capacity, 10);
        assert_eq!(bucket.refill_per_sec, 3);

        // With whitespace
        let bucket = parse_bucket_config(" 20 , 4 ").unwrap();
        assert_eq!(bucket.capacity, 20);
        assert_eq!(bucket.refill_per_sec, 4);

        // Invalid formats
        assert!(parse_bucket_config("10").is_none());
        assert!(parse_bucket_config("10,1,extra").is_none());
        assert!(parse_bucket_config("abc,1").is_none());
        assert!(parse_bucket_config("0,1").is_none());
        assert!(parse_bucket_config("5,0").is_none());
    }
}
