//! Assistant Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use gm_common::GROUP_ID_PREFIX;

use crate::ratelimit::RateLimitConfig;

/// Longest role cache TTL accepted from configuration (7 days).
pub const MAX_ROLE_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Assistant configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the local authorization database
    pub data_dir: PathBuf,

    /// Namespace prefix every valid group ID carries (default: "grp_")
    pub group_id_prefix: String,

    /// Log output format: "json" or "pretty" (default: pretty)
    pub log_format: String,

    /// Optimistic trust window in seconds (default: 86400 = 24h)
    pub trust_window_secs: u64,

    /// Role cache entry lifetime in seconds (default: 86400 = 24h, max 7 days)
    pub role_cache_ttl_secs: u64,

    /// Role cache capacity in groups (default: 200)
    pub role_cache_capacity: usize,

    /// Memberships verified concurrently per batch (default: 5)
    pub verify_batch_size: usize,

    /// Attempts per role fetch before giving up (default: 5)
    pub fetch_max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds (default: 300)
    pub fetch_backoff_base_ms: u64,

    /// Seconds between predictive refresh ticks (default: 120)
    pub refresh_interval_secs: u64,

    /// Groups refreshed per tick (default: 3)
    pub refresh_groups_per_tick: usize,

    /// Delay between refresh fetches within one tick in milliseconds (default: 1000)
    pub refresh_spacing_ms: u64,

    /// Outbound verification rate limit
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            group_id_prefix: GROUP_ID_PREFIX.to_string(),
            log_format: "pretty".into(),
            trust_window_secs: 24 * 3600,
            role_cache_ttl_secs: 24 * 3600,
            role_cache_capacity: 200,
            verify_batch_size: 5,
            fetch_max_attempts: 5,
            fetch_backoff_base_ms: 300,
            refresh_interval_secs: 120,
            refresh_groups_per_tick: 3,
            refresh_spacing_ms: 1000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GM_DATA_DIR`: Directory for the local database (required)
    /// - `GM_GROUP_ID_PREFIX`: Group ID namespace prefix
    /// - `LOG_FORMAT`: "json" or "pretty"
    /// - `GM_TRUST_WINDOW_SECS`, `GM_ROLE_CACHE_TTL_SECS`, `GM_ROLE_CACHE_CAPACITY`
    /// - `GM_VERIFY_BATCH_SIZE`, `GM_FETCH_MAX_ATTEMPTS`, `GM_FETCH_BACKOFF_BASE_MS`
    /// - `GM_REFRESH_INTERVAL_SECS`, `GM_REFRESH_GROUPS_PER_TICK`, `GM_REFRESH_SPACING_MS`
    /// - `RATE_LIMIT_ENABLED`, `RATE_LIMIT_BUCKET` (see [`RateLimitConfig::from_env`])
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            data_dir: env::var("GM_DATA_DIR")
                .map(PathBuf::from)
                .context("GM_DATA_DIR must be set")?,
            group_id_prefix: env::var("GM_GROUP_ID_PREFIX")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.group_id_prefix),
            log_format: env::var("LOG_FORMAT").unwrap_or(defaults.log_format),
            trust_window_secs: env_parse("GM_TRUST_WINDOW_SECS")
                .unwrap_or(defaults.trust_window_secs),
            role_cache_ttl_secs: env_parse("GM_ROLE_CACHE_TTL_SECS")
                .unwrap_or(defaults.role_cache_ttl_secs)
                .min(MAX_ROLE_CACHE_TTL_SECS),
            role_cache_capacity: env_parse("GM_ROLE_CACHE_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(defaults.role_cache_capacity),
            verify_batch_size: env_parse("GM_VERIFY_BATCH_SIZE")
                .filter(|b| *b > 0)
                .unwrap_or(defaults.verify_batch_size),
            fetch_max_attempts: env_parse("GM_FETCH_MAX_ATTEMPTS")
                .filter(|a| *a > 0)
                .unwrap_or(defaults.fetch_max_attempts),
            fetch_backoff_base_ms: env_parse("GM_FETCH_BACKOFF_BASE_MS")
                .unwrap_or(defaults.fetch_backoff_base_ms),
            refresh_interval_secs: env_parse("GM_REFRESH_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.refresh_interval_secs),
            refresh_groups_per_tick: env_parse("GM_REFRESH_GROUPS_PER_TICK")
                .unwrap_or(defaults.refresh_groups_per_tick),
            refresh_spacing_ms: env_parse("GM_REFRESH_SPACING_MS")
                .unwrap_or(defaults.refresh_spacing_ms),
            rate_limit: RateLimitConfig::from_env(),
        };

        Ok(config)
    }

    /// Path of the local authorization database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("authorization.db")
    }

    /// Optimistic trust window.
    #[must_use]
    pub fn trust_window(&self) -> chrono::TimeDelta {
        i64::try_from(self.trust_window_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Role cache entry lifetime.
    #[must_use]
    pub const fn role_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.role_cache_ttl_secs)
    }

    /// Base backoff delay for role fetch retries.
    #[must_use]
    pub const fn fetch_backoff_base(&self) -> Duration {
        Duration::from_millis(self.fetch_backoff_base_ms)
    }

    /// Create a default configuration for testing.
    ///
    /// Backoff and refresh pacing are shortened so retry paths finish quickly,
    /// and rate limiting is disabled.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            data_dir: std::env::temp_dir(),
            fetch_backoff_base_ms: 1,
            refresh_spacing_ms: 0,
            rate_limit: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Parse an environment variable, ignoring missing or malformed values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
