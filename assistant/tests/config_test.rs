//! Environment-driven configuration tests.
//!
//! These mutate process-wide environment variables, so they run serially.

use std::env;
use std::time::Duration;

use gm_assistant::config::{Config, MAX_ROLE_CACHE_TTL_SECS};
use serial_test::serial;

const VARS: &[&str] = &[
    "GM_DATA_DIR",
    "GM_GROUP_ID_PREFIX",
    "GM_TRUST_WINDOW_SECS",
    "GM_ROLE_CACHE_TTL_SECS",
    "GM_ROLE_CACHE_CAPACITY",
    "GM_VERIFY_BATCH_SIZE",
    "GM_FETCH_MAX_ATTEMPTS",
    "RATE_LIMIT_ENABLED",
    "RATE_LIMIT_BUCKET",
];

fn reset_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_data_dir_is_required() {
    reset_env();
    assert!(Config::from_env().is_err());
}

#[test]
#[serial]
fn test_defaults_from_env() {
    reset_env();
    env::set_var("GM_DATA_DIR", "/tmp/gm-test");

    let config = Config::from_env().unwrap();

    assert_eq!(config.group_id_prefix, "grp_");
    assert_eq!(config.trust_window(), chrono::TimeDelta::hours(24));
    assert_eq!(config.role_cache_ttl(), Duration::from_secs(86400));
    assert!(config.rate_limit.enabled);
    reset_env();
}

#[test]
#[serial]
fn test_overrides_and_clamps() {
    reset_env();
    env::set_var("GM_DATA_DIR", "/tmp/gm-test");
    env::set_var("GM_GROUP_ID_PREFIX", "team_");
    env::set_var("GM_TRUST_WINDOW_SECS", "3600");
    env::set_var("GM_ROLE_CACHE_TTL_SECS", "99999999");
    env::set_var("GM_ROLE_CACHE_CAPACITY", "0");
    env::set_var("GM_VERIFY_BATCH_SIZE", "not a number");
    env::set_var("GM_FETCH_MAX_ATTEMPTS", "3");
    env::set_var("RATE_LIMIT_ENABLED", "false");
    env::set_var("RATE_LIMIT_BUCKET", "10,4");

    let config = Config::from_env().unwrap();

    assert_eq!(config.group_id_prefix, "team_");
    assert_eq!(config.trust_window(), chrono::TimeDelta::hours(1));
    assert_eq!(config.role_cache_ttl_secs, MAX_ROLE_CACHE_TTL_SECS);
    // Invalid values fall back to defaults
    assert_eq!(config.role_cache_capacity, 200);
    assert_eq!(config.verify_batch_size, 5);
    assert_eq!(config.fetch_max_attempts, 3);
    assert!(!config.rate_limit.enabled);
    assert_eq!(config.rate_limit.bucket.capacity, 10);
    assert_eq!(config.rate_limit.bucket.refill_per_sec, 4);
    reset_env();
}
