//! Group Moderation Assistant
//!
//! Authorization core of the moderation assistant: decides which groups the
//! signed-in operator may moderate, keeps that decision across restarts,
//! and gates every destructive group action behind it.

pub mod api;
pub mod authorization;
pub mod config;
pub mod gate;
pub mod permissions;
pub mod ratelimit;
pub mod service;
pub mod storage;

pub use service::ModerationService;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `gm_assistant=info`. Emits JSON when
/// `log_format` is `"json"`.
pub fn init_tracing(config: &config::Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "gm_assistant=info".into());

    if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
