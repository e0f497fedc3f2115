//! Group Moderation Assistant maintenance tool
//!
//! `gm-assistant status` prints the persisted authorization state.
//! `gm-assistant logout` wipes it.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gm_assistant::authorization::AuthorizationStore;
use gm_assistant::config::Config;
use gm_assistant::storage::SqliteKeyValueStore;
use serde_json::json;
use tracing::info;

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    gm_assistant::init_tracing(&config);

    let command = std::env::args().nth(1).unwrap_or_else(|| "status".into());

    let path = config.database_path();
    let kv = SqliteKeyValueStore::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let store = AuthorizationStore::new(Arc::new(kv));
    store.load().context("Failed to load authorization state")?;

    match command.as_str() {
        "status" => {
            let snapshot = store.snapshot();
            let report = json!({
                "ownerUserId": snapshot.owner_user_id,
                "groupIds": snapshot.group_ids,
                "groups": store.cached_displays(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "logout" => {
            store.clear().context("Failed to clear authorization state")?;
            info!(path = %path.display(), "Authorization state wiped");
        }
        other => bail!("Unknown command {other:?}, expected \"status\" or \"logout\""),
    }

    Ok(())
}
