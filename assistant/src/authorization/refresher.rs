//! Predictive role refresh.
//!
//! Background task that re-fetches role definitions of verified groups
//! before their cache entries expire, so the next authorization pass hits
//! a warm cache. Advisory only: a failed refresh changes no decision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::permissions::RoleFetcher;
use crate::ratelimit::RateLimiter;

/// Refetch once an entry has lived this fraction of the cache TTL.
const REFRESH_THRESHOLD: f64 = 0.8;

/// Refresh pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Groups examined per tick.
    pub groups_per_tick: usize,
    /// Pause between two fetches within one tick.
    pub spacing: Duration,
}

impl RefreshSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
            groups_per_tick: config.refresh_groups_per_tick,
            spacing: Duration::from_millis(config.refresh_spacing_ms),
        }
    }
}

#[derive(Debug, Default)]
struct TargetList {
    groups: Vec<String>,
    cursor: usize,
}

/// Round-robin list of groups to keep warm.
#[derive(Debug, Default)]
pub struct RefreshTargets {
    inner: Mutex<TargetList>,
}

impl RefreshTargets {
    /// Replace the target list and restart the rotation.
    pub fn replace(&self, groups: Vec<String>) {
        let Ok(mut targets) = self.inner.lock() else {
            return;
        };
        targets.groups = groups;
        targets.cursor = 0;
    }

    /// Drop every target.
    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    /// Up to `n` targets, continuing where the previous call stopped.
    pub fn next_batch(&self, n: usize) -> Vec<String> {
        let Ok(mut targets) = self.inner.lock() else {
            return Vec::new();
        };
        let len = targets.groups.len();
        if len == 0 {
            return Vec::new();
        }

        let start = targets.cursor % len;
        let batch: Vec<String> = (0..n.min(len))
            .map(|i| targets.groups[(start + i) % len].clone())
            .collect();
        targets.cursor = (start + batch.len()) % len;
        batch
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|t| t.groups.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Work done on each tick. Cloned into the background task.
#[derive(Clone)]
struct RefreshWorker {
    fetcher: Arc<RoleFetcher>,
    limiter: RateLimiter,
    targets: Arc<RefreshTargets>,
    settings: RefreshSettings,
}

impl RefreshWorker {
    /// Refresh the next slice of targets. Returns the number refetched.
    async fn tick(&self) -> usize {
        let batch = self.targets.next_batch(self.settings.groups_per_tick);
        let mut fetched = 0;
        let mut refreshed = 0;

        for group_id in batch {
            if !self
                .fetcher
                .cache()
                .needs_refresh(&group_id, REFRESH_THRESHOLD)
                .await
            {
                continue;
            }

            if fetched > 0 {
                sleep(self.settings.spacing).await;
            }
            self.limiter.acquire().await;
            fetched += 1;

            if self.fetcher.refresh(&group_id).await.is_some() {
                refreshed += 1;
            } else {
                warn!(group_id = %group_id, "Predictive role refresh failed");
            }
        }

        if fetched > 0 {
            debug!(fetched, refreshed, "Predictive refresh tick");
        }
        refreshed
    }
}

/// Owner of the background refresh task.
pub struct PredictiveRefresher {
    worker: RefreshWorker,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PredictiveRefresher {
    pub fn new(fetcher: Arc<RoleFetcher>, limiter: RateLimiter, settings: RefreshSettings) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            worker: RefreshWorker {
                fetcher,
                limiter,
                targets: Arc::new(RefreshTargets::default()),
                settings,
            },
            started: AtomicBool::new(false),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Groups kept warm.
    pub fn targets(&self) -> &RefreshTargets {
        &self.worker.targets
    }

    /// Whether the background task has been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawn the background task. Later calls do nothing, including after
    /// [`shutdown`](Self::shutdown).
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return; // Already running
        }

        let worker = self.worker.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(worker.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            info!(
                interval_secs = worker.settings.interval.as_secs(),
                "Predictive refresher started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                worker.tick().await;
            }

            info!("Predictive refresher stopped");
        });

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Run one refresh tick immediately.
    pub async fn refresh_now(&self) -> usize {
        self.worker.tick().await
    }

    /// Stop the background task and wait for it to exit.
    pub async fn shutdown(&self) {
        // Block later starts
        self.started.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Predictive refresher task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gm_common::{Membership, RoleDefinition};

    use super::*;
    use crate::api::{ApiError, ApiResponse, GroupApi};
    use crate::permissions::RoleCache;

    #[derive(Default)]
    struct CountingApi {
        role_calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CountingApi {
        fn calls(&self) -> Vec<String> {
            self.role_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GroupApi for CountingApi {
        async fn fetch_user_group_memberships(
            &self,
            _user_id: &str,
        ) -> Result<Vec<Membership>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_group_member_role_ids(
            &self,
            _group_id: &str,
            _user_id: &str,
        ) -> Result<Vec<String>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_group_roles(&self, group_id: &str) -> ApiResponse<Vec<RoleDefinition>> {
            self.role_calls.lock().unwrap().push(group_id.to_string());
            if self.fail {
                ApiResponse::Malformed
            } else {
                ApiResponse::Ok(vec![RoleDefinition::new("r1", ["group-bans-manage"])])
            }
        }
    }

    fn settings(groups_per_tick: usize) -> RefreshSettings {
        RefreshSettings {
            interval: Duration::from_secs(120),
            groups_per_tick,
            spacing: Duration::from_secs(1),
        }
    }

    fn refresher(api: &Arc<CountingApi>, groups_per_tick: usize) -> PredictiveRefresher {
        let cache = Arc::new(RoleCache::new(10, Duration::from_secs(1000)));
        let fetcher = Arc::new(RoleFetcher::new(
            Arc::clone(api) as Arc<dyn GroupApi>,
            cache,
            1,
            Duration::from_millis(1),
        ));
        PredictiveRefresher::new(fetcher, RateLimiter::unlimited(), settings(groups_per_tick))
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_targets_round_robin() {
        let targets = RefreshTargets::default();
        targets.replace(ids(&["a", "b", "c", "d"]));

        assert_eq!(targets.next_batch(3), ids(&["a", "b", "c"]));
        assert_eq!(targets.next_batch(3), ids(&["d", "a", "b"]));
        assert_eq!(targets.next_batch(3), ids(&["c", "d", "a"]));
    }

    #[test]
    fn test_targets_smaller_than_batch() {
        let targets = RefreshTargets::default();
        targets.replace(ids(&["a", "b"]));

        assert_eq!(targets.next_batch(3), ids(&["a", "b"]));
        assert_eq!(targets.next_batch(3), ids(&["a", "b"]));

        targets.clear();
        assert!(targets.next_batch(3).is_empty());
        assert!(targets.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skips_fresh_entries() {
        let api = Arc::new(CountingApi::default());
        let refresher = refresher(&api, 3);
        refresher.targets().replace(ids(&["grp_1", "grp_2"]));

        assert_eq!(refresher.refresh_now().await, 2);
        assert_eq!(api.calls(), ids(&["grp_1", "grp_2"]));

        // Both entries are fresh now
        assert_eq!(refresher.refresh_now().await, 0);
        assert_eq!(api.calls().len(), 2);

        // Past 80% of the TTL they are due again
        tokio::time::advance(Duration::from_secs(800)).await;
        assert_eq!(refresher.refresh_now().await, 2);
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_spaces_fetches() {
        let api = Arc::new(CountingApi::default());
        let refresher = refresher(&api, 3);
        refresher.targets().replace(ids(&["grp_1", "grp_2", "grp_3"]));

        let start = tokio::time::Instant::now();
        refresher.refresh_now().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_is_not_counted() {
        let api = Arc::new(CountingApi {
            fail: true,
            ..CountingApi::default()
        });
        let refresher = refresher(&api, 3);
        refresher.targets().replace(ids(&["grp_1"]));

        assert_eq!(refresher.refresh_now().await, 0);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_task_ticks_until_shutdown() {
        let api = Arc::new(CountingApi::default());
        let refresher = refresher(&api, 3);
        refresher.targets().replace(ids(&["grp_1", "grp_2", "grp_3", "grp_4"]));

        refresher.start();
        refresher.start();
        assert!(refresher.is_started());

        // Nothing happens before the first interval elapses
        sleep(Duration::from_secs(60)).await;
        assert!(api.calls().is_empty());

        sleep(Duration::from_secs(70)).await;
        assert_eq!(api.calls(), ids(&["grp_1", "grp_2", "grp_3"]));

        refresher.shutdown().await;
        sleep(Duration::from_secs(600)).await;
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_without_start() {
        let api = Arc::new(CountingApi::default());
        let refresher = refresher(&api, 3);
        refresher.shutdown().await;

        // A stopped refresher is never restarted
        refresher.start();
        assert!(refresher.handle.lock().unwrap().is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::default();
        let settings = RefreshSettings::from_config(&config);
        assert_eq!(settings.interval, Duration::from_secs(120));
        assert_eq!(settings.groups_per_tick, 3);
        assert_eq!(settings.spacing, Duration::from_secs(1));
    }
}
