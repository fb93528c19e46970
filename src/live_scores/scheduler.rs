use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::updater::MatchUpdater;
use crate::db::models::Sport;

/// Everything the scheduler needs, handed over explicitly at startup.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Fast cycle: live match updates
    pub live_interval: Duration,
    /// Slow cycle: upcoming match discovery
    pub discovery_interval: Duration,
    pub discovery_sports: Vec<Sport>,
}

/// Handles to the two running cycles.
pub struct SchedulerHandle {
    live: JoinHandle<()>,
    discovery: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop both cycles. A cycle in progress is dropped at its next await.
    pub fn shutdown(self) {
        self.live.abort();
        self.discovery.abort();
    }
}

/// Spawn the fast (live) and slow (discovery) cycles.
///
/// Each cycle runs to completion before its task waits for the next tick,
/// and ticks missed while a cycle overran are skipped. Live cycles started
/// elsewhere (manual refresh) queue behind the running one inside
/// [`MatchUpdater::sync_live_matches`], so two syncs of the same match never
/// overlap. Both cycles fire once right away.
pub fn start_sync_scheduler(
    updater: Arc<MatchUpdater>,
    settings: SyncSettings,
) -> SchedulerHandle {
    info!(
        "Sync scheduler started (live every {:?}, discovery every {:?} for {:?})",
        settings.live_interval, settings.discovery_interval, settings.discovery_sports
    );

    let live = {
        let updater = Arc::clone(&updater);
        let period = settings.live_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                updater.sync_live_matches().await;
            }
        })
    };

    let discovery = {
        let sports = settings.discovery_sports;
        let period = settings.discovery_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                updater.discover_upcoming(&sports).await;
            }
        })
    };

    SchedulerHandle { live, discovery }
}
