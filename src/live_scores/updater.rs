use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::mapper::{map_upcoming_event, mapper_for, upcoming_events, MapperFn};
use super::provider::ScoreProvider;
use crate::db::models::{Match, MatchStatus, Sport};
use crate::db::MatchStore;
use crate::notifier::ChangeNotifier;

/// Why a single match could not be synchronized. Logged, never propagated
/// out of a cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("provider request failed: {0:#}")]
    Provider(anyhow::Error),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("store operation failed: {0:#}")]
    Store(anyhow::Error),
}

/// Result of synchronizing one match.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Stored and published
    Updated(Box<Match>),
    /// Provider had no event for this match
    NoUpdate,
    /// Sport has no live mapper
    Skipped,
    Failed(SyncError),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub live: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub updated_ids: Vec<String>,
    /// `"<match_id>: <error>"` per failed match
    pub failures: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DiscoveryReport {
    pub sports_checked: usize,
    pub sports_failed: usize,
    pub created: usize,
    pub existing: usize,
    /// Events without an ID or start time
    pub unusable: usize,
    pub failed: usize,
}

/// Synchronizes persisted matches with provider data and publishes changes.
pub struct MatchUpdater {
    provider: Arc<dyn ScoreProvider>,
    store: Arc<dyn MatchStore>,
    notifier: Arc<dyn ChangeNotifier>,
    provider_timeout: Duration,
    /// Held for the whole of a live cycle so scheduled and manual cycles
    /// never sync the same match concurrently.
    live_cycle: Mutex<()>,
}

impl MatchUpdater {
    pub fn new(
        provider: Arc<dyn ScoreProvider>,
        store: Arc<dyn MatchStore>,
        notifier: Arc<dyn ChangeNotifier>,
        provider_timeout: Duration,
    ) -> Self {
        MatchUpdater {
            provider,
            store,
            notifier,
            provider_timeout,
            live_cycle: Mutex::new(()),
        }
    }

    /// Synchronize one match. Failures are logged and reported in the
    /// outcome; they never escape.
    pub async fn sync_match(&self, m: &Match) -> SyncOutcome {
        let Some(mapper) = mapper_for(m.sport) else {
            info!("Sport {} not supported for live updates (match {})", m.sport, m.match_id);
            return SyncOutcome::Skipped;
        };

        match self.fetch_and_store(m, mapper).await {
            Ok(Some(merged)) => {
                info!(
                    "Updated match {} ({}): {} {}-{} {} [{}]",
                    merged.match_id,
                    merged.sport,
                    merged.home_team.name,
                    merged.home_team.score,
                    merged.away_team.score,
                    merged.away_team.name,
                    merged.status
                );
                SyncOutcome::Updated(Box::new(merged))
            }
            Ok(None) => SyncOutcome::NoUpdate,
            Err(e) => {
                error!("Error updating match {} ({}): {}", m.match_id, m.sport, e);
                SyncOutcome::Failed(e)
            }
        }
    }

    async fn fetch_and_store(
        &self,
        m: &Match,
        mapper: MapperFn,
    ) -> Result<Option<Match>, SyncError> {
        let raw = tokio::time::timeout(
            self.provider_timeout,
            self.provider.fetch_live_event(m.sport, &m.match_id),
        )
        .await
        .map_err(|_| SyncError::Timeout(self.provider_timeout))?
        .map_err(SyncError::Provider)?;

        let Some(update) = mapper(&raw) else {
            debug!("No provider event for match {} ({}) this cycle", m.match_id, m.sport);
            return Ok(None);
        };

        let merged = self
            .store
            .upsert(&m.match_id, &update, Utc::now())
            .await
            .map_err(SyncError::Store)?;

        match merged {
            Some(merged) => {
                self.notifier.publish(&merged.match_id, &merged);
                Ok(Some(merged))
            }
            None => {
                warn!(
                    "Match {} ({}) disappeared from the store before update",
                    m.match_id, m.sport
                );
                Ok(None)
            }
        }
    }

    /// Fast cycle: sync every live match. Matches run concurrently and
    /// independently; one failure never stops the others.
    ///
    /// A call made while another live cycle is running waits for it to finish.
    pub async fn sync_live_matches(&self) -> CycleReport {
        let _cycle = self.live_cycle.lock().await;
        let live = match self.store.find_by_status(MatchStatus::Live).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Failed to load live matches: {:#}", e);
                return CycleReport::default();
            }
        };

        let mut report = CycleReport {
            live: live.len(),
            ..Default::default()
        };
        if live.is_empty() {
            debug!("No live matches to update");
            return report;
        }

        let outcomes = join_all(live.iter().map(|m| self.sync_match(m))).await;
        for (m, outcome) in live.iter().zip(outcomes) {
            match outcome {
                SyncOutcome::Updated(merged) => {
                    report.updated += 1;
                    report.updated_ids.push(merged.match_id);
                }
                SyncOutcome::NoUpdate => report.unchanged += 1,
                SyncOutcome::Skipped => report.skipped += 1,
                SyncOutcome::Failed(e) => {
                    report.failed += 1;
                    report.failures.push(format!("{}: {}", m.match_id, e));
                }
            }
        }

        info!(
            "Live cycle: {} live, {} updated, {} unchanged, {} skipped, {} failed",
            report.live, report.updated, report.unchanged, report.skipped, report.failed
        );
        report
    }

    /// Slow cycle: create scheduled matches for upcoming events not yet
    /// stored. A failing sport does not stop the others.
    pub async fn discover_upcoming(&self, sports: &[Sport]) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for &sport in sports {
            report.sports_checked += 1;
            let raw = match tokio::time::timeout(
                self.provider_timeout,
                self.provider.fetch_upcoming_events(sport),
            )
            .await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!("Error fetching upcoming {} matches: {:#}", sport, e);
                    report.sports_failed += 1;
                    continue;
                }
                Err(_) => {
                    warn!(
                        "Fetching upcoming {} matches timed out after {:?}",
                        sport, self.provider_timeout
                    );
                    report.sports_failed += 1;
                    continue;
                }
            };

            let now = Utc::now();
            for ev in upcoming_events(&raw) {
                let Some(new_match) = map_upcoming_event(sport, ev, now) else {
                    report.unusable += 1;
                    continue;
                };
                self.save_upcoming(&new_match, &mut report).await;
            }
        }

        info!(
            "Discovery: {} sport(s), {} created, {} already known, {} failed",
            report.sports_checked, report.created, report.existing, report.failed
        );
        report
    }

    async fn save_upcoming(&self, new_match: &Match, report: &mut DiscoveryReport) {
        match self.store.find_by_id(&new_match.match_id).await {
            Ok(Some(_)) => report.existing += 1,
            Ok(None) => match self.store.insert(new_match).await {
                Ok(saved) => {
                    info!(
                        "Saved upcoming {} match {}: {} vs {}",
                        saved.sport, saved.match_id, saved.home_team.name, saved.away_team.name
                    );
                    report.created += 1;
                }
                Err(e) => {
                    error!("Error saving upcoming match {}: {:#}", new_match.match_id, e);
                    report.failed += 1;
                }
            },
            Err(e) => {
                error!("Error looking up match {}: {:#}", new_match.match_id, e);
                report.failed += 1;
            }
        }
    }
}
