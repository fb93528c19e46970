//! Live match synchronization.
//!
//! ```text
//!  SyncScheduler ──every 30s──▶ MatchUpdater::sync_live_matches
//!        │                         │ ScoreProvider (HTTP, timeout)
//!        │                         │ mapper (pure, per sport)
//!        │                         │ MatchStore::upsert
//!        │                         ▼ ChangeNotifier::publish(match_id)
//!        └────every 1h───▶ MatchUpdater::discover_upcoming
//!                                  │ ScoreProvider (next events)
//!                                  ▼ MatchStore::insert (new IDs only)
//! ```

pub mod mapper;
pub mod provider;
pub mod scheduler;
pub mod sportsdb;
pub mod updater;

#[cfg(test)]
pub(crate) mod fakes;

pub use provider::ScoreProvider;
pub use scheduler::{start_sync_scheduler, SyncSettings};
pub use sportsdb::{HttpScoreProvider, ProviderSettings};
pub use updater::MatchUpdater;
