use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::db::models::Sport;

/// Trait that every live-score provider must implement.
///
/// Providers return raw JSON; shaping it into match fields is the job of
/// the per-sport mappers.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Latest snapshot for one event. The body holds zero or one events.
    async fn fetch_live_event(&self, sport: Sport, match_id: &str) -> Result<Value>;

    /// Upcoming ("next") events for a sport.
    async fn fetch_upcoming_events(&self, sport: Sport) -> Result<Value>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
