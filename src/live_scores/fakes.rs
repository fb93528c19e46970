//! Scripted collaborators for exercising the sync loop without a network.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::provider::ScoreProvider;
use crate::db::models::{Match, Sport};
use crate::notifier::ChangeNotifier;

#[derive(Clone)]
pub enum Scripted {
    Json(Value),
    Fail,
    /// Answer only after the given delay
    Slow(Duration, Value),
}

#[derive(Default)]
pub struct FakeProvider {
    live: Mutex<HashMap<String, Scripted>>,
    upcoming: Mutex<HashMap<Sport, Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight: AtomicUsize,
}

impl FakeProvider {
    pub fn set_live(&self, match_id: &str, response: Scripted) {
        self.live.lock().unwrap().insert(match_id.to_string(), response);
    }

    pub fn set_upcoming(&self, sport: Sport, response: Scripted) {
        self.upcoming.lock().unwrap().insert(sport, response);
    }

    pub fn calls(&self, match_id: &str) -> usize {
        self.calls.lock().unwrap().get(match_id).copied().unwrap_or(0)
    }

    /// Highest number of concurrent fetches seen for any single match.
    pub fn max_in_flight_per_match(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(response: Option<Scripted>) -> Result<Value> {
        match response {
            Some(Scripted::Json(v)) => Ok(v),
            Some(Scripted::Slow(delay, v)) => {
                tokio::time::sleep(delay).await;
                Ok(v)
            }
            Some(Scripted::Fail) => anyhow::bail!("scripted provider failure"),
            None => Ok(serde_json::json!({ "events": null })),
        }
    }
}

#[async_trait]
impl ScoreProvider for FakeProvider {
    async fn fetch_live_event(&self, _sport: Sport, match_id: &str) -> Result<Value> {
        *self.calls.lock().unwrap().entry(match_id.to_string()).or_default() += 1;
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let n = in_flight.entry(match_id.to_string()).or_default();
            *n += 1;
            self.max_in_flight.fetch_max(*n, Ordering::SeqCst);
        }
        let response = self.live.lock().unwrap().get(match_id).cloned();
        let result = Self::answer(response).await;
        *self.in_flight.lock().unwrap().entry(match_id.to_string()).or_default() -= 1;
        result
    }

    async fn fetch_upcoming_events(&self, sport: Sport) -> Result<Value> {
        let response = self.upcoming.lock().unwrap().get(&sport).cloned();
        Self::answer(response).await
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Notifier that remembers every publish.
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<(String, Match)>>,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<(String, Match)> {
        self.published.lock().unwrap().clone()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, topic: &str, payload: &Match) {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.clone()));
    }
}

/// Football snapshot in TheSportsDB `eventslive.php` shape.
pub fn football_snapshot(home: u32, away: u32, status: &str) -> Value {
    serde_json::json!({ "events": [{
        "strHomeTeam": "Arsenal", "intHomeScore": home.to_string(),
        "strAwayTeam": "Chelsea", "intAwayScore": away.to_string(),
        "strStatus": status
    }]})
}
