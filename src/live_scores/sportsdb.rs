use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::provider::ScoreProvider;
use crate::db::models::Sport;

/// Endpoints and credentials for the HTTP score providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// TheSportsDB v1 JSON base, e.g. `https://www.thesportsdb.com/api/v1/json`
    pub sports_db_url: String,
    pub sports_db_key: String,
    /// CricAPI v1 base, e.g. `https://api.cricapi.com/v1`
    pub cricket_url: String,
    pub cricket_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Live-score provider backed by TheSportsDB (football, basketball, tennis,
/// discovery) and CricAPI (cricket).
/// Docs: <https://www.thesportsdb.com/api.php>, <https://cricketdata.org>
pub struct HttpScoreProvider {
    http: Client,
    settings: ProviderSettings,
}

impl HttpScoreProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpScoreProvider { http, settings })
    }

    fn live_event_url(&self, sport: Sport, match_id: &str) -> Result<Url> {
        let s = &self.settings;
        let url = match sport {
            Sport::Cricket => {
                let key = s
                    .cricket_key
                    .as_deref()
                    .context("CRICKET_API_KEY is not configured")?;
                Url::parse_with_params(
                    &format!("{}/match_info", s.cricket_url.trim_end_matches('/')),
                    &[("apikey", key), ("id", match_id)],
                )?
            }
            _ => Url::parse_with_params(
                &format!(
                    "{}/{}/eventslive.php",
                    s.sports_db_url.trim_end_matches('/'),
                    s.sports_db_key
                ),
                &[("id", match_id)],
            )?,
        };
        Ok(url)
    }

    fn upcoming_events_url(&self, sport: Sport) -> Result<Url> {
        let s = &self.settings;
        let url = Url::parse_with_params(
            &format!(
                "{}/{}/eventsnext.php",
                s.sports_db_url.trim_end_matches('/'),
                s.sports_db_key
            ),
            &[("sport", sport.as_str())],
        )?;
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        let shown = self.redact(&url);
        debug!("GET {}", shown);
        // reqwest errors print the full URL, key included
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Request to {} failed", shown))?;

        if !resp.status().is_success() {
            anyhow::bail!("Provider error {} from {}", resp.status(), shown);
        }

        resp.json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to parse response from {}", shown))
    }

    /// Mask both API keys (TheSportsDB path segment, CricAPI `apikey`
    /// query parameter) so a URL can be logged.
    fn redact(&self, url: &Url) -> String {
        let mut shown = url.clone();

        let key = &self.settings.sports_db_key;
        if !key.is_empty() {
            let path = url.path().replace(&format!("/{}/", key), "/***/");
            shown.set_path(&path);
        }

        if url.query_pairs().any(|(k, _)| k == "apikey") {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| {
                    let v = if k == "apikey" { "***".to_string() } else { v.into_owned() };
                    (k.into_owned(), v)
                })
                .collect();
            shown.query_pairs_mut().clear().extend_pairs(pairs);
        }
        shown.to_string()
    }
}

#[async_trait]
impl ScoreProvider for HttpScoreProvider {
    fn name(&self) -> &str {
        "TheSportsDB+CricAPI"
    }

    async fn fetch_live_event(&self, sport: Sport, match_id: &str) -> Result<Value> {
        let url = self.live_event_url(sport, match_id)?;
        self.get_json(url).await
    }

    async fn fetch_upcoming_events(&self, sport: Sport) -> Result<Value> {
        let url = self.upcoming_events_url(sport)?;
        self.get_json(url).await
    }
}
