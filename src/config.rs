use clap::Parser;
use std::time::Duration;

use crate::db::models::Sport;
use crate::live_scores::{ProviderSettings, SyncSettings};

/// Live match synchronization service
#[derive(Parser, Debug, Clone)]
#[command(name = "livescore-sync", version, about)]
pub struct Config {
    /// HTTP listen address for the read API and update feed
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "matches.db")]
    pub database_path: String,

    /// TheSportsDB v1 JSON API base URL
    #[arg(
        long,
        env = "SPORTS_DB_API_URL",
        default_value = "https://www.thesportsdb.com/api/v1/json"
    )]
    pub sports_db_api_url: String,

    /// TheSportsDB API key ("3" is the public free-tier key)
    #[arg(long, env = "SPORTS_DB_API_KEY", default_value = "3")]
    pub sports_db_api_key: String,

    /// CricAPI base URL
    #[arg(long, env = "CRICKET_API_URL", default_value = "https://api.cricapi.com/v1")]
    pub cricket_api_url: String,

    /// CricAPI key (cricket live updates fail without it)
    #[arg(long, env = "CRICKET_API_KEY")]
    pub cricket_api_key: Option<String>,

    /// Live match sync interval in seconds
    #[arg(long, env = "LIVE_SYNC_INTERVAL_SECS", default_value = "30")]
    pub live_sync_interval_secs: u64,

    /// Upcoming match discovery interval in seconds
    #[arg(long, env = "DISCOVERY_INTERVAL_SECS", default_value = "3600")]
    pub discovery_interval_secs: u64,

    /// Timeout for a single provider request in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "10")]
    pub provider_timeout_secs: u64,

    /// Buffered updates per subscriber before the oldest are dropped
    #[arg(long, env = "NOTIFIER_CAPACITY", default_value = "1024")]
    pub notifier_capacity: usize,

    /// Sports polled for upcoming matches
    #[arg(
        long,
        env = "DISCOVERY_SPORTS",
        value_delimiter = ',',
        default_value = "football,cricket,basketball,tennis"
    )]
    pub discovery_sports: Vec<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.live_sync_interval_secs == 0 {
            anyhow::bail!("live_sync_interval_secs must be positive");
        }
        if self.discovery_interval_secs == 0 {
            anyhow::bail!("discovery_interval_secs must be positive");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("provider_timeout_secs must be positive");
        }
        if self.provider_timeout_secs >= self.live_sync_interval_secs {
            anyhow::bail!(
                "provider_timeout_secs ({}) must be shorter than live_sync_interval_secs ({})",
                self.provider_timeout_secs,
                self.live_sync_interval_secs
            );
        }
        if self.notifier_capacity == 0 {
            anyhow::bail!("notifier_capacity must be positive");
        }
        for (name, value) in [
            ("SPORTS_DB_API_URL", &self.sports_db_api_url),
            ("CRICKET_API_URL", &self.cricket_api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", name, value, e))?;
        }
        self.parsed_discovery_sports()?;
        Ok(())
    }

    fn parsed_discovery_sports(&self) -> anyhow::Result<Vec<Sport>> {
        self.discovery_sports
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse())
            .collect()
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            sports_db_url: self.sports_db_api_url.clone(),
            sports_db_key: self.sports_db_api_key.clone(),
            cricket_url: self.cricket_api_url.clone(),
            cricket_key: self.cricket_api_key.clone(),
            timeout: self.provider_timeout(),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn sync_settings(&self) -> anyhow::Result<SyncSettings> {
        Ok(SyncSettings {
            live_interval: Duration::from_secs(self.live_sync_interval_secs),
            discovery_interval: Duration::from_secs(self.discovery_interval_secs),
            discovery_sports: self.parsed_discovery_sports()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["livescore-sync"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        config.validate().unwrap();
        let settings = config.sync_settings().unwrap();
        assert_eq!(settings.live_interval, Duration::from_secs(30));
        assert_eq!(settings.discovery_interval, Duration::from_secs(3600));
        assert_eq!(
            settings.discovery_sports,
            vec![Sport::Football, Sport::Cricket, Sport::Basketball, Sport::Tennis]
        );
    }

    #[test]
    fn test_timeout_must_fit_in_live_interval() {
        let config = parse(&["--live-sync-interval-secs", "5", "--provider-timeout-secs", "5"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_discovery_sport_rejected() {
        let config = parse(&["--discovery-sports", "football,curling"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = parse(&["--sports-db-api-url", "not a url"]);
        assert!(config.validate().is_err());
    }
}
