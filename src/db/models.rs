use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sports a match can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Cricket,
    Football,
    Basketball,
    Tennis,
    Baseball,
    Hockey,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Cricket,
        Sport::Football,
        Sport::Basketball,
        Sport::Tennis,
        Sport::Baseball,
        Sport::Hockey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Cricket => "cricket",
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Tennis => "tennis",
            Sport::Baseball => "baseball",
            Sport::Hockey => "hockey",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sport::ALL
            .into_iter()
            .find(|sport| sport.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("unknown sport '{}'", s))
    }
}

/// Lifecycle of a match: scheduled → live → finished, with cancelled and
/// postponed reachable from scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Cancelled,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Postponed => "postponed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "finished" => Ok(MatchStatus::Finished),
            "cancelled" => Ok(MatchStatus::Cancelled),
            "postponed" => Ok(MatchStatus::Postponed),
            other => anyhow::bail!("unknown match status '{}'", other),
        }
    }
}

/// One side of a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Option<String>,
    pub name: String,
    pub logo: Option<String>,
    /// Goals, points, runs or sets depending on the sport
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// A home/away pair of statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SidePair {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    pub possession: SidePair,
    pub shots: SidePair,
    pub corners: SidePair,
    pub fouls: SidePair,
}

/// A timeline entry (goal, card, substitution, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
    pub player: Option<String>,
    pub team: Option<String>,
    pub description: String,
}

/// Live payload for ball-and-goal sports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    pub current_time: String,
    pub period: String,
    pub events: Vec<MatchEvent>,
    pub stats: Option<LiveStats>,
}

/// A per-team cricket figure (overs, wickets, run rate)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamFigure<T> {
    pub home_team: T,
    pub away_team: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batsman {
    pub name: String,
    pub runs: u32,
    pub balls: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bowler {
    pub name: String,
    pub overs: f64,
    pub runs: u32,
    pub wickets: u32,
}

/// Live payload for cricket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CricketData {
    pub overs: TeamFigure<f64>,
    pub wickets: TeamFigure<u32>,
    pub run_rate: TeamFigure<f64>,
    pub current_batsmen: Vec<Batsman>,
    pub current_bowler: Option<Bowler>,
}

/// The canonical synchronized match record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Provider event ID, stable across calls
    pub match_id: String,
    pub sport: Sport,
    pub league: String,
    pub home_team: Team,
    pub away_team: Team,
    pub status: MatchStatus,
    pub start_time: DateTime<Utc>,
    pub venue: Venue,
    pub live_data: Option<LiveData>,
    pub cricket_data: Option<CricketData>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Merge a partial provider update into this record.
    ///
    /// Only fields present in the update are touched; `last_updated` is left
    /// to the caller.
    pub fn apply(&mut self, update: &MatchUpdate) {
        update.home_team.apply_to(&mut self.home_team);
        update.away_team.apply_to(&mut self.away_team);
        self.status = update.status;
        if let Some(live) = &update.live_data {
            self.live_data = Some(live.clone());
        }
        if let Some(cricket) = &update.cricket_data {
            self.cricket_data = Some(cricket.clone());
        }
    }
}

/// Team fields a provider snapshot can carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamUpdate {
    /// `None` keeps the stored name
    pub name: Option<String>,
    pub score: u32,
}

impl TeamUpdate {
    fn apply_to(&self, team: &mut Team) {
        if let Some(name) = &self.name {
            team.name = name.clone();
        }
        team.score = self.score;
    }
}

/// Partial match record produced by a per-sport mapper.
///
/// At most one of `live_data` / `cricket_data` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchUpdate {
    pub home_team: TeamUpdate,
    pub away_team: TeamUpdate,
    pub status: MatchStatus,
    pub live_data: Option<LiveData>,
    pub cricket_data: Option<CricketData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Match {
        let now = Utc::now();
        Match {
            match_id: "evt1".into(),
            sport: Sport::Football,
            league: "Premier League".into(),
            home_team: Team { name: "Arsenal".into(), score: 1, ..Default::default() },
            away_team: Team { name: "Chelsea".into(), score: 1, ..Default::default() },
            status: MatchStatus::Live,
            start_time: now,
            venue: Venue::default(),
            live_data: None,
            cricket_data: None,
            last_updated: now,
            created_at: now,
        }
    }

    #[test]
    fn test_apply_keeps_name_when_absent() {
        let mut m = stored();
        m.apply(&MatchUpdate {
            home_team: TeamUpdate { name: None, score: 3 },
            away_team: TeamUpdate { name: Some("Chelsea FC".into()), score: 0 },
            status: MatchStatus::Live,
            live_data: Some(LiveData::default()),
            cricket_data: None,
        });
        assert_eq!(m.home_team.name, "Arsenal");
        assert_eq!(m.home_team.score, 3);
        assert_eq!(m.away_team.name, "Chelsea FC");
        assert!(m.live_data.is_some());
        assert!(m.cricket_data.is_none());
    }

    #[test]
    fn test_sport_from_str() {
        assert_eq!("Football".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!(" hockey ".parse::<Sport>().unwrap(), Sport::Hockey);
        assert!("curling".parse::<Sport>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&MatchStatus::Postponed).unwrap();
        assert_eq!(json, "\"postponed\"");
        assert_eq!("LIVE".parse::<MatchStatus>().unwrap(), MatchStatus::Live);
    }
}
