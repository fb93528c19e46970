//! Per-sport field mappers.
//!
//! Each mapper turns one provider's raw JSON for a single event into a
//! [`MatchUpdate`]. Mappers are pure and never fail: missing or mistyped
//! optional fields fall back to the model defaults (score 0, empty event
//! list), and a response without an event yields `None`.
//!
//! | sport      | provider                      | payload        |
//! |------------|-------------------------------|----------------|
//! | football   | TheSportsDB `eventslive.php`  | `live_data`    |
//! | basketball | TheSportsDB `eventslive.php`  | `live_data`    |
//! | tennis     | TheSportsDB `eventslive.php`  | `live_data`    |
//! | cricket    | CricAPI `match_info`          | `cricket_data` |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::db::models::{
    CricketData, LiveData, LiveStats, Match, MatchEvent, MatchStatus, MatchUpdate, SidePair,
    Sport, Team, TeamFigure, TeamUpdate, Venue,
};

/// A pure mapper from raw provider JSON to a partial match update.
pub type MapperFn = fn(&Value) -> Option<MatchUpdate>;

/// Select the mapper for a sport. Sports without live coverage return `None`.
pub fn mapper_for(sport: Sport) -> Option<MapperFn> {
    match sport {
        Sport::Football => Some(map_football),
        Sport::Basketball => Some(map_basketball),
        Sport::Tennis => Some(map_tennis),
        Sport::Cricket => Some(map_cricket),
        Sport::Baseball | Sport::Hockey => None,
    }
}

// ── Status vocabularies ──────────────────────────────────────────────────────

/// Status strings reported by TheSportsDB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SportsDbStatus {
    MatchFinished,
    FullTime,
    NotStarted,
    InProgress,
    HalfTime,
    /// Anything outside the table. Mapped to `scheduled`.
    Unrecognized(String),
}

impl SportsDbStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Match Finished" => SportsDbStatus::MatchFinished,
            "Full Time" => SportsDbStatus::FullTime,
            "Not Started" => SportsDbStatus::NotStarted,
            "In Progress" => SportsDbStatus::InProgress,
            "Half Time" => SportsDbStatus::HalfTime,
            other => SportsDbStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn canonical(&self) -> MatchStatus {
        match self {
            SportsDbStatus::MatchFinished | SportsDbStatus::FullTime => MatchStatus::Finished,
            SportsDbStatus::NotStarted => MatchStatus::Scheduled,
            SportsDbStatus::InProgress | SportsDbStatus::HalfTime => MatchStatus::Live,
            SportsDbStatus::Unrecognized(raw) => {
                debug!("Unrecognized TheSportsDB status '{}', defaulting to scheduled", raw);
                MatchStatus::Scheduled
            }
        }
    }
}

/// Status strings reported by CricAPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CricketStatus {
    Completed,
    Live,
    Upcoming,
    /// Anything outside the table. Mapped to `scheduled`.
    Unrecognized(String),
}

impl CricketStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "completed" => CricketStatus::Completed,
            "live" => CricketStatus::Live,
            "upcoming" => CricketStatus::Upcoming,
            other => CricketStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn canonical(&self) -> MatchStatus {
        match self {
            CricketStatus::Completed => MatchStatus::Finished,
            CricketStatus::Live => MatchStatus::Live,
            CricketStatus::Upcoming => MatchStatus::Scheduled,
            CricketStatus::Unrecognized(raw) => {
                debug!("Unrecognized CricAPI status '{}', defaulting to scheduled", raw);
                MatchStatus::Scheduled
            }
        }
    }
}

/// Basketball period labels; unknown progress strings pass through.
fn basketball_period(progress: &str) -> String {
    match progress.trim() {
        "1st Quarter" => "Q1".to_string(),
        "2nd Quarter" => "Q2".to_string(),
        "3rd Quarter" => "Q3".to_string(),
        "4th Quarter" => "Q4".to_string(),
        "Overtime" => "OT".to_string(),
        other => other.to_string(),
    }
}

// ── TheSportsDB mappers ──────────────────────────────────────────────────────

/// The single event of an `eventslive.php` response, if any.
fn first_event(raw: &Value) -> Option<&Value> {
    raw["events"].as_array()?.first().filter(|ev| ev.is_object())
}

fn sportsdb_status(ev: &Value) -> MatchStatus {
    SportsDbStatus::parse(ev["strStatus"].as_str().unwrap_or_default()).canonical()
}

fn sportsdb_team(ev: &Value, name_key: &str, score_keys: &[&str]) -> TeamUpdate {
    TeamUpdate {
        name: str_field(ev, name_key),
        score: score_keys
            .iter()
            .find_map(|k| uint_field(ev, k))
            .unwrap_or_else(|| {
                debug!("No usable {} in provider event, defaulting to 0", score_keys[0]);
                0
            }),
    }
}

pub fn map_football(raw: &Value) -> Option<MatchUpdate> {
    let ev = first_event(raw)?;
    let progress = str_field(ev, "strProgress").unwrap_or_default();
    Some(MatchUpdate {
        home_team: sportsdb_team(ev, "strHomeTeam", &["intHomeScore"]),
        away_team: sportsdb_team(ev, "strAwayTeam", &["intAwayScore"]),
        status: sportsdb_status(ev),
        live_data: Some(LiveData {
            current_time: progress.clone(),
            period: progress,
            events: parse_events(ev["strEvents"].as_str()),
            stats: Some(parse_stats(ev)),
        }),
        cricket_data: None,
    })
}

pub fn map_basketball(raw: &Value) -> Option<MatchUpdate> {
    let ev = first_event(raw)?;
    let progress = str_field(ev, "strProgress").unwrap_or_default();
    Some(MatchUpdate {
        home_team: sportsdb_team(ev, "strHomeTeam", &["intHomeScore"]),
        away_team: sportsdb_team(ev, "strAwayTeam", &["intAwayScore"]),
        status: sportsdb_status(ev),
        live_data: Some(LiveData {
            period: basketball_period(&progress),
            current_time: progress,
            events: parse_events(ev["strEvents"].as_str()),
            stats: None,
        }),
        cricket_data: None,
    })
}

/// Tennis score is sets won.
pub fn map_tennis(raw: &Value) -> Option<MatchUpdate> {
    let ev = first_event(raw)?;
    let progress = str_field(ev, "strProgress").unwrap_or_default();
    Some(MatchUpdate {
        home_team: sportsdb_team(ev, "strHomeTeam", &["intHomeScore", "strHomeScore"]),
        away_team: sportsdb_team(ev, "strAwayTeam", &["intAwayScore", "strAwayScore"]),
        status: sportsdb_status(ev),
        live_data: Some(LiveData {
            current_time: progress.clone(),
            period: progress,
            events: Vec::new(),
            stats: None,
        }),
        cricket_data: None,
    })
}

/// Parse the `"time:description;time:description"` timeline string.
fn parse_events(raw: Option<&str>) -> Vec<MatchEvent> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (time, description) = entry.split_once(':').unwrap_or((entry, ""));
            MatchEvent {
                kind: "event".to_string(),
                time: time.trim().to_string(),
                player: None,
                team: None,
                description: description.trim().to_string(),
            }
        })
        .collect()
}

fn parse_stats(ev: &Value) -> LiveStats {
    let pair = |home: &str, away: &str| SidePair {
        home: uint_field(ev, home).unwrap_or(0),
        away: uint_field(ev, away).unwrap_or(0),
    };
    LiveStats {
        possession: pair("intHomePossession", "intAwayPossession"),
        shots: pair("intHomeShots", "intAwayShots"),
        corners: pair("intHomeCorners", "intAwayCorners"),
        fouls: pair("intHomeFouls", "intAwayFouls"),
    }
}

// ── CricAPI mapper ───────────────────────────────────────────────────────────

pub fn map_cricket(raw: &Value) -> Option<MatchUpdate> {
    let data = raw.get("data").filter(|d| d.is_object())?;
    let team_name = |i: usize| data["teams"].get(i).and_then(|t| t.as_str()).map(str::to_string);
    let innings = |i: usize| data["score"].get(i).filter(|s| s.is_object());

    let runs = |i: usize| innings(i).and_then(|s| uint_field(s, "r")).unwrap_or(0);
    let wickets = |i: usize| innings(i).and_then(|s| uint_field(s, "w")).unwrap_or(0);
    let overs = |i: usize| innings(i).and_then(|s| float_field(s, "o")).unwrap_or(0.0);

    let status = CricketStatus::parse(data["status"].as_str().unwrap_or_default()).canonical();

    Some(MatchUpdate {
        home_team: TeamUpdate { name: team_name(0), score: runs(0) },
        away_team: TeamUpdate { name: team_name(1), score: runs(1) },
        status,
        live_data: None,
        cricket_data: Some(CricketData {
            overs: TeamFigure { home_team: overs(0), away_team: overs(1) },
            wickets: TeamFigure { home_team: wickets(0), away_team: wickets(1) },
            run_rate: TeamFigure {
                home_team: run_rate(runs(0), overs(0)),
                away_team: run_rate(runs(1), overs(1)),
            },
            current_batsmen: Vec::new(),
            current_bowler: None,
        }),
    })
}

/// Runs per over, rounded to two decimals; 0 before the first over.
pub fn run_rate(runs: u32, overs: f64) -> f64 {
    if overs <= 0.0 {
        return 0.0;
    }
    (runs as f64 / overs * 100.0).round() / 100.0
}

// ── Discovery ────────────────────────────────────────────────────────────────

/// Events listed in an `eventsnext.php` response. A `null` list is empty.
pub fn upcoming_events(raw: &Value) -> Vec<&Value> {
    raw["events"]
        .as_array()
        .map(|events| events.iter().filter(|ev| ev.is_object()).collect())
        .unwrap_or_default()
}

/// Build a new scheduled match from a TheSportsDB upcoming event.
///
/// Returns `None` when the event has no ID or no parsable start time.
pub fn map_upcoming_event(sport: Sport, ev: &Value, now: DateTime<Utc>) -> Option<Match> {
    let match_id = str_field(ev, "idEvent")?;
    let Some(start_time) = parse_start_time(ev) else {
        debug!("Upcoming event {} has no parsable start time, skipping", match_id);
        return None;
    };

    let team = |id: &str, name: &str, badge: &str| Team {
        id: str_field(ev, id),
        name: str_field(ev, name).unwrap_or_else(|| "TBD".to_string()),
        logo: str_field(ev, badge),
        score: 0,
    };

    Some(Match {
        match_id,
        sport,
        league: str_field(ev, "strLeague").unwrap_or_else(|| "Unknown".to_string()),
        home_team: team("idHomeTeam", "strHomeTeam", "strHomeTeamBadge"),
        away_team: team("idAwayTeam", "strAwayTeam", "strAwayTeamBadge"),
        status: MatchStatus::Scheduled,
        start_time,
        venue: Venue {
            name: str_field(ev, "strVenue"),
            city: str_field(ev, "strCity"),
            country: str_field(ev, "strCountry"),
        },
        live_data: None,
        cricket_data: None,
        last_updated: now,
        created_at: now,
    })
}

/// `strTimestamp` first, then `dateEvent` + `strTime`, then `dateEvent` at
/// midnight. Times without an offset are taken as UTC.
fn parse_start_time(ev: &Value) -> Option<DateTime<Utc>> {
    if let Some(ts) = str_field(ev, "strTimestamp") {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&ts) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(&str_field(ev, "dateEvent")?, "%Y-%m-%d").ok()?;
    let time = str_field(ev, "strTime")
        .and_then(|t| {
            let t = t.trim_end_matches("+00:00").trim_end_matches('Z');
            NaiveTime::parse_from_str(t, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
                .ok()
        })
        .or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
    Some(date.and_time(time).and_utc())
}

// ── Field helpers ────────────────────────────────────────────────────────────

/// Non-empty string field; numbers are stringified.
fn str_field(v: &Value, key: &str) -> Option<String> {
    match &v[key] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer carried either as a JSON number or a numeric string.
fn uint_field(v: &Value, key: &str) -> Option<u32> {
    match &v[key] {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(v: &Value, key: &str) -> Option<f64> {
    match &v[key] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite() && *f >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_sportsdb_status_table() {
        let table = [
            ("Match Finished", MatchStatus::Finished),
            ("Full Time", MatchStatus::Finished),
            ("Not Started", MatchStatus::Scheduled),
            ("In Progress", MatchStatus::Live),
            ("Half Time", MatchStatus::Live),
        ];
        for (raw, expected) in table {
            assert_eq!(SportsDbStatus::parse(raw).canonical(), expected, "{}", raw);
        }
        assert_eq!(SportsDbStatus::parse("Abandoned").canonical(), MatchStatus::Scheduled);
        assert_eq!(SportsDbStatus::parse("").canonical(), MatchStatus::Scheduled);
        assert_eq!(
            SportsDbStatus::parse("match finished"),
            SportsDbStatus::Unrecognized("match finished".into())
        );
    }

    #[test]
    fn test_cricket_status_table() {
        assert_eq!(CricketStatus::parse("completed").canonical(), MatchStatus::Finished);
        assert_eq!(CricketStatus::parse("live").canonical(), MatchStatus::Live);
        assert_eq!(CricketStatus::parse("upcoming").canonical(), MatchStatus::Scheduled);
        assert_eq!(CricketStatus::parse("rain delay").canonical(), MatchStatus::Scheduled);
    }

    #[test]
    fn test_football_example_snapshot() {
        let raw = json!({"events": [{
            "strHomeTeam": "Arsenal", "intHomeScore": "2",
            "strAwayTeam": "Chelsea", "intAwayScore": "1",
            "strStatus": "Match Finished"
        }]});
        let update = map_football(&raw).unwrap();
        assert_eq!(update.status, MatchStatus::Finished);
        assert_eq!(update.home_team, TeamUpdate { name: Some("Arsenal".into()), score: 2 });
        assert_eq!(update.away_team.score, 1);
        assert!(update.cricket_data.is_none());
        let live = update.live_data.unwrap();
        assert!(live.events.is_empty());
        assert_eq!(live.stats, Some(LiveStats::default()));
    }

    #[test]
    fn test_football_missing_fields_default() {
        let raw = json!({"events": [{"intHomeScore": null, "intAwayScore": -3}]});
        let update = map_football(&raw).unwrap();
        assert_eq!(update.home_team, TeamUpdate { name: None, score: 0 });
        assert_eq!(update.away_team.score, 0);
        assert_eq!(update.status, MatchStatus::Scheduled);
    }

    #[test]
    fn test_football_events_and_stats() {
        let raw = json!({"events": [{
            "intHomeScore": 1, "intAwayScore": 0, "strStatus": "In Progress",
            "strProgress": "55",
            "strEvents": "12:Goal Saka; 40:Yellow card: Rice;",
            "intHomeShots": "9", "intAwayShots": 4, "intHomeCorners": "3"
        }]});
        let live = map_football(&raw).unwrap().live_data.unwrap();
        assert_eq!(live.current_time, "55");
        assert_eq!(live.events.len(), 2);
        assert_eq!(live.events[0].time, "12");
        assert_eq!(live.events[0].description, "Goal Saka");
        assert_eq!(live.events[1].description, "Yellow card: Rice");
        let stats = live.stats.unwrap();
        assert_eq!(stats.shots, SidePair { home: 9, away: 4 });
        assert_eq!(stats.corners, SidePair { home: 3, away: 0 });
    }

    #[test]
    fn test_no_event_yields_none() {
        assert!(map_football(&json!({"events": []})).is_none());
        assert!(map_football(&json!({"events": null})).is_none());
        assert!(map_basketball(&json!({})).is_none());
        assert!(map_tennis(&json!({"events": [null]})).is_none());
        assert!(map_cricket(&json!({"data": null})).is_none());
    }

    #[test]
    fn test_basketball_period_mapping() {
        let raw = json!({"events": [{
            "intHomeScore": "88", "intAwayScore": "91",
            "strStatus": "In Progress", "strProgress": "3rd Quarter"
        }]});
        let live = map_basketball(&raw).unwrap().live_data.unwrap();
        assert_eq!(live.period, "Q3");
        assert_eq!(live.current_time, "3rd Quarter");
        assert!(live.stats.is_none());

        assert_eq!(basketball_period("Overtime"), "OT");
        assert_eq!(basketball_period("Break"), "Break");
    }

    #[test]
    fn test_tennis_sets_from_string_score() {
        let raw = json!({"events": [{
            "strHomeTeam": "Alcaraz", "strHomeScore": "2",
            "strAwayTeam": "Sinner", "strAwayScore": "bad",
            "strStatus": "In Progress"
        }]});
        let update = map_tennis(&raw).unwrap();
        assert_eq!(update.home_team.score, 2);
        assert_eq!(update.away_team.score, 0);
        assert!(update.live_data.unwrap().events.is_empty());
    }

    #[test]
    fn test_cricket_snapshot_populates_only_cricket_data() {
        let raw = json!({"data": {
            "teams": ["India", "Australia"],
            "status": "live",
            "score": [{"r": 180, "w": 4, "o": 20}, {"r": 95, "w": 2, "o": 12.3}]
        }});
        let update = map_cricket(&raw).unwrap();
        assert!(update.live_data.is_none());
        assert_eq!(update.status, MatchStatus::Live);
        assert_eq!(update.home_team, TeamUpdate { name: Some("India".into()), score: 180 });
        assert_eq!(update.away_team.score, 95);
        let cricket = update.cricket_data.unwrap();
        assert_eq!(cricket.wickets.home_team, 4);
        assert_relative_eq!(cricket.overs.away_team, 12.3);
        assert_relative_eq!(cricket.run_rate.home_team, 9.0);
        assert_relative_eq!(cricket.run_rate.away_team, 7.72);
    }

    #[test]
    fn test_cricket_before_first_innings() {
        let raw = json!({"data": {"teams": ["India"], "status": "upcoming"}});
        let update = map_cricket(&raw).unwrap();
        assert_eq!(update.away_team, TeamUpdate { name: None, score: 0 });
        let cricket = update.cricket_data.unwrap();
        assert_relative_eq!(cricket.run_rate.home_team, 0.0);
    }

    #[test]
    fn test_football_snapshot_never_sets_cricket_data() {
        let mappers: [MapperFn; 3] = [map_football, map_basketball, map_tennis];
        for mapper in mappers {
            let update = mapper(&json!({"events": [{"strStatus": "In Progress"}]})).unwrap();
            assert!(update.cricket_data.is_none());
            assert!(update.live_data.is_some());
        }
    }

    #[test]
    fn test_mapper_for_unsupported_sports() {
        assert!(mapper_for(Sport::Baseball).is_none());
        assert!(mapper_for(Sport::Hockey).is_none());
        assert!(mapper_for(Sport::Cricket).is_some());
    }

    #[test]
    fn test_map_upcoming_event() {
        let now = Utc::now();
        let ev = json!({
            "idEvent": "2052711", "strLeague": "English Premier League",
            "idHomeTeam": "133604", "strHomeTeam": "Arsenal",
            "strHomeTeamBadge": "https://example.test/ars.png",
            "idAwayTeam": "133610", "strAwayTeam": "Chelsea",
            "dateEvent": "2026-11-02", "strTime": "16:30:00+00:00",
            "strVenue": "Emirates Stadium", "strCity": "London"
        });
        let m = map_upcoming_event(Sport::Football, &ev, now).unwrap();
        assert_eq!(m.match_id, "2052711");
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.start_time, Utc.with_ymd_and_hms(2026, 11, 2, 16, 30, 0).unwrap());
        assert_eq!(m.home_team.logo.as_deref(), Some("https://example.test/ars.png"));
        assert_eq!(m.venue.name.as_deref(), Some("Emirates Stadium"));
        assert!(m.live_data.is_none() && m.cricket_data.is_none());
    }

    #[test]
    fn test_map_upcoming_event_timestamp_and_rejects() {
        let now = Utc::now();
        let ev = json!({"idEvent": 77, "strTimestamp": "2026-11-02T19:45:00"});
        let m = map_upcoming_event(Sport::Basketball, &ev, now).unwrap();
        assert_eq!(m.match_id, "77");
        assert_eq!(m.home_team.name, "TBD");
        assert_eq!(m.start_time, Utc.with_ymd_and_hms(2026, 11, 2, 19, 45, 0).unwrap());

        let no_id = json!({"dateEvent": "2026-11-02"});
        assert!(map_upcoming_event(Sport::Football, &no_id, now).is_none());
        assert!(map_upcoming_event(Sport::Football, &json!({"idEvent": "1"}), now).is_none());
    }

    #[test]
    fn test_upcoming_events_null_list() {
        assert!(upcoming_events(&json!({"events": null})).is_empty());
        assert_eq!(upcoming_events(&json!({"events": [{"idEvent": "1"}, 3]})).len(), 1);
    }
}
