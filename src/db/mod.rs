use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

/// Persistence operations the synchronization loop depends on.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// All matches currently in the given lifecycle state.
    async fn find_by_status(&self, status: MatchStatus) -> Result<Vec<Match>>;

    async fn find_by_id(&self, match_id: &str) -> Result<Option<Match>>;

    /// Merge a partial update into an existing match and stamp `last_updated`.
    /// Returns `None` if no match with this ID exists; never creates one.
    async fn upsert(
        &self,
        match_id: &str,
        update: &MatchUpdate,
        last_updated: DateTime<Utc>,
    ) -> Result<Option<Match>>;

    /// Insert a brand-new match. Fails if the ID is already taken.
    async fn insert(&self, new_match: &Match) -> Result<Match>;
}

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Fresh in-memory database, used by tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))
    }

    // ── Read API queries ──────────────────────────────────────────────────────

    /// Matches filtered by sport and status set, soonest first
    pub fn list_matches(
        &self,
        sport: Option<Sport>,
        statuses: &[MatchStatus],
        limit: i64,
    ) -> Result<Vec<Match>> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(sport) = sport {
            clauses.push("sport = ?".to_string());
            args.push(Value::Text(sport.as_str().to_string()));
        }
        if !statuses.is_empty() {
            let marks = vec!["?"; statuses.len()].join(", ");
            clauses.push(format!("status IN ({})", marks));
            args.extend(statuses.iter().map(|s| Value::Text(s.as_str().to_string())));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        args.push(Value::Integer(limit));
        let sql = format!(
            "SELECT {} FROM matches {} ORDER BY start_time ASC, status ASC LIMIT ?",
            MATCH_COLUMNS, where_sql
        );
        self.query_matches(&sql, args)
    }

    /// Scheduled matches starting within the next `days` days
    pub fn list_upcoming(&self, sport: Option<Sport>, days: i64) -> Result<Vec<Match>> {
        let now = Utc::now();
        self.list_in_window(sport, MatchStatus::Scheduled, now, now + Duration::days(days), "ASC")
    }

    /// Finished matches that started within the last `days` days, newest first
    pub fn list_recent_finished(&self, sport: Option<Sport>, days: i64) -> Result<Vec<Match>> {
        let now = Utc::now();
        self.list_in_window(sport, MatchStatus::Finished, now - Duration::days(days), now, "DESC")
    }

    fn list_in_window(
        &self,
        sport: Option<Sport>,
        status: MatchStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        order: &str,
    ) -> Result<Vec<Match>> {
        let mut args = vec![
            Value::Text(status.as_str().to_string()),
            Value::Text(format_timestamp(from)),
            Value::Text(format_timestamp(to)),
        ];
        let sport_sql = match sport {
            Some(sport) => {
                args.push(Value::Text(sport.as_str().to_string()));
                "AND sport = ?"
            }
            None => "",
        };
        let sql = format!(
            "SELECT {} FROM matches
             WHERE status = ? AND start_time >= ? AND start_time <= ? {}
             ORDER BY start_time {} LIMIT 50",
            MATCH_COLUMNS, sport_sql, order
        );
        self.query_matches(&sql, args)
    }

    /// Matches where either side's name contains `team` (case-insensitive)
    pub fn list_by_team(&self, team: &str) -> Result<Vec<Match>> {
        let escaped = team
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let sql = format!(
            "SELECT {} FROM matches
             WHERE home_team_name LIKE ?1 ESCAPE '\\' OR away_team_name LIKE ?1 ESCAPE '\\'
             ORDER BY start_time DESC LIMIT 20",
            MATCH_COLUMNS
        );
        self.query_matches(&sql, vec![Value::Text(pattern)])
    }

    fn query_matches(&self, sql: &str, args: Vec<Value>) -> Result<Vec<Match>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let matches = stmt
            .query_map(params_from_iter(args), map_match)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches)
    }
}

#[async_trait]
impl MatchStore for Database {
    async fn find_by_status(&self, status: MatchStatus) -> Result<Vec<Match>> {
        let sql = format!(
            "SELECT {} FROM matches WHERE status = ?1 ORDER BY start_time ASC",
            MATCH_COLUMNS
        );
        self.query_matches(&sql, vec![Value::Text(status.as_str().to_string())])
    }

    async fn find_by_id(&self, match_id: &str) -> Result<Option<Match>> {
        let conn = self.conn()?;
        select_match(&conn, match_id)
    }

    async fn upsert(
        &self,
        match_id: &str,
        update: &MatchUpdate,
        last_updated: DateTime<Utc>,
    ) -> Result<Option<Match>> {
        let conn = self.conn()?;
        let Some(mut existing) = select_match(&conn, match_id)? else {
            return Ok(None);
        };
        existing.apply(update);
        existing.last_updated = last_updated;
        conn.execute(
            "UPDATE matches SET
                home_team_name=?2, home_score=?3,
                away_team_name=?4, away_score=?5,
                status=?6, live_data=?7, cricket_data=?8, last_updated=?9
             WHERE match_id=?1",
            params![
                existing.match_id,
                existing.home_team.name,
                existing.home_team.score,
                existing.away_team.name,
                existing.away_team.score,
                existing.status,
                to_json(&existing.live_data)?,
                to_json(&existing.cricket_data)?,
                existing.last_updated,
            ],
        )?;
        Ok(Some(existing))
    }

    async fn insert(&self, new_match: &Match) -> Result<Match> {
        let conn = self.conn()?;
        let m = new_match;
        conn.execute(
            "INSERT INTO matches (
                match_id, sport, league,
                home_team_id, home_team_name, home_team_logo, home_score,
                away_team_id, away_team_name, away_team_logo, away_score,
                status, start_time, venue_name, venue_city, venue_country,
                live_data, cricket_data, last_updated, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
            params![
                m.match_id,
                m.sport,
                m.league,
                m.home_team.id,
                m.home_team.name,
                m.home_team.logo,
                m.home_team.score,
                m.away_team.id,
                m.away_team.name,
                m.away_team.logo,
                m.away_team.score,
                m.status,
                m.start_time,
                m.venue.name,
                m.venue.city,
                m.venue.country,
                to_json(&m.live_data)?,
                to_json(&m.cricket_data)?,
                m.last_updated,
                m.created_at,
            ],
        )
        .with_context(|| format!("Failed to insert match {}", m.match_id))?;
        Ok(m.clone())
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const MATCH_COLUMNS: &str = "match_id, sport, league,
    home_team_id, home_team_name, home_team_logo, home_score,
    away_team_id, away_team_name, away_team_logo, away_score,
    status, start_time, venue_name, venue_city, venue_country,
    live_data, cricket_data, last_updated, created_at";

fn select_match(conn: &Connection, match_id: &str) -> Result<Option<Match>> {
    let sql = format!("SELECT {} FROM matches WHERE match_id = ?1", MATCH_COLUMNS);
    let found = conn
        .query_row(&sql, params![match_id], map_match)
        .optional()?;
    Ok(found)
}

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<Match> {
    Ok(Match {
        match_id: row.get(0)?,
        sport: row.get(1)?,
        league: row.get(2)?,
        home_team: Team {
            id: row.get(3)?,
            name: row.get(4)?,
            logo: row.get(5)?,
            score: row.get(6)?,
        },
        away_team: Team {
            id: row.get(7)?,
            name: row.get(8)?,
            logo: row.get(9)?,
            score: row.get(10)?,
        },
        status: row.get(11)?,
        start_time: row.get(12)?,
        venue: Venue {
            name: row.get(13)?,
            city: row.get(14)?,
            country: row.get(15)?,
        },
        live_data: from_json(row, 16)?,
        cricket_data: from_json(row, 17)?,
        last_updated: row.get(18)?,
        created_at: row.get(19)?,
    })
}

/// Same text layout rusqlite uses for `DateTime<Utc>`, so string comparisons
/// in SQL order correctly.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%F %T%.f%:z").to_string()
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize match payload")
}

fn from_json<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

impl ToSql for Sport {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Sport {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

impl ToSql for MatchStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MatchStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS matches (
    match_id        TEXT    PRIMARY KEY,
    sport           TEXT    NOT NULL,
    league          TEXT    NOT NULL,
    home_team_id    TEXT,
    home_team_name  TEXT    NOT NULL,
    home_team_logo  TEXT,
    home_score      INTEGER NOT NULL DEFAULT 0,
    away_team_id    TEXT,
    away_team_name  TEXT    NOT NULL,
    away_team_logo  TEXT,
    away_score      INTEGER NOT NULL DEFAULT 0,
    status          TEXT    NOT NULL DEFAULT 'scheduled',
    start_time      TEXT    NOT NULL,
    venue_name      TEXT,
    venue_city      TEXT,
    venue_country   TEXT,
    live_data       TEXT,
    cricket_data    TEXT,
    last_updated    TEXT    NOT NULL,
    created_at      TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_matches_sport_status ON matches(sport, status, start_time);
CREATE INDEX IF NOT EXISTS idx_matches_start_time ON matches(start_time);
"#;
