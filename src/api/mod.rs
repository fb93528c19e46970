use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::db::models::{Match, MatchStatus, Sport};
use crate::db::{Database, MatchStore};
use crate::live_scores::MatchUpdater;
use crate::notifier::{BroadcastNotifier, MatchUpdateEvent};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub updater: Arc<MatchUpdater>,
    pub notifier: Arc<BroadcastNotifier>,
}

type ApiError = (StatusCode, String);

/// Build the Axum router for the read API and the match update feed.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/live-scores", get(list_handler))
        .route("/api/live-scores/live", get(live_handler))
        .route("/api/live-scores/upcoming", get(upcoming_handler))
        .route("/api/live-scores/finished", get(finished_handler))
        .route("/api/live-scores/team/:team", get(team_handler))
        .route("/api/live-scores/refresh", post(refresh_handler))
        .route("/api/matches/:match_id", get(match_handler))
        .route("/ws/matches/:match_id", get(match_feed_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    sport: Option<String>,
    status: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    sport: Option<String>,
    days: Option<i64>,
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn internal(e: anyhow::Error) -> ApiError {
    warn!("Request failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
}

fn parse_sport(raw: Option<&str>) -> Result<Option<Sport>, ApiError> {
    raw.map(|s| s.parse::<Sport>().map_err(|e| bad_request(e.to_string())))
        .transpose()
}

fn parse_days(raw: Option<i64>) -> Result<i64, ApiError> {
    match raw.unwrap_or(7) {
        d @ 1..=30 => Ok(d),
        _ => Err(bad_request("days must be between 1 and 30")),
    }
}

fn matches_body(matches: Vec<Match>) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "matches": matches }))
}

/// GET /api/health
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "OK", "timestamp": Utc::now() }))
}

/// GET /api/live-scores?sport=&status=&limit=
async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sport = parse_sport(q.sport.as_deref())?;
    let statuses = match q.status.as_deref() {
        None => vec![MatchStatus::Live, MatchStatus::Scheduled],
        Some(raw) => match raw.parse::<MatchStatus>() {
            Ok(s @ (MatchStatus::Live | MatchStatus::Scheduled | MatchStatus::Finished)) => vec![s],
            _ => return Err(bad_request("status must be one of live, scheduled, finished")),
        },
    };
    let limit = match q.limit.unwrap_or(20) {
        l @ 1..=50 => l,
        _ => return Err(bad_request("limit must be between 1 and 50")),
    };
    state
        .db
        .list_matches(sport, &statuses, limit)
        .map(matches_body)
        .map_err(internal)
}

/// GET /api/live-scores/live
async fn live_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .find_by_status(MatchStatus::Live)
        .await
        .map(matches_body)
        .map_err(internal)
}

/// GET /api/live-scores/upcoming?sport=&days=
async fn upcoming_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sport = parse_sport(q.sport.as_deref())?;
    let days = parse_days(q.days)?;
    state
        .db
        .list_upcoming(sport, days)
        .map(matches_body)
        .map_err(internal)
}

/// GET /api/live-scores/finished?sport=&days=
async fn finished_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sport = parse_sport(q.sport.as_deref())?;
    let days = parse_days(q.days)?;
    state
        .db
        .list_recent_finished(sport, days)
        .map(matches_body)
        .map_err(internal)
}

/// GET /api/live-scores/team/:team
async fn team_handler(
    State(state): State<Arc<AppState>>,
    Path(team): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.list_by_team(&team).map(matches_body).map_err(internal)
}

/// GET /api/matches/:match_id
async fn match_handler(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.find_by_id(&match_id).await.map_err(internal)? {
        Some(m) => Ok(Json(json!({ "success": true, "match": m }))),
        None => Err((StatusCode::NOT_FOUND, "Match not found".to_string())),
    }
}

/// POST /api/live-scores/refresh: run one live cycle now, after any cycle
/// already in progress.
async fn refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.updater.sync_live_matches().await;
    Json(json!({
        "success": true,
        "message": "Live scores refreshed",
        "report": report,
    }))
}

/// GET /ws/matches/:match_id: stream `matchUpdate` events for one match.
async fn match_feed_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    // Subscribe before the upgrade so nothing published after the
    // handshake is missed.
    let rx = state.notifier.subscribe();
    debug!(
        "Subscriber joining match room {} ({} feed connection(s))",
        match_id,
        state.notifier.subscriber_count()
    );
    ws.on_upgrade(move |socket| forward_updates(socket, match_id, rx))
}

async fn forward_updates(
    mut socket: WebSocket,
    match_id: String,
    mut rx: broadcast::Receiver<MatchUpdateEvent>,
) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) if event.topic == match_id => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode update for {}: {}", match_id, e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber to {} lagged, {} update(s) dropped", match_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
    debug!("Subscriber left match room {}", match_id);
}
