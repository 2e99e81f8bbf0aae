//! HTTP route definitions

use axum::{
    extract::{Extension, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::middleware::{require_auth, AuthenticatedUser};
use crate::matchmaking::{JoinOutcome, QueueEntry};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{FighterKind, StageKind};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/matchmaking/join", post(matchmaking_join_handler))
        .route("/matchmaking/cancel", post(matchmaking_cancel_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    queue_size: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_size = state.matchmaking.queue_size().await;

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        queue_size,
    })
}

// ============================================================================
// Matchmaking endpoints
// ============================================================================

#[derive(Deserialize)]
struct JoinQueueRequest {
    fighter: FighterKind,
    #[serde(default)]
    stage: StageKind,
}

#[derive(Serialize)]
struct JoinQueueResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_id: Option<Uuid>,
    ws_url: String,
}

async fn matchmaking_join_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<JoinQueueRequest>,
) -> Result<Json<JoinQueueResponse>, AppError> {
    // Queue rows and presence updates both point at the profile row
    let default_name = format!("Fighter_{}", &auth.user_id.to_string()[..8]);
    state
        .presence_store
        .ensure_profile(auth.user_id, &default_name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let entry = QueueEntry::new(auth.user_id, req.fighter, req.stage);
    let outcome = state.matchmaking.join_queue(entry).await;

    let ws_url = format!(
        "{}/ws",
        state
            .config
            .public_base_url
            .replace("https://", "wss://")
            .replace("http://", "ws://")
    );

    let response = match outcome {
        JoinOutcome::Queued | JoinOutcome::AlreadyQueued => JoinQueueResponse {
            status: "queued",
            match_id: None,
            ws_url,
        },
        JoinOutcome::AlreadyInMatch => JoinQueueResponse {
            status: "already_in_match",
            match_id: state.matchmaking.get_player_match(&auth.user_id),
            ws_url,
        },
    };

    Ok(Json(response))
}

#[derive(Serialize)]
struct CancelQueueResponse {
    status: &'static str,
}

async fn matchmaking_cancel_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<CancelQueueResponse>, AppError> {
    let was_queued = state.matchmaking.is_in_queue(&auth.user_id).await;
    state.matchmaking.leave_queue(auth.user_id).await;

    Ok(Json(CancelQueueResponse {
        status: if was_queued { "cancelled" } else { "not_queued" },
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
