//! HTTP route handlers for the UI API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::debug;

use devfeed::core::snapshot::FeedSnapshot;
use devfeed::core::types::Profile;
use devfeed::session::DecisionOutcome;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/feed", get(get_feed))
        .route("/profiles/{id}", get(get_profile))
        .route("/decisions", post(post_decision))
        .route("/refresh", post(post_refresh))
        .route("/retry", post(post_retry))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/feed - current snapshot.
async fn get_feed(State(state): State<AppState>) -> Json<FeedSnapshot> {
    Json(state.feed.snapshot())
}

/// GET /api/profiles/:id - full profile for the details view.
async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, StatusCode> {
    state.feed.details(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionBody {
    /// Omitted means "whoever is at the head".
    profile_id: Option<String>,
    interested: bool,
}

/// POST /api/decisions - accept or reject the head profile.
///
/// Ignored requests answer 409, backend failures 502; the body always
/// carries the outcome.
async fn post_decision(
    State(state): State<AppState>,
    Json(body): Json<DecisionBody>,
) -> (StatusCode, Json<DecisionOutcome>) {
    debug!(?body, "decision requested");
    let outcome = match &body.profile_id {
        Some(id) => state.feed.decide(id, body.interested).await,
        None => state.feed.decide_head(body.interested).await,
    };
    let status = match &outcome {
        DecisionOutcome::Accepted { .. } => StatusCode::OK,
        DecisionOutcome::Ignored { .. } => StatusCode::CONFLICT,
        DecisionOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome))
}

/// POST /api/refresh - start over from page 1.
async fn post_refresh(State(state): State<AppState>) -> Json<FeedSnapshot> {
    state.feed.refresh().await;
    Json(state.feed.snapshot())
}

/// POST /api/retry - re-issue the failed page request.
async fn post_retry(State(state): State<AppState>) -> Json<FeedSnapshot> {
    state.feed.retry().await;
    Json(state.feed.snapshot())
}
