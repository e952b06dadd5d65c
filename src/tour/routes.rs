//! REST endpoints for driving the guided tour.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::model::Answer;
use super::runtime::{AnswerOutcome, TourRuntime};

/// Shared state for tour routes.
#[derive(Clone)]
pub struct TourRouteState {
    pub runtime: TourRuntime,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub field: String,
    pub value: Answer,
}

#[derive(Debug, Deserialize)]
pub struct PageViewRequest {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
}

/// GET /api/tour
///
/// Whether the tour is open, the current step if so, and whether to offer
/// a restart.
async fn get_status(State(state): State<TourRouteState>) -> impl IntoResponse {
    Json(state.runtime.status().await)
}

/// GET /api/tour/profile
///
/// Returns the stored user profile, or 404 if none exists.
async fn get_profile(State(state): State<TourRouteState>) -> impl IntoResponse {
    match state.runtime.profile().await {
        Some(profile) => Json(serde_json::to_value(profile).unwrap_or_default()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile exists yet"})),
        )
            .into_response(),
    }
}

async fn open(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.open().await;
    Json(state.runtime.status().await)
}

async fn next(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.next().await;
    Json(state.runtime.status().await)
}

async fn previous(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.previous().await;
    Json(state.runtime.status().await)
}

async fn jump(
    State(state): State<TourRouteState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    state.runtime.jump(index).await;
    Json(state.runtime.status().await)
}

async fn skip(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.skip().await;
    Json(state.runtime.status().await)
}

async fn close(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.close().await;
    Json(state.runtime.status().await)
}

async fn action(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.invoke_action().await;
    Json(state.runtime.status().await)
}

async fn restart(State(state): State<TourRouteState>) -> impl IntoResponse {
    state.runtime.restart().await;
    Json(state.runtime.status().await)
}

/// POST /api/tour/answer
///
/// Stores the answer and schedules an advance. 422 if the answer doesn't fit
/// the current question.
async fn answer(
    State(state): State<TourRouteState>,
    Json(req): Json<AnswerRequest>,
) -> impl IntoResponse {
    match state.runtime.answer(&req.field, req.value).await {
        AnswerOutcome::Accepted => Json(state.runtime.status().await).into_response(),
        AnswerOutcome::Rejected { reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": reason})),
        )
            .into_response(),
    }
}

/// POST /api/tour/interactions/page-view
async fn page_view(
    State(state): State<TourRouteState>,
    Json(req): Json<PageViewRequest>,
) -> StatusCode {
    state.runtime.record_page_view(&req.path).await;
    StatusCode::NO_CONTENT
}

/// POST /api/tour/interactions/action
async fn user_action(
    State(state): State<TourRouteState>,
    Json(req): Json<ActionRequest>,
) -> StatusCode {
    state.runtime.record_action(&req.action).await;
    StatusCode::NO_CONTENT
}

/// Build the tour REST routes.
pub fn tour_routes(state: TourRouteState) -> Router {
    Router::new()
        .route("/api/tour", get(get_status))
        .route("/api/tour/profile", get(get_profile))
        .route("/api/tour/open", post(open))
        .route("/api/tour/next", post(next))
        .route("/api/tour/previous", post(previous))
        .route("/api/tour/jump/{index}", post(jump))
        .route("/api/tour/skip", post(skip))
        .route("/api/tour/close", post(close))
        .route("/api/tour/action", post(action))
        .route("/api/tour/restart", post(restart))
        .route("/api/tour/answer", post(answer))
        .route("/api/tour/interactions/page-view", post(page_view))
        .route("/api/tour/interactions/action", post(user_action))
        .with_state(state)
}
