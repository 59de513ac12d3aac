//! Application routes — student submission/tracking plus staff review.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::guard::Visitor;
use crate::services::application::{self, ApplicationDetail, ApplicationError, ApplicationSummary};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateApplicationBody {
    pub program_id: Uuid,
    pub personal_statement: Option<String>,
}

/// `POST /api/applications` — student creates a draft.
pub async fn create(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(body): Json<CreateApplicationBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let id = application::create_application(
        &state.pool,
        visitor.user.id,
        body.program_id,
        body.personal_statement.as_deref(),
    )
    .await
    .map_err(application_error_to_status)?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `GET /api/applications` — student's own applications.
pub async fn list_mine(
    State(state): State<AppState>,
    visitor: Visitor,
) -> Result<Json<Vec<ApplicationSummary>>, StatusCode> {
    let rows = application::list_for_student(&state.pool, visitor.user.id)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/applications/:id` — one of the student's applications, with
/// its event timeline.
pub async fn get_mine(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationDetail>, StatusCode> {
    let detail = application::get_detail(&state.pool, id, visitor.user.id, visitor.role)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(detail))
}

/// `POST /api/applications/:id/submit` — draft to submitted.
pub async fn submit(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    application::submit(&state.pool, id, visitor.user.id)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `POST /api/applications/:id/withdraw` — draft/submitted to withdrawn.
pub async fn withdraw(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    application::withdraw(&state.pool, id, visitor.user.id)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `POST /api/applications/:id/review` — staff takes a submitted
/// application into review.
pub async fn review(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    application::review(&state.pool, id, visitor.user.id, visitor.role)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `GET /api/agent/applications` — applications of this agent's advisees.
pub async fn list_for_agent(
    State(state): State<AppState>,
    visitor: Visitor,
) -> Result<Json<Vec<ApplicationSummary>>, StatusCode> {
    let rows = application::list_for_agent(&state.pool, visitor.user.id)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(rows))
}

pub(crate) fn application_error_to_status(err: ApplicationError) -> StatusCode {
    match err {
        ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
        ApplicationError::Forbidden(_) => StatusCode::FORBIDDEN,
        ApplicationError::ProgramUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicationError::Duplicate | ApplicationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ApplicationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
