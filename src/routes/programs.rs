//! Program catalog routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::guard::Visitor;
use crate::roles::Role;
use crate::services::program::{self, DegreeLevel, ProgramFilter, ProgramSort};
use crate::services::university::{self, UniversityError, UniversityRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProgramListQuery {
    pub country: Option<String>,
    pub level: Option<String>,
    pub field: Option<String>,
    pub q: Option<String>,
    pub max_tuition: Option<i32>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// `GET /api/programs` — browse published programs.
pub async fn list_programs(
    State(state): State<AppState>,
    Query(query): Query<ProgramListQuery>,
) -> Result<Json<program::ProgramPage>, StatusCode> {
    let (page, per_page) = program::page_bounds(query.page, query.per_page);
    let filter = ProgramFilter {
        country: non_empty(query.country),
        level: query.level.as_deref().and_then(DegreeLevel::parse),
        field: non_empty(query.field),
        q: non_empty(query.q),
        max_tuition: query.max_tuition,
        sort: query.sort.as_deref().map(ProgramSort::parse).unwrap_or_default(),
        page,
        per_page,
    };

    let page = program::list_programs(&state.pool, &filter)
        .await
        .map_err(program_error_to_status)?;
    Ok(Json(page))
}

/// `GET /api/programs/:id` — program detail with university.
pub async fn get_program(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<program::ProgramDetail>, StatusCode> {
    let include_unpublished = visitor.role == Role::Admin;
    let detail = program::get_program(&state.pool, id, include_unpublished)
        .await
        .map_err(program_error_to_status)?;
    Ok(Json(detail))
}

/// `GET /api/universities` — universities for filter dropdowns.
pub async fn list_universities(State(state): State<AppState>) -> Result<Json<Vec<UniversityRow>>, StatusCode> {
    let rows = university::list_universities(&state.pool)
        .await
        .map_err(university_error_to_status)?;
    Ok(Json(rows))
}

pub(crate) fn program_error_to_status(err: program::ProgramError) -> StatusCode {
    match err {
        program::ProgramError::NotFound(_) => StatusCode::NOT_FOUND,
        program::ProgramError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn university_error_to_status(err: UniversityError) -> StatusCode {
    match err {
        UniversityError::NotFound(_) => StatusCode::NOT_FOUND,
        UniversityError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
