//! Admin routes — student, university, program, and application
//! management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::guard::Visitor;
use crate::roles::Role;
use crate::routes::applications::application_error_to_status;
use crate::routes::programs::{program_error_to_status, university_error_to_status};
use crate::services::application::{self, ApplicationStatus};
use crate::services::program::{self, DegreeLevel, NewProgram, ProgramPatch};
use crate::services::university::{self, UniversityPatch};
use crate::state::AppState;

// =============================================================================
// STUDENTS
// =============================================================================

#[derive(Serialize)]
pub struct StudentRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub home_country: Option<String>,
    pub target_country: Option<String>,
    pub application_count: i64,
}

/// `GET /api/admin/students` — students with profile and application
/// counts.
pub async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<StudentRow>>, StatusCode> {
    let rows = sqlx::query(
        "SELECT u.id, u.email, u.name,
                to_char(u.created_at, 'YYYY-MM-DD') AS created_at,
                sp.agent_id, ag.name AS agent_name,
                sp.home_country, sp.target_country,
                (SELECT COUNT(*) FROM applications a WHERE a.student_id = u.id) AS application_count
         FROM users u
         LEFT JOIN student_profiles sp ON sp.user_id = u.id
         LEFT JOIN users ag ON ag.id = sp.agent_id
         WHERE u.role = 'student'
         ORDER BY u.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "student listing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let students = rows
        .iter()
        .map(|r| StudentRow {
            id: r.get("id"),
            email: r.get("email"),
            name: r.get("name"),
            created_at: r.get("created_at"),
            agent_id: r.get("agent_id"),
            agent_name: r.get("agent_name"),
            home_country: r.get("home_country"),
            target_country: r.get("target_country"),
            application_count: r.get("application_count"),
        })
        .collect();

    Ok(Json(students))
}

#[derive(Deserialize)]
pub struct UpdateStudentBody {
    pub agent_id: Option<Uuid>,
    pub home_country: Option<String>,
    pub target_country: Option<String>,
}

/// `PATCH /api/admin/students/:id` — assign the advising agent and update
/// profile fields. Absent fields keep their value.
pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(body): Json<UpdateStudentBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let is_student: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'student')")
            .bind(student_id)
            .fetch_one(&state.pool)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !is_student {
        return Err(StatusCode::NOT_FOUND);
    }

    if let Some(agent_id) = body.agent_id {
        let is_agent: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'agent')")
                .bind(agent_id)
                .fetch_one(&state.pool)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if !is_agent {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    sqlx::query(
        "INSERT INTO student_profiles (user_id, agent_id, home_country, target_country)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET
             agent_id = COALESCE($2, student_profiles.agent_id),
             home_country = COALESCE($3, student_profiles.home_country),
             target_country = COALESCE($4, student_profiles.target_country)",
    )
    .bind(student_id)
    .bind(body.agent_id)
    .bind(&body.home_country)
    .bind(&body.target_country)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "student profile update failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct SetUserRoleBody {
    pub role: String,
}

/// `PATCH /api/admin/users/:id/role` — the authoritative role grant.
pub async fn set_user_role(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetUserRoleBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(role) = Role::parse(&body.role) else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(user_id)
        .bind(role.as_str())
        .execute(&state.pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if result.rows_affected() == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    tracing::info!(%user_id, granted = %role, admin = %visitor.user.id, "role granted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// UNIVERSITIES
// =============================================================================

#[derive(Deserialize)]
pub struct CreateUniversityBody {
    pub name: String,
    pub country: String,
    pub city: String,
    pub website: Option<String>,
}

/// `POST /api/admin/universities` — create a university.
pub async fn create_university(
    State(state): State<AppState>,
    Json(body): Json<CreateUniversityBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    if body.name.trim().is_empty() || body.country.trim().is_empty() || body.city.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let id = university::create_university(
        &state.pool,
        body.name.trim(),
        body.country.trim(),
        body.city.trim(),
        body.website.as_deref(),
    )
    .await
    .map_err(university_error_to_status)?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `PATCH /api/admin/universities/:id` — update fields.
pub async fn update_university(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UniversityPatch>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    university::update_university(&state.pool, id, &patch)
        .await
        .map_err(university_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/admin/universities/:id` — delete with cascading programs.
pub async fn delete_university(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    university::delete_university(&state.pool, id)
        .await
        .map_err(university_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// PROGRAMS
// =============================================================================

#[derive(Deserialize)]
pub struct CreateProgramBody {
    pub university_id: Uuid,
    pub name: String,
    pub degree_level: String,
    pub field: String,
    pub language: Option<String>,
    pub duration_months: i32,
    pub tuition_per_year_usd: i32,
    pub application_deadline: String,
}

/// `POST /api/admin/programs` — create a program.
pub async fn create_program(
    State(state): State<AppState>,
    Json(body): Json<CreateProgramBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let Some(degree_level) = DegreeLevel::parse(&body.degree_level) else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };
    if body.name.trim().is_empty()
        || body.field.trim().is_empty()
        || body.duration_months <= 0
        || body.tuition_per_year_usd < 0
        || !program::valid_iso_date(&body.application_deadline)
    {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let new = NewProgram {
        university_id: body.university_id,
        name: body.name.trim().to_owned(),
        degree_level,
        field: body.field.trim().to_owned(),
        language: body.language.unwrap_or_else(|| "English".to_owned()),
        duration_months: body.duration_months,
        tuition_per_year_usd: body.tuition_per_year_usd,
        application_deadline: body.application_deadline,
    };
    let id = program::create_program(&state.pool, &new)
        .await
        .map_err(program_error_to_status)?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

#[derive(Deserialize)]
pub struct UpdateProgramBody {
    pub name: Option<String>,
    pub field: Option<String>,
    pub language: Option<String>,
    pub duration_months: Option<i32>,
    pub tuition_per_year_usd: Option<i32>,
    pub application_deadline: Option<String>,
    pub is_published: Option<bool>,
}

/// `PATCH /api/admin/programs/:id` — update fields, including
/// publish/unpublish.
pub async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProgramBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Some(deadline) = &body.application_deadline {
        if !program::valid_iso_date(deadline) {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    let patch = ProgramPatch {
        name: body.name,
        field: body.field,
        language: body.language,
        duration_months: body.duration_months,
        tuition_per_year_usd: body.tuition_per_year_usd,
        application_deadline: body.application_deadline,
        is_published: body.is_published,
    };
    program::update_program(&state.pool, id, &patch)
        .await
        .map_err(program_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/admin/programs/:id` — delete a program.
pub async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    program::delete_program(&state.pool, id)
        .await
        .map_err(program_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// =============================================================================
// APPLICATIONS
// =============================================================================

#[derive(Deserialize)]
pub struct AdminApplicationsQuery {
    pub status: Option<String>,
}

/// `GET /api/admin/applications` — all applications, optionally filtered
/// by status.
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<AdminApplicationsQuery>,
) -> Result<Json<Vec<application::ApplicationSummary>>, StatusCode> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(ApplicationStatus::parse(raw).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?),
    };

    let rows = application::list_all(&state.pool, status)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/admin/applications/:id` — any application with its timeline.
pub async fn get_application(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<application::ApplicationDetail>, StatusCode> {
    let detail = application::get_detail(&state.pool, id, visitor.user.id, visitor.role)
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct DecisionBody {
    pub status: String,
    pub note: Option<String>,
}

/// `POST /api/admin/applications/:id/decision` — accept or reject.
pub async fn decide_application(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let decision = ApplicationStatus::parse(&body.status).ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    if !decision.is_decided() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    application::decide(&state.pool, id, visitor.user.id, decision, body.note.as_deref())
        .await
        .map_err(application_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
