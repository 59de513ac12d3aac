//! Application lifecycle — submission, tracking, review, decisions.
//!
//! DESIGN
//! ======
//! The status machine is a pure transition table; every mutation funnels
//! through `apply_transition`, which updates the row conditionally on its
//! current status and appends an `application_events` audit row. A stale
//! status (raced by another actor) surfaces as an invalid transition
//! rather than silently overwriting.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::roles::Role;

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("application not found: {0}")]
    NotFound(Uuid),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("program unavailable")]
    ProgramUnavailable,
    #[error("an active application for this program already exists")]
    Duplicate,
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition { from: ApplicationStatus, to: ApplicationStatus },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// STATUS MACHINE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// A decision has been made; the application is read-only for the
    /// student.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// No further transitions leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Withdrawn)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full transition table. Everything not listed is invalid.
#[must_use]
pub const fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    matches!(
        (from, to),
        (ApplicationStatus::Draft, ApplicationStatus::Submitted)
            | (ApplicationStatus::Submitted, ApplicationStatus::UnderReview)
            | (ApplicationStatus::UnderReview, ApplicationStatus::Accepted)
            | (ApplicationStatus::UnderReview, ApplicationStatus::Rejected)
            | (ApplicationStatus::Draft, ApplicationStatus::Withdrawn)
            | (ApplicationStatus::Submitted, ApplicationStatus::Withdrawn)
    )
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub program_id: Uuid,
    pub program_name: String,
    pub university_name: String,
    pub country: String,
    pub status: ApplicationStatus,
    pub student_id: Uuid,
    pub student_name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApplicationEvent {
    pub from_status: String,
    pub to_status: String,
    pub actor_name: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub summary: ApplicationSummary,
    pub personal_statement: Option<String>,
    pub events: Vec<ApplicationEvent>,
}

// =============================================================================
// CREATE / LIST
// =============================================================================

/// Create a draft application for a published program. Also makes sure the
/// student has a profile row, since the advising-agent link hangs off it.
///
/// # Errors
///
/// `ProgramUnavailable` for unknown/unpublished programs, `Duplicate` when
/// a non-withdrawn application for the pair exists, or a database error.
pub async fn create_application(
    pool: &PgPool,
    student_id: Uuid,
    program_id: Uuid,
    personal_statement: Option<&str>,
) -> Result<Uuid, ApplicationError> {
    let available: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM programs WHERE id = $1 AND is_published)")
        .bind(program_id)
        .fetch_one(pool)
        .await?;
    if !available {
        return Err(ApplicationError::ProgramUnavailable);
    }

    let duplicate: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM applications
            WHERE student_id = $1 AND program_id = $2 AND status <> 'withdrawn'
        )",
    )
    .bind(student_id)
    .bind(program_id)
    .fetch_one(pool)
    .await?;
    if duplicate {
        return Err(ApplicationError::Duplicate);
    }

    sqlx::query("INSERT INTO student_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(student_id)
        .execute(pool)
        .await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO applications (id, student_id, program_id, personal_statement) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(student_id)
    .bind(program_id)
    .bind(personal_statement)
    .execute(pool)
    .await?;

    tracing::info!(application_id = %id, %student_id, %program_id, "application created");
    Ok(id)
}

const SUMMARY_SELECT: &str = "SELECT a.id, a.program_id, p.name AS program_name,
        un.name AS university_name, un.country, a.status,
        a.student_id, su.name AS student_name,
        to_char(a.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at,
        to_char(a.updated_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS updated_at
 FROM applications a
 JOIN programs p ON p.id = a.program_id
 JOIN universities un ON un.id = p.university_id
 JOIN users su ON su.id = a.student_id";

fn summary_from_row(r: &sqlx::postgres::PgRow) -> ApplicationSummary {
    ApplicationSummary {
        id: r.get("id"),
        program_id: r.get("program_id"),
        program_name: r.get("program_name"),
        university_name: r.get("university_name"),
        country: r.get("country"),
        status: ApplicationStatus::parse(r.get::<String, _>("status").as_str())
            .unwrap_or(ApplicationStatus::Draft),
        student_id: r.get("student_id"),
        student_name: r.get("student_name"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

/// List a student's own applications, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_student(pool: &PgPool, student_id: Uuid) -> Result<Vec<ApplicationSummary>, ApplicationError> {
    let rows = sqlx::query(&format!("{SUMMARY_SELECT} WHERE a.student_id = $1 ORDER BY a.created_at DESC"))
        .bind(student_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

/// List applications of every student advised by the given agent.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_agent(pool: &PgPool, agent_id: Uuid) -> Result<Vec<ApplicationSummary>, ApplicationError> {
    let rows = sqlx::query(&format!(
        "{SUMMARY_SELECT}
         JOIN student_profiles sp ON sp.user_id = a.student_id
         WHERE sp.agent_id = $1
         ORDER BY a.updated_at DESC"
    ))
    .bind(agent_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

/// List all applications, optionally filtered by status (admin screens).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_all(
    pool: &PgPool,
    status: Option<ApplicationStatus>,
) -> Result<Vec<ApplicationSummary>, ApplicationError> {
    let rows = sqlx::query(&format!(
        "{SUMMARY_SELECT} WHERE $1::text IS NULL OR a.status = $1 ORDER BY a.updated_at DESC"
    ))
    .bind(status.map(ApplicationStatus::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

/// Fetch one application with its event timeline.
///
/// `viewer` scopes visibility: students see only their own, agents only
/// their advisees', admins everything. Rows outside the viewer's scope
/// read as not found.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn get_detail(
    pool: &PgPool,
    id: Uuid,
    viewer_id: Uuid,
    viewer_role: Role,
) -> Result<ApplicationDetail, ApplicationError> {
    let scope = match viewer_role {
        Role::Student => " WHERE a.id = $1 AND a.student_id = $2",
        Role::Agent => {
            " JOIN student_profiles sp ON sp.user_id = a.student_id WHERE a.id = $1 AND sp.agent_id = $2"
        }
        Role::Admin => " WHERE a.id = $1 AND $2::uuid IS NOT NULL",
    };
    let row = sqlx::query(&format!("{SUMMARY_SELECT}{scope}"))
        .bind(id)
        .bind(viewer_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApplicationError::NotFound(id))?;

    let statement: Option<String> = sqlx::query_scalar("SELECT personal_statement FROM applications WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    let event_rows = sqlx::query(
        "SELECT e.from_status, e.to_status, u.name AS actor_name, e.note,
                to_char(e.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at
         FROM application_events e
         LEFT JOIN users u ON u.id = e.actor_id
         WHERE e.application_id = $1
         ORDER BY e.id ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let events = event_rows
        .into_iter()
        .map(|r| ApplicationEvent {
            from_status: r.get("from_status"),
            to_status: r.get("to_status"),
            actor_name: r.get("actor_name"),
            note: r.get("note"),
            created_at: r.get("created_at"),
        })
        .collect();

    Ok(ApplicationDetail { summary: summary_from_row(&row), personal_statement: statement, events })
}

// =============================================================================
// TRANSITIONS
// =============================================================================

async fn load_status(pool: &PgPool, id: Uuid) -> Result<(Uuid, ApplicationStatus), ApplicationError> {
    let row = sqlx::query("SELECT student_id, status FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApplicationError::NotFound(id))?;
    let status = ApplicationStatus::parse(row.get::<String, _>("status").as_str())
        .unwrap_or(ApplicationStatus::Draft);
    Ok((row.get("student_id"), status))
}

/// Conditionally move the row and append the audit event. The UPDATE is
/// guarded on the expected current status, so a concurrent transition
/// loses cleanly instead of clobbering.
async fn apply_transition(
    pool: &PgPool,
    id: Uuid,
    from: ApplicationStatus,
    to: ApplicationStatus,
    actor_id: Uuid,
    note: Option<&str>,
) -> Result<(), ApplicationError> {
    if !can_transition(from, to) {
        return Err(ApplicationError::InvalidTransition { from, to });
    }

    let result = sqlx::query("UPDATE applications SET status = $2, updated_at = now() WHERE id = $1 AND status = $3")
        .bind(id)
        .bind(to.as_str())
        .bind(from.as_str())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApplicationError::InvalidTransition { from, to });
    }

    sqlx::query(
        "INSERT INTO application_events (application_id, from_status, to_status, actor_id, note)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(actor_id)
    .bind(note)
    .execute(pool)
    .await?;

    tracing::info!(application_id = %id, %from, %to, %actor_id, "application transitioned");
    Ok(())
}

/// Student submits their draft.
///
/// # Errors
///
/// `NotFound` for rows the student does not own, `InvalidTransition`
/// outside draft, or a database error.
pub async fn submit(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<(), ApplicationError> {
    let (owner, status) = load_status(pool, id).await?;
    if owner != student_id {
        return Err(ApplicationError::NotFound(id));
    }
    apply_transition(pool, id, status, ApplicationStatus::Submitted, student_id, None).await
}

/// Student withdraws a draft or submitted application.
///
/// # Errors
///
/// `NotFound` for rows the student does not own, `InvalidTransition` from
/// later statuses, or a database error.
pub async fn withdraw(pool: &PgPool, id: Uuid, student_id: Uuid) -> Result<(), ApplicationError> {
    let (owner, status) = load_status(pool, id).await?;
    if owner != student_id {
        return Err(ApplicationError::NotFound(id));
    }
    apply_transition(pool, id, status, ApplicationStatus::Withdrawn, student_id, None).await
}

/// Staff takes a submitted application into review. Agents may only review
/// their own advisees; admins may review anything.
///
/// # Errors
///
/// `Forbidden` for an agent outside their advisees, `InvalidTransition`
/// outside submitted, or a database error.
pub async fn review(pool: &PgPool, id: Uuid, actor_id: Uuid, actor_role: Role) -> Result<(), ApplicationError> {
    let (student_id, status) = load_status(pool, id).await?;

    if actor_role == Role::Agent {
        let advises: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM student_profiles WHERE user_id = $1 AND agent_id = $2)",
        )
        .bind(student_id)
        .bind(actor_id)
        .fetch_one(pool)
        .await?;
        if !advises {
            return Err(ApplicationError::Forbidden("not the advising agent"));
        }
    }

    apply_transition(pool, id, status, ApplicationStatus::UnderReview, actor_id, None).await
}

/// Admin records the final decision.
///
/// # Errors
///
/// `InvalidTransition` when the target is not a decision status or the
/// application is not under review, or a database error.
pub async fn decide(
    pool: &PgPool,
    id: Uuid,
    admin_id: Uuid,
    decision: ApplicationStatus,
    note: Option<&str>,
) -> Result<(), ApplicationError> {
    let (_, status) = load_status(pool, id).await?;
    if !decision.is_decided() {
        return Err(ApplicationError::InvalidTransition { from: status, to: decision });
    }
    apply_transition(pool, id, status, decision, admin_id, note).await
}

#[cfg(test)]
#[path = "application_test.rs"]
mod tests;
