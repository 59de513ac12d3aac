//! Program catalog — browsing with filters and admin CRUD.
//!
//! DESIGN
//! ======
//! Browsing is a single filtered, sorted, paginated query over published
//! programs joined with their university. Filters compose through a
//! `QueryBuilder` so the same WHERE clause backs both the count and the
//! page query.

use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder, Row};
use uuid::Uuid;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("program not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

/// Degree level a program awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegreeLevel {
    Bachelor,
    Master,
    Phd,
    LanguageCourse,
}

impl DegreeLevel {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "bachelor" => Some(Self::Bachelor),
            "master" => Some(Self::Master),
            "phd" => Some(Self::Phd),
            "language_course" => Some(Self::LanguageCourse),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bachelor => "bachelor",
            Self::Master => "master",
            Self::Phd => "phd",
            Self::LanguageCourse => "language_course",
        }
    }
}

/// Sort key for the catalog. Unknown keys fall back to the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgramSort {
    #[default]
    Deadline,
    Tuition,
    Name,
}

impl ProgramSort {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "tuition" => Self::Tuition,
            "name" => Self::Name,
            _ => Self::Deadline,
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::Deadline => "p.application_deadline ASC, p.name ASC",
            Self::Tuition => "p.tuition_per_year_usd ASC, p.name ASC",
            Self::Name => "p.name ASC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgramFilter {
    pub country: Option<String>,
    pub level: Option<DegreeLevel>,
    pub field: Option<String>,
    /// Case-insensitive substring match on the program name.
    pub q: Option<String>,
    pub max_tuition: Option<i32>,
    pub sort: ProgramSort,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgramSummary {
    pub id: Uuid,
    pub name: String,
    pub university_name: String,
    pub country: String,
    pub city: String,
    pub degree_level: String,
    pub field: String,
    pub language: String,
    pub duration_months: i32,
    pub tuition_per_year_usd: i32,
    pub application_deadline: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgramDetail {
    #[serde(flatten)]
    pub summary: ProgramSummary,
    pub university_id: Uuid,
    pub website: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgramPage {
    pub items: Vec<ProgramSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Clamp raw pagination query values: pages start at 1, page size defaults
/// to 20 and caps at 100.
#[must_use]
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Shape-check an ISO `YYYY-MM-DD` date with plausible month/day ranges.
/// Postgres still validates the actual calendar on insert.
#[must_use]
pub fn valid_iso_date(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| {
        raw.get(range)
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u32>().ok())
    };
    let (Some(_year), Some(month), Some(day)) = (digits(0..4), digits(5..7), digits(8..10)) else {
        return false;
    };
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Escape LIKE wildcards in user-supplied search text.
#[must_use]
pub fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

// =============================================================================
// BROWSING
// =============================================================================

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProgramFilter) {
    builder.push(" WHERE p.is_published");
    if let Some(country) = &filter.country {
        builder.push(" AND u.country = ").push_bind(country.clone());
    }
    if let Some(level) = filter.level {
        builder.push(" AND p.degree_level = ").push_bind(level.as_str());
    }
    if let Some(field) = &filter.field {
        builder.push(" AND p.field = ").push_bind(field.clone());
    }
    if let Some(q) = &filter.q {
        builder
            .push(" AND p.name ILIKE ")
            .push_bind(format!("%{}%", escape_like(q)));
    }
    if let Some(max_tuition) = filter.max_tuition {
        builder.push(" AND p.tuition_per_year_usd <= ").push_bind(max_tuition);
    }
}

/// Browse published programs.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_programs(pool: &PgPool, filter: &ProgramFilter) -> Result<ProgramPage, ProgramError> {
    let mut count_builder =
        QueryBuilder::new("SELECT COUNT(*) FROM programs p JOIN universities u ON u.id = p.university_id");
    push_filters(&mut count_builder, filter);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::new(
        "SELECT p.id, p.name, u.name AS university_name, u.country, u.city,
                p.degree_level, p.field, p.language, p.duration_months,
                p.tuition_per_year_usd,
                to_char(p.application_deadline, 'YYYY-MM-DD') AS application_deadline
         FROM programs p
         JOIN universities u ON u.id = p.university_id",
    );
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY ");
    builder.push(filter.sort.order_by());
    builder.push(" LIMIT ");
    builder.push_bind(filter.per_page);
    builder.push(" OFFSET ");
    builder.push_bind((filter.page - 1) * filter.per_page);

    let rows = builder.build().fetch_all(pool).await?;
    let items = rows.into_iter().map(|r| summary_from_row(&r)).collect();

    Ok(ProgramPage { items, total, page: filter.page, per_page: filter.per_page })
}

fn summary_from_row(r: &sqlx::postgres::PgRow) -> ProgramSummary {
    ProgramSummary {
        id: r.get("id"),
        name: r.get("name"),
        university_name: r.get("university_name"),
        country: r.get("country"),
        city: r.get("city"),
        degree_level: r.get("degree_level"),
        field: r.get("field"),
        language: r.get("language"),
        duration_months: r.get("duration_months"),
        tuition_per_year_usd: r.get("tuition_per_year_usd"),
        application_deadline: r.get("application_deadline"),
    }
}

/// Fetch one program with its university embedded.
///
/// Unpublished programs are only visible when `include_unpublished` is set
/// (admin screens).
///
/// # Errors
///
/// Returns `NotFound` for unknown or hidden programs, or a database error.
pub async fn get_program(pool: &PgPool, id: Uuid, include_unpublished: bool) -> Result<ProgramDetail, ProgramError> {
    let row = sqlx::query(
        "SELECT p.id, p.name, u.name AS university_name, u.country, u.city,
                p.degree_level, p.field, p.language, p.duration_months,
                p.tuition_per_year_usd,
                to_char(p.application_deadline, 'YYYY-MM-DD') AS application_deadline,
                p.university_id, u.website, p.is_published
         FROM programs p
         JOIN universities u ON u.id = p.university_id
         WHERE p.id = $1 AND (p.is_published OR $2)",
    )
    .bind(id)
    .bind(include_unpublished)
    .fetch_optional(pool)
    .await?
    .ok_or(ProgramError::NotFound(id))?;

    Ok(ProgramDetail {
        summary: summary_from_row(&row),
        university_id: row.get("university_id"),
        website: row.get("website"),
        is_published: row.get("is_published"),
    })
}

// =============================================================================
// ADMIN CRUD
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub university_id: Uuid,
    pub name: String,
    pub degree_level: DegreeLevel,
    pub field: String,
    pub language: String,
    pub duration_months: i32,
    pub tuition_per_year_usd: i32,
    /// ISO date, `YYYY-MM-DD`.
    pub application_deadline: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramPatch {
    pub name: Option<String>,
    pub field: Option<String>,
    pub language: Option<String>,
    pub duration_months: Option<i32>,
    pub tuition_per_year_usd: Option<i32>,
    pub application_deadline: Option<String>,
    pub is_published: Option<bool>,
}

/// Create a program.
///
/// # Errors
///
/// Returns a database error if the insert fails (including an unknown
/// university id, surfaced as a foreign-key violation).
pub async fn create_program(pool: &PgPool, new: &NewProgram) -> Result<Uuid, ProgramError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO programs
             (id, university_id, name, degree_level, field, language,
              duration_months, tuition_per_year_usd, application_deadline)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::date)",
    )
    .bind(id)
    .bind(new.university_id)
    .bind(&new.name)
    .bind(new.degree_level.as_str())
    .bind(&new.field)
    .bind(&new.language)
    .bind(new.duration_months)
    .bind(new.tuition_per_year_usd)
    .bind(&new.application_deadline)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Patch a program; absent fields keep their value.
///
/// # Errors
///
/// Returns `NotFound` if no row matched, or a database error.
pub async fn update_program(pool: &PgPool, id: Uuid, patch: &ProgramPatch) -> Result<(), ProgramError> {
    let result = sqlx::query(
        "UPDATE programs SET
             name = COALESCE($2, name),
             field = COALESCE($3, field),
             language = COALESCE($4, language),
             duration_months = COALESCE($5, duration_months),
             tuition_per_year_usd = COALESCE($6, tuition_per_year_usd),
             application_deadline = COALESCE($7::date, application_deadline),
             is_published = COALESCE($8, is_published)
         WHERE id = $1",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.field)
    .bind(&patch.language)
    .bind(patch.duration_months)
    .bind(patch.tuition_per_year_usd)
    .bind(&patch.application_deadline)
    .bind(patch.is_published)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ProgramError::NotFound(id));
    }
    Ok(())
}

/// Delete a program.
///
/// # Errors
///
/// Returns `NotFound` if no row matched, or a database error.
pub async fn delete_program(pool: &PgPool, id: Uuid) -> Result<(), ProgramError> {
    let result = sqlx::query("DELETE FROM programs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ProgramError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "program_test.rs"]
mod tests;
