//! University catalog — listing for filter dropdowns and admin CRUD.

use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UniversityError {
    #[error("university not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UniversityRow {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub city: String,
    pub website: Option<String>,
    pub program_count: i64,
}

/// List universities with their published-program counts, ordered by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_universities(pool: &PgPool) -> Result<Vec<UniversityRow>, UniversityError> {
    let rows = sqlx::query(
        "SELECT u.id, u.name, u.country, u.city, u.website,
                (SELECT COUNT(*) FROM programs p
                 WHERE p.university_id = u.id AND p.is_published) AS program_count
         FROM universities u
         ORDER BY u.name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| UniversityRow {
            id: r.get("id"),
            name: r.get("name"),
            country: r.get("country"),
            city: r.get("city"),
            website: r.get("website"),
            program_count: r.get("program_count"),
        })
        .collect())
}

/// Create a university.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_university(
    pool: &PgPool,
    name: &str,
    country: &str,
    city: &str,
    website: Option<&str>,
) -> Result<Uuid, UniversityError> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO universities (id, name, country, city, website) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(name)
        .bind(country)
        .bind(city)
        .bind(website)
        .execute(pool)
        .await?;
    Ok(id)
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UniversityPatch {
    pub name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
}

/// Patch a university; absent fields keep their value.
///
/// # Errors
///
/// Returns `NotFound` if no row matched, or a database error.
pub async fn update_university(pool: &PgPool, id: Uuid, patch: &UniversityPatch) -> Result<(), UniversityError> {
    let result = sqlx::query(
        "UPDATE universities SET
             name = COALESCE($2, name),
             country = COALESCE($3, country),
             city = COALESCE($4, city),
             website = COALESCE($5, website)
         WHERE id = $1",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.country)
    .bind(&patch.city)
    .bind(&patch.website)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(UniversityError::NotFound(id));
    }
    Ok(())
}

/// Delete a university and, via cascade, its programs.
///
/// # Errors
///
/// Returns `NotFound` if no row matched, or a database error.
pub async fn delete_university(pool: &PgPool, id: Uuid) -> Result<(), UniversityError> {
    let result = sqlx::query("DELETE FROM universities WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(UniversityError::NotFound(id));
    }
    Ok(())
}
