//! Application documents — upload, listing, download, deletion.
//!
//! DESIGN
//! ======
//! Bytes live on disk under the configured uploads root with
//! server-generated names (UUID + extension derived from the declared
//! content type); only metadata goes to Postgres. `storage_path` is stored
//! relative to the root so the directory can be relocated.
//!
//! ERROR HANDLING
//! ==============
//! The file is written before the metadata insert; if the insert fails the
//! orphaned file is removed best-effort. A row without its file surfaces
//! at download time as an I/O error, never a panic.

use std::path::{Path, PathBuf};

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::roles::Role;
use crate::services::application::ApplicationStatus;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

const MAX_FILE_NAME_LEN: usize = 120;

/// Declared content type → stored extension.
const ALLOWED_CONTENT_TYPES: [(&str, &str); 3] =
    [("application/pdf", "pdf"), ("image/jpeg", "jpg"), ("image/png", "png")];

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(Uuid),
    #[error("application not found: {0}")]
    ApplicationNotFound(Uuid),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("unknown document kind")]
    InvalidKind,
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("file exceeds {MAX_DOCUMENT_BYTES} bytes")]
    TooLarge,
    #[error("application is closed for uploads")]
    Locked,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Passport,
    Transcript,
    Diploma,
    LanguageCertificate,
    MotivationLetter,
    Other,
}

impl DocumentKind {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "passport" => Some(Self::Passport),
            "transcript" => Some(Self::Transcript),
            "diploma" => Some(Self::Diploma),
            "language_certificate" => Some(Self::LanguageCertificate),
            "motivation_letter" => Some(Self::MotivationLetter),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::Transcript => "transcript",
            Self::Diploma => "diploma",
            Self::LanguageCertificate => "language_certificate",
            Self::MotivationLetter => "motivation_letter",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub uploaded_by: Uuid,
    pub kind: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip)]
    pub storage_path: String,
    pub created_at: String,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Map a declared content type to the stored extension, or reject it.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == normalized)
        .map(|(_, ext)| *ext)
}

/// Keep the client-supplied name presentable for `Content-Disposition`:
/// strip path components and control characters, cap the length, and fall
/// back to a constant when nothing survives.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect::<String>();
    let trimmed = base.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return "document".to_owned();
    }
    trimmed.chars().take(MAX_FILE_NAME_LEN).collect()
}

// =============================================================================
// ACCESS
// =============================================================================

/// Whether the viewer may see documents of this application: the owning
/// student, their advising agent, or any admin.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn can_view_application(
    pool: &PgPool,
    application_id: Uuid,
    viewer_id: Uuid,
    viewer_role: Role,
) -> Result<bool, sqlx::Error> {
    let sql = match viewer_role {
        Role::Student => "SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1 AND student_id = $2)",
        Role::Agent => {
            "SELECT EXISTS(
                SELECT 1 FROM applications a
                JOIN student_profiles sp ON sp.user_id = a.student_id
                WHERE a.id = $1 AND sp.agent_id = $2
            )"
        }
        Role::Admin => "SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1 AND $2::uuid IS NOT NULL)",
    };
    sqlx::query_scalar(sql)
        .bind(application_id)
        .bind(viewer_id)
        .fetch_one(pool)
        .await
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Store one uploaded document for the student's own application.
///
/// # Errors
///
/// `ApplicationNotFound` when the student owns no such application,
/// `Locked` once the application reached a terminal status, validation
/// errors for type/size, or a database/storage error.
#[allow(clippy::too_many_arguments)]
pub async fn store_document(
    pool: &PgPool,
    upload_dir: &Path,
    application_id: Uuid,
    uploader_id: Uuid,
    kind: DocumentKind,
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<DocumentRow, DocumentError> {
    let row = sqlx::query("SELECT status FROM applications WHERE id = $1 AND student_id = $2")
        .bind(application_id)
        .bind(uploader_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DocumentError::ApplicationNotFound(application_id))?;
    let status =
        ApplicationStatus::parse(row.get::<String, _>("status").as_str()).unwrap_or(ApplicationStatus::Draft);
    if status.is_terminal() {
        return Err(DocumentError::Locked);
    }

    let Some(extension) = extension_for(content_type) else {
        return Err(DocumentError::UnsupportedType(content_type.to_owned()));
    };
    if bytes.len() > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge);
    }
    if bytes.is_empty() {
        return Err(DocumentError::UnsupportedType("empty file".to_owned()));
    }

    let id = Uuid::new_v4();
    let storage_name = format!("{id}.{extension}");
    tokio::fs::create_dir_all(upload_dir).await?;
    tokio::fs::write(upload_dir.join(&storage_name), bytes).await?;

    let file_name = sanitize_file_name(original_name);
    let insert = sqlx::query(
        "INSERT INTO documents
             (id, application_id, uploaded_by, kind, file_name, content_type, size_bytes, storage_path)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at",
    )
    .bind(id)
    .bind(application_id)
    .bind(uploader_id)
    .bind(kind.as_str())
    .bind(&file_name)
    .bind(content_type)
    .bind(i64::try_from(bytes.len()).unwrap_or(i64::MAX))
    .bind(&storage_name)
    .fetch_one(pool)
    .await;

    let created_at: String = match insert {
        Ok(r) => r.get("created_at"),
        Err(e) => {
            let _ = tokio::fs::remove_file(upload_dir.join(&storage_name)).await;
            return Err(e.into());
        }
    };

    tracing::info!(document_id = %id, %application_id, kind = kind.as_str(), "document stored");
    Ok(DocumentRow {
        id,
        application_id,
        uploaded_by: uploader_id,
        kind: kind.as_str().to_owned(),
        file_name,
        content_type: content_type.to_owned(),
        size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
        storage_path: storage_name,
        created_at,
    })
}

fn row_to_document(r: &sqlx::postgres::PgRow) -> DocumentRow {
    DocumentRow {
        id: r.get("id"),
        application_id: r.get("application_id"),
        uploaded_by: r.get("uploaded_by"),
        kind: r.get("kind"),
        file_name: r.get("file_name"),
        content_type: r.get("content_type"),
        size_bytes: r.get("size_bytes"),
        storage_path: r.get("storage_path"),
        created_at: r.get("created_at"),
    }
}

const DOCUMENT_SELECT: &str = "SELECT id, application_id, uploaded_by, kind, file_name, content_type,
        size_bytes, storage_path,
        to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at
 FROM documents";

/// List documents of one application.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_application(pool: &PgPool, application_id: Uuid) -> Result<Vec<DocumentRow>, DocumentError> {
    let rows = sqlx::query(&format!("{DOCUMENT_SELECT} WHERE application_id = $1 ORDER BY created_at ASC"))
        .bind(application_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_document).collect())
}

/// Load one document row (access is checked by the caller against its
/// `application_id`).
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn load_document(pool: &PgPool, id: Uuid) -> Result<DocumentRow, DocumentError> {
    sqlx::query(&format!("{DOCUMENT_SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|r| row_to_document(&r))
        .ok_or(DocumentError::NotFound(id))
}

/// Absolute path of a document's bytes.
#[must_use]
pub fn document_path(upload_dir: &Path, row: &DocumentRow) -> PathBuf {
    upload_dir.join(&row.storage_path)
}

/// Delete a document: the uploading student while the application is not
/// decided, or an admin at any time. Removes the row first, then the file
/// best-effort.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a database error.
pub async fn delete_document(
    pool: &PgPool,
    upload_dir: &Path,
    id: Uuid,
    viewer_id: Uuid,
    viewer_role: Role,
) -> Result<(), DocumentError> {
    let row = load_document(pool, id).await?;

    if viewer_role != Role::Admin {
        if row.uploaded_by != viewer_id {
            return Err(DocumentError::Forbidden("not the uploader"));
        }
        let status: String = sqlx::query_scalar("SELECT status FROM applications WHERE id = $1")
            .bind(row.application_id)
            .fetch_one(pool)
            .await?;
        let status = ApplicationStatus::parse(&status).unwrap_or(ApplicationStatus::Draft);
        if status.is_decided() {
            return Err(DocumentError::Forbidden("application already decided"));
        }
    }

    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if let Err(e) = tokio::fs::remove_file(document_path(upload_dir, &row)).await {
        tracing::warn!(error = %e, document_id = %id, "document row deleted but file removal failed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
