//! Document routes — upload, listing, download, deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use crate::guard::Visitor;
use crate::services::document::{self, DocumentError, DocumentKind, DocumentRow};
use crate::state::AppState;

/// `POST /api/applications/:id/documents` — multipart upload: a `kind`
/// text field plus one `file` part.
pub async fn upload(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(application_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRow>), StatusCode> {
    let mut kind: Option<DocumentKind> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "kind" => {
                let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                kind = DocumentKind::parse(&text);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("document").to_owned();
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let Some(kind) = kind else {
        return Err(document_error_to_status(DocumentError::InvalidKind));
    };
    let Some((file_name, content_type, bytes)) = file else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let row = document::store_document(
        &state.pool,
        &state.upload_dir,
        application_id,
        visitor.user.id,
        kind,
        &file_name,
        &content_type,
        &bytes,
    )
    .await
    .map_err(document_error_to_status)?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/applications/:id/documents` — list an application's
/// documents (owner, advising agent, or admin).
pub async fn list_for_application(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(application_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentRow>>, StatusCode> {
    let allowed = document::can_view_application(&state.pool, application_id, visitor.user.id, visitor.role)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !allowed {
        return Err(StatusCode::NOT_FOUND);
    }

    let rows = document::list_for_application(&state.pool, application_id)
        .await
        .map_err(document_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/documents/:id/download` — stream a document's bytes with its
/// original name.
pub async fn download(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    let row = document::load_document(&state.pool, id)
        .await
        .map_err(document_error_to_status)?;

    let allowed = document::can_view_application(&state.pool, row.application_id, visitor.user.id, visitor.role)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !allowed {
        return Err(StatusCode::NOT_FOUND);
    }

    let bytes = tokio::fs::read(document::document_path(&state.upload_dir, &row))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, document_id = %id, "document file missing");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let headers = [
        (CONTENT_TYPE, row.content_type.clone()),
        (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", row.file_name)),
    ];
    Ok((headers, bytes).into_response())
}

/// `DELETE /api/documents/:id` — uploader while undecided, or admin.
pub async fn delete(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    document::delete_document(&state.pool, &state.upload_dir, id, visitor.user.id, visitor.role)
        .await
        .map_err(document_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub(crate) fn document_error_to_status(err: DocumentError) -> StatusCode {
    match err {
        DocumentError::NotFound(_) | DocumentError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
        DocumentError::Forbidden(_) => StatusCode::FORBIDDEN,
        DocumentError::InvalidKind => StatusCode::UNPROCESSABLE_ENTITY,
        DocumentError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DocumentError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        DocumentError::Locked => StatusCode::CONFLICT,
        DocumentError::Database(_) | DocumentError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
