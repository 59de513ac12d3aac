//! Messaging routes — conversations and threads.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::guard::Visitor;
use crate::services::message::{self, ConversationSummary, MessageError, MessageRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OpenConversationBody {
    pub subject: String,
    pub body: String,
    /// Required when staff open a conversation; ignored for students.
    pub student_id: Option<Uuid>,
}

/// `POST /api/conversations` — open a conversation with its first message.
pub async fn open_conversation(
    State(state): State<AppState>,
    visitor: Visitor,
    Json(body): Json<OpenConversationBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let id = message::open_conversation(
        &state.pool,
        visitor.user.id,
        visitor.role,
        body.student_id,
        &body.subject,
        &body.body,
    )
    .await
    .map_err(message_error_to_status)?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// `GET /api/conversations` — the visitor's conversations.
pub async fn list_conversations(
    State(state): State<AppState>,
    visitor: Visitor,
) -> Result<Json<Vec<ConversationSummary>>, StatusCode> {
    let rows = message::list_conversations(&state.pool, visitor.user.id)
        .await
        .map_err(message_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/conversations/:id/messages` — the thread; marks the
/// counterparty's messages read.
pub async fn list_messages(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageRow>>, StatusCode> {
    let rows = message::list_messages(&state.pool, id, visitor.user.id)
        .await
        .map_err(message_error_to_status)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub body: String,
}

/// `POST /api/conversations/:id/messages` — post to the thread.
pub async fn send_message(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let message_id = message::send_message(&state.pool, id, visitor.user.id, &body.body)
        .await
        .map_err(message_error_to_status)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": message_id }))))
}

/// `GET /api/conversations/unread-count` — total unread for the badge.
pub async fn unread_count(
    State(state): State<AppState>,
    visitor: Visitor,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let count = message::unread_total(&state.pool, visitor.user.id)
        .await
        .map_err(message_error_to_status)?;
    Ok(Json(serde_json::json!({ "count": count })))
}

pub(crate) fn message_error_to_status(err: MessageError) -> StatusCode {
    match err {
        MessageError::NotFound(_) | MessageError::NoAgentAssigned => StatusCode::NOT_FOUND,
        MessageError::StudentRequired | MessageError::RecipientNotStudent | MessageError::EmptyBody => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MessageError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
