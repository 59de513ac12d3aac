//! Internal messaging — conversations between a student and a staff
//! member (their advising agent, or an admin).
//!
//! DESIGN
//! ======
//! Read state is per message (`read_at`); a conversation's unread badge is
//! the count of the counterparty's unread messages. Opening the message
//! list marks the counterparty's messages read, which mirrors how the SPA
//! consumes the thread.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::roles::Role;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("conversation not found: {0}")]
    NotFound(Uuid),
    #[error("no advising agent assigned")]
    NoAgentAssigned,
    #[error("student_id is required for staff-opened conversations")]
    StudentRequired,
    #[error("recipient is not a student")]
    RecipientNotStudent,
    #[error("message body must not be empty")]
    EmptyBody,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub subject: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub created_at: String,
    pub last_message: Option<MessagePreview>,
    pub unread: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MessagePreview {
    pub body: String,
    pub sender_id: Uuid,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MessageRow {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub body: String,
    pub created_at: String,
    pub read: bool,
}

// =============================================================================
// OPEN / LIST
// =============================================================================

/// Open a conversation and post its first message.
///
/// A student converses with their assigned agent; staff name the student
/// explicitly. Returns the new conversation id.
///
/// # Errors
///
/// `NoAgentAssigned` for unadvised students, `RecipientNotStudent` when
/// staff target a non-student, `EmptyBody` on blank input, or a database
/// error.
pub async fn open_conversation(
    pool: &PgPool,
    opener_id: Uuid,
    opener_role: Role,
    student_id: Option<Uuid>,
    subject: &str,
    body: &str,
) -> Result<Uuid, MessageError> {
    let subject = subject.trim();
    let body = body.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(MessageError::EmptyBody);
    }

    let (student, staff) = if opener_role.is_staff() {
        let student = student_id.ok_or(MessageError::StudentRequired)?;
        let is_student: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND role = 'student')")
                .bind(student)
                .fetch_one(pool)
                .await?;
        if !is_student {
            return Err(MessageError::RecipientNotStudent);
        }
        (student, opener_id)
    } else {
        let agent: Option<Uuid> = sqlx::query_scalar("SELECT agent_id FROM student_profiles WHERE user_id = $1")
            .bind(opener_id)
            .fetch_optional(pool)
            .await?
            .flatten();
        (opener_id, agent.ok_or(MessageError::NoAgentAssigned)?)
    };

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO conversations (id, student_id, staff_id, subject) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(student)
        .bind(staff)
        .bind(subject)
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO messages (conversation_id, sender_id, body) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(opener_id)
        .bind(body)
        .execute(pool)
        .await?;

    tracing::info!(conversation_id = %id, %student, %staff, "conversation opened");
    Ok(id)
}

/// List the viewer's conversations, most recently active first, with the
/// last message and the viewer's unread count per conversation.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_conversations(pool: &PgPool, viewer_id: Uuid) -> Result<Vec<ConversationSummary>, MessageError> {
    let rows = sqlx::query(
        "SELECT c.id, c.subject, c.student_id, su.name AS student_name,
                c.staff_id, st.name AS staff_name,
                to_char(c.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at,
                lm.body AS last_body, lm.sender_id AS last_sender_id,
                to_char(lm.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS last_at,
                (SELECT COUNT(*) FROM messages m
                 WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND m.read_at IS NULL) AS unread
         FROM conversations c
         JOIN users su ON su.id = c.student_id
         JOIN users st ON st.id = c.staff_id
         LEFT JOIN LATERAL (
             SELECT body, sender_id, created_at
             FROM messages m
             WHERE m.conversation_id = c.id
             ORDER BY m.created_at DESC
             LIMIT 1
         ) lm ON true
         WHERE c.student_id = $1 OR c.staff_id = $1
         ORDER BY COALESCE(lm.created_at, c.created_at) DESC",
    )
    .bind(viewer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let last_message = r
                .get::<Option<String>, _>("last_body")
                .map(|body| MessagePreview {
                    body,
                    sender_id: r.get("last_sender_id"),
                    created_at: r.get("last_at"),
                });
            ConversationSummary {
                id: r.get("id"),
                subject: r.get("subject"),
                student_id: r.get("student_id"),
                student_name: r.get("student_name"),
                staff_id: r.get("staff_id"),
                staff_name: r.get("staff_name"),
                created_at: r.get("created_at"),
                last_message,
                unread: r.get("unread"),
            }
        })
        .collect())
}

// =============================================================================
// THREAD
// =============================================================================

async fn assert_participant(pool: &PgPool, conversation_id: Uuid, viewer_id: Uuid) -> Result<(), MessageError> {
    let participant: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1 AND (student_id = $2 OR staff_id = $2))",
    )
    .bind(conversation_id)
    .bind(viewer_id)
    .fetch_one(pool)
    .await?;
    if participant {
        Ok(())
    } else {
        // Non-participants learn nothing, not even existence.
        Err(MessageError::NotFound(conversation_id))
    }
}

/// Fetch a thread and mark the counterparty's messages read.
///
/// # Errors
///
/// `NotFound` for non-participants, or a database error.
pub async fn list_messages(
    pool: &PgPool,
    conversation_id: Uuid,
    viewer_id: Uuid,
) -> Result<Vec<MessageRow>, MessageError> {
    assert_participant(pool, conversation_id, viewer_id).await?;

    let rows = sqlx::query(
        "SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name, m.body,
                to_char(m.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI') AS created_at,
                m.read_at IS NOT NULL AS is_read
         FROM messages m
         JOIN users u ON u.id = m.sender_id
         WHERE m.conversation_id = $1
         ORDER BY m.created_at ASC",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    sqlx::query(
        "UPDATE messages SET read_at = now()
         WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL",
    )
    .bind(conversation_id)
    .bind(viewer_id)
    .execute(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| MessageRow {
            id: r.get("id"),
            conversation_id: r.get("conversation_id"),
            sender_id: r.get("sender_id"),
            sender_name: r.get("sender_name"),
            body: r.get("body"),
            created_at: r.get("created_at"),
            read: r.get("is_read"),
        })
        .collect())
}

/// Post a message to a conversation the sender participates in.
///
/// # Errors
///
/// `NotFound` for non-participants, `EmptyBody` on blank input, or a
/// database error.
pub async fn send_message(
    pool: &PgPool,
    conversation_id: Uuid,
    sender_id: Uuid,
    body: &str,
) -> Result<Uuid, MessageError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(MessageError::EmptyBody);
    }
    assert_participant(pool, conversation_id, sender_id).await?;

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO messages (id, conversation_id, sender_id, body) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Total unread messages across the viewer's conversations, for the
/// navigation badge.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn unread_total(pool: &PgPool, viewer_id: Uuid) -> Result<i64, MessageError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM messages m
         JOIN conversations c ON c.id = m.conversation_id
         WHERE (c.student_id = $1 OR c.staff_id = $1)
           AND m.sender_id <> $1
           AND m.read_at IS NULL",
    )
    .bind(viewer_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
