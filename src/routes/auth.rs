//! Auth routes — email access-code login, session probe, role switching.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::guard::{SESSION_COOKIE_NAME, Visitor};
use crate::roles::{self, Role};
use crate::services::email_auth::{self, EmailAuthError};
use crate::services::session;
use crate::state::AppState;

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn cookie_secure() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }

    std::env::var("PUBLIC_BASE_URL")
        .map(|url| url.starts_with("https://"))
        .unwrap_or(false)
}

/// Demo deployments may allow visitors to switch their own granted role;
/// production keeps role grants behind the admin endpoint.
fn demo_role_switching_enabled() -> bool {
    env_bool("DEMO_ROLE_SWITCHING").unwrap_or(false)
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Deserialize)]
pub struct RequestCodeBody {
    pub email: String,
}

/// `POST /api/auth/request-code` — issue and deliver an access code.
pub async fn request_code(State(state): State<AppState>, Json(body): Json<RequestCodeBody>) -> Response {
    let Some(email) = email_auth::normalize_email(&body.email) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid email" }))).into_response();
    };

    if let Err(e) = state.code_limiter.check_and_record(&email) {
        tracing::warn!(%email, error = %e, "access-code request rate limited");
        return (StatusCode::TOO_MANY_REQUESTS, Json(serde_json::json!({ "error": "try again later" })))
            .into_response();
    }

    let code = match email_auth::request_access_code(&state.pool, &email).await {
        Ok(code) => code,
        Err(EmailAuthError::InvalidEmail) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid email" })))
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "access-code creation failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match &state.mailer {
        Some(mailer) => {
            let html = email_auth::render_access_code_email(&email, &code);
            if let Err(e) = mailer.send(&email, "Your Sojourn sign-in code", &html).await {
                tracing::error!(error = %e, "access-code delivery failed");
                return (StatusCode::BAD_GATEWAY, Json(serde_json::json!({ "error": "delivery failed" })))
                    .into_response();
            }
        }
        None => {
            tracing::info!(%email, %code, "mailer not configured; access code logged");
        }
    }

    (StatusCode::ACCEPTED, Json(serde_json::json!({ "ok": true }))).into_response()
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: String,
    pub code: String,
}

/// `POST /api/auth/verify-code` — exchange a code for a session cookie.
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyCodeBody>,
) -> Response {
    let user_id = match email_auth::verify_access_code(&state.pool, &body.email, &body.code).await {
        Ok(id) => id,
        Err(EmailAuthError::Db(e)) => {
            tracing::error!(error = %e, "code verification failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(_) => {
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "invalid or expired code" })))
                .into_response();
        }
    };

    let token = match session::create_session(&state.pool, user_id).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "session creation failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let user = match session::fetch_user(&state.pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "user fetch failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::info!(user_id = %user.id, role = %user.role, "login");

    // Sync the persisted acting role to the granted role at login.
    let secure = cookie_secure();
    let jar = jar
        .add(session_cookie(token, secure))
        .add(roles::role_cookie(user.role, secure));
    (jar, Json(user)).into_response()
}

// =============================================================================
// SESSION PROBE
// =============================================================================

/// `GET /api/auth/session` — settled session state for the SPA.
///
/// Always 200: `{ user: null, role }` for anonymous visitors. Normalizes
/// a missing or invalid role cookie to the default and persists it.
pub async fn session_probe(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = jar
        .get(SESSION_COOKIE_NAME)
        .map(Cookie::value)
        .unwrap_or_default()
        .to_owned();

    let user = if token.is_empty() {
        None
    } else {
        match session::validate_session(&state.pool, &token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "session validation failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    let secure = cookie_secure();
    match user {
        Some(user) => {
            let role = user.role;
            let body = Json(serde_json::json!({ "user": user, "role": role }));
            if roles::stored_role(&jar) == Some(role) {
                body.into_response()
            } else {
                (jar.add(roles::role_cookie(role, secure)), body).into_response()
            }
        }
        None => {
            let (role, write_back) = roles::resolve_role(&jar, secure);
            let body = Json(serde_json::json!({ "user": null, "role": role }));
            match write_back {
                Some(cookie) => (jar.add(cookie), body).into_response(),
                None => body.into_response(),
            }
        }
    }
}

/// `GET /api/auth/me` — current user (any authenticated role).
pub async fn me(visitor: Visitor) -> Json<session::SessionUser> {
    Json(visitor.user)
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, visitor: Visitor) -> impl IntoResponse {
    let _ = session::delete_session(&state.pool, &visitor.token).await;

    let jar = CookieJar::new().add(clear_session_cookie(cookie_secure()));
    (jar, StatusCode::NO_CONTENT)
}

// =============================================================================
// ROLE SWITCHING
// =============================================================================

#[derive(Deserialize)]
pub struct SetRoleBody {
    pub role: String,
}

/// `POST /api/auth/role` — the single update entry point for the acting
/// role.
///
/// Anonymous visitors only update the persisted preference. Authenticated
/// visitors asking for a role other than their granted one are refused
/// unless the operator enabled demo role switching, in which case the
/// granted role itself is updated (the self-service escalation offered on
/// the unauthorized page).
pub async fn set_role(State(state): State<AppState>, jar: CookieJar, Json(body): Json<SetRoleBody>) -> Response {
    let Some(role) = Role::parse(&body.role) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid role" }))).into_response();
    };

    let token = jar
        .get(SESSION_COOKIE_NAME)
        .map(Cookie::value)
        .unwrap_or_default()
        .to_owned();
    let user = if token.is_empty() {
        None
    } else {
        match session::validate_session(&state.pool, &token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "session validation failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    if let Some(user) = user {
        if user.role != role {
            if !demo_role_switching_enabled() {
                return (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({ "error": "role changes require an administrator" })),
                )
                    .into_response();
            }

            let update = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
                .bind(user.id)
                .bind(role.as_str())
                .execute(&state.pool)
                .await;
            if let Err(e) = update {
                tracing::error!(error = %e, "role update failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            tracing::info!(user_id = %user.id, from = %user.role, to = %role, "demo role switch");
        }
    }

    let jar = jar.add(roles::role_cookie(role, cookie_secure()));
    (jar, Json(serde_json::json!({ "role": role }))).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
