//! Route guard — render-vs-redirect decisions for protected routes.
//!
//! DESIGN
//! ======
//! The decision core is a pure function over three inputs: a session probe
//! (pending or settled with an optional user), the acting role, and the
//! role set allowed on the route. Exactly one outcome falls out of every
//! check: keep waiting, send to login, send to the unauthorized page, or
//! let the request through. A fresh request re-runs the whole check; there
//! is no retry state.
//!
//! The HTTP layer awaits the session lookup before deciding; if the
//! session store cannot answer, the probe stays pending and the request
//! gets a retryable 503 with no access decision. Deny outcomes map to a
//! redirect for page navigations or a JSON status for `/api` routes.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::roles::{Role, RoleSet};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

/// Session bearer cookie set on login and cleared on logout.
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Where unauthenticated navigations are sent.
pub const LOGIN_PATH: &str = "/login";
/// Where authenticated-but-forbidden navigations are sent.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

// =============================================================================
// DECISION CORE
// =============================================================================

/// Authentication state as seen by the guard.
#[derive(Debug, Clone)]
pub enum SessionProbe {
    /// The auth collaborator has not settled; no access decision may be
    /// made yet.
    Pending,
    /// Settled: either an authenticated user or anonymous.
    Settled(Option<SessionUser>),
}

/// Outcome of a guard check. Exactly one per navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    RedirectToLogin,
    RedirectToUnauthorized,
    Allow,
}

/// Decide render-vs-redirect for one navigation attempt.
///
/// Authenticated means the probe settled with a user present; a stored
/// role marker never counts as authentication. `role` is the acting role
/// to test against `allowed` (callers pass the granted role for
/// authenticated visitors).
#[must_use]
pub fn decide(probe: &SessionProbe, role: Role, allowed: RoleSet) -> Decision {
    match probe {
        SessionProbe::Pending => Decision::Pending,
        SessionProbe::Settled(None) => Decision::RedirectToLogin,
        SessionProbe::Settled(Some(_)) => {
            if allowed.contains(role) {
                Decision::Allow
            } else {
                Decision::RedirectToUnauthorized
            }
        }
    }
}

// =============================================================================
// VISITOR
// =============================================================================

/// Authenticated visitor attached to the request by the guard middleware.
/// Handlers take this as an argument instead of re-deriving access.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub user: SessionUser,
    /// Granted role the guard admitted this request under.
    pub role: Role,
    /// Session token backing this request, for logout.
    pub token: String,
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Present only on routes behind `require_roles`; a miss means the
        // route was wired without a guard layer.
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Guard middleware for one route group. Applied via
/// `middleware::from_fn_with_state` with the group's allowed role set
/// captured at router assembly.
pub async fn require_roles(
    allowed: RoleSet,
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(SESSION_COOKIE_NAME)
        .map(Cookie::value)
        .unwrap_or_default()
        .to_owned();

    let probe = if token.is_empty() {
        SessionProbe::Settled(None)
    } else {
        match session::validate_session(&state.pool, &token).await {
            Ok(user) => SessionProbe::Settled(user),
            Err(e) => {
                // Session store unreachable: the probe never settled, so
                // no access decision is made for this attempt.
                tracing::error!(error = %e, "session validation failed");
                SessionProbe::Pending
            }
        }
    };

    // Authenticated visitors are judged by their granted role; the cookie
    // preference only matters for anonymous traffic, which never passes
    // the authentication check anyway.
    let role = match &probe {
        SessionProbe::Settled(Some(user)) => user.role,
        _ => crate::roles::stored_role(&jar).unwrap_or_default(),
    };

    match decide(&probe, role, allowed) {
        Decision::Allow => {
            let SessionProbe::Settled(Some(user)) = probe else {
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            };
            req.extensions_mut().insert(Visitor { user, role, token });
            next.run(req).await
        }
        Decision::Pending => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Decision::RedirectToLogin => {
            deny(req.uri().path(), LOGIN_PATH, StatusCode::UNAUTHORIZED)
        }
        Decision::RedirectToUnauthorized => {
            tracing::info!(path = req.uri().path(), %role, %allowed, "role denied");
            deny(req.uri().path(), UNAUTHORIZED_PATH, StatusCode::FORBIDDEN)
        }
    }
}

/// Named entry points for `middleware::from_fn_with_state`, one per role
/// set used at router assembly.
pub async fn require_any(state: State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    require_roles(RoleSet::ANY, state, jar, req, next).await
}

pub async fn require_student(state: State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    require_roles(RoleSet::STUDENT, state, jar, req, next).await
}

pub async fn require_agent(state: State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    require_roles(RoleSet::AGENT, state, jar, req, next).await
}

pub async fn require_staff(state: State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    require_roles(RoleSet::STAFF, state, jar, req, next).await
}

pub async fn require_admin(state: State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    require_roles(RoleSet::ADMIN, state, jar, req, next).await
}

/// API callers get a status they can branch on; page navigations get a
/// temporary redirect, which adds no history entry to loop back to.
fn deny(path: &str, target: &'static str, status: StatusCode) -> Response {
    if path.starts_with("/api") {
        (status, Json(serde_json::json!({ "error": target.trim_start_matches('/') }))).into_response()
    } else {
        Redirect::temporary(target).into_response()
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
