//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Routes are grouped by the role set allowed to reach them, and each
//! group carries one guard layer. That keeps the path-to-roles mapping in
//! one place, next to the route declarations. Deny outcomes on `/api`
//! paths are JSON statuses; guarded page paths redirect to `/login` or
//! `/unauthorized`, which the SPA shell renders.

pub mod admin;
pub mod applications;
pub mod auth;
pub mod documents;
pub mod messages;
pub mod programs;

use std::path::PathBuf;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::guard;
use crate::services::document::MAX_DOCUMENT_BYTES;
use crate::state::AppState;

// Multipart envelope on top of the raw file cap.
const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_BYTES + 64 * 1024;

/// API routes grouped by allowed role set.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/api/auth/request-code", post(auth::request_code))
        .route("/api/auth/verify-code", post(auth::verify_code))
        .route("/api/auth/session", get(auth::session_probe))
        .route("/api/auth/role", post(auth::set_role))
        .route("/healthz", get(healthz));

    let any_role = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/programs", get(programs::list_programs))
        .route("/api/programs/{id}", get(programs::get_program))
        .route("/api/universities", get(programs::list_universities))
        .route(
            "/api/conversations",
            get(messages::list_conversations).post(messages::open_conversation),
        )
        .route("/api/conversations/unread-count", get(messages::unread_count))
        .route(
            "/api/conversations/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/api/applications/{id}/documents",
            get(documents::list_for_application).post(documents::upload),
        )
        .route("/api/documents/{id}/download", get(documents::download))
        .route("/api/documents/{id}", delete(documents::delete))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_any));

    let student = Router::new()
        .route(
            "/api/applications",
            get(applications::list_mine).post(applications::create),
        )
        .route("/api/applications/{id}", get(applications::get_mine))
        .route("/api/applications/{id}/submit", post(applications::submit))
        .route("/api/applications/{id}/withdraw", post(applications::withdraw))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_student));

    let agent = Router::new()
        .route("/api/agent/applications", get(applications::list_for_agent))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_agent));

    let staff = Router::new()
        .route("/api/applications/{id}/review", post(applications::review))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_staff));

    let admin = Router::new()
        .route("/api/admin/students", get(admin::list_students))
        .route("/api/admin/students/{id}", patch(admin::update_student))
        .route("/api/admin/users/{id}/role", patch(admin::set_user_role))
        .route("/api/admin/universities", post(admin::create_university))
        .route(
            "/api/admin/universities/{id}",
            patch(admin::update_university).delete(admin::delete_university),
        )
        .route("/api/admin/programs", post(admin::create_program))
        .route(
            "/api/admin/programs/{id}",
            patch(admin::update_program).delete(admin::delete_program),
        )
        .route("/api/admin/applications", get(admin::list_applications))
        .route("/api/admin/applications/{id}", get(admin::get_application))
        .route(
            "/api/admin/applications/{id}/decision",
            post(admin::decide_application),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_admin));

    public
        .merge(any_role)
        .merge(student)
        .merge(agent)
        .merge(staff)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}

/// Resolve the path to the SPA shell directory.
fn web_dir() -> PathBuf {
    std::env::var("WEB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("web"))
}

/// Full application: API + guarded page paths + SPA shell at `/`.
pub fn app(state: AppState) -> Router {
    let web_path = web_dir();
    let index = ServeFile::new(web_path.join("index.html"));

    // Guarded page navigations: deny outcomes here redirect instead of
    // returning a status, so the browser lands on /login or /unauthorized.
    let pages = Router::new()
        .route_service("/dashboard", index.clone())
        .route_service("/dashboard/{*rest}", index.clone())
        .layer(middleware::from_fn_with_state(state.clone(), guard::require_any))
        .merge(
            Router::new()
                .route_service("/admin", index.clone())
                .route_service("/admin/{*rest}", index.clone())
                .layer(middleware::from_fn_with_state(state.clone(), guard::require_admin)),
        )
        .with_state(state.clone());

    // Everything else (including /login and /unauthorized) is the SPA
    // shell or a static asset.
    let spa = ServeDir::new(&web_path).not_found_service(index);

    api_routes(state)
        .merge(pages)
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
