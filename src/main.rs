mod db;
mod guard;
mod rate_limit;
mod roles;
mod routes;
mod services;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use services::mailer::{Mailer, ResendMailer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");
    let upload_dir = std::env::var("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("uploads"));

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    std::fs::create_dir_all(&upload_dir).expect("uploads directory unavailable");

    // Initialize mailer (non-fatal: codes are logged if config is missing).
    let mailer: Option<Arc<dyn Mailer>> = match ResendMailer::from_env() {
        Ok(mailer) => {
            tracing::info!("mailer initialized");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::warn!(error = %e, "mailer not configured — access codes will be logged");
            None
        }
    };

    let state = state::AppState::new(pool, upload_dir, mailer);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sojourn listening");
    axum::serve(listener, app).await.expect("server failed");
}
