//! elevate-api library - admin HTTP service
//!
//! Exposes the media reference reconciliation and the reference audit over
//! HTTP. Both admin routes sit behind bearer-token authentication; the
//! health check does not.

use axum::Router;
use elevate_common::reconcile::ReconcileSettings;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Validated reconciliation defaults; requests may override the target form
    pub reconcile: ReconcileSettings,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, reconcile: ReconcileSettings) -> Self {
        Self { db, reconcile }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Admin routes (require an admin bearer token)
    let admin = Router::new()
        .route("/api/music/update-urls", post(api::update_urls))
        .route("/api/music/url-audit", get(api::url_audit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    // Public routes (no authentication)
    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
