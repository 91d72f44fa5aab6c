//! HTTP API handlers for elevate-api

pub mod auth;
pub mod health;
pub mod reconcile;

pub use auth::require_admin;
pub use health::health_routes;
pub use reconcile::{update_urls, url_audit};
