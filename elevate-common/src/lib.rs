//! # Elevate Common Library
//!
//! Shared code for the Elevate backend binaries including:
//! - Error types and configuration loading
//! - SQLite storage (schema, media records, API tokens)
//! - Media reference reconciliation (matching, rewriting, driver, audit)
//! - Uploads directory analysis

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod uploads;

pub use error::{Error, Result};
