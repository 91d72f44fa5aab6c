//! Crate-wide error type

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the storage, configuration and filesystem layers.
///
/// Reconciliation-level outcomes have their own
/// [`ReconcileError`](crate::reconcile::ReconcileError); the store seam hands
/// these errors up and the driver classifies them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No music row with this guid (deleted between scan and update)
    #[error("music record {0} not found")]
    RecordNotFound(String),
}
