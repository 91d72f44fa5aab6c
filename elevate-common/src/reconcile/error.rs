//! Reconciliation error taxonomy

use thiserror::Error;

/// Errors raised by a reconciliation run
///
/// `InvalidConfiguration` and `StoreUnavailable` abort the run before a report
/// exists. `RecordUpdateFailed` never escapes the driver; it is rendered into
/// the failed record's outcome and the loop moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Missing or malformed stale host, production origin or uploads segment
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The candidate query could not reach the store
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single record's write was rejected or timed out
    #[error("Update of record {guid} failed: {reason}")]
    RecordUpdateFailed { guid: String, reason: String },
}
