//! Media reference reconciliation
//!
//! Detects stored media references that still point at a development host
//! and rewrites them to the configured production form. The procedure is
//! idempotent: once a reference has been rewritten it no longer matches the
//! stale host, so a second run finds nothing to change.
//!
//! Pieces, leaves first:
//! - [`matcher`]: stale host detection
//! - [`rewrite`]: pure reference rewriting
//! - [`store`]: storage seam and the SQLite implementation
//! - [`scanner`]: materialized candidate query
//! - [`driver`]: orchestration and reporting
//! - [`audit`]: read-only classification of every stored reference

pub mod audit;
pub mod driver;
pub mod error;
pub mod matcher;
pub mod report;
pub mod rewrite;
pub mod scanner;
pub mod settings;
pub mod store;

pub use audit::{
    asset_file_name, audit_references, classify_reference, find_missing_assets, MissingAsset,
    ReferenceAudit, ReferenceKind, StaleRecord,
};
pub use driver::Reconciler;
pub use error::ReconcileError;
pub use matcher::StaleHostMatcher;
pub use report::{FieldChange, OutcomeStatus, ReconciliationReport, RecordOutcome, RunStatus};
pub use rewrite::{rewrite, RewriteTarget};
pub use scanner::find_stale_records;
pub use settings::{ReconcileSettings, TargetForm};
pub use store::{MediaField, MediaStore, ReferenceUpdate, SqliteMediaStore};
