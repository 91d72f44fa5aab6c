//! Reconciliation report

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::settings::TargetForm;
use super::store::MediaField;

/// Overall result of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The scan found no candidate records
    AlreadyUpToDate,
    /// Candidates were processed (individual records may still have failed)
    Completed,
}

/// One rewritten field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: MediaField,
    pub old_value: String,
    pub new_value: String,
}

/// What happened to a single candidate record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Dirty fields were persisted
    Updated,
    /// Dirty fields were computed but not written (dry run)
    Planned,
    /// No field needed rewriting
    Unchanged,
    /// The write was rejected or timed out. A rejected write persisted
    /// nothing; a timed-out one may still have committed, so re-run to confirm.
    Failed { error: String },
}

/// Per-record audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub guid: String,
    pub title: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    pub changes: Vec<FieldChange>,
}

/// Result of one reconciliation run
///
/// `scanned == updated + planned + unchanged + failed` always holds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub status: RunStatus,
    pub target_form: TargetForm,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scanned: usize,
    pub updated: usize,
    pub planned: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl ReconciliationReport {
    pub(crate) fn new(target_form: TargetForm, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::AlreadyUpToDate,
            target_form,
            dry_run,
            started_at: now,
            finished_at: now,
            scanned: 0,
            updated: 0,
            planned: 0,
            unchanged: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, outcome: RecordOutcome) {
        self.scanned += 1;
        match outcome.status {
            OutcomeStatus::Updated => self.updated += 1,
            OutcomeStatus::Planned => self.planned += 1,
            OutcomeStatus::Unchanged => self.unchanged += 1,
            OutcomeStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        if self.scanned > 0 {
            self.status = RunStatus::Completed;
        }
        self.finished_at = Utc::now();
        self
    }

    /// Human readable one-line summary
    pub fn message(&self) -> String {
        match (self.status, self.dry_run) {
            (RunStatus::AlreadyUpToDate, _) => {
                "No records found with stale media references. Database is already up to date!"
                    .to_string()
            }
            (RunStatus::Completed, true) => format!(
                "Dry run: {} of {} records would be updated",
                self.planned, self.scanned
            ),
            (RunStatus::Completed, false) if self.failed > 0 => format!(
                "Updated {} records, {} failed, {} unchanged",
                self.updated, self.failed, self.unchanged
            ),
            (RunStatus::Completed, false) => format!("Successfully updated {} records", self.updated),
        }
    }

    /// Every field change that was persisted (or planned, for a dry run)
    pub fn applied_changes(&self) -> impl Iterator<Item = (&RecordOutcome, &FieldChange)> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Updated | OutcomeStatus::Planned))
            .flat_map(|o| o.changes.iter().map(move |c| (o, c)))
    }

    /// Records whose write failed, with the error
    pub fn failures(&self) -> impl Iterator<Item = (&RecordOutcome, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            OutcomeStatus::Failed { error } => Some((o, error.as_str())),
            _ => None,
        })
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
