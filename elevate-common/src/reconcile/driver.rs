//! Reconciliation driver
//!
//! scan → per-field decision → partial write → report. Records are handled
//! one at a time in scan order. A failed write is folded into the report and
//! the loop continues; earlier writes are never rolled back, and re-running
//! picks up anything an interrupted run left behind.

use tracing::{debug, info, warn};

use super::error::ReconcileError;
use super::report::{FieldChange, OutcomeStatus, ReconciliationReport, RecordOutcome};
use super::rewrite::{rewrite, RewriteTarget};
use super::scanner::find_stale_records;
use super::settings::ReconcileSettings;
use super::store::{MediaField, MediaRecord, MediaStore, ReferenceUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Apply,
    DryRun,
}

/// Runs reconciliation against a [`MediaStore`]
pub struct Reconciler<S> {
    store: S,
    settings: ReconcileSettings,
}

impl<S: MediaStore> Reconciler<S> {
    pub fn new(store: S, settings: ReconcileSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rewrite every stale reference and persist the changes.
    ///
    /// Errors only if the candidate scan fails; per-record write failures are
    /// reported in the returned report.
    pub async fn reconcile(&self) -> Result<ReconciliationReport, ReconcileError> {
        self.run(RunMode::Apply).await
    }

    /// Compute what [`reconcile`](Self::reconcile) would change without writing.
    pub async fn plan(&self) -> Result<ReconciliationReport, ReconcileError> {
        self.run(RunMode::DryRun).await
    }

    async fn run(&self, mode: RunMode) -> Result<ReconciliationReport, ReconcileError> {
        let dry_run = mode == RunMode::DryRun;
        let mut report = ReconciliationReport::new(self.settings.target_form(), dry_run);

        info!(
            marker = self.settings.matcher().marker(),
            target = %self.settings.target_form(),
            dry_run,
            "Starting media reference reconciliation"
        );

        let candidates = find_stale_records(
            &self.store,
            self.settings.matcher(),
            self.settings.store_timeout(),
        )
        .await?;

        if candidates.is_empty() {
            info!("No records with stale references; already up to date");
            return Ok(report.finish());
        }

        info!(found = candidates.len(), "Found records with stale references");

        let target = self.settings.rewrite_target();
        for record in &candidates {
            let outcome = self.process_record(record, &target, mode).await;
            report.record(outcome);
        }

        let report = report.finish();
        info!(
            scanned = report.scanned,
            updated = report.updated,
            planned = report.planned,
            unchanged = report.unchanged,
            failed = report.failed,
            elapsed_ms = report.elapsed_ms(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Dirty fields of a record; absent references are never touched
    fn plan_record(&self, record: &MediaRecord, target: &RewriteTarget) -> Vec<FieldChange> {
        let matcher = self.settings.matcher();

        MediaField::ALL
            .iter()
            .filter_map(|&field| {
                let old_value = field.value(record)?;
                if !matcher.matches(old_value) {
                    return None;
                }
                Some(FieldChange {
                    field,
                    old_value: old_value.to_string(),
                    new_value: rewrite(old_value, target),
                })
            })
            .collect()
    }

    async fn process_record(
        &self,
        record: &MediaRecord,
        target: &RewriteTarget,
        mode: RunMode,
    ) -> RecordOutcome {
        let changes = self.plan_record(record, target);

        let status = if changes.is_empty() {
            debug!(record_id = %record.guid, title = %record.title, "No changes needed");
            OutcomeStatus::Unchanged
        } else if mode == RunMode::DryRun {
            for change in &changes {
                info!(
                    record_id = %record.guid,
                    field = %change.field,
                    old = %change.old_value,
                    new = %change.new_value,
                    "Would rewrite reference"
                );
            }
            OutcomeStatus::Planned
        } else {
            match self.persist(record, &changes).await {
                Ok(()) => {
                    for change in &changes {
                        info!(
                            record_id = %record.guid,
                            field = %change.field,
                            old = %change.old_value,
                            new = %change.new_value,
                            "Rewrote reference"
                        );
                    }
                    OutcomeStatus::Updated
                }
                Err(e) => {
                    warn!(record_id = %record.guid, title = %record.title, error = %e, "Record update failed");
                    OutcomeStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        RecordOutcome {
            guid: record.guid.clone(),
            title: record.title.clone(),
            status,
            changes,
        }
    }

    /// Write the dirty fields of one record within the store timeout.
    ///
    /// On timeout the update future is dropped, but a statement already handed
    /// to SQLite may still commit. A record reported failed for a timeout can
    /// therefore already hold the new values; the next run settles it either
    /// way.
    async fn persist(&self, record: &MediaRecord, changes: &[FieldChange]) -> Result<(), ReconcileError> {
        let mut update = ReferenceUpdate::default();
        for change in changes {
            update.set(change.field, change.new_value.clone());
        }

        let timeout = self.settings.store_timeout();
        let failed = |reason: String| ReconcileError::RecordUpdateFailed {
            guid: record.guid.clone(),
            reason,
        };

        tokio::time::timeout(timeout, self.store.update_references(&record.guid, &update))
            .await
            .map_err(|_| failed(format!("timed out after {}ms", timeout.as_millis())))?
            .map_err(|e| failed(e.to_string()))
    }
}
