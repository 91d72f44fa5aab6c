//! Media reference reconciliation endpoints

use axum::{body::Bytes, extract::State, Extension, Json};
use elevate_common::db::TokenInfo;
use elevate_common::reconcile::{
    audit_references, MediaField, ReconciliationReport, Reconciler, ReferenceAudit,
    SqliteMediaStore, TargetForm,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Optional body of POST /api/music/update-urls
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUrlsRequest {
    /// Overrides the configured target form for this run
    pub target_form: Option<TargetForm>,
    /// Compute changes without writing them
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub id: String,
    pub title: String,
    pub field: MediaField,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub id: String,
    pub title: String,
    pub error: String,
}

/// Response of POST /api/music/update-urls
///
/// `totalFound` is omitted when the scan found nothing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUrlsResponse {
    pub success: bool,
    pub message: String,
    pub updated_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_found: Option<usize>,
    pub planned_count: usize,
    pub unchanged_count: usize,
    pub failed_count: usize,
    pub dry_run: bool,
    pub target_form: TargetForm,
    pub changes: Vec<ChangeEntry>,
    pub failures: Vec<FailureEntry>,
}

impl From<ReconciliationReport> for UpdateUrlsResponse {
    fn from(report: ReconciliationReport) -> Self {
        let changes = report
            .applied_changes()
            .map(|(outcome, change)| ChangeEntry {
                id: outcome.guid.clone(),
                title: outcome.title.clone(),
                field: change.field,
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            })
            .collect();
        let failures = report
            .failures()
            .map(|(outcome, error)| FailureEntry {
                id: outcome.guid.clone(),
                title: outcome.title.clone(),
                error: error.to_string(),
            })
            .collect();

        Self {
            success: true,
            message: report.message(),
            updated_count: report.updated,
            total_found: (report.scanned > 0).then_some(report.scanned),
            planned_count: report.planned,
            unchanged_count: report.unchanged,
            failed_count: report.failed,
            dry_run: report.dry_run,
            target_form: report.target_form,
            changes,
            failures,
        }
    }
}

/// POST /api/music/update-urls
///
/// Rewrites stale media references. The body is optional; an empty body runs
/// with the configured defaults. Responds 200 whenever the run completed,
/// including when individual records failed (see `failedCount`).
pub async fn update_urls(
    State(state): State<AppState>,
    Extension(caller): Extension<TokenInfo>,
    body: Bytes,
) -> ApiResult<Json<UpdateUrlsResponse>> {
    let request: UpdateUrlsRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpdateUrlsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let settings = match request.target_form {
        Some(target_form) => state.reconcile.with_target_form(target_form)?,
        None => state.reconcile.clone(),
    };

    info!(
        caller = %caller.name,
        target = %settings.target_form(),
        dry_run = request.dry_run,
        "Reference reconciliation requested"
    );

    let reconciler = Reconciler::new(SqliteMediaStore::new(state.db.clone()), settings);
    let report = if request.dry_run {
        reconciler.plan().await?
    } else {
        reconciler.reconcile().await?
    };

    Ok(Json(report.into()))
}

/// GET /api/music/url-audit
///
/// Classifies every stored reference without changing anything. The asset
/// check needs the uploads directory on the local disk and is left to
/// `elevate-ctl audit --uploads-dir`.
pub async fn url_audit(State(state): State<AppState>) -> ApiResult<Json<ReferenceAudit>> {
    let store = SqliteMediaStore::new(state.db.clone());
    let audit = audit_references(
        &store,
        state.reconcile.matcher(),
        state.reconcile.store_timeout(),
        None,
    )
    .await?;

    Ok(Json(audit))
}
