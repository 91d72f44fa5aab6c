//! Candidate record query

use std::time::Duration;
use tracing::debug;

use super::error::ReconcileError;
use super::matcher::StaleHostMatcher;
use super::store::{MediaRecord, MediaStore};

/// Fetch every record with a reference containing the stale host.
///
/// The whole result set is materialized before returning so no cursor stays
/// open across the (slow) update loop. The store query is a plain substring
/// search; the driver still applies the matcher per field, which only looks
/// at the authority.
///
/// Any failure, including exceeding `timeout`, is `StoreUnavailable`.
pub async fn find_stale_records<S: MediaStore + ?Sized>(
    store: &S,
    matcher: &StaleHostMatcher,
    timeout: Duration,
) -> Result<Vec<MediaRecord>, ReconcileError> {
    let records = tokio::time::timeout(timeout, store.find_containing(matcher.marker()))
        .await
        .map_err(|_| {
            ReconcileError::StoreUnavailable(format!(
                "candidate query timed out after {}ms",
                timeout.as_millis()
            ))
        })?
        .map_err(|e| ReconcileError::StoreUnavailable(e.to_string()))?;

    debug!(marker = matcher.marker(), found = records.len(), "Scanned for stale references");
    Ok(records)
}
