//! Read-only classification of stored references
//!
//! Answers "how many references are still stale, and where" without changing
//! anything. Useful before a run, and afterwards to confirm it converged.
//! Given the uploads directory it also lists references whose file is not
//! on disk.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::error::ReconcileError;
use super::matcher::{split_authority, StaleHostMatcher};
use super::store::{MediaField, MediaRecord, MediaStore};

/// Form a stored reference is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Authority contains the stale host
    Stale,
    /// Any other absolute URL
    Absolute,
    /// Starts with `/`
    RootRelative,
    /// Bare filenames and anything else
    Other,
}

/// Classify a single reference
pub fn classify_reference(reference: &str, matcher: &StaleHostMatcher) -> ReferenceKind {
    if matcher.matches(reference) {
        ReferenceKind::Stale
    } else if reference.contains("://") {
        ReferenceKind::Absolute
    } else if reference.starts_with('/') {
        ReferenceKind::RootRelative
    } else {
        ReferenceKind::Other
    }
}

/// A record that still carries at least one stale reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleRecord {
    pub guid: String,
    pub title: String,
    pub fields: Vec<MediaField>,
}

/// A reference whose file name is not present in the uploads directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAsset {
    pub guid: String,
    pub title: String,
    pub field: MediaField,
    pub file_name: String,
}

/// Totals over every stored reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceAudit {
    pub total_records: usize,
    pub total_references: usize,
    pub missing_references: usize,
    pub stale: usize,
    pub absolute: usize,
    pub root_relative: usize,
    pub other: usize,
    pub stale_records: Vec<StaleRecord>,
    /// `None` unless an uploads directory was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_assets: Option<Vec<MissingAsset>>,
}

impl ReferenceAudit {
    /// No stale references and, if assets were checked, none missing
    pub fn is_clean(&self) -> bool {
        self.stale == 0 && self.missing_assets.as_ref().map_or(true, Vec::is_empty)
    }
}

/// File name a reference points at: the last path segment, without query or
/// fragment. Bare names are returned as they are.
pub fn asset_file_name(reference: &str) -> &str {
    let path = if reference.contains("://") || reference.starts_with('/') {
        split_authority(reference).1
    } else {
        reference
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    path.rsplit('/').next().unwrap_or(path)
}

/// References of `records` whose file is not a regular file directly inside
/// `uploads_dir`
pub fn find_missing_assets(
    records: &[MediaRecord],
    uploads_dir: &Path,
) -> Result<Vec<MissingAsset>, ReconcileError> {
    if !uploads_dir.is_dir() {
        return Err(ReconcileError::InvalidConfiguration(format!(
            "uploads directory {} does not exist",
            uploads_dir.display()
        )));
    }

    let mut missing = Vec::new();
    for record in records {
        for field in MediaField::ALL {
            let Some(reference) = field.value(record) else {
                continue;
            };
            let file_name = asset_file_name(reference);
            if file_name.is_empty() || !uploads_dir.join(file_name).is_file() {
                debug!(record_id = %record.guid, field = %field, file_name, "Referenced asset missing");
                missing.push(MissingAsset {
                    guid: record.guid.clone(),
                    title: record.title.clone(),
                    field,
                    file_name: file_name.to_string(),
                });
            }
        }
    }
    Ok(missing)
}

/// Classify every reference of every record in the store.
///
/// With `uploads_dir`, also check that each referenced file exists there.
pub async fn audit_references<S: MediaStore + ?Sized>(
    store: &S,
    matcher: &StaleHostMatcher,
    timeout: Duration,
    uploads_dir: Option<&Path>,
) -> Result<ReferenceAudit, ReconcileError> {
    let records = tokio::time::timeout(timeout, store.list_all())
        .await
        .map_err(|_| {
            ReconcileError::StoreUnavailable(format!(
                "record listing timed out after {}ms",
                timeout.as_millis()
            ))
        })?
        .map_err(|e| ReconcileError::StoreUnavailable(e.to_string()))?;

    let mut audit = ReferenceAudit {
        total_records: records.len(),
        ..Default::default()
    };

    for record in &records {
        let mut stale_fields = Vec::new();

        for field in MediaField::ALL {
            let Some(reference) = field.value(record) else {
                audit.missing_references += 1;
                continue;
            };
            audit.total_references += 1;

            match classify_reference(reference, matcher) {
                ReferenceKind::Stale => {
                    audit.stale += 1;
                    stale_fields.push(field);
                }
                ReferenceKind::Absolute => audit.absolute += 1,
                ReferenceKind::RootRelative => audit.root_relative += 1,
                ReferenceKind::Other => audit.other += 1,
            }
        }

        if !stale_fields.is_empty() {
            audit.stale_records.push(StaleRecord {
                guid: record.guid.clone(),
                title: record.title.clone(),
                fields: stale_fields,
            });
        }
    }

    if let Some(dir) = uploads_dir {
        audit.missing_assets = Some(find_missing_assets(&records, dir)?);
    }

    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_schema, music::insert_music};
    use crate::reconcile::store::SqliteMediaStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_reference() {
        let m = StaleHostMatcher::new("192.168.0.100:5000");
        assert_eq!(
            classify_reference("http://192.168.0.100:5000/uploads/a.mp3", &m),
            ReferenceKind::Stale
        );
        assert_eq!(
            classify_reference("https://example-host.test/uploads/a.mp3", &m),
            ReferenceKind::Absolute
        );
        assert_eq!(classify_reference("/uploads/a.mp3", &m), ReferenceKind::RootRelative);
        assert_eq!(classify_reference("a.mp3", &m), ReferenceKind::Other);
    }

    #[tokio::test]
    async fn test_audit_counts() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();

        insert_music(
            &pool,
            "stale",
            None,
            Some("http://192.168.0.100:5000/uploads/a.mp3"),
            Some("/uploads/a.png"),
        )
        .await
        .unwrap();
        insert_music(&pool, "clean", None, Some("https://example-host.test/uploads/b.mp3"), None)
            .await
            .unwrap();

        let store = SqliteMediaStore::new(pool);
        let audit = audit_references(
            &store,
            &StaleHostMatcher::new("192.168.0.100:5000"),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();

        assert_eq!(audit.total_records, 2);
        assert_eq!(audit.total_references, 3);
        assert_eq!(audit.missing_references, 1);
        assert_eq!((audit.stale, audit.absolute, audit.root_relative), (1, 1, 1));
        assert!(!audit.is_clean());
        assert_eq!(audit.stale_records.len(), 1);
        assert_eq!(audit.stale_records[0].title, "stale");
        assert_eq!(audit.stale_records[0].fields, vec![MediaField::FileUrl]);
        assert!(audit.missing_assets.is_none());
    }

    #[test]
    fn test_asset_file_name() {
        assert_eq!(
            asset_file_name("http://192.168.0.100:5000/uploads/1699999999-abc_song.mp3"),
            "1699999999-abc_song.mp3"
        );
        assert_eq!(asset_file_name("/uploads/a.png?v=2"), "a.png");
        assert_eq!(asset_file_name("https://example-host.test/uploads/a.mp3#t=3"), "a.mp3");
        assert_eq!(asset_file_name("a.mp3"), "a.mp3");
        assert_eq!(asset_file_name("https://example-host.test"), "");
    }

    #[tokio::test]
    async fn test_audit_reports_missing_assets() {
        let temp_dir = TempDir::new().unwrap();
        let uploads = temp_dir.path();
        fs::write(uploads.join("present.mp3"), b"mp3").unwrap();
        fs::write(uploads.join("cover.png"), b"png").unwrap();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        insert_music(
            &pool,
            "complete",
            None,
            Some("http://192.168.0.100:5000/uploads/present.mp3"),
            Some("/uploads/cover.png?v=1"),
        )
        .await
        .unwrap();
        let gone = insert_music(&pool, "gone", None, Some("/uploads/absent.mp3"), None)
            .await
            .unwrap();

        let store = SqliteMediaStore::new(pool);
        let matcher = StaleHostMatcher::new("192.168.0.100:5000");
        let audit = audit_references(&store, &matcher, Duration::from_secs(5), Some(uploads))
            .await
            .unwrap();

        let missing = audit.missing_assets.clone().unwrap();
        assert_eq!(
            missing,
            vec![MissingAsset {
                guid: gone,
                title: "gone".to_string(),
                field: MediaField::FileUrl,
                file_name: "absent.mp3".to_string(),
            }]
        );
        assert!(!audit.is_clean());

        let err = audit_references(
            &store,
            &matcher,
            Duration::from_secs(5),
            Some(&uploads.join("nowhere")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidConfiguration(_)));
    }
}
