//! Storage seam for reconciliation

use async_trait::async_trait;
use sqlx::SqlitePool;

pub use crate::db::models::{MediaField, MediaRecord, ReferenceUpdate};
use crate::db::music;
use crate::{Error, Result};

/// The two store operations reconciliation relies on
///
/// Both are atomic per record. Implementations return errors rather than
/// panicking; the driver decides whether an error is fatal.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Every record whose `file_url` or `thumbnail_url` contains `needle`,
    /// fully materialized
    async fn find_containing(&self, needle: &str) -> Result<Vec<MediaRecord>>;

    /// Every record, for auditing
    async fn list_all(&self) -> Result<Vec<MediaRecord>>;

    /// Write only the columns set in `update`
    async fn update_references(&self, guid: &str, update: &ReferenceUpdate) -> Result<()>;
}

/// [`MediaStore`] over the `music` table
#[derive(Debug, Clone)]
pub struct SqliteMediaStore {
    pool: SqlitePool,
}

impl SqliteMediaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for SqliteMediaStore {
    async fn find_containing(&self, needle: &str) -> Result<Vec<MediaRecord>> {
        music::find_music_containing(&self.pool, needle).await
    }

    async fn list_all(&self) -> Result<Vec<MediaRecord>> {
        music::list_music(&self.pool).await
    }

    async fn update_references(&self, guid: &str, update: &ReferenceUpdate) -> Result<()> {
        if music::update_references(&self.pool, guid, update).await? {
            Ok(())
        } else {
            Err(Error::RecordNotFound(guid.to_string()))
        }
    }
}
