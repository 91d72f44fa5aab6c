//! Music record persistence

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::models::{MediaRecord, ReferenceUpdate};
use crate::Result;

fn row_to_record(row: &SqliteRow) -> MediaRecord {
    MediaRecord {
        guid: row.get("guid"),
        title: row.get("title"),
        artist: row.get("artist"),
        file_url: row.get("file_url"),
        thumbnail_url: row.get("thumbnail_url"),
    }
}

/// Insert a music record, returning its generated guid
pub async fn insert_music(
    pool: &SqlitePool,
    title: &str,
    artist: Option<&str>,
    file_url: Option<&str>,
    thumbnail_url: Option<&str>,
) -> Result<String> {
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO music (guid, title, artist, file_url, thumbnail_url)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(title)
    .bind(artist)
    .bind(file_url)
    .bind(thumbnail_url)
    .execute(pool)
    .await?;

    Ok(guid)
}

/// Load a music record by guid
pub async fn load_music(pool: &SqlitePool, guid: &str) -> Result<Option<MediaRecord>> {
    let row = sqlx::query(
        "SELECT guid, title, artist, file_url, thumbnail_url FROM music WHERE guid = ?",
    )
    .bind(guid)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_record))
}

/// All music records, oldest first
pub async fn list_music(pool: &SqlitePool) -> Result<Vec<MediaRecord>> {
    let rows = sqlx::query(
        "SELECT guid, title, artist, file_url, thumbnail_url FROM music ORDER BY created_at, rowid",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_record).collect())
}

/// Records where either reference contains `needle` anywhere
///
/// `instr` is a case-sensitive literal search, unlike `LIKE`, and needs no
/// escaping of `%` or `_` in the needle.
pub async fn find_music_containing(pool: &SqlitePool, needle: &str) -> Result<Vec<MediaRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, title, artist, file_url, thumbnail_url
        FROM music
        WHERE instr(file_url, ?) > 0 OR instr(thumbnail_url, ?) > 0
        ORDER BY created_at, rowid
        "#,
    )
    .bind(needle)
    .bind(needle)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_record).collect())
}

/// Write only the columns present in `update`
///
/// Returns false if no record with that guid exists. An empty update is a
/// no-op that still reports whether the record exists.
pub async fn update_references(
    pool: &SqlitePool,
    guid: &str,
    update: &ReferenceUpdate,
) -> Result<bool> {
    if update.is_empty() {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM music WHERE guid = ?)")
            .bind(guid)
            .fetch_one(pool)
            .await?;
        return Ok(exists);
    }

    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE music SET ");
    let mut columns = builder.separated(", ");
    if let Some(file_url) = &update.file_url {
        columns.push("file_url = ");
        columns.push_bind_unseparated(file_url.clone());
    }
    if let Some(thumbnail_url) = &update.thumbnail_url {
        columns.push("thumbnail_url = ");
        columns.push_bind_unseparated(thumbnail_url.clone());
    }
    columns.push("updated_at = CURRENT_TIMESTAMP");

    builder.push(" WHERE guid = ");
    builder.push_bind(guid.to_string());

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
