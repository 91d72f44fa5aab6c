//! API token persistence (hashes only)

use sqlx::{Row, SqlitePool};

use super::models::TokenInfo;
use crate::Result;

/// Store a token hash
pub async fn insert_token_hash(
    pool: &SqlitePool,
    token_hash: &str,
    name: &str,
    is_admin: bool,
) -> Result<()> {
    sqlx::query("INSERT INTO api_tokens (token_hash, name, is_admin) VALUES (?, ?, ?)")
        .bind(token_hash)
        .bind(name)
        .bind(is_admin as i64)
        .execute(pool)
        .await?;

    Ok(())
}

/// Look up a token by its hash
pub async fn find_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<Option<TokenInfo>> {
    let row = sqlx::query("SELECT name, is_admin FROM api_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| TokenInfo {
        name: row.get("name"),
        is_admin: row.get::<i64, _>("is_admin") != 0,
    }))
}
