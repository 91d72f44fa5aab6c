//! Bearer token authentication primitives
//!
//! Tokens are 32 random bytes rendered as lowercase hex. Only the SHA-256
//! digest of a token is stored, so a leaked database does not leak
//! credentials. A token is shown exactly once, when it is issued.

use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::db::models::TokenInfo;
use crate::db::tokens::{find_token_hash, insert_token_hash};

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuthError {
    /// No `Authorization` header present
    MissingToken,

    /// Header present but not `Bearer <token>`
    MalformedHeader,

    /// Token not known to the database
    UnknownToken,

    /// Token valid but lacks admin rights
    NotAdmin { name: String },

    /// Database error looking up the token
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingToken => write!(f, "Missing bearer token"),
            ApiAuthError::MalformedHeader => write!(f, "Malformed Authorization header"),
            ApiAuthError::UnknownToken => write!(f, "Invalid token"),
            ApiAuthError::NotAdmin { name } => write!(f, "Token '{}' is not an admin token", name),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Token Handling
// ========================================

/// Generate a new random token (64 hex chars)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// SHA-256 of the token, lowercase hex
pub fn hash_token(token: &str) -> String {
    to_hex(&Sha256::digest(token.as_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Extract the token from an `Authorization` header value
///
/// # Examples
///
/// ```
/// use elevate_common::api::auth::{parse_bearer, ApiAuthError};
///
/// assert_eq!(parse_bearer("Bearer abc123"), Ok("abc123"));
/// assert_eq!(parse_bearer("Basic abc123"), Err(ApiAuthError::MalformedHeader));
/// ```
pub fn parse_bearer(header: &str) -> Result<&str, ApiAuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(ApiAuthError::MalformedHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiAuthError::MalformedHeader);
    }
    Ok(token)
}

/// Create and store a new token, returning the plaintext
pub async fn issue_token(pool: &SqlitePool, name: &str, is_admin: bool) -> crate::Result<String> {
    let token = generate_token();
    insert_token_hash(pool, &hash_token(&token), name, is_admin).await?;
    Ok(token)
}

/// Resolve a plaintext token to its metadata
pub async fn lookup_token(pool: &SqlitePool, token: &str) -> Result<TokenInfo, ApiAuthError> {
    find_token_hash(pool, &hash_token(token))
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?
        .ok_or(ApiAuthError::UnknownToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_generate_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token_known_value() {
        // SHA-256("abc")
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("bearer  tok "), Ok("tok"));
        assert_eq!(parse_bearer("Bearer"), Err(ApiAuthError::MalformedHeader));
        assert_eq!(parse_bearer("Bearer "), Err(ApiAuthError::MalformedHeader));
    }

    #[tokio::test]
    async fn test_issue_and_lookup() {
        let pool = setup_test_db().await;
        let token = issue_token(&pool, "ops", true).await.unwrap();

        let info = lookup_token(&pool, &token).await.unwrap();
        assert_eq!(info.name, "ops");
        assert!(info.is_admin);

        let stored: String = sqlx::query_scalar("SELECT token_hash FROM api_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(stored, token);
    }

    #[tokio::test]
    async fn test_lookup_unknown_token() {
        let pool = setup_test_db().await;
        assert_eq!(
            lookup_token(&pool, "nope").await.unwrap_err(),
            ApiAuthError::UnknownToken
        );
    }
}
