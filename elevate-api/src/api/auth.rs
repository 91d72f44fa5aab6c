//! Admin authentication middleware
//!
//! Expects `Authorization: Bearer <token>`. Missing or unknown tokens get
//! 401, valid non-admin tokens get 403; in both cases the handler never runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use elevate_common::api::{lookup_token, parse_bearer, ApiAuthError};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Admin-only middleware
///
/// On success the caller's [`TokenInfo`](elevate_common::db::TokenInfo) is
/// inserted into the request extensions for handlers to log.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .ok_or(ApiAuthError::MissingToken)?
            .to_str()
            .map_err(|_| ApiAuthError::MalformedHeader)?;
        parse_bearer(header)?.to_string()
    };
    let path = request.uri().path().to_string();

    let info = lookup_token(&state.db, &token).await.map_err(|e| {
        warn!(path = %path, error = %e, "Rejected request");
        e
    })?;

    if !info.is_admin {
        warn!(token_name = %info.name, path = %path, "Non-admin token refused");
        return Err(ApiAuthError::NotAdmin { name: info.name }.into());
    }

    debug!(token_name = %info.name, "Admin authenticated");
    request.extensions_mut().insert(info);
    Ok(next.run(request).await)
}
