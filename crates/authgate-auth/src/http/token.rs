//! Refresh token endpoints.
//!
//! # Request Format
//!
//! ```text
//! POST /token/refresh
//! Content-Type: application/json
//!
//! {"refresh_token": "..."}
//! ```
//!
//! `/token/revoke` takes the same body and always answers 200 for a
//! well-formed request, whether or not the token was live.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Deserialize;

use super::SessionState;
use crate::error::AuthError;
use crate::session::TokenPair;

/// Body of `/token/refresh` and `/token/revoke`.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Handler for `POST /token/refresh`.
pub async fn refresh_handler(
    State(state): State<SessionState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::bad_request(e.body_text()))?;

    let tokens = state.session.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

/// Handler for `POST /token/revoke`.
pub async fn revoke_handler(
    State(state): State<SessionState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::bad_request(e.body_text()))?;

    state.session.revoke(&request.refresh_token).await?;
    Ok(StatusCode::OK)
}
