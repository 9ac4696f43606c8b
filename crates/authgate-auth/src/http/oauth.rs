//! Login endpoints.
//!
//! - `GET /oauth/start/{provider}` redirects to the provider
//! - `GET /oauth/callback` completes the login and returns the token pair

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::SessionState;
use crate::error::AuthError;
use crate::session::{CallbackParams, LoginResponse};

/// Handler for `GET /oauth/start/{provider}`.
///
/// Responds with `302 Found` to the provider's authorization URL.
pub async fn start_handler(
    State(state): State<SessionState>,
    Path(provider): Path<String>,
) -> Result<Response, AuthError> {
    let start = state.session.start_login(&provider)?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, start.authorization_url.to_string())],
    )
        .into_response())
}

/// Handler for `GET /oauth/callback?code=..&state=..[&provider=..]`.
pub async fn callback_handler(
    State(state): State<SessionState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Query(params) = params.map_err(|e| AuthError::bad_request(e.body_text()))?;

    let response = state.session.complete_login(params).await?;
    Ok(Json(response))
}
