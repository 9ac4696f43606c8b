//! JWKS endpoint.
//!
//! Serves `/.well-known/jwks.json` so downstream services can verify access
//! tokens locally. Clients may cache the document for an hour.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::SessionState;

/// Handler for `GET /.well-known/jwks.json`.
///
/// # Example Response
///
/// ```json
/// {
///   "keys": [
///     {
///       "kty": "RSA",
///       "kid": "0x9aVt3J5ycNvCMlCuY0bQ",
///       "use": "sig",
///       "alg": "RS256",
///       "n": "base64url-encoded-modulus",
///       "e": "AQAB"
///     }
///   ]
/// }
/// ```
pub async fn jwks_handler(State(state): State<SessionState>) -> impl IntoResponse {
    let jwks = state.session.issuer().jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
