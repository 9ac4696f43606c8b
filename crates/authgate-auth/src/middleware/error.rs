//! Error response handling.
//!
//! Maps `AuthError` to an OAuth-style JSON body `{error, error_description}`.
//! Only `BadRequest` echoes its message; 401, 403 and 5xx responses carry a
//! fixed description so clients cannot tell failure causes apart. The full
//! error is logged server-side.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.oauth_error_code();
        let description = client_description(&self);

        if self.is_server_error() {
            tracing::warn!(error = %self, category = %self.category(), "Request failed");
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Request rejected");
        }

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"authgate\", error=\"invalid_token\""),
            );
        }

        let body = json!({
            "error": error_code,
            "error_description": description,
        });

        (status, headers, Json(body)).into_response()
    }
}

/// The description a client is allowed to see.
fn client_description(error: &AuthError) -> String {
    match error {
        AuthError::BadRequest { message } => message.clone(),
        AuthError::Unauthenticated { .. } => "Invalid or missing credentials".to_string(),
        AuthError::Forbidden { .. } => "Insufficient privileges".to_string(),
        AuthError::ExchangeFailed { .. }
        | AuthError::Storage { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => "Internal server error".to_string(),
    }
}
