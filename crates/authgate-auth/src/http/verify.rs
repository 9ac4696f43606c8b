//! Token verification endpoint.

use axum::Json;
use serde::Serialize;

use crate::middleware::BearerAuth;

/// Identity and authorization data of a verified access token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Handler for `GET /verify`.
///
/// Returns the claims of the bearer token. Rejections are produced by the
/// [`BearerAuth`] extractor.
pub async fn verify_handler(BearerAuth(claims): BearerAuth) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        user_id: claims.user_id,
        roles: claims.roles,
        permissions: claims.permissions,
        exp: claims.exp,
    })
}
