//! Admin endpoints for role and permission management.
//!
//! All handlers require a bearer token carrying the admin role and answer
//! `200` with an empty body on success.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::Deserialize;

use super::SessionState;
use crate::error::AuthError;
use crate::middleware::AdminAuth;

/// Body of `/admin/assign-role` and `/admin/remove-role`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub user_id: String,
    pub role: String,
}

/// Body of `/admin/set-permissions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsRequest {
    pub user_id: String,
    pub permissions: Vec<String>,
}

fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AuthError::bad_request(e.body_text()))
}

/// Handler for `POST /admin/assign-role`.
pub async fn assign_role_handler(
    State(state): State<SessionState>,
    AdminAuth(claims): AdminAuth,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let request = parse(payload)?;
    state
        .session
        .assign_role(&claims, &request.user_id, &request.role)
        .await?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /admin/remove-role`.
pub async fn remove_role_handler(
    State(state): State<SessionState>,
    AdminAuth(claims): AdminAuth,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let request = parse(payload)?;
    state
        .session
        .remove_role(&claims, &request.user_id, &request.role)
        .await?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /admin/set-permissions`.
pub async fn set_permissions_handler(
    State(state): State<SessionState>,
    AdminAuth(claims): AdminAuth,
    payload: Result<Json<PermissionsRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let request = parse(payload)?;
    state
        .session
        .set_permissions(&claims, &request.user_id, &request.permissions)
        .await?;
    Ok(StatusCode::OK)
}
