//! Bearer token authentication extractors.
//!
//! [`BearerAuth`] verifies the `Authorization: Bearer <token>` credential and
//! hands the claims to the handler. [`AdminAuth`] additionally requires the
//! configured admin role. Claims are never re-checked against the credential
//! store: they are the snapshot taken when the token was issued.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use authgate_auth::middleware::BearerAuth;
//!
//! async fn whoami(BearerAuth(claims): BearerAuth) -> String {
//!     claims.sub
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::token::{TokenClaims, TokenIssuer};

// =============================================================================
// Auth State
// =============================================================================

/// State required by the authentication extractors.
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Verifies access tokens.
    pub issuer: Arc<TokenIssuer>,

    /// Role that grants admin access. Exact, case-sensitive match.
    pub admin_role: Arc<str>,
}

impl AuthState {
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>, admin_role: impl Into<Arc<str>>) -> Self {
        Self {
            issuer,
            admin_role: admin_role.into(),
        }
    }

    /// Verifies `token` on the blocking pool.
    ///
    /// # Errors
    /// Returns `Unauthenticated` for any verification failure.
    pub async fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let issuer = Arc::clone(&self.issuer);
        let token = token.to_string();

        tokio::task::spawn_blocking(move || issuer.verify(&token))
            .await
            .map_err(|e| AuthError::internal(format!("token verification task failed: {e}")))?
            .map_err(|e| {
                tracing::debug!(error = %e, "Failed to verify token");
                AuthError::unauthenticated(e.to_string())
            })
    }
}

/// Extracts the bearer token from the `Authorization` header.
///
/// # Errors
/// Returns `Unauthenticated` if the header is missing, not a `Bearer`
/// credential, or empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::unauthenticated("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AuthError::unauthenticated("Malformed Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::unauthenticated("Authorization header is not a Bearer token"))
}

/// Fails with `Forbidden` unless the claims contain `role`.
///
/// # Errors
/// Returns `Forbidden` when the role is absent.
pub fn require_role(claims: &TokenClaims, role: &str) -> Result<(), AuthError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        tracing::debug!(sub = %claims.sub, required = %role, "Role check failed");
        Err(AuthError::forbidden(format!("role '{role}' required")))
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Verified claims of the request's bearer token.
#[derive(Debug, Clone)]
pub struct BearerAuth(pub TokenClaims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = bearer_token(&parts.headers)?;
        let claims = auth_state.authenticate(token).await?;

        tracing::debug!(sub = %claims.sub, jti = %claims.jti, "Token validated");

        Ok(BearerAuth(claims))
    }
}

/// Verified claims of a caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub TokenClaims);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Verify the bearer token
        let BearerAuth(claims) = BearerAuth::from_request_parts(parts, state).await?;

        // 2. Check for the admin role
        let auth_state = AuthState::from_ref(state);
        require_role(&claims, &auth_state.admin_role)?;

        Ok(AdminAuth(claims))
    }
}
