//! HTTP handlers for the authgate endpoints.
//!
//! # Available Handlers
//!
//! - [`oauth`] - Login start and provider callback
//! - [`token`] - Refresh token rotation and revocation
//! - [`verify`] - Bearer token verification
//! - [`jwks`] - Public key set
//! - [`admin`] - Role and permission management
//!
//! # Usage
//!
//! ```ignore
//! use authgate_auth::http::{SessionState, routes};
//!
//! let app = routes().with_state(SessionState::new(session));
//! ```

pub mod admin;
pub mod jwks;
pub mod oauth;
pub mod token;
pub mod verify;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post};

use crate::middleware::AuthState;
use crate::session::SessionService;

pub use admin::{assign_role_handler, remove_role_handler, set_permissions_handler};
pub use jwks::jwks_handler;
pub use oauth::{callback_handler, start_handler};
pub use token::{refresh_handler, revoke_handler};
pub use verify::{VerifyResponse, verify_handler};

/// State shared by every authgate handler.
#[derive(Clone)]
pub struct SessionState {
    pub session: Arc<SessionService>,
    pub auth: AuthState,
}

impl SessionState {
    #[must_use]
    pub fn new(session: Arc<SessionService>) -> Self {
        let auth = AuthState::new(
            Arc::clone(session.issuer()),
            session.config().admin_role.as_str(),
        );
        Self { session, auth }
    }
}

impl FromRef<SessionState> for AuthState {
    fn from_ref(state: &SessionState) -> Self {
        state.auth.clone()
    }
}

/// Builds the router for all authgate endpoints.
pub fn routes() -> Router<SessionState> {
    Router::new()
        .route("/oauth/start/{provider}", get(start_handler))
        .route("/oauth/callback", get(callback_handler))
        .route("/token/refresh", post(refresh_handler))
        .route("/token/revoke", post(revoke_handler))
        .route("/verify", get(verify_handler))
        .route("/.well-known/jwks.json", get(jwks_handler))
        .route("/admin/assign-role", post(assign_role_handler))
        .route("/admin/remove-role", post(remove_role_handler))
        .route("/admin/set-permissions", post(set_permissions_handler))
}
