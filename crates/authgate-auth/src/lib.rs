//! # authgate-auth
//!
//! Identity and token service core for authgate.
//!
//! This crate provides:
//! - RSA/EC signed access tokens (JWT) and their public key set (JWKS)
//! - OAuth 2.0 authorization-code login against external providers
//! - Rotating, single-use refresh tokens
//! - Bearer token and exact role-name authorization for axum handlers
//!
//! ## Modules
//!
//! - [`config`] - Token, login and provider configuration
//! - [`token`] - Signing keys, issuance and verification
//! - [`oauth`] - Provider broker and pending login attempts
//! - [`storage`] - Credential store trait and in-memory implementation
//! - [`session`] - Login, refresh and admin flows
//! - [`middleware`] - Authentication extractors and error responses
//! - [`http`] - Axum handlers and router

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use http::{SessionState, VerifyResponse, routes};
pub use middleware::{AdminAuth, AuthState, BearerAuth};
pub use oauth::{BrokerError, OAuthBroker, ProviderConfig};
pub use session::{LoginResponse, SessionConfig, SessionService, TokenPair};
pub use storage::{CredentialStore, InMemoryCredentialStore, StoreError};
pub use token::{SigningAlgorithm, SigningKeyPair, TokenClaims, TokenIssuer};
pub use types::{RefreshToken, User};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use authgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{SessionState, routes};
    pub use crate::middleware::{AdminAuth, AuthState, BearerAuth};
    pub use crate::oauth::{OAuthBroker, ProviderConfig};
    pub use crate::session::{SessionConfig, SessionService};
    pub use crate::storage::{CredentialStore, InMemoryCredentialStore};
    pub use crate::token::{SigningAlgorithm, SigningKeyPair, TokenClaims, TokenIssuer};
    pub use crate::types::{RefreshToken, User};
}
