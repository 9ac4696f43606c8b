//! Request authentication and authorization.
//!
//! - [`auth`] - `BearerAuth` and `AdminAuth` extractors
//! - [`error`] - `IntoResponse` for `AuthError`

pub mod auth;
pub mod error;

pub use auth::{AdminAuth, AuthState, BearerAuth, bearer_token, require_role};
