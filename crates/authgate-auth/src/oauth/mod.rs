//! External identity provider login.
//!
//! - [`broker`] - authorization URL, code exchange, user-info lookup
//! - [`provider`] - provider configuration and presets
//! - [`attempt`] - CSRF state binding for pending logins

pub mod attempt;
pub mod broker;
pub mod error;
pub mod provider;

pub use attempt::{LoginAttempts, LoginPhase, PendingLogin};
pub use broker::{OAuthBroker, ProviderToken};
pub use error::BrokerError;
pub use provider::{ExternalIdentity, ProviderConfig, UserInfoMapping};
