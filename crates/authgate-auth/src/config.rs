//! Authentication configuration.
//!
//! Token lifetimes, signing key locations, login settings and provider
//! credentials. Durations are written in humantime form (`"60m"`, `"30d"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "auth.example"
//! audience = "main-service"
//!
//! [auth.tokens]
//! access_token_lifetime = "60m"
//! refresh_token_lifetime = "30d"
//!
//! [auth.providers.google]
//! client_id = "..."
//! client_secret = "..."
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::token::jwt::SigningAlgorithm;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound for `tokens.access_token_lifetime`.
pub const MAX_ACCESS_TOKEN_LIFETIME: Duration = DAY;
/// Upper bound for `tokens.refresh_token_lifetime`.
pub const MAX_REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(3650 * 24 * 60 * 60);
/// Upper bound for `login.state_lifetime`.
pub const MAX_STATE_LIFETIME: Duration = DAY;
/// Upper bound for `providers.request_timeout`.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Upper bound for `cleanup_interval`.
pub const MAX_CLEANUP_INTERVAL: Duration = DAY;

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim.
    pub issuer: String,

    /// Value of the `aud` claim, also required on verification.
    pub audience: String,

    /// Signing key configuration.
    pub signing: SigningConfig,

    /// Token lifetimes.
    pub tokens: TokenConfig,

    /// Login flow settings.
    pub login: LoginConfig,

    /// External identity providers.
    pub providers: ProvidersConfig,

    /// How often expired refresh tokens and login attempts are swept.
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "auth.example".to_string(),
            audience: "main-service".to_string(),
            signing: SigningConfig::default(),
            tokens: TokenConfig::default(),
            login: LoginConfig::default(),
            providers: ProvidersConfig::default(),
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Signing key configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm: RS256, RS384 or ES384.
    pub algorithm: String,

    /// PEM private key (PKCS#8, PKCS#1 for RSA, SEC1 for EC).
    pub private_key_path: PathBuf,

    /// PEM public key (SPKI, or PKCS#1 for RSA).
    pub public_key_path: PathBuf,

    /// Key ID published in the JWKS and token header.
    /// Derived from the public key when unset.
    pub key_id: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "RS256".to_string(),
            private_key_path: PathBuf::from("./keys/private.key.pem"),
            public_key_path: PathBuf::from("./keys/public.key.pem"),
            key_id: None,
        }
    }
}

impl SigningConfig {
    /// Parses the configured algorithm name.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for unsupported algorithms.
    pub fn signing_algorithm(&self) -> Result<SigningAlgorithm, ConfigError> {
        self.algorithm.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be RS256, RS384, or ES384",
                self.algorithm
            ))
        })
    }
}

/// Token lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime. Every rotation grants a fresh full lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(60 * 60),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Login flow settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginConfig {
    /// How long a CSRF state stays valid after the login start.
    #[serde(with = "humantime_serde")]
    pub state_lifetime: Duration,

    /// Role granted to users created on first login.
    pub default_role: String,

    /// Role required for admin operations. Exact, case-sensitive match.
    pub admin_role: String,

    /// Cap on logins waiting for their callback. The oldest attempt is
    /// evicted once the cap is reached.
    pub max_pending_logins: usize,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            state_lifetime: Duration::from_secs(10 * 60),
            default_role: "Student".to_string(),
            admin_role: "Admin".to_string(),
            max_pending_logins: 10_000,
        }
    }
}

/// External identity provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Timeout for every outbound provider call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Google OAuth client. Not registered when unset.
    pub google: Option<ProviderCredentials>,

    /// GitHub OAuth client. Not registered when unset.
    pub github: Option<ProviderCredentials>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            google: None,
            github: None,
        }
    }
}

/// OAuth client registration at a provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,

    /// Overrides the preset authorization endpoint.
    pub authorization_url: Option<String>,
    /// Overrides the preset token endpoint.
    pub token_url: Option<String>,
    /// Overrides the preset user-info endpoint.
    pub userinfo_url: Option<String>,
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer or audience is empty
    /// - The signing algorithm is not supported
    /// - A lifetime or interval is zero or above its maximum
    /// - `login.max_pending_logins` is zero
    /// - The default or admin role name is empty
    ///
    /// Returns `ConfigError::Missing` if a configured provider has no client ID.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "audience cannot be empty".to_string(),
            ));
        }

        self.signing.signing_algorithm()?;

        for (name, value, max) in [
            (
                "tokens.access_token_lifetime",
                self.tokens.access_token_lifetime,
                MAX_ACCESS_TOKEN_LIFETIME,
            ),
            (
                "tokens.refresh_token_lifetime",
                self.tokens.refresh_token_lifetime,
                MAX_REFRESH_TOKEN_LIFETIME,
            ),
            ("login.state_lifetime", self.login.state_lifetime, MAX_STATE_LIFETIME),
            (
                "providers.request_timeout",
                self.providers.request_timeout,
                MAX_REQUEST_TIMEOUT,
            ),
            ("cleanup_interval", self.cleanup_interval, MAX_CLEANUP_INTERVAL),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
            if value > max {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be at most {}s",
                    max.as_secs()
                )));
            }
        }

        if self.login.max_pending_logins == 0 {
            return Err(ConfigError::InvalidValue(
                "login.max_pending_logins must be > 0".to_string(),
            ));
        }

        if self.login.default_role.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "login.default_role cannot be empty".to_string(),
            ));
        }
        if self.login.admin_role.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "login.admin_role cannot be empty".to_string(),
            ));
        }

        for (name, creds) in [
            ("google", &self.providers.google),
            ("github", &self.providers.github),
        ] {
            if creds.as_ref().is_some_and(|c| c.client_id.trim().is_empty()) {
                return Err(ConfigError::Missing(format!(
                    "providers.{name}.client_id"
                )));
            }
        }

        Ok(())
    }
}
