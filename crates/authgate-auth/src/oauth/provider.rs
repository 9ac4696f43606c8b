//! External identity provider configuration.
//!
//! Each provider is described by its OAuth client registration, its
//! endpoints, the scopes to request and how to read the user-info document.
//! [`ProviderConfig::google`] and [`ProviderConfig::github`] carry presets.
//!
//! # Example
//!
//! ```ignore
//! use authgate_auth::oauth::ProviderConfig;
//!
//! let google = ProviderConfig::google("client-id", "client-secret");
//! let local = ProviderConfig::github("id", "secret")
//!     .with_token_endpoint("http://127.0.0.1:9000/token");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::BrokerError;

/// Configuration of one external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identifier used in URLs (e.g. `google`).
    pub id: String,

    pub client_id: String,

    #[serde(skip_serializing)]
    pub client_secret: String,

    pub authorization_endpoint: String,

    pub token_endpoint: String,

    pub userinfo_endpoint: String,

    /// Scopes requested on the authorization URL.
    pub scopes: Vec<String>,

    /// Extra query parameters appended to the authorization URL.
    #[serde(default)]
    pub extra_auth_params: Vec<(String, String)>,

    /// How to read the user-info document.
    #[serde(default)]
    pub user_mapping: UserInfoMapping,
}

impl ProviderConfig {
    /// Creates a provider with explicit endpoints.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        userinfo_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            userinfo_endpoint: userinfo_endpoint.into(),
            scopes: Vec::new(),
            extra_auth_params: Vec::new(),
            user_mapping: UserInfoMapping::default(),
        }
    }

    /// Google preset: OpenID scopes, offline access.
    #[must_use]
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(
            "google",
            client_id,
            client_secret,
            "https://accounts.google.com/o/oauth2/auth",
            "https://oauth2.googleapis.com/token",
            "https://openidconnect.googleapis.com/v1/userinfo",
        )
        .with_scopes(["openid", "email", "profile"])
        .with_extra_auth_param("access_type", "offline")
    }

    /// GitHub preset: numeric `id` subject, `login` as name fallback.
    #[must_use]
    pub fn github(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(
            "github",
            client_id,
            client_secret,
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
            "https://api.github.com/user",
        )
        .with_scopes(["user:email"])
        .with_user_mapping(UserInfoMapping {
            subject_claim: "id".to_string(),
            email_claim: "email".to_string(),
            name_claim: "name".to_string(),
            name_fallback_claim: Some("login".to_string()),
        })
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an extra authorization URL parameter.
    #[must_use]
    pub fn with_extra_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_auth_params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_userinfo_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.userinfo_endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_user_mapping(mut self, mapping: UserInfoMapping) -> Self {
        self.user_mapping = mapping;
        self
    }
}

/// Claim names to read from the user-info document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoMapping {
    /// Stable subject identifier. Numbers are stringified.
    pub subject_claim: String,
    pub email_claim: String,
    pub name_claim: String,
    /// Used when `name_claim` is absent or empty.
    #[serde(default)]
    pub name_fallback_claim: Option<String>,
}

impl Default for UserInfoMapping {
    fn default() -> Self {
        Self {
            subject_claim: "sub".to_string(),
            email_claim: "email".to_string(),
            name_claim: "name".to_string(),
            name_fallback_claim: None,
        }
    }
}

/// The identity an external provider asserted for the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserInfoMapping {
    /// Maps a user-info document to an [`ExternalIdentity`].
    ///
    /// # Errors
    /// Returns `UserInfoFailed` if the subject claim is missing.
    pub fn map(&self, provider: &str, document: &Value) -> Result<ExternalIdentity, BrokerError> {
        let subject = claim_as_string(document, &self.subject_claim).ok_or_else(|| {
            BrokerError::UserInfoFailed(format!(
                "user info is missing subject claim '{}'",
                self.subject_claim
            ))
        })?;

        let name = claim_as_string(document, &self.name_claim).or_else(|| {
            self.name_fallback_claim
                .as_deref()
                .and_then(|claim| claim_as_string(document, claim))
        });

        Ok(ExternalIdentity {
            provider: provider.to_string(),
            subject,
            email: claim_as_string(document, &self.email_claim),
            name,
        })
    }
}

fn claim_as_string(document: &Value, claim: &str) -> Option<String> {
    match document.get(claim)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
