//! OAuth 2.0 authorization-code broker.
//!
//! Builds authorization URLs, exchanges codes at the provider's token
//! endpoint and resolves the user's identity through the provider's
//! user-info endpoint. All outbound calls share one HTTP client with a
//! bounded timeout. Nothing is retried.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use super::error::BrokerError;
use super::provider::{ExternalIdentity, ProviderConfig};

const USER_AGENT: &str = concat!("authgate/", env!("CARGO_PKG_VERSION"));

/// Token response from a provider's token endpoint.
#[derive(Clone, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// OAuth error response from a provider.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Drives the authorization-code flow against registered providers.
pub struct OAuthBroker {
    providers: HashMap<String, ProviderConfig>,
    redirect_url: Url,
    http_client: reqwest::Client,
}

impl OAuthBroker {
    /// Creates a broker with no providers.
    ///
    /// # Arguments
    /// * `redirect_url` - Callback URL shared by all providers
    /// * `request_timeout` - Timeout for every outbound call
    ///
    /// # Errors
    /// Returns `NetworkError` if the HTTP client cannot be built.
    pub fn new(redirect_url: Url, request_timeout: Duration) -> Result<Self, BrokerError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            providers: HashMap::new(),
            redirect_url,
            http_client,
        })
    }

    /// Registers a provider, replacing any with the same ID.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.register(provider);
        self
    }

    /// Registers a provider, replacing any with the same ID.
    pub fn register(&mut self, provider: ProviderConfig) {
        tracing::debug!(provider = %provider.id, "Registered identity provider");
        self.providers.insert(provider.id.clone(), provider);
    }

    #[must_use]
    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Registered provider IDs, sorted.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    fn provider(&self, provider_id: &str) -> Result<&ProviderConfig, BrokerError> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| BrokerError::UnknownProvider(provider_id.to_string()))
    }

    /// Generates a CSRF state value: 256 random bits, base64url.
    #[must_use]
    pub fn generate_state() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Builds the provider's authorization URL with `state` embedded.
    ///
    /// # Errors
    /// Returns `UnknownProvider` or `UrlError`.
    pub fn authorization_url(&self, provider_id: &str, state: &str) -> Result<Url, BrokerError> {
        let provider = self.provider(provider_id)?;

        let mut url = Url::parse(&provider.authorization_endpoint)?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &provider.client_id);
            params.append_pair("redirect_uri", self.redirect_url.as_str());
            params.append_pair("scope", &provider.scopes.join(" "));
            params.append_pair("state", state);

            for (key, value) in &provider.extra_auth_params {
                params.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Exchanges an authorization code for a provider access token.
    ///
    /// # Errors
    /// Returns `UnknownProvider`, `NetworkError` (including timeouts),
    /// `OAuthError` or `TokenExchangeFailed`.
    pub async fn exchange_code(
        &self,
        provider_id: &str,
        code: &str,
    ) -> Result<ProviderToken, BrokerError> {
        let provider = self.provider(provider_id)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
        ];

        tracing::debug!(provider = %provider_id, "Exchanging authorization code");

        let response = self
            .http_client
            .post(&provider.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Some providers report errors with a 200 status
        if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
            return Err(BrokerError::oauth_error(
                oauth_error.error,
                oauth_error.error_description.unwrap_or_default(),
            ));
        }

        if !status.is_success() {
            return Err(BrokerError::TokenExchangeFailed(format!("HTTP {status}")));
        }

        serde_json::from_str::<ProviderToken>(&body).map_err(|e| {
            BrokerError::TokenExchangeFailed(format!("Failed to parse token response: {e}"))
        })
    }

    /// Resolves the user's identity from the provider's user-info endpoint.
    ///
    /// # Errors
    /// Returns `UnknownProvider`, `NetworkError` or `UserInfoFailed`.
    pub async fn fetch_identity(
        &self,
        provider_id: &str,
        token: &ProviderToken,
    ) -> Result<ExternalIdentity, BrokerError> {
        let provider = self.provider(provider_id)?;

        let response = self
            .http_client
            .get(&provider.userinfo_endpoint)
            .header(ACCEPT, "application/json")
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BrokerError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let document: serde_json::Value = response.json().await.map_err(|e| {
            BrokerError::UserInfoFailed(format!("Failed to parse user info response: {e}"))
        })?;

        provider.user_mapping.map(provider_id, &document)
    }
}
