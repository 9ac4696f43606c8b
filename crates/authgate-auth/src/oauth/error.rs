//! Error types for OAuth broker operations.

/// Errors that can occur while talking to an external identity provider.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The requested provider is not registered.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The token endpoint returned something unusable.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The provider answered with an OAuth error document.
    #[error("OAuth error: {error} - {description}")]
    OAuthError {
        /// OAuth error code.
        error: String,
        /// Error description.
        description: String,
    },

    /// The user-info endpoint failed or returned an unusable document.
    #[error("User info request failed: {0}")]
    UserInfoFailed(String),

    /// A network error occurred (including timeouts).
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Failed to parse a URL.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl BrokerError {
    /// Creates an `OAuthError` from an error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuthError {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns `true` if the provider is not registered.
    #[must_use]
    pub fn is_unknown_provider(&self) -> bool {
        matches!(self, Self::UnknownProvider(_))
    }

    /// Returns `true` if the request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NetworkError(e) if e.is_timeout())
    }
}
