//! Error types for authentication and authorization.

use std::fmt;

use axum::http::StatusCode;

/// Errors surfaced by the session, gate and HTTP layers.
///
/// Detailed messages are kept for server-side logging. What reaches the
/// client is decided by the `IntoResponse` implementation in
/// [`crate::middleware::error`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed input: missing code, unparsable body, bad state.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// Missing, invalid or expired credential.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Server-side description of the failure.
        message: String,
    },

    /// Authenticated but lacking the required role.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Server-side description of the failure.
        message: String,
    },

    /// The identity provider exchange or user-info call failed.
    #[error("Exchange with provider '{provider}' failed: {message}")]
    ExchangeFailed {
        /// Provider identifier.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// Credential store failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// Internal failure (signing, task join, store failure on admin path).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `ExchangeFailed` error.
    #[must_use]
    pub fn exchange_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExchangeFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error was caused by the client (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. } | Self::Unauthenticated { .. } | Self::Forbidden { .. }
        )
    }

    /// Returns `true` if this is a server-side error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::ExchangeFailed { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } => ErrorCategory::Validation,
            Self::Unauthenticated { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::ExchangeFailed { .. } => ErrorCategory::Federation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 style error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "invalid_request",
            Self::Unauthenticated { .. } => "invalid_token",
            Self::Forbidden { .. } => "access_denied",
            Self::ExchangeFailed { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Permission check failed.
    Authorization,
    /// Request validation failed.
    Validation,
    /// External identity provider failed.
    Federation,
    /// Storage failure.
    Infrastructure,
    /// Configuration problem.
    Configuration,
    /// Anything else on the server side.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Federation => write!(f, "federation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
