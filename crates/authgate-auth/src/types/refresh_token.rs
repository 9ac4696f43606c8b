//! Refresh token domain type.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - A token is single-use: refreshing deletes it and mints a replacement
//! - Expired tokens read as absent and are swept periodically

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Refresh token record held by the credential store.
///
/// The plaintext value is handed to the client once and never stored.
/// Lookups hash the presented value and search by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// SHA-256 hash of the token value (hex).
    pub token_hash: String,

    /// Owning user.
    pub user_id: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Absolute expiry. The token is unusable at or after this instant.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshToken {
    /// Mints a new token for `user_id` valid for `lifetime`.
    ///
    /// Returns the plaintext value for the client together with the record
    /// to persist.
    #[must_use]
    pub fn issue(user_id: impl Into<String>, lifetime: Duration) -> (String, Self) {
        let token = Self::generate_token();
        let now = OffsetDateTime::now_utc();
        let record = Self {
            token_hash: Self::hash_token(&token),
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + lifetime,
        };
        (token, record)
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if this token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Hash a token value using SHA-256.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
