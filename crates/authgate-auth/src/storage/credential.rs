//! Credential store trait.
//!
//! The store owns users, their role and permission assignments, and refresh
//! tokens.
//!
//! # Contract
//!
//! - Writes are visible to subsequent reads on the same store instance
//! - An expired refresh token reads exactly like a missing one
//! - Mutations of a single key are atomic against concurrent callers
//! - [`CredentialStore::delete_refresh_token`] is a compare-and-delete:
//!   exactly one of several concurrent callers for the same token wins

use async_trait::async_trait;

use crate::types::{RefreshToken, User};

/// Errors returned by credential store implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist (or has expired).
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Lookup key.
        key: String,
    },

    /// A record with the same key already exists.
    #[error("{entity} already exists: {key}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// The backend failed.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for users and refresh tokens.
///
/// Implementations are selected at construction time and shared as
/// `Arc<dyn CredentialStore>`.
///
/// # Implementations
///
/// - [`crate::storage::InMemoryCredentialStore`] - volatile, for tests and
///   development
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the user ID or the `(provider, provider_id)`
    /// pair is already taken.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such user exists.
    async fn get_user_by_id(&self, user_id: &str) -> StoreResult<User>;

    /// Finds a user by the identity an external provider assigned.
    ///
    /// # Arguments
    ///
    /// * `provider` - Provider name (e.g. `google`)
    /// * `subject` - Provider-assigned subject ID
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no user is linked to that identity.
    async fn get_user_by_provider(&self, provider: &str, subject: &str) -> StoreResult<User>;

    /// Replaces a user's email, name, roles and permissions.
    ///
    /// The provider link is fixed at creation and is not changed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    /// Appends a role. Adding a role the user already holds is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    async fn assign_role(&self, user_id: &str, role: &str) -> StoreResult<()>;

    /// Removes a role. Removing a role the user lacks is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    async fn remove_role(&self, user_id: &str, role: &str) -> StoreResult<()>;

    /// Replaces the user's permission set wholesale (deduplicated).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    async fn set_permissions(&self, user_id: &str, permissions: &[String]) -> StoreResult<()>;

    /// Stores a refresh token keyed by its hash.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if a live token with the same hash exists.
    async fn save_refresh_token(&self, token: RefreshToken) -> StoreResult<()>;

    /// Finds a live refresh token by hash.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the token is missing or expired.
    async fn get_refresh_token(&self, token_hash: &str) -> StoreResult<RefreshToken>;

    /// Atomically removes a live refresh token and returns it.
    ///
    /// Of several concurrent callers with the same hash exactly one receives
    /// the record, the others get `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the token is missing, expired or already taken.
    async fn delete_refresh_token(&self, token_hash: &str) -> StoreResult<RefreshToken>;

    /// Removes expired refresh tokens.
    ///
    /// # Returns
    ///
    /// The number of tokens removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn purge_expired_refresh_tokens(&self) -> StoreResult<u64>;
}
