//! In-memory credential store.
//!
//! Volatile: everything is lost when the process exits. Backed by sharded
//! concurrent maps, so operations on different keys do not contend.
//!
//! Lock order when two maps are held at once: `provider_index`, then `users`.
//! Expired refresh tokens stay in the map until
//! [`CredentialStore::purge_expired_refresh_tokens`] runs.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use super::credential::{CredentialStore, StoreError, StoreResult};
use crate::types::{RefreshToken, User};

/// In-memory [`CredentialStore`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, User>,
    /// `(provider, subject)` to user ID.
    provider_index: DashMap<(String, String), String>,
    /// Token hash to record.
    refresh_tokens: DashMap<String, RefreshToken>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh token records held, expired ones included.
    #[must_use]
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn insert_user(&self, user: User) -> StoreResult<User> {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::duplicate("user", user.id)),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    fn with_user_mut<F>(&self, user_id: &str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        f(&mut user);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let Some((provider, subject)) = user.provider_identity() else {
            return self.insert_user(user);
        };

        let key = (provider.to_string(), subject.to_string());
        match self.provider_index.entry(key) {
            Entry::Occupied(occupied) => {
                let (provider, subject) = occupied.key();
                Err(StoreError::duplicate(
                    "provider identity",
                    format!("{provider}:{subject}"),
                ))
            }
            Entry::Vacant(slot) => {
                let user_id = user.id.clone();
                let user = self.insert_user(user)?;
                slot.insert(user_id);
                Ok(user)
            }
        }
    }

    async fn get_user_by_id(&self, user_id: &str) -> StoreResult<User> {
        self.users
            .get(user_id)
            .map(|u| u.clone())
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }

    async fn get_user_by_provider(&self, provider: &str, subject: &str) -> StoreResult<User> {
        let user_id = self
            .provider_index
            .get(&(provider.to_string(), subject.to_string()))
            .map(|id| id.clone())
            .ok_or_else(|| StoreError::not_found("provider identity", format!("{provider}:{subject}")))?;

        self.get_user_by_id(&user_id).await
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.with_user_mut(&user.id, |stored| {
            stored.email = user.email.clone();
            stored.full_name = user.full_name.clone();
            stored.roles.clear();
            for role in &user.roles {
                stored.add_role(role.clone());
            }
            stored.set_permissions(user.permissions.iter().cloned());
        })
    }

    async fn assign_role(&self, user_id: &str, role: &str) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.add_role(role);
        })
    }

    async fn remove_role(&self, user_id: &str, role: &str) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.remove_role(role);
        })
    }

    async fn set_permissions(&self, user_id: &str, permissions: &[String]) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.set_permissions(permissions.iter().cloned());
        })
    }

    async fn save_refresh_token(&self, token: RefreshToken) -> StoreResult<()> {
        match self.refresh_tokens.entry(token.token_hash.clone()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired() {
                    return Err(StoreError::duplicate("refresh token", token.token_hash));
                }
                occupied.insert(token);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(token);
                Ok(())
            }
        }
    }

    async fn get_refresh_token(&self, token_hash: &str) -> StoreResult<RefreshToken> {
        self.refresh_tokens
            .get(token_hash)
            .filter(|t| !t.is_expired())
            .map(|t| t.clone())
            .ok_or_else(|| StoreError::not_found("refresh token", token_hash))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> StoreResult<RefreshToken> {
        self.refresh_tokens
            .remove_if(token_hash, |_, t| !t.is_expired())
            .map(|(_, token)| token)
            .ok_or_else(|| StoreError::not_found("refresh token", token_hash))
    }

    async fn purge_expired_refresh_tokens(&self) -> StoreResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0u64;
        self.refresh_tokens.retain(|_, t| {
            let keep = !t.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}
