//! User identity record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A user known to the service.
///
/// Users are provisioned on first login through an external provider.
/// A `(provider, provider_id)` pair identifies at most one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique ID (UUID v4).
    pub id: String,

    pub email: String,

    /// Display name.
    pub full_name: String,

    /// Linked provider name (e.g. `google`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Subject ID assigned by the linked provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Role names, ordered, without duplicates.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Permission strings, ordered, without duplicates.
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Creates a user with a fresh ID and no roles or permissions.
    #[must_use]
    pub fn new(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            full_name: full_name.into(),
            provider: None,
            provider_id: None,
            roles: Vec::new(),
            permissions: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Links the user to an external provider identity.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>, subject: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.provider_id = Some(subject.into());
        self
    }

    /// Adds a role (no-op when already present).
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.add_role(role);
        self
    }

    /// Returns the `(provider, subject)` pair if the user is linked.
    #[must_use]
    pub fn provider_identity(&self) -> Option<(&str, &str)> {
        match (&self.provider, &self.provider_id) {
            (Some(p), Some(s)) => Some((p.as_str(), s.as_str())),
            _ => None,
        }
    }

    /// Returns `true` if the user holds `role` (exact match).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Appends a role. Returns `false` if it was already present.
    pub fn add_role(&mut self, role: impl Into<String>) -> bool {
        let role = role.into();
        if self.has_role(&role) {
            return false;
        }
        self.roles.push(role);
        true
    }

    /// Removes a role. Returns `false` if it was not present.
    pub fn remove_role(&mut self, role: &str) -> bool {
        let before = self.roles.len();
        self.roles.retain(|r| r != role);
        self.roles.len() != before
    }

    /// Replaces the permission set, keeping first-seen order.
    pub fn set_permissions<I, S>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for permission in permissions {
            let permission = permission.into();
            if !deduped.contains(&permission) {
                deduped.push(permission);
            }
        }
        self.permissions = deduped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_role_is_idempotent() {
        let mut user = User::new("a@example.com", "A");
        assert!(user.add_role("Student"));
        assert!(!user.add_role("Student"));
        assert_eq!(user.roles, vec!["Student"]);
    }

    #[test]
    fn test_role_match_is_case_sensitive() {
        let user = User::new("a@example.com", "A").with_role("Admin");
        assert!(user.has_role("Admin"));
        assert!(!user.has_role("admin"));
    }

    #[test]
    fn test_remove_role() {
        let mut user = User::new("a@example.com", "A")
            .with_role("Student")
            .with_role("Admin");
        assert!(user.remove_role("Student"));
        assert!(!user.remove_role("Student"));
        assert_eq!(user.roles, vec!["Admin"]);
    }

    #[test]
    fn test_set_permissions_dedupes() {
        let mut user = User::new("a@example.com", "A");
        user.set_permissions(["read", "write", "read"]);
        assert_eq!(user.permissions, vec!["read", "write"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let user = User::new("a@example.com", "Ann").with_provider("google", "sub123");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["fullName"], "Ann");
        assert_eq!(json["providerId"], "sub123");
        assert!(json["createdAt"].is_string());
        assert_eq!(user.provider_identity(), Some(("google", "sub123")));
    }
}
