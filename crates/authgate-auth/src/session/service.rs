//! Session orchestration.
//!
//! Sequences the login callback (state check, code exchange, identity
//! lookup, user provisioning, token issuance), refresh token rotation and
//! revocation, and the admin-gated role and permission mutations.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::middleware::require_role;
use crate::oauth::{BrokerError, ExternalIdentity, LoginAttempts, LoginPhase, OAuthBroker};
use crate::storage::{CredentialStore, StoreError};
use crate::token::{TokenClaims, TokenIssuer};
use crate::types::{RefreshToken, User};

/// Full name given to users whose provider reports none.
const DEFAULT_FULL_NAME: &str = "OAuth User";

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`SessionService`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Role granted to newly provisioned users.
    pub default_role: String,

    /// Role required for admin operations.
    pub admin_role: String,

    /// Lifetime of each refresh token, counted from its own issuance.
    pub refresh_token_lifetime: Duration,

    /// How long a login attempt waits for its callback.
    pub state_lifetime: Duration,

    /// Cap on logins waiting for their callback.
    pub max_pending_logins: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for SessionConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            default_role: config.login.default_role.clone(),
            admin_role: config.login.admin_role.clone(),
            refresh_token_lifetime: config.tokens.refresh_token_lifetime,
            state_lifetime: config.login.state_lifetime,
            max_pending_logins: config.login.max_pending_logins,
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Query parameters of the provider callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    /// Optional; must match the provider the state was issued for.
    #[serde(default)]
    pub provider: Option<String>,
}

/// Result of starting a login.
#[derive(Debug, Clone)]
pub struct LoginStart {
    pub authorization_url: Url,
    pub state: String,
}

/// An access token and the refresh token that replaces it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,

    /// Access token expiry, unix seconds.
    pub expires_at: i64,

    pub refresh_token: String,
}

/// Response of a completed login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,

    pub user: User,
}

/// Counts of records removed by [`SessionService::sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub refresh_tokens: u64,
    pub login_attempts: usize,
}

// =============================================================================
// Session Service
// =============================================================================

/// Coordinates the broker, issuer and credential store.
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    broker: Arc<OAuthBroker>,
    attempts: LoginAttempts,
    config: SessionConfig,
}

impl SessionService {
    /// Creates a new session service.
    ///
    /// # Arguments
    /// * `store` - Credential store shared with the rest of the process
    /// * `issuer` - Access token issuer
    /// * `broker` - OAuth broker with the registered providers
    /// * `config` - Roles and lifetimes
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
        broker: Arc<OAuthBroker>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            issuer,
            broker,
            attempts: LoginAttempts::new(config.state_lifetime)
                .with_max_pending(config.max_pending_logins),
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    #[must_use]
    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    #[must_use]
    pub fn broker(&self) -> &Arc<OAuthBroker> {
        &self.broker
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of logins waiting for their callback.
    #[must_use]
    pub fn pending_logins(&self) -> usize {
        self.attempts.len()
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// Starts a login with `provider`.
    ///
    /// # Errors
    /// Returns `BadRequest` for an unknown provider.
    pub fn start_login(&self, provider: &str) -> Result<LoginStart, AuthError> {
        let state = OAuthBroker::generate_state();
        let authorization_url = self
            .broker
            .authorization_url(provider, &state)
            .map_err(|e| federation_error(provider, e))?;

        self.attempts.bind(state.clone(), provider);

        tracing::info!(provider = %provider, phase = %LoginPhase::Started, "Login started");

        Ok(LoginStart {
            authorization_url,
            state,
        })
    }

    /// Completes a login from the provider callback.
    ///
    /// # Errors
    /// - `BadRequest` for a missing code or an unknown, expired, replayed or
    ///   mismatched state
    /// - `ExchangeFailed` if the provider rejects the code or is unreachable
    /// - `Storage` / `Internal` for store or signing failures
    pub async fn complete_login(&self, params: CallbackParams) -> Result<LoginResponse, AuthError> {
        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::bad_request("missing authorization code"))?;

        let attempt = params
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| self.attempts.consume(s))
            .ok_or_else(|| AuthError::bad_request("invalid or expired state"))?;

        if params
            .provider
            .as_deref()
            .is_some_and(|p| p != attempt.provider)
        {
            return Err(AuthError::bad_request("invalid or expired state"));
        }

        let provider = attempt.provider.as_str();
        tracing::info!(provider = %provider, phase = %LoginPhase::CallbackReceived, "Login callback received");

        let result = self.finish_login(provider, code).await;
        if let Err(e) = &result {
            tracing::warn!(provider = %provider, phase = %LoginPhase::Failed, error = %e, "Login failed");
        }
        result
    }

    async fn finish_login(&self, provider: &str, code: &str) -> Result<LoginResponse, AuthError> {
        let provider_token = self
            .broker
            .exchange_code(provider, code)
            .await
            .map_err(|e| federation_error(provider, e))?;
        tracing::debug!(provider = %provider, phase = %LoginPhase::Exchanged, "Authorization code exchanged");

        let identity = self
            .broker
            .fetch_identity(provider, &provider_token)
            .await
            .map_err(|e| federation_error(provider, e))?;
        tracing::debug!(provider = %provider, phase = %LoginPhase::Identified, "External identity resolved");

        let user = self.find_or_provision(&identity).await?;
        let tokens = self.issue_pair(&user).await?;

        tracing::info!(
            provider = %provider,
            phase = %LoginPhase::Issued,
            user_id = %user.id,
            "Login completed"
        );

        Ok(LoginResponse { tokens, user })
    }

    async fn find_or_provision(&self, identity: &ExternalIdentity) -> Result<User, AuthError> {
        match self
            .store
            .get_user_by_provider(&identity.provider, &identity.subject)
            .await
        {
            Ok(user) => return Ok(user),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(storage_error(e)),
        }

        let user = User::new(
            identity.email.clone().unwrap_or_default(),
            identity
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
        )
        .with_provider(identity.provider.clone(), identity.subject.clone())
        .with_role(self.config.default_role.clone());

        match self.store.create_user(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider = %identity.provider, "Provisioned new user");
                Ok(user)
            }
            // Lost a concurrent first login for the same identity
            Err(StoreError::Duplicate { .. }) => self
                .store
                .get_user_by_provider(&identity.provider, &identity.subject)
                .await
                .map_err(storage_error),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access = self
            .issuer
            .issue(user)
            .map_err(|e| AuthError::internal(format!("failed to sign access token: {e}")))?;

        let (refresh_token, record) =
            RefreshToken::issue(user.id.clone(), self.config.refresh_token_lifetime);
        self.store
            .save_refresh_token(record)
            .await
            .map_err(storage_error)?;

        Ok(TokenPair {
            access_token: access.token,
            expires_at: access.expires_at.unix_timestamp(),
            refresh_token,
        })
    }

    // -------------------------------------------------------------------------
    // Refresh tokens
    // -------------------------------------------------------------------------

    /// Rotates a refresh token: the presented token is consumed and a new
    /// pair is issued from the user's current roles and permissions.
    ///
    /// # Errors
    /// Returns `Unauthenticated` if the token is unknown, expired, already
    /// used, or its user no longer exists.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::unauthenticated("empty refresh token"));
        }

        let hash = RefreshToken::hash_token(refresh_token);

        // Compare-and-delete: only one concurrent caller gets the record
        let record = self
            .store
            .delete_refresh_token(&hash)
            .await
            .map_err(|e| credential_error(e, "refresh token invalid, expired or already used"))?;

        let user = self
            .store
            .get_user_by_id(&record.user_id)
            .await
            .map_err(|e| credential_error(e, "refresh token owner no longer exists"))?;

        let tokens = self.issue_pair(&user).await?;

        tracing::info!(user_id = %user.id, "Refresh token rotated");

        Ok(tokens)
    }

    /// Revokes a refresh token. Unknown or expired tokens succeed too.
    ///
    /// # Errors
    /// Returns `Storage` if the backend fails.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let hash = RefreshToken::hash_token(refresh_token);

        match self.store.delete_refresh_token(&hash).await {
            Ok(record) => {
                tracing::info!(user_id = %record.user_id, "Refresh token revoked");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(storage_error(e)),
        }
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Grants `role` to `user_id`. Idempotent.
    ///
    /// # Errors
    /// - `Forbidden` unless `actor` holds the admin role
    /// - `BadRequest` for an empty user ID or role
    /// - `Internal` if the store fails, including an unknown user
    pub async fn assign_role(
        &self,
        actor: &TokenClaims,
        user_id: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        self.check_admin_request(actor, user_id)?;
        require_non_empty(role, "role")?;

        self.store
            .assign_role(user_id, role)
            .await
            .map_err(admin_store_error)?;

        tracing::info!(actor = %actor.sub, target = %user_id, role = %role, "Role assigned");
        Ok(())
    }

    /// Removes `role` from `user_id`. Removing an absent role succeeds.
    ///
    /// # Errors
    /// Same as [`Self::assign_role`].
    pub async fn remove_role(
        &self,
        actor: &TokenClaims,
        user_id: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        self.check_admin_request(actor, user_id)?;
        require_non_empty(role, "role")?;

        self.store
            .remove_role(user_id, role)
            .await
            .map_err(admin_store_error)?;

        tracing::info!(actor = %actor.sub, target = %user_id, role = %role, "Role removed");
        Ok(())
    }

    /// Replaces the permission set of `user_id`.
    ///
    /// # Errors
    /// Same as [`Self::assign_role`]; `BadRequest` if any permission is empty.
    pub async fn set_permissions(
        &self,
        actor: &TokenClaims,
        user_id: &str,
        permissions: &[String],
    ) -> Result<(), AuthError> {
        self.check_admin_request(actor, user_id)?;
        if permissions.iter().any(|p| p.trim().is_empty()) {
            return Err(AuthError::bad_request("permissions must not be empty"));
        }

        self.store
            .set_permissions(user_id, permissions)
            .await
            .map_err(admin_store_error)?;

        tracing::info!(
            actor = %actor.sub,
            target = %user_id,
            count = permissions.len(),
            "Permissions replaced"
        );
        Ok(())
    }

    fn check_admin_request(&self, actor: &TokenClaims, user_id: &str) -> Result<(), AuthError> {
        require_role(actor, &self.config.admin_role)?;
        require_non_empty(user_id, "userId")
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Purges expired refresh tokens and login attempts.
    ///
    /// # Errors
    /// Returns `Storage` if the backend fails.
    pub async fn sweep(&self) -> Result<SweepReport, AuthError> {
        let refresh_tokens = self
            .store
            .purge_expired_refresh_tokens()
            .await
            .map_err(storage_error)?;
        let login_attempts = self.attempts.purge_expired();

        if refresh_tokens > 0 || login_attempts > 0 {
            tracing::debug!(refresh_tokens, login_attempts, "Purged expired records");
        }

        Ok(SweepReport {
            refresh_tokens,
            login_attempts,
        })
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

fn require_non_empty(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::bad_request(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

fn federation_error(provider: &str, error: BrokerError) -> AuthError {
    if error.is_unknown_provider() {
        AuthError::bad_request(format!("unknown provider '{provider}'"))
    } else {
        AuthError::exchange_failed(provider, error.to_string())
    }
}

fn storage_error(error: StoreError) -> AuthError {
    AuthError::storage(error.to_string())
}

/// `NotFound` means the presented credential is no good.
fn credential_error(error: StoreError, message: &str) -> AuthError {
    if error.is_not_found() {
        AuthError::unauthenticated(message)
    } else {
        storage_error(error)
    }
}

fn admin_store_error(error: StoreError) -> AuthError {
    AuthError::internal(error.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::OffsetDateTime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::oauth::ProviderConfig;
    use crate::storage::InMemoryCredentialStore;
    use crate::token::{SigningAlgorithm, SigningKeyPair};

    struct Harness {
        service: Arc<SessionService>,
        store: Arc<InMemoryCredentialStore>,
        server: MockServer,
    }

    async fn harness() -> Harness {
        let server = MockServer::start().await;

        let provider = ProviderConfig::google("client-1", "secret-1")
            .with_token_endpoint(format!("{}/token", server.uri()))
            .with_userinfo_endpoint(format!("{}/userinfo", server.uri()));
        let broker = OAuthBroker::new(
            Url::parse("http://localhost:8081/oauth/callback").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_provider(provider);

        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let issuer = TokenIssuer::new(
            key_pair,
            "auth.example",
            "main-service",
            Duration::from_secs(3600),
        );

        let store = Arc::new(InMemoryCredentialStore::new());
        let service = SessionService::new(
            store.clone(),
            Arc::new(issuer),
            Arc::new(broker),
            SessionConfig::default(),
        );

        Harness {
            service: Arc::new(service),
            store,
            server,
        }
    }

    async fn mount_google(server: &MockServer, subject: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access-token",
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": subject,
                "email": "sam@example.com",
                "name": "Sam"
            })))
            .mount(server)
            .await;
    }

    async fn login(service: &SessionService) -> LoginResponse {
        let start = service.start_login("google").unwrap();
        service
            .complete_login(CallbackParams {
                code: Some("auth-code".to_string()),
                state: Some(start.state),
                provider: None,
            })
            .await
            .unwrap()
    }

    fn admin_claims(service: &SessionService) -> TokenClaims {
        let admin = User::new("root@example.com", "Root").with_role("Admin");
        let token = service.issuer().issue(&admin).unwrap().token;
        service.issuer().verify(&token).unwrap()
    }

    #[tokio::test]
    async fn test_start_login() {
        let h = harness().await;

        let start = h.service.start_login("google").unwrap();
        assert!(
            start
                .authorization_url
                .as_str()
                .contains(&format!("state={}", start.state))
        );
        assert_eq!(h.service.pending_logins(), 1);

        let err = h.service.start_login("myspace").unwrap_err();
        assert!(matches!(err, AuthError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_pending_logins_are_capped() {
        let h = harness().await;
        mount_google(&h.server, "sub-cap").await;
        let service = SessionService::new(
            h.store.clone(),
            Arc::clone(h.service.issuer()),
            Arc::clone(h.service.broker()),
            SessionConfig {
                max_pending_logins: 2,
                ..SessionConfig::default()
            },
        );

        for _ in 0..50 {
            service.start_login("google").unwrap();
        }
        assert_eq!(service.pending_logins(), 2);

        // Eviction happens before the new attempt is bound
        login(&service).await;
        assert_eq!(service.pending_logins(), 1);
    }

    #[tokio::test]
    async fn test_first_login_provisions_student() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;

        let response = login(&h.service).await;
        assert_eq!(response.user.roles, vec!["Student"]);
        assert_eq!(response.user.provider.as_deref(), Some("google"));
        assert_eq!(response.user.provider_id.as_deref(), Some("sub123"));
        assert_eq!(response.user.full_name, "Sam");

        let claims = h.service.issuer().verify(&response.tokens.access_token).unwrap();
        assert_eq!(claims.sub, response.user.id);
        assert_eq!(claims.roles, vec!["Student"]);
        assert_eq!(h.store.refresh_token_count(), 1);

        // Second login links to the same user
        let again = login(&h.service).await;
        assert_eq!(again.user.id, response.user.id);
        assert_eq!(h.store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_callback_rejects_bad_state() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;

        let missing_code = h
            .service
            .complete_login(CallbackParams {
                code: None,
                state: Some("whatever".to_string()),
                provider: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(missing_code, AuthError::BadRequest { .. }));

        let unknown = h
            .service
            .complete_login(CallbackParams {
                code: Some("auth-code".to_string()),
                state: Some("never-issued".to_string()),
                provider: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::BadRequest { .. }));

        let start = h.service.start_login("google").unwrap();
        let params = CallbackParams {
            code: Some("auth-code".to_string()),
            state: Some(start.state),
            provider: None,
        };
        assert!(h.service.complete_login(params.clone()).await.is_ok());

        let replayed = h.service.complete_login(params).await.unwrap_err();
        assert!(matches!(replayed, AuthError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_callback_rejects_provider_mismatch() {
        let h = harness().await;

        let start = h.service.start_login("google").unwrap();
        let err = h
            .service
            .complete_login(CallbackParams {
                code: Some("auth-code".to_string()),
                state: Some(start.state),
                provider: Some("github".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_provider_error_is_exchange_failure() {
        let h = harness().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Code expired"
            })))
            .mount(&h.server)
            .await;

        let start = h.service.start_login("google").unwrap();
        let err = h
            .service
            .complete_login(CallbackParams {
                code: Some("stale-code".to_string()),
                state: Some(start.state),
                provider: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::ExchangeFailed { .. }));
        assert_eq!(h.store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;
        let response = login(&h.service).await;

        let rotated = h
            .service
            .refresh(&response.tokens.refresh_token)
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, response.tokens.refresh_token);
        assert_eq!(h.store.refresh_token_count(), 1);

        let err = h
            .service
            .refresh(&response.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_single_use() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;
        let response = login(&h.service).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = Arc::clone(&h.service);
            let token = response.tokens.refresh_token.clone();
            handles.push(tokio::spawn(async move { service.refresh(&token).await }));
        }

        let mut successes = Vec::new();
        let mut failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(pair) => successes.push(pair),
                Err(AuthError::Unauthenticated { .. }) => failures += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(successes.len(), 1);
        assert_eq!(failures, 1);

        // The replacement works exactly once more
        let next = &successes[0].refresh_token;
        assert!(h.service.refresh(next).await.is_ok());
        assert!(h.service.refresh(next).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token() {
        let h = harness().await;
        let user = h
            .store
            .create_user(User::new("e@example.com", "E").with_role("Student"))
            .await
            .unwrap();

        let now = OffsetDateTime::now_utc();
        h.store
            .save_refresh_token(RefreshToken {
                token_hash: RefreshToken::hash_token("stale-refresh-token"),
                user_id: user.id,
                created_at: now - time::Duration::days(31),
                expires_at: now - time::Duration::seconds(1),
            })
            .await
            .unwrap();

        let err = h.service.refresh("stale-refresh-token").await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated { .. }));
        assert_eq!(h.store.refresh_token_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let h = harness().await;
        let (plaintext, record) = RefreshToken::issue("ghost", Duration::from_secs(60));
        h.store.save_refresh_token(record).await.unwrap();

        let err = h.service.refresh(&plaintext).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;
        let response = login(&h.service).await;

        h.service.revoke(&response.tokens.refresh_token).await.unwrap();
        h.service.revoke(&response.tokens.refresh_token).await.unwrap();
        h.service.revoke("never-issued").await.unwrap();

        assert_eq!(h.store.refresh_token_count(), 0);
        assert!(h.service.refresh(&response.tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_assign_role_requires_admin() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;
        let response = login(&h.service).await;

        let student = h.service.issuer().verify(&response.tokens.access_token).unwrap();
        let err = h
            .service
            .assign_role(&student, &response.user.id, "Admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));

        let stored = h.store.get_user_by_id(&response.user.id).await.unwrap();
        assert_eq!(stored.roles, vec!["Student"]);
    }

    #[tokio::test]
    async fn test_admin_validation() {
        let h = harness().await;
        let admin = admin_claims(&h.service);

        let err = h.service.assign_role(&admin, "", "Admin").await.unwrap_err();
        assert!(matches!(err, AuthError::BadRequest { .. }));

        let err = h.service.assign_role(&admin, "someone", " ").await.unwrap_err();
        assert!(matches!(err, AuthError::BadRequest { .. }));

        let err = h
            .service
            .set_permissions(&admin, "someone", &["".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadRequest { .. }));

        let err = h.service.assign_role(&admin, "nobody", "Admin").await.unwrap_err();
        assert!(matches!(err, AuthError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_role_change_visible_after_refresh() {
        let h = harness().await;
        mount_google(&h.server, "sub123").await;
        let response = login(&h.service).await;
        let admin = admin_claims(&h.service);

        h.service
            .assign_role(&admin, &response.user.id, "Instructor")
            .await
            .unwrap();
        h.service
            .assign_role(&admin, &response.user.id, "Instructor")
            .await
            .unwrap();
        h.service
            .set_permissions(&admin, &response.user.id, &["grades:write".to_string()])
            .await
            .unwrap();

        let old = h.service.issuer().verify(&response.tokens.access_token).unwrap();
        assert_eq!(old.roles, vec!["Student"]);
        assert!(old.permissions.is_empty());

        let rotated = h
            .service
            .refresh(&response.tokens.refresh_token)
            .await
            .unwrap();
        let new = h.service.issuer().verify(&rotated.access_token).unwrap();
        assert_eq!(new.roles, vec!["Student", "Instructor"]);
        assert_eq!(new.permissions, vec!["grades:write"]);

        h.service
            .remove_role(&admin, &response.user.id, "Instructor")
            .await
            .unwrap();
        let stored = h.store.get_user_by_id(&response.user.id).await.unwrap();
        assert_eq!(stored.roles, vec!["Student"]);
    }

    #[tokio::test]
    async fn test_sweep() {
        let h = harness().await;
        let now = OffsetDateTime::now_utc();
        h.store
            .save_refresh_token(RefreshToken {
                token_hash: RefreshToken::hash_token("old"),
                user_id: "u".to_string(),
                created_at: now - time::Duration::days(31),
                expires_at: now - time::Duration::days(1),
            })
            .await
            .unwrap();

        let report = h.service.sweep().await.unwrap();
        assert_eq!(report.refresh_tokens, 1);
        assert_eq!(report.login_attempts, 0);
        assert_eq!(h.store.refresh_token_count(), 0);
    }

    #[test]
    fn test_login_response_shape() {
        let response = LoginResponse {
            tokens: TokenPair {
                access_token: "a".to_string(),
                expires_at: 1_700_000_000,
                refresh_token: "r".to_string(),
            },
            user: User::new("x@example.com", "X"),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["access_token"], "a");
        assert_eq!(value["expires_at"], 1_700_000_000);
        assert_eq!(value["refresh_token"], "r");
        assert_eq!(value["user"]["fullName"], "X");
    }
}
