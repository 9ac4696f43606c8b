use std::{net::SocketAddr, sync::Arc, time::Duration};

use authgate_auth::config::{AuthConfig, ConfigError, ProviderCredentials};
use authgate_auth::http::{SessionState, routes};
use authgate_auth::oauth::{BrokerError, OAuthBroker, ProviderConfig};
use authgate_auth::session::{SessionConfig, SessionService};
use authgate_auth::storage::{CredentialStore, InMemoryCredentialStore};
use authgate_auth::token::{JwtError, SigningKeyPair, TokenIssuer};
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;

/// Failures that stop the process before the listener binds.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load signing key: {0}")]
    SigningKey(#[from] JwtError),

    #[error("failed to build OAuth broker: {0}")]
    Broker(#[from] BrokerError),

    #[error("invalid callback URL: {0}")]
    CallbackUrl(#[from] url::ParseError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<SessionService>,
    pub store: Arc<dyn CredentialStore>,
}

impl AppState {
    /// Wires the store, issuer and broker into a session service.
    pub fn new(cfg: AppConfig, key_pair: SigningKeyPair, broker: OAuthBroker) -> Self {
        let issuer = TokenIssuer::new(
            key_pair,
            cfg.auth.issuer.clone(),
            cfg.auth.audience.clone(),
            cfg.auth.tokens.access_token_lifetime,
        );
        let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
        let session = SessionService::new(
            Arc::clone(&store),
            Arc::new(issuer),
            Arc::new(broker),
            SessionConfig::from(&cfg.auth),
        );

        Self {
            config: Arc::new(cfg),
            session: Arc::new(session),
            store,
        }
    }

    /// Loads the signing key from disk and builds the broker from config.
    pub fn from_config(cfg: AppConfig) -> Result<Self, StartupError> {
        let key_pair = load_signing_key(&cfg.auth)?;
        let broker = build_broker(&cfg)?;
        Ok(Self::new(cfg, key_pair, broker))
    }
}

/// Loads and cross-checks the configured key pair.
pub fn load_signing_key(auth: &AuthConfig) -> Result<SigningKeyPair, StartupError> {
    let algorithm = auth.signing.signing_algorithm()?;
    let key_pair = SigningKeyPair::from_pem_files(
        algorithm,
        &auth.signing.private_key_path,
        &auth.signing.public_key_path,
    )?;

    let key_pair = match auth.signing.key_id {
        Some(ref kid) => key_pair.with_kid(kid.clone()),
        None => key_pair,
    };

    tracing::info!(
        alg = %key_pair.algorithm,
        kid = %key_pair.kid,
        "Signing key loaded"
    );
    Ok(key_pair)
}

/// Registers every configured provider.
pub fn build_broker(cfg: &AppConfig) -> Result<OAuthBroker, StartupError> {
    let providers = &cfg.auth.providers;
    let mut broker = OAuthBroker::new(cfg.callback_url()?, providers.request_timeout)?;

    if let Some(ref creds) = providers.google {
        broker.register(with_overrides(
            ProviderConfig::google(&creds.client_id, &creds.client_secret),
            creds,
        ));
    }
    if let Some(ref creds) = providers.github {
        broker.register(with_overrides(
            ProviderConfig::github(&creds.client_id, &creds.client_secret),
            creds,
        ));
    }

    if broker.provider_ids().is_empty() {
        tracing::warn!("No identity providers configured; every login will be rejected");
    } else {
        tracing::info!(providers = ?broker.provider_ids(), "Identity providers registered");
    }
    Ok(broker)
}

fn with_overrides(mut provider: ProviderConfig, creds: &ProviderCredentials) -> ProviderConfig {
    if let Some(ref url) = creds.authorization_url {
        provider = provider.with_authorization_endpoint(url.clone());
    }
    if let Some(ref url) = creds.token_url {
        provider = provider.with_token_endpoint(url.clone());
    }
    if let Some(ref url) = creds.userinfo_url {
        provider = provider.with_userinfo_endpoint(url.clone());
    }
    provider
}

pub fn build_app(state: &AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes().with_state(SessionState::new(Arc::clone(&state.session))))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Periodically purges expired refresh tokens and login attempts.
pub fn spawn_cleanup_task(session: Arc<SessionService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = session.sweep().await {
                tracing::warn!(error = %e, "Cleanup sweep failed");
            }
        }
    })
}

pub struct AuthgateServer {
    addr: SocketAddr,
    state: AppState,
    app: Router,
}

impl AuthgateServer {
    pub fn new(state: AppState) -> Self {
        Self {
            addr: state.config.addr(),
            app: build_app(&state),
            state,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let cleanup = spawn_cleanup_task(
            Arc::clone(&self.state.session),
            self.state.config.auth.cleanup_interval,
        );

        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        cleanup.abort();
        result?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
