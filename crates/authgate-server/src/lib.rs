//! # authgate-server
//!
//! HTTP server for the authgate identity and token service: configuration
//! loading, tracing setup, application wiring and the listener.

pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{AppState, AuthgateServer, StartupError, build_app, build_broker, load_signing_key};
