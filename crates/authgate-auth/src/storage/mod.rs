//! Credential storage.
//!
//! - [`CredentialStore`] - the storage contract
//! - [`InMemoryCredentialStore`] - volatile implementation backed by
//!   concurrent maps

pub mod credential;
pub mod memory;

pub use credential::{CredentialStore, StoreError, StoreResult};
pub use memory::InMemoryCredentialStore;
