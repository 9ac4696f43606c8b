//! Login, refresh and administration flows.

pub mod service;

pub use service::{
    CallbackParams, LoginResponse, LoginStart, SessionConfig, SessionService, SweepReport,
    TokenPair,
};
