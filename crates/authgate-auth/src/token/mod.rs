//! Signed access tokens.
//!
//! - [`jwt`] - signing keys, JWT errors, JWKS types
//! - [`issuer`] - issuance and verification

pub mod issuer;
pub mod jwt;

pub use issuer::{IssuedToken, TokenClaims, TokenIssuer};
pub use jwt::{Jwk, Jwks, JwtError, SigningAlgorithm, SigningKeyPair};
