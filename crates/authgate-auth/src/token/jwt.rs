//! Signing keys, JWT errors and JWKS types.
//!
//! ## Supported Algorithms
//!
//! - **RS256**: RSA with SHA-256 (default)
//! - **RS384**: RSA with SHA-384
//! - **ES384**: ECDSA with P-384 curve
//!
//! Verification accepts only the algorithms of the key's family, so `none`,
//! HMAC substitution and cross-family tokens never validate.
//!
//! ## Example
//!
//! ```ignore
//! use authgate_auth::token::jwt::{SigningKeyPair, SigningAlgorithm};
//!
//! let key_pair = SigningKeyPair::from_pem_files(
//!     SigningAlgorithm::RS256,
//!     "./keys/private.key.pem",
//!     "./keys/public.key.pem",
//! )?;
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::{PublicKey as EcPublicKey, SecretKey as EcSecretKey};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token is malformed or uses an unacceptable algorithm.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Issuer, audience or a required claim did not check out.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if the token itself was rejected (expired, bad signature,
    /// malformed, wrong claims).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::InvalidSignature
                | Self::InvalidClaims { .. }
                | Self::DecodingError { .. }
        )
    }

    /// Returns `true` if the signing key is at fault.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::EncodingError { .. } | Self::KeyGenerationError { .. } | Self::InvalidKey { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for JWT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA with P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Algorithms accepted on verification for this key family.
    #[must_use]
    pub fn family_algorithms(self) -> Vec<Algorithm> {
        if self.is_rsa() {
            vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512]
        } else {
            vec![Algorithm::ES384]
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "ES384" => Ok(Self::ES384),
            other => Err(JwtError::invalid_key(format!(
                "Unsupported signing algorithm: {other}"
            ))),
        }
    }
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "EC").
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    // RSA-specific fields
    /// RSA modulus (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // EC-specific fields
    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// The process-wide signing key pair.
///
/// Built once at startup and handed to the token issuer. Immutable after
/// construction.
pub struct SigningKeyPair {
    /// Key ID.
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_data: PublicKeyData,

    /// When the key pair was loaded or generated.
    pub created_at: OffsetDateTime,
}

/// Public key components for JWKS export.
enum PublicKeyData {
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Ec { x: Vec<u8>, y: Vec<u8> },
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generates a new RSA 2048 key pair.
    ///
    /// # Errors
    /// Returns an error if key generation fails or algorithm is not RSA-based.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        if !algorithm.is_rsa() {
            return Err(JwtError::invalid_key(format!(
                "Algorithm {} is not RSA-based",
                algorithm
            )));
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_rsa_key(algorithm, &private_key)
    }

    /// Generates a new EC key pair using P-384 curve.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_ec() -> Result<Self, JwtError> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        Self::from_ec_key(&secret_key)
    }

    /// Reads and loads a key pair from PEM files.
    ///
    /// # Errors
    /// Returns `InvalidKey` if either file cannot be read or
    /// [`SigningKeyPair::from_pem`] rejects the contents.
    pub fn from_pem_files(
        algorithm: SigningAlgorithm,
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, JwtError> {
        let private_key_path = private_key_path.as_ref();
        let public_key_path = public_key_path.as_ref();

        let private_pem = std::fs::read_to_string(private_key_path).map_err(|e| {
            JwtError::invalid_key(format!(
                "cannot read private key {}: {e}",
                private_key_path.display()
            ))
        })?;
        let public_pem = std::fs::read_to_string(public_key_path).map_err(|e| {
            JwtError::invalid_key(format!(
                "cannot read public key {}: {e}",
                public_key_path.display()
            ))
        })?;

        Self::from_pem(algorithm, &private_pem, &public_pem)
    }

    /// Loads a key pair from PEM strings.
    ///
    /// RSA private keys may be PKCS#8 or PKCS#1, EC private keys PKCS#8 or
    /// SEC1. Public keys are SPKI (or PKCS#1 for RSA). The public key must
    /// belong to the private key.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the PEM data is invalid or the halves do not
    /// match.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        if algorithm.is_rsa() {
            let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
                .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_pem))
                .map_err(|e| JwtError::invalid_key(format!("private key: {e}")))?;
            let public_key = RsaPublicKey::from_public_key_pem(public_pem)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(public_pem))
                .map_err(|e| JwtError::invalid_key(format!("public key: {e}")))?;

            if private_key.to_public_key() != public_key {
                return Err(JwtError::invalid_key(
                    "public key does not match private key",
                ));
            }

            Self::from_rsa_key(algorithm, &private_key)
        } else {
            let secret_key = EcSecretKey::from_pkcs8_pem(private_pem)
                .or_else(|_| EcSecretKey::from_sec1_pem(private_pem))
                .map_err(|e| JwtError::invalid_key(format!("private key: {e}")))?;
            let public_key = EcPublicKey::from_public_key_pem(public_pem)
                .map_err(|e| JwtError::invalid_key(format!("public key: {e}")))?;

            if secret_key.public_key() != public_key {
                return Err(JwtError::invalid_key(
                    "public key does not match private key",
                ));
            }

            Self::from_ec_key(&secret_key)
        }
    }

    /// Replaces the derived key ID.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    fn from_rsa_key(
        algorithm: SigningAlgorithm,
        private_key: &RsaPrivateKey,
    ) -> Result<Self, JwtError> {
        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key =
            DecodingKey::from_rsa_components(&URL_SAFE_NO_PAD.encode(&n), &URL_SAFE_NO_PAD.encode(&e))
                .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_der = public_key
            .to_public_key_der()
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            kid: derive_kid(public_der.as_bytes()),
            algorithm,
            encoding_key,
            decoding_key,
            public_key_data: PublicKeyData::Rsa { n, e },
            created_at: OffsetDateTime::now_utc(),
        })
    }

    fn from_ec_key(secret_key: &EcSecretKey) -> Result<Self, JwtError> {
        let public_key = secret_key.public_key();

        let point = public_key.to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| JwtError::invalid_key("Missing x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| JwtError::invalid_key("Missing y coordinate"))?;

        // jsonwebtoken only takes PKCS#8 for EC signing keys
        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let x_b64 = URL_SAFE_NO_PAD.encode(&x[..]);
        let y_b64 = URL_SAFE_NO_PAD.encode(&y[..]);
        let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        let public_der = public_key
            .to_public_key_der()
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        Ok(Self {
            kid: derive_kid(public_der.as_bytes()),
            algorithm: SigningAlgorithm::ES384,
            encoding_key,
            decoding_key,
            public_key_data: PublicKeyData::Ec {
                x: x.to_vec(),
                y: y.to_vec(),
            },
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        match &self.public_key_data {
            PublicKeyData::Rsa { n, e } => Jwk {
                kty: "RSA".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: Some(URL_SAFE_NO_PAD.encode(n)),
                e: Some(URL_SAFE_NO_PAD.encode(e)),
                crv: None,
                x: None,
                y: None,
            },
            PublicKeyData::Ec { x, y } => Jwk {
                kty: "EC".to_string(),
                kid: self.kid.clone(),
                use_: "sig".to_string(),
                alg: self.algorithm.as_str().to_string(),
                n: None,
                e: None,
                crv: Some("P-384".to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(x)),
                y: Some(URL_SAFE_NO_PAD.encode(y)),
            },
        }
    }
}

/// Key ID stable across restarts: first 16 bytes of SHA-256 over the SPKI DER.
fn derive_kid(public_der: &[u8]) -> String {
    let digest = Sha256::digest(public_der);
    URL_SAFE_NO_PAD.encode(&digest[..16])
}

// ============================================================================
// Tests
// ============================================================================
