//! Access token issuance and verification.
//!
//! The issuer owns the signing key pair and mints short-lived access tokens
//! carrying a snapshot of the user's roles and permissions. Verification
//! checks the signature, the algorithm family, issuer, audience and expiry
//! with zero leeway.

use std::time::Duration;

use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::jwt::{Jwks, JwtError, SigningAlgorithm, SigningKeyPair};
use crate::types::User;

/// Claims carried by an access token.
///
/// A point-in-time copy of the user's authorization state. Later role
/// changes do not affect tokens already issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user ID).
    pub sub: String,

    /// Audience.
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Unique token ID.
    pub jti: String,

    /// User ID, same value as `sub`.
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub permissions: Vec<String>,
}

impl TokenClaims {
    /// Returns `true` if the claims contain `role` (exact match).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Mints and verifies access tokens with a single key pair.
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Debug)]
pub struct TokenIssuer {
    key_pair: SigningKeyPair,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Creates a new issuer.
    ///
    /// # Arguments
    /// * `key_pair` - The key pair to sign and verify with
    /// * `issuer` - Value of the `iss` claim
    /// * `audience` - Value of the `aud` claim
    /// * `lifetime` - Access token lifetime
    #[must_use]
    pub fn new(
        key_pair: SigningKeyPair,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        Self {
            key_pair,
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime,
        }
    }

    /// Signs an access token for the user's current roles and permissions.
    ///
    /// # Errors
    /// Returns `EncodingError` if the private key is unusable or the
    /// lifetime pushes the expiry past the representable range.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, JwtError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = time::Duration::try_from(self.lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| JwtError::encoding_error("access token lifetime out of range"))?;

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            aud: vec![self.audience.clone()],
            exp: expires_at.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Signs arbitrary claims with the issuer's key.
    ///
    /// # Errors
    /// Returns `EncodingError` if signing fails.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        let mut header = Header::new(self.key_pair.algorithm.to_jwt_algorithm());
        header.kid = Some(self.key_pair.kid.clone());

        encode(&header, claims, self.key_pair.encoding_key())
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    /// Returns `Expired`, `InvalidSignature`, `InvalidClaims` or
    /// `DecodingError`. Callers must not distinguish these to clients.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.key_pair.algorithm.to_jwt_algorithm());
        validation.algorithms = self.key_pair.algorithm.family_algorithms();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let data = decode::<TokenClaims>(token, self.key_pair.decoding_key(), &validation)?;
        Ok(data.claims)
    }

    /// Returns the JWKS containing the public key.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.key_pair.to_jwk()],
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key_pair.algorithm
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_pair.kid
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use jsonwebtoken::{Algorithm, EncodingKey};

    use super::*;

    const ISSUER: &str = "auth.example";
    const AUDIENCE: &str = "main-service";

    fn rsa_issuer() -> TokenIssuer {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        TokenIssuer::new(key_pair, ISSUER, AUDIENCE, Duration::from_secs(3600))
    }

    fn student() -> User {
        let mut user = User::new("s@example.com", "Student One").with_role("Student");
        user.set_permissions(["courses:read"]);
        user
    }

    fn claims_for(user: &User, exp_offset: i64) -> TokenClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        TokenClaims {
            iss: ISSUER.to_string(),
            sub: user.id.clone(),
            aud: vec![AUDIENCE.to_string()],
            exp: now + exp_offset,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
        }
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let issuer = rsa_issuer();
        let user = student();

        let issued = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.roles, vec!["Student"]);
        assert_eq!(claims.permissions, vec!["courses:read"]);
        assert_eq!(claims.aud, vec![AUDIENCE]);
        assert_eq!(claims.exp, issued.expires_at.unix_timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_es384_round_trip() {
        let key_pair = SigningKeyPair::generate_ec().unwrap();
        let issuer = TokenIssuer::new(key_pair, ISSUER, AUDIENCE, Duration::from_secs(60));
        let user = student();

        let issued = issuer.issue(&user).unwrap();
        assert_eq!(issuer.verify(&issued.token).unwrap().sub, user.id);
    }

    #[test]
    fn test_header_carries_kid() {
        let issuer = rsa_issuer();
        let issued = issuer.issue(&student()).unwrap();
        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(issuer.key_id()));
    }

    #[test]
    fn test_claims_are_a_snapshot() {
        let issuer = rsa_issuer();
        let mut user = student();
        let issued = issuer.issue(&user).unwrap();

        user.add_role("Admin");

        let claims = issuer.verify(&issued.token).unwrap();
        assert!(!claims.has_role("Admin"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = rsa_issuer();
        let token = issuer.sign(&claims_for(&student(), -10)).unwrap();

        assert!(matches!(issuer.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let issuer = TokenIssuer::new(
            key_pair,
            ISSUER,
            AUDIENCE,
            Duration::from_secs(10_000 * 365 * 86400),
        );

        assert!(matches!(
            issuer.issue(&student()),
            Err(JwtError::EncodingError { .. })
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let issuer = rsa_issuer();
        let issued = issuer.issue(&student()).unwrap();

        let (signed, signature) = issued.token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{signed}.{}", chars.into_iter().collect::<String>());

        let err = issuer.verify(&tampered).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = rsa_issuer();
        let other = rsa_issuer();
        let issued = other.issue(&student()).unwrap();

        assert!(matches!(
            issuer.verify(&issued.token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let issuer = rsa_issuer();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims_for(&student(), 3600)).unwrap());
        let token = format!("{header}.{payload}.");

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_hmac_substitution_rejected() {
        let issuer = rsa_issuer();
        let jwk = issuer.jwks().keys.remove(0);
        let secret = jwk.n.unwrap();

        // HS256 keyed with public material must not validate
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims_for(&student(), 3600),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = rsa_issuer();
        let mut claims = claims_for(&student(), 3600);
        claims.aud = vec!["other-service".to_string()];
        let token = issuer.sign(&claims).unwrap();

        assert!(matches!(
            issuer.verify(&token),
            Err(JwtError::InvalidClaims { .. })
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer = rsa_issuer();
        let mut claims = claims_for(&student(), 3600);
        claims.iss = "someone-else".to_string();
        let token = issuer.sign(&claims).unwrap();

        assert!(matches!(
            issuer.verify(&token),
            Err(JwtError::InvalidClaims { .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = rsa_issuer();
        assert!(issuer.verify("not.a.token").is_err());
        assert!(issuer.verify("").is_err());
    }

    #[test]
    fn test_jwks_contains_signing_key() {
        let issuer = rsa_issuer();
        let jwks = issuer.jwks();

        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kid, issuer.key_id());
        assert_eq!(jwks.keys[0].alg, "RS256");

        let json = serde_json::to_string(&jwks).unwrap();
        assert!(json.contains("\"keys\":["));
        assert!(!json.contains("\"d\""));
    }
}
