//! Bearer-credential validation for the Wardlink hub.
//!
//! The hub validates a presented credential (format, signature, expiry) and
//! maps its claims onto a staff [`Identity`]. Trust in the issuing claims is
//! assumed, never re-derived: token issuance lives with an external identity
//! provider, so only the verification half of the JWT stack exists here.
//! Tokens are HS256 over a shared secret.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use wardlink_core::{Identity, StaffRole};

/// Errors that can occur while validating a presented credential.
///
/// Every variant refuses admission; no session state is created or mutated
/// on failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is not structurally a JWT.
    #[error("Malformed credential")]
    MalformedCredential,

    /// The token signature does not verify against the shared secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token has expired.
    #[error("Credential expired")]
    Expired,

    /// The token verified but its claims cannot be mapped to an identity.
    #[error("Invalid claims: {message}")]
    InvalidClaims { message: String },
}

impl AuthError {
    /// Creates a new `InvalidClaims` error.
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::MalformedCredential,
            _ => Self::invalid_claims(err.to_string()),
        }
    }
}

/// Claims carried by a Wardlink staff credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the opaque staff identity id.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Staff role, one of the enumerated role strings.
    pub role: String,
    /// Department tag (free-form).
    pub dept: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Claims for an identity, expiring `ttl_secs` from now.
    pub fn for_identity(identity: &Identity, ttl_secs: i64) -> Self {
        Self {
            sub: identity.id.clone(),
            name: identity.name.clone(),
            role: identity.role.as_str().to_string(),
            dept: identity.department.clone(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + ttl_secs,
        }
    }
}

/// Validates bearer credentials presented at connection handshake.
pub struct CredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a presented token and map its claims to an [`Identity`].
    ///
    /// Verifies structure, signature, and expiry only; the claims themselves
    /// are trusted as issued.
    pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        check_structure(token)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.sub.is_empty() {
            return Err(AuthError::invalid_claims("empty subject"));
        }
        let role: StaffRole = claims
            .role
            .parse()
            .map_err(|e| AuthError::invalid_claims(format!("{e}")))?;

        Ok(Identity::new(claims.sub, claims.name, role, claims.dept))
    }
}

/// Reject tokens that are not even shaped like a JWT before handing them to
/// the decoder, so structural garbage maps to `MalformedCredential` rather
/// than a signature failure.
fn check_structure(token: &str) -> Result<(), AuthError> {
    let mut segments = token.split('.');
    let header = segments.next().unwrap_or_default();
    if header.is_empty() || segments.clone().count() != 2 {
        return Err(AuthError::MalformedCredential);
    }
    URL_SAFE_NO_PAD
        .decode(header)
        .map(|_| ())
        .map_err(|_| AuthError::MalformedCredential)
}

/// Mint a token for the given claims.
///
/// The hub never issues credentials in production; this exists so tests and
/// local tooling can forge tokens without an external issuer.
pub fn mint_token(secret: &str, claims: &Claims) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn sample_identity() -> Identity {
        Identity::new("u-doc", "Avery Chen", StaffRole::Physician, "ICU")
    }

    #[test]
    fn test_validate_roundtrip() {
        let validator = CredentialValidator::new(SECRET);
        let claims = Claims::for_identity(&sample_identity(), 300);
        let token = mint_token(SECRET, &claims).unwrap();

        let identity = validator.validate(&token).unwrap();
        assert_eq!(identity, sample_identity());
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let validator = CredentialValidator::new(SECRET);
        for garbage in ["", "not-a-jwt", "a.b", "ö.ö.ö"] {
            let err = validator.validate(garbage).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedCredential),
                "{garbage:?} -> {err}"
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let validator = CredentialValidator::new(SECRET);
        let claims = Claims::for_identity(&sample_identity(), 300);
        let token = mint_token("some-other-secret", &claims).unwrap();

        let err = validator.validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let validator = CredentialValidator::new(SECRET);
        let claims = Claims::for_identity(&sample_identity(), -3600);
        let token = mint_token(SECRET, &claims).unwrap();

        let err = validator.validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_unknown_role_is_invalid_claims() {
        let validator = CredentialValidator::new(SECRET);
        let mut claims = Claims::for_identity(&sample_identity(), 300);
        claims.role = "janitor".to_string();
        let token = mint_token(SECRET, &claims).unwrap();

        let err = validator.validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaims { .. }));
    }

    #[test]
    fn test_empty_subject_is_invalid_claims() {
        let validator = CredentialValidator::new(SECRET);
        let mut claims = Claims::for_identity(&sample_identity(), 300);
        claims.sub = String::new();
        let token = mint_token(SECRET, &claims).unwrap();

        let err = validator.validate(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaims { .. }));
    }
}
