//! Access credential codec and refresh credential generation.
//!
//! Access tokens are HS256 JWTs, verified statelessly (signature, issuer,
//! audience, time window). Refresh tokens are opaque random strings whose
//! validity lives in the credential store.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{validate_window, AccessClaims, ClaimSet, TokenValidationError};

/// Minimum accepted length of the symmetric signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Entropy of a refresh token (512 bits).
pub const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub issuer: String,
    pub audience: String,
    pub access_lifetime: Duration,
    pub refresh_lifetime: Duration,
}

impl TokenSettings {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            access_lifetime: Duration::minutes(15),
            refresh_lifetime: Duration::days(7),
        }
    }

    pub fn with_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_lifetime = access;
        self.refresh_lifetime = refresh;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret must be at least {} bytes", MIN_SECRET_LEN)]
    WeakSecret,

    #[error("failed to sign access token: {0}")]
    Signing(String),

    #[error("invalid access token: {0}")]
    Invalid(String),

    #[error("token lifetime does not fit the clock range")]
    LifetimeOutOfRange,

    #[error(transparent)]
    Window(#[from] TokenValidationError),
}

/// Signs and verifies access credentials. Read-only after construction and
/// shared process-wide.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    settings: TokenSettings,
}

impl core::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AccessTokenCodec {
    pub fn hs256(secret: &[u8], settings: TokenSettings) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }

        // Expiry is checked against the injected clock in `verify`, not the
        // library's wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "aud", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            settings,
        })
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Sign `claims` into an access token valid from `now` for the configured
    /// access lifetime. Returns the token and its expiry.
    pub fn sign(
        &self,
        claims: &ClaimSet,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let expires_at = now
            .checked_add_signed(self.settings.access_lifetime)
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let payload = AccessClaims {
            sub: claims.user_id.to_string(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7().to_string(),
            claims: claims.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, expires_at))
    }

    /// Verify signature, issuer, audience and time window at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let claims = data.claims;

        validate_window(claims.issued_at(), claims.expires_at(), now)?;
        if claims.sub != claims.claims.user_id.to_string() {
            return Err(TokenError::Invalid("subject does not match userId".to_string()));
        }

        Ok(claims)
    }
}

/// Fresh refresh token: 512 bits from the OS CSPRNG, URL-safe base64.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use registrar_core::UserId;

    use super::*;
    use crate::Role;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::hs256(SECRET, TokenSettings::new("registrar", "clients")).unwrap()
    }

    fn claims() -> ClaimSet {
        ClaimSet {
            user_id: UserId::new(12),
            user_name: Some("a@b.com".to_string()),
            first_name: None,
            last_name: None,
            email: Some("a@b.com".to_string()),
            phone_number: None,
            roles: vec![Role::STUDENT],
            student_code: Some("000123".to_string()),
            professor_code: None,
        }
    }

    #[test]
    fn short_secrets_are_rejected() {
        let err = AccessTokenCodec::hs256(b"short", TokenSettings::new("i", "a")).unwrap_err();
        assert_eq!(err, TokenError::WeakSecret);
    }

    #[test]
    fn signed_token_verifies_and_carries_claims() {
        let codec = codec();
        let now = Utc::now();
        let (token, expires_at) = codec.sign(&claims(), now).unwrap();

        assert_eq!(expires_at, now + Duration::minutes(15));
        let verified = codec.verify(&token, now + Duration::minutes(1)).unwrap();
        assert_eq!(verified.claims, claims());
        assert_eq!(verified.sub, "12");
        assert_eq!(verified.iss, "registrar");
        assert_eq!(verified.aud, "clients");
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let now = Utc::now();
        let (token, _) = codec.sign(&claims(), now).unwrap();

        let err = codec.verify(&token, now + Duration::minutes(16)).unwrap_err();
        assert_eq!(err, TokenError::Window(TokenValidationError::Expired));
    }

    #[test]
    fn foreign_audience_or_key_is_rejected() {
        let now = Utc::now();
        let (token, _) = codec().sign(&claims(), now).unwrap();

        let other_aud =
            AccessTokenCodec::hs256(SECRET, TokenSettings::new("registrar", "elsewhere")).unwrap();
        assert!(matches!(other_aud.verify(&token, now), Err(TokenError::Invalid(_))));

        let other_key = AccessTokenCodec::hs256(
            b"ffffffffffffffffffffffffffffffff",
            TokenSettings::new("registrar", "clients"),
        )
        .unwrap();
        assert!(matches!(other_key.verify(&token, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn oversized_access_lifetime_is_an_error() {
        let settings = TokenSettings::new("registrar", "registrar-clients")
            .with_lifetimes(Duration::MAX, Duration::MAX);
        let codec = AccessTokenCodec::hs256(SECRET, settings).unwrap();

        let err = codec.sign(&claims(), Utc::now()).unwrap_err();
        assert_eq!(err, TokenError::LifetimeOutOfRange);
    }

    #[test]
    fn refresh_tokens_are_long_and_distinct() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();

        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), REFRESH_TOKEN_BYTES);
    }
}
