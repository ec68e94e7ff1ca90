//! # Credentials
//!
//! Password digests and bearer tokens.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests in the form
//! `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`. Bearer tokens are
//! HS256 JWTs whose `sub` claim is the employee id.

use chrono::{Duration, Utc};
use hmac::Hmac;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pbkdf2::pbkdf2;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 60_000;
const SALT_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("stored password digest is malformed")]
    MalformedDigest,
    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token subject is not an employee id")]
    InvalidSubject,
    #[error("HMAC key rejected: {0}")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
    #[error("password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32], CredentialError> {
    let mut digest = [0u8; 32];
    pbkdf2::<HmacSha256>(password, salt, iterations, &mut digest)?;
    Ok(digest)
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    hash_password_with_iterations(password, DEFAULT_PASSWORD_ITERATIONS)
}

/// Lower iteration counts are only meant for fixtures.
pub fn hash_password_with_iterations(
    password: &str,
    iterations: u32,
) -> Result<String, CredentialError> {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password.as_bytes(), &salt, iterations)?;
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    ))
}

/// Checks `password` against a stored digest in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CredentialError::MalformedDigest);
    };

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| CredentialError::MalformedDigest)?;
    let salt = hex::decode(salt).map_err(|_| CredentialError::MalformedDigest)?;
    let expected = hex::decode(expected).map_err(|_| CredentialError::MalformedDigest)?;

    let actual = derive(password.as_bytes(), &salt, iterations.max(1))?;
    Ok(actual.as_slice().ct_eq(expected.as_slice()).into())
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(
    password: String,
    stored: String,
) -> Result<bool, CredentialError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?
}

/// JWT claims carried by bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl_minutes: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::minutes(i64::from(ttl_minutes)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.signing_secret().as_bytes(), config.token_ttl_minutes)
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, employee_id: i32) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            sub: employee_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies signature and expiry and returns the employee id.
    pub fn verify(&self, token: &str) -> Result<i32, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        data.claims
            .sub
            .parse()
            .map_err(|_| CredentialError::InvalidSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let stored = hash_password_with_iterations("correct horse", 10).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$10$"));
        assert!(verify_password("correct horse", &stored).unwrap());
        assert!(!verify_password("battery staple", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(
            hash_password_with_iterations("pw", 2).unwrap(),
            hash_password_with_iterations("pw", 2).unwrap()
        );
    }

    #[test]
    fn pbkdf2_matches_rfc7914_vector() {
        // RFC 7914 section 11, first PBKDF2-HMAC-SHA256 vector (first 32 bytes).
        let block = derive(b"passwd", b"salt", 1).unwrap();
        assert_eq!(
            hex::encode(block),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[tokio::test]
    async fn blocking_pool_helpers_agree_with_sync_versions() {
        let stored = hash_password_blocking("long-enough".to_string())
            .await
            .unwrap();
        assert!(stored.starts_with(&format!("pbkdf2-sha256${DEFAULT_PASSWORD_ITERATIONS}$")));
        assert!(
            verify_password_blocking("long-enough".to_string(), stored.clone())
                .await
                .unwrap()
        );
        assert!(
            !verify_password_blocking("wrong".to_string(), stored)
                .await
                .unwrap()
        );
    }

    #[test]
    fn malformed_digest_is_an_error() {
        assert!(matches!(
            verify_password("pw", "plain-text"),
            Err(CredentialError::MalformedDigest)
        ));
        assert!(matches!(
            verify_password("pw", "pbkdf2-sha256$x$00$00"),
            Err(CredentialError::MalformedDigest)
        ));
    }

    #[test]
    fn token_round_trip() {
        let keys = TokenKeys::new(b"0123456789abcdef0123456789abcdef", 30);
        let token = keys.issue(42).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), 42);
        assert_eq!(keys.ttl_seconds(), 1800);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenKeys::new(b"0123456789abcdef0123456789abcdef", 30);
        let verifier = TokenKeys::new(b"fedcba9876543210fedcba9876543210", 30);
        let token = issuer.issue(42).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new(b"0123456789abcdef0123456789abcdef", 30);
        let claims = Claims {
            sub: "42".to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
