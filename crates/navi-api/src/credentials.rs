use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use thiserror::Error;
use tracing::warn;

use navi_types::api::Claims;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or its signature is invalid")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token subject {0:?} is not a user id")]
    BadSubject(String),
}

/// Who a valid bearer token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
}

/// Issues and resolves stateless HS256 bearer tokens.
pub struct Credentials {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Credentials {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue_token(&self, user_id: i64, username: &str) -> anyhow::Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token lifetime {} overflows the clock", self.ttl))?;
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn resolve_token(&self, token: &str) -> Result<TokenSubject, CredentialError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                CredentialError::Expired
            } else {
                CredentialError::Invalid(e)
            }
        })?;

        let claims = data.claims;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| CredentialError::BadSubject(claims.sub.clone()))?;

        Ok(TokenSubject { user_id })
    }
}

/// Argon2id hash in PHC string format, with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is not a PHC string: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Burn one verification against a throwaway hash, so a login for an unknown
/// username costs about as much as one with a wrong password.
pub fn verify_against_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("navi-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("pw1").unwrap();
        assert_ne!(hash, "pw1");
        assert!(verify_password("pw1", &hash));
        assert!(!verify_password("pw2", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("pw1", "not-a-hash"));
    }

    #[test]
    fn token_resolves_to_subject() {
        let creds = Credentials::new("secret", Duration::days(7));
        let token = creds.issue_token(42, "alice").unwrap();

        let subject = creds.resolve_token(&token).unwrap();
        assert_eq!(subject, TokenSubject { user_id: 42 });
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the validator's default leeway.
        let creds = Credentials::new("secret", Duration::minutes(-10));
        let token = creds.issue_token(1, "alice").unwrap();

        assert!(matches!(creds.resolve_token(&token), Err(CredentialError::Expired)));
    }

    #[test]
    fn oversized_lifetime_is_an_error() {
        let creds = Credentials::new("secret", Duration::days(100_000_000_000));
        assert!(creds.issue_token(1, "alice").is_err());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = Credentials::new("secret", Duration::days(7));
        let theirs = Credentials::new("other-secret", Duration::days(7));
        let token = theirs.issue_token(1, "alice").unwrap();

        assert!(matches!(ours.resolve_token(&token), Err(CredentialError::Invalid(_))));
        assert!(matches!(ours.resolve_token("abc.def"), Err(CredentialError::Invalid(_))));
    }
}
