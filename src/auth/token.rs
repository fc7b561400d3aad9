use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by an access token. Validity is determined entirely by
/// the signature and `exp`; access tokens are never persisted or looked up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub role: String,
    pub exp: i64,
}

/// Signs and verifies access tokens with a process-wide symmetric secret.
/// The secret is an explicit constructor input, not ambient state.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn sign(&self, user_id: Uuid, role: &str) -> Result<String, AppError> {
        let claims = AccessClaims {
            sub: user_id,
            role: role.to_owned(),
            exp: (Utc::now() + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Rejects expired tokens and tokens signed with any algorithm other
    /// than HS256.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Forbidden)
    }
}

/// 32 bytes from a CSPRNG, URL-safe base64 without padding (43 chars).
/// Uniqueness is left to the store's unique constraint; a collision on a
/// 256-bit value is cryptographically negligible and not retried.
pub fn generate_refresh_token() -> String {
    let mut buf = [0u8; 32];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::from("test-secret"))
    }

    #[test]
    fn signed_token_round_trips() {
        let signer = signer();
        let user_id = Uuid::new_v4();
        let token = signer.sign(user_id, "editor").unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "editor");

        let lifetime = claims.exp - Utc::now().timestamp();
        assert!((890..=900).contains(&lifetime), "lifetime was {lifetime}s");
    }

    #[test]
    fn tampered_token_is_forbidden() {
        let signer = signer();
        let token = signer.sign(Uuid::new_v4(), "editor").unwrap();
        let mut tampered = token.clone();
        tampered.pop();

        assert_eq!(signer.verify(&tampered).unwrap_err(), AppError::Forbidden);
    }

    #[test]
    fn wrong_secret_is_forbidden() {
        let token = signer().sign(Uuid::new_v4(), "editor").unwrap();
        let other = TokenSigner::new(&SecretString::from("other-secret"));

        assert_eq!(other.verify(&token).unwrap_err(), AppError::Forbidden);
    }

    #[test]
    fn foreign_algorithm_is_forbidden() {
        // A token signed with HS384 must not pass HS256-pinned verification
        // even though the secret matches.
        let secret = SecretString::from("test-secret");
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            role: "editor".to_owned(),
            exp: (Utc::now() + Duration::minutes(15)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .unwrap();

        let signer = TokenSigner::new(&secret);
        assert_eq!(signer.verify(&token).unwrap_err(), AppError::Forbidden);
    }

    #[test]
    fn refresh_token_is_43_url_safe_chars() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn refresh_tokens_are_distinct() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }
}
