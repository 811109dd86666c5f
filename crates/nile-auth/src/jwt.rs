//! HS256 session tokens.

use crate::session::{SessionClaims, TokenEncoder};
use crate::{Error, Result};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Signs session claims as HS256 JWTs and verifies them again.
///
/// `iat`, `exp` and a random `jti` are added on encode.
#[derive(Debug, Clone)]
pub struct JwtTokenEncoder {
    leeway_seconds: u64,
}

impl Default for JwtTokenEncoder {
    fn default() -> Self {
        Self { leeway_seconds: 60 }
    }
}

impl JwtTokenEncoder {
    /// Clock skew tolerated when verifying `exp`.
    #[must_use]
    pub fn with_leeway(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    /// Sign `claims`, valid for `max_age` from now.
    pub fn encode_sync(
        &self,
        claims: &SessionClaims,
        secret: &str,
        max_age: Duration,
    ) -> Result<String> {
        let Value::Object(mut payload) = serde_json::to_value(claims)? else {
            return Err(Error::Encoding("claims must serialize to an object".to_string()));
        };

        let now = now_epoch_seconds();
        let exp = now
            .checked_add(max_age.as_secs())
            .filter(|exp| i64::try_from(*exp).is_ok())
            .ok_or(Error::InvalidMaxAge(max_age))?;
        payload.insert("iat".to_string(), Value::from(now));
        payload.insert("exp".to_string(), Value::from(exp));
        payload.insert(
            "jti".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?)
    }

    /// Verify a session token and return its claims.
    pub fn decode(&self, token: &str, secret: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenEncoder for JwtTokenEncoder {
    async fn encode(
        &self,
        claims: &SessionClaims,
        secret: &str,
        max_age: Duration,
    ) -> Result<String> {
        self.encode_sync(claims, secret, max_age)
    }
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;

    fn claims() -> SessionClaims {
        SessionClaims::for_user(&SessionUser {
            id: "u1".to_string(),
            name: Some("Bob".to_string()),
            email: Some("b@x.com".to_string()),
            image: None,
        })
    }

    #[test]
    fn decode_returns_signed_claims() {
        let enc = JwtTokenEncoder::default();
        let token = enc
            .encode_sync(&claims(), "s3cret", Duration::from_secs(3600))
            .unwrap();
        let back = enc.decode(&token, "s3cret").unwrap();
        assert_eq!(back.sub, "u1");
        assert_eq!(back.email.as_deref(), Some("b@x.com"));
        assert_eq!(back.picture, None);
        let (iat, exp) = (back.iat().unwrap(), back.exp().unwrap());
        assert_eq!(exp - iat, 3600);
        assert!(back.claim("jti").and_then(Value::as_str).is_some());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let enc = JwtTokenEncoder::default();
        let token = enc
            .encode_sync(&claims(), "s3cret", Duration::from_secs(3600))
            .unwrap();
        assert!(matches!(enc.decode(&token, "other"), Err(Error::Jwt(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let enc = JwtTokenEncoder::default().with_leeway(0);
        let token = enc
            .encode_sync(&claims(), "s3cret", Duration::from_secs(0))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(enc.decode(&token, "s3cret").is_err());
    }

    #[test]
    fn oversized_max_age_is_rejected() {
        let enc = JwtTokenEncoder::default();
        for secs in [u64::MAX, u64::MAX / 2 + 1] {
            let err = enc
                .encode_sync(&claims(), "s3cret", Duration::from_secs(secs))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidMaxAge(_)), "{secs}");
        }
    }

    #[test]
    fn every_token_is_new() {
        let enc = JwtTokenEncoder::default();
        let a = enc
            .encode_sync(&claims(), "s3cret", Duration::from_secs(60))
            .unwrap();
        let b = enc
            .encode_sync(&claims(), "s3cret", Duration::from_secs(60))
            .unwrap();
        assert_ne!(a, b);
    }
}
