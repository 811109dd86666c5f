//! Session minting.
//!
//! A minted session is a signed token stored in the session-token cookie of the
//! current [`CookiePolicy`]. Claims enrichment and token signing belong to the
//! authentication framework and are reached through [`ClaimsBuilder`] and
//! [`TokenEncoder`].

use std::fmt;
use std::time::{Duration, SystemTime};

use crate::{Error, Result};
use crate::cookie::cookie_from_headers;
use crate::jwt::JwtTokenEncoder;
use crate::origin::OriginSource;
use crate::policy::CookiePolicy;
use crate::secure::use_secure_cookies;

use async_trait::async_trait;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default session lifetime: 30 days.
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// The authenticated user a session is minted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User id. Becomes the `sub` claim.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL. Becomes the `picture` claim.
    #[serde(default)]
    pub image: Option<String>,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Subject (user id).
    pub sub: String,
    /// Anything added by a claims builder or the encoder (`iat`, `exp`, `jti`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    /// The token skeleton for `user`.
    pub fn for_user(user: &SessionUser) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            picture: user.image.clone(),
            sub: user.id.clone(),
            extra: Map::new(),
        }
    }

    /// Get an extra claim by key.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Convenience accessor for `exp`.
    pub fn exp(&self) -> Option<u64> {
        self.claim("exp").and_then(Value::as_u64)
    }

    /// Convenience accessor for `iat`.
    pub fn iat(&self) -> Option<u64> {
        self.claim("iat").and_then(Value::as_u64)
    }
}

/// Enriches a token skeleton into the final claims.
#[async_trait]
pub trait ClaimsBuilder: Send + Sync {
    /// Build claims for `user`. `account` is the OAuth account context, if any.
    async fn build_claims(
        &self,
        token: SessionClaims,
        user: &SessionUser,
        account: Option<&Value>,
    ) -> Result<SessionClaims>;
}

/// Returns the skeleton unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughClaims;

#[async_trait]
impl ClaimsBuilder for PassthroughClaims {
    async fn build_claims(
        &self,
        token: SessionClaims,
        _user: &SessionUser,
        _account: Option<&Value>,
    ) -> Result<SessionClaims> {
        Ok(token)
    }
}

/// Signs claims into an opaque token string.
#[async_trait]
pub trait TokenEncoder: Send + Sync {
    /// Encode `claims` with `secret`, valid for `max_age`.
    async fn encode(
        &self,
        claims: &SessionClaims,
        secret: &str,
        max_age: Duration,
    ) -> Result<String>;
}

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct MintedSession {
    /// Cookie string, in the framework's attribute form.
    pub cookie: String,
    /// The token stored in the cookie. Empty when no secret is configured.
    pub token: String,
    /// When the session lapses. Not part of `cookie`.
    pub expires_at: SystemTime,
    /// Whether secure cookies were in effect.
    pub secure: bool,
}

/// Mints session cookies.
///
/// The signing secret is injected at construction. Without one, sessions are
/// still minted but carry an empty token.
pub struct SessionMinter {
    secret: Option<String>,
    max_age: Duration,
    claims: Box<dyn ClaimsBuilder>,
    encoder: Box<dyn TokenEncoder>,
}

impl fmt::Debug for SessionMinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMinter")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SessionMinter {
    /// A minter using [`PassthroughClaims`], [`JwtTokenEncoder`] and a 30 day lifetime.
    ///
    /// An empty secret counts as no secret.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            max_age: DEFAULT_SESSION_MAX_AGE,
            claims: Box::new(PassthroughClaims),
            encoder: Box::new(JwtTokenEncoder::default()),
        }
    }

    /// Override the session lifetime.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Override the claims collaborator.
    #[must_use]
    pub fn with_claims_builder(mut self, claims: impl ClaimsBuilder + 'static) -> Self {
        self.claims = Box::new(claims);
        self
    }

    /// Override the token collaborator.
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl TokenEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Session lifetime.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Mint a session cookie for `user` on behalf of `source`.
    ///
    /// Collaborator failures are returned as-is. A lifetime too large to add to
    /// the current time fails with [`Error::InvalidMaxAge`].
    pub async fn mint(
        &self,
        source: &impl OriginSource,
        user: &SessionUser,
    ) -> Result<MintedSession> {
        let expires_at = SystemTime::now()
            .checked_add(self.max_age)
            .ok_or(Error::InvalidMaxAge(self.max_age))?;
        let secure = use_secure_cookies(source);
        let descriptor = CookiePolicy::new(secure).session_token;

        let claims = self
            .claims
            .build_claims(SessionClaims::for_user(user), user, None)
            .await?;

        let token = match &self.secret {
            Some(secret) => self.encoder.encode(&claims, secret, self.max_age).await?,
            None => {
                warn!(user = %user.id, "no signing secret configured, minting empty session token");
                String::new()
            }
        };

        debug!(user = %user.id, secure, cookie = descriptor.name(), "minted session");

        Ok(MintedSession {
            cookie: descriptor.serialize(&token),
            token,
            expires_at,
            secure,
        })
    }
}

/// Read the session token the client presented under `policy`'s cookie name.
pub fn read_session_token(headers: &HeaderMap, policy: &CookiePolicy) -> Option<String> {
    cookie_from_headers(headers, policy.session_token.name()).filter(|t| !t.is_empty())
}
