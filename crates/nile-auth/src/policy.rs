//! Cookie policy table.
//!
//! Every role gets `httpOnly`, `SameSite=lax` and `Path=/`. Lifetimes differ per
//! role and clients depend on the exact values, so they are fixed here.

use crate::cookie::{CookieAttributes, CookieDescriptor, SameSite};
use crate::origin::OriginSource;
use crate::secure::use_secure_cookies;

use serde::Serialize;

/// Lifetime of PKCE verifier, state and WebAuthn challenge cookies.
pub const HANDSHAKE_MAX_AGE_SECONDS: u64 = 15 * 60;

/// Lifetime of the password-reset cookie.
pub const PASSWORD_RESET_MAX_AGE_SECONDS: u64 = 4 * 60 * 60;

/// Logical cookie roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CookieRole {
    /// Session token.
    SessionToken,
    /// Callback URL.
    CallbackUrl,
    /// CSRF token.
    CsrfToken,
    /// PKCE code verifier.
    PkceCodeVerifier,
    /// OAuth state.
    State,
    /// OIDC nonce.
    Nonce,
    /// WebAuthn challenge.
    WebauthnChallenge,
    /// Password reset.
    PasswordReset,
}

impl CookieRole {
    /// All roles in table order.
    pub const ALL: [CookieRole; 8] = [
        CookieRole::SessionToken,
        CookieRole::CallbackUrl,
        CookieRole::CsrfToken,
        CookieRole::PkceCodeVerifier,
        CookieRole::State,
        CookieRole::Nonce,
        CookieRole::WebauthnChallenge,
        CookieRole::PasswordReset,
    ];

    /// Cookie name without the secure prefix.
    pub fn base_name(self) -> &'static str {
        match self {
            CookieRole::SessionToken => "nile.session-token",
            CookieRole::CallbackUrl => "nile.callback-url",
            CookieRole::CsrfToken => "nile.csrf-token",
            CookieRole::PkceCodeVerifier => "nile.pkce.code_verifier",
            CookieRole::State => "nile.state",
            CookieRole::Nonce => "nile.nonce",
            CookieRole::WebauthnChallenge => "nile.challenge",
            CookieRole::PasswordReset => "nile.reset",
        }
    }

    fn max_age(self) -> Option<u64> {
        match self {
            CookieRole::PkceCodeVerifier | CookieRole::State | CookieRole::WebauthnChallenge => {
                Some(HANDSHAKE_MAX_AGE_SECONDS)
            }
            CookieRole::PasswordReset => Some(PASSWORD_RESET_MAX_AGE_SECONDS),
            CookieRole::SessionToken
            | CookieRole::CallbackUrl
            | CookieRole::CsrfToken
            | CookieRole::Nonce => None,
        }
    }

    fn descriptor(self, secure: bool) -> CookieDescriptor {
        CookieDescriptor::new(
            self.base_name(),
            CookieAttributes {
                http_only: true,
                same_site: SameSite::Lax,
                path: "/".to_string(),
                secure,
                max_age: self.max_age(),
            },
        )
    }
}

/// The cookie descriptors in effect for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiePolicy {
    /// Session token.
    pub session_token: CookieDescriptor,
    /// Callback URL.
    pub callback_url: CookieDescriptor,
    /// CSRF token.
    pub csrf_token: CookieDescriptor,
    /// PKCE code verifier.
    pub pkce_code_verifier: CookieDescriptor,
    /// OAuth state.
    pub state: CookieDescriptor,
    /// OIDC nonce.
    pub nonce: CookieDescriptor,
    /// WebAuthn challenge.
    pub webauthn_challenge: CookieDescriptor,
    /// Password reset.
    pub password_reset: CookieDescriptor,
}

impl CookiePolicy {
    /// Build the table for a secure-cookie decision.
    pub fn new(secure: bool) -> Self {
        Self {
            session_token: CookieRole::SessionToken.descriptor(secure),
            callback_url: CookieRole::CallbackUrl.descriptor(secure),
            csrf_token: CookieRole::CsrfToken.descriptor(secure),
            pkce_code_verifier: CookieRole::PkceCodeVerifier.descriptor(secure),
            state: CookieRole::State.descriptor(secure),
            nonce: CookieRole::Nonce.descriptor(secure),
            webauthn_challenge: CookieRole::WebauthnChallenge.descriptor(secure),
            password_reset: CookieRole::PasswordReset.descriptor(secure),
        }
    }

    /// Build the table for whatever `source` calls for.
    pub fn for_source(source: &impl OriginSource) -> Self {
        Self::new(use_secure_cookies(source))
    }

    /// Descriptor for `role`.
    pub fn get(&self, role: CookieRole) -> &CookieDescriptor {
        match role {
            CookieRole::SessionToken => &self.session_token,
            CookieRole::CallbackUrl => &self.callback_url,
            CookieRole::CsrfToken => &self.csrf_token,
            CookieRole::PkceCodeVerifier => &self.pkce_code_verifier,
            CookieRole::State => &self.state,
            CookieRole::Nonce => &self.nonce,
            CookieRole::WebauthnChallenge => &self.webauthn_challenge,
            CookieRole::PasswordReset => &self.password_reset,
        }
    }

    /// Iterate `(role, descriptor)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (CookieRole, &CookieDescriptor)> {
        CookieRole::ALL.into_iter().map(|role| (role, self.get(role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_match_table() {
        let policy = CookiePolicy::new(false);
        let expected = [
            (CookieRole::SessionToken, None),
            (CookieRole::CallbackUrl, None),
            (CookieRole::CsrfToken, None),
            (CookieRole::PkceCodeVerifier, Some(900)),
            (CookieRole::State, Some(900)),
            (CookieRole::Nonce, None),
            (CookieRole::WebauthnChallenge, Some(900)),
            (CookieRole::PasswordReset, Some(14_400)),
        ];
        for (role, max_age) in expected {
            assert_eq!(policy.get(role).attributes().max_age, max_age, "{role:?}");
        }
    }

    #[test]
    fn every_role_is_lax_http_only_root() {
        for secure in [true, false] {
            for (_, d) in CookiePolicy::new(secure).iter() {
                let a = d.attributes();
                assert!(a.http_only);
                assert_eq!(a.same_site, SameSite::Lax);
                assert_eq!(a.path, "/");
                assert_eq!(a.secure, secure);
            }
        }
    }

    #[test]
    fn secure_policy_prefixes_every_name() {
        for (role, d) in CookiePolicy::new(true).iter() {
            assert_eq!(d.name(), format!("__Secure-{}", role.base_name()));
        }
        for (role, d) in CookiePolicy::new(false).iter() {
            assert_eq!(d.name(), role.base_name());
        }
    }

    #[test]
    fn policy_for_https_request_is_secure() {
        let req = crate::origin::RequestContext::parse(
            "https://app.example.com/api/auth/signin",
            http::HeaderMap::new(),
        )
        .unwrap();
        let policy = CookiePolicy::for_source(&req);
        assert_eq!(policy.session_token.name(), "__Secure-nile.session-token");
    }

    #[test]
    fn iter_covers_all_roles() {
        assert_eq!(CookiePolicy::new(true).iter().count(), CookieRole::ALL.len());
    }
}
