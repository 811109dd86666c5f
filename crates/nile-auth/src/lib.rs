//! nile-auth
//!
//! Session and cookie reconciliation for multi-tenant Nile applications, meant
//! to sit in front of a generic authentication framework. It covers:
//!
//! - **Resolving the caller's origin** from trusted headers, proxy headers, a redirect
//!   `location` or the request URL
//! - **Deciding whether cookies must be secure**, with explicit override headers
//! - **The cookie policy table**: names, attributes and lifetimes per cookie role
//! - **Reconciling the tenant cookie** against the user's tenant memberships
//! - **Minting session cookies** through pluggable claims and token collaborators
//!
//! ## Quick start
//! ```no_run
//! use http::HeaderMap;
//! use nile_auth::{RequestContext, SessionMinter, SessionUser, TenantRow, reconcile_tenant_cookie};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let req = RequestContext::parse("https://app.example.com/api/me", HeaderMap::new())?;
//!
//! let rows = vec![TenantRow::new("3fa85f64-5717-4562-b3fc-2c963f66afa6")];
//! if let Some(set_cookie) = reconcile_tenant_cookie(&HeaderMap::new(), &rows)? {
//!     println!("{set_cookie:?}");
//! }
//!
//! let minter = SessionMinter::new(Some("signing-secret".to_string()));
//! let user = SessionUser {
//!     id: "u1".to_string(),
//!     name: Some("Bob".to_string()),
//!     email: Some("b@x.com".to_string()),
//!     image: None,
//! };
//! let minted = minter.mint(&req, &user).await?;
//! println!("{}", minted.cookie);
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod cookie;
mod error;
mod jwt;
mod origin;
mod policy;
mod secure;
mod session;
mod tenant;

pub use cookie::{
    CookieAttributes, CookieDescriptor, SECURE_PREFIX, SameSite, build_clear_cookie,
    build_set_cookie, cookie_from_headers, get_cookie, parse_cookie_header,
};
pub use error::{Error, Result};
pub use jwt::JwtTokenEncoder;
pub use origin::{
    FORWARDED_ORIGIN, OriginSource, REAL_ORIGIN, RedirectContext, RequestContext, resolve_origin,
};
pub use policy::{
    CookiePolicy, CookieRole, HANDSHAKE_MAX_AGE_SECONDS, PASSWORD_RESET_MAX_AGE_SECONDS,
};
pub use secure::{LEGACY_SECURE_COOKIES, SECURE_COOKIES, use_secure_cookies};
pub use session::{
    ClaimsBuilder, DEFAULT_SESSION_MAX_AGE, MintedSession, PassthroughClaims, SessionClaims,
    SessionMinter, SessionUser, TokenEncoder, read_session_token,
};
pub use tenant::{
    StaticTenantRows, TENANT_COOKIE, TenantCookieAction, TenantCookieState, TenantRow,
    TenantRowSource, decide, is_tenant_uuid, reconcile_tenant_cookie, reconcile_with_source,
};
