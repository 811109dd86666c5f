//! Secure-cookie policy.

use crate::origin::{OriginSource, resolve_origin};

use http::header::HeaderName;
use tracing::warn;

/// Explicit override: `"true"` forces secure cookies, any other value disables them.
pub static SECURE_COOKIES: HeaderName = HeaderName::from_static("niledb-secure-cookies");

/// Legacy spelling of [`SECURE_COOKIES`], consulted second.
pub static LEGACY_SECURE_COOKIES: HeaderName = HeaderName::from_static("nile-secure-cookies");

/// Decide whether cookies issued for `source` must be secure.
///
/// A present override header decides on its own, even when empty or not
/// UTF-8. Without
/// overrides the answer is whether the resolved origin is `https://`. A
/// malformed redirect is recovered here and answers `false`.
pub fn use_secure_cookies(source: &impl OriginSource) -> bool {
    let headers = source.headers();
    for name in [&SECURE_COOKIES, &LEGACY_SECURE_COOKIES] {
        if let Some(value) = headers.get(name) {
            return value.as_bytes() == b"true";
        }
    }

    match resolve_origin(source) {
        Ok(origin) => origin.starts_with("https://"),
        Err(e) => {
            warn!(error = %e, "could not resolve origin, using insecure cookies");
            false
        }
    }
}
