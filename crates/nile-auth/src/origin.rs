//! Origin resolution.
//!
//! The logical origin of a caller is taken from the first non-empty signal:
//!
//! 1. the trusted `niledb-origin` header
//! 2. the `x-forwarded-origin` header set by a proxy
//! 3. the `location` of a redirect, when resolving a redirect response
//! 4. the origin of the URL itself

use crate::{Error, Result};

use http::HeaderMap;
use http::header::{HeaderName, LOCATION};
use tracing::debug;
use url::Url;

/// Trusted header carrying the real origin of the caller.
pub static REAL_ORIGIN: HeaderName = HeaderName::from_static("niledb-origin");

/// Header carrying the origin as seen by a forwarding proxy.
pub static FORWARDED_ORIGIN: HeaderName = HeaderName::from_static("x-forwarded-origin");

/// Anything we can read an origin from: headers, a URL and maybe a redirect target.
pub trait OriginSource {
    /// Headers attached to the request or response.
    fn headers(&self) -> &HeaderMap;

    /// Absolute URL of the request or response.
    fn url(&self) -> &Url;

    /// Redirect target, if this source is a redirect.
    fn redirect_location(&self) -> Option<&str> {
        None
    }
}

/// An inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    url: Url,
    headers: HeaderMap,
}

impl RequestContext {
    /// Wrap an already parsed URL and its headers.
    pub fn new(url: Url, headers: HeaderMap) -> Self {
        Self { url, headers }
    }

    /// Parse `url` and wrap it with `headers`.
    pub fn parse(url: &str, headers: HeaderMap) -> Result<Self> {
        Ok(Self::new(Url::parse(url)?, headers))
    }
}

impl OriginSource for RequestContext {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

/// A redirect response produced by the authentication framework.
#[derive(Debug, Clone)]
pub struct RedirectContext {
    url: Url,
    headers: HeaderMap,
}

impl RedirectContext {
    /// Wrap the response URL and its headers (which should include `location`).
    pub fn new(url: Url, headers: HeaderMap) -> Self {
        Self { url, headers }
    }
}

impl OriginSource for RedirectContext {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn redirect_location(&self) -> Option<&str> {
        header_str(&self.headers, &LOCATION)
    }
}

/// Resolve the logical origin of `source`.
///
/// Fails with [`Error::MalformedRedirect`] when the redirect branch is taken and
/// `location` is not an absolute URL. There is no fallthrough in that case.
pub fn resolve_origin(source: &impl OriginSource) -> Result<String> {
    let headers = source.headers();

    if let Some(origin) = non_empty(header_str(headers, &REAL_ORIGIN)) {
        debug!(origin, "origin from trusted header");
        return Ok(origin.to_string());
    }

    if let Some(origin) = non_empty(header_str(headers, &FORWARDED_ORIGIN)) {
        debug!(origin, "origin from forwarded header");
        return Ok(origin.to_string());
    }

    if let Some(location) = non_empty(source.redirect_location()) {
        let target =
            Url::parse(location).map_err(|e| Error::MalformedRedirect(format!("{location}: {e}")))?;
        let origin = target.origin().ascii_serialization();
        debug!(origin = %origin, "origin from redirect location");
        return Ok(origin);
    }

    Ok(source.url().origin().ascii_serialization())
}

/// Read a header as UTF-8. Non-UTF-8 values count as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn request(url: &str, pairs: &[(&'static str, &'static str)]) -> RequestContext {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.insert(*k, HeaderValue::from_static(*v));
        }
        RequestContext::parse(url, headers).unwrap()
    }

    fn redirect(url: &str, location: &'static str) -> RedirectContext {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static(location));
        RedirectContext::new(Url::parse(url).unwrap(), headers)
    }

    #[test]
    fn trusted_header_wins() {
        let req = request(
            "http://internal:3000/api/auth/session",
            &[
                ("niledb-origin", "https://app.example.com"),
                ("x-forwarded-origin", "https://proxy.example.com"),
            ],
        );
        assert_eq!(resolve_origin(&req).unwrap(), "https://app.example.com");
    }

    #[test]
    fn forwarded_header_before_url() {
        let req = request(
            "http://internal:3000/api/auth/session",
            &[("x-forwarded-origin", "https://proxy.example.com")],
        );
        assert_eq!(resolve_origin(&req).unwrap(), "https://proxy.example.com");
    }

    #[test]
    fn empty_header_is_skipped() {
        let req = request("https://app.example.com/x", &[("niledb-origin", "")]);
        assert_eq!(resolve_origin(&req).unwrap(), "https://app.example.com");
    }

    #[test]
    fn falls_back_to_url_origin() {
        let req = request("http://localhost:3000/api/auth/session?x=1", &[]);
        assert_eq!(resolve_origin(&req).unwrap(), "http://localhost:3000");
    }

    #[test]
    fn redirect_uses_location() {
        let res = redirect(
            "http://internal:3000/api/auth/signin",
            "https://app.example.com/dashboard",
        );
        assert_eq!(resolve_origin(&res).unwrap(), "https://app.example.com");
    }

    #[test]
    fn relative_redirect_is_an_error() {
        let res = redirect("https://app.example.com/api/auth/signin", "/dashboard");
        assert!(matches!(
            resolve_origin(&res),
            Err(Error::MalformedRedirect(_))
        ));
    }

    #[test]
    fn redirect_without_location_uses_url() {
        let res = RedirectContext::new(
            Url::parse("https://app.example.com/api/auth/signin").unwrap(),
            HeaderMap::new(),
        );
        assert_eq!(resolve_origin(&res).unwrap(), "https://app.example.com");
    }
}
