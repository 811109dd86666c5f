//! Cookie helpers.
//!
//! Two output shapes live here. [`CookieDescriptor::serialize`] produces the
//! authentication framework's native `name=value; attr=value` form, which is
//! formatted for the wire further downstream. [`build_set_cookie`] and
//! [`build_clear_cookie`] produce raw `Set-Cookie` values.

use std::collections::BTreeMap;
use std::fmt;
use std::time::UNIX_EPOCH;

use http::HeaderMap;
use http::header::COOKIE;
use httpdate::fmt_http_date;
use serde::Serialize;

/// Name prefix carried by every cookie issued with the `secure` attribute.
pub const SECURE_PREFIX: &str = "__Secure-";

/// SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// SameSite=lax
    Lax,
    /// SameSite=strict
    Strict,
    /// SameSite=none
    None,
}

impl SameSite {
    /// Lowercase attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Lax => "lax",
            SameSite::Strict => "strict",
            SameSite::None => "none",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes attached to a cookie.
///
/// Field order is serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieAttributes {
    /// Not accessible to JS.
    pub http_only: bool,
    /// SameSite attribute.
    pub same_site: SameSite,
    /// Cookie path.
    pub path: String,
    /// Send on HTTPS only.
    pub secure: bool,
    /// Max-Age in seconds. `None` leaves the lifetime to the framework.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// A named cookie with its attributes.
///
/// The name carries [`SECURE_PREFIX`] exactly when `attributes.secure` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieDescriptor {
    name: String,
    attributes: CookieAttributes,
}

impl CookieDescriptor {
    /// Build a descriptor from an unprefixed name.
    pub fn new(base_name: &str, attributes: CookieAttributes) -> Self {
        let base_name = base_name.trim_start_matches(SECURE_PREFIX);
        let name = if attributes.secure {
            format!("{SECURE_PREFIX}{base_name}")
        } else {
            base_name.to_string()
        };
        Self { name, attributes }
    }

    /// Cookie name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie attributes.
    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    /// Serialize `value` under this descriptor in the framework's attribute form,
    /// e.g. `nile.state=abc; httpOnly=true; sameSite=lax; path=/; secure=false; maxAge=900`.
    pub fn serialize(&self, value: &str) -> String {
        let a = &self.attributes;
        let mut parts = vec![
            format!("{}={value}", self.name),
            format!("httpOnly={}", a.http_only),
            format!("sameSite={}", a.same_site),
            format!("path={}", a.path),
            format!("secure={}", a.secure),
        ];
        if let Some(max_age) = a.max_age {
            parts.push(format!("maxAge={max_age}"));
        }
        parts.join("; ")
    }
}

/// Parse a `Cookie` header into a name/value map.
///
/// Values are split on the first `=` only and kept verbatim. Segments without a
/// name or without `=` are skipped. The first occurrence of a repeated name wins.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in cookie_pairs(header) {
        out.entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    out
}

/// Look up a single cookie in a raw `Cookie` header.
pub fn get_cookie(header: Option<&str>, name: &str) -> Option<String> {
    cookie_pairs(header?)
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.to_string())
}

/// Look up a single cookie across every `Cookie` header in `headers`.
pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| get_cookie(Some(h), name))
}

fn cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|segment| {
        let (name, value) = segment.trim_start().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some((name, value))
        }
    })
}

/// Build a raw `Set-Cookie` header value.
pub fn build_set_cookie(name: &str, value: &str, path: &str, same_site: SameSite) -> String {
    format!("{name}={value}; Path={path}; SameSite={same_site}")
}

/// Build a raw `Set-Cookie` header value that expires the cookie immediately.
pub fn build_clear_cookie(name: &str, path: &str, same_site: SameSite) -> String {
    format!(
        "{}; Max-Age=0; Expires={}",
        build_set_cookie(name, "", path, same_site),
        fmt_http_date(UNIX_EPOCH)
    )
}
