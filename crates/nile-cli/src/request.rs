//! Build request and redirect contexts from command-line input.

use anyhow::Context;
use http::header::{COOKIE, HeaderName, LOCATION};
use http::{HeaderMap, HeaderValue};
use nile_auth::{RedirectContext, RequestContext};
use url::Url;

pub fn parse_headers(pairs: &[(String, String)]) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name {name:?}"))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid value for header {name}"))?;
        headers.append(name, value);
    }
    Ok(headers)
}

pub fn cookie_headers(cookie: Option<&str>) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie).context("invalid Cookie header")?,
        );
    }
    Ok(headers)
}

pub fn request_context(url: &str, headers: HeaderMap) -> anyhow::Result<RequestContext> {
    let url = Url::parse(url).with_context(|| format!("invalid request URL {url:?}"))?;
    Ok(RequestContext::new(url, headers))
}

pub fn redirect_context(
    url: &str,
    mut headers: HeaderMap,
    location: &str,
) -> anyhow::Result<RedirectContext> {
    let url = Url::parse(url).with_context(|| format!("invalid response URL {url:?}"))?;
    headers.insert(
        LOCATION,
        HeaderValue::from_str(location).context("invalid location")?,
    );
    Ok(RedirectContext::new(url, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nile_auth::resolve_origin;

    #[test]
    fn headers_are_case_insensitive() {
        let headers = parse_headers(&[(
            "NileDB-Origin".to_string(),
            "https://app.example.com".to_string(),
        )])
        .unwrap();
        let req = request_context("http://localhost:3000", headers).unwrap();
        assert_eq!(resolve_origin(&req).unwrap(), "https://app.example.com");
    }

    #[test]
    fn bad_header_name_is_an_error() {
        assert!(parse_headers(&[("bad name".to_string(), "x".to_string())]).is_err());
    }

    #[test]
    fn redirect_context_carries_location() {
        let res = redirect_context(
            "http://localhost:3000/api/auth/signin",
            HeaderMap::new(),
            "https://app.example.com/home",
        )
        .unwrap();
        assert_eq!(resolve_origin(&res).unwrap(), "https://app.example.com");
    }

    #[test]
    fn no_cookie_means_no_header() {
        assert!(cookie_headers(None).unwrap().is_empty());
        assert_eq!(cookie_headers(Some("a=1")).unwrap().len(), 1);
    }
}
