//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A redirect carried a `location` that is not an absolute URL.
    #[error("malformed redirect location: {0}")]
    MalformedRedirect(String),

    /// The claims collaborator rejected the session payload.
    #[error("claims builder failed: {0}")]
    Claims(String),

    /// The token collaborator could not produce a token.
    #[error("token encoding failed: {0}")]
    Encoding(String),

    /// The session lifetime does not fit a timestamp.
    #[error("session max-age out of range: {0:?}")]
    InvalidMaxAge(std::time::Duration),

    /// The tenant row collaborator failed to list memberships.
    #[error("tenant source failed: {0}")]
    TenantSource(String),

    /// A request URL could not be parsed.
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    /// A cookie could not be turned into a header value.
    #[error(transparent)]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// jsonwebtoken error.
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
