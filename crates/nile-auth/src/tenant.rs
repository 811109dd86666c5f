//! Tenant cookie reconciliation.
//!
//! The tenant cookie records which tenant the user is working in. It is a UX
//! convenience and never an access-control decision: a cookie naming one of the
//! user's tenants is left alone without further checks.

use crate::cookie::{SameSite, build_clear_cookie, build_set_cookie, cookie_from_headers};
use crate::Result;

use async_trait::async_trait;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the tenant-selection cookie.
pub const TENANT_COOKIE: &str = "nile.tenant";

const TENANT_COOKIE_PATH: &str = "/";

/// A tenant the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRow {
    /// Tenant id.
    pub id: String,
}

impl TenantRow {
    /// Build a row from an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Supplies the ordered tenant memberships of a user. The first row is the default.
#[async_trait]
pub trait TenantRowSource: Send + Sync {
    /// List the tenants `user_id` belongs to.
    async fn tenants_for_user(&self, user_id: &str) -> Result<Vec<TenantRow>>;
}

/// A fixed list of tenant rows, returned for every user.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantRows {
    rows: Vec<TenantRow>,
}

impl StaticTenantRows {
    /// Serve `rows` in the given order.
    pub fn new(rows: Vec<TenantRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl TenantRowSource for StaticTenantRows {
    async fn tenants_for_user(&self, _user_id: &str) -> Result<Vec<TenantRow>> {
        Ok(self.rows.clone())
    }
}

/// What the caller's tenant cookie looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantCookieState {
    /// No tenant cookie was sent.
    Absent,
    /// A syntactically valid UUID.
    Valid(String),
    /// Something that is not a UUID. Treated as [`TenantCookieState::Absent`].
    Malformed(String),
}

impl TenantCookieState {
    /// Classify a raw cookie value.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            None => TenantCookieState::Absent,
            Some(v) if is_tenant_uuid(v) => TenantCookieState::Valid(v.to_string()),
            Some(v) => TenantCookieState::Malformed(v.to_string()),
        }
    }

    /// Read the tenant cookie out of request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_value(cookie_from_headers(headers, TENANT_COOKIE).as_deref())
    }

    /// The value to compare against tenant rows, if any.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            TenantCookieState::Valid(v) => Some(v.as_str()),
            TenantCookieState::Absent | TenantCookieState::Malformed(_) => None,
        }
    }
}

/// The correction to apply to the tenant cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "tenant_id", rename_all = "snake_case")]
pub enum TenantCookieAction {
    /// Cookie is fine, or there is nothing to set.
    Unchanged,
    /// Set (or replace) the cookie with this tenant id.
    Set(String),
    /// Expire the cookie.
    Clear,
}

impl TenantCookieAction {
    /// The `Set-Cookie` value for this action, or `None` for a no-op.
    pub fn set_cookie(&self) -> Option<String> {
        match self {
            TenantCookieAction::Unchanged => None,
            TenantCookieAction::Set(id) => Some(build_set_cookie(
                TENANT_COOKIE,
                id,
                TENANT_COOKIE_PATH,
                SameSite::Lax,
            )),
            TenantCookieAction::Clear => Some(build_clear_cookie(
                TENANT_COOKIE,
                TENANT_COOKIE_PATH,
                SameSite::Lax,
            )),
        }
    }

    /// Headers to merge into the response, or `None` for a no-op.
    pub fn into_headers(self) -> Result<Option<HeaderMap>> {
        let Some(cookie) = self.set_cookie() else {
            return Ok(None);
        };
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_str(&cookie)?);
        Ok(Some(headers))
    }
}

/// Decide what to do with the tenant cookie given the user's tenant rows.
///
/// - no cookie: set the first row, if there is one
/// - cookie names a row: leave it
/// - cookie names no row: replace with the first row, or clear when there are none
pub fn decide(state: &TenantCookieState, rows: &[TenantRow]) -> TenantCookieAction {
    let first = rows.first().map(|r| r.id.clone());

    let action = match state.candidate() {
        None => first.map_or(TenantCookieAction::Unchanged, TenantCookieAction::Set),
        Some(current) if rows.iter().any(|r| r.id == current) => TenantCookieAction::Unchanged,
        Some(_) => first.map_or(TenantCookieAction::Clear, TenantCookieAction::Set),
    };

    debug!(?state, rows = rows.len(), ?action, "tenant cookie decision");
    action
}

/// Reconcile the tenant cookie carried by `headers` against `rows`.
///
/// Returns the headers to merge into the response, or `None` when nothing changes.
pub fn reconcile_tenant_cookie(
    headers: &HeaderMap,
    rows: &[TenantRow],
) -> Result<Option<HeaderMap>> {
    decide(&TenantCookieState::from_headers(headers), rows).into_headers()
}

/// Like [`reconcile_tenant_cookie`], fetching the rows from `source` first.
pub async fn reconcile_with_source(
    headers: &HeaderMap,
    user_id: &str,
    source: &dyn TenantRowSource,
) -> Result<Option<HeaderMap>> {
    let rows = source.tenants_for_user(user_id).await?;
    reconcile_tenant_cookie(headers, &rows)
}

/// Hyphenated UUID, version nibble 1-8, variant nibble 8/9/a/b.
pub fn is_tenant_uuid(value: &str) -> bool {
    const HYPHENS: [usize; 4] = [8, 13, 18, 23];

    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| {
        if HYPHENS.contains(&i) {
            *b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    });
    if !shape_ok {
        return false;
    }

    let Ok(uuid) = uuid::Uuid::try_parse(value) else {
        return false;
    };
    (1..=8).contains(&uuid.get_version_num())
        && matches!(uuid.get_variant(), uuid::Variant::RFC4122)
}
