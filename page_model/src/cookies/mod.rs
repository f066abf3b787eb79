//! Cookie storage - the browser-managed key/value store behind `document.cookie`.
//!
//! Reads see a single `name=value; name=value` header string, exactly as a
//! page script would. Writes go through [`SetCookie`], which carries the
//! attributes a page is allowed to set.

mod jar;

pub use jar::*;

use chrono::{DateTime, Utc};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Cross-site sending policy of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    /// Sent on top-level navigation, withheld from cross-site subresource requests.
    Lax,
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

impl From<cookie::SameSite> for SameSite {
    fn from(value: cookie::SameSite) -> Self {
        match value {
            cookie::SameSite::Strict => SameSite::Strict,
            cookie::SameSite::Lax => SameSite::Lax,
            cookie::SameSite::None => SameSite::None,
        }
    }
}

/// A cookie write as a page script would issue it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    /// Explicit domain scope (e.g. `.example.com`); `None` means host-only.
    pub domain: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            expires: None,
            same_site: None,
            secure: false,
        }
    }

    /// A write that expires `name` immediately.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").with_expires(DateTime::UNIX_EPOCH)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Whether this write removes the cookie rather than storing it.
    pub fn is_removal_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|e| e <= now)
    }

    /// The write as a `cookie` crate cookie, ready for a store or a header.
    pub fn to_cookie(&self) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()));
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(expires) = self.expires {
            builder = builder.expires(to_offset_date_time(expires));
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site.into());
        }
        if self.secure {
            builder = builder.secure(true);
        }
        builder.build()
    }
}

/// Renders the assignment string a page would write to `document.cookie`.
impl std::fmt::Display for SetCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_cookie())
    }
}

/// Cookie dates outside the representable range are clamped rather than
/// dropped, so an expiry never turns into a session cookie.
fn to_offset_date_time(at: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(at.timestamp()).unwrap_or_else(|_| {
        if at.timestamp() < 0 {
            OffsetDateTime::UNIX_EPOCH
        } else {
            PrimitiveDateTime::MAX.assume_utc()
        }
    })
}

fn from_offset_date_time(at: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond())
}

/// Browser-managed cookie storage.
pub trait CookieJar: Send + Sync {
    /// The `document.cookie` view: live cookies as `name=value` pairs joined by `; `.
    fn cookie_header(&self) -> String;

    /// Apply a cookie write. Writes with a past expiry remove the matching cookie.
    fn set_cookie(&self, cookie: &SetCookie);
}

/// Find `name` in a `document.cookie` style header.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
