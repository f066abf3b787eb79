//! In-memory cookie jar with `document.cookie` semantics.

use chrono::{DateTime, Utc};
use cookie_store::CookieStore;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use url::Url;

use super::{from_offset_date_time, CookieJar, SameSite, SetCookie};
use crate::location::PageLocation;

/// A cookie held by the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// The `Domain` attribute as written, without a leading dot.
    pub domain: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
}

/// Headless cookie storage for one origin.
///
/// Backed by a [`CookieStore`], so domain and path matching follow RFC 6265:
/// `domain=example.com` and `domain=.example.com` name the same cookie, and
/// writes are checked against the page's own host.
pub struct MemoryCookieJar {
    origin: Option<Url>,
    store: Mutex<CookieStore>,
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::for_location(&PageLocation::default())
    }
}

impl std::fmt::Debug for MemoryCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCookieJar")
            .field("origin", &self.origin.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl MemoryCookieJar {
    /// An empty jar for `localhost`.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty jar for the page at `location`.
    pub fn for_location(location: &PageLocation) -> Self {
        let origin = match location.url() {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(host = %location.hostname, error = %err, "page location is not a valid url; cookies disabled");
                None
            }
        };
        Self {
            origin,
            store: Mutex::new(CookieStore::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All live entries named `name`, across scopes.
    pub fn entries(&self, name: &str) -> Vec<StoredCookie> {
        self.lock()
            .iter_unexpired()
            .filter(|cookie| cookie.name() == name)
            .map(|cookie| StoredCookie {
                name: cookie.name().to_string(),
                value: cookie.value().to_string(),
                path: cookie.path().unwrap_or("/").to_string(),
                domain: cookie.domain().map(str::to_string),
                expires: cookie
                    .expires()
                    .and_then(|expiration| expiration.datetime())
                    .and_then(from_offset_date_time),
                same_site: cookie.same_site().map(SameSite::from),
                secure: cookie.secure().unwrap_or(false),
            })
            .collect()
    }

    /// Whether any live cookie named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        !self.entries(name).is_empty()
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_header(&self) -> String {
        let Some(origin) = &self.origin else {
            return String::new();
        };
        self.lock()
            .get_request_values(origin)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, cookie: &SetCookie) {
        let Some(origin) = &self.origin else {
            return;
        };
        let removal = cookie.is_removal_at(Utc::now());
        match self.lock().insert_raw(&cookie.to_cookie(), origin) {
            Ok(action) => debug!(cookie = %cookie.name, ?action, "cookie written"),
            // Expiring a cookie that is not stored is a no-op in a browser too.
            Err(_) if removal => {}
            Err(err) => warn!(cookie = %cookie.name, error = %err, "cookie write rejected"),
        }
    }
}
