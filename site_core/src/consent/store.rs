//! Consent persistence in cookie storage.

use chrono::{TimeDelta, Utc};
use page_model::{find_cookie, ConsentConfig, CookieJar, SameSite, SetCookie};
use std::sync::Arc;
use tracing::warn;

use super::ConsentDecision;
use crate::error::ConsentError;

/// Reads and writes the consent decision cookie. Pure data access, no UI.
#[derive(Clone)]
pub struct ConsentStore {
    jar: Arc<dyn CookieJar>,
    cookie_name: String,
    retention_days: i64,
    retention: Option<TimeDelta>,
}

impl ConsentStore {
    pub fn new(jar: Arc<dyn CookieJar>, config: &ConsentConfig) -> Self {
        Self {
            jar,
            cookie_name: config.cookie_name.clone(),
            retention_days: config.retention_days,
            retention: config.retention(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Overwrite the stored decision. The cookie is scoped to `/`, sent only on
    /// same-site requests and top-level navigation, and expires after the
    /// retention window.
    pub fn save(&self, decision: &ConsentDecision) -> Result<(), ConsentError> {
        let expires = self
            .retention
            .and_then(|retention| Utc::now().checked_add_signed(retention))
            .ok_or(ConsentError::InvalidRetention {
                days: self.retention_days,
            })?;
        let value = serde_json::to_string(decision).map_err(ConsentError::Serialize)?;
        let cookie = SetCookie::new(&self.cookie_name, value)
            .with_expires(expires)
            .with_path("/")
            .with_same_site(SameSite::Lax);
        self.jar.set_cookie(&cookie);
        Ok(())
    }

    /// The stored decision, or `None` if there is none or it cannot be parsed.
    pub fn load(&self) -> Option<ConsentDecision> {
        let header = self.jar.cookie_header();
        let raw = find_cookie(&header, &self.cookie_name)?;
        if raw.is_empty() {
            return None;
        }
        match parse_decision(&raw) {
            Ok(decision) => Some(decision),
            Err(err) => {
                warn!(cookie = %self.cookie_name, error = %err, "ignoring stored consent decision");
                None
            }
        }
    }
}

fn parse_decision(raw: &str) -> Result<ConsentDecision, ConsentError> {
    serde_json::from_str(raw).map_err(ConsentError::MalformedStoredDecision)
}
