//! Site configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file describes the stock site:
//! navigation and footer fragments, the `cookie_consent` cookie kept for a
//! year, and the standard consent banner/modal element ids.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dom::ElementId;
use crate::error::ConfigError;

/// A fragment path and the container its markup is injected into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentDescriptor {
    pub path: String,
    pub container: ElementId,
}

impl FragmentDescriptor {
    pub fn new(path: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            container: ElementId::new(container),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub fragments: Vec<FragmentDescriptor>,
    pub consent: ConsentConfig,
    pub analytics: AnalyticsConfig,
    pub elements: ConsentElements,
    pub navigation: NavigationConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            fragments: vec![
                FragmentDescriptor::new("components/navigation.html", "navigation-container"),
                FragmentDescriptor::new("components/footer.html", "footer-container"),
            ],
            consent: ConsentConfig::default(),
            analytics: AnalyticsConfig::default(),
            elements: ConsentElements::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        if config.consent.retention().is_none() {
            return Err(ConfigError::InvalidRetention {
                days: config.consent.retention_days,
            });
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Where and how long the consent decision is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub cookie_name: String,
    pub retention_days: i64,
}

impl ConsentConfig {
    /// Browsers cap cookie lifetimes at 400 days (RFC 6265bis).
    pub const MAX_RETENTION_DAYS: i64 = 400;

    /// The retention window, if `retention_days` is within `1..=400`.
    pub fn retention(&self) -> Option<TimeDelta> {
        (1..=Self::MAX_RETENTION_DAYS)
            .contains(&self.retention_days)
            .then(|| TimeDelta::try_days(self.retention_days))
            .flatten()
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            cookie_name: "cookie_consent".to_string(),
            retention_days: 365,
        }
    }
}

/// The third-party analytics vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub measurement_id: String,
    /// Script URL; the measurement id is appended as the `id` query parameter.
    pub script_base: String,
    /// Cookies the vendor sets, purged on opt-out.
    pub vendor_cookies: Vec<String>,
    pub anonymize_ip: bool,
    pub cookie_flags: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            measurement_id: "G-SR788XPCHG".to_string(),
            script_base: "https://www.googletagmanager.com/gtag/js".to_string(),
            vendor_cookies: vec!["_ga".to_string(), "_gat".to_string(), "_gid".to_string()],
            anonymize_ip: true,
            cookie_flags: "SameSite=Lax;Secure".to_string(),
        }
    }
}

impl AnalyticsConfig {
    pub fn script_url(&self) -> String {
        format!("{}?id={}", self.script_base, self.measurement_id)
    }

    /// Name of the page global the vendor runtime checks before tracking.
    pub fn opt_out_flag(&self) -> String {
        format!("ga-disable-{}", self.measurement_id)
    }
}

/// Element ids of the consent UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentElements {
    pub banner: ElementId,
    pub modal: ElementId,
    pub accept: ElementId,
    pub reject: ElementId,
    pub manage: ElementId,
    pub save: ElementId,
    pub close: ElementId,
    pub footer_settings: ElementId,
    pub analytics_toggle: ElementId,
    /// Class that makes the banner or modal visible.
    pub visible_class: String,
}

impl Default for ConsentElements {
    fn default() -> Self {
        Self {
            banner: ElementId::from("cookie-banner"),
            modal: ElementId::from("cookie-modal"),
            accept: ElementId::from("accept-cookies"),
            reject: ElementId::from("reject-cookies"),
            manage: ElementId::from("manage-cookies"),
            save: ElementId::from("save-preferences"),
            close: ElementId::from("close-modal"),
            footer_settings: ElementId::from("footer-cookie-settings"),
            analytics_toggle: ElementId::from("analytics-cookies"),
            visible_class: "show".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub toggle_class: String,
    pub menu_class: String,
    pub active_class: String,
    /// Delay before navigation wiring runs without the readiness signal.
    pub fallback_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            toggle_class: "nav-toggle".to_string(),
            menu_class: "nav-menu".to_string(),
            active_class: "active".to_string(),
            fallback_ms: 200,
        }
    }
}
