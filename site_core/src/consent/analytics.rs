//! Analytics loader - injects or neutralizes the third-party tracking script.

use chrono::{DateTime, SecondsFormat, Utc};
use page_model::{AnalyticsConfig, CookieJar, PageLocation, ScriptHost, ScriptTag, SetCookie};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Whether the tracking script has been requested during this page's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnalyticsLoadState {
    #[default]
    NotLoaded,
    Loaded,
}

/// A command for the vendor's `dataLayer` queue.
#[derive(Debug, Clone, PartialEq)]
pub enum GtagCommand {
    /// `gtag('js', <date>)`
    Js(DateTime<Utc>),
    /// `gtag('config', <id>, <params>)`
    Config {
        measurement_id: String,
        params: Value,
    },
}

impl GtagCommand {
    /// The argument list pushed onto the queue.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            GtagCommand::Js(at) => vec![
                json!("js"),
                json!(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ],
            GtagCommand::Config {
                measurement_id,
                params,
            } => vec![json!("config"), json!(measurement_id), params.clone()],
        }
    }
}

/// Owns the script-loaded state and drives the vendor through the page's
/// [`ScriptHost`]. Both operations are idempotent.
pub struct AnalyticsLoader {
    host: Arc<dyn ScriptHost>,
    jar: Arc<dyn CookieJar>,
    location: PageLocation,
    config: AnalyticsConfig,
    state: Mutex<AnalyticsLoadState>,
}

impl AnalyticsLoader {
    pub fn new(
        host: Arc<dyn ScriptHost>,
        jar: Arc<dyn CookieJar>,
        location: PageLocation,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            host,
            jar,
            location,
            config,
            state: Mutex::new(AnalyticsLoadState::NotLoaded),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AnalyticsLoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> AnalyticsLoadState {
        *self.lock_state()
    }

    /// Whether the vendor's opt-out marker is currently set on the page.
    pub fn is_opted_out(&self) -> bool {
        self.host
            .global_flag(&self.config.opt_out_flag())
            .unwrap_or(false)
    }

    /// Inject the tracking script and configure it, once per page.
    pub fn enable(&self) {
        let mut state = self.lock_state();
        if *state == AnalyticsLoadState::Loaded {
            debug!("analytics already loaded");
            return;
        }

        // A reject earlier on this page must not keep a later grant inert.
        if self.is_opted_out() {
            self.host.set_global_flag(&self.config.opt_out_flag(), false);
        }

        self.host
            .append_script(ScriptTag::new(self.config.script_url()).with_async(true));
        self.host
            .push_command(GtagCommand::Js(Utc::now()).arguments());
        self.host.push_command(
            GtagCommand::Config {
                measurement_id: self.config.measurement_id.clone(),
                params: json!({
                    "anonymize_ip": self.config.anonymize_ip,
                    "cookie_flags": self.config.cookie_flags,
                }),
            }
            .arguments(),
        );

        *state = AnalyticsLoadState::Loaded;
        info!(measurement_id = %self.config.measurement_id, "analytics loaded");
    }

    /// Opt out through the vendor's own flag and purge its cookies.
    ///
    /// An already injected script stays in the document; the load state is
    /// left unchanged.
    pub fn disable(&self) {
        self.host.set_global_flag(&self.config.opt_out_flag(), true);

        let domain = self.location.cookie_domain();
        for name in &self.config.vendor_cookies {
            self.jar.set_cookie(&SetCookie::expired(name).with_path("/"));
            self.jar
                .set_cookie(&SetCookie::expired(name).with_path("/").with_domain(&domain));
        }
        info!(measurement_id = %self.config.measurement_id, "analytics disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_model::{MemoryCookieJar, Window};
    use pretty_assertions::assert_eq;

    fn loader() -> (Arc<Window>, Arc<MemoryCookieJar>, AnalyticsLoader) {
        let window = Arc::new(Window::new());
        let location = PageLocation::new("example.com", "/");
        let jar = Arc::new(MemoryCookieJar::for_location(&location));
        let config = AnalyticsConfig {
            measurement_id: "G-TEST".to_string(),
            ..AnalyticsConfig::default()
        };
        let loader = AnalyticsLoader::new(
            window.clone(),
            jar.clone(),
            location,
            config,
        );
        (window, jar, loader)
    }

    #[test]
    fn test_enable_injects_and_configures() {
        let (window, _, loader) = loader();
        assert_eq!(loader.state(), AnalyticsLoadState::NotLoaded);

        loader.enable();

        assert_eq!(loader.state(), AnalyticsLoadState::Loaded);
        assert_eq!(
            window.scripts(),
            vec![ScriptTag::new("https://www.googletagmanager.com/gtag/js?id=G-TEST").with_async(true)]
        );
        let commands = window.data_layer();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0][0], json!("js"));
        assert_eq!(
            commands[1],
            vec![
                json!("config"),
                json!("G-TEST"),
                json!({"anonymize_ip": true, "cookie_flags": "SameSite=Lax;Secure"}),
            ]
        );
    }

    #[test]
    fn test_enable_is_idempotent() {
        let (window, _, loader) = loader();

        loader.enable();
        loader.enable();

        assert_eq!(window.scripts().len(), 1);
        let configs = window
            .data_layer()
            .iter()
            .filter(|args| args.first() == Some(&json!("config")))
            .count();
        assert_eq!(configs, 1);
    }

    #[test]
    fn test_disable_purges_vendor_cookies() {
        let (window, jar, loader) = loader();
        for name in ["_ga", "_gid", "_gat"] {
            jar.set_cookie(&SetCookie::new(name, "GA1.1.1").with_path("/"));
            jar.set_cookie(
                &SetCookie::new(name, "GA1.1.2")
                    .with_path("/")
                    .with_domain(".example.com"),
            );
        }
        jar.set_cookie(&SetCookie::new("cookie_consent", "{}").with_path("/"));

        loader.disable();

        assert_eq!(window.global_flag("ga-disable-G-TEST"), Some(true));
        assert!(loader.is_opted_out());
        assert_eq!(jar.cookie_header(), "cookie_consent={}");
    }

    #[test]
    fn test_disable_purges_cookie_set_without_leading_dot() {
        let (_, jar, loader) = loader();
        jar.set_cookie(
            &SetCookie::new("_ga", "GA1.1.7")
                .with_path("/")
                .with_domain("example.com"),
        );
        assert!(jar.contains("_ga"));

        loader.disable();

        assert!(!jar.contains("_ga"));
        assert_eq!(jar.cookie_header(), "");
    }

    #[test]
    fn test_disable_keeps_load_state() {
        let (window, _, loader) = loader();
        loader.enable();
        loader.disable();
        loader.disable();

        assert_eq!(loader.state(), AnalyticsLoadState::Loaded);
        assert_eq!(window.scripts().len(), 1);
    }

    #[test]
    fn test_enable_after_disable_clears_opt_out() {
        let (window, _, loader) = loader();
        loader.disable();
        loader.enable();

        assert_eq!(window.global_flag("ga-disable-G-TEST"), Some(false));
        assert_eq!(loader.state(), AnalyticsLoadState::Loaded);
    }
}
