//! Page location.

use serde::{Deserialize, Serialize};
use url::Url;

/// The parts of `window.location` the site shell reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub hostname: String,
    pub pathname: String,
}

impl Default for PageLocation {
    fn default() -> Self {
        Self::new("localhost", "/")
    }
}

impl PageLocation {
    pub fn new(hostname: impl Into<String>, pathname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            pathname: pathname.into(),
        }
    }

    /// Page name used for active-link marking: the last path segment without
    /// `.html`, or `index` for a directory path.
    pub fn page_name(&self) -> &str {
        let last = self.pathname.rsplit('/').next().unwrap_or_default();
        let name = last.strip_suffix(".html").unwrap_or(last);
        if name.is_empty() {
            "index"
        } else {
            name
        }
    }

    /// The page's address, as cookie storage sees it.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let path = if self.pathname.starts_with('/') { "" } else { "/" };
        Url::parse(&format!("https://{}{path}{}", self.hostname, self.pathname))
    }

    /// Parent-domain cookie scope for this host (`.example.com`).
    pub fn cookie_domain(&self) -> String {
        format!(".{}", self.hostname)
    }
}
