//! A complete headless page: one of each capability, shared behind `Arc`s.

use std::sync::Arc;

use crate::cookies::MemoryCookieJar;
use crate::dom::Document;
use crate::lifecycle::{DocumentLifecycle, ReadyState};
use crate::location::PageLocation;
use crate::window::Window;

/// Everything a single page load owns.
///
/// Cloning shares the same document, window and cookies; use
/// [`HeadlessPage::reload`] to start a new page load over the same cookie jar.
#[derive(Debug, Clone)]
pub struct HeadlessPage {
    pub document: Arc<Document>,
    pub window: Arc<Window>,
    pub cookies: Arc<MemoryCookieJar>,
    pub lifecycle: Arc<DocumentLifecycle>,
    pub location: PageLocation,
}

impl HeadlessPage {
    /// A page whose body is `html`, still in the `Loading` state.
    pub fn new(html: &str, location: PageLocation) -> Self {
        let cookies = Arc::new(MemoryCookieJar::for_location(&location));
        Self::with_cookies(html, location, cookies)
    }

    /// A page sharing an existing cookie jar (the same browser profile).
    pub fn with_cookies(html: &str, location: PageLocation, cookies: Arc<MemoryCookieJar>) -> Self {
        Self {
            document: Arc::new(Document::from_html(html)),
            window: Arc::new(Window::new()),
            cookies,
            lifecycle: Arc::new(DocumentLifecycle::new(ReadyState::Loading)),
            location,
        }
    }

    /// A fresh document and window for `html`, keeping this page's cookies.
    pub fn reload(&self, html: &str) -> Self {
        Self::with_cookies(html, self.location.clone(), Arc::clone(&self.cookies))
    }

    /// Mark the initial structure as parsed.
    pub fn finish_parsing(&self) {
        self.lifecycle.advance(ReadyState::Interactive);
    }
}
