//! Navigation wiring - a readiness consumer.
//!
//! The navigation markup usually arrives in a fragment, so wiring waits for
//! the readiness signal. A fallback timer covers pages where the signal was
//! missed; whichever path finds the menu first wins and the other is a no-op.

use page_model::{ElementAccess, NavigationConfig, NodeId, PageLocation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fragments::ReadinessSubscriber;

pub struct NavigationBinder {
    elements: Arc<dyn ElementAccess>,
    location: PageLocation,
    config: NavigationConfig,
    initialized: AtomicBool,
}

impl NavigationBinder {
    pub fn new(
        elements: Arc<dyn ElementAccess>,
        location: PageLocation,
        config: NavigationConfig,
    ) -> Self {
        Self {
            elements,
            location,
            config,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Wire navigation once fragments are in place, or after the fallback
    /// delay if the signal has not arrived by then. Returns whether the
    /// navigation was wired.
    pub async fn run(&self, mut readiness: ReadinessSubscriber) -> bool {
        let fallback = Duration::from_millis(self.config.fallback_ms);
        let signalled = tokio::select! {
            report = readiness.wait() => report.is_some(),
            () = tokio::time::sleep(fallback) => false,
        };
        if signalled {
            return self.init();
        }

        debug!("readiness signal not seen; running navigation fallback");
        if self.init() {
            return true;
        }
        // The menu is still missing, so its fragment is still loading.
        readiness.wait().await.is_some() && self.init()
    }

    /// Mark the current page's link as active. Returns `false` while the
    /// menu is not in the document; once it succeeds later calls are no-ops.
    pub fn init(&self) -> bool {
        if self.is_initialized() {
            return true;
        }

        let Some(menu) = self.menu() else {
            warn!(menu = %self.config.menu_class, "navigation menu not found");
            return false;
        };
        if self.elements.elements_by_class(&self.config.toggle_class).is_empty() {
            warn!(toggle = %self.config.toggle_class, "navigation toggle not found");
        }

        let page = self.location.page_name();
        for link in self.elements.descendants_by_tag(menu, "a") {
            if self.elements.attribute(link, "data-page").as_deref() == Some(page) {
                self.elements.add_class(link, &self.config.active_class);
            }
        }

        if self.initialized.swap(true, Ordering::AcqRel) {
            return true;
        }
        debug!(page, "navigation initialized");
        true
    }

    /// Handle a click on the mobile menu toggle. Returns whether the menu is
    /// now open, or `None` if navigation is not wired.
    pub fn toggle_menu(&self) -> Option<bool> {
        if !self.is_initialized() {
            return None;
        }
        let menu = self.menu()?;
        Some(self.elements.toggle_class(menu, &self.config.active_class))
    }

    /// Route a click on `target`. A click on a menu toggle opens or closes
    /// the menu; returns `false` if the click was not handled.
    pub fn dispatch_click(&self, target: NodeId) -> bool {
        if !self.elements.has_class(target, &self.config.toggle_class) {
            return false;
        }
        match self.toggle_menu() {
            Some(open) => {
                debug!(open, "navigation menu toggled");
                true
            }
            None => {
                debug!("menu toggle clicked before navigation was wired");
                false
            }
        }
    }

    fn menu(&self) -> Option<NodeId> {
        self.elements
            .elements_by_class(&self.config.menu_class)
            .into_iter()
            .next()
    }
}
