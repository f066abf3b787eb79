//! Page bootstrap - wires consent, fragments and their dependents together.

use page_model::{
    CookieJar, DocumentLifecycle, ElementAccess, FragmentDescriptor, HeadlessPage, PageLocation,
    ScriptHost, SiteConfig,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::consent::{AnalyticsLoader, ConsentController, ConsentStore};
use crate::fragments::{FragmentFetcher, FragmentLoader, LoadReport, ReadinessSignal};
use crate::navigation::NavigationBinder;

/// The capabilities of the page the shell runs on.
#[derive(Clone)]
pub struct PageCapabilities {
    pub elements: Arc<dyn ElementAccess>,
    pub cookies: Arc<dyn CookieJar>,
    pub scripts: Arc<dyn ScriptHost>,
    pub lifecycle: Arc<DocumentLifecycle>,
    pub location: PageLocation,
}

impl From<&HeadlessPage> for PageCapabilities {
    fn from(page: &HeadlessPage) -> Self {
        Self {
            elements: page.document.clone(),
            cookies: page.cookies.clone(),
            scripts: page.window.clone(),
            lifecycle: page.lifecycle.clone(),
            location: page.location.clone(),
        }
    }
}

/// One page load's worth of site behavior.
pub struct SiteShell {
    fragments: Vec<FragmentDescriptor>,
    lifecycle: Arc<DocumentLifecycle>,
    loader: FragmentLoader,
    consent: ConsentController,
    navigation: Arc<NavigationBinder>,
    readiness: ReadinessSignal,
}

impl SiteShell {
    pub fn new(
        config: SiteConfig,
        page: PageCapabilities,
        fetcher: Arc<dyn FragmentFetcher>,
    ) -> Self {
        let analytics = Arc::new(AnalyticsLoader::new(
            page.scripts,
            page.cookies.clone(),
            page.location.clone(),
            config.analytics,
        ));
        let store = ConsentStore::new(page.cookies, &config.consent);
        let consent =
            ConsentController::new(page.elements.clone(), store, analytics, config.elements);
        let navigation = Arc::new(NavigationBinder::new(
            page.elements.clone(),
            page.location,
            config.navigation,
        ));

        Self {
            fragments: config.fragments,
            lifecycle: page.lifecycle,
            loader: FragmentLoader::new(fetcher, page.elements),
            consent,
            navigation,
            readiness: ReadinessSignal::new(),
        }
    }

    /// The signal fired once every configured fragment has settled.
    pub fn readiness(&self) -> &ReadinessSignal {
        &self.readiness
    }

    pub fn consent(&self) -> &ConsentController {
        &self.consent
    }

    pub fn consent_mut(&mut self) -> &mut ConsentController {
        &mut self.consent
    }

    pub fn navigation(&self) -> &Arc<NavigationBinder> {
        &self.navigation
    }

    /// Run the page bootstrap.
    ///
    /// Consent is applied before anything waits, since the banner may be part
    /// of the base page. Fragments load once the document structure is ready,
    /// and consent controls that arrived inside them are bound afterwards.
    pub async fn boot(&mut self) -> Arc<LoadReport> {
        self.consent.init();

        self.lifecycle.interactive().await;
        debug!(fragments = self.fragments.len(), "document interactive; loading fragments");

        let report = self.loader.load_all(&self.fragments, &self.readiness).await;

        let bound = self.consent.bind();
        info!(
            cycle = %report.cycle,
            consent = ?self.consent.state(),
            late_controls = bound,
            "site shell booted"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::ConsentState;
    use crate::fragments::MemoryFetcher;
    use page_model::ElementId;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const BASE_PAGE: &str = r#"<div id="navigation-container"></div><main id="content"></main><div id="footer-container"></div>"#;

    const NAV: &str = r#"<nav><button class="nav-toggle">Menu</button><ul class="nav-menu"><li><a id="home-link" data-page="index">Home</a></li></ul></nav>"#;

    const FOOTER_WITH_CONSENT: &str = r#"
        <footer><button id="footer-cookie-settings">Cookie settings</button></footer>
        <div id="cookie-banner">
          <button id="accept-cookies">Accept all</button>
          <button id="reject-cookies">Reject non-essential</button>
          <button id="manage-cookies">Manage</button>
        </div>
        <div id="cookie-modal">
          <button id="close-modal">x</button>
          <input type="checkbox" id="analytics-cookies">
          <button id="save-preferences">Save</button>
        </div>
    "#;

    fn page() -> HeadlessPage {
        HeadlessPage::new(BASE_PAGE, PageLocation::new("example.com", "/index.html"))
    }

    fn fetcher() -> Arc<MemoryFetcher> {
        Arc::new(
            MemoryFetcher::new()
                .with_fragment("components/navigation.html", NAV)
                .with_fragment("components/footer.html", FOOTER_WITH_CONSENT),
        )
    }

    fn build_shell(page: &HeadlessPage, fetcher: Arc<MemoryFetcher>) -> SiteShell {
        SiteShell::new(SiteConfig::default(), PageCapabilities::from(page), fetcher)
    }

    fn exists(page: &HeadlessPage, id: &str) -> bool {
        page.document.exists(&ElementId::from(id))
    }

    #[tokio::test]
    async fn test_boot_loads_navigation_and_footer() {
        let page = page();
        page.finish_parsing();
        let mut shell = build_shell(&page, fetcher());
        let mut subscriber = shell.readiness().subscribe();

        let document = page.document.clone();
        let observer = async move {
            subscriber.wait().await;
            (
                document.exists(&ElementId::from("home-link")),
                document.exists(&ElementId::from("footer-cookie-settings")),
            )
        };
        let (report, seen) = tokio::join!(shell.boot(), observer);

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(seen, (true, true));
        assert!(shell.readiness().is_ready());
    }

    #[tokio::test]
    async fn test_consent_ui_inside_fragment_is_bound() {
        let page = page();
        page.finish_parsing();
        let mut shell = build_shell(&page, fetcher());

        shell.boot().await;

        assert_eq!(shell.consent().state(), ConsentState::BannerVisible);
        let banner = page
            .document
            .get_element_by_id(&ElementId::from("cookie-banner"))
            .unwrap();
        assert!(page.document.has_class(banner, "show"));

        assert!(shell
            .consent_mut()
            .dispatch_click(&ElementId::from("accept-cookies")));
        assert_eq!(shell.consent().state(), ConsentState::Granted);
        assert_eq!(page.window.scripts().len(), 1);
        assert!(!page.document.has_class(banner, "show"));
    }

    #[tokio::test]
    async fn test_failed_fragment_still_signals() {
        let page = page();
        page.finish_parsing();
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_fragment("components/navigation.html", NAV)
                .with_failure("components/footer.html", "connection reset"),
        );
        let mut shell = build_shell(&page, fetcher);

        let report = shell.boot().await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(shell.readiness().is_ready());
        assert!(exists(&page, "home-link"));
        // No consent UI arrived; the controller still holds a valid state.
        assert_eq!(shell.consent().state(), ConsentState::BannerVisible);
        assert!(shell.consent().wired_controls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_waits_for_interactive() {
        let page = page();
        let fetcher = fetcher();
        let mut shell = build_shell(&page, fetcher.clone());

        let parser = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let requested_early = fetcher.requests().len();
            page.finish_parsing();
            requested_early
        };
        let (report, requested_early) = tokio::join!(shell.boot(), parser);

        assert_eq!(requested_early, 0);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_waits_for_fragments() {
        let page = page();
        page.finish_parsing();
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_fragment("components/navigation.html", NAV)
                .with_fragment("components/footer.html", FOOTER_WITH_CONSENT)
                .with_delay("components/navigation.html", Duration::from_millis(500)),
        );
        let mut shell = build_shell(&page, fetcher);
        let navigation = Arc::clone(shell.navigation());
        let subscriber = shell.readiness().subscribe();

        let (_, wired) = tokio::join!(shell.boot(), navigation.run(subscriber));

        assert!(wired);
        let link = page
            .document
            .get_element_by_id(&ElementId::from("home-link"))
            .unwrap();
        assert!(page.document.has_class(link, "active"));

        let toggle = page.document.elements_by_class("nav-toggle")[0];
        let menu = page.document.elements_by_class("nav-menu")[0];
        assert!(navigation.dispatch_click(toggle));
        assert!(page.document.has_class(menu, "active"));
    }

    #[tokio::test]
    async fn test_stored_rejection_carries_to_next_page() {
        let first = page();
        first.finish_parsing();
        let mut shell = build_shell(&first, fetcher());
        shell.boot().await;
        shell
            .consent_mut()
            .dispatch_click(&ElementId::from("reject-cookies"));
        assert_eq!(shell.consent().state(), ConsentState::Denied);

        let second = first.reload(BASE_PAGE);
        second.finish_parsing();
        let mut shell = build_shell(&second, fetcher());
        shell.boot().await;

        assert_eq!(shell.consent().state(), ConsentState::Denied);
        assert!(second.window.scripts().is_empty());
        let banner = second
            .document
            .get_element_by_id(&ElementId::from("cookie-banner"))
            .unwrap();
        assert!(!second.document.has_class(banner, "show"));
        assert_eq!(second.window.global_flag("ga-disable-G-SR788XPCHG"), None);
    }
}
