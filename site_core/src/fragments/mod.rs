//! Fragment loading - fetch reusable HTML fragments and splice them into their
//! containers before any dependent consumer runs.
//!
//! A load cycle works as follows:
//! 1. **Fetch**: every descriptor is fetched concurrently
//! 2. **Inject**: each successful response replaces its container's content
//! 3. **Settle**: failures are logged; siblings are unaffected
//! 4. **Signal**: once all descriptors settled, the [`LoadReport`] is published
//!    on the page's [`ReadinessSignal`]

mod fetcher;
mod readiness;

pub use fetcher::*;
pub use page_model::FragmentDescriptor;
pub use readiness::*;

use futures::future::join_all;
use page_model::ElementAccess;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::FragmentError;

/// Identifier of one `load_all` invocation, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadCycleId(pub Uuid);

impl LoadCycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LoadCycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LoadCycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of loading one fragment.
#[derive(Debug)]
pub enum FragmentLoadOutcome {
    /// Container found and populated.
    Succeeded,
    Failed(FragmentError),
}

impl FragmentLoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FragmentLoadOutcome::Succeeded)
    }
}

#[derive(Debug)]
pub struct FragmentResult {
    pub descriptor: FragmentDescriptor,
    pub outcome: FragmentLoadOutcome,
}

/// Outcome of every descriptor in a load cycle, in descriptor order.
#[derive(Debug)]
pub struct LoadReport {
    pub cycle: LoadCycleId,
    pub results: Vec<FragmentResult>,
}

impl LoadReport {
    pub fn new(cycle: LoadCycleId, results: Vec<FragmentResult>) -> Self {
        Self { cycle, results }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn outcome(&self, path: &str) -> Option<&FragmentLoadOutcome> {
        self.results
            .iter()
            .find(|r| r.descriptor.path == path)
            .map(|r| &r.outcome)
    }
}

/// Fetches fragments and injects them into their containers.
pub struct FragmentLoader {
    fetcher: Arc<dyn FragmentFetcher>,
    elements: Arc<dyn ElementAccess>,
}

impl FragmentLoader {
    pub fn new(fetcher: Arc<dyn FragmentFetcher>, elements: Arc<dyn ElementAccess>) -> Self {
        Self { fetcher, elements }
    }

    /// Load every descriptor concurrently and publish the report on `signal`
    /// once all of them settled, whether they succeeded or not.
    ///
    /// A signal fires at most once; pass a fresh signal for each cycle that
    /// needs its own notification.
    pub async fn load_all(
        &self,
        descriptors: &[FragmentDescriptor],
        signal: &ReadinessSignal,
    ) -> Arc<LoadReport> {
        let cycle = LoadCycleId::new();
        let span = info_span!("fragment_cycle", %cycle, fragments = descriptors.len());

        let results = join_all(descriptors.iter().map(|descriptor| async move {
            FragmentResult {
                descriptor: descriptor.clone(),
                outcome: self.load_one(descriptor).await,
            }
        }))
        .instrument(span)
        .await;

        let report = Arc::new(LoadReport::new(cycle, results));
        info!(
            %cycle,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "fragments settled"
        );
        signal.publish(Arc::clone(&report));
        report
    }

    async fn load_one(&self, descriptor: &FragmentDescriptor) -> FragmentLoadOutcome {
        match self.try_load(descriptor).await {
            Ok(()) => {
                debug!(path = %descriptor.path, container = %descriptor.container, "fragment injected");
                FragmentLoadOutcome::Succeeded
            }
            Err(err) => {
                error!(
                    path = %descriptor.path,
                    container = %descriptor.container,
                    error = %err,
                    "error loading fragment"
                );
                FragmentLoadOutcome::Failed(err)
            }
        }
    }

    async fn try_load(&self, descriptor: &FragmentDescriptor) -> Result<(), FragmentError> {
        let fetched = self
            .fetcher
            .fetch(&descriptor.path)
            .await
            .map_err(|source| FragmentError::Fetch {
                path: descriptor.path.clone(),
                source,
            })?;

        if !fetched.is_success() {
            return Err(FragmentError::Status {
                path: descriptor.path.clone(),
                status: fetched.status,
            });
        }

        let container = self
            .elements
            .get_element_by_id(&descriptor.container)
            .ok_or_else(|| FragmentError::MissingContainer {
                path: descriptor.path.clone(),
                container: descriptor.container.clone(),
            })?;

        self.elements.set_inner_html(container, &fetched.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_model::{Document, ElementId};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const BASE_PAGE: &str =
        r#"<div id="nav-container"></div><main></main><div id="footer-container"></div>"#;

    fn descriptors() -> Vec<FragmentDescriptor> {
        vec![
            FragmentDescriptor::new("nav.html", "nav-container"),
            FragmentDescriptor::new("footer.html", "footer-container"),
        ]
    }

    fn container_html(doc: &Document, id: &str) -> String {
        doc.get_element_by_id(&ElementId::from(id))
            .and_then(|node| doc.inner_html(node))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_all_fragments_injected() {
        let doc = Arc::new(Document::from_html(BASE_PAGE));
        let fetcher = MemoryFetcher::new()
            .with_fragment("nav.html", r#"<nav><ul class="nav-menu"></ul></nav>"#)
            .with_fragment("footer.html", "<footer>(c)</footer>");
        let loader = FragmentLoader::new(Arc::new(fetcher), doc.clone());
        let signal = ReadinessSignal::new();
        let mut subscriber = signal.subscribe();

        let report = loader.load_all(&descriptors(), &signal).await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 0);
        assert!(signal.is_ready());

        // A dependent woken by the signal sees both containers populated.
        let seen = subscriber.wait().await.unwrap();
        assert_eq!(seen.cycle, report.cycle);
        assert_eq!(
            container_html(&doc, "nav-container"),
            r#"<nav><ul class="nav-menu"></ul></nav>"#
        );
        assert_eq!(container_html(&doc, "footer-container"), "<footer>(c)</footer>");
        assert_eq!(doc.elements_by_class("nav-menu").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_waits_for_slow_fragment_after_fast_failure() {
        let doc = Arc::new(Document::from_html(BASE_PAGE));
        let fetcher = MemoryFetcher::new()
            .with_fragment("nav.html", "<nav></nav>")
            .with_delay("nav.html", Duration::from_millis(100))
            .with_failure("footer.html", "connection refused");
        let loader = FragmentLoader::new(Arc::new(fetcher), doc.clone());
        let signal = ReadinessSignal::new();
        let descriptors = descriptors();

        let observer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            // The footer failed long ago, but the nav fetch is still in flight.
            assert!(!signal.is_ready());
        };
        let (report, ()) = tokio::join!(loader.load_all(&descriptors, &signal), observer);

        assert!(signal.is_ready());
        assert_eq!(report.succeeded(), 1);
        assert!(matches!(
            report.outcome("footer.html"),
            Some(FragmentLoadOutcome::Failed(FragmentError::Fetch { .. }))
        ));
        assert_eq!(container_html(&doc, "nav-container"), "<nav></nav>");
        assert_eq!(container_html(&doc, "footer-container"), "");
    }

    #[tokio::test]
    async fn test_signal_fires_when_everything_fails() {
        let doc = Arc::new(Document::from_html(r#"<div id="nav-container"></div>"#));
        let fetcher = MemoryFetcher::new()
            .with_response(
                "nav.html",
                FetchedFragment {
                    status: 503,
                    body: "unavailable".to_string(),
                },
            )
            .with_fragment("footer.html", "<footer></footer>");
        let loader = FragmentLoader::new(Arc::new(fetcher), doc.clone());
        let signal = ReadinessSignal::new();

        let report = loader.load_all(&descriptors(), &signal).await;

        assert!(signal.is_ready());
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcome("nav.html"),
            Some(FragmentLoadOutcome::Failed(FragmentError::Status { status: 503, .. }))
        ));
        assert!(matches!(
            report.outcome("footer.html"),
            Some(FragmentLoadOutcome::Failed(FragmentError::MissingContainer { .. }))
        ));
        assert_eq!(container_html(&doc, "nav-container"), "");
    }

    #[tokio::test]
    async fn test_empty_descriptor_list_still_signals() {
        let doc = Arc::new(Document::new());
        let loader = FragmentLoader::new(Arc::new(MemoryFetcher::new()), doc);
        let signal = ReadinessSignal::new();

        let report = loader.load_all(&[], &signal).await;

        assert!(report.results.is_empty());
        assert!(signal.is_ready());
    }

    #[tokio::test]
    async fn test_second_cycle_on_same_signal_keeps_first_report() {
        let doc = Arc::new(Document::from_html(BASE_PAGE));
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_fragment("nav.html", "<nav></nav>")
                .with_fragment("footer.html", "<footer></footer>"),
        );
        let loader = FragmentLoader::new(fetcher.clone(), doc);
        let signal = ReadinessSignal::new();

        let first = loader.load_all(&descriptors(), &signal).await;
        let second = loader.load_all(&descriptors(), &signal).await;

        assert_ne!(first.cycle, second.cycle);
        assert_eq!(signal.report().map(|r| r.cycle), Some(first.cycle));
        assert_eq!(fetcher.requests().len(), 4);

        let fresh = ReadinessSignal::new();
        let third = loader.load_all(&descriptors(), &fresh).await;
        assert_eq!(fresh.report().map(|r| r.cycle), Some(third.cycle));
    }
}
