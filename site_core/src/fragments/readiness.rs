//! Readiness signal - fires once, after every fragment of a load cycle has settled.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use super::LoadReport;

/// Single-fire notification carrying the [`LoadReport`] of a load cycle.
///
/// The first publish wins and is cached: subscribers that arrive afterwards
/// see the completed state immediately. There may be no subscribers at all.
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: watch::Sender<Option<Arc<LoadReport>>>,
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publish the report. Returns `false` if the signal had already fired,
    /// in which case the earlier report is kept.
    pub fn publish(&self, report: Arc<LoadReport>) -> bool {
        let mut pending = Some(report);
        let published = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = pending.take();
            true
        });
        if let Some(ignored) = pending {
            warn!(cycle = %ignored.cycle, "readiness signal already fired; ignoring repeated publish");
        }
        published
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The cached report, if the signal has fired.
    pub fn report(&self) -> Option<Arc<LoadReport>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> ReadinessSubscriber {
        ReadinessSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

/// A dependent waiting for fragments to be in place.
#[derive(Debug, Clone)]
pub struct ReadinessSubscriber {
    rx: watch::Receiver<Option<Arc<LoadReport>>>,
}

impl ReadinessSubscriber {
    /// Wait for the signal. Resolves immediately if it already fired.
    ///
    /// Returns `None` only if the signal was dropped without ever firing.
    pub async fn wait(&mut self) -> Option<Arc<LoadReport>> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(report) => report.clone(),
            Err(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::LoadCycleId;
    use std::time::Duration;

    fn empty_report() -> Arc<LoadReport> {
        Arc::new(LoadReport::new(LoadCycleId::new(), Vec::new()))
    }

    #[test]
    fn test_first_publish_wins() {
        let signal = ReadinessSignal::new();
        let first = empty_report();
        let first_cycle = first.cycle;

        assert!(!signal.is_ready());
        assert!(signal.publish(first));
        assert!(!signal.publish(empty_report()));

        assert!(signal.is_ready());
        assert_eq!(signal.report().map(|r| r.cycle), Some(first_cycle));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_cached_state() {
        let signal = ReadinessSignal::new();
        signal.publish(empty_report());

        let mut late = signal.subscribe();
        assert!(late.is_ready());
        assert!(late.wait().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_wake_on_publish() {
        let signal = ReadinessSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        let publisher = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            signal.publish(empty_report());
        };
        let (ra, rb, ()) = tokio::join!(a.wait(), b.wait(), publisher);

        assert!(ra.is_some());
        assert!(rb.is_some());
    }

    #[tokio::test]
    async fn test_dropped_signal_releases_waiters() {
        let signal = ReadinessSignal::new();
        let mut subscriber = signal.subscribe();
        drop(signal);

        assert!(subscriber.wait().await.is_none());
    }
}
