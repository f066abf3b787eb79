//! Document lifecycle - when the page's initial structure is ready.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Mirrors `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    /// Initial structure parsed; scripts may query the DOM.
    Interactive,
    /// All subresources finished.
    Complete,
}

/// Observable ready state of a single page.
#[derive(Debug)]
pub struct DocumentLifecycle {
    tx: watch::Sender<ReadyState>,
}

impl Default for DocumentLifecycle {
    fn default() -> Self {
        Self::new(ReadyState::Loading)
    }
}

impl DocumentLifecycle {
    pub fn new(initial: ReadyState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn state(&self) -> ReadyState {
        *self.tx.borrow()
    }

    /// Advance the ready state. The state never moves backwards.
    pub fn advance(&self, next: ReadyState) {
        self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
    }

    /// Resolve once the structure is ready; immediately if it already is.
    pub async fn interactive(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state >= ReadyState::Interactive).await;
    }
}
