//! Window globals - script injection, the vendor command queue and page-global flags.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A `<script>` element appended to the document head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTag {
    pub src: String,
    #[serde(rename = "async")]
    pub is_async: bool,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            is_async: false,
        }
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// The parts of `window` a third-party script is driven through.
pub trait ScriptHost: Send + Sync {
    /// Append a script tag to the document head.
    fn append_script(&self, tag: ScriptTag);

    /// Push one command (its argument list) onto the `dataLayer` queue.
    fn push_command(&self, arguments: Vec<Value>);

    /// Set a page-global boolean (e.g. a vendor opt-out marker).
    fn set_global_flag(&self, name: &str, value: bool);

    fn global_flag(&self, name: &str) -> Option<bool>;
}

#[derive(Debug, Default)]
struct WindowState {
    head_scripts: Vec<ScriptTag>,
    data_layer: Vec<Vec<Value>>,
    flags: HashMap<String, bool>,
}

/// Headless window.
#[derive(Debug, Default)]
pub struct Window {
    state: Mutex<WindowState>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scripts appended to the head, in order.
    pub fn scripts(&self) -> Vec<ScriptTag> {
        self.lock().head_scripts.clone()
    }

    /// Commands pushed onto the `dataLayer`, in order.
    pub fn data_layer(&self) -> Vec<Vec<Value>> {
        self.lock().data_layer.clone()
    }
}

impl ScriptHost for Window {
    fn append_script(&self, tag: ScriptTag) {
        self.lock().head_scripts.push(tag);
    }

    fn push_command(&self, arguments: Vec<Value>) {
        self.lock().data_layer.push(arguments);
    }

    fn set_global_flag(&self, name: &str, value: bool) {
        self.lock().flags.insert(name.to_string(), value);
    }

    fn global_flag(&self, name: &str) -> Option<bool> {
        self.lock().flags.get(name).copied()
    }
}
