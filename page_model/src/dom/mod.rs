//! DOM access - the capability components use to read and write page elements.
//!
//! Components never reach for a global document. They receive an
//! [`ElementAccess`] and address elements through [`NodeId`] handles obtained
//! from lookups. The headless [`Document`] implements the capability in memory.

mod document;
mod markup;

pub use document::*;
pub use markup::*;

use serde::{Deserialize, Serialize};

/// Value of an element's `id` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an element node.
///
/// A handle whose element was replaced by a later `set_inner_html` on an
/// ancestor is stale: lookups through it return `None`/`false` and writes
/// through it are ignored, even after its storage slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Read/write access to page elements.
pub trait ElementAccess: Send + Sync {
    /// Find the attached element with the given `id`.
    fn get_element_by_id(&self, id: &ElementId) -> Option<NodeId>;

    /// All attached elements carrying `class`, in document order.
    fn elements_by_class(&self, class: &str) -> Vec<NodeId>;

    /// Attached descendants of `ancestor` with the given tag name, in document order.
    fn descendants_by_tag(&self, ancestor: NodeId, tag: &str) -> Vec<NodeId>;

    /// The markup last assigned to this element.
    fn inner_html(&self, node: NodeId) -> Option<String>;

    /// Replace the element's content with `html`, verbatim.
    ///
    /// Returns `false` if the handle is detached.
    fn set_inner_html(&self, node: NodeId, html: &str) -> bool;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&self, node: NodeId, class: &str);

    fn remove_class(&self, node: NodeId, class: &str);

    /// Flip `class` and return whether it is now present.
    fn toggle_class(&self, node: NodeId, class: &str) -> bool;

    /// Checked state of a checkbox-like element.
    fn is_checked(&self, node: NodeId) -> Option<bool>;

    fn set_checked(&self, node: NodeId, checked: bool);

    /// Convenience: look up by id and test for presence.
    fn exists(&self, id: &ElementId) -> bool {
        self.get_element_by_id(id).is_some()
    }
}
