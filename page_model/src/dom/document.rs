//! Headless document - an in-memory element tree implementing [`ElementAccess`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::{scan_markup, ElementAccess, ElementId, NodeId};

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    checked: bool,
    children: Vec<NodeId>,
    inner_html: String,
}

impl Node {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            checked: false,
            children: Vec::new(),
            inner_html: String::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Node storage. Slots of replaced elements go on the free list and are
/// reused under a new generation.
#[derive(Debug)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Arena {
    fn with_root(root: Node) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
        }
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Drop every descendant of `id` and recycle their slots.
    fn remove_descendants(&mut self, id: NodeId) -> usize {
        let mut pending = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return 0,
        };
        let mut removed = 0;
        while let Some(child) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(child.index)
                .filter(|slot| slot.generation == child.generation)
            else {
                continue;
            };
            if let Some(mut node) = slot.node.take() {
                pending.append(&mut node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(child.index);
            removed += 1;
        }
        removed
    }

    fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Live nodes in document order (pre-order from `from`).
    fn document_order(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }
}

/// In-memory page document.
///
/// The root is a `body` element. Markup assigned through `set_inner_html` is
/// scanned so that elements inside injected fragments become addressable.
#[derive(Debug)]
pub struct Document {
    arena: Mutex<Arena>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    const BODY: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            arena: Mutex::new(Arena::with_root(Node::new("body"))),
        }
    }

    /// Create a document whose body contains `html`.
    pub fn from_html(html: &str) -> Self {
        let document = Self::new();
        document.set_inner_html(document.body(), html);
        document
    }

    /// Handle of the root `body` element.
    pub fn body(&self) -> NodeId {
        Self::BODY
    }

    /// Tag name of an attached element.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.tag.clone())
    }

    /// Number of attached elements, including the body.
    pub fn element_count(&self) -> usize {
        self.lock().live()
    }

    /// Storage slots held, live or free.
    pub fn slot_count(&self) -> usize {
        self.lock().slots.len()
    }

    fn lock(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_node<T>(&self, node: NodeId, f: impl FnOnce(&Node) -> T) -> Option<T> {
        self.lock().get(node).map(f)
    }

    fn with_node_mut<T>(&self, node: NodeId, f: impl FnOnce(&mut Node) -> T) -> Option<T> {
        self.lock().get_mut(node).map(f)
    }
}

impl ElementAccess for Document {
    fn get_element_by_id(&self, id: &ElementId) -> Option<NodeId> {
        let arena = self.lock();
        arena.document_order(Self::BODY).into_iter().find(|n| {
            arena
                .get(*n)
                .and_then(|node| node.attributes.get("id"))
                .is_some_and(|value| value == id.as_str())
        })
    }

    fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        let arena = self.lock();
        arena
            .document_order(Self::BODY)
            .into_iter()
            .filter(|n| {
                arena
                    .get(*n)
                    .is_some_and(|node| node.classes.iter().any(|c| c == class))
            })
            .collect()
    }

    fn descendants_by_tag(&self, ancestor: NodeId, tag: &str) -> Vec<NodeId> {
        let arena = self.lock();
        let tag = tag.to_ascii_lowercase();
        arena
            .document_order(ancestor)
            .into_iter()
            .skip(1)
            .filter(|n| arena.get(*n).is_some_and(|node| node.tag == tag))
            .collect()
    }

    fn inner_html(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.inner_html.clone())
    }

    fn set_inner_html(&self, node: NodeId, html: &str) -> bool {
        let mut arena = self.lock();
        let Some(target) = arena.get_mut(node) else {
            warn!(?node, "set_inner_html on a detached element ignored");
            return false;
        };
        target.inner_html = html.to_string();

        let removed = arena.remove_descendants(node);
        let mut ids: Vec<NodeId> = Vec::new();
        for element in scan_markup(html) {
            let parent = element
                .parent
                .and_then(|p| ids.get(p).copied())
                .unwrap_or(node);

            let mut child = Node::new(element.tag.clone());
            child.classes = element.classes().map(str::to_string).collect();
            child.checked = element.attributes.contains_key("checked");
            child.inner_html = element.inner_html;
            child.attributes = element.attributes;

            let id = arena.insert(child);
            if let Some(parent) = arena.get_mut(parent) {
                parent.children.push(id);
            }
            ids.push(id);
        }
        debug!(?node, removed, added = ids.len(), "element content replaced");
        true
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |n| n.attributes.get(name).cloned())
            .flatten()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.with_node(node, |n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn add_class(&self, node: NodeId, class: &str) {
        self.with_node_mut(node, |n| {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        });
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        self.with_node_mut(node, |n| n.classes.retain(|c| c != class));
    }

    fn toggle_class(&self, node: NodeId, class: &str) -> bool {
        self.with_node_mut(node, |n| {
            if let Some(pos) = n.classes.iter().position(|c| c == class) {
                n.classes.remove(pos);
                false
            } else {
                n.classes.push(class.to_string());
                true
            }
        })
        .unwrap_or(false)
    }

    fn is_checked(&self, node: NodeId) -> Option<bool> {
        self.with_node(node, |n| n.checked)
    }

    fn set_checked(&self, node: NodeId, checked: bool) {
        self.with_node_mut(node, |n| n.checked = checked);
    }
}
