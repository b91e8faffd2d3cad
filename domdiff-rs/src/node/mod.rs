//! Node structures for XML tree representation.
//!
//! Parsed documents are trees of reference-counted nodes. Children are owned
//! by their parent, parents are referenced weakly so that related nodes can be
//! reached with relative paths such as `../prices/price`.

mod xml_content;

pub use xml_content::{ContentDigest, XmlComment, XmlContent, XmlElement, XmlText};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique node ID.
fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reference-counted pointer to a node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// A weak reference to a node, used for parent links.
pub type WeakNodeRef = Weak<RefCell<NodeInner>>;

/// An ordered sequence of comparable top-level nodes taken from one document.
///
/// Parent links are weak, so the document root must stay alive for as long
/// as paths are resolved upwards from the nodes of a forest. Paths that climb
/// past a dropped parent fail with [`crate::Error::DetachedNode`].
pub type Forest = Vec<NodeRef>;

/// Creates a new node reference.
pub fn new_node_ref(inner: NodeInner) -> NodeRef {
    Rc::new(RefCell::new(inner))
}

/// Creates a new detached node with the given content.
pub fn new_node(content: Option<XmlContent>) -> NodeRef {
    new_node_ref(NodeInner::new(content))
}

/// The inner data of a node in the parse tree.
#[derive(Debug)]
pub struct NodeInner {
    /// Unique identifier for this node.
    id: u64,
    /// Child nodes.
    children: Vec<NodeRef>,
    /// XML content of this node.
    content: Option<XmlContent>,
    /// Weak reference to parent node.
    parent: WeakNodeRef,
    /// Zero-based position among siblings (-1 for root).
    child_pos: i32,
}

impl NodeInner {
    /// Creates a new node with the given content.
    pub fn new(content: Option<XmlContent>) -> Self {
        NodeInner {
            id: next_node_id(),
            children: Vec::new(),
            content,
            parent: Weak::new(),
            child_pos: -1,
        }
    }

    /// Returns the unique ID of this node.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the content of this node.
    pub fn content(&self) -> Option<&XmlContent> {
        self.content.as_ref()
    }

    /// Returns the element, if this is an element node.
    pub fn element(&self) -> Option<&XmlElement> {
        self.content.as_ref().and_then(XmlContent::as_element)
    }

    /// Returns the element name, if this is an element node.
    pub fn name(&self) -> Option<&str> {
        self.element().map(XmlElement::qname)
    }

    /// Returns true if this is an element with the given name.
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns a reference to the child at the given index.
    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.get(index)
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Returns a weak reference to the parent.
    pub fn parent(&self) -> &WeakNodeRef {
        &self.parent
    }

    /// Returns the child position (0-based index among siblings, -1 for root).
    pub fn child_pos(&self) -> i32 {
        self.child_pos
    }

    /// Returns true if this node was attached to a parent that has since
    /// been dropped.
    pub fn is_orphaned(&self) -> bool {
        self.child_pos >= 0 && self.parent.strong_count() == 0
    }

    /// Concatenated text of all text descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.content {
            Some(XmlContent::Text(t)) => out.push_str(t.text()),
            Some(XmlContent::Element(_)) | None => {
                for child in &self.children {
                    child.borrow().collect_text(out);
                }
            }
            Some(XmlContent::Comment(_)) => {}
        }
    }
}

/// Helper functions that work with NodeRef.
impl NodeInner {
    /// Adds a child node. Must be called on the NodeRef wrapper.
    pub fn add_child_to_ref(parent_ref: &NodeRef, child_ref: NodeRef) {
        {
            let mut child = child_ref.borrow_mut();
            child.parent = Rc::downgrade(parent_ref);
            child.child_pos = parent_ref.borrow().children.len() as i32;
        }
        parent_ref.borrow_mut().children.push(child_ref);
    }

    /// Returns the parent of a node, if it is still alive.
    pub fn parent_of_ref(node_ref: &NodeRef) -> Option<NodeRef> {
        node_ref.borrow().parent.upgrade()
    }

    /// Walks up the parent chain and returns the topmost node.
    pub fn root_of_ref(node_ref: &NodeRef) -> NodeRef {
        let mut current = Rc::clone(node_ref);
        while let Some(parent) = Self::parent_of_ref(&current) {
            current = parent;
        }
        current
    }
}
