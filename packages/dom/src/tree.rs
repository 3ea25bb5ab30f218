//! # Document Tree
//!
//! Arena-backed XML tree edited by the editor core.
//!
//! Nodes are addressed by [`NodeId`] and are never freed while the document
//! lives. Removing a node only detaches it, so an inverse edit can put the very
//! same node back where it was.
//!
//! ```text
//! #0 document
//! └── #1 <Parent>
//!     └── #2 <Element>
//!         └── #3 <ChildElement a="1"/>
//! ```

use crate::error::DomError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Stable handle to a node in a [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element attribute, optionally namespaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local_name: String,
    pub value: String,
}

impl Attribute {
    /// Name as written in markup (`prefix:local` or `local`)
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        name: String,
        namespace: Option<String>,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
    // Text node reused by every `set_text_content` on this element
    text_slot: Option<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }
}

/// Outcome of [`Document::set_text_content`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReplacement {
    /// Previous children detached by the call, in their former order
    ///
    /// Empty when the element held nothing but its own text slot.
    pub removed: Vec<NodeId>,

    /// Text node now holding the content (none for empty text)
    pub text_node: Option<NodeId>,

    /// Text node whose data was overwritten, with its previous data
    pub overwritten: Option<(NodeId, String)>,
}

/// In-memory XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

/// Split `prefix:local` into its parts
pub fn split_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

impl Document {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
                text_slot: None,
            }],
        }
    }

    /// The document node (tree root)
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// First element child of the document node
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_element().is_none()
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
            text_slot: None,
        });
        id
    }

    /// Allocate a detached element without a namespace
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Element {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
        })
    }

    /// Allocate a detached element in `namespace`
    pub fn create_element_ns(&mut self, namespace: Option<String>, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Element {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
        })
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node_or_err(&self, id: NodeId) -> Result<&Node, DomError> {
        self.node(id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Whether the ancestor chain of `id` reaches the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).map(|n| &n.data),
            Some(NodeData::Element { .. })
        )
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// Qualified element name
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { namespace, .. }) => namespace.as_deref(),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Attribute without a namespace
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_ns(id, None, name)
    }

    /// Attribute lookup by namespace and local name
    pub fn attribute_ns(&self, id: NodeId, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.namespace.as_deref() == namespace && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(_) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// Pre-order iterator over `id` and all of its descendants
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: if self.contains(id) { vec![id] } else { Vec::new() },
        }
    }

    /// Attached elements named `name`, in document order
    pub fn elements_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(self.root())
            .filter(move |id| self.name(*id) == Some(name))
    }

    /// Insert `node` under `parent` before `reference` (append when `None`)
    ///
    /// A node that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_node = self.node_or_err(parent)?;
        if matches!(parent_node.data, NodeData::Text(_)) {
            return Err(DomError::CannotHaveChildren(parent));
        }
        self.node_or_err(node)?;
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::CycleDetected { parent, node });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, node: reference });
            }
        }

        let reference = match reference {
            Some(r) if r == node => self.next_sibling(node),
            other => other,
        };

        self.detach(node)?;

        let children = &mut self.nodes[parent.index()].children;
        let index = match reference {
            Some(r) => children.iter().position(|c| *c == r).unwrap_or(children.len()),
            None => children.len(),
        };
        children.insert(index, node);
        self.nodes[node.index()].parent = Some(parent);
        Ok(())
    }

    /// Detach `node` from its parent (no-op for parentless nodes)
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let parent = self.node_or_err(node)?.parent;
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.retain(|c| *c != node);
            self.nodes[node.index()].parent = None;
        }
        Ok(())
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut Vec<Attribute>, DomError> {
        match self.nodes.get_mut(id.index()).map(|n| &mut n.data) {
            Some(NodeData::Element { attributes, .. }) => Ok(attributes),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::NodeNotFound(id)),
        }
    }

    /// Set (`Some`) or remove (`None`) a plain attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> Result<(), DomError> {
        self.set_attribute_ns(id, None, name, value)
    }

    /// Set or remove a namespaced attribute addressed by qualified name
    pub fn set_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        qualified_name: &str,
        value: Option<&str>,
    ) -> Result<(), DomError> {
        let (prefix, local_name) = match namespace {
            Some(_) => split_qualified_name(qualified_name),
            None => (None, qualified_name),
        };
        let attributes = self.attributes_mut(id)?;
        let existing = attributes
            .iter()
            .position(|a| a.namespace.as_deref() == namespace && a.local_name == local_name);

        match (existing, value) {
            (Some(pos), Some(value)) => attributes[pos].value = value.to_string(),
            (Some(pos), None) => {
                attributes.remove(pos);
            }
            (None, Some(value)) => attributes.push(Attribute {
                namespace: namespace.map(str::to_string),
                prefix: prefix.map(str::to_string),
                local_name: local_name.to_string(),
                value: value.to_string(),
            }),
            (None, None) => {}
        }
        Ok(())
    }

    /// Replace the content of `id` with `text`
    ///
    /// On a text node the data is replaced in place. On an element every child
    /// is detached and the element's text slot is attached holding `text`. The
    /// slot is one text node per element, reused by every call, so repeating
    /// the same replacement always yields the same node identities.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<TextReplacement, DomError> {
        match self.node(id).map(|n| &n.data) {
            None => return Err(DomError::NodeNotFound(id)),
            Some(NodeData::Document) => return Err(DomError::NotAnElement(id)),
            Some(NodeData::Text(previous)) => {
                let previous = previous.clone();
                self.nodes[id.index()].data = NodeData::Text(text.to_string());
                return Ok(TextReplacement {
                    removed: Vec::new(),
                    text_node: Some(id),
                    overwritten: Some((id, previous)),
                });
            }
            Some(NodeData::Element { .. }) => {}
        }

        let slot = match self.reusable_text_slot(id) {
            Some(slot) => slot,
            None => self.create_text(""),
        };
        self.nodes[id.index()].text_slot = Some(slot);

        let previous = std::mem::take(&mut self.nodes[id.index()].children);
        for child in &previous {
            self.nodes[child.index()].parent = None;
        }
        let removed = if previous == [slot] { Vec::new() } else { previous };

        let overwritten = match &mut self.nodes[slot.index()].data {
            NodeData::Text(data) if data != text => {
                Some((slot, std::mem::replace(data, text.to_string())))
            }
            _ => None,
        };

        let text_node = if text.is_empty() {
            None
        } else {
            self.nodes[slot.index()].parent = Some(id);
            self.nodes[id.index()].children.push(slot);
            Some(slot)
        };

        Ok(TextReplacement {
            removed,
            text_node,
            overwritten,
        })
    }

    fn reusable_text_slot(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        if let Some(slot) = node.text_slot {
            // A slot moved elsewhere by an edit is no longer ours
            if self.parent(slot).map_or(true, |p| p == id) {
                return Some(slot);
            }
        }
        match node.children.as_slice() {
            [only] if self.is_text(*only) => Some(*only),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let parent = doc.create_element("Parent");
        let element = doc.create_element("Element");
        let child = doc.create_element("ChildElement");
        let root = doc.root();
        doc.insert_before(root, parent, None).unwrap();
        doc.insert_before(parent, element, None).unwrap();
        doc.insert_before(element, child, None).unwrap();
        (doc, parent, element, child)
    }

    #[test]
    fn test_created_nodes_are_detached() {
        let mut doc = Document::new();
        let el = doc.create_element("A");
        assert!(!doc.is_attached(el));
        assert_eq!(doc.parent(el), None);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_insert_and_detach() {
        let (mut doc, parent, element, child) = sample();
        assert!(doc.is_attached(child));
        assert_eq!(doc.document_element(), Some(parent));

        doc.detach(element).unwrap();
        assert!(!doc.is_attached(element));
        assert!(!doc.is_attached(child));
        assert!(doc.children(parent).is_empty());
    }

    #[test]
    fn test_insert_before_reference() {
        let (mut doc, parent, element, _) = sample();
        let first = doc.create_element("First");
        doc.insert_before(parent, first, Some(element)).unwrap();
        assert_eq!(doc.children(parent), &[first, element]);
        assert_eq!(doc.next_sibling(first), Some(element));
    }

    #[test]
    fn test_insert_rejects_foreign_reference() {
        let (mut doc, parent, _, child) = sample();
        let extra = doc.create_element("Extra");
        let err = doc.insert_before(parent, extra, Some(child)).unwrap_err();
        assert_eq!(err, DomError::NotAChild { parent, node: child });
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let (mut doc, parent, _, child) = sample();
        let err = doc.insert_before(child, parent, None).unwrap_err();
        assert_eq!(err, DomError::CycleDetected { parent: child, node: parent });
    }

    #[test]
    fn test_attributes_ns() {
        let (mut doc, _, element, _) = sample();
        doc.set_attribute(element, "a", Some("1")).unwrap();
        doc.set_attribute_ns(element, Some("urn:x"), "x:b", Some("2")).unwrap();

        assert_eq!(doc.attribute(element, "a"), Some("1"));
        assert_eq!(doc.attribute_ns(element, Some("urn:x"), "b"), Some("2"));
        assert_eq!(doc.attribute(element, "b"), None);
        assert_eq!(doc.attributes(element)[1].qualified_name(), "x:b");

        doc.set_attribute(element, "a", None).unwrap();
        assert_eq!(doc.attribute(element, "a"), None);
    }

    #[test]
    fn test_set_text_content_detaches_children() {
        let (mut doc, _, element, child) = sample();
        let replacement = doc.set_text_content(element, "hello").unwrap();
        assert_eq!(replacement.removed, vec![child]);
        assert!(!doc.is_attached(child));
        assert_eq!(doc.text_content(element), "hello");

        let cleared = doc.set_text_content(element, "").unwrap();
        assert_eq!(cleared.text_node, None);
        assert!(cleared.removed.is_empty());
        assert!(doc.children(element).is_empty());
    }

    #[test]
    fn test_text_slot_is_reused() {
        let (mut doc, _, element, _) = sample();
        let first = doc.set_text_content(element, "one").unwrap().text_node;
        doc.set_text_content(element, "").unwrap();
        let second = doc.set_text_content(element, "two").unwrap();

        assert_eq!(second.text_node, first);
        assert_eq!(second.overwritten, Some((first.unwrap(), "one".to_string())));
        assert_eq!(doc.text_content(element), "two");
    }

    #[test]
    fn test_single_text_child_is_updated_in_place() {
        let mut doc = Document::new();
        let el = doc.create_element("Private");
        let text = doc.create_text("old");
        let root = doc.root();
        doc.insert_before(root, el, None).unwrap();
        doc.insert_before(el, text, None).unwrap();

        let replacement = doc.set_text_content(el, "new").unwrap();
        assert!(replacement.removed.is_empty());
        assert_eq!(replacement.text_node, Some(text));
        assert_eq!(doc.children(el), &[text]);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (doc, parent, element, child) = sample();
        let order: Vec<_> = doc.descendants(doc.root()).collect();
        assert_eq!(order, vec![doc.root(), parent, element, child]);
        assert_eq!(doc.elements_by_name("ChildElement").collect::<Vec<_>>(), vec![child]);
    }
}
