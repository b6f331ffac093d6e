//! Mutable HTML tree on an [`indextree::Arena`]
//!
//! Nodes are owned by the [`Document`]'s arena and refer to each other by
//! [`NodeId`]. Moving a node uses [`Document::detach`], which keeps it alive;
//! dropping one uses [`Document::remove`], which frees the whole subtree for
//! reuse by later allocations.

mod parse;
mod serialize;

pub use indextree::NodeId;
pub use parse::parse_document;

use indextree::Arena;

/// Document type declaration (`<!DOCTYPE ...>`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Doctype {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl std::fmt::Display for Doctype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<!DOCTYPE {}", self.name)?;
        if let Some(public_id) = self.public_id.as_deref().filter(|s| !s.is_empty()) {
            write!(f, " PUBLIC \"{}\"", public_id)?;
        }
        if let Some(system_id) = self.system_id.as_deref().filter(|s| !s.is_empty()) {
            write!(f, " \"{}\"", system_id)?;
        }
        write!(f, ">")
    }
}

/// An element's tag name and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-cased tag name
    pub name: String,
    /// Attributes in serialization order
    pub attrs: Vec<(String, String)>,
}

/// Payload of a tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype(Doctype),
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Errors from structural tree operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The reference node is not a child of the given parent
    NotAChild { parent: NodeId, child: NodeId },
    /// The arena refused the operation (a node inserted into itself, or a removed node)
    Tree(indextree::NodeError),
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomError::NotAChild { parent, child } => {
                write!(f, "node {:?} is not a child of node {:?}", child, parent)
            }
            DomError::Tree(e) => write!(f, "tree operation failed: {}", e),
        }
    }
}

impl std::error::Error for DomError {}

/// A mutable HTML document tree
///
/// `Clone` is a deep copy of the whole arena, which is how templates get a
/// private working copy per render.
#[derive(Debug, Clone)]
pub struct Document {
    arena: Arena<NodeData>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::Document);
        Self { arena, root }
    }

    /// The document root (not the `<html>` element)
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>, attrs: Vec<(String, String)>) -> NodeId {
        self.arena.new_node(NodeData::Element(ElementData {
            name: name.into(),
            attrs,
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeData::Text(text.into()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeData::Comment(text.into()))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, doctype: Doctype) -> NodeId {
        self.arena.new_node(NodeData::Doctype(doctype))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    /// Snapshot of the element children of a node
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).filter(|&child| self.is_element(child)).collect()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.data_mut(id) {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let value = value.into();
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value,
            None => el.attrs.push((name.to_string(), value)),
        }
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        let pos = el.attrs.iter().position(|(k, _)| k == name)?;
        Some(el.attrs.remove(pos).1)
    }

    /// Snapshot of an element's attributes
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.element(id).map(|el| el.attrs.clone()).unwrap_or_default()
    }

    /// Append `child` as the last child of `parent`, detaching it first
    ///
    /// Panics if `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    /// Insert `child` into `parent` immediately before `reference`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }
        reference
            .checked_insert_before(child, &mut self.arena)
            .map_err(DomError::Tree)
    }

    /// Remove `child` and its subtree from `parent`, freeing them
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.is_removed(child) || self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.remove(child);
        Ok(())
    }

    /// Unlink a node from its parent, if it has one; the subtree stays usable
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Unlink a node and free it together with all its descendants
    pub fn remove(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        id.is_removed(&self.arena)
    }

    /// Replace all children with a single text node (none for empty text)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.remove(child);
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        id.descendants(&self.arena)
            .filter_map(|n| match self.data(n) {
                NodeData::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Deep-copy a subtree, returning the detached copy's root
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.data(id).clone();
        let copy = self.arena.new_node(data);
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// The first element child of the root, normally `<html>`
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&c| self.is_element(c))
    }

    /// First child element of the document element with the given tag name
    fn document_section(&self, name: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html).find(|&c| self.tag_name(c) == Some(name))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_section("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_section("body")
    }

    /// The doctype attached to the root, if any
    pub fn doctype(&self) -> Option<&Doctype> {
        self.children(self.root).find_map(|c| match self.data(c) {
            NodeData::Doctype(dt) => Some(dt),
            _ => None,
        })
    }

    /// Whether the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        !self.is_removed(id) && id.ancestors(&self.arena).any(|a| a == self.root)
    }

    /// All descendant elements of `id`, in document order
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        id.descendants(&self.arena)
            .skip(1)
            .filter(|&n| self.is_element(n))
            .collect()
    }
}
