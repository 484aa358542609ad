//! Document - High-level document API

use crate::{DomTree, ElementData, Identifier, NodeId, PathError, TagPath};

/// A document: one arena tree with a single document element
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Where the document came from (file name, fragment kind, ...)
    source: String,
}

impl Document {
    /// Create a document whose document element has the given tag
    pub fn new(root_tag: &str) -> Self {
        let mut tree = DomTree::new();
        let root = tree.create_element(root_tag);
        tree.append_child(NodeId::ROOT, root);
        Self {
            tree,
            source: String::new(),
        }
    }

    /// Create an empty document (document node only)
    pub fn empty(source: &str) -> Self {
        Self {
            tree: DomTree::new(),
            source: source.to_string(),
        }
    }

    /// Label describing where the document came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the source label
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Get the document element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.document_element()
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Element data by node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.tree.element(id)
    }

    /// Mutable element data by node
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.tree.element_mut(id)
    }

    /// All attached elements in document order
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &ElementData)> + '_ {
        self.tree.elements(NodeId::ROOT)
    }

    /// First element matching `path`, searching the whole document
    pub fn find(&self, path: &str) -> Result<Option<NodeId>, PathError> {
        Ok(TagPath::parse(path)?.find(&self.tree, NodeId::ROOT))
    }

    /// Every element matching `path`, in document order
    pub fn find_all(&self, path: &str) -> Result<Vec<NodeId>, PathError> {
        Ok(TagPath::parse(path)?.find_all(&self.tree, NodeId::ROOT))
    }

    /// First element matching `path` below `origin`
    pub fn find_from(&self, origin: NodeId, path: &str) -> Result<Option<NodeId>, PathError> {
        Ok(TagPath::parse(path)?.find(&self.tree, origin))
    }

    /// Element carrying the given identifier
    pub fn find_by_identifier(&self, id: Identifier) -> Option<NodeId> {
        self.elements()
            .find(|(_, elem)| elem.id == Some(id))
            .map(|(node, _)| node)
    }

    /// Diagnostic location of a node
    pub fn path_of(&self, id: NodeId) -> String {
        self.tree.path_of(id)
    }

    /// Number of attached elements
    pub fn element_count(&self) -> usize {
        self.elements().count()
    }
}
