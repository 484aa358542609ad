//! Insertion Orchestrator
//!
//! Splices a fragment into a host in four steps: pick the base identifier,
//! renumber the fragment onto it, shift later host identifiers clear of the
//! fragment's range, append the fragment's root at the attachment point.

use graft_dom::{Document, Identifier, NodeId, TagPath};

use crate::index::successor;
use crate::{highest_id, renumber_fragment, shift_host_from, AssemblyError, Result};

/// Where a fragment is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// An element of the host
    Node(NodeId),
    /// First element matching a path from the document root
    Path(TagPath),
}

impl Attachment {
    /// Attachment at the first match of a path expression
    pub fn path(path: &str) -> Result<Self> {
        Ok(Self::Path(TagPath::parse(path)?))
    }

    fn resolve(&self, doc: &Document) -> Result<NodeId> {
        let found = match self {
            Self::Node(node) => doc.element(*node).is_some().then_some(*node),
            Self::Path(path) => path.find(doc.tree(), NodeId::ROOT),
        };
        // Detached elements are not part of the document
        found
            .filter(|&node| doc.tree().is_ancestor(NodeId::ROOT, node))
            .ok_or_else(|| AssemblyError::AttachmentNotFound {
                location: self.to_string(),
            })
    }
}

impl std::fmt::Display for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(node) => write!(f, "node #{}", node.index()),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

impl From<NodeId> for Attachment {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<TagPath> for Attachment {
    fn from(path: TagPath) -> Self {
        Self::Path(path)
    }
}

/// Graft options
#[derive(Debug, Clone, Default)]
pub struct GraftOptions {
    /// Allocate after the highest identifier of this subtree instead of the
    /// whole document. Host identifiers past the scope are shifted up, which
    /// keeps identifiers increasing in document order when grafting into the
    /// middle of a document.
    pub scope: Option<NodeId>,
}

/// A grafted fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graft {
    /// Fragment root in the host arena
    pub node: NodeId,
    /// Identifier of the fragment root
    pub root_id: Identifier,
    /// Highest identifier inside the fragment
    pub last_id: Identifier,
}

/// Graft a fragment at the end of the host's identifier range
pub fn graft_fragment(doc: &mut Document, fragment: Document, at: &Attachment) -> Result<Graft> {
    graft_fragment_with(doc, fragment, at, &GraftOptions::default())
}

/// Graft a fragment with explicit options
///
/// Nothing in the host is modified unless the attachment point, the scope
/// and the fragment root identifier are all valid.
pub fn graft_fragment_with(
    doc: &mut Document,
    mut fragment: Document,
    at: &Attachment,
    options: &GraftOptions,
) -> Result<Graft> {
    let parent = at.resolve(doc)?;

    let scope = match options.scope {
        Some(scope) => scope,
        None => doc
            .document_element()
            .ok_or_else(|| AssemblyError::AttachmentNotFound {
                location: "document element".into(),
            })?,
    };
    let base = successor(highest_id(doc.tree(), scope)?)?;

    let last = renumber_fragment(&mut fragment, base)?;
    let Some(fragment_root) = fragment.document_element() else {
        return Err(AssemblyError::MissingIdentifier {
            path: format!("/ ({})", fragment.source()),
        });
    };

    // A fragment ending at u32::MAX fits as long as nothing has to follow it
    match last.next() {
        Some(after) => {
            shift_host_from(doc, base.get(), after)?;
        }
        None if doc.elements().any(|(_, elem)| elem.id.is_some_and(|id| id >= base)) => {
            return Err(AssemblyError::IdentifierOverflow { start: last, count: 2 });
        }
        None => {}
    }

    let node = doc.tree_mut().import(fragment.tree(), fragment_root);
    doc.tree_mut().append_child(parent, node);

    tracing::debug!(
        "grafted {} at {} as {}..={}",
        display_source(&fragment),
        doc.path_of(parent),
        base,
        last
    );

    Ok(Graft {
        node,
        root_id: base,
        last_id: last,
    })
}

/// Append `<tag reference="target"/>` under `parent`
///
/// Back-reference lists are usually filled before their owner is in place,
/// so the new element may well be a forward reference until
/// [`crate::repair_order`] runs.
pub fn append_reference(doc: &mut Document, parent: NodeId, tag: &str, target: Identifier) -> Result<NodeId> {
    if doc.element(parent).is_none() {
        return Err(AssemblyError::AttachmentNotFound {
            location: format!("node #{}", parent.index()),
        });
    }
    let tree = doc.tree_mut();
    let node = tree.create_element(tag);
    if let Some(elem) = tree.element_mut(node) {
        elem.reference = Some(target);
    }
    tree.append_child(parent, node);
    Ok(node)
}

fn display_source(doc: &Document) -> &str {
    if doc.source().is_empty() {
        "fragment"
    } else {
        doc.source()
    }
}
