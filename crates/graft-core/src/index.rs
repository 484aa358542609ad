//! Identifier Index
//!
//! Lookups over the `id` attributes of a subtree.

use std::collections::HashMap;

use graft_dom::{DomTree, Identifier, NodeId};

use crate::{AssemblyError, Result};

/// Highest identifier in a subtree, the subtree root included
///
/// Fails with [`AssemblyError::MissingIdentifier`] when no element of the
/// subtree carries an identifier.
pub fn highest_id(tree: &DomTree, subtree: NodeId) -> Result<Identifier> {
    tree.elements(subtree)
        .filter_map(|(_, elem)| elem.id)
        .max()
        .or_else(|| tree.element(subtree).and_then(|elem| elem.id))
        .ok_or_else(|| AssemblyError::MissingIdentifier {
            path: tree.path_of(subtree),
        })
}

/// The identifier after `id`
///
/// Fails with [`AssemblyError::IdentifierOverflow`] at `u32::MAX`.
pub fn successor(id: Identifier) -> Result<Identifier> {
    id.next()
        .ok_or(AssemblyError::IdentifierOverflow { start: id, count: 2 })
}

/// Identifier → element map of a subtree
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    by_id: HashMap<Identifier, NodeId>,
    /// Elements whose identifier was already taken, with the first holder
    duplicates: Vec<(Identifier, NodeId, NodeId)>,
    highest: Option<Identifier>,
}

impl IdentifierIndex {
    /// Index every identifier-bearing element below `subtree`
    pub fn build(tree: &DomTree, subtree: NodeId) -> Self {
        let mut index = Self::default();
        for (node, elem) in tree.elements(subtree) {
            let Some(id) = elem.id else {
                continue;
            };
            index.highest = index.highest.max(Some(id));
            if let Some(&first) = index.by_id.get(&id) {
                index.duplicates.push((id, node, first));
            } else {
                index.by_id.insert(id, node);
            }
        }
        index
    }

    /// Element holding `id` (the first one, if duplicated)
    pub fn get(&self, id: Identifier) -> Option<NodeId> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Highest identifier seen
    pub fn highest(&self) -> Option<Identifier> {
        self.highest
    }

    /// Next identifier after the highest one (1 for an empty index), `None`
    /// once `u32::MAX` is taken
    pub fn next_free(&self) -> Option<Identifier> {
        self.highest.map_or(Some(Identifier(1)), Identifier::next)
    }

    /// `(identifier, duplicate element, first element)` triples
    pub fn duplicates(&self) -> &[(Identifier, NodeId, NodeId)] {
        &self.duplicates
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
