//! Invariant checks over a finished document

use std::collections::HashMap;

use graft_dom::{Document, Identifier, NodeId};

use crate::{AssemblyError, IdentifierIndex, Result};

/// A broken document invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Two elements share an identifier
    Duplicate {
        id: Identifier,
        node: NodeId,
        first: NodeId,
    },
    /// A reference names no element
    Dangling { reference: Identifier, node: NodeId },
    /// A reference appears before the element it names
    Forward {
        reference: Identifier,
        node: NodeId,
        target: NodeId,
    },
}

impl Violation {
    /// Convert into an error carrying printable locations
    pub fn to_error(self, doc: &Document) -> AssemblyError {
        match self {
            Self::Duplicate { id, node, first } => AssemblyError::DuplicateIdentifier {
                id,
                path: doc.path_of(node),
                first: doc.path_of(first),
            },
            Self::Dangling { reference, node } => AssemblyError::DanglingReference {
                reference,
                path: doc.path_of(node),
            },
            Self::Forward {
                reference,
                node,
                target,
            } => AssemblyError::ForwardReference {
                reference,
                path: doc.path_of(node),
                target: doc.path_of(target),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Duplicate { .. } => 0,
            Self::Dangling { .. } => 1,
            Self::Forward { .. } => 2,
        }
    }
}

/// Every invariant violation in the document
///
/// Duplicates come first, then dangling references, then forward
/// references, each group in document order.
pub fn violations(doc: &Document) -> Vec<Violation> {
    let index = IdentifierIndex::build(doc.tree(), NodeId::ROOT);
    let mut found: Vec<Violation> = index
        .duplicates()
        .iter()
        .map(|&(id, node, first)| Violation::Duplicate { id, node, first })
        .collect();

    let position: HashMap<NodeId, usize> = doc
        .elements()
        .enumerate()
        .map(|(pos, (node, _))| (node, pos))
        .collect();

    for (node, elem) in doc.elements() {
        let Some(reference) = elem.reference else {
            continue;
        };
        match index.get(reference) {
            None => found.push(Violation::Dangling { reference, node }),
            Some(target) if position[&target] > position[&node] => {
                found.push(Violation::Forward {
                    reference,
                    node,
                    target,
                })
            }
            Some(_) => {}
        }
    }

    found.sort_by_key(Violation::rank);
    found
}

/// Check uniqueness, resolution and ordering, reporting the first failure
pub fn verify(doc: &Document) -> Result<()> {
    match violations(doc).first() {
        Some(violation) => Err(violation.to_error(doc)),
        None => Ok(()),
    }
}
