//! Reference-Order Repair
//!
//! Moves referenced elements ahead of their first reference by swapping the
//! two subtrees in place, then rescans, until no reference precedes its
//! target. Swapping keeps unrelated nesting untouched: only the two
//! conflicting subtrees change position.

use std::collections::{HashMap, HashSet};

use graft_dom::{Document, Identifier, NodeId};

use crate::{AssemblyError, IdentifierIndex, Result};

/// Tag whose elements record their erased type in `class` after a swap
const TYPE_ERASED_TAG: &str = "INITIAL";

/// Repair configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairConfig {
    /// Give up after this many swaps. `None` derives a budget from the
    /// document size.
    pub max_swaps: Option<usize>,

    /// Search the reference graph for cycles before swapping anything
    pub detect_cycles: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_swaps: None,
            detect_cycles: true,
        }
    }
}

impl RepairConfig {
    fn budget(&self, elements: usize) -> usize {
        self.max_swaps
            .unwrap_or_else(|| elements.saturating_mul(elements).max(64))
    }
}

/// Outcome of a repair run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepairReport {
    /// Subtree swaps performed
    pub swaps: usize,
    /// Full document scans, the final clean one included
    pub scans: usize,
}

/// A reference whose target has not been seen yet
#[derive(Debug, Clone, Copy)]
struct Forward {
    node: NodeId,
    target: NodeId,
    reference: Identifier,
}

/// Restore definition-before-use for every reference in the document
///
/// Fails with [`AssemblyError::DanglingReference`] on a reference to nothing
/// and [`AssemblyError::ReferenceCycle`] when no ordering exists or the swap
/// budget runs out. [`AssemblyError::NestedReference`] when a target inside
/// its referencing element has nothing outside to trade places with.
/// Identifiers and reference values are never changed.
pub fn repair_order(doc: &mut Document, config: &RepairConfig) -> Result<RepairReport> {
    if config.detect_cycles {
        if let Some(chain) = find_reference_cycle(doc) {
            let path = doc
                .find_by_identifier(chain[0])
                .map(|node| doc.path_of(node))
                .unwrap_or_default();
            return Err(AssemblyError::ReferenceCycle { path, chain, swaps: 0 });
        }
    }

    let budget = config.budget(doc.element_count());
    let mut report = RepairReport::default();

    loop {
        report.scans += 1;
        let Some(forward) = first_forward_reference(doc)? else {
            break;
        };

        if report.swaps >= budget {
            return Err(AssemblyError::ReferenceCycle {
                path: doc.path_of(forward.node),
                chain: vec![forward.reference],
                swaps: report.swaps,
            });
        }

        swap_elements(doc, forward, report.swaps)?;
        report.swaps += 1;
    }

    if report.swaps > 0 {
        tracing::info!("reference order repaired with {} swaps", report.swaps);
    }
    Ok(report)
}

/// Find a cycle among identifier-bearing elements that reference each other
///
/// Returns the identifiers along the cycle, first one repeated at the end.
/// A self-reference is not a cycle: an element's own identifier counts as
/// seen before its reference is checked.
pub fn find_reference_cycle(doc: &Document) -> Option<Vec<Identifier>> {
    // Each element has at most one reference, so every identifier has at most
    // one outgoing edge.
    let edges: HashMap<Identifier, Identifier> = doc
        .elements()
        .filter_map(|(_, elem)| match (elem.id, elem.reference) {
            (Some(id), Some(target)) if id != target => Some((id, target)),
            _ => None,
        })
        .collect();

    let mut done: HashSet<Identifier> = HashSet::new();
    let mut starts: Vec<Identifier> = edges.keys().copied().collect();
    starts.sort_unstable();

    for start in starts {
        if done.contains(&start) {
            continue;
        }
        let mut path: Vec<Identifier> = Vec::new();
        let mut on_path: HashSet<Identifier> = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if done.contains(&id) {
                break;
            }
            if on_path.contains(&id) {
                let pos = path.iter().position(|&p| p == id).unwrap_or(0);
                let mut cycle = path[pos..].to_vec();
                cycle.push(id);
                return Some(cycle);
            }
            path.push(id);
            on_path.insert(id);
            current = edges.get(&id).copied();
        }
        done.extend(path);
    }
    None
}

fn first_forward_reference(doc: &Document) -> Result<Option<Forward>> {
    let index = IdentifierIndex::build(doc.tree(), NodeId::ROOT);
    let mut seen: HashSet<Identifier> = HashSet::with_capacity(index.len());

    for (node, elem) in doc.elements() {
        if let Some(id) = elem.id {
            seen.insert(id);
        }
        let Some(reference) = elem.reference else {
            continue;
        };
        if seen.contains(&reference) {
            continue;
        }
        let target = index
            .get(reference)
            .ok_or_else(|| AssemblyError::DanglingReference {
                reference,
                path: doc.path_of(node),
            })?;
        return Ok(Some(Forward {
            node,
            target,
            reference,
        }));
    }
    Ok(None)
}

fn swap_elements(doc: &mut Document, forward: Forward, swaps: usize) -> Result<()> {
    let Forward { node, target, reference } = forward;

    // A target nested inside its own reference first trades places with an
    // element outside the referencing subtree
    if doc.tree().is_ancestor(node, target) {
        let Some(stand_in) = stand_in_for(doc, node) else {
            return Err(AssemblyError::NestedReference {
                path: doc.path_of(node),
                target: doc.path_of(target),
            });
        };
        tracing::debug!(
            "lifting {} (id {}) out of {} in exchange for {}",
            doc.path_of(target),
            reference,
            doc.path_of(node),
            doc.path_of(stand_in)
        );
        doc.tree_mut()
            .swap(target, stand_in)
            .map_err(|_| AssemblyError::NestedReference {
                path: doc.path_of(node),
                target: doc.path_of(target),
            })?;
        exchange_tags(doc, target, stand_in);
        return Ok(());
    }

    tracing::debug!(
        "moving {} (id {}) ahead of its reference at {}",
        doc.path_of(target),
        reference,
        doc.path_of(node)
    );

    doc.tree_mut()
        .swap(node, target)
        .map_err(|_| AssemblyError::ReferenceCycle {
            path: doc.path_of(node),
            chain: vec![reference],
            swaps,
        })?;

    exchange_tags(doc, node, target);
    Ok(())
}

/// An element outside `node`'s subtree that a descendant of `node` can trade
/// places with
///
/// Prefers the closest preceding element that is not an ancestor of `node`,
/// which puts the descendant ahead of it outright. Otherwise the first later
/// element outside the subtree moves it out, and an ordinary swap follows on
/// the next scan. `None` when every other element encloses `node`.
fn stand_in_for(doc: &Document, node: NodeId) -> Option<NodeId> {
    let tree = doc.tree();
    let mut elements = doc.elements();
    let mut preceding = None;
    for (candidate, _) in elements.by_ref() {
        if candidate == node {
            break;
        }
        if !tree.is_ancestor(candidate, node) {
            preceding = Some(candidate);
        }
    }
    preceding.or_else(|| {
        elements
            .find(|&(candidate, _)| !tree.is_ancestor(node, candidate))
            .map(|(candidate, _)| candidate)
    })
}

/// Give each element the tag of the slot it moved into
fn exchange_tags(doc: &mut Document, a: NodeId, b: NodeId) {
    let (Some(tag_a), Some(tag_b)) = (
        doc.element(a).map(|e| e.tag.clone()),
        doc.element(b).map(|e| e.tag.clone()),
    ) else {
        return;
    };
    if tag_a == tag_b {
        return;
    }

    for (node, old, new) in [(a, tag_a.clone(), tag_b.clone()), (b, tag_b, tag_a)] {
        if let Some(elem) = doc.element_mut(node) {
            if new == TYPE_ERASED_TAG {
                elem.class = Some(old);
            }
            elem.tag = new;
        }
    }
}
