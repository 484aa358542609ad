//! Fragment and host renumbering
//!
//! Both passes relabel identifiers in document order and then rewrite the
//! references that pointed at a relabelled identifier. Positions never change,
//! so reference ordering is unaffected.

use std::collections::HashMap;

use graft_dom::{Document, DomTree, Identifier, NodeId};

use crate::{AssemblyError, Result};

/// Outcome of a host shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftReport {
    /// Elements that received a new identifier
    pub shifted: usize,
    /// References rewritten to follow them
    pub rewritten: usize,
    /// Last identifier handed out, if any element moved
    pub last: Option<Identifier>,
}

/// Renumber a freshly loaded fragment so its identifiers start at `start`
///
/// The fragment's document element receives `start`, every further
/// identifier-bearing element the next value in document order. References
/// into the fragment follow their targets; references to identifiers the
/// fragment does not define are left alone. Returns the highest identifier
/// now in use.
pub fn renumber_fragment(fragment: &mut Document, start: Identifier) -> Result<Identifier> {
    let root = fragment
        .document_element()
        .ok_or_else(|| AssemblyError::MissingIdentifier {
            path: format!("/ ({})", fragment.source()),
        })?;
    renumber_subtree(fragment.tree_mut(), root, start)
}

/// Renumber the subtree rooted at `root`, which must carry an identifier
pub fn renumber_subtree(tree: &mut DomTree, root: NodeId, start: Identifier) -> Result<Identifier> {
    if tree.element(root).and_then(|e| e.id).is_none() {
        return Err(AssemblyError::MissingIdentifier {
            path: tree.path_of(root),
        });
    }

    let targets: Vec<NodeId> = tree
        .elements(root)
        .filter(|(_, elem)| elem.id.is_some())
        .map(|(node, _)| node)
        .collect();

    let last = last_in_range(start, targets.len())?;
    let mut mapping = HashMap::with_capacity(targets.len());
    for (next, node) in (start.get()..=last.get()).map(Identifier).zip(targets) {
        let Some(elem) = tree.element_mut(node) else {
            continue;
        };
        let Some(old) = elem.id.replace(next) else {
            continue;
        };
        if mapping.insert(old, next).is_some() {
            tracing::warn!("fragment defines identifier {} more than once", old);
        }
    }

    let rewritten = rewrite_references(tree, root, &mapping);
    tracing::debug!(
        "renumbered {} identifiers into {}..={} ({} references)",
        mapping.len(),
        start,
        last,
        rewritten
    );
    Ok(last)
}

/// Last of `count` consecutive identifiers starting at `start`
///
/// Checked before anything is rewritten so an overflowing range leaves the
/// tree untouched.
fn last_in_range(start: Identifier, count: usize) -> Result<Identifier> {
    u32::try_from(count.saturating_sub(1))
        .ok()
        .and_then(|span| start.get().checked_add(span))
        .map(Identifier)
        .ok_or(AssemblyError::IdentifierOverflow { start, count })
}

/// Move every host identifier `>= threshold` to `start`, `start + 1`, ...
///
/// Relative document order among the moved identifiers is kept and every
/// reference in the document that pointed at a moved identifier is
/// rewritten. Identifiers below `threshold` are untouched. `start` may not be
/// below `threshold`, or moved identifiers could collide with kept ones.
pub fn shift_host_from(doc: &mut Document, threshold: u32, start: Identifier) -> Result<ShiftReport> {
    if start.get() < threshold {
        return Err(AssemblyError::InvalidShift { threshold, start });
    }

    let tree = doc.tree_mut();
    let targets: Vec<NodeId> = tree
        .elements(NodeId::ROOT)
        .filter(|(_, elem)| elem.id.is_some_and(|id| id.get() >= threshold))
        .map(|(node, _)| node)
        .collect();

    let last = last_in_range(start, targets.len())?;
    let mut mapping = HashMap::with_capacity(targets.len());
    let mut report = ShiftReport::default();
    for (next, node) in (start.get()..=last.get()).map(Identifier).zip(targets) {
        let Some(elem) = tree.element_mut(node) else {
            continue;
        };
        let Some(old) = elem.id.replace(next) else {
            continue;
        };
        mapping.insert(old, next);
        report.shifted += 1;
        report.last = Some(next);
    }

    report.rewritten = rewrite_references(tree, NodeId::ROOT, &mapping);
    tracing::debug!(
        "shifted {} identifiers >= {} to start at {} ({} references)",
        report.shifted,
        threshold,
        start,
        report.rewritten
    );
    Ok(report)
}

/// Renumber the whole document from 1 in document order
///
/// Running it on an already rebased document changes nothing.
pub fn rebase(doc: &mut Document) -> Result<ShiftReport> {
    shift_host_from(doc, 0, Identifier(1))
}

fn rewrite_references(
    tree: &mut DomTree,
    root: NodeId,
    mapping: &HashMap<Identifier, Identifier>,
) -> usize {
    if mapping.is_empty() {
        return 0;
    }
    let referencing: Vec<NodeId> = tree
        .elements(root)
        .filter(|(_, elem)| elem.reference.is_some_and(|r| mapping.contains_key(&r)))
        .map(|(node, _)| node)
        .collect();

    for &node in &referencing {
        if let Some(elem) = tree.element_mut(node) {
            elem.reference = elem.reference.and_then(|r| mapping.get(&r).copied());
        }
    }
    referencing.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(doc: &Document) -> Vec<u32> {
        doc.elements().filter_map(|(_, e)| e.id.map(Identifier::get)).collect()
    }

    fn refs(doc: &Document) -> Vec<u32> {
        doc.elements()
            .filter_map(|(_, e)| e.reference.map(Identifier::get))
            .collect()
    }

    #[test]
    fn test_renumber_fragment_requires_root_id() {
        let mut fragment = Document::new("facade");
        let err = renumber_fragment(&mut fragment, Identifier(5)).unwrap_err();
        assert_eq!(err, AssemblyError::MissingIdentifier { path: "/facade".into() });
    }

    #[test]
    fn test_renumber_fragment_without_element() {
        let mut fragment = Document::empty("wall_xml.xml");
        assert!(matches!(
            renumber_fragment(&mut fragment, Identifier(5)),
            Err(AssemblyError::MissingIdentifier { .. })
        ));
    }

    #[test]
    fn test_renumber_leaves_foreign_references() {
        let mut fragment = Document::new("facade");
        let root = fragment.document_element().unwrap();
        fragment.element_mut(root).unwrap().id = Some(Identifier(1));
        let skin = fragment.tree.create_element("skin");
        fragment.tree.append_child(root, skin);
        fragment.element_mut(skin).unwrap().reference = Some(Identifier(300));

        let last = renumber_fragment(&mut fragment, Identifier(40)).unwrap();
        assert_eq!(last, Identifier(40));
        assert_eq!(ids(&fragment), [40]);
        assert_eq!(refs(&fragment), [300]);
    }

    #[test]
    fn test_shift_rejects_downward_move() {
        let mut doc = Document::new("r");
        assert_eq!(
            shift_host_from(&mut doc, 10, Identifier(4)),
            Err(AssemblyError::InvalidShift {
                threshold: 10,
                start: Identifier(4)
            })
        );
    }

    #[test]
    fn test_renumber_stops_at_identifier_limit() {
        let mut fragment = Document::new("facade");
        let root = fragment.document_element().unwrap();
        fragment.element_mut(root).unwrap().id = Some(Identifier(1));
        let skin = fragment.tree.create_element("skin");
        fragment.tree.append_child(root, skin);
        fragment.element_mut(skin).unwrap().id = Some(Identifier(2));

        let err = renumber_fragment(&mut fragment, Identifier(u32::MAX)).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::IdentifierOverflow {
                start: Identifier(u32::MAX),
                count: 2
            }
        );
        assert_eq!(ids(&fragment), [1, 2]);

        let last = renumber_fragment(&mut fragment, Identifier(u32::MAX - 1)).unwrap();
        assert_eq!(last, Identifier(u32::MAX));
    }

    #[test]
    fn test_shift_stops_at_identifier_limit() {
        let mut doc = Document::new("r");
        let root = doc.document_element().unwrap();
        for id in [3, 4] {
            let n = doc.tree.create_element("n");
            doc.tree.append_child(root, n);
            doc.element_mut(n).unwrap().id = Some(Identifier(id));
        }
        assert!(matches!(
            shift_host_from(&mut doc, 3, Identifier(u32::MAX)),
            Err(AssemblyError::IdentifierOverflow { count: 2, .. })
        ));
        assert_eq!(ids(&doc), [3, 4]);
    }

    #[test]
    fn test_shift_follows_document_order_not_value() {
        let mut doc = Document::new("r");
        let root = doc.document_element().unwrap();
        for id in [7, 3, 5] {
            let n = doc.tree.create_element("n");
            doc.tree.append_child(root, n);
            doc.element_mut(n).unwrap().id = Some(Identifier(id));
        }
        let report = shift_host_from(&mut doc, 4, Identifier(20)).unwrap();
        assert_eq!(ids(&doc), [20, 3, 21]);
        assert_eq!(report.shifted, 2);
        assert_eq!(report.last, Some(Identifier(21)));
    }

    #[test]
    fn test_rebase_compacts_gaps() {
        let mut doc = Document::new("r");
        let root = doc.document_element().unwrap();
        doc.element_mut(root).unwrap().id = Some(Identifier(10));
        let a = doc.tree.create_element("a");
        let b = doc.tree.create_element("b");
        doc.tree.append_child(root, a);
        doc.tree.append_child(root, b);
        doc.element_mut(a).unwrap().id = Some(Identifier(30));
        doc.element_mut(b).unwrap().reference = Some(Identifier(30));

        rebase(&mut doc).unwrap();
        assert_eq!(ids(&doc), [1, 2]);
        assert_eq!(refs(&doc), [2]);
    }
}
