//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a detached subtree stays in the arena and can be
//! reattached anywhere. [`NodeId`]s therefore stay valid for the lifetime of
//! the tree.

use crate::{ElementData, Node, NodeData, NodeId};

/// Tree operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    NotFound(NodeId),

    #[error("node {node:?} cannot be moved relative to its own ancestor {ancestor:?}")]
    HierarchyRequest { node: NodeId, ancestor: NodeId },

    #[error("node {0:?} has no parent")]
    Detached(NodeId),
}

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Element data of a node, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data of a node, if it is an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree holds nothing but the document node
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached element from prepared data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.push(Node {
            data: NodeData::Element(data),
            ..Node::element("")
        })
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    /// First element child of the document node
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .find(|(_, node)| node.is_element())
            .map(|(id, _)| id)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.option())
    }

    /// Append `child` as the last child of `parent`
    ///
    /// `child` is detached from its current position first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, NodeId::NONE);
    }

    /// Insert `child` under `parent` before `before` (NONE appends)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        self.detach(child);

        let prev = if before.is_valid() {
            self.nodes[before.index()].prev_sibling
        } else {
            self.nodes[parent.index()].last_child
        };

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = before;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }

        if before.is_valid() {
            self.nodes[before.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
    }

    /// Unlink a node from its parent and siblings; its subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }

        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Exchange the positions of two attached nodes
    ///
    /// Each node ends up in the slot the other occupied. Fails if one node
    /// contains the other, since a subtree cannot be moved into itself.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<(), DomError> {
        for id in [a, b] {
            if self.get(id).is_none() {
                return Err(DomError::NotFound(id));
            }
        }
        if a == b {
            return Ok(());
        }
        if self.is_ancestor(a, b) {
            return Err(DomError::HierarchyRequest { node: b, ancestor: a });
        }
        if self.is_ancestor(b, a) {
            return Err(DomError::HierarchyRequest { node: a, ancestor: b });
        }

        let (pa, na) = (self.nodes[a.index()].parent, self.nodes[a.index()].next_sibling);
        let (pb, nb) = (self.nodes[b.index()].parent, self.nodes[b.index()].next_sibling);
        if !pa.is_valid() {
            return Err(DomError::Detached(a));
        }
        if !pb.is_valid() {
            return Err(DomError::Detached(b));
        }

        if na == b {
            // a immediately precedes b
            self.insert_before(pa, b, a);
        } else if nb == a {
            self.insert_before(pb, a, b);
        } else {
            self.insert_before(pb, a, nb);
            self.insert_before(pa, b, na);
        }
        tracing::trace!("Swapped nodes {} and {}", a.index(), b.index());
        Ok(())
    }

    /// Check whether `ancestor` is a proper ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Iterate over the direct children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Children { tree: self, next }
    }

    /// Iterate over a subtree in document order (pre-order, `id` included)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let next = if self.get(id).is_some() { id } else { NodeId::NONE };
        Descendants {
            tree: self,
            root: id,
            next,
        }
    }

    /// Elements of a subtree in document order
    pub fn elements(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ElementData)> + '_ {
        self.descendants(id)
            .filter_map(|(id, node)| node.as_element().map(|e| (id, e)))
    }

    /// Deep-copy a subtree of another tree into this arena
    ///
    /// The copy is detached; attach it with [`DomTree::append_child`].
    pub fn import(&mut self, other: &DomTree, id: NodeId) -> NodeId {
        let Some(node) = other.get(id) else {
            return NodeId::NONE;
        };
        let copy = self.push(node.unlinked());
        let children: Vec<NodeId> = other.children(id).map(|(child, _)| child).collect();
        for child in children {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Render a location such as `/audit/skin/walls[2]` for diagnostics
    ///
    /// A positional index is added when a node has same-tag siblings.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get(node_id) else {
                break;
            };
            match &node.data {
                NodeData::Document => break,
                NodeData::Comment(_) => segments.push("comment()".to_string()),
                NodeData::Element(elem) => {
                    let same_tag: Vec<NodeId> = match node.parent.option() {
                        Some(parent) => self
                            .children(parent)
                            .filter(|(_, n)| n.as_element().is_some_and(|e| e.tag == elem.tag))
                            .map(|(id, _)| id)
                            .collect(),
                        None => vec![node_id],
                    };
                    if same_tag.len() > 1 {
                        let pos = same_tag.iter().position(|&n| n == node_id).unwrap_or(0);
                        segments.push(format!("{}[{}]", elem.tag, pos + 1));
                    } else {
                        segments.push(elem.tag.clone());
                    }
                }
            }
            current = node.parent.option();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.option()?;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.option()?;
        let node = self.tree.get(id)?;

        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut current = id;
            loop {
                if current == self.root {
                    break NodeId::NONE;
                }
                let n = &self.tree.nodes[current.index()];
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                current = n.parent;
                if !current.is_valid() {
                    break NodeId::NONE;
                }
            }
        };

        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(tree: &DomTree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .filter_map(|(_, n)| n.as_element().map(|e| e.tag.clone()))
            .collect()
    }

    #[test]
    fn test_append_and_detach() {
        let mut tree = DomTree::new();
        let list = tree.create_element("list");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");

        tree.append_child(tree.root(), list);
        tree.append_child(list, a);
        tree.append_child(list, b);
        tree.append_child(list, c);
        assert_eq!(tags(&tree, list), ["a", "b", "c"]);

        tree.detach(b);
        assert_eq!(tags(&tree, list), ["a", "c"]);
        assert_eq!(tree.get(a).unwrap().next_sibling, c);
        assert_eq!(tree.get(c).unwrap().prev_sibling, a);
        assert_eq!(tree.parent(b), None);

        tree.detach(c);
        tree.detach(a);
        assert_eq!(tree.get(list).unwrap().first_child, NodeId::NONE);
        assert_eq!(tree.get(list).unwrap().last_child, NodeId::NONE);
    }

    #[test]
    fn test_insert_before() {
        let mut tree = DomTree::new();
        let list = tree.create_element("list");
        let a = tree.create_element("a");
        let c = tree.create_element("c");
        let b = tree.create_element("b");
        tree.append_child(NodeId::ROOT, list);
        tree.append_child(list, a);
        tree.append_child(list, c);

        tree.insert_before(list, b, c);
        assert_eq!(tags(&tree, list), ["a", "b", "c"]);

        // Moving an attached node re-links its old siblings
        tree.insert_before(list, c, a);
        assert_eq!(tags(&tree, list), ["c", "a", "b"]);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = DomTree::new();
        let root = tree.create_element("r");
        let x = tree.create_element("x");
        let x1 = tree.create_element("x1");
        let y = tree.create_element("y");
        tree.append_child(NodeId::ROOT, root);
        tree.append_child(root, x);
        tree.append_child(x, x1);
        tree.append_child(root, y);

        let order: Vec<NodeId> = tree.descendants(root).map(|(id, _)| id).collect();
        assert_eq!(order, [root, x, x1, y]);

        // Subtree traversal must not leak into following siblings
        let order: Vec<NodeId> = tree.descendants(x).map(|(id, _)| id).collect();
        assert_eq!(order, [x, x1]);
    }

    #[test]
    fn test_swap_across_parents() {
        let mut tree = DomTree::new();
        let root = tree.create_element("r");
        let left = tree.create_element("left");
        let right = tree.create_element("right");
        let a = tree.create_element("a");
        let a2 = tree.create_element("a2");
        let b = tree.create_element("b");
        tree.append_child(NodeId::ROOT, root);
        tree.append_child(root, left);
        tree.append_child(root, right);
        tree.append_child(left, a);
        tree.append_child(left, a2);
        tree.append_child(right, b);

        tree.swap(a, b).unwrap();
        assert_eq!(tags(&tree, left), ["b", "a2"]);
        assert_eq!(tags(&tree, right), ["a"]);
    }

    #[test]
    fn test_swap_adjacent_siblings() {
        let mut tree = DomTree::new();
        let list = tree.create_element("list");
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        tree.append_child(NodeId::ROOT, list);
        tree.append_child(list, a);
        tree.append_child(list, b);
        tree.append_child(list, c);

        tree.swap(a, b).unwrap();
        assert_eq!(tags(&tree, list), ["b", "a", "c"]);
        tree.swap(c, a).unwrap();
        assert_eq!(tags(&tree, list), ["b", "c", "a"]);
        tree.swap(b, a).unwrap();
        assert_eq!(tags(&tree, list), ["a", "c", "b"]);
    }

    #[test]
    fn test_swap_rejects_nested() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("outer");
        let inner = tree.create_element("inner");
        tree.append_child(NodeId::ROOT, outer);
        tree.append_child(outer, inner);

        assert_eq!(
            tree.swap(outer, inner),
            Err(DomError::HierarchyRequest { node: inner, ancestor: outer })
        );
    }

    #[test]
    fn test_import_copies_subtree() {
        let mut source = DomTree::new();
        let frag = source.create_element("frag");
        let leaf = source.create_element("leaf");
        source.append_child(NodeId::ROOT, frag);
        source.append_child(frag, leaf);

        let mut tree = DomTree::new();
        let host = tree.create_element("host");
        tree.append_child(NodeId::ROOT, host);
        let copy = tree.import(&source, frag);
        tree.append_child(host, copy);

        assert_eq!(tags(&tree, host), ["frag"]);
        assert_eq!(tags(&tree, copy), ["leaf"]);
        assert_eq!(tree.path_of(tree.get(copy).unwrap().first_child), "/host/frag/leaf");
    }

    #[test]
    fn test_path_of_indexes_repeated_tags() {
        let mut tree = DomTree::new();
        let root = tree.create_element("walls");
        let w1 = tree.create_element("wall");
        let w2 = tree.create_element("wall");
        tree.append_child(NodeId::ROOT, root);
        tree.append_child(root, w1);
        tree.append_child(root, w2);

        assert_eq!(tree.path_of(root), "/walls");
        assert_eq!(tree.path_of(w2), "/walls/wall[2]");
    }
}
