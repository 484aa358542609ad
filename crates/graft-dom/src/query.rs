//! Structural search
//!
//! A deliberately small path language for locating elements:
//!
//! ```text
//! wallPlanes[@id]/INITIAL        any wallPlanes carrying an id, then its INITIAL child
//! /audit/skin                    anchored: skin directly under the document element audit
//! *[@class="java.math.BigDecimal"]
//! ```
//!
//! Without a leading `/` the first segment matches any descendant of the
//! search origin (a leading `//` or `.//` means the same). Later segments
//! always match direct children.

use std::fmt;
use std::str::FromStr;

use crate::{DomTree, ElementData, NodeId};

/// Path parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("malformed path segment {0:?}")]
    Malformed(String),
}

/// Attribute predicate of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Has(String),
    Equals(String, String),
}

/// One step of a [`TagPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Tag name, `None` for `*`
    tag: Option<String>,
    predicate: Option<Predicate>,
}

impl Segment {
    /// Check an element against this segment
    pub fn matches(&self, elem: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if &elem.tag != tag {
                return false;
            }
        }
        match &self.predicate {
            None => true,
            Some(Predicate::Has(name)) => elem.has_attr(name),
            Some(Predicate::Equals(name, value)) => elem.attr(name).as_deref() == Some(value),
        }
    }

    fn parse(raw: &str) -> Result<Self, PathError> {
        let malformed = || PathError::Malformed(raw.to_string());

        let (name, predicate) = match raw.find('[') {
            None => (raw, None),
            Some(open) => {
                let inner = raw[open + 1..]
                    .strip_suffix(']')
                    .and_then(|p| p.strip_prefix('@'))
                    .ok_or_else(malformed)?;
                let predicate = match inner.split_once('=') {
                    None => Predicate::Has(inner.trim().to_string()),
                    Some((attr, value)) => {
                        let value = value.trim();
                        let unquoted = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                            .ok_or_else(malformed)?;
                        Predicate::Equals(attr.trim().to_string(), unquoted.to_string())
                    }
                };
                (&raw[..open], Some(predicate))
            }
        };

        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(malformed());
        }
        if let Some(Predicate::Has(attr) | Predicate::Equals(attr, _)) = &predicate {
            if attr.is_empty() {
                return Err(malformed());
            }
        }

        Ok(Self {
            tag: (name != "*").then(|| name.to_string()),
            predicate,
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag.as_deref().unwrap_or("*"))?;
        match &self.predicate {
            None => Ok(()),
            Some(Predicate::Has(name)) => write!(f, "[@{name}]"),
            Some(Predicate::Equals(name, value)) => write!(f, "[@{name}=\"{value}\"]"),
        }
    }
}

/// Parsed element path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPath {
    anchored: bool,
    segments: Vec<Segment>,
}

impl TagPath {
    /// Parse a path expression
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let path = path.trim();
        let (anchored, rest) = if let Some(rest) = path.strip_prefix(".//") {
            (false, rest)
        } else if let Some(rest) = path.strip_prefix("//") {
            (false, rest)
        } else if let Some(rest) = path.strip_prefix('/') {
            (true, rest)
        } else {
            (false, path)
        };

        if rest.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = split_segments(rest)
            .into_iter()
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { anchored, segments })
    }

    /// Segments of this path
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the first segment must be a direct child of the origin
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// All matches below `origin`, in document order
    pub fn find_all(&self, tree: &DomTree, origin: NodeId) -> Vec<NodeId> {
        tree.descendants(origin)
            .skip(1)
            .filter(|&(id, _)| self.matches_at(tree, id, origin))
            .map(|(id, _)| id)
            .collect()
    }

    /// First match below `origin` in document order
    pub fn find(&self, tree: &DomTree, origin: NodeId) -> Option<NodeId> {
        tree.descendants(origin)
            .skip(1)
            .find(|&(id, _)| self.matches_at(tree, id, origin))
            .map(|(id, _)| id)
    }

    /// Match the segments backwards from `node` towards `origin`
    fn matches_at(&self, tree: &DomTree, node: NodeId, origin: NodeId) -> bool {
        let mut current = node;
        for (i, segment) in self.segments.iter().enumerate().rev() {
            let Some(elem) = tree.element(current) else {
                return false;
            };
            if !segment.matches(elem) {
                return false;
            }
            if i > 0 {
                match tree.parent(current) {
                    Some(parent) if parent != origin => current = parent,
                    _ => return false,
                }
            }
        }

        if self.anchored {
            tree.parent(current) == Some(origin)
        } else {
            tree.is_ancestor(origin, current)
        }
    }
}

impl FromStr for TagPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anchored {
            f.write_str("/")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

// Split on '/' outside of predicate brackets, so values may contain slashes.
fn split_segments(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}
