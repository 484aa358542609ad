//! graft DOM - Document Model
//!
//! Arena-based element tree with explicit identifier and reference fields.

mod document;
mod node;
mod query;
mod tree;

pub use document::Document;
pub use node::{Attribute, ElementData, Node, NodeData};
pub use query::{PathError, Segment, TagPath};
pub use tree::{Children, Descendants, DomError, DomTree};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Document node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Invalid/none node ID
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID is valid
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }

    /// Arena slot of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}

/// Document-level identifier carried in an element's `id` attribute.
///
/// Unrelated to [`NodeId`]: a `NodeId` names an arena slot and never changes,
/// an `Identifier` is document content and is rewritten by renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub u32);

impl Identifier {
    /// The identifier immediately after this one, `None` past `u32::MAX`
    #[inline]
    pub fn next(self) -> Option<Identifier> {
        self.0.checked_add(1).map(Identifier)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing an identifier attribute value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier must be a positive integer, got {0:?}")]
    NotAnInteger(String, #[source] ParseIntError),

    #[error("identifier must be positive, got 0")]
    Zero,
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|e| IdentifierError::NotAnInteger(s.to_string(), e))?;
        if value == 0 {
            return Err(IdentifierError::Zero);
        }
        Ok(Identifier(value))
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Identifier(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parse() {
        assert_eq!("42".parse::<Identifier>(), Ok(Identifier(42)));
        assert_eq!(" 7 ".parse::<Identifier>(), Ok(Identifier(7)));
        assert_eq!("0".parse::<Identifier>(), Err(IdentifierError::Zero));
        assert!(matches!(
            "abc".parse::<Identifier>(),
            Err(IdentifierError::NotAnInteger(..))
        ));
        assert!("-3".parse::<Identifier>().is_err());
    }

    #[test]
    fn test_identifier_next_stops_at_limit() {
        assert_eq!(Identifier(41).next(), Some(Identifier(42)));
        assert_eq!(Identifier(u32::MAX).next(), None);
    }

    #[test]
    fn test_node_id_validity() {
        assert!(NodeId::ROOT.is_valid());
        assert!(!NodeId::NONE.is_valid());
        assert_eq!(NodeId::NONE.option(), None);
    }
}
