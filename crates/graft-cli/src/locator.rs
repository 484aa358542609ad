//! Plan locators
//!
//! `@name` or `@name/sub/path` start at a node bound by an earlier graft
//! step; anything else is a path from the search origin.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use graft_dom::{Document, NodeId, TagPath};

use crate::plan::PlanError;

/// Names bound by graft steps. Node ids stay valid while identifiers shift.
pub type Bindings = HashMap<String, NodeId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Named { name: String, path: Option<TagPath> },
    Path(TagPath),
}

impl Locator {
    /// Resolve from the document node
    pub fn resolve(&self, doc: &Document, names: &Bindings) -> Result<NodeId, PlanError> {
        self.resolve_from(doc, NodeId::ROOT, names)
    }

    /// Resolve a path relative to `origin`; named locators ignore the origin
    pub fn resolve_from(&self, doc: &Document, origin: NodeId, names: &Bindings) -> Result<NodeId, PlanError> {
        let found = match self {
            Self::Named { name, path } => {
                let node = *names
                    .get(name)
                    .ok_or_else(|| PlanError::UnknownName(name.clone()))?;
                match path {
                    Some(path) => path.find(doc.tree(), node),
                    None => Some(node),
                }
            }
            Self::Path(path) => path.find(doc.tree(), origin),
        };
        found.ok_or_else(|| PlanError::NotFound(self.to_string()))
    }
}

impl FromStr for Locator {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(rest) = s.strip_prefix('@') else {
            return Ok(Self::Path(TagPath::parse(s)?));
        };

        let (name, sub) = match rest.split_once('/') {
            Some((name, sub)) => (name, Some(sub)),
            None => (rest, None),
        };
        if name.is_empty() || name.contains('[') {
            return Err(PlanError::Locator(s.to_string()));
        }
        let path = sub.map(TagPath::parse).transpose()?;
        Ok(Self::Named {
            name: name.to_string(),
            path,
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, path: Some(path) } => write!(f, "@{name}/{path}"),
            Self::Named { name, path: None } => write!(f, "@{name}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, Bindings) {
        let mut doc = graft_xml::parse("<a><b><c/></b><c/></a>").unwrap();
        let b = doc.find("b").unwrap().unwrap();
        let extra = doc.tree_mut().create_element("d");
        doc.tree_mut().append_child(b, extra);
        let mut names = Bindings::new();
        names.insert("first".to_string(), b);
        (doc, names)
    }

    #[test]
    fn test_parse() {
        assert!(matches!("@w".parse::<Locator>(), Ok(Locator::Named { path: None, .. })));
        assert!(matches!("@w/x/y".parse::<Locator>(), Ok(Locator::Named { path: Some(_), .. })));
        assert!(matches!("/a/b".parse::<Locator>(), Ok(Locator::Path(_))));
        assert!(matches!("@".parse::<Locator>(), Err(PlanError::Locator(_))));
        assert!(matches!("@/x".parse::<Locator>(), Err(PlanError::Locator(_))));
        assert_eq!("@w/x".parse::<Locator>().unwrap().to_string(), "@w/x");
    }

    #[test]
    fn test_resolve() {
        let (doc, names) = sample();
        let b = names["first"];

        let named: Locator = "@first/c".parse().unwrap();
        let c = named.resolve(&doc, &names).unwrap();
        assert_eq!(doc.tree().parent(c), Some(b));

        let d: Locator = "d".parse().unwrap();
        assert!(d.resolve_from(&doc, b, &names).is_ok());

        let missing: Locator = "@second".parse().unwrap();
        assert!(matches!(missing.resolve(&doc, &names), Err(PlanError::UnknownName(_))));

        let nothing: Locator = "/a/zzz".parse().unwrap();
        assert!(matches!(nothing.resolve(&doc, &names), Err(PlanError::NotFound(_))));
    }
}
