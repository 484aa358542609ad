//! Fragment template registry

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use graft_dom::Document;
use graft_xml::{ParseError, XmlParser};
use serde::Deserialize;

/// Structural role of a fragment template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    Wall,
    Roof,
    Floor,
    TransparentElement,
    Facade,
    WallInstance,
    FloorInstance,
    RoofPlane,
    RoofInstance,
    Opening,
    Layer,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 11] = [
        Self::Wall,
        Self::Roof,
        Self::Floor,
        Self::TransparentElement,
        Self::Facade,
        Self::WallInstance,
        Self::FloorInstance,
        Self::RoofPlane,
        Self::RoofInstance,
        Self::Opening,
        Self::Layer,
    ];

    /// Name used in plans and template file names
    pub fn name(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Roof => "roof",
            Self::Floor => "floor",
            Self::TransparentElement => "transparentElement",
            Self::Facade => "facade",
            Self::WallInstance => "wallInstance",
            Self::FloorInstance => "floorInstance",
            Self::RoofPlane => "roofPlane",
            Self::RoofInstance => "roofInstance",
            Self::Opening => "opening",
            Self::Layer => "layer",
        }
    }

    /// Template file name, e.g. `wallInstance_xml.xml`
    pub fn file_name(self) -> String {
        format!("{}_xml.xml", self.name())
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown fragment kind {s:?}"))
    }
}

/// Loads fragment templates from a directory, parsing each file once
#[derive(Debug)]
pub struct TemplateRegistry {
    dir: PathBuf,
    parser: XmlParser,
    cache: HashMap<FragmentKind, Document>,
}

impl TemplateRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            parser: XmlParser::new(),
            cache: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the template file for a kind
    pub fn path(&self, kind: FragmentKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// A fresh copy of the template for a kind
    pub fn load(&mut self, kind: FragmentKind) -> Result<Document, ParseError> {
        if let Some(doc) = self.cache.get(&kind) {
            return Ok(doc.clone());
        }
        let mut doc = self.parser.parse_file(self.path(kind))?;
        doc.set_source(kind.name());
        tracing::debug!("Loaded {} template ({} elements)", kind, doc.element_count());
        self.cache.insert(kind, doc.clone());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(FragmentKind::Wall.file_name(), "wall_xml.xml");
        assert_eq!(FragmentKind::TransparentElement.file_name(), "transparentElement_xml.xml");
        assert_eq!("roofPlane".parse::<FragmentKind>(), Ok(FragmentKind::RoofPlane));
        assert!("roof_plane".parse::<FragmentKind>().is_err());
    }

    #[test]
    fn test_load_returns_independent_copies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("layer_xml.xml"), r#"<layer id="1"><thickness>0.1</thickness></layer>"#)
            .unwrap();

        let mut registry = TemplateRegistry::new(dir.path());
        let mut first = registry.load(FragmentKind::Layer).unwrap();
        let root = first.document_element().unwrap();
        first.element_mut(root).unwrap().tag = "changed".to_string();

        let second = registry.load(FragmentKind::Layer).unwrap();
        assert_eq!(second.element(second.document_element().unwrap()).unwrap().tag, "layer");
        assert_eq!(second.source(), "layer");
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TemplateRegistry::new(dir.path());
        assert!(matches!(registry.load(FragmentKind::Wall), Err(ParseError::Io { .. })));
    }
}
