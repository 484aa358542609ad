//! Assembly plan files
//!
//! A plan is TOML: the host document, the template directory, optional
//! material table, output settings and an ordered list of `[[step]]`s.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use graft_core::{AssemblyError, RepairConfig};
use graft_dom::{IdentifierError, PathError};
use graft_xml::{ParseError, SerializeError, SerializeOptions};
use serde::Deserialize;

use crate::materials::TableError;
use crate::templates::FragmentKind;

/// Error loading or running a plan
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan {path}")]
    Syntax {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid locator {0:?}")]
    Locator(String),

    #[error("no node named @{0}")]
    UnknownName(String),

    #[error("nothing matches {0}")]
    NotFound(String),

    #[error("{0} has no identifier")]
    NoIdentifier(String),

    #[error("{target} is not an element")]
    NotAnElement { target: String },

    #[error("invalid {attr}={value:?}")]
    InvalidIdentifier {
        attr: String,
        value: String,
        #[source]
        source: IdentifierError,
    },

    #[error("material step needs a materials table")]
    NoMaterials,

    #[error("step {index} ({action}) failed")]
    Step {
        index: usize,
        action: &'static str,
        #[source]
        source: Box<PlanError>,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Xml(#[from] ParseError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Output(#[from] SerializeError),
}

/// A complete assembly plan
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Document the fragments are grafted into
    pub host: PathBuf,
    /// Directory holding `<kind>_xml.xml` templates
    pub templates: PathBuf,
    /// Optional material lookup table
    #[serde(default)]
    pub materials: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub repair: RepairSection,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
    /// Spaces per level; 0 writes a single line
    pub indent: usize,
    pub declaration: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            indent: 2,
            declaration: true,
        }
    }
}

impl OutputConfig {
    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            indent: (self.indent > 0).then_some(self.indent),
            declaration: self.declaration,
        }
    }
}

/// `[repair]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairSection {
    pub max_swaps: Option<usize>,
    pub detect_cycles: bool,
}

impl Default for RepairSection {
    fn default() -> Self {
        let config = RepairConfig::default();
        Self {
            max_swaps: config.max_swaps,
            detect_cycles: config.detect_cycles,
        }
    }
}

impl RepairSection {
    pub fn config(&self) -> RepairConfig {
        RepairConfig {
            max_swaps: self.max_swaps,
            detect_cycles: self.detect_cycles,
        }
    }
}

/// One `[[step]]`, tagged by its `action` key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Step {
    /// Graft a fresh copy of a template
    Graft {
        fragment: FragmentKind,
        into: String,
        /// Subtree whose highest identifier sets the fragment's base
        #[serde(default)]
        scope: Option<String>,
        /// Binds `@name` to the grafted root for later steps
        #[serde(default)]
        name: Option<String>,
        /// Edits relative to the grafted root
        #[serde(default)]
        set: Vec<Edit>,
    },
    /// Change text or attributes
    Set(Edit),
    /// Point `at`'s reference at `target`'s identifier
    Refer { at: String, target: String },
    /// Append `<tag reference="…"/>` under `parent`
    Link { parent: String, tag: String, target: String },
    /// Write material and category codes under `at`
    Material {
        at: String,
        material: String,
        category: String,
    },
    /// Embed a file as base64 text
    Picture { at: String, file: PathBuf },
    /// Repair reference order now instead of only at the end
    Repair,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Graft { .. } => "graft",
            Self::Set(_) => "set",
            Self::Refer { .. } => "refer",
            Self::Link { .. } => "link",
            Self::Material { .. } => "material",
            Self::Picture { .. } => "picture",
            Self::Repair => "repair",
        }
    }
}

/// Text and attribute changes at one location
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Edit {
    /// Target; the document element (or the grafted root) when absent
    #[serde(default)]
    pub at: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl Plan {
    /// Parse plan text; relative paths are resolved against `base`
    pub fn parse(text: &str, base: &Path, origin: &str) -> Result<Self, PlanError> {
        let mut plan: Plan = toml::from_str(text).map_err(|source| PlanError::Syntax {
            path: origin.to_string(),
            source,
        })?;
        plan.resolve_paths(base);
        Ok(plan)
    }

    /// Read a plan file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        Self::parse(&text, base, &path.display().to_string())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.host);
        resolve(&mut self.templates);
        if let Some(path) = &mut self.materials {
            resolve(path);
        }
        if let Some(path) = &mut self.output.path {
            resolve(path);
        }
        for step in &mut self.steps {
            if let Step::Picture { file, .. } = step {
                resolve(file);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
host = "host.xml"
templates = "templates"
materials = "/data/materials.csv"

[output]
path = "out.xml"
indent = 0

[repair]
max_swaps = 500

[[step]]
action = "graft"
fragment = "wallInstance"
into = "//facade[@id=\"4\"]/wallInstances/INITIAL"
name = "north"

[[step.set]]
at = "shortDescription"
text = "M1 instance"

[[step]]
action = "link"
parent = "@north/opaqueElement"
tag = "com.example.WallInstance"
target = "@north"

[[step]]
action = "repair"
"#;

    #[test]
    fn test_parse_plan() {
        let plan = Plan::parse(PLAN, Path::new("/work"), "plan.toml").unwrap();

        assert_eq!(plan.host, Path::new("/work/host.xml"));
        assert_eq!(plan.templates, Path::new("/work/templates"));
        assert_eq!(plan.materials.as_deref(), Some(Path::new("/data/materials.csv")));
        assert_eq!(plan.output.path.as_deref(), Some(Path::new("/work/out.xml")));
        assert_eq!(plan.output.serialize_options().indent, None);
        assert!(plan.output.declaration);
        assert_eq!(plan.repair.config().max_swaps, Some(500));
        assert!(plan.repair.detect_cycles);

        assert_eq!(plan.steps.len(), 3);
        match &plan.steps[0] {
            Step::Graft {
                fragment, name, set, scope, ..
            } => {
                assert_eq!(*fragment, FragmentKind::WallInstance);
                assert_eq!(name.as_deref(), Some("north"));
                assert_eq!(scope, &None);
                assert_eq!(set[0].text.as_deref(), Some("M1 instance"));
            }
            other => panic!("expected graft, got {other:?}"),
        }
        assert_eq!(plan.steps[1].action(), "link");
        assert_eq!(plan.steps[2], Step::Repair);
    }

    #[test]
    fn test_defaults() {
        let plan = Plan::parse("host = \"h.xml\"\ntemplates = \"t\"\n", Path::new("."), "p").unwrap();
        assert!(plan.steps.is_empty());
        assert_eq!(plan.output, OutputConfig::default());
        assert_eq!(plan.output.serialize_options(), SerializeOptions::default());
        assert_eq!(plan.repair.config(), RepairConfig::default());
    }

    #[test]
    fn test_rejects_unknown_action() {
        let text = "host = \"h\"\ntemplates = \"t\"\n[[step]]\naction = \"explode\"\n";
        assert!(matches!(
            Plan::parse(text, Path::new("."), "p"),
            Err(PlanError::Syntax { .. })
        ));
    }
}
