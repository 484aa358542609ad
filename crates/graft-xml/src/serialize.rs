//! XML Writer
//!
//! Feeds the arena tree through xml5ever's serializer.

use std::io;
use std::path::Path;

use graft_dom::{Document, NodeData, NodeId};
use markup5ever::serialize::{Serialize, Serializer, TraversalScope};
use markup5ever::{LocalName, Namespace, QualName};
use xml5ever::serialize::{serialize, SerializeOpts};

/// Output formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Spaces per nesting level; `None` writes everything on one line
    pub indent: Option<usize>,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` first
    pub declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }
}

/// Error writing a document
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("failed to write {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("serializer produced invalid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render a document as XML text
pub fn to_xml(doc: &Document, options: &SerializeOptions) -> Result<String, SerializeError> {
    let mut buf = Vec::new();
    let view = XmlView { doc, options };
    serialize(
        &mut buf,
        &view,
        SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
        },
    )
    .map_err(|source| SerializeError::Io {
        path: doc.source().to_string(),
        source,
    })?;
    if options.indent.is_some() {
        buf.push(b'\n');
    }
    Ok(String::from_utf8(buf)?)
}

/// Render a document and write it to a file
pub fn write_file(doc: &Document, path: impl AsRef<Path>, options: &SerializeOptions) -> Result<(), SerializeError> {
    let path = path.as_ref();
    let xml = to_xml(doc, options)?;
    std::fs::write(path, xml).map_err(|source| SerializeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!("Wrote {} elements to {}", doc.element_count(), path.display());
    Ok(())
}

struct XmlView<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
}

impl XmlView<'_> {
    fn newline<S: Serializer>(&self, serializer: &mut S, depth: usize) -> io::Result<()> {
        match self.options.indent {
            Some(width) => serializer.write_text(&format!("\n{}", " ".repeat(width * depth))),
            None => Ok(()),
        }
    }

    /// Write `id` and its subtree; `pretty` is off below any element with
    /// text, where added whitespace would change the text on reparse
    fn write_node<S: Serializer>(
        &self,
        serializer: &mut S,
        id: NodeId,
        depth: usize,
        pretty: bool,
    ) -> io::Result<()> {
        let tree = self.doc.tree();
        let Some(node) = tree.get(id) else {
            return Ok(());
        };

        match &node.data {
            NodeData::Element(elem) => {
                let name = qual_name(&elem.tag);

                // Typed attributes first, then the rest in source order
                let mut attrs: Vec<(QualName, String)> = Vec::with_capacity(elem.attrs.len() + 3);
                if let Some(value) = elem.id {
                    attrs.push((qual_name("id"), value.to_string()));
                }
                if let Some(value) = &elem.class {
                    attrs.push((qual_name("class"), value.clone()));
                }
                if let Some(value) = elem.reference {
                    attrs.push((qual_name("reference"), value.to_string()));
                }
                for attr in &elem.attrs {
                    attrs.push((qual_name(&attr.name), attr.value.clone()));
                }

                serializer.start_elem(name.clone(), attrs.iter().map(|(n, v)| (n, v.as_str())))?;
                if let Some(text) = &elem.text {
                    serializer.write_text(text)?;
                }

                let pretty = pretty && elem.text.is_none();
                let mut nested = false;
                for (child, _) in tree.children(id) {
                    nested = true;
                    if pretty {
                        self.newline(serializer, depth + 1)?;
                    }
                    self.write_node(serializer, child, depth + 1, pretty)?;
                }
                if nested && pretty {
                    self.newline(serializer, depth)?;
                }
                serializer.end_elem(name)
            }
            NodeData::Comment(text) => serializer.write_comment(text),
            NodeData::Document => Ok(()),
        }
    }
}

impl Serialize for XmlView<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, _scope: TraversalScope) -> io::Result<()> {
        let mut first = true;
        if self.options.declaration {
            serializer.write_processing_instruction("xml", r#"version="1.0" encoding="UTF-8""#)?;
            first = false;
        }
        for (child, _) in self.doc.tree().children(NodeId::ROOT) {
            if !first {
                self.newline(serializer, 0)?;
            }
            first = false;
            self.write_node(serializer, child, 0, true)?;
        }
        Ok(())
    }
}

fn qual_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}
