//! XML Parser implementation
//!
//! Parses into xml5ever's RcDom and converts the result to our arena tree.

use std::path::Path;

use graft_dom::{Document, DomTree, ElementData, Identifier, IdentifierError, NodeId};
use markup5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use xml5ever::driver::{parse_document, XmlParseOpts};

/// Error reading a document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("<{tag}> has invalid {attr}=\"{value}\"")]
    InvalidIdentifier {
        tag: String,
        attr: &'static str,
        value: String,
        #[source]
        source: IdentifierError,
    },

    #[error("{origin} has no document element")]
    Empty { origin: String },
}

/// XML parser
#[derive(Debug, Clone, Copy)]
pub struct XmlParser {
    keep_comments: bool,
}

impl XmlParser {
    /// Create a parser that keeps comments
    pub fn new() -> Self {
        Self { keep_comments: true }
    }

    /// Drop comments while converting
    pub fn without_comments(mut self) -> Self {
        self.keep_comments = false;
        self
    }

    /// Parse an XML string
    pub fn parse(&self, xml: &str) -> Result<Document, ParseError> {
        self.parse_with_origin(xml, "<string>")
    }

    /// Parse an XML string, labelling the document with where it came from
    pub fn parse_with_origin(&self, xml: &str, origin: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing XML document: {}", origin);

        let dom = parse_document(RcDom::default(), XmlParseOpts::default())
            .from_utf8()
            .read_from(&mut xml.as_bytes())
            .map_err(|source| ParseError::Io {
                path: origin.to_string(),
                source,
            })?;

        let mut document = Document::empty(origin);
        self.convert_node(&dom.document, document.tree_mut(), NodeId::ROOT)?;

        if document.document_element().is_none() {
            return Err(ParseError::Empty {
                origin: origin.to_string(),
            });
        }

        tracing::debug!("Parsed {} elements", document.element_count());
        Ok(document)
    }

    /// Read and parse a file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Document, ParseError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.parse_with_origin(&xml, &path.display().to_string())
    }

    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<(), ParseError> {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
            }
            RcNodeData::Element { name, attrs, .. } => {
                let mut elem = ElementData::new(qualified(name.prefix.as_deref(), &name.local));

                for attr in attrs.borrow().iter() {
                    let attr_name = qualified(attr.name.prefix.as_deref(), &attr.name.local);
                    let value = attr.value.to_string();
                    match attr_name.as_str() {
                        "id" => elem.id = Some(identifier(&elem.tag, "id", value)?),
                        "reference" => elem.reference = Some(identifier(&elem.tag, "reference", value)?),
                        "class" => elem.class = Some(value),
                        _ => elem.set_attr(attr_name, value),
                    }
                }

                let id = tree.create_element_with(elem);
                tree.append_child(parent, id);

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                if !text.trim().is_empty() {
                    if let Some(elem) = tree.element_mut(parent) {
                        elem.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            RcNodeData::Comment { contents } => {
                if self.keep_comments {
                    let id = tree.create_comment(contents);
                    tree.append_child(parent, id);
                }
            }
            // The XML declaration arrives as a processing instruction
            RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

fn identifier(tag: &str, attr: &'static str, value: String) -> Result<Identifier, ParseError> {
    value.parse().map_err(|source| ParseError::InvalidIdentifier {
        tag: tag.to_string(),
        attr,
        value,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifiers() {
        let doc = XmlParser::new()
            .parse(r#"<audit id="1"><wall id="2" class="x.Wall"/><use reference="2"/></audit>"#)
            .unwrap();

        let elems: Vec<_> = doc.elements().map(|(_, e)| e.clone()).collect();
        assert_eq!(elems.len(), 3);
        assert_eq!(elems[0].tag, "audit");
        assert_eq!(elems[0].id, Some(Identifier(1)));
        assert_eq!(elems[1].class.as_deref(), Some("x.Wall"));
        assert_eq!(elems[2].reference, Some(Identifier(2)));
        assert!(elems[2].attrs.is_empty());
    }

    #[test]
    fn test_whitespace_text_dropped() {
        let doc = XmlParser::new()
            .parse("<a>\n  <b>  hello </b>\n  <c/>\n</a>")
            .unwrap();

        let a = doc.document_element().unwrap();
        assert_eq!(doc.element(a).unwrap().text, None);
        let b = doc.find("b").unwrap().unwrap();
        assert_eq!(doc.element(b).unwrap().text.as_deref(), Some("  hello "));
    }

    #[test]
    fn test_entities_decoded() {
        let doc = XmlParser::new()
            .parse(r#"<a note="x &amp; y">1 &lt; 2</a>"#)
            .unwrap();
        let a = doc.element(doc.document_element().unwrap()).unwrap();
        assert_eq!(a.attr("note").as_deref(), Some("x & y"));
        assert_eq!(a.text.as_deref(), Some("1 < 2"));
    }

    #[test]
    fn test_declaration_and_comments() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- header --><a/>";
        let doc = XmlParser::new().parse(xml).unwrap();
        assert_eq!(doc.element(doc.document_element().unwrap()).unwrap().tag, "a");
        assert_eq!(doc.tree().children(NodeId::ROOT).count(), 2);

        let bare = XmlParser::new().without_comments().parse(xml).unwrap();
        assert_eq!(bare.tree().children(NodeId::ROOT).count(), 1);
    }

    #[test]
    fn test_invalid_identifier() {
        let err = XmlParser::new().parse(r#"<a id="seven"/>"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidIdentifier { attr: "id", .. }));

        let err = XmlParser::new().parse(r#"<a><b reference="0"/></a>"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidIdentifier {
                attr: "reference",
                source: IdentifierError::Zero,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let err = XmlParser::new().parse("   ").unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }
}
