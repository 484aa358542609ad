//! graft XML
//!
//! Reads XML text into graft documents and writes them back.
//! Built on xml5ever.

mod parser;
mod serialize;

pub use parser::{ParseError, XmlParser};
pub use serialize::{to_xml, write_file, SerializeError, SerializeOptions};

use graft_dom::Document;

/// Parse an XML string into a document
pub fn parse(xml: &str) -> Result<Document, ParseError> {
    XmlParser::new().parse(xml)
}
