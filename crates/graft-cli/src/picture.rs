//! Picture embedding
//!
//! Pictures are stored as standard base64 text on an element marked with
//! the image class.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use graft_dom::{Document, NodeId};

use crate::plan::PlanError;

pub const IMAGE_CLASS: &str = "java.awt.image.BufferedImage";

/// Base64 of a file's bytes
pub fn encode_file(path: &Path) -> Result<String, PlanError> {
    let bytes = std::fs::read(path).map_err(|source| PlanError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}

/// Replace an element's text with the encoded file and mark its class
pub fn embed(doc: &mut Document, node: NodeId, path: &Path) -> Result<(), PlanError> {
    let encoded = encode_file(path)?;
    let target = doc.path_of(node);
    let elem = doc
        .element_mut(node)
        .ok_or(PlanError::NotAnElement { target })?;

    tracing::debug!("Embedding {} ({} base64 bytes)", path.display(), encoded.len());
    elem.class = Some(IMAGE_CLASS.to_string());
    elem.text = Some(encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("front.png");
        std::fs::write(&file, b"\x89PNG\r\n").unwrap();

        let mut doc = graft_xml::parse("<imageInitial><INITIAL/></imageInitial>").unwrap();
        let slot = doc.find("INITIAL").unwrap().unwrap();
        embed(&mut doc, slot, &file).unwrap();

        let elem = doc.element(slot).unwrap();
        assert_eq!(elem.class.as_deref(), Some(IMAGE_CLASS));
        assert_eq!(elem.text.as_deref(), Some("iVBORw0K"));
    }

    #[test]
    fn test_missing_file() {
        let mut doc = Document::new("a");
        let root = doc.document_element().unwrap();
        let err = embed(&mut doc, root, Path::new("/nonexistent/picture.png")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }
}
