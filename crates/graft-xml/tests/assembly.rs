//! Parse, assemble and write documents end to end

use graft_core::{
    graft_fragment, graft_fragment_with, repair_order, verify, violations, Attachment, GraftOptions, RepairConfig,
};
use graft_dom::Identifier;
use graft_xml::{parse, to_xml, SerializeOptions};

const HOST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<audit id="1">
  <walls id="2">
    <INITIAL id="3"/>
  </walls>
  <facades id="4"/>
  <owner reference="4"/>
</audit>
"#;

const WALL_INSTANCE: &str = r#"<wallInstance id="1">
  <name>north</name>
  <wallType reference="1"/>
  <layers id="2" class="java.util.ArrayList"/>
</wallInstance>
"#;

// ============================================================================
// ASSEMBLY
// ============================================================================

#[test]
fn test_graft_parsed_fragment() {
    let mut host = parse(HOST).unwrap();
    let fragment = parse(WALL_INSTANCE).unwrap();

    let walls = host.find("/audit/walls").unwrap().unwrap();
    let options = GraftOptions { scope: Some(walls) };
    let graft = graft_fragment_with(&mut host, fragment, &Attachment::Node(walls), &options).unwrap();
    assert_eq!(graft.root_id, Identifier(4));
    assert_eq!(graft.last_id, Identifier(5));

    // Facades moved past the fragment's range and its user followed
    let facades = host.find("facades").unwrap().unwrap();
    assert_eq!(host.element(facades).unwrap().id, Some(Identifier(6)));
    let owner = host.find("owner").unwrap().unwrap();
    assert_eq!(host.element(owner).unwrap().reference, Some(Identifier(6)));
    let own_type = host.find_from(graft.node, "wallType").unwrap().unwrap();
    assert_eq!(host.element(own_type).unwrap().reference, Some(Identifier(4)));

    repair_order(&mut host, &RepairConfig::default()).unwrap();
    assert_eq!(verify(&host), Ok(()));
}

#[test]
fn test_output_reparses_identically() {
    let mut host = parse(HOST).unwrap();
    let fragment = parse(WALL_INSTANCE).unwrap();
    graft_fragment(&mut host, fragment, &Attachment::path("facades").unwrap()).unwrap();

    let xml = to_xml(&host, &SerializeOptions::default()).unwrap();
    let reparsed = parse(&xml).unwrap();

    let before: Vec<_> = host.elements().map(|(_, e)| e.clone()).collect();
    let after: Vec<_> = reparsed.elements().map(|(_, e)| e.clone()).collect();
    assert_eq!(before, after);
    assert!(violations(&reparsed).is_empty());
}

#[test]
fn test_forward_reference_in_file_is_repaired() {
    let xml = r#"<audit id="1"><user reference="3"/><a id="2"/><b id="3"/></audit>"#;
    let mut doc = parse(xml).unwrap();
    assert!(!violations(&doc).is_empty());

    repair_order(&mut doc, &RepairConfig::default()).unwrap();
    let out = to_xml(
        &doc,
        &SerializeOptions {
            indent: None,
            declaration: false,
        },
    )
    .unwrap();
    assert!(out.find(r#"id="3""#).unwrap() < out.find(r#"reference="3""#).unwrap(), "{out}");
    // Tags stayed with their positions
    assert!(out.starts_with(r#"<audit id="1"><user id="3">"#), "{out}");
}
