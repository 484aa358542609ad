//! Plan execution
//!
//! Loads the host, runs every step in order, then repairs, verifies and
//! rebases the result. Nothing is written here; a failed run leaves no
//! output behind.

use graft_core::{
    append_reference, graft_fragment_with, rebase, repair_order, verify, Attachment, GraftOptions, RepairReport,
    ShiftReport,
};
use graft_dom::{Document, Identifier, NodeId};
use graft_xml::XmlParser;

use crate::locator::{Bindings, Locator};
use crate::materials::MaterialTable;
use crate::picture;
use crate::plan::{Edit, Plan, PlanError, Step};
use crate::templates::TemplateRegistry;

/// Child tags receiving the material and category codes
const MATERIAL_ID_TAG: &str = "id";
const MATERIAL_GROUP_TAG: &str = "materialGroupId";

/// A finished document and what it took to build it
#[derive(Debug)]
pub struct Outcome {
    pub document: Document,
    pub grafts: usize,
    pub repair: RepairReport,
    pub rebase: ShiftReport,
}

/// Runs one plan
#[derive(Debug)]
pub struct Assembler {
    plan: Plan,
    templates: TemplateRegistry,
    materials: Option<MaterialTable>,
    names: Bindings,
    grafts: usize,
}

impl Assembler {
    /// Prepare a plan, loading its material table if it names one
    pub fn new(plan: Plan) -> Result<Self, PlanError> {
        let materials = plan.materials.as_ref().map(MaterialTable::load).transpose()?;
        Ok(Self {
            templates: TemplateRegistry::new(&plan.templates),
            plan,
            materials,
            names: Bindings::new(),
            grafts: 0,
        })
    }

    /// Load the host document and assemble it
    pub fn run(self) -> Result<Outcome, PlanError> {
        let host = XmlParser::new().parse_file(&self.plan.host)?;
        self.assemble(host)
    }

    /// Assemble an already loaded host document
    pub fn assemble(mut self, mut doc: Document) -> Result<Outcome, PlanError> {
        tracing::info!("Assembling {} with {} steps", doc.source(), self.plan.steps.len());

        let steps = std::mem::take(&mut self.plan.steps);
        for (index, step) in steps.iter().enumerate() {
            self.apply(&mut doc, step).map_err(|source| PlanError::Step {
                index: index + 1,
                action: step.action(),
                source: Box::new(source),
            })?;
        }

        let repair = repair_order(&mut doc, &self.plan.repair.config())?;
        verify(&doc)?;
        let rebase = rebase(&mut doc)?;

        tracing::info!(
            "Assembled {} elements ({} grafts, {} swaps)",
            doc.element_count(),
            self.grafts,
            repair.swaps
        );
        Ok(Outcome {
            document: doc,
            grafts: self.grafts,
            repair,
            rebase,
        })
    }

    fn apply(&mut self, doc: &mut Document, step: &Step) -> Result<(), PlanError> {
        match step {
            Step::Graft {
                fragment,
                into,
                scope,
                name,
                set,
            } => {
                let attachment = match into.parse::<Locator>()? {
                    Locator::Path(path) => Attachment::Path(path),
                    named => Attachment::Node(named.resolve(doc, &self.names)?),
                };
                let scope = scope
                    .as_deref()
                    .map(|scope| scope.parse::<Locator>()?.resolve(doc, &self.names))
                    .transpose()?;

                let template = self.templates.load(*fragment)?;
                let graft = graft_fragment_with(doc, template, &attachment, &GraftOptions { scope })?;
                self.grafts += 1;
                tracing::debug!(
                    "Grafted {} at {} as {}..={}",
                    fragment,
                    doc.path_of(graft.node),
                    graft.root_id,
                    graft.last_id
                );

                for edit in set {
                    apply_edit(doc, edit, graft.node, &self.names)?;
                }
                if let Some(name) = name {
                    if self.names.insert(name.clone(), graft.node).is_some() {
                        tracing::warn!("@{} rebound to a later graft", name);
                    }
                }
            }
            Step::Set(edit) => apply_edit(doc, edit, NodeId::ROOT, &self.names)?,
            Step::Refer { at, target } => {
                let node = at.parse::<Locator>()?.resolve(doc, &self.names)?;
                let id = identifier_of(doc, target, &self.names)?;
                element_mut(doc, node)?.reference = Some(id);
            }
            Step::Link { parent, tag, target } => {
                let parent = parent.parse::<Locator>()?.resolve(doc, &self.names)?;
                let id = identifier_of(doc, target, &self.names)?;
                append_reference(doc, parent, tag, id)?;
            }
            Step::Material {
                at,
                material,
                category,
            } => {
                let table = self.materials.as_ref().ok_or(PlanError::NoMaterials)?;
                let (material_id, category_id) = table.codes(material, category)?;
                let node = at.parse::<Locator>()?.resolve(doc, &self.names)?;
                set_child_text(doc, node, MATERIAL_ID_TAG, material_id);
                set_child_text(doc, node, MATERIAL_GROUP_TAG, category_id);
            }
            Step::Picture { at, file } => {
                let node = at.parse::<Locator>()?.resolve(doc, &self.names)?;
                picture::embed(doc, node, file)?;
            }
            Step::Repair => {
                repair_order(doc, &self.plan.repair.config())?;
            }
        }
        Ok(())
    }
}

/// Apply an edit at a location relative to `origin`
///
/// Without a location the edit applies to `origin` itself, or to the
/// document element when the origin is the document node.
fn apply_edit(doc: &mut Document, edit: &Edit, origin: NodeId, names: &Bindings) -> Result<(), PlanError> {
    let node = match &edit.at {
        Some(at) => at.parse::<Locator>()?.resolve_from(doc, origin, names)?,
        None if origin == NodeId::ROOT => doc
            .document_element()
            .ok_or_else(|| PlanError::NotFound(doc.source().to_string()))?,
        None => origin,
    };

    let elem = element_mut(doc, node)?;
    if let Some(text) = &edit.text {
        elem.text = (!text.is_empty()).then(|| text.clone());
    }
    for (name, value) in &edit.attrs {
        match name.as_str() {
            "id" => elem.id = Some(parse_identifier(name, value)?),
            "reference" => elem.reference = Some(parse_identifier(name, value)?),
            "class" => elem.class = Some(value.clone()),
            _ => elem.set_attr(name.clone(), value.clone()),
        }
    }
    for name in &edit.remove {
        match name.as_str() {
            "id" => elem.id = None,
            "reference" => elem.reference = None,
            "class" => elem.class = None,
            _ => {
                if elem.remove_attr(name).is_none() {
                    tracing::warn!("no {} attribute to remove on <{}>", name, elem.tag);
                }
            }
        }
    }
    Ok(())
}

fn element_mut(doc: &mut Document, node: NodeId) -> Result<&mut graft_dom::ElementData, PlanError> {
    let target = doc.path_of(node);
    doc.element_mut(node).ok_or(PlanError::NotAnElement { target })
}

fn identifier_of(doc: &Document, locator: &str, names: &Bindings) -> Result<Identifier, PlanError> {
    let node = locator.parse::<Locator>()?.resolve(doc, names)?;
    doc.element(node)
        .and_then(|elem| elem.id)
        .ok_or_else(|| PlanError::NoIdentifier(locator.to_string()))
}

fn parse_identifier(attr: &str, value: &str) -> Result<Identifier, PlanError> {
    value.parse().map_err(|source| PlanError::InvalidIdentifier {
        attr: attr.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Set the text of the first child with `tag`, creating it if needed
fn set_child_text(doc: &mut Document, parent: NodeId, tag: &str, text: &str) {
    let existing = doc
        .tree()
        .children(parent)
        .find(|(_, node)| node.as_element().is_some_and(|elem| elem.tag == tag))
        .map(|(id, _)| id);

    let child = existing.unwrap_or_else(|| {
        let child = doc.tree_mut().create_element(tag);
        doc.tree_mut().append_child(parent, child);
        child
    });
    if let Some(elem) = doc.element_mut(child) {
        elem.text = Some(text.to_string());
    }
}
