//! graft - Document Assembly
//!
//! Runs assembly plans: a host document, a directory of fragment
//! templates and an ordered list of steps that graft, edit and link
//! elements before the result is repaired, verified and written.

pub mod executor;
pub mod locator;
pub mod materials;
pub mod picture;
pub mod plan;
pub mod templates;

pub use executor::{Assembler, Outcome};
pub use locator::Locator;
pub use materials::{Material, MaterialTable, TableError};
pub use plan::{Edit, OutputConfig, Plan, PlanError, RepairSection, Step};
pub use templates::{FragmentKind, TemplateRegistry};
