//! graft core - identifier allocation and reference consistency
//!
//! Splices self-contained fragments into a host document while keeping
//! three properties of the host:
//!
//! - every `id` is unique
//! - every `reference` names an existing `id`
//! - every `reference` appears after the element it names (once
//!   [`repair_order`] has run)
//!
//! # Example
//! ```rust,ignore
//! use graft_core::{graft_fragment, repair_order, rebase, Attachment, RepairConfig};
//!
//! let graft = graft_fragment(&mut host, fragment, &Attachment::path("wallPlanes/INITIAL")?)?;
//! repair_order(&mut host, &RepairConfig::default())?;
//! rebase(&mut host)?;
//! ```
//!
//! Every renumbering pass walks the whole host, so assembling `n` fragments
//! costs O(n · document size). Documents of a few dozen fragments are the
//! intended scale.

mod error;
mod graft;
mod index;
mod renumber;
mod repair;
mod verify;

pub use error::{AssemblyError, Result};
pub use graft::{append_reference, graft_fragment, graft_fragment_with, Attachment, Graft, GraftOptions};
pub use index::{highest_id, IdentifierIndex};
pub use renumber::{rebase, renumber_fragment, renumber_subtree, shift_host_from, ShiftReport};
pub use repair::{find_reference_cycle, repair_order, RepairConfig, RepairReport};
pub use verify::{verify, violations, Violation};

pub use graft_dom::{Document, Identifier, NodeId};
