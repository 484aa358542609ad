//! Assembly errors

use graft_dom::{Identifier, PathError};

/// Result type for assembly operations
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Assembly errors
///
/// None of these are recoverable inside the core; the document is left in
/// whatever state the failing operation reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("{path} carries no identifier")]
    MissingIdentifier { path: String },

    #[error("reference {reference} at {path} names no element")]
    DanglingReference { reference: Identifier, path: String },

    #[error("reference cycle at {path} through [{}] after {swaps} swaps", join(.chain))]
    ReferenceCycle {
        path: String,
        chain: Vec<Identifier>,
        swaps: usize,
    },

    #[error("attachment point {location} not found")]
    AttachmentNotFound { location: String },

    #[error("identifier {id} at {path} already used at {first}")]
    DuplicateIdentifier {
        id: Identifier,
        path: String,
        first: String,
    },

    #[error("reference {reference} at {path} precedes its target at {target}")]
    ForwardReference {
        reference: Identifier,
        path: String,
        target: String,
    },

    #[error("cannot move identifiers from {threshold} down to {start}")]
    InvalidShift { threshold: u32, start: Identifier },

    #[error("{count} identifiers from {start} do not fit in 32 bits")]
    IdentifierOverflow { start: Identifier, count: usize },

    #[error("{target} cannot be moved ahead of {path}, which encloses it")]
    NestedReference { path: String, target: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

fn join(chain: &[Identifier]) -> String {
    chain
        .iter()
        .map(Identifier::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
