use thiserror::Error;

/// Errors surfaced by the decomposition, relational algebra and maintenance
/// layers. All of them are fatal to the operation that raised them.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("hypergraph is not acyclic: the marshals have no winning strategy")]
    DecompositionFailure,

    #[error("attribute '{0}' is not present in the projected relation")]
    MissingAttribute(String),

    #[error("{path}:{line}: row has {found} values, header declares {expected}")]
    ArityMismatch {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("relation '{relation}' carries no index on [{key}]")]
    MissingIndex { relation: String, key: String },

    #[error("relation '{0}' is not present in the catalog")]
    UnknownRelation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
