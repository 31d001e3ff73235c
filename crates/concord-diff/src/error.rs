//! Error types for the diff crate.
//!
//! Diffing itself is infallible. Errors only arise while adapters are built
//! from a schema, before any annotation is read.

use concord_schema::SchemaError;

/// Errors raised while preparing layer adapters.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The schema rejected a layer configuration.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A requested layer is not declared in the schema.
    #[error("layer '{0}' is not declared in the schema")]
    UnknownLayer(String),

    /// A relation layer was adapted without the layers it connects.
    #[error("relation layer '{relation}' requires endpoint layer '{endpoint}' to be adapted too")]
    MissingEndpointLayer { relation: String, endpoint: String },
}

/// Convenience alias for adapter construction.
pub type AdapterResult<T> = Result<T, DiffError>;
