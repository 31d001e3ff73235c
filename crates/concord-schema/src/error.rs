//! Error types for the schema crate.

/// Errors raised while building or validating a schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema is internally inconsistent. This indicates a configuration
    /// bug upstream, not a data conflict.
    #[error("unsupported configuration of layer '{layer}': {reason}")]
    UnsupportedLayerConfiguration { layer: String, reason: String },

    /// A layer was referenced that the schema does not declare.
    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    /// The TOML document could not be parsed.
    #[error("invalid schema document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The schema could not be rendered as TOML.
    #[error("schema serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl SchemaError {
    /// Create an unsupported-configuration error for a layer.
    pub fn unsupported(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedLayerConfiguration {
            layer: layer.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
