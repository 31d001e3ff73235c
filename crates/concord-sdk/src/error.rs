use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("schema error: {0}")]
    Schema(#[from] concord_schema::SchemaError),

    #[error("adapter error: {0}")]
    Diff(#[from] concord_diff::DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] concord_merge::MergeError),

    #[error("store error: {0}")]
    Store(#[from] concord_store::StoreError),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
