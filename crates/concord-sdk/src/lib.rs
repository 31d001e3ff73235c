//! High-level SDK for Concord.
//!
//! A [`CurationSession`] owns one document with its annotator collections and
//! curation target, diffs the collections, and merges the material a
//! strategy selects. This is the main entry point for applications
//! embedding Concord.

pub mod config;
pub mod error;
pub mod report;
pub mod session;

pub use config::{CurationConfig, StrategyConfig};
pub use error::{SdkError, SdkResult};
pub use report::{ConfigurationEntry, DiffReport, PositionEntry};
pub use session::CurationSession;

// Re-export key types
pub use concord_types::{AnnotationId, AnnotatorId, DocumentId, Offsets};
pub use concord_schema::{Layer, LinkCompareBehavior, Schema};
pub use concord_store::{Annotation, AnnotationSet, Document, Link};
pub use concord_diff::{Classification, DiffResult, DiffSummary, Position};
pub use concord_merge::{MergeError, MergeReport, MergeStrategy};
