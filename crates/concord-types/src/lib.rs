//! Foundation types for Concord.
//!
//! This crate provides the identifier and offset types shared by every other
//! Concord crate.
//!
//! # Key Types
//!
//! - [`AnnotatorId`] — One independent source of annotations
//! - [`DocumentId`] — The shared document all annotators worked on
//! - [`AnnotationId`] — Stable arena handle of an annotation within one collection
//! - [`Offsets`] — Half-open character range `[begin, end)` over the document text

pub mod error;
pub mod ids;
pub mod offsets;

pub use error::TypeError;
pub use ids::{AnnotationId, AnnotatorId, DocumentId};
pub use offsets::Offsets;
