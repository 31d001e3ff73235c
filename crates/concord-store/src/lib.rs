//! Annotation collections and the shared document model for Concord.
//!
//! Every annotator's work and the curation target are held as
//! [`AnnotationSet`]s: arenas of [`Annotation`]s addressed by stable
//! [`AnnotationId`](concord_types::AnnotationId) handles. Relations and links
//! reference other annotations of the same set by handle, never by pointer,
//! so no collection owns cycles.
//!
//! # Design Rules
//!
//! 1. Annotator sets are read-only inputs once added to a [`Document`].
//! 2. The target set is the only collection mutated by a merge.
//! 3. Handles are never reused while the set lives; removal leaves a hole.
//! 4. Persistence belongs to the caller; this crate performs no I/O.

pub mod annotation;
pub mod document;
pub mod error;
pub mod set;

pub use annotation::{Anchor, Annotation, Link};
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use set::AnnotationSet;
