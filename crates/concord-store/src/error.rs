use concord_types::{AnnotationId, AnnotatorId, Offsets};

/// Errors from annotation collection operations.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The requested annotation was not found.
    #[error("annotation not found: {0}")]
    NotFound(AnnotationId),

    /// A relation endpoint or link target points at a missing annotation.
    #[error("annotation {annotation} references missing annotation {reference}")]
    DanglingReference {
        annotation: AnnotationId,
        reference: AnnotationId,
    },

    /// A span lies outside the document text.
    #[error("annotation {annotation} at {offsets} exceeds the document length {len}")]
    OutOfBounds {
        annotation: AnnotationId,
        offsets: Offsets,
        len: usize,
    },

    /// The annotation does not have the anchor an operation requires.
    #[error("annotation {annotation} is not a {expected} annotation")]
    AnchorMismatch {
        annotation: AnnotationId,
        expected: &'static str,
    },

    /// The annotator already contributed a collection to the document.
    #[error("duplicate annotator: {0}")]
    DuplicateAnnotator(AnnotatorId),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
