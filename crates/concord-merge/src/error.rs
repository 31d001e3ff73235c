use concord_diff::Position;
use concord_store::StoreError;
use concord_types::{AnnotatorId, Offsets};

/// Why a merge operation was rejected.
///
/// Rejections are either skippable (the target already holds the material)
/// or fatal for the operation. Neither kind aborts a merge pass; see
/// [`MergeError::is_configuration_error`] for the one that can.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The target already has a feature-equal annotation at the position.
    #[error("layer '{layer}': a feature-equal annotation already exists at {position}")]
    AnnotationAlreadyExists { layer: String, position: Position },

    /// Several equally positioned target annotations match an endpoint, host
    /// or link target; a human has to pick one.
    #[error("layer '{layer}': {count} stacked candidates at {position}, cannot choose one")]
    AmbiguousTargetCandidates {
        layer: String,
        position: Position,
        count: usize,
    },

    /// An endpoint, host or link target has no counterpart in the target.
    #[error("layer '{layer}': no counterpart in the target for {endpoint}")]
    MissingEndpoint { layer: String, endpoint: Position },

    /// The target host already carries an equal link.
    #[error("layer '{layer}': link {link} is already merged")]
    AlreadyMerged { layer: String, link: Position },

    /// The schema cannot express the requested operation.
    #[error("layer '{layer}': unsupported configuration: {reason}")]
    UnsupportedLayerConfiguration { layer: String, reason: String },

    /// A new span would partially overlap an existing one on a layer that
    /// forbids partial overlap.
    #[error("layer '{layer}': {offsets} partially overlaps existing {existing}")]
    OverlapConflict {
        layer: String,
        offsets: Offsets,
        existing: Offsets,
    },

    /// The source anchor cannot be placed in the target document.
    #[error("layer '{layer}': invalid anchor: {reason}")]
    InvalidAnchor { layer: String, reason: String },

    /// The named annotator contributed no collection to the document.
    #[error("unknown source annotator: {0}")]
    UnknownAnnotator(AnnotatorId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl MergeError {
    pub(crate) fn unsupported(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedLayerConfiguration {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_anchor(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAnchor {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` unless the rejection only means the material is
    /// already present.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::AnnotationAlreadyExists { .. } | Self::AlreadyMerged { .. }
        )
    }

    /// Returns `true` for schema inconsistencies.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::UnsupportedLayerConfiguration { .. })
    }

    /// Stable snake-case name of the variant, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnnotationAlreadyExists { .. } => "annotation_already_exists",
            Self::AmbiguousTargetCandidates { .. } => "ambiguous_target_candidates",
            Self::MissingEndpoint { .. } => "missing_endpoint",
            Self::AlreadyMerged { .. } => "already_merged",
            Self::UnsupportedLayerConfiguration { .. } => "unsupported_layer_configuration",
            Self::OverlapConflict { .. } => "overlap_conflict",
            Self::InvalidAnchor { .. } => "invalid_anchor",
            Self::UnknownAnnotator(_) => "unknown_annotator",
            Self::Store(_) => "store",
        }
    }
}

pub type MergeResult<T> = Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position::span("pos", Offsets::new(0, 4).unwrap())
    }

    #[test]
    fn skippable_rejections_are_not_fatal() {
        let exists = MergeError::AnnotationAlreadyExists {
            layer: "pos".into(),
            position: position(),
        };
        let merged = MergeError::AlreadyMerged {
            layer: "event".into(),
            link: position(),
        };
        assert!(!exists.is_fatal());
        assert!(!merged.is_fatal());
        assert!(MergeError::MissingEndpoint {
            layer: "dep".into(),
            endpoint: position()
        }
        .is_fatal());
    }

    #[test]
    fn configuration_errors_are_flagged() {
        let err = MergeError::unsupported("pos", "not a relation layer");
        assert!(err.is_configuration_error());
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "unsupported_layer_configuration");
        assert_eq!(
            err.to_string(),
            "layer 'pos': unsupported configuration: not a relation layer"
        );
    }

    #[test]
    fn ambiguity_message_names_the_count() {
        let err = MergeError::AmbiguousTargetCandidates {
            layer: "dep".into(),
            position: position(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "layer 'dep': 2 stacked candidates at pos[0, 4), cannot choose one"
        );
    }
}
