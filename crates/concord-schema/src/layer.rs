//! Layer declarations: structural kind, anchoring and overlap policy.

use serde::{Deserialize, Serialize};

use crate::feature::{CompareBehavior, FeatureSpec, LinkSpec};

/// Structural type of a layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    /// Annotations anchored on a character range.
    Span,
    /// Annotations connecting two span-like annotations.
    Relation {
        source_layer: String,
        target_layer: String,
    },
    /// Span annotations that host link (slot) features.
    LinkHost,
    /// Whole-document annotations (document labels).
    Document {
        #[serde(default)]
        singleton: bool,
    },
}

impl LayerKind {
    /// Returns `true` for layers anchored on character offsets.
    pub fn is_span_like(&self) -> bool {
        matches!(self, Self::Span | Self::LinkHost)
    }

    /// Ordering rank used by the engines: document labels first, then spans,
    /// then relations, whose positions depend on span positions.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Document { .. } => 0,
            Self::Span | Self::LinkHost => 1,
            Self::Relation { .. } => 2,
        }
    }

    /// Short kind name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Relation { .. } => "relation",
            Self::LinkHost => "link-host",
            Self::Document { .. } => "document",
        }
    }
}

/// Anchoring granularity of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchoring {
    /// Offsets are used as given.
    CharacterExact,
    /// Offsets snap outward to token boundaries when copied.
    TokenAligned,
    /// The annotation covers the whole document.
    WholeDocument,
}

/// Overlap and stacking policy of a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Neither partial overlap nor stacking.
    #[default]
    NoOverlap,
    /// Partial overlap, but no two annotations at an equal position.
    OverlapOnly,
    /// Stacking at an equal position, but no partial overlap.
    StackingOnly,
    /// Anything goes.
    AnyOverlap,
}

impl OverlapMode {
    /// Whether several annotations may share an equal position.
    pub fn allows_stacking(&self) -> bool {
        matches!(self, Self::StackingOnly | Self::AnyOverlap)
    }

    /// Whether annotations may partially overlap.
    pub fn allows_partial_overlap(&self) -> bool {
        matches!(self, Self::OverlapOnly | Self::AnyOverlap)
    }
}

/// Schema of one annotation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    /// Explicit anchoring; when absent the kind's default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchoring: Option<Anchoring>,
    #[serde(default)]
    pub overlap: OverlapMode,
    #[serde(default)]
    pub features: Vec<FeatureSpec>,
}

impl Layer {
    fn with_kind(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            anchoring: None,
            overlap: OverlapMode::default(),
            features: Vec::new(),
        }
    }

    /// A character-anchored span layer.
    pub fn span(name: impl Into<String>) -> Self {
        Self::with_kind(name, LayerKind::Span)
    }

    /// A span layer hosting link features.
    pub fn link_host(name: impl Into<String>) -> Self {
        Self::with_kind(name, LayerKind::LinkHost)
    }

    /// A relation layer between two span-like layers.
    pub fn relation(
        name: impl Into<String>,
        source_layer: impl Into<String>,
        target_layer: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            name,
            LayerKind::Relation {
                source_layer: source_layer.into(),
                target_layer: target_layer.into(),
            },
        )
    }

    /// A whole-document layer.
    pub fn document(name: impl Into<String>, singleton: bool) -> Self {
        Self::with_kind(name, LayerKind::Document { singleton })
    }

    /// Set the overlap policy.
    pub fn overlap(mut self, overlap: OverlapMode) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the anchoring granularity.
    pub fn anchoring(mut self, anchoring: Anchoring) -> Self {
        self.anchoring = Some(anchoring);
        self
    }

    /// Append a feature declaration.
    pub fn feature(mut self, feature: FeatureSpec) -> Self {
        self.features.push(feature);
        self
    }

    /// The effective anchoring: explicit, or the kind's default.
    pub fn effective_anchoring(&self) -> Anchoring {
        match (self.anchoring, &self.kind) {
            (Some(anchoring), _) => anchoring,
            (None, LayerKind::Document { .. }) => Anchoring::WholeDocument,
            (None, _) => Anchoring::CharacterExact,
        }
    }

    /// Whether several annotations of this layer may share a position.
    pub fn allows_stacking(&self) -> bool {
        self.overlap.allows_stacking()
    }

    /// Whether this is a singleton document layer.
    pub fn is_singleton(&self) -> bool {
        matches!(self.kind, LayerKind::Document { singleton: true })
    }

    /// Look up a feature by name.
    pub fn feature_spec(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Primitive features, in declaration order.
    pub fn primitive_features(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.features.iter().filter(|f| !f.is_link())
    }

    /// Link features with their link declarations, in declaration order.
    pub fn link_features(&self) -> impl Iterator<Item = (&FeatureSpec, &LinkSpec)> {
        self.features
            .iter()
            .filter_map(|f| f.link_spec().map(|spec| (f, spec)))
    }

    /// Link features declared as position discriminators.
    pub fn discriminators(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.features
            .iter()
            .filter(|f| f.is_link() && f.compare == CompareBehavior::Discriminator)
    }
}
