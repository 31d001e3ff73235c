use std::collections::BTreeMap;

use concord_types::{AnnotationId, Offsets};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an annotation is attached to the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// A character range of the text.
    Span(Offsets),
    /// A directed edge between two annotations of the same collection.
    Relation {
        source: AnnotationId,
        target: AnnotationId,
    },
    /// The whole document.
    Document,
}

impl Anchor {
    /// Short anchor name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Span(_) => "span",
            Self::Relation { .. } => "relation",
            Self::Document => "document",
        }
    }
}

/// One entry of a link (slot) feature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Role label; `None` when the feature carries no role labels or the
    /// annotator left the role empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// The linked annotation, in the same collection as the host.
    pub target: AnnotationId,
}

impl Link {
    /// A link with a role label.
    pub fn new(role: impl Into<String>, target: AnnotationId) -> Self {
        Self {
            role: Some(role.into()),
            target,
        }
    }

    /// A link without a role label.
    pub fn unlabeled(target: AnnotationId) -> Self {
        Self { role: None, target }
    }
}

/// An instance of a layer.
///
/// Primitive feature values live in `features`; link features live in
/// `links` as ordered lists. A feature absent from the map and a feature set
/// to `null` are equivalent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub layer: String,
    pub anchor: Anchor,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Vec<Link>>,
}

impl Annotation {
    fn anchored(layer: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            layer: layer.into(),
            anchor,
            features: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// A span annotation.
    pub fn span(layer: impl Into<String>, offsets: Offsets) -> Self {
        Self::anchored(layer, Anchor::Span(offsets))
    }

    /// A relation annotation between two annotations of the same collection.
    pub fn relation(layer: impl Into<String>, source: AnnotationId, target: AnnotationId) -> Self {
        Self::anchored(layer, Anchor::Relation { source, target })
    }

    /// A document-level annotation.
    pub fn document(layer: impl Into<String>) -> Self {
        Self::anchored(layer, Anchor::Document)
    }

    /// Set a primitive feature.
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    /// Append a link to a link feature.
    pub fn with_link(mut self, feature: impl Into<String>, link: Link) -> Self {
        self.links.entry(feature.into()).or_default().push(link);
        self
    }

    /// A primitive feature value, treating `null` as absent.
    pub fn feature(&self, name: &str) -> Option<&Value> {
        self.features.get(name).filter(|v| !v.is_null())
    }

    /// The links of a link feature (empty if unset).
    pub fn links(&self, feature: &str) -> &[Link] {
        self.links.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Span offsets, if this is a span annotation.
    pub fn offsets(&self) -> Option<Offsets> {
        match self.anchor {
            Anchor::Span(offsets) => Some(offsets),
            _ => None,
        }
    }

    /// Relation endpoints, if this is a relation annotation.
    pub fn endpoints(&self) -> Option<(AnnotationId, AnnotationId)> {
        match self.anchor {
            Anchor::Relation { source, target } => Some((source, target)),
            _ => None,
        }
    }

    /// All handles this annotation refers to.
    pub fn references(&self) -> impl Iterator<Item = AnnotationId> + '_ {
        let endpoints = self
            .endpoints()
            .map(|(s, t)| [s, t])
            .into_iter()
            .flatten();
        let targets = self.links.values().flatten().map(|l| l.target);
        endpoints.chain(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offsets(begin: usize, end: usize) -> Offsets {
        Offsets::new(begin, end).unwrap()
    }

    #[test]
    fn null_feature_is_absent() {
        let a = Annotation::span("pos", offsets(0, 4)).with_feature("value", Value::Null);
        assert!(a.feature("value").is_none());
        assert!(a.feature("missing").is_none());
    }

    #[test]
    fn builders_set_values() {
        let a = Annotation::span("pos", offsets(0, 4)).with_feature("value", "NN");
        assert_eq!(a.feature("value"), Some(&json!("NN")));
        assert_eq!(a.offsets(), Some(offsets(0, 4)));
        assert!(a.endpoints().is_none());
    }

    #[test]
    fn links_accumulate_in_order() {
        let t1 = AnnotationId::from_raw(1);
        let t2 = AnnotationId::from_raw(2);
        let a = Annotation::span("event", offsets(0, 0))
            .with_link("args", Link::new("agent", t1))
            .with_link("args", Link::unlabeled(t2));
        let links = a.links("args");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].role.as_deref(), Some("agent"));
        assert_eq!(links[1].role, None);
        assert!(a.links("other").is_empty());
    }

    #[test]
    fn references_cover_endpoints_and_links() {
        let rel = Annotation::relation("dep", AnnotationId::from_raw(3), AnnotationId::from_raw(4));
        let refs: Vec<_> = rel.references().collect();
        assert_eq!(refs, vec![AnnotationId::from_raw(3), AnnotationId::from_raw(4)]);

        let doc = Annotation::document("label");
        assert_eq!(doc.references().count(), 0);
        assert_eq!(doc.anchor.name(), "document");
    }

    #[test]
    fn serde_shape_skips_empty_maps() {
        let a = Annotation::document("label");
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("features").is_none());
        assert!(json.get("links").is_none());
        let back: Annotation = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
