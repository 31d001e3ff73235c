//! Layer adapters: per-kind position extraction and label projection.
//!
//! Each layer kind gets one variant of the closed [`LayerAdapter`] enum.
//! Exhaustive matching replaces open-ended subclassing: adding a layer kind
//! is a compile error everywhere its behaviour must be decided.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use concord_schema::{
    Layer, LayerKind, LinkCompareBehavior, LinkMultiplicity, LinkSpec, Schema,
};
use concord_store::{Anchor, Annotation, AnnotationSet};
use concord_types::{AnnotationId, DocumentId};

use crate::config_set::ItemRef;
use crate::error::{AdapterResult, DiffError};
use crate::index::{IndexedItem, Unresolved};
use crate::label::{primitive_label, Label, LabelValue, LinkLabel};
use crate::position::{LinkKey, Position};

/// Everything an adapter needs to position an annotation of one collection.
pub struct PositionContext<'a> {
    pub document: &'a DocumentId,
    pub set: &'a AnnotationSet,
    /// Positions already resolved in this collection, by handle.
    pub resolved: &'a HashMap<AnnotationId, Position>,
    pub link_compare: LinkCompareBehavior,
}

/// Adapter for plain span layers.
#[derive(Clone, Debug)]
pub struct SpanAdapter {
    layer: Layer,
}

/// Adapter for span layers hosting link features.
#[derive(Clone, Debug)]
pub struct LinkHostAdapter {
    layer: Layer,
}

/// Adapter for relation layers.
#[derive(Clone, Debug)]
pub struct RelationAdapter {
    layer: Layer,
    source_layer: String,
    target_layer: String,
}

/// Adapter for whole-document layers.
#[derive(Clone, Debug)]
pub struct DocumentAdapter {
    layer: Layer,
}

/// One adapter per annotation kind.
#[derive(Clone, Debug)]
pub enum LayerAdapter {
    Span(SpanAdapter),
    Relation(RelationAdapter),
    LinkHost(LinkHostAdapter),
    Document(DocumentAdapter),
}

impl LayerAdapter {
    /// Build the adapter matching a layer's kind.
    pub fn for_layer(layer: &Layer) -> Self {
        let layer = layer.clone();
        match &layer.kind {
            LayerKind::Span => Self::Span(SpanAdapter { layer }),
            LayerKind::LinkHost => Self::LinkHost(LinkHostAdapter { layer }),
            LayerKind::Relation {
                source_layer,
                target_layer,
            } => Self::Relation(RelationAdapter {
                source_layer: source_layer.clone(),
                target_layer: target_layer.clone(),
                layer,
            }),
            LayerKind::Document { .. } => Self::Document(DocumentAdapter { layer }),
        }
    }

    /// The adapted layer.
    pub fn layer(&self) -> &Layer {
        match self {
            Self::Span(a) => &a.layer,
            Self::Relation(a) => &a.layer,
            Self::LinkHost(a) => &a.layer,
            Self::Document(a) => &a.layer,
        }
    }

    /// The adapted layer's name.
    pub fn name(&self) -> &str {
        &self.layer().name
    }

    /// Returns `true` for relation adapters, which must run after the
    /// adapters of their endpoint layers.
    pub fn depends_on_positions(&self) -> bool {
        matches!(self, Self::Relation(_))
    }

    /// Compute the position of an annotation of this layer.
    ///
    /// Relations require their endpoints to be present in
    /// `ctx.resolved`. The error string explains why an annotation could not
    /// be positioned.
    pub fn position(&self, annotation: &Annotation, ctx: &PositionContext<'_>) -> Result<Position, String> {
        match (self, &annotation.anchor) {
            (Self::Span(a), Anchor::Span(offsets)) => Ok(Position::span(&a.layer.name, *offsets)),
            (Self::LinkHost(a), Anchor::Span(offsets)) => Ok(Position::Span {
                layer: a.layer.name.clone(),
                begin: offsets.begin,
                end: offsets.end,
                discriminator: a.discriminator(annotation),
            }),
            (Self::Relation(a), Anchor::Relation { source, target }) => {
                let source = a.resolve_endpoint(*source, &a.source_layer, ctx)?;
                let target = a.resolve_endpoint(*target, &a.target_layer, ctx)?;
                Ok(Position::Relation {
                    layer: a.layer.name.clone(),
                    source: Box::new(source),
                    target: Box::new(target),
                })
            }
            (Self::Document(a), Anchor::Document) => Ok(Position::Document {
                layer: a.layer.name.clone(),
                document: ctx.document.clone(),
            }),
            (adapter, anchor) => Err(format!(
                "{} anchor on {} layer '{}'",
                anchor.name(),
                adapter.layer().kind.name(),
                adapter.name()
            )),
        }
    }

    /// Full label of an annotation: compared primitive features plus, for
    /// link hosts, the sorted links of every compared link feature.
    ///
    /// Links whose targets are not positioned are left out.
    pub fn label(&self, annotation: &Annotation, ctx: &PositionContext<'_>) -> Label {
        let mut label = primitive_label(self.layer(), annotation);
        if let Self::LinkHost(a) = self {
            for (feature, spec) in a.layer.link_features() {
                if !feature.is_compared() {
                    continue;
                }
                let mut links: Vec<LinkLabel> = annotation
                    .links(&feature.name)
                    .iter()
                    .filter_map(|link| {
                        ctx.resolved.get(&link.target).map(|target| LinkLabel {
                            role: effective_role(spec, link.role.as_ref()),
                            target: target.clone(),
                        })
                    })
                    .collect();
                if links.is_empty() {
                    continue;
                }
                links.sort();
                label.insert(feature.name.clone(), LabelValue::Links(links));
            }
        }
        label
    }

    /// Label of the compared primitive features only.
    ///
    /// Used when copying a host, whose links are merged separately.
    pub fn primitive_label(&self, annotation: &Annotation) -> Label {
        primitive_label(self.layer(), annotation)
    }

    /// Sub-positions of every link of every compared link feature of a
    /// positioned host. Non-host adapters have none.
    pub fn link_items(
        &self,
        host_id: AnnotationId,
        host: &Annotation,
        host_position: &Position,
        ctx: &PositionContext<'_>,
    ) -> (Vec<IndexedItem>, Vec<Unresolved>) {
        let mut items = Vec::new();
        let mut unresolved = Vec::new();
        let Self::LinkHost(a) = self else {
            return (items, unresolved);
        };

        for (feature, spec) in a.layer.link_features() {
            if !feature.is_compared() {
                continue;
            }
            let behavior = feature.effective_link_compare(ctx.link_compare);
            for (slot, link) in host.links(&feature.name).iter().enumerate() {
                let item = ItemRef::Link {
                    host: host_id,
                    feature: feature.name.clone(),
                    slot,
                };
                let Some(target) = ctx.resolved.get(&link.target) else {
                    unresolved.push(Unresolved {
                        item,
                        layer: a.layer.name.clone(),
                        reason: format!("link target {} is not positioned", link.target),
                    });
                    continue;
                };
                let role = effective_role(spec, link.role.as_ref());
                let (key, label) = link_key(spec, behavior, role, target);
                items.push(IndexedItem {
                    position: Position::Link {
                        host: Box::new(host_position.clone()),
                        feature: feature.name.clone(),
                        key,
                    },
                    item,
                    label,
                });
            }
        }
        (items, unresolved)
    }
}

impl LinkHostAdapter {
    /// Sorted `(feature, role)` pairs of the discriminating link features,
    /// or `None` if the layer declares no discriminator.
    fn discriminator(&self, annotation: &Annotation) -> Option<Vec<(String, Option<String>)>> {
        let mut discriminators = self.layer.discriminators().peekable();
        discriminators.peek()?;
        let mut pairs = BTreeSet::new();
        for feature in discriminators {
            let spec = feature.link_spec().copied().unwrap_or_default();
            for link in annotation.links(&feature.name) {
                pairs.insert((
                    feature.name.clone(),
                    effective_role(&spec, link.role.as_ref()),
                ));
            }
        }
        Some(pairs.into_iter().collect())
    }
}

impl RelationAdapter {
    fn resolve_endpoint(
        &self,
        endpoint: AnnotationId,
        expected_layer: &str,
        ctx: &PositionContext<'_>,
    ) -> Result<Position, String> {
        let annotation = ctx
            .set
            .get(endpoint)
            .ok_or_else(|| format!("endpoint {endpoint} does not exist"))?;
        if annotation.layer != expected_layer {
            return Err(format!(
                "endpoint {endpoint} is on layer '{}', expected '{expected_layer}'",
                annotation.layer
            ));
        }
        ctx.resolved
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| format!("endpoint {endpoint} is not positioned"))
    }
}

/// The role as compared: dropped when the feature carries no role labels.
fn effective_role(spec: &LinkSpec, role: Option<&String>) -> Option<String> {
    if spec.role_labels {
        role.cloned()
    } else {
        None
    }
}

/// Split a link into its sub-position key and its compared label.
///
/// Without role labels a link is its target. With role labels the key is
/// whatever the multiplicity guarantees to be unique per host, and the
/// remaining half is the label; where neither half is unique on its own the
/// pair itself is the key.
fn link_key(
    spec: &LinkSpec,
    behavior: LinkCompareBehavior,
    role: Option<String>,
    target: &Position,
) -> (LinkKey, Label) {
    let mut label = Label::new();
    if !spec.role_labels {
        return (LinkKey::Target(Box::new(target.clone())), label);
    }
    match (behavior, spec.multiplicity) {
        (LinkCompareBehavior::TargetAsLabel, LinkMultiplicity::OneTargetMultipleRoles) => {
            label.insert("target", LabelValue::Target(target.clone()));
            (LinkKey::Role(role), label)
        }
        (LinkCompareBehavior::RoleAsLabel, LinkMultiplicity::MultipleTargetsOneRole) => {
            if let Some(role) = &role {
                label.insert("role", LabelValue::Value(role.clone()));
            }
            (LinkKey::Target(Box::new(target.clone())), label)
        }
        _ => (
            LinkKey::RoleAndTarget(role, Box::new(target.clone())),
            label,
        ),
    }
}

/// The adapters of a diff, in dependency order: document and span-like
/// layers before the relation layers that reference them.
#[derive(Clone, Debug, Default)]
pub struct LayerAdapters {
    adapters: Vec<LayerAdapter>,
}

impl LayerAdapters {
    /// Adapt every layer of a schema.
    pub fn from_schema(schema: &Schema) -> AdapterResult<Self> {
        schema.validate()?;
        let adapters: Vec<LayerAdapter> = schema
            .layers_in_dependency_order()
            .into_iter()
            .map(LayerAdapter::for_layer)
            .collect();
        debug!(adapters = adapters.len(), "layer adapters built");
        Ok(Self { adapters })
    }

    /// Adapt a subset of a schema's layers.
    ///
    /// Relation layers require their endpoint layers in the subset, since
    /// relation positions are built from endpoint positions.
    pub fn for_layers(schema: &Schema, names: &[&str]) -> AdapterResult<Self> {
        schema.validate()?;
        let mut selected = Vec::new();
        for name in names {
            let layer = schema
                .layer(name)
                .ok_or_else(|| DiffError::UnknownLayer(name.to_string()))?;
            if let LayerKind::Relation {
                source_layer,
                target_layer,
            } = &layer.kind
            {
                for endpoint in [source_layer, target_layer] {
                    if !names.contains(&endpoint.as_str()) {
                        return Err(DiffError::MissingEndpointLayer {
                            relation: layer.name.clone(),
                            endpoint: endpoint.clone(),
                        });
                    }
                }
            }
            selected.push(layer);
        }
        selected.sort_by_key(|l| l.kind.rank());
        let adapters: Vec<LayerAdapter> = selected.into_iter().map(LayerAdapter::for_layer).collect();
        debug!(adapters = adapters.len(), "layer adapters built for subset");
        Ok(Self { adapters })
    }

    /// Look up the adapter of a layer.
    pub fn get(&self, layer: &str) -> Option<&LayerAdapter> {
        self.adapters.iter().find(|a| a.name() == layer)
    }

    /// Iterate adapters in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerAdapter> {
        self.adapters.iter()
    }

    /// Number of adapted layers.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns `true` if no layer is adapted.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_schema::{CompareBehavior, FeatureSpec};
    use concord_store::Link;
    use concord_types::Offsets;

    fn offsets(begin: usize, end: usize) -> Offsets {
        Offsets::new(begin, end).unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Layer::span("token"),
            Layer::relation("dep", "token", "token").feature(FeatureSpec::primitive("label")),
            Layer::link_host("event")
                .feature(FeatureSpec::primitive("type"))
                .feature(
                    FeatureSpec::link("args", LinkSpec::with_roles(LinkMultiplicity::OneTargetMultipleRoles))
                        .compare(CompareBehavior::Discriminator),
                ),
            Layer::document("label", true),
        ])
        .unwrap()
    }

    fn ctx<'a>(
        doc: &'a DocumentId,
        set: &'a AnnotationSet,
        resolved: &'a HashMap<AnnotationId, Position>,
    ) -> PositionContext<'a> {
        PositionContext {
            document: doc,
            set,
            resolved,
            link_compare: LinkCompareBehavior::TargetAsLabel,
        }
    }

    #[test]
    fn adapters_follow_dependency_order() {
        let adapters = LayerAdapters::from_schema(&schema()).unwrap();
        let names: Vec<_> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["label", "token", "event", "dep"]);
        assert!(adapters.get("dep").unwrap().depends_on_positions());
    }

    #[test]
    fn subset_requires_endpoint_layers() {
        let err = LayerAdapters::for_layers(&schema(), &["dep"]).unwrap_err();
        assert!(matches!(err, DiffError::MissingEndpointLayer { .. }));
        let err = LayerAdapters::for_layers(&schema(), &["nope"]).unwrap_err();
        assert!(matches!(err, DiffError::UnknownLayer(_)));
        let ok = LayerAdapters::for_layers(&schema(), &["dep", "token"]).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.iter().next().unwrap().name(), "token");
    }

    #[test]
    fn relation_positions_use_endpoint_positions() {
        let s = schema();
        let doc = DocumentId::new("d");
        let mut set = AnnotationSet::new();
        let a = set.insert(Annotation::span("token", offsets(0, 4)));
        let b = set.insert(Annotation::span("token", offsets(5, 9)));
        let rel = Annotation::relation("dep", a, b);

        let token = LayerAdapter::for_layer(s.layer("token").unwrap());
        let dep = LayerAdapter::for_layer(s.layer("dep").unwrap());

        let mut resolved = HashMap::new();
        let empty = ctx(&doc, &set, &resolved);
        assert!(dep.position(&rel, &empty).is_err());

        for (id, ann) in set.iter() {
            let p = token.position(ann, &ctx(&doc, &set, &HashMap::new())).unwrap();
            resolved.insert(id, p);
        }
        let position = dep.position(&rel, &ctx(&doc, &set, &resolved)).unwrap();
        assert_eq!(
            position,
            Position::Relation {
                layer: "dep".into(),
                source: Box::new(Position::span("token", offsets(0, 4))),
                target: Box::new(Position::span("token", offsets(5, 9))),
            }
        );
    }

    #[test]
    fn relation_endpoint_on_wrong_layer_is_rejected() {
        let s = schema();
        let doc = DocumentId::new("d");
        let mut set = AnnotationSet::new();
        let a = set.insert(Annotation::span("event", offsets(0, 4)));
        let rel = Annotation::relation("dep", a, a);
        let dep = LayerAdapter::for_layer(s.layer("dep").unwrap());
        let resolved = HashMap::new();
        let reason = dep.position(&rel, &ctx(&doc, &set, &resolved)).unwrap_err();
        assert!(reason.contains("expected 'token'"));
    }

    #[test]
    fn anchor_mismatch_is_reported() {
        let s = schema();
        let doc = DocumentId::new("d");
        let set = AnnotationSet::new();
        let resolved = HashMap::new();
        let token = LayerAdapter::for_layer(s.layer("token").unwrap());
        let reason = token
            .position(&Annotation::document("token"), &ctx(&doc, &set, &resolved))
            .unwrap_err();
        assert!(reason.contains("document anchor"));
    }

    #[test]
    fn discriminator_uses_role_set() {
        let s = schema();
        let doc = DocumentId::new("d");
        let mut set = AnnotationSet::new();
        let t = set.insert(Annotation::span("token", offsets(0, 4)));
        let host_a = Annotation::span("event", offsets(0, 4)).with_link("args", Link::new("agent", t));
        let host_b = Annotation::span("event", offsets(0, 4)).with_link("args", Link::new("patient", t));
        let host_c = Annotation::span("event", offsets(0, 4))
            .with_link("args", Link::new("agent", t))
            .with_link("args", Link::new("agent", t));

        let event = LayerAdapter::for_layer(s.layer("event").unwrap());
        let resolved = HashMap::new();
        let c = ctx(&doc, &set, &resolved);
        let pa = event.position(&host_a, &c).unwrap();
        let pb = event.position(&host_b, &c).unwrap();
        let pc = event.position(&host_c, &c).unwrap();
        assert_ne!(pa, pb);
        assert_eq!(pa, pc, "role sets ignore multiplicity");
    }

    #[test]
    fn document_position_is_layer_and_document() {
        let s = schema();
        let doc = DocumentId::new("doc-7");
        let set = AnnotationSet::new();
        let resolved = HashMap::new();
        let label = LayerAdapter::for_layer(s.layer("label").unwrap());
        let p = label
            .position(&Annotation::document("label"), &ctx(&doc, &set, &resolved))
            .unwrap();
        assert_eq!(
            p,
            Position::Document {
                layer: "label".into(),
                document: doc.clone()
            }
        );
    }

    #[test]
    fn link_keys_follow_compare_behaviour() {
        let target = Position::span("token", offsets(0, 4));
        let one = LinkSpec::with_roles(LinkMultiplicity::OneTargetMultipleRoles);
        let (key, label) = link_key(&one, LinkCompareBehavior::TargetAsLabel, Some("a".into()), &target);
        assert_eq!(key, LinkKey::Role(Some("a".into())));
        assert_eq!(label.get("target"), Some(&LabelValue::Target(target.clone())));

        let many = LinkSpec::with_roles(LinkMultiplicity::MultipleTargetsOneRole);
        let (key, label) = link_key(&many, LinkCompareBehavior::RoleAsLabel, Some("a".into()), &target);
        assert_eq!(key, LinkKey::Target(Box::new(target.clone())));
        assert_eq!(label.get("role"), Some(&LabelValue::Value("a".into())));

        let (key, label) = link_key(&one, LinkCompareBehavior::RoleAsLabel, Some("a".into()), &target);
        assert!(matches!(key, LinkKey::RoleAndTarget(..)));
        assert!(label.is_empty());

        let plain = LinkSpec::without_roles(LinkMultiplicity::OneTargetMultipleRoles);
        let (key, _) = link_key(&plain, LinkCompareBehavior::TargetAsLabel, Some("ignored".into()), &target);
        assert_eq!(key, LinkKey::Target(Box::new(target)));
    }

    #[test]
    fn host_label_includes_sorted_links() {
        let s = schema();
        let doc = DocumentId::new("d");
        let mut set = AnnotationSet::new();
        let t1 = set.insert(Annotation::span("token", offsets(0, 4)));
        let t2 = set.insert(Annotation::span("token", offsets(5, 9)));
        let mut resolved = HashMap::new();
        resolved.insert(t1, Position::span("token", offsets(0, 4)));
        resolved.insert(t2, Position::span("token", offsets(5, 9)));

        let event = LayerAdapter::for_layer(s.layer("event").unwrap());
        let forward = Annotation::span("event", offsets(0, 9))
            .with_feature("type", "move")
            .with_link("args", Link::new("a", t1))
            .with_link("args", Link::new("b", t2));
        let backward = Annotation::span("event", offsets(0, 9))
            .with_feature("type", "move")
            .with_link("args", Link::new("b", t2))
            .with_link("args", Link::new("a", t1));
        let c = ctx(&doc, &set, &resolved);
        assert_eq!(event.label(&forward, &c), event.label(&backward, &c));
        assert_eq!(event.primitive_label(&forward).len(), 1);
    }
}
