//! Position index of one annotation collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use concord_schema::LinkCompareBehavior;
use concord_store::AnnotationSet;
use concord_types::{AnnotationId, DocumentId};

use crate::adapter::{LayerAdapters, PositionContext};
use crate::config_set::ItemRef;
use crate::label::Label;
use crate::position::Position;

/// One positioned item of a collection: an annotation or a single link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedItem {
    pub position: Position,
    pub item: ItemRef,
    pub label: Label,
}

/// An item that could not be positioned, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolved {
    pub item: ItemRef,
    pub layer: String,
    pub reason: String,
}

/// Positions and labels of every adapted annotation of one collection.
///
/// Built in two phases. Positions come first, in adapter dependency order,
/// so relation endpoints are resolved before the relations that use them.
/// Labels and link sub-positions come second, once every possible link
/// target has a position. Annotations on layers without an adapter are not
/// indexed.
#[derive(Clone, Debug, Default)]
pub struct PositionIndex {
    positions: HashMap<AnnotationId, Position>,
    by_position: HashMap<Position, Vec<AnnotationId>>,
    labels: HashMap<AnnotationId, Label>,
    items: Vec<IndexedItem>,
    unresolved: Vec<Unresolved>,
}

impl PositionIndex {
    /// Index one collection.
    pub fn build(
        adapters: &LayerAdapters,
        document: &DocumentId,
        set: &AnnotationSet,
        link_compare: LinkCompareBehavior,
    ) -> Self {
        let mut positions: HashMap<AnnotationId, Position> = HashMap::new();
        let mut by_position: HashMap<Position, Vec<AnnotationId>> = HashMap::new();
        let mut unresolved = Vec::new();

        for adapter in adapters.iter() {
            for (id, annotation) in set.iter_layer(adapter.name()) {
                let ctx = PositionContext {
                    document,
                    set,
                    resolved: &positions,
                    link_compare,
                };
                match adapter.position(annotation, &ctx) {
                    Ok(position) => {
                        by_position.entry(position.clone()).or_default().push(id);
                        positions.insert(id, position);
                    }
                    Err(reason) => unresolved.push(Unresolved {
                        item: ItemRef::Annotation(id),
                        layer: adapter.name().to_string(),
                        reason,
                    }),
                }
            }
        }

        let mut labels = HashMap::new();
        let mut items = Vec::new();
        let ctx = PositionContext {
            document,
            set,
            resolved: &positions,
            link_compare,
        };
        for adapter in adapters.iter() {
            for (id, annotation) in set.iter_layer(adapter.name()) {
                let Some(position) = positions.get(&id) else {
                    continue;
                };
                let label = adapter.label(annotation, &ctx);
                labels.insert(id, label.clone());
                items.push(IndexedItem {
                    position: position.clone(),
                    item: ItemRef::Annotation(id),
                    label,
                });
                let (links, failed) = adapter.link_items(id, annotation, position, &ctx);
                items.extend(links);
                unresolved.extend(failed);
            }
        }

        Self {
            positions,
            by_position,
            labels,
            items,
            unresolved,
        }
    }

    /// Every positioned annotation and link.
    pub fn items(&self) -> &[IndexedItem] {
        &self.items
    }

    /// Items that could not be positioned.
    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    /// Position of an annotation.
    pub fn position_of(&self, id: AnnotationId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Full label of an annotation.
    pub fn label_of(&self, id: AnnotationId) -> Option<&Label> {
        self.labels.get(&id)
    }

    /// Annotations at a position, in handle order. Link positions are never
    /// indexed here.
    pub fn annotations_at(&self, position: &Position) -> &[AnnotationId] {
        self.by_position
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of positioned annotations.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if nothing was positioned.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_schema::{FeatureSpec, Layer, LinkMultiplicity, LinkSpec, Schema};
    use concord_store::{Annotation, Link};
    use concord_types::Offsets;

    fn offsets(begin: usize, end: usize) -> Offsets {
        Offsets::new(begin, end).unwrap()
    }

    fn adapters() -> LayerAdapters {
        let schema = Schema::new(vec![
            Layer::relation("dep", "token", "token"),
            Layer::span("token").feature(FeatureSpec::primitive("pos")),
            Layer::link_host("event").feature(FeatureSpec::link(
                "args",
                LinkSpec::with_roles(LinkMultiplicity::OneTargetMultipleRoles),
            )),
        ])
        .unwrap();
        LayerAdapters::from_schema(&schema).unwrap()
    }

    fn build(set: &AnnotationSet) -> PositionIndex {
        PositionIndex::build(
            &adapters(),
            &DocumentId::new("d"),
            set,
            LinkCompareBehavior::TargetAsLabel,
        )
    }

    #[test]
    fn relations_declared_before_endpoints_still_resolve() {
        let mut set = AnnotationSet::new();
        let a = set.insert(Annotation::span("token", offsets(0, 4)));
        let b = set.insert(Annotation::span("token", offsets(5, 9)));
        let rel = set.insert(Annotation::relation("dep", a, b));
        let index = build(&set);
        assert!(index.unresolved().is_empty());
        assert_eq!(index.len(), 3);
        assert!(matches!(index.position_of(rel), Some(Position::Relation { .. })));
    }

    #[test]
    fn stacked_annotations_share_a_position() {
        let mut set = AnnotationSet::new();
        let a = set.insert(Annotation::span("token", offsets(0, 4)).with_feature("pos", "NN"));
        let b = set.insert(Annotation::span("token", offsets(0, 4)).with_feature("pos", "VB"));
        let index = build(&set);
        let position = Position::span("token", offsets(0, 4));
        assert_eq!(index.annotations_at(&position), &[a, b]);
        assert_ne!(index.label_of(a), index.label_of(b));
    }

    #[test]
    fn link_items_are_indexed_per_link() {
        let mut set = AnnotationSet::new();
        let t = set.insert(Annotation::span("token", offsets(0, 4)));
        let host = set.insert(
            Annotation::span("event", offsets(0, 0))
                .with_link("args", Link::new("slot1", t))
                .with_link("args", Link::new("slot2", t)),
        );
        let index = build(&set);
        let links: Vec<_> = index
            .items()
            .iter()
            .filter(|i| matches!(i.item, ItemRef::Link { host: h, .. } if h == host))
            .collect();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|i| i.position.is_link()));
        assert!(index.annotations_at(&links[0].position).is_empty());
    }

    #[test]
    fn unknown_layers_are_not_indexed() {
        let mut set = AnnotationSet::new();
        set.insert(Annotation::span("chunk", offsets(0, 4)));
        let index = build(&set);
        assert!(index.is_empty());
        assert!(index.unresolved().is_empty());
    }

    #[test]
    fn mismatched_anchor_is_unresolved() {
        let mut set = AnnotationSet::new();
        set.insert(Annotation::document("token"));
        let index = build(&set);
        assert!(index.is_empty());
        assert_eq!(index.unresolved().len(), 1);
        assert_eq!(index.unresolved()[0].layer, "token");
    }
}
