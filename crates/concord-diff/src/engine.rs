//! The diff pass.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use concord_schema::LinkCompareBehavior;
use concord_store::{AnnotationSet, Document};
use concord_types::{AnnotatorId, DocumentId};

use crate::adapter::LayerAdapters;
use crate::config_set::{ConfigurationSet, ItemRef};
use crate::index::PositionIndex;
use crate::label::Label;
use crate::position::Position;
use crate::result::{DiffResult, Unpositioned};

/// Partition the collections of all annotators by position and classify
/// every position.
///
/// Every item of an adapted layer lands in exactly one configuration set,
/// or in [`DiffResult::unpositioned`] if its position cannot be computed.
/// Annotators are keyed in a `BTreeMap`, so the result is independent of
/// the order in which collections were gathered.
pub fn diff(
    adapters: &LayerAdapters,
    document: &DocumentId,
    collections: &BTreeMap<AnnotatorId, AnnotationSet>,
    link_compare: LinkCompareBehavior,
) -> DiffResult {
    let annotators: BTreeSet<AnnotatorId> = collections.keys().cloned().collect();
    let mut groups: BTreeMap<Position, Vec<(AnnotatorId, ItemRef, Label)>> = BTreeMap::new();
    let mut unpositioned = Vec::new();

    for (annotator, set) in collections {
        let index = PositionIndex::build(adapters, document, set, link_compare);
        debug!(
            annotator = %annotator,
            items = index.items().len(),
            unresolved = index.unresolved().len(),
            "collection indexed"
        );
        for item in index.items() {
            groups.entry(item.position.clone()).or_default().push((
                annotator.clone(),
                item.item.clone(),
                item.label.clone(),
            ));
        }
        unpositioned.extend(index.unresolved().iter().map(|u| Unpositioned {
            annotator: annotator.clone(),
            item: u.item.clone(),
            layer: u.layer.clone(),
            reason: u.reason.clone(),
        }));
    }

    let sets: BTreeMap<Position, ConfigurationSet> = groups
        .into_iter()
        .map(|(position, items)| {
            let set = ConfigurationSet::build(position.clone(), items, &annotators);
            (position, set)
        })
        .collect();

    for set in sets.values().filter(|s| s.is_stacked()) {
        let stacked: Vec<&str> = set.stacked().iter().map(AnnotatorId::as_str).collect();
        warn!(
            position = %set.position(),
            annotators = ?stacked,
            "annotators have several items at one position"
        );
    }

    let result = DiffResult::new(annotators, sets, unpositioned, link_compare);
    let summary = result.summary();
    info!(
        document = %document,
        positions = summary.positions,
        agreeing = summary.agreeing,
        disagreeing = summary.disagreeing,
        incomplete = summary.incomplete,
        stacked = summary.stacked,
        unpositioned = summary.unpositioned,
        "diff complete"
    );
    result
}

/// Diff every annotator collection of a document.
pub fn diff_document(
    adapters: &LayerAdapters,
    document: &Document,
    link_compare: LinkCompareBehavior,
) -> DiffResult {
    diff(adapters, document.id(), document.annotators(), link_compare)
}
