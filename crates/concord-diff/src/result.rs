//! The classified partition produced by a diff.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use concord_schema::LinkCompareBehavior;
use concord_types::AnnotatorId;

use crate::config_set::{Classification, ConfigurationSet, ItemRef};
use crate::position::Position;

/// An item of one annotator that was left out of the partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unpositioned {
    pub annotator: AnnotatorId,
    pub item: ItemRef,
    pub layer: String,
    pub reason: String,
}

/// Partition of all positions into configuration sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffResult {
    annotators: BTreeSet<AnnotatorId>,
    sets: BTreeMap<Position, ConfigurationSet>,
    unpositioned: Vec<Unpositioned>,
    link_compare: LinkCompareBehavior,
}

impl DiffResult {
    pub(crate) fn new(
        annotators: BTreeSet<AnnotatorId>,
        sets: BTreeMap<Position, ConfigurationSet>,
        unpositioned: Vec<Unpositioned>,
        link_compare: LinkCompareBehavior,
    ) -> Self {
        Self {
            annotators,
            sets,
            unpositioned,
            link_compare,
        }
    }

    fn classified(&self, class: Classification) -> impl Iterator<Item = &ConfigurationSet> {
        self.sets
            .values()
            .filter(move |s| s.classification() == class)
    }

    /// Sets where every annotator contributed one equal item.
    pub fn agreeing(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.classified(Classification::Agreeing)
    }

    /// Sets with full coverage but differing labels or stacked items.
    pub fn disagreeing(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.classified(Classification::Disagreeing)
    }

    /// Sets missing at least one annotator.
    pub fn incomplete(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.classified(Classification::Incomplete)
    }

    /// Sets where some annotator has several items at one position.
    ///
    /// These also appear in their classification bucket; this view lets a
    /// caller report internal conflicts of single annotators.
    pub fn stacked(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.sets.values().filter(|s| s.is_stacked())
    }

    /// The set at a position.
    pub fn get(&self, position: &Position) -> Option<&ConfigurationSet> {
        self.sets.get(position)
    }

    /// All sets in position order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.sets.values()
    }

    /// All positions in order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.sets.keys()
    }

    /// The diffed annotators.
    pub fn annotators(&self) -> &BTreeSet<AnnotatorId> {
        &self.annotators
    }

    /// Items that could not be positioned.
    pub fn unpositioned(&self) -> &[Unpositioned] {
        &self.unpositioned
    }

    /// The link comparison the diff ran with.
    pub fn link_compare(&self) -> LinkCompareBehavior {
        self.link_compare
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no annotator contributed anything.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns `true` if every position is agreeing. An empty diff agrees.
    pub fn is_agreement(&self) -> bool {
        self.sets.values().all(ConfigurationSet::is_agreeing)
    }

    /// Counts per bucket, overall and per layer.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary {
            annotators: self.annotators.iter().cloned().collect(),
            positions: self.sets.len(),
            unpositioned: self.unpositioned.len(),
            ..DiffSummary::default()
        };
        for set in self.sets.values() {
            let layer = summary
                .layers
                .entry(set.position().layer().to_string())
                .or_default();
            layer.count(set);
            count(
                &mut summary.agreeing,
                &mut summary.disagreeing,
                &mut summary.incomplete,
                &mut summary.stacked,
                set,
            );
        }
        summary.observed_agreement = ratio(summary.agreeing, summary.disagreeing);
        for layer in summary.layers.values_mut() {
            layer.observed_agreement = ratio(layer.agreeing, layer.disagreeing);
        }
        summary
    }
}

fn count(
    agreeing: &mut usize,
    disagreeing: &mut usize,
    incomplete: &mut usize,
    stacked: &mut usize,
    set: &ConfigurationSet,
) {
    match set.classification() {
        Classification::Agreeing => *agreeing += 1,
        Classification::Disagreeing => *disagreeing += 1,
        Classification::Incomplete => *incomplete += 1,
    }
    if set.is_stacked() {
        *stacked += 1;
    }
}

/// Agreement among fully covered positions; `None` when there are none.
fn ratio(agreeing: usize, disagreeing: usize) -> Option<f64> {
    let total = agreeing + disagreeing;
    (total > 0).then(|| agreeing as f64 / total as f64)
}

/// Bucket counts of one layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    pub agreeing: usize,
    pub disagreeing: usize,
    pub incomplete: usize,
    pub stacked: usize,
    pub observed_agreement: Option<f64>,
}

impl LayerSummary {
    fn count(&mut self, set: &ConfigurationSet) {
        count(
            &mut self.agreeing,
            &mut self.disagreeing,
            &mut self.incomplete,
            &mut self.stacked,
            set,
        );
    }
}

/// Agreement statistics of a diff, for display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub annotators: Vec<AnnotatorId>,
    pub positions: usize,
    pub agreeing: usize,
    pub disagreeing: usize,
    pub incomplete: usize,
    pub stacked: usize,
    pub unpositioned: usize,
    /// `agreeing / (agreeing + disagreeing)`.
    pub observed_agreement: Option<f64>,
    pub layers: BTreeMap<String, LayerSummary>,
}
