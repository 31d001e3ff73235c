//! Configuration sets: every annotator's contribution at one position.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use concord_types::{AnnotationId, AnnotatorId};

use crate::label::Label;
use crate::position::Position;

/// Handle of one diffed item inside an annotator's collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRef {
    /// A whole annotation.
    Annotation(AnnotationId),
    /// One link of a link feature, by host and slot index.
    Link {
        host: AnnotationId,
        feature: String,
        slot: usize,
    },
}

impl ItemRef {
    /// The annotation carrying this item: itself, or the link's host.
    pub fn annotation(&self) -> AnnotationId {
        match self {
            Self::Annotation(id) => *id,
            Self::Link { host, .. } => *host,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation(id) => write!(f, "{id}"),
            Self::Link {
                host,
                feature,
                slot,
            } => write!(f, "{host}.{feature}[{slot}]"),
        }
    }
}

/// Agreement classification of a configuration set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Every annotator contributed exactly one item and all labels are equal.
    Agreeing,
    /// Every annotator contributed, but labels differ or an annotator
    /// stacked several items.
    Disagreeing,
    /// At least one annotator contributed nothing.
    Incomplete,
}

impl Classification {
    /// Lower-case name for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agreeing => "agreeing",
            Self::Disagreeing => "disagreeing",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One distinct label at a position and the annotators who chose it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    label: Label,
    members: BTreeMap<AnnotatorId, Vec<ItemRef>>,
}

impl Configuration {
    /// The shared label.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Contributing annotators with their items, ordered by annotator.
    pub fn members(&self) -> &BTreeMap<AnnotatorId, Vec<ItemRef>> {
        &self.members
    }

    /// Number of distinct annotators in this configuration.
    pub fn support(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if `annotator` chose this label.
    pub fn contains(&self, annotator: &AnnotatorId) -> bool {
        self.members.contains_key(annotator)
    }

    /// The deterministic copy source: the smallest annotator and its first
    /// item.
    pub fn representative(&self) -> Option<(&AnnotatorId, &ItemRef)> {
        self.members
            .iter()
            .find_map(|(annotator, items)| items.first().map(|item| (annotator, item)))
    }
}

/// All annotators' items at one position, grouped by label and classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationSet {
    position: Position,
    entries: BTreeMap<AnnotatorId, Vec<ItemRef>>,
    configurations: Vec<Configuration>,
    stacked: BTreeSet<AnnotatorId>,
    missing: BTreeSet<AnnotatorId>,
    classification: Classification,
}

impl ConfigurationSet {
    /// Group items by label and classify against the full annotator set.
    ///
    /// The result depends only on the contents of `items`, never on their
    /// order.
    pub fn build(
        position: Position,
        items: Vec<(AnnotatorId, ItemRef, Label)>,
        annotators: &BTreeSet<AnnotatorId>,
    ) -> Self {
        let mut entries: BTreeMap<AnnotatorId, Vec<ItemRef>> = BTreeMap::new();
        let mut grouped: BTreeMap<Label, BTreeMap<AnnotatorId, Vec<ItemRef>>> = BTreeMap::new();
        for (annotator, item, label) in items {
            entries.entry(annotator.clone()).or_default().push(item.clone());
            grouped
                .entry(label)
                .or_default()
                .entry(annotator)
                .or_default()
                .push(item);
        }
        for list in entries.values_mut() {
            list.sort();
        }
        let configurations: Vec<Configuration> = grouped
            .into_iter()
            .map(|(label, mut members)| {
                for list in members.values_mut() {
                    list.sort();
                }
                Configuration { label, members }
            })
            .collect();

        let stacked: BTreeSet<AnnotatorId> = entries
            .iter()
            .filter(|(_, items)| items.len() > 1)
            .map(|(annotator, _)| annotator.clone())
            .collect();
        let missing: BTreeSet<AnnotatorId> = annotators
            .iter()
            .filter(|a| !entries.contains_key(*a))
            .cloned()
            .collect();

        let classification = if !missing.is_empty() {
            Classification::Incomplete
        } else if !stacked.is_empty() || configurations.len() > 1 {
            Classification::Disagreeing
        } else {
            Classification::Agreeing
        };

        Self {
            position,
            entries,
            configurations,
            stacked,
            missing,
            classification,
        }
    }

    /// The shared position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The classification.
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Distinct labels ordered by label.
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    /// Items per contributing annotator.
    pub fn entries(&self) -> &BTreeMap<AnnotatorId, Vec<ItemRef>> {
        &self.entries
    }

    /// Items one annotator contributed here.
    pub fn items_of(&self, annotator: &AnnotatorId) -> &[ItemRef] {
        self.entries
            .get(annotator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The configuration an annotator chose, unless the annotator is missing
    /// or stacked several labels here.
    pub fn configuration_of(&self, annotator: &AnnotatorId) -> Option<&Configuration> {
        let mut chosen = self.configurations.iter().filter(|c| c.contains(annotator));
        let first = chosen.next()?;
        chosen.next().is_none().then_some(first)
    }

    /// Annotators that contributed at least one item.
    pub fn contributors(&self) -> impl Iterator<Item = &AnnotatorId> {
        self.entries.keys()
    }

    /// Number of contributing annotators.
    pub fn coverage(&self) -> usize {
        self.entries.len()
    }

    /// Annotators with more than one item here.
    pub fn stacked(&self) -> &BTreeSet<AnnotatorId> {
        &self.stacked
    }

    /// Returns `true` if any annotator stacked items here.
    pub fn is_stacked(&self) -> bool {
        !self.stacked.is_empty()
    }

    /// Annotators without any item here.
    pub fn missing(&self) -> &BTreeSet<AnnotatorId> {
        &self.missing
    }

    pub fn is_agreeing(&self) -> bool {
        self.classification == Classification::Agreeing
    }

    pub fn is_disagreeing(&self) -> bool {
        self.classification == Classification::Disagreeing
    }

    pub fn is_incomplete(&self) -> bool {
        self.classification == Classification::Incomplete
    }
}
