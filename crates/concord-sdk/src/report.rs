//! Serializable views of a diff for an external curation UI.

use serde::Serialize;

use concord_diff::{Classification, ConfigurationSet, DiffResult, DiffSummary, ItemRef, Label, Position, Unpositioned};
use concord_types::AnnotatorId;

/// One configuration as shown to a curator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigurationEntry {
    pub label: Label,
    pub annotators: Vec<AnnotatorId>,
    pub items: Vec<ItemRef>,
}

/// One position with its classification and competing configurations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionEntry {
    pub position: Position,
    pub classification: Classification,
    pub configurations: Vec<ConfigurationEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<AnnotatorId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stacked: Vec<AnnotatorId>,
}

impl From<&ConfigurationSet> for PositionEntry {
    fn from(set: &ConfigurationSet) -> Self {
        Self {
            position: set.position().clone(),
            classification: set.classification(),
            configurations: set
                .configurations()
                .iter()
                .map(|configuration| ConfigurationEntry {
                    label: configuration.label().clone(),
                    annotators: configuration.members().keys().cloned().collect(),
                    items: configuration.members().values().flatten().cloned().collect(),
                })
                .collect(),
            missing: set.missing().iter().cloned().collect(),
            stacked: set.stacked().iter().cloned().collect(),
        }
    }
}

/// Summary plus every position of a diff.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiffReport {
    pub summary: DiffSummary,
    pub positions: Vec<PositionEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpositioned: Vec<Unpositioned>,
}

impl From<&DiffResult> for DiffReport {
    fn from(diff: &DiffResult) -> Self {
        Self {
            summary: diff.summary(),
            positions: diff.iter().map(PositionEntry::from).collect(),
            unpositioned: diff.unpositioned().to_vec(),
        }
    }
}
