//! Merge strategies: which positions to materialize, copied from whom.

use serde::{Deserialize, Serialize};

use concord_diff::{ConfigurationSet, DiffResult, ItemRef, Position};
use concord_types::AnnotatorId;

/// One selected position and the single source item to copy from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeCandidate {
    pub position: Position,
    pub source: AnnotatorId,
    pub item: ItemRef,
}

/// Selects merge candidates from a diff.
///
/// Implementations must be deterministic: the same diff always yields the
/// same candidates with the same sources.
pub trait MergeStrategy {
    /// Short name for logs and reports.
    fn name(&self) -> &str;

    /// Candidates to copy, at most one per position.
    fn select(&self, diff: &DiffResult) -> Vec<MergeCandidate>;
}

fn candidate(set: &ConfigurationSet, source: &AnnotatorId, item: &ItemRef) -> MergeCandidate {
    MergeCandidate {
        position: set.position().clone(),
        source: source.clone(),
        item: item.clone(),
    }
}

/// The representative of a set's only configuration.
fn unanimous(set: &ConfigurationSet) -> Option<MergeCandidate> {
    match set.configurations() {
        [only] => only
            .representative()
            .map(|(source, item)| candidate(set, source, item)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Built-in strategies
// ---------------------------------------------------------------------------

/// Materialize agreeing positions only.
#[derive(Clone, Copy, Debug, Default)]
pub struct AgreementOnly;

impl MergeStrategy for AgreementOnly {
    fn name(&self) -> &str {
        "agreement-only"
    }

    fn select(&self, diff: &DiffResult) -> Vec<MergeCandidate> {
        diff.agreeing().filter_map(unanimous).collect()
    }
}

/// Materialize agreeing positions and incomplete positions with a single
/// contributor, copied from that contributor.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncludeIncomplete;

impl MergeStrategy for IncludeIncomplete {
    fn name(&self) -> &str {
        "include-incomplete"
    }

    fn select(&self, diff: &DiffResult) -> Vec<MergeCandidate> {
        diff.iter()
            .filter(|set| {
                set.is_agreeing()
                    || (set.is_incomplete() && set.coverage() == 1 && !set.is_stacked())
            })
            .filter_map(unanimous)
            .collect()
    }
}

/// Majority vote.
///
/// A configuration wins when it has strictly more votes than any other,
/// at least `min_votes` votes, and at least `min_share` of all annotators.
/// Stacked annotators do not vote. Ties are not merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStrategy {
    pub min_votes: usize,
    pub min_share: f64,
    /// Whether positions some annotators left empty may be merged.
    #[serde(default)]
    pub include_incomplete: bool,
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self {
            min_votes: 1,
            min_share: 0.5,
            include_incomplete: false,
        }
    }
}

impl ThresholdStrategy {
    /// Winning configuration of one set, if any.
    fn winner(&self, set: &ConfigurationSet, annotators: usize) -> Option<MergeCandidate> {
        let mut best: Option<(usize, MergeCandidate)> = None;
        let mut tied = false;
        for configuration in set.configurations() {
            let voters: Vec<(&AnnotatorId, &Vec<ItemRef>)> = configuration
                .members()
                .iter()
                .filter(|(annotator, _)| !set.stacked().contains(*annotator))
                .collect();
            let Some((source, items)) = voters.first() else {
                continue;
            };
            let Some(item) = items.first() else {
                continue;
            };
            let votes = voters.len();
            match &best {
                Some((top, _)) if votes < *top => {}
                Some((top, _)) if votes == *top => tied = true,
                _ => {
                    tied = false;
                    best = Some((votes, candidate(set, source, item)));
                }
            }
        }
        let (votes, winner) = best?;
        let share = votes as f64 / annotators.max(1) as f64;
        (!tied && votes >= self.min_votes && share >= self.min_share).then_some(winner)
    }
}

impl MergeStrategy for ThresholdStrategy {
    fn name(&self) -> &str {
        "threshold"
    }

    fn select(&self, diff: &DiffResult) -> Vec<MergeCandidate> {
        let annotators = diff.annotators().len();
        diff.iter()
            .filter(|set| self.include_incomplete || !set.is_incomplete())
            .filter_map(|set| self.winner(set, annotators))
            .collect()
    }
}
