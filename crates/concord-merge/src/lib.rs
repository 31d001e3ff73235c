//! Merge layer for Concord.
//!
//! Turns a [`DiffResult`](concord_diff::DiffResult) into edits of a
//! document's curation target. A [`MergeStrategy`] selects which positions
//! to materialize and from which annotator; the [`MergeEngine`] copies each
//! selection into the target under the layer's anchoring, overlap and link
//! multiplicity rules.
//!
//! # Key Types
//!
//! - [`MergeStrategy`] -- Pluggable selection of merge candidates
//! - [`AgreementOnly`] / [`IncludeIncomplete`] / [`ThresholdStrategy`] -- Built-in strategies
//! - [`MergeEngine`] -- The four copy operations and the merge pass
//! - [`MergeOutcome`] / [`MergeOperationResult`] / [`MergeReport`] -- Per-operation and per-pass results
//! - [`MergeError`] -- Rejection reasons, split into skippable and fatal
//!
//! Every operation is independent: a rejected copy never aborts the rest of
//! the pass. The only exception is a schema inconsistency, which stops the
//! pass when the engine is configured to abort on configuration errors.

pub mod engine;
pub mod error;
pub mod outcome;
pub mod strategy;

mod copy;

pub use engine::MergeEngine;
pub use error::{MergeError, MergeResult};
pub use outcome::{MergeOperationResult, MergeOutcome, MergeReport, MergeSummary, OperationState};
pub use strategy::{AgreementOnly, IncludeIncomplete, MergeCandidate, MergeStrategy, ThresholdStrategy};
