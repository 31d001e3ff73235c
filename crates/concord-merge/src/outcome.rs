//! Per-operation outcomes and the report of a merge pass.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use concord_diff::{ItemRef, Position};
use concord_types::AnnotatorId;

use crate::error::{MergeError, MergeResult};
use crate::strategy::MergeCandidate;

/// Successful effect of one copy operation on the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "item", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// A new annotation or link was added.
    Created(ItemRef),
    /// An existing annotation or link was overwritten.
    Updated(ItemRef),
}

impl MergeOutcome {
    /// The target item that was created or updated.
    pub fn item(&self) -> &ItemRef {
        match self {
            Self::Created(item) | Self::Updated(item) => item,
        }
    }
}

// ---------------------------------------------------------------------------
// OperationState
// ---------------------------------------------------------------------------

/// State of one merge operation.
///
/// Every operation starts `Pending` and moves to exactly one terminal state
/// in a single step. The engine never retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationState {
    Pending,
    Created(ItemRef),
    Updated(ItemRef),
    Rejected(MergeError),
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lower-case state name for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Rejected(_) => "rejected",
        }
    }

    /// The rejection, if any.
    pub fn error(&self) -> Option<&MergeError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MergeResult<MergeOutcome>> for OperationState {
    fn from(result: MergeResult<MergeOutcome>) -> Self {
        match result {
            Ok(MergeOutcome::Created(item)) => Self::Created(item),
            Ok(MergeOutcome::Updated(item)) => Self::Updated(item),
            Err(err) => Self::Rejected(err),
        }
    }
}

impl Serialize for OperationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OperationState", 4)?;
        state.serialize_field("state", self.as_str())?;
        match self {
            Self::Created(item) | Self::Updated(item) => {
                state.serialize_field("item", item)?;
            }
            Self::Rejected(err) => {
                state.serialize_field("error", err.kind())?;
                state.serialize_field("message", &err.to_string())?;
                state.serialize_field("fatal", &err.is_fatal())?;
            }
            Self::Pending => {}
        }
        state.end()
    }
}

// ---------------------------------------------------------------------------
// MergeOperationResult
// ---------------------------------------------------------------------------

/// One copy attempt: where, from whom, which source item, and what happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeOperationResult {
    pub position: Position,
    pub source: AnnotatorId,
    pub item: ItemRef,
    #[serde(flatten)]
    pub state: OperationState,
}

impl MergeOperationResult {
    /// A pending operation for a candidate.
    pub fn pending(candidate: &MergeCandidate) -> Self {
        Self {
            position: candidate.position.clone(),
            source: candidate.source.clone(),
            item: candidate.item.clone(),
            state: OperationState::Pending,
        }
    }

    /// Move a pending operation to its terminal state. An operation that is
    /// already terminal keeps its first outcome.
    pub fn resolve(mut self, result: MergeResult<MergeOutcome>) -> Self {
        if !self.state.is_terminal() {
            self.state = result.into();
        }
        self
    }

    pub fn is_created(&self) -> bool {
        matches!(self.state, OperationState::Created(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self.state, OperationState::Updated(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.state, OperationState::Rejected(_))
    }

    /// The rejection, if any.
    pub fn error(&self) -> Option<&MergeError> {
        self.state.error()
    }
}

// ---------------------------------------------------------------------------
// MergeReport
// ---------------------------------------------------------------------------

/// Counts per outcome of one merge pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub operations: usize,
    pub created: usize,
    pub updated: usize,
    /// Rejections meaning the material was already present.
    pub skipped: usize,
    /// Rejections that need attention.
    pub failed: usize,
}

/// All operations of one merge pass, in the order they ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub strategy: String,
    pub summary: MergeSummary,
    pub operations: Vec<MergeOperationResult>,
}

impl MergeReport {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }

    /// Record a terminal operation.
    pub fn push(&mut self, operation: MergeOperationResult) {
        let summary = &mut self.summary;
        summary.operations += 1;
        match &operation.state {
            OperationState::Created(_) => summary.created += 1,
            OperationState::Updated(_) => summary.updated += 1,
            OperationState::Rejected(err) if err.is_fatal() => summary.failed += 1,
            OperationState::Rejected(_) => summary.skipped += 1,
            OperationState::Pending => {}
        }
        self.operations.push(operation);
    }

    /// Rejected operations that need a human decision.
    pub fn failures(&self) -> impl Iterator<Item = &MergeOperationResult> {
        self.operations
            .iter()
            .filter(|op| op.error().is_some_and(MergeError::is_fatal))
    }

    /// Number of operations that changed the target.
    pub fn changed(&self) -> usize {
        self.summary.created + self.summary.updated
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
