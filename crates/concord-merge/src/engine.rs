//! The merge engine: copy operations and the merge pass.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use concord_diff::{DiffResult, ItemRef, LayerAdapter, LayerAdapters, Position, PositionIndex};
use concord_schema::{LinkCompareBehavior, Schema};
use concord_store::Document;
use concord_types::{AnnotationId, AnnotatorId};

use crate::copy::Source;
use crate::error::{MergeError, MergeResult};
use crate::outcome::{MergeOperationResult, MergeOutcome, MergeReport};
use crate::strategy::{MergeCandidate, MergeStrategy};

/// Copies selected annotator material into a document's curation target.
///
/// The engine holds no per-document state. Every operation reads the
/// annotator collections, re-indexes the target, and mutates only the
/// target. Callers must not run two passes against one target at once.
pub struct MergeEngine {
    pub(crate) adapters: LayerAdapters,
    pub(crate) link_compare: LinkCompareBehavior,
    abort_on_configuration_error: bool,
}

impl MergeEngine {
    /// Create an engine for a schema.
    ///
    /// `link_compare` must match the flag the diff ran with, since link and
    /// host positions depend on it.
    pub fn new(schema: &Schema, link_compare: LinkCompareBehavior) -> MergeResult<Self> {
        let adapters = LayerAdapters::from_schema(schema)
            .map_err(|e| MergeError::unsupported("*", e.to_string()))?;
        Ok(Self {
            adapters,
            link_compare,
            abort_on_configuration_error: true,
        })
    }

    /// Whether a pass stops at the first
    /// [`UnsupportedLayerConfiguration`](MergeError::UnsupportedLayerConfiguration).
    /// Enabled by default.
    pub fn abort_on_configuration_error(mut self, abort: bool) -> Self {
        self.abort_on_configuration_error = abort;
        self
    }

    pub fn link_compare(&self) -> LinkCompareBehavior {
        self.link_compare
    }

    // ---- Copy operations ----

    /// Copy a span or link-host annotation of `source` into the target.
    pub fn copy_span(
        &self,
        document: &mut Document,
        source: &AnnotatorId,
        annotation: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let index = self.source_index(document, source)?;
        let target = self.target_index(document);
        self.span_into(document, &Source::new(source, &index), &target, annotation)
    }

    /// Copy a relation of `source` into the target, reconnecting it to the
    /// target annotations at its endpoint positions.
    pub fn copy_relation(
        &self,
        document: &mut Document,
        source: &AnnotatorId,
        annotation: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let index = self.source_index(document, source)?;
        let target = self.target_index(document);
        self.relation_into(document, &Source::new(source, &index), &target, annotation)
    }

    /// Copy one link of a host of `source` onto the equivalent target host.
    pub fn copy_link(
        &self,
        document: &mut Document,
        source: &AnnotatorId,
        host: AnnotationId,
        feature: &str,
        slot: usize,
    ) -> MergeResult<MergeOutcome> {
        let index = self.source_index(document, source)?;
        let target = self.target_index(document);
        self.link_into(document, &Source::new(source, &index), &target, host, feature, slot)
    }

    /// Copy a document-level annotation of `source` into the target.
    pub fn copy_document(
        &self,
        document: &mut Document,
        source: &AnnotatorId,
        annotation: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let index = self.source_index(document, source)?;
        let target = self.target_index(document);
        self.document_into(document, &Source::new(source, &index), &target, annotation)
    }

    // ---- Candidates and passes ----

    /// Run one candidate through the matching copy operation.
    pub fn merge_candidate(
        &self,
        document: &mut Document,
        candidate: &MergeCandidate,
    ) -> MergeOperationResult {
        let result = self
            .source_index(document, &candidate.source)
            .and_then(|index| {
                let target = self.target_index(document);
                self.dispatch(document, &Source::new(&candidate.source, &index), &target, candidate)
            });
        record(candidate, result)
    }

    /// Select candidates with `strategy` and apply them.
    pub fn merge(
        &self,
        document: &mut Document,
        diff: &DiffResult,
        strategy: &dyn MergeStrategy,
    ) -> MergeResult<MergeReport> {
        let candidates = strategy.select(diff);
        debug!(
            strategy = strategy.name(),
            candidates = candidates.len(),
            "merge candidates selected"
        );
        self.apply(document, strategy.name(), candidates)
    }

    /// Apply candidates in dependency order: document labels, spans,
    /// link hosts, relations, then links.
    ///
    /// Rejections are recorded and the pass continues. The pass returns
    /// `Err` only for a configuration error while aborting on those is
    /// enabled.
    ///
    /// The target is re-indexed after every operation that changed it, so
    /// a pass costs O(changes × target size). Rejections reuse the index.
    pub fn apply(
        &self,
        document: &mut Document,
        strategy: &str,
        mut candidates: Vec<MergeCandidate>,
    ) -> MergeResult<MergeReport> {
        candidates.sort_by(|a, b| {
            self.order(&a.position)
                .cmp(&self.order(&b.position))
                .then_with(|| a.position.cmp(&b.position))
        });

        let mut sources: HashMap<AnnotatorId, PositionIndex> = HashMap::new();
        let mut target: Option<PositionIndex> = None;
        let mut report = MergeReport::new(strategy);
        for candidate in &candidates {
            let result = self
                .cached_source(&mut sources, document, &candidate.source)
                .and_then(|index| {
                    let target = target.get_or_insert_with(|| self.target_index(document));
                    self.dispatch(document, &Source::new(&candidate.source, index), target, candidate)
                });
            if result.is_ok() {
                target = None;
            }
            if let Err(err) = &result {
                if err.is_configuration_error() && self.abort_on_configuration_error {
                    warn!(position = %candidate.position, error = %err, "merge pass aborted");
                    return Err(err.clone());
                }
            }
            report.push(record(candidate, result));
        }

        info!(
            document = %document.id(),
            strategy,
            operations = report.summary.operations,
            created = report.summary.created,
            updated = report.summary.updated,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "merge pass complete"
        );
        Ok(report)
    }

    fn dispatch(
        &self,
        document: &mut Document,
        source: &Source<'_>,
        target: &PositionIndex,
        candidate: &MergeCandidate,
    ) -> MergeResult<MergeOutcome> {
        match (&candidate.position, &candidate.item) {
            (Position::Document { .. }, ItemRef::Annotation(id)) => {
                self.document_into(document, source, target, *id)
            }
            (Position::Span { .. }, ItemRef::Annotation(id)) => self.span_into(document, source, target, *id),
            (Position::Relation { .. }, ItemRef::Annotation(id)) => {
                self.relation_into(document, source, target, *id)
            }
            (
                Position::Link { .. },
                ItemRef::Link {
                    host,
                    feature,
                    slot,
                },
            ) => self.link_into(document, source, target, *host, feature, *slot),
            (position, item) => Err(MergeError::unsupported(
                position.layer(),
                format!("item {item} cannot be merged at {position}"),
            )),
        }
    }

    /// Sort key of a position within a pass.
    fn order(&self, position: &Position) -> (u8, u8) {
        let host = matches!(position, Position::Span { .. })
            && matches!(self.adapters.get(position.layer()), Some(LayerAdapter::LinkHost(_)));
        (position.merge_rank(), u8::from(host))
    }

    fn source_index(&self, document: &Document, annotator: &AnnotatorId) -> MergeResult<PositionIndex> {
        let set = document
            .annotator(annotator)
            .ok_or_else(|| MergeError::UnknownAnnotator(annotator.clone()))?;
        Ok(PositionIndex::build(
            &self.adapters,
            document.id(),
            set,
            self.link_compare,
        ))
    }

    fn cached_source<'c>(
        &self,
        cache: &'c mut HashMap<AnnotatorId, PositionIndex>,
        document: &Document,
        annotator: &AnnotatorId,
    ) -> MergeResult<&'c PositionIndex> {
        if !cache.contains_key(annotator) {
            let index = self.source_index(document, annotator)?;
            cache.insert(annotator.clone(), index);
        }
        cache
            .get(annotator)
            .ok_or_else(|| MergeError::UnknownAnnotator(annotator.clone()))
    }

    pub(crate) fn target_index(&self, document: &Document) -> PositionIndex {
        PositionIndex::build(
            &self.adapters,
            document.id(),
            document.target(),
            self.link_compare,
        )
    }
}

fn record(candidate: &MergeCandidate, result: MergeResult<MergeOutcome>) -> MergeOperationResult {
    match &result {
        Ok(outcome) => debug!(
            position = %candidate.position,
            source = %candidate.source,
            outcome = ?outcome,
            "merge operation applied"
        ),
        Err(err) if err.is_fatal() => warn!(
            position = %candidate.position,
            source = %candidate.source,
            error = %err,
            "merge operation rejected"
        ),
        Err(err) => debug!(
            position = %candidate.position,
            source = %candidate.source,
            error = %err,
            "merge operation skipped"
        ),
    }
    MergeOperationResult::pending(candidate).resolve(result)
}
