//! The four copy operations.
//!
//! Each operation reads the source annotation, looks up positions in an
//! index of the current target, decides, and only then mutates the target.
//! A rejected operation leaves the target untouched, so its index stays
//! valid.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use concord_diff::{ItemRef, Label, LayerAdapter, LinkKey, Position, PositionContext, PositionIndex};
use concord_schema::{Anchoring, FeatureSpec, Layer, LayerKind};
use concord_store::{Anchor, Annotation, AnnotationSet, Document, Link, StoreError};
use concord_types::{AnnotationId, AnnotatorId, Offsets};

use crate::engine::MergeEngine;
use crate::error::{MergeError, MergeResult};
use crate::outcome::MergeOutcome;

/// One annotator's collection as seen by a copy operation.
pub(crate) struct Source<'a> {
    annotator: &'a AnnotatorId,
    index: &'a PositionIndex,
}

impl<'a> Source<'a> {
    pub(crate) fn new(annotator: &'a AnnotatorId, index: &'a PositionIndex) -> Self {
        Self { annotator, index }
    }

    fn annotation(&self, document: &Document, id: AnnotationId) -> MergeResult<Annotation> {
        let set = document
            .annotator(self.annotator)
            .ok_or_else(|| MergeError::UnknownAnnotator(self.annotator.clone()))?;
        Ok(set.require(id)?.clone())
    }

    fn position(&self, layer: &Layer, id: AnnotationId) -> MergeResult<Position> {
        self.index.position_of(id).cloned().ok_or_else(|| {
            MergeError::invalid_anchor(
                &layer.name,
                format!("annotation {id} of {} has no position", self.annotator),
            )
        })
    }
}

/// The single target annotation at a position.
fn resolve_unique(layer: &Layer, target: &PositionIndex, position: &Position) -> MergeResult<AnnotationId> {
    match target.annotations_at(position) {
        [] => Err(MergeError::MissingEndpoint {
            layer: layer.name.clone(),
            endpoint: position.clone(),
        }),
        [only] => Ok(*only),
        many => Err(MergeError::AmbiguousTargetCandidates {
            layer: layer.name.clone(),
            position: position.clone(),
            count: many.len(),
        }),
    }
}

/// First candidate whose compared primitive features equal `label`.
fn find_equal(
    set: &AnnotationSet,
    adapter: &LayerAdapter,
    candidates: &[AnnotationId],
    label: &Label,
) -> Option<AnnotationId> {
    candidates.iter().copied().find(|id| {
        set.get(*id)
            .is_some_and(|existing| adapter.primitive_label(existing) == *label)
    })
}

/// Replace the feature values of a target annotation. Links are kept.
fn overwrite(
    set: &mut AnnotationSet,
    id: AnnotationId,
    features: &std::collections::BTreeMap<String, Value>,
) -> MergeResult<()> {
    let existing = set.get_mut(id).ok_or(StoreError::NotFound(id))?;
    existing.features = features.clone();
    Ok(())
}

fn already_exists(layer: &Layer, position: Position) -> MergeError {
    MergeError::AnnotationAlreadyExists {
        layer: layer.name.clone(),
        position,
    }
}

impl MergeEngine {
    fn adapter(&self, layer: &str) -> MergeResult<&LayerAdapter> {
        self.adapters
            .get(layer)
            .ok_or_else(|| MergeError::unsupported(layer, "layer is not declared in the schema"))
    }

    /// Place source offsets in the target document.
    fn place(&self, document: &Document, layer: &Layer, offsets: Offsets) -> MergeResult<Offsets> {
        let len = document.text_len();
        if offsets.end > len {
            return Err(MergeError::invalid_anchor(
                &layer.name,
                format!("{offsets} exceeds the document length {len}"),
            ));
        }
        match layer.effective_anchoring() {
            Anchoring::CharacterExact => Ok(offsets),
            Anchoring::TokenAligned => document.covering_tokens(offsets).ok_or_else(|| {
                MergeError::invalid_anchor(&layer.name, format!("no token covers {offsets}"))
            }),
            Anchoring::WholeDocument => Err(MergeError::unsupported(
                &layer.name,
                "span copy on a whole-document layer",
            )),
        }
    }

    /// Where a source position lands in the target: token-aligned span
    /// offsets snap the same way [`place`](Self::place) snaps a copied span.
    fn placed(&self, document: &Document, position: Position) -> Position {
        match position {
            Position::Span {
                layer,
                begin,
                end,
                discriminator,
            } => {
                let snapped = self
                    .adapters
                    .get(&layer)
                    .filter(|a| a.layer().effective_anchoring() == Anchoring::TokenAligned)
                    .and_then(|_| Offsets::new(begin, end).ok())
                    .and_then(|offsets| document.covering_tokens(offsets));
                let (begin, end) = snapped.map_or((begin, end), |o| (o.begin, o.end));
                Position::Span {
                    layer,
                    begin,
                    end,
                    discriminator,
                }
            }
            Position::Relation {
                layer,
                source,
                target,
            } => Position::Relation {
                layer,
                source: Box::new(self.placed(document, *source)),
                target: Box::new(self.placed(document, *target)),
            },
            other => other,
        }
    }

    pub(crate) fn span_into(
        &self,
        document: &mut Document,
        source: &Source<'_>,
        target_index: &PositionIndex,
        id: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let annotation = source.annotation(document, id)?;
        let adapter = self.adapter(&annotation.layer)?;
        let layer = adapter.layer();
        if !layer.kind.is_span_like() {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("span copy on a {} layer", layer.kind.name()),
            ));
        }
        let Some(offsets) = annotation.offsets() else {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("{} anchor on a span layer", annotation.anchor.name()),
            ));
        };
        let offsets = self.place(document, layer, offsets)?;

        let mut copy = Annotation::span(&layer.name, offsets);
        copy.features = annotation.features.clone();
        // Discriminating links are part of the host's position and travel
        // with it; all other links are merged one by one.
        for feature in layer.discriminators() {
            for link in annotation.links(&feature.name) {
                let target_position = self.placed(document, source.position(layer, link.target)?);
                let target = resolve_unique(layer, target_index, &target_position)?;
                copy = copy.with_link(
                    feature.name.clone(),
                    Link {
                        role: link.role.clone(),
                        target,
                    },
                );
            }
        }

        let resolved = HashMap::new();
        let ctx = PositionContext {
            document: document.id(),
            set: document.target(),
            resolved: &resolved,
            link_compare: self.link_compare,
        };
        let position = adapter
            .position(&copy, &ctx)
            .map_err(|reason| MergeError::invalid_anchor(&layer.name, reason))?;
        let label = adapter.primitive_label(&copy);
        let existing = target_index.annotations_at(&position);

        if find_equal(document.target(), adapter, existing, &label).is_some() {
            return Err(already_exists(layer, position));
        }

        if !existing.is_empty() && !layer.allows_stacking() {
            return match existing {
                [only] => {
                    overwrite(document.target_mut(), *only, &copy.features)?;
                    debug!(layer = %layer.name, %position, "span overwritten");
                    Ok(MergeOutcome::Updated(ItemRef::Annotation(*only)))
                }
                many => Err(MergeError::AmbiguousTargetCandidates {
                    layer: layer.name.clone(),
                    position,
                    count: many.len(),
                }),
            };
        }

        if existing.is_empty() && !layer.overlap.allows_partial_overlap() {
            let conflict = document
                .target()
                .iter_layer(&layer.name)
                .filter_map(|(_, a)| a.offsets())
                .find(|o| *o != offsets && o.overlaps(&offsets));
            if let Some(existing) = conflict {
                return Err(MergeError::OverlapConflict {
                    layer: layer.name.clone(),
                    offsets,
                    existing,
                });
            }
        }

        let created = document.target_mut().insert(copy);
        debug!(layer = %layer.name, %position, annotation = %created, "span created");
        Ok(MergeOutcome::Created(ItemRef::Annotation(created)))
    }

    pub(crate) fn relation_into(
        &self,
        document: &mut Document,
        source: &Source<'_>,
        target_index: &PositionIndex,
        id: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let annotation = source.annotation(document, id)?;
        let adapter = self.adapter(&annotation.layer)?;
        let layer = adapter.layer();
        if !matches!(layer.kind, LayerKind::Relation { .. }) {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("relation copy on a {} layer", layer.kind.name()),
            ));
        }
        let Some((from, to)) = annotation.endpoints() else {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("{} anchor on a relation layer", annotation.anchor.name()),
            ));
        };

        let from_position = self.placed(document, source.position(layer, from)?);
        let to_position = self.placed(document, source.position(layer, to)?);
        let from = resolve_unique(layer, target_index, &from_position)?;
        let to = resolve_unique(layer, target_index, &to_position)?;

        let position = Position::Relation {
            layer: layer.name.clone(),
            source: Box::new(from_position),
            target: Box::new(to_position),
        };
        let label = adapter.primitive_label(&annotation);
        let existing = target_index.annotations_at(&position);

        // Relations with other labels between the same endpoints are
        // distinct instances.
        if find_equal(document.target(), adapter, existing, &label).is_some() {
            return Err(already_exists(layer, position));
        }

        let mut copy = Annotation::relation(&layer.name, from, to);
        copy.features = annotation.features;
        let created = document.target_mut().insert(copy);
        debug!(layer = %layer.name, %position, annotation = %created, "relation created");
        Ok(MergeOutcome::Created(ItemRef::Annotation(created)))
    }

    pub(crate) fn link_into(
        &self,
        document: &mut Document,
        source: &Source<'_>,
        target_index: &PositionIndex,
        host: AnnotationId,
        feature: &str,
        slot: usize,
    ) -> MergeResult<MergeOutcome> {
        let annotation = source.annotation(document, host)?;
        let adapter = self.adapter(&annotation.layer)?;
        let layer = adapter.layer();
        if !matches!(adapter, LayerAdapter::LinkHost(_)) {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("link copy on a {} layer", layer.kind.name()),
            ));
        }
        let spec = layer
            .feature_spec(feature)
            .and_then(FeatureSpec::link_spec)
            .copied()
            .ok_or_else(|| {
                MergeError::unsupported(&layer.name, format!("'{feature}' is not a link feature"))
            })?;
        let link = annotation.links(feature).get(slot).cloned().ok_or_else(|| {
            MergeError::invalid_anchor(&layer.name, format!("{host} has no link {feature}[{slot}]"))
        })?;

        let host_position = self.placed(document, source.position(layer, host)?);
        let target_position = self.placed(document, source.position(layer, link.target)?);
        let target_host = resolve_unique(layer, target_index, &host_position)?;
        let target = resolve_unique(layer, target_index, &target_position)?;

        let role = if spec.role_labels { link.role } else { None };
        let link_position = Position::Link {
            host: Box::new(host_position),
            feature: feature.to_string(),
            key: LinkKey::RoleAndTarget(role.clone(), Box::new(target_position)),
        };

        let existing = document.target().require(target_host)?.links(feature);
        let effective = |l: &Link| if spec.role_labels { l.role.clone() } else { None };
        let duplicate = existing.iter().any(|l| {
            l.target == target && (!spec.role_distinguishes_target() || effective(l) == role)
        });
        if duplicate {
            return Err(MergeError::AlreadyMerged {
                layer: layer.name.clone(),
                link: link_position,
            });
        }

        let slot = document
            .target_mut()
            .push_link(target_host, feature, Link { role, target })?;
        debug!(layer = %layer.name, link = %link_position, "link created");
        Ok(MergeOutcome::Created(ItemRef::Link {
            host: target_host,
            feature: feature.to_string(),
            slot,
        }))
    }

    pub(crate) fn document_into(
        &self,
        document: &mut Document,
        source: &Source<'_>,
        target_index: &PositionIndex,
        id: AnnotationId,
    ) -> MergeResult<MergeOutcome> {
        let annotation = source.annotation(document, id)?;
        let adapter = self.adapter(&annotation.layer)?;
        let layer = adapter.layer();
        if !matches!(layer.kind, LayerKind::Document { .. }) {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("document copy on a {} layer", layer.kind.name()),
            ));
        }
        if annotation.anchor != Anchor::Document {
            return Err(MergeError::unsupported(
                &layer.name,
                format!("{} anchor on a document layer", annotation.anchor.name()),
            ));
        }

        let position = Position::Document {
            layer: layer.name.clone(),
            document: document.id().clone(),
        };
        let label = adapter.primitive_label(&annotation);
        let existing = target_index.annotations_at(&position);

        if find_equal(document.target(), adapter, existing, &label).is_some() {
            return Err(already_exists(layer, position));
        }

        if layer.is_singleton() {
            match existing {
                [] => {}
                [only] => {
                    overwrite(document.target_mut(), *only, &annotation.features)?;
                    debug!(layer = %layer.name, "document label overwritten");
                    return Ok(MergeOutcome::Updated(ItemRef::Annotation(*only)));
                }
                many => {
                    return Err(MergeError::AmbiguousTargetCandidates {
                        layer: layer.name.clone(),
                        position,
                        count: many.len(),
                    })
                }
            }
        }

        let mut copy = Annotation::document(&layer.name);
        copy.features = annotation.features;
        let created = document.target_mut().insert(copy);
        debug!(layer = %layer.name, annotation = %created, "document label created");
        Ok(MergeOutcome::Created(ItemRef::Annotation(created)))
    }
}
