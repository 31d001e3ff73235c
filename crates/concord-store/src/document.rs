use std::collections::BTreeMap;

use concord_types::{AnnotatorId, DocumentId, Offsets};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::Anchor;
use crate::error::{StoreError, StoreResult};
use crate::set::AnnotationSet;

/// The shared document: text, token boundaries, one read-only collection per
/// annotator, and the mutable curation target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    text: String,
    #[serde(default)]
    tokens: Vec<Offsets>,
    #[serde(default)]
    annotators: BTreeMap<AnnotatorId, AnnotationSet>,
    #[serde(default)]
    target: AnnotationSet,
}

impl Document {
    /// Create a document with no tokens, annotators or target annotations.
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tokens: Vec::new(),
            annotators: BTreeMap::new(),
            target: AnnotationSet::new(),
        }
    }

    /// Set token boundaries used by token-aligned layers. Tokens are kept in
    /// reading order.
    pub fn with_tokens(mut self, mut tokens: Vec<Offsets>) -> Self {
        tokens.sort();
        self.tokens = tokens;
        self
    }

    /// Add one annotator's collection.
    ///
    /// The collection is checked for dangling references and spans beyond
    /// the text before it is accepted; afterwards it is read-only.
    pub fn add_annotator(
        &mut self,
        annotator: impl Into<AnnotatorId>,
        set: AnnotationSet,
    ) -> StoreResult<()> {
        let annotator = annotator.into();
        if self.annotators.contains_key(&annotator) {
            return Err(StoreError::DuplicateAnnotator(annotator));
        }
        set.validate_references()?;
        self.check_bounds(&set)?;
        debug!(annotator = %annotator, annotations = set.len(), "annotator collection added");
        self.annotators.insert(annotator, set);
        Ok(())
    }

    /// Replace the target collection, e.g. with a previously saved curation.
    pub fn set_target(&mut self, set: AnnotationSet) -> StoreResult<()> {
        set.validate_references()?;
        self.check_bounds(&set)?;
        self.target = set;
        Ok(())
    }

    fn check_bounds(&self, set: &AnnotationSet) -> StoreResult<()> {
        let len = self.text_len();
        for (id, annotation) in set.iter() {
            if let Anchor::Span(offsets) = annotation.anchor {
                if offsets.end > len {
                    return Err(StoreError::OutOfBounds {
                        annotation: id,
                        offsets,
                        len,
                    });
                }
            }
        }
        Ok(())
    }

    /// The document identity.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// The document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text length in characters; offsets count characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The text covered by a range, if it lies inside the document.
    pub fn covered_text(&self, offsets: Offsets) -> Option<String> {
        if offsets.end > self.text_len() {
            return None;
        }
        Some(
            self.text
                .chars()
                .skip(offsets.begin)
                .take(offsets.len())
                .collect(),
        )
    }

    /// Token boundaries in reading order.
    pub fn tokens(&self) -> &[Offsets] {
        &self.tokens
    }

    /// Smallest token-aligned range covering `offsets`.
    ///
    /// Returns `None` if no token intersects the range. A zero-width range
    /// snaps to the token containing it.
    pub fn covering_tokens(&self, offsets: Offsets) -> Option<Offsets> {
        self.tokens
            .iter()
            .filter(|t| {
                if offsets.is_empty() {
                    t.begin <= offsets.begin && offsets.begin < t.end
                } else {
                    t.overlaps(&offsets)
                }
            })
            .fold(None, |acc: Option<Offsets>, t| {
                Some(acc.map_or(*t, |a| a.union(t)))
            })
    }

    /// All annotator collections, ordered by annotator.
    pub fn annotators(&self) -> &BTreeMap<AnnotatorId, AnnotationSet> {
        &self.annotators
    }

    /// One annotator's collection.
    pub fn annotator(&self, annotator: &AnnotatorId) -> Option<&AnnotationSet> {
        self.annotators.get(annotator)
    }

    /// The curation target.
    pub fn target(&self) -> &AnnotationSet {
        &self.target
    }

    /// The curation target, mutably. This is the only mutable access to the
    /// document's annotations.
    pub fn target_mut(&mut self) -> &mut AnnotationSet {
        &mut self.target
    }

    /// Split borrow: annotator collections immutably, target mutably.
    pub fn split_for_merge(
        &mut self,
    ) -> (&BTreeMap<AnnotatorId, AnnotationSet>, &mut AnnotationSet) {
        (&self.annotators, &mut self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use concord_types::AnnotationId;

    fn offsets(begin: usize, end: usize) -> Offsets {
        Offsets::new(begin, end).unwrap()
    }

    fn doc() -> Document {
        Document::new("doc-1", "John loves Mary").with_tokens(vec![
            offsets(11, 15),
            offsets(0, 4),
            offsets(5, 10),
        ])
    }

    #[test]
    fn tokens_are_sorted() {
        let d = doc();
        assert_eq!(d.tokens()[0], offsets(0, 4));
        assert_eq!(d.tokens()[2], offsets(11, 15));
    }

    #[test]
    fn covered_text() {
        let d = doc();
        assert_eq!(d.covered_text(offsets(5, 10)).as_deref(), Some("loves"));
        assert_eq!(d.covered_text(offsets(5, 99)), None);
    }

    #[test]
    fn covering_tokens_snaps_outward() {
        let d = doc();
        assert_eq!(d.covering_tokens(offsets(1, 3)), Some(offsets(0, 4)));
        assert_eq!(d.covering_tokens(offsets(2, 7)), Some(offsets(0, 10)));
        assert_eq!(d.covering_tokens(offsets(6, 6)), Some(offsets(5, 10)));
        assert_eq!(d.covering_tokens(offsets(4, 5)), None);
    }

    #[test]
    fn rejects_duplicate_annotator() {
        let mut d = doc();
        d.add_annotator("alice", AnnotationSet::new()).unwrap();
        assert_eq!(
            d.add_annotator("alice", AnnotationSet::new()),
            Err(StoreError::DuplicateAnnotator(AnnotatorId::new("alice")))
        );
    }

    #[test]
    fn rejects_out_of_bounds_span() {
        let mut d = doc();
        let set: AnnotationSet = vec![Annotation::span("pos", offsets(10, 40))]
            .into_iter()
            .collect();
        assert!(matches!(
            d.add_annotator("alice", set),
            Err(StoreError::OutOfBounds { len: 15, .. })
        ));
    }

    #[test]
    fn rejects_dangling_reference() {
        let mut d = doc();
        let mut set = AnnotationSet::new();
        let a = set.insert(Annotation::span("token", offsets(0, 4)));
        set.insert(Annotation::relation("dep", a, AnnotationId::from_raw(5)));
        assert!(matches!(
            d.add_annotator("bob", set),
            Err(StoreError::DanglingReference { .. })
        ));
        assert!(d.annotators().is_empty());
    }

    #[test]
    fn annotators_iterate_in_order() {
        let mut d = doc();
        d.add_annotator("carol", AnnotationSet::new()).unwrap();
        d.add_annotator("alice", AnnotationSet::new()).unwrap();
        let names: Vec<_> = d.annotators().keys().map(|a| a.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn target_is_mutable() {
        let mut d = doc();
        d.target_mut().insert(Annotation::document("label"));
        assert_eq!(d.target().len(), 1);
        let (annotators, target) = d.split_for_merge();
        assert!(annotators.is_empty());
        target.clear();
        assert!(d.target().is_empty());
    }
}
