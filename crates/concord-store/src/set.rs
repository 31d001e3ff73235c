use concord_types::AnnotationId;
use serde::{Deserialize, Serialize};

use crate::annotation::{Anchor, Annotation, Link};
use crate::error::{StoreError, StoreResult};

/// Arena of annotations addressed by stable handles.
///
/// Slots are never reused: removing an annotation leaves an empty slot, so
/// a handle held elsewhere can never silently start pointing at a different
/// annotation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<Annotation>>", into = "Vec<Option<Annotation>>")]
pub struct AnnotationSet {
    slots: Vec<Option<Annotation>>,
    live: usize,
}

impl AnnotationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an annotation and return its handle.
    pub fn insert(&mut self, annotation: Annotation) -> AnnotationId {
        let id = AnnotationId::from_raw(self.slots.len() as u32);
        self.slots.push(Some(annotation));
        self.live += 1;
        id
    }

    /// Borrow an annotation.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Borrow an annotation mutably.
    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Borrow an annotation, failing with [`StoreError::NotFound`].
    pub fn require(&self, id: AnnotationId) -> StoreResult<&Annotation> {
        self.get(id).ok_or(StoreError::NotFound(id))
    }

    /// Remove an annotation. Returns the removed annotation if it existed.
    ///
    /// References held by other annotations are left untouched; callers that
    /// remove endpoint annotations are responsible for their dependants.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.slots.get_mut(id.index()).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Returns `true` if the handle refers to a live annotation.
    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live annotations.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the set holds no annotations.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Remove every annotation. Handles issued before stay invalid.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.live = 0;
    }

    /// Iterate live annotations in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|a| (AnnotationId::from_raw(i as u32), a)))
    }

    /// Iterate live annotations of one layer in handle order.
    pub fn iter_layer<'a>(
        &'a self,
        layer: &'a str,
    ) -> impl Iterator<Item = (AnnotationId, &'a Annotation)> + 'a {
        self.iter().filter(move |(_, a)| a.layer == layer)
    }

    /// Append a link to a link feature of a span annotation and return the
    /// slot index of the new link.
    pub fn push_link(
        &mut self,
        host: AnnotationId,
        feature: &str,
        link: Link,
    ) -> StoreResult<usize> {
        if !self.contains(link.target) {
            return Err(StoreError::DanglingReference {
                annotation: host,
                reference: link.target,
            });
        }
        let annotation = self.get_mut(host).ok_or(StoreError::NotFound(host))?;
        if !matches!(annotation.anchor, Anchor::Span(_)) {
            return Err(StoreError::AnchorMismatch {
                annotation: host,
                expected: "span",
            });
        }
        let links = annotation.links.entry(feature.to_string()).or_default();
        links.push(link);
        Ok(links.len() - 1)
    }

    /// Check that every relation endpoint and link target resolves to a live
    /// annotation of this set.
    pub fn validate_references(&self) -> StoreResult<()> {
        for (id, annotation) in self.iter() {
            for reference in annotation.references() {
                if !self.contains(reference) {
                    return Err(StoreError::DanglingReference {
                        annotation: id,
                        reference,
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<Option<Annotation>>> for AnnotationSet {
    fn from(slots: Vec<Option<Annotation>>) -> Self {
        let live = slots.iter().filter(|s| s.is_some()).count();
        Self { slots, live }
    }
}

impl From<AnnotationSet> for Vec<Option<Annotation>> {
    fn from(set: AnnotationSet) -> Self {
        set.slots
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut set = Self::new();
        for annotation in iter {
            set.insert(annotation);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_types::Offsets;

    fn span(layer: &str, begin: usize, end: usize) -> Annotation {
        Annotation::span(layer, Offsets::new(begin, end).unwrap())
    }

    #[test]
    fn insert_and_get() {
        let mut set = AnnotationSet::new();
        let id = set.insert(span("pos", 0, 4));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(id).unwrap().layer, "pos");
        assert!(set.require(AnnotationId::from_raw(9)).is_err());
    }

    #[test]
    fn handles_stay_stable_after_removal() {
        let mut set = AnnotationSet::new();
        let a = set.insert(span("pos", 0, 4));
        let b = set.insert(span("pos", 5, 9));
        assert!(set.remove(a).is_some());
        assert!(set.remove(a).is_none());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(b).unwrap().offsets(), Some(Offsets::new(5, 9).unwrap()));

        let c = set.insert(span("pos", 10, 12));
        assert_ne!(c, a, "slots are never reused");
    }

    #[test]
    fn iter_layer_filters() {
        let set: AnnotationSet = vec![span("pos", 0, 1), span("ner", 0, 1), span("pos", 2, 3)]
            .into_iter()
            .collect();
        assert_eq!(set.iter_layer("pos").count(), 2);
        assert_eq!(set.iter_layer("ner").count(), 1);
        assert_eq!(set.iter_layer("none").count(), 0);
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set: AnnotationSet = vec![span("pos", 0, 1)].into_iter().collect();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn push_link_validates_host_and_target() {
        let mut set = AnnotationSet::new();
        let host = set.insert(span("event", 0, 0));
        let target = set.insert(span("token", 0, 0));
        let doc = set.insert(Annotation::document("label"));

        let slot = set.push_link(host, "args", Link::new("slot1", target)).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(set.get(host).unwrap().links("args").len(), 1);

        let missing = AnnotationId::from_raw(42);
        assert!(matches!(
            set.push_link(host, "args", Link::unlabeled(missing)),
            Err(StoreError::DanglingReference { .. })
        ));
        assert!(matches!(
            set.push_link(doc, "args", Link::unlabeled(target)),
            Err(StoreError::AnchorMismatch { .. })
        ));
    }

    #[test]
    fn validate_references_detects_dangling_relation() {
        let mut set = AnnotationSet::new();
        let a = set.insert(span("token", 0, 1));
        set.insert(Annotation::relation("dep", a, AnnotationId::from_raw(7)));
        assert_eq!(
            set.validate_references(),
            Err(StoreError::DanglingReference {
                annotation: AnnotationId::from_raw(1),
                reference: AnnotationId::from_raw(7),
            })
        );
    }

    #[test]
    fn serde_roundtrip_keeps_holes() {
        let mut set = AnnotationSet::new();
        let a = set.insert(span("pos", 0, 1));
        let b = set.insert(span("pos", 2, 3));
        set.remove(a);
        let json = serde_json::to_string(&set).unwrap();
        let back: AnnotationSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.get(a).is_none());
        assert!(back.get(b).is_some());
    }
}
