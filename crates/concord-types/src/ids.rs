use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of one annotator: an independent source of annotations over the
/// shared document.
///
/// Annotator identities are ordered so that every collection keyed by
/// annotator iterates deterministically regardless of insertion order.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatorId(String);

impl AnnotatorId {
    /// Create an annotator identity from a user name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse a user-supplied name, rejecting blank input.
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyIdentifier);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The annotator name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotatorId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotatorId({})", self.0)
    }
}

impl fmt::Display for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the shared document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The document name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of an annotation inside one annotation collection.
///
/// Handles are arena slots: they are only meaningful relative to the
/// collection that issued them and stay stable when other annotations are
/// removed. Cross-references (relation endpoints, link targets) are stored as
/// handles into the same collection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(u32);

impl AnnotationId {
    /// Create a handle from a raw arena slot.
    pub fn from_raw(slot: u32) -> Self {
        Self(slot)
    }

    /// The arena slot as an index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// The raw slot value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let id = AnnotatorId::parse("  alice ").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn parse_rejects_blank() {
        assert_eq!(AnnotatorId::parse("   "), Err(TypeError::EmptyIdentifier));
    }

    #[test]
    fn annotators_order_by_name() {
        let a = AnnotatorId::new("alice");
        let b = AnnotatorId::new("bob");
        assert!(a < b);
    }

    #[test]
    fn annotator_serializes_as_plain_string() {
        let id = AnnotatorId::new("carol");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"carol\"");
        let parsed: AnnotatorId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn annotation_id_index() {
        let id = AnnotationId::from_raw(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "#7");
        assert_eq!(format!("{id:?}"), "AnnotationId(7)");
    }

    #[test]
    fn display_formats() {
        assert_eq!(DocumentId::new("doc-1").to_string(), "doc-1");
        assert_eq!(format!("{:?}", AnnotatorId::new("x")), "AnnotatorId(x)");
    }
}
