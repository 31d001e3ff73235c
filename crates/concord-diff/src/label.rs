//! Label projection: the comparable view of an annotation's features.
//!
//! Feature equality between annotations is defined as equality of their
//! labels. Because a label is plain ordered data, agreement is an
//! equivalence relation and configurations can be grouped by label.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use concord_schema::Layer;
use concord_store::Annotation;

use crate::position::Position;

/// One link as it takes part in a host's label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub target: Position,
}

/// A compared value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelValue {
    /// A primitive or structured feature value as canonical JSON text.
    Value(String),
    /// A link feature as the sorted multiset of its links.
    Links(Vec<LinkLabel>),
    /// The target of a single link.
    Target(Position),
}

/// The comparable projection of an annotation (or of one link).
///
/// Excluded features never appear; `null` values and empty link lists are
/// omitted so that "unset" and "set to nothing" compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(BTreeMap<String, LabelValue>);

impl Label {
    /// An empty label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a compared value.
    pub fn insert(&mut self, name: impl Into<String>, value: LabelValue) {
        self.0.insert(name.into(), value);
    }

    /// Look up a compared value.
    pub fn get(&self, name: &str) -> Option<&LabelValue> {
        self.0.get(name)
    }

    /// Number of compared values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is compared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate compared values by name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LabelValue)> {
        self.0.iter()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| match value {
                LabelValue::Value(v) => format!("{name}={v}"),
                LabelValue::Links(links) => format!("{name}=[{} links]", links.len()),
                LabelValue::Target(p) => format!("{name}={p}"),
            })
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Canonical text of a feature value, or `None` for `null`.
///
/// `serde_json` keeps object keys sorted, so structurally equal values
/// always render identically.
pub fn canonical_value(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Label of the compared primitive features of an annotation.
pub fn primitive_label(layer: &Layer, annotation: &Annotation) -> Label {
    let mut label = Label::new();
    for spec in layer.primitive_features().filter(|f| f.is_compared()) {
        if let Some(text) = annotation.features.get(&spec.name).and_then(canonical_value) {
            label.insert(spec.name.clone(), LabelValue::Value(text));
        }
    }
    label
}
