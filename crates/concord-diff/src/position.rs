//! The position model: canonical keys that group equivalent annotations.
//!
//! Two annotations from different annotators are "at the same position" iff
//! their [`Position`]s are equal. Equality, ordering and hashing are all
//! derived from the structure, so the relation is reflexive, symmetric and
//! transitive by construction.

use std::fmt;

use concord_types::{DocumentId, Offsets};
use serde::{Deserialize, Serialize};

/// Key that separates the links of one host feature from each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKey {
    /// Links are grouped by role; the target is compared.
    Role(Option<String>),
    /// Links are grouped by target; the role is compared.
    Target(Box<Position>),
    /// Each (role, target) pair is its own position; presence is compared.
    RoleAndTarget(Option<String>, Box<Position>),
}

/// Canonical position of an annotation or of one link of a link feature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    /// A whole-document annotation.
    Document { layer: String, document: DocumentId },
    /// A span or link-host annotation.
    ///
    /// `discriminator` holds the sorted `(feature, role)` pairs of the
    /// layer's discriminating link features, or `None` if the layer declares
    /// none. Hosts at equal offsets with different role sets are therefore
    /// distinct positions.
    Span {
        layer: String,
        begin: usize,
        end: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discriminator: Option<Vec<(String, Option<String>)>>,
    },
    /// A relation, positioned by its resolved endpoint positions.
    Relation {
        layer: String,
        source: Box<Position>,
        target: Box<Position>,
    },
    /// One link of a link feature on a positioned host.
    Link {
        host: Box<Position>,
        feature: String,
        key: LinkKey,
    },
}

impl Position {
    /// A plain span position without discriminator.
    pub fn span(layer: impl Into<String>, offsets: Offsets) -> Self {
        Self::Span {
            layer: layer.into(),
            begin: offsets.begin,
            end: offsets.end,
            discriminator: None,
        }
    }

    /// The layer this position belongs to. Link positions belong to their
    /// host's layer.
    pub fn layer(&self) -> &str {
        match self {
            Self::Document { layer, .. } | Self::Span { layer, .. } | Self::Relation { layer, .. } => {
                layer
            }
            Self::Link { host, .. } => host.layer(),
        }
    }

    /// Offsets of a span position.
    pub fn offsets(&self) -> Option<Offsets> {
        match self {
            Self::Span { begin, end, .. } => Some(Offsets {
                begin: *begin,
                end: *end,
            }),
            _ => None,
        }
    }

    /// Merge order: document labels, spans, relations, then links.
    ///
    /// Relations and links can only be materialized once the positions they
    /// reference exist in the target.
    pub fn merge_rank(&self) -> u8 {
        match self {
            Self::Document { .. } => 0,
            Self::Span { .. } => 1,
            Self::Relation { .. } => 2,
            Self::Link { .. } => 3,
        }
    }

    /// Returns `true` for link positions.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link { .. })
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "{}", role.as_deref().unwrap_or("*")),
            Self::Target(target) => write!(f, "-> {target}"),
            Self::RoleAndTarget(role, target) => {
                write!(f, "{} -> {target}", role.as_deref().unwrap_or("*"))
            }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document { layer, document } => write!(f, "{layer}@{document}"),
            Self::Span {
                layer,
                begin,
                end,
                discriminator,
            } => {
                write!(f, "{layer}[{begin}, {end})")?;
                if let Some(pairs) = discriminator {
                    let roles: Vec<String> = pairs
                        .iter()
                        .map(|(feature, role)| {
                            format!("{feature}:{}", role.as_deref().unwrap_or("*"))
                        })
                        .collect();
                    write!(f, "{{{}}}", roles.join(","))?;
                }
                Ok(())
            }
            Self::Relation {
                layer,
                source,
                target,
            } => write!(f, "{layer}({source} -> {target})"),
            Self::Link { host, feature, key } => write!(f, "{host}.{feature}[{key}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn span(layer: &str, begin: usize, end: usize) -> Position {
        Position::span(layer, Offsets::new(begin, end).unwrap())
    }

    #[test]
    fn equal_spans_are_equal_positions() {
        assert_eq!(span("pos", 0, 4), span("pos", 0, 4));
        assert_ne!(span("pos", 0, 4), span("ner", 0, 4));
        assert_ne!(span("pos", 0, 4), span("pos", 0, 5));
    }

    #[test]
    fn discriminator_separates_hosts() {
        let plain = span("event", 0, 0);
        let with_roles = Position::Span {
            layer: "event".into(),
            begin: 0,
            end: 0,
            discriminator: Some(vec![("args".into(), Some("agent".into()))]),
        };
        assert_ne!(plain, with_roles);
    }

    #[test]
    fn relations_compare_by_endpoint_positions() {
        let a = Position::Relation {
            layer: "dep".into(),
            source: Box::new(span("tok", 0, 4)),
            target: Box::new(span("tok", 5, 9)),
        };
        let b = Position::Relation {
            layer: "dep".into(),
            source: Box::new(span("tok", 0, 4)),
            target: Box::new(span("tok", 5, 9)),
        };
        let reversed = Position::Relation {
            layer: "dep".into(),
            source: Box::new(span("tok", 5, 9)),
            target: Box::new(span("tok", 0, 4)),
        };
        assert_eq!(a, b);
        assert_ne!(a, reversed);
        assert_eq!(a.layer(), "dep");
    }

    #[test]
    fn link_position_uses_host_layer() {
        let link = Position::Link {
            host: Box::new(span("event", 0, 0)),
            feature: "args".into(),
            key: LinkKey::Role(Some("slot1".into())),
        };
        assert_eq!(link.layer(), "event");
        assert!(link.is_link());
        assert_eq!(link.to_string(), "event[0, 0).args[slot1]");
    }

    #[test]
    fn merge_rank_orders_kinds() {
        let doc = Position::Document {
            layer: "label".into(),
            document: DocumentId::new("d"),
        };
        let rel = Position::Relation {
            layer: "dep".into(),
            source: Box::new(span("tok", 0, 1)),
            target: Box::new(span("tok", 1, 2)),
        };
        assert!(doc.merge_rank() < span("tok", 0, 1).merge_rank());
        assert!(span("tok", 0, 1).merge_rank() < rel.merge_rank());
    }

    #[test]
    fn display_formats() {
        assert_eq!(span("pos", 0, 4).to_string(), "pos[0, 4)");
        let doc = Position::Document {
            layer: "label".into(),
            document: DocumentId::new("doc-1"),
        };
        assert_eq!(doc.to_string(), "label@doc-1");
    }

    fn arb_position() -> impl Strategy<Value = Position> {
        let leaf = (prop::sample::select(vec!["a", "b"]), 0usize..4, 0usize..3)
            .prop_map(|(layer, begin, len)| span(layer, begin, begin + len));
        leaf.prop_recursive(2, 8, 2, |inner| {
            (inner.clone(), inner).prop_map(|(s, t)| Position::Relation {
                layer: "rel".into(),
                source: Box::new(s),
                target: Box::new(t),
            })
        })
    }

    proptest! {
        #[test]
        fn equality_is_an_equivalence(a in arb_position(), b in arb_position(), c in arb_position()) {
            prop_assert_eq!(&a, &a.clone());
            prop_assert_eq!(a == b, b == a);
            if a == b && b == c {
                prop_assert_eq!(&a, &c);
            }
        }

        #[test]
        fn hash_agrees_with_equality(a in arb_position(), b in arb_position()) {
            let mut set = HashSet::new();
            set.insert(a.clone());
            prop_assert_eq!(set.contains(&b), a == b);
        }
    }
}
