//! Layer and feature schema registry for Concord.
//!
//! A [`Schema`] describes every annotation layer the diff and merge engines
//! may encounter: its structural [`LayerKind`], how it is anchored to the
//! text, which overlap and stacking it permits, and how each of its features
//! takes part in equality.
//!
//! The schema is supplied by the surrounding configuration subsystem. It is
//! plain data: serde-serializable, loadable from TOML, and validated once on
//! construction so the engines can rely on its invariants.
//!
//! # Key Types
//!
//! - [`Layer`] / [`LayerKind`] -- One annotation kind and its structural type
//! - [`Anchoring`] / [`OverlapMode`] -- Anchoring granularity and overlap policy
//! - [`FeatureSpec`] / [`CompareBehavior`] -- Per-feature equality behaviour
//! - [`LinkSpec`] / [`LinkMultiplicity`] -- Link (slot) feature semantics
//! - [`LinkCompareBehavior`] -- Caller flag: role or target as the link label

pub mod error;
pub mod feature;
pub mod layer;
pub mod registry;

pub use error::{SchemaError, SchemaResult};
pub use feature::{
    CompareBehavior, FeatureKind, FeatureSpec, LinkCompareBehavior, LinkMultiplicity, LinkSpec,
};
pub use layer::{Anchoring, Layer, LayerKind, OverlapMode};
pub use registry::Schema;
