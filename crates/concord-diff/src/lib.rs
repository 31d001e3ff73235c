//! Structural diff engine for Concord.
//!
//! Partitions the annotations of N annotators into comparable groups by
//! structural position and classifies each group as agreeing, disagreeing
//! or incomplete. This is not a text diff: positions are typed keys derived
//! per layer, and equality is a per-layer projection of feature values.
//!
//! # Key Types
//!
//! - [`Position`] / [`LinkKey`] -- Canonical grouping key of an annotation or link
//! - [`LayerAdapter`] / [`LayerAdapters`] -- Per-kind position extraction and label projection
//! - [`Label`] -- The comparable projection of an annotation's features
//! - [`PositionIndex`] -- Positions and labels of one collection
//! - [`ConfigurationSet`] / [`Configuration`] / [`Classification`] -- One position across annotators
//! - [`DiffResult`] / [`DiffSummary`] -- The full classified partition
//!
//! The engine never fails: incompleteness, disagreement, same-annotator
//! collisions and unresolvable references are all reported as data.

pub mod adapter;
pub mod config_set;
pub mod engine;
pub mod error;
pub mod index;
pub mod label;
pub mod position;
pub mod result;

pub use adapter::{LayerAdapter, LayerAdapters, PositionContext};
pub use config_set::{Classification, Configuration, ConfigurationSet, ItemRef};
pub use engine::{diff, diff_document};
pub use error::{AdapterResult, DiffError};
pub use index::{IndexedItem, PositionIndex, Unresolved};
pub use label::{Label, LabelValue, LinkLabel};
pub use position::{LinkKey, Position};
pub use result::{DiffResult, DiffSummary, LayerSummary, Unpositioned};
