use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty identifier")]
    EmptyIdentifier,

    #[error("invalid offsets: begin {begin} is after end {end}")]
    InvalidOffsets { begin: usize, end: usize },
}
