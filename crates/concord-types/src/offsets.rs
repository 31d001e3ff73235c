use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A half-open character range `[begin, end)` over the document text.
///
/// Offsets order by `begin` first and `end` second, which is the reading
/// order used when positions are listed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Offsets {
    pub begin: usize,
    pub end: usize,
}

impl Offsets {
    /// Create offsets, rejecting ranges whose begin lies after their end.
    pub fn new(begin: usize, end: usize) -> Result<Self, TypeError> {
        if begin > end {
            return Err(TypeError::InvalidOffsets { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Number of characters covered.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Returns `true` for a zero-width range.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Returns `true` if the two ranges share at least one character, or if
    /// both are zero-width at the same point.
    pub fn overlaps(&self, other: &Offsets) -> bool {
        if self == other {
            return true;
        }
        self.begin < other.end && other.begin < self.end
    }

    /// Returns `true` if `other` lies completely inside `self`.
    pub fn contains(&self, other: &Offsets) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Offsets) -> Offsets {
        Offsets {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Offsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

impl fmt::Display for Offsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}
