//! Inclusive source spans.

use std::fmt;

use verso_common::{Result, error::Error};

/// A contiguous, inclusive span `[start, end]` of source word positions.
///
/// `SourceRange` is a plain value type. Unlike `std::ops::Range`, the end position
/// is inclusive, which matches how phrase spans are addressed throughout the decoder
/// (a single-word phrase at position 3 is `[3, 3]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRange {
    start: usize,
    end: usize,
}

impl SourceRange {
    /// Creates a new range.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> SourceRange {
        assert!(start <= end, "inverted range [{start}, {end}]");
        SourceRange { start, end }
    }

    /// Creates a range covering exactly one position.
    pub fn single(pos: usize) -> SourceRange {
        SourceRange {
            start: pos,
            end: pos,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of positions in the range (always at least 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always `false`; present for API symmetry with collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Returns `true` if the two ranges share at least one position.
    #[inline]
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of positions strictly between two non-overlapping ranges.
    ///
    /// Adjacent ranges have zero words between them. Calling this on overlapping
    /// ranges is a contract violation.
    pub fn num_words_between(&self, other: &SourceRange) -> Result<usize> {
        if self.overlaps(other) {
            return Err(Error::contract_violation(format!(
                "num_words_between called on overlapping ranges {self} and {other}"
            )));
        }
        if self.end < other.start {
            Ok(other.start - self.end - 1)
        } else {
            Ok(self.start - other.end - 1)
        }
    }

    /// Returns the positions of the range as a half-open `std::ops::Range`.
    pub fn as_std_range(&self) -> std::ops::Range<usize> {
        self.start..self.end + 1
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = SourceRange::new(2, 4);
        assert!(a.overlaps(&SourceRange::new(4, 6)));
        assert!(a.overlaps(&SourceRange::new(0, 2)));
        assert!(a.overlaps(&SourceRange::single(3)));
        assert!(a.overlaps(&SourceRange::new(0, 9)));
        assert!(!a.overlaps(&SourceRange::new(5, 6)));
        assert!(!a.overlaps(&SourceRange::single(1)));
    }

    #[test]
    fn test_num_words_between() {
        let a = SourceRange::new(2, 3);
        assert_eq!(a.num_words_between(&SourceRange::single(4)).unwrap(), 0);
        assert_eq!(a.num_words_between(&SourceRange::new(7, 8)).unwrap(), 3);
        assert_eq!(SourceRange::new(7, 8).num_words_between(&a).unwrap(), 3);
        assert_eq!(a.num_words_between(&SourceRange::single(0)).unwrap(), 1);
    }

    #[test]
    fn test_num_words_between_overlap_is_contract_violation() {
        let err = SourceRange::new(2, 5)
            .num_words_between(&SourceRange::new(5, 6))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    #[should_panic]
    fn test_inverted_range_panics() {
        let _ = SourceRange::new(3, 2);
    }

    #[test]
    fn test_len_and_display() {
        let r = SourceRange::new(1, 3);
        assert_eq!(r.len(), 3);
        assert_eq!(r.as_std_range(), 1..4);
        assert_eq!(r.to_string(), "[1..3]");
    }
}
