//! Coverage bitmaps: which source positions a partial translation has consumed.

use std::{fmt, hash::Hash};

use verso_common::{Result, error::Error};

use crate::range::SourceRange;

/// A fixed-length bit vector marking translated source positions.
///
/// The bits are stored LSB-first in `u64` words: position 0 is the least
/// significant bit of the first word, position 64 the least significant bit of
/// the second word, and so on. Bits beyond `len` in the last word are always zero.
///
/// Besides the bits, the bitmap caches two derived values so that the hot paths
/// of the search never rescan the whole vector:
///
/// - `covered`: the population count of the bits
/// - `first_gap`: the smallest uncovered position, or `None` once every position
///   is covered
///
/// Equality and hashing are structural over the bits (and length), so two bitmaps
/// produced along different derivations compare equal when they cover the same
/// positions.
#[derive(Clone)]
pub struct CoverageBitmap {
    len: usize,
    words: Vec<u64>,
    covered: usize,
    first_gap: Option<usize>,
}

impl CoverageBitmap {
    /// Creates an empty bitmap (nothing covered) for a sentence of `len` words.
    pub fn new(len: usize) -> CoverageBitmap {
        CoverageBitmap {
            len,
            words: vec![0u64; len.div_ceil(64)],
            covered: 0,
            first_gap: if len > 0 { Some(0) } else { None },
        }
    }

    /// Creates a bitmap from an explicit per-position slice.
    pub fn from_bits(bits: &[bool]) -> CoverageBitmap {
        let mut bitmap = CoverageBitmap::new(bits.len());
        for (pos, _) in bits.iter().enumerate().filter(|(_, b)| **b) {
            let (word, bit) = Self::bit_position(pos);
            bitmap.words[word] |= 1u64 << bit;
        }
        bitmap.covered = bitmap.words.iter().map(|w| w.count_ones() as usize).sum();
        bitmap.first_gap = bitmap.next_gap_from(0);
        bitmap
    }

    /// Number of source positions tracked by this bitmap.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of covered positions.
    #[inline]
    pub fn words_covered(&self) -> usize {
        self.covered
    }

    /// Smallest uncovered position, `None` iff the bitmap is complete.
    #[inline]
    pub fn first_gap(&self) -> Option<usize> {
        self.first_gap
    }

    /// Largest uncovered position, `None` iff the bitmap is complete.
    pub fn last_gap(&self) -> Option<usize> {
        if self.is_complete() {
            return None;
        }
        for word_idx in (0..self.words.len()).rev() {
            let mut holes = !self.words[word_idx];
            if word_idx == self.words.len() - 1 {
                holes &= Self::tail_mask(self.len);
            }
            if holes != 0 {
                return Some(word_idx * 64 + 63 - holes.leading_zeros() as usize);
            }
        }
        None
    }

    /// Returns `true` once every source position is covered.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.covered == self.len
    }

    /// Returns `true` if `pos` is covered.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len`.
    #[inline]
    pub fn is_covered(&self, pos: usize) -> bool {
        assert!(pos < self.len, "position {pos} out of bounds ({})", self.len);
        let (word, bit) = Self::bit_position(pos);
        self.words[word] & (1u64 << bit) != 0
    }

    /// Returns `true` if any position of `range` is already covered.
    ///
    /// Positions past the end of the bitmap count as not covered.
    pub fn overlaps(&self, range: &SourceRange) -> bool {
        let end = (range.end() + 1).min(self.len);
        let mut hit = false;
        Self::for_each_word_mask(range.start(), end, |word, mask| {
            hit |= self.words[word] & mask != 0;
        });
        hit
    }

    /// Marks every position of `range` as covered.
    ///
    /// The range must lie within the bitmap and must not overlap any covered position;
    /// both conditions are contract violations otherwise. The word count is updated
    /// and the cached first gap is recomputed only when the range starts at it.
    pub fn set_non_overlapping(&mut self, range: &SourceRange) -> Result<()> {
        if range.end() >= self.len {
            return Err(Error::contract_violation(format!(
                "range {range} exceeds sentence length {}",
                self.len
            )));
        }
        if self.overlaps(range) {
            return Err(Error::contract_violation(format!(
                "range {range} overlaps coverage {self}"
            )));
        }
        let words = &mut self.words;
        Self::for_each_word_mask(range.start(), range.end() + 1, |word, mask| {
            words[word] |= mask;
        });
        self.covered += range.len();
        if self.first_gap == Some(range.start()) {
            self.first_gap = self.next_gap_from(range.end() + 1);
        }
        Ok(())
    }

    /// Returns a copy of this bitmap with `range` additionally covered.
    pub fn with_range(&self, range: &SourceRange) -> Result<CoverageBitmap> {
        let mut bitmap = self.clone();
        bitmap.set_non_overlapping(range)?;
        Ok(bitmap)
    }

    /// Scans left from `pos` across uncovered positions.
    ///
    /// Returns the smallest `l <= pos` such that every position in `l..pos` is
    /// uncovered: either the position just after the nearest covered word to the left
    /// of `pos`, or 0.
    pub fn edge_left_of(&self, pos: usize) -> usize {
        let mut l = pos;
        while l > 0 && !self.is_covered(l - 1) {
            l -= 1;
        }
        l
    }

    /// Scans right from `pos` across uncovered positions.
    ///
    /// Returns the largest `r >= pos` such that every position in `pos+1..=r` is
    /// uncovered: either the position just before the nearest covered word to the
    /// right of `pos`, or the last position of the sentence.
    pub fn edge_right_of(&self, pos: usize) -> usize {
        let mut r = pos;
        while r + 1 < self.len && !self.is_covered(r + 1) {
            r += 1;
        }
        r
    }

    /// Iterates over the maximal uncovered spans, left to right.
    pub fn gaps(&self) -> GapsIter<'_> {
        GapsIter {
            bitmap: self,
            next: self.first_gap,
        }
    }

    /// Iterates over covered positions in ascending order.
    pub fn covered_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&pos| self.is_covered(pos))
    }

    fn next_gap_from(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let (mut word_idx, bit) = Self::bit_position(from);
        let mut holes = !self.words[word_idx] & !((1u64 << bit) - 1);
        loop {
            if word_idx == self.words.len() - 1 {
                holes &= Self::tail_mask(self.len);
            }
            if holes != 0 {
                return Some(word_idx * 64 + holes.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx == self.words.len() {
                return None;
            }
            holes = !self.words[word_idx];
        }
    }

    fn next_covered_from(&self, from: usize) -> Option<usize> {
        (from..self.len).find(|&pos| self.is_covered(pos))
    }

    #[inline]
    fn bit_position(pos: usize) -> (usize, usize) {
        (pos / 64, pos % 64)
    }

    /// Mask of the valid bits in the last storage word.
    #[inline]
    fn tail_mask(len: usize) -> u64 {
        match len % 64 {
            0 => u64::MAX,
            partial => (1u64 << partial) - 1,
        }
    }

    /// Calls `f(word_index, mask)` for every storage word touched by the half-open
    /// position range `start..end`, where `mask` selects the bits of that word
    /// falling inside the range.
    fn for_each_word_mask(start: usize, end: usize, mut f: impl FnMut(usize, u64)) {
        if start >= end {
            return;
        }
        let (start_word, start_bit) = Self::bit_position(start);
        let (end_word, end_bit) = Self::bit_position(end);

        if start_word == end_word {
            f(start_word, ((1u64 << end_bit) - 1) & !((1u64 << start_bit) - 1));
            return;
        }

        f(start_word, !((1u64 << start_bit) - 1));
        for word in start_word + 1..end_word {
            f(word, u64::MAX);
        }
        if end_bit > 0 {
            f(end_word, (1u64 << end_bit) - 1);
        }
    }
}

impl PartialEq for CoverageBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.words == other.words
    }
}

impl Eq for CoverageBitmap {}

impl Hash for CoverageBitmap {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        self.words.hash(state);
    }
}

impl fmt::Display for CoverageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in 0..self.len {
            f.write_str(if self.is_covered(pos) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for CoverageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoverageBitmap({self})")
    }
}

/// Iterator over the maximal uncovered spans of a [`CoverageBitmap`].
pub struct GapsIter<'a> {
    bitmap: &'a CoverageBitmap,
    next: Option<usize>,
}

impl Iterator for GapsIter<'_> {
    type Item = SourceRange;

    fn next(&mut self) -> Option<SourceRange> {
        let start = self.next?;
        let end = match self.bitmap.next_covered_from(start) {
            Some(covered) => covered - 1,
            None => self.bitmap.len - 1,
        };
        self.next = self.bitmap.next_gap_from(end + 1);
        Some(SourceRange::new(start, end))
    }
}
