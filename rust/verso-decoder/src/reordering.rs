//! Reordering limits: the distortion limit and hard constraints such as walls.

use std::fmt;

use verso_coverage::{CoverageBitmap, SourceRange};

use crate::sentence::Word;

/// Jump between the end of `prev` and the start of `cur`.
///
/// A monotone continuation (`cur` starts right after `prev`) has distance 0.
/// Without a previous phrase the jump is measured from the sentence start.
pub fn distortion_distance(prev: Option<&SourceRange>, cur: &SourceRange) -> usize {
    match prev {
        Some(prev) => (prev.end() + 1).abs_diff(cur.start()),
        None => cur.start(),
    }
}

/// Hard constraint vetoing spans for a given coverage.
pub trait ReorderingConstraint: fmt::Debug + Send + Sync {
    /// Returns `true` if `[start, end]` may be translated next.
    fn check(&self, bitmap: &CoverageBitmap, start: usize, end: usize) -> bool;
}

/// Walls forbid leaving a gap behind a wall position.
///
/// While any position before the candidate span is untranslated, the span may
/// not cross a wall: a phrase that does not fill the first gap must end before
/// the next wall following that gap.
#[derive(Debug, Clone, Default)]
pub struct Walls {
    walls: Vec<bool>,
}

impl Walls {
    pub fn new(len: usize) -> Walls {
        Walls {
            walls: vec![false; len],
        }
    }

    /// Places a wall at every token made only of punctuation.
    pub fn at_punctuation(words: &[Word]) -> Walls {
        Walls {
            walls: words
                .iter()
                .map(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_punctuation()))
                .collect(),
        }
    }

    pub fn set_wall(&mut self, pos: usize) {
        self.walls[pos] = true;
    }

    pub fn is_wall(&self, pos: usize) -> bool {
        self.walls.get(pos).copied().unwrap_or(false)
    }
}

impl ReorderingConstraint for Walls {
    fn check(&self, bitmap: &CoverageBitmap, start: usize, end: usize) -> bool {
        let Some(first_gap) = bitmap.first_gap() else {
            return true;
        };
        if first_gap == start {
            return true;
        }
        !(first_gap..end).any(|pos| self.is_wall(pos))
    }
}

/// Decides which spans a hypothesis may translate next.
#[derive(Debug, Clone, Copy)]
pub struct ReorderingPolicy<'a> {
    max_distortion: Option<usize>,
    constraint: Option<&'a dyn ReorderingConstraint>,
}

impl<'a> ReorderingPolicy<'a> {
    pub fn new(
        max_distortion: Option<usize>,
        constraint: Option<&'a dyn ReorderingConstraint>,
    ) -> ReorderingPolicy<'a> {
        ReorderingPolicy {
            max_distortion,
            constraint,
        }
    }

    pub fn max_distortion(&self) -> Option<usize> {
        self.max_distortion
    }

    /// Full admissibility check of `candidate` for a hypothesis with coverage
    /// `bitmap` whose last phrase was `prev_range`.
    pub fn can_extend(
        &self,
        bitmap: &CoverageBitmap,
        prev_range: Option<&SourceRange>,
        candidate: &SourceRange,
    ) -> bool {
        self.allows_span(bitmap, candidate) && self.allows_jump(prev_range, candidate)
    }

    /// The part of [`can_extend`](Self::can_extend) that depends only on the
    /// coverage: overlap, hard constraint, and whether the first gap can still
    /// be reached after translating `candidate`.
    pub fn allows_span(&self, bitmap: &CoverageBitmap, candidate: &SourceRange) -> bool {
        if bitmap.overlaps(candidate) {
            return false;
        }
        if let Some(constraint) = self.constraint {
            if !constraint.check(bitmap, candidate.start(), candidate.end()) {
                return false;
            }
        }
        let Some(max) = self.max_distortion else {
            return true;
        };
        match bitmap.first_gap() {
            Some(first_gap) if candidate.start() != first_gap => {
                distortion_distance(Some(candidate), &SourceRange::single(first_gap)) <= max
            }
            _ => true,
        }
    }

    /// The part of [`can_extend`](Self::can_extend) that depends on the
    /// previous phrase: the jump to `candidate` must respect the limit.
    pub fn allows_jump(&self, prev_range: Option<&SourceRange>, candidate: &SourceRange) -> bool {
        match self.max_distortion {
            None => true,
            Some(max) => {
                distortion_distance(prev_range, &SourceRange::single(candidate.start())) <= max
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(pattern: &str) -> CoverageBitmap {
        CoverageBitmap::from_bits(&pattern.chars().map(|c| c == '1').collect::<Vec<_>>())
    }

    #[test]
    fn test_distortion_distance() {
        let r = SourceRange::new;
        assert_eq!(distortion_distance(None, &r(0, 1)), 0);
        assert_eq!(distortion_distance(None, &r(3, 3)), 3);
        assert_eq!(distortion_distance(Some(&r(0, 1)), &r(2, 2)), 0);
        assert_eq!(distortion_distance(Some(&r(0, 1)), &r(4, 5)), 2);
        assert_eq!(distortion_distance(Some(&r(4, 5)), &r(0, 1)), 6);
        assert_eq!(distortion_distance(Some(&r(2, 2)), &r(2, 2)), 1);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let policy = ReorderingPolicy::new(None, None);
        let bitmap = bits("0110");
        assert!(!policy.can_extend(&bitmap, None, &SourceRange::new(0, 1)));
        assert!(!policy.can_extend(&bitmap, None, &SourceRange::single(2)));
        assert!(policy.can_extend(&bitmap, None, &SourceRange::single(3)));
    }

    #[test]
    fn test_zero_distortion_is_monotone() {
        let policy = ReorderingPolicy::new(Some(0), None);
        let empty = bits("000");
        assert!(policy.can_extend(&empty, None, &SourceRange::new(0, 1)));
        assert!(!policy.can_extend(&empty, None, &SourceRange::single(1)));
        assert!(!policy.can_extend(&empty, None, &SourceRange::single(2)));

        let one = bits("100");
        let prev = SourceRange::single(0);
        assert!(policy.can_extend(&one, Some(&prev), &SourceRange::single(1)));
        assert!(policy.can_extend(&one, Some(&prev), &SourceRange::new(1, 2)));
        assert!(!policy.can_extend(&one, Some(&prev), &SourceRange::single(2)));
    }

    #[test]
    fn test_future_distortion_at_sentence_edges() {
        let policy = ReorderingPolicy::new(Some(2), None);
        let empty = bits("000000");

        assert!(!policy.can_extend(&empty, None, &SourceRange::single(5)));
        // [1,1]: jump 1, then back to 0 costs |2 - 0| = 2
        assert!(policy.can_extend(&empty, None, &SourceRange::single(1)));
        // [2,2]: jump 2 is allowed but returning costs 3
        assert!(!policy.can_extend(&empty, None, &SourceRange::single(2)));
        // covering the first gap is always fine when the jump is
        assert!(policy.can_extend(&empty, None, &SourceRange::new(0, 5)));

        let tail = bits("111100");
        let prev = SourceRange::new(2, 3);
        assert!(policy.can_extend(&tail, Some(&prev), &SourceRange::single(5)));
        let tight = ReorderingPolicy::new(Some(1), None);
        // skipping position 4 would need a jump of 2 to come back
        assert!(!tight.can_extend(&tail, Some(&prev), &SourceRange::single(5)));
        assert!(tight.can_extend(&tail, Some(&prev), &SourceRange::new(4, 5)));
        assert!(tight.can_extend(&tail, Some(&prev), &SourceRange::single(4)));
    }

    #[test]
    fn test_exhaustive_small_bitmaps_match_definition() {
        for max in 0..4 {
            let policy = ReorderingPolicy::new(Some(max), None);
            for mask in 0u32..(1 << 5) {
                let flags = (0..5).map(|i| mask & (1 << i) != 0).collect::<Vec<_>>();
                let bitmap = CoverageBitmap::from_bits(&flags);
                for start in 0..5 {
                    for end in start..5 {
                        let candidate = SourceRange::new(start, end);
                        for prev_end in [None, Some(0), Some(2), Some(4)] {
                            let prev = prev_end.map(SourceRange::single);
                            let overlap = flags[start..=end].iter().any(|b| *b);
                            let jump = match prev_end {
                                None => start,
                                Some(p) => (p + 1).abs_diff(start),
                            };
                            let back = match bitmap.first_gap() {
                                Some(gap) if gap != start => (end + 1).abs_diff(gap),
                                _ => 0,
                            };
                            let expected = !overlap && jump <= max && back <= max;
                            assert_eq!(
                                policy.can_extend(&bitmap, prev.as_ref(), &candidate),
                                expected,
                                "max={max} bitmap={bitmap} prev={prev:?} cand={candidate}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_walls() {
        let words = ["a", "b", ",", "c", "d"].map(Word::from);
        let walls = Walls::at_punctuation(&words);
        assert!(walls.is_wall(2));
        assert!(!walls.is_wall(1));

        let policy = ReorderingPolicy::new(None, Some(&walls));
        let empty = bits("00000");
        // filling the first gap is always allowed
        assert!(policy.can_extend(&empty, None, &SourceRange::new(0, 4)));
        assert!(policy.can_extend(&empty, None, &SourceRange::single(1)));
        // leaving position 0 open while crossing the wall is not
        assert!(!policy.can_extend(&empty, None, &SourceRange::single(3)));
        assert!(!policy.can_extend(&empty, None, &SourceRange::new(1, 3)));
        // once everything before the wall is done the rest is free
        let done = bits("11100");
        assert!(policy.can_extend(&done, None, &SourceRange::single(4)));
    }
}
