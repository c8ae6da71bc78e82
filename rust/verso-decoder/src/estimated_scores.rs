//! Future-cost estimates.
//!
//! For every source span the table holds the best score any segmentation of
//! that span into options can reach, ignoring context-dependent features. The
//! estimate for a partial translation is the sum of the entries of its maximal
//! uncovered spans, which never underestimates the score still achievable.

use verso_coverage::{CoverageBitmap, SourceRange};

#[derive(Debug, Clone)]
pub struct EstimatedScores {
    size: usize,
    scores: Vec<f32>,
}

impl EstimatedScores {
    /// A table where every span is unreachable.
    pub fn new(size: usize) -> EstimatedScores {
        EstimatedScores {
            size,
            scores: vec![f32::NEG_INFINITY; size * size],
        }
    }

    /// Fills the table from the best option score per span, widening spans one
    /// word at a time and combining the two halves of every split.
    pub fn compute(size: usize, best_option: impl Fn(SourceRange) -> Option<f32>) -> EstimatedScores {
        let mut table = EstimatedScores::new(size);
        for width in 1..=size {
            for start in 0..=size - width {
                let end = start + width - 1;
                let mut best = best_option(SourceRange::new(start, end)).unwrap_or(f32::NEG_INFINITY);
                for split in start..end {
                    best = best.max(table.get(start, split) + table.get(split + 1, end));
                }
                table.set(start, end, best);
            }
        }
        table
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, start: usize, end: usize) -> f32 {
        debug_assert!(start <= end && end < self.size);
        self.scores[start * self.size + end]
    }

    pub fn set(&mut self, start: usize, end: usize, score: f32) {
        self.scores[start * self.size + end] = score;
    }

    /// Estimated score of completing a hypothesis with coverage `bitmap`.
    pub fn calc_estimated_score(&self, bitmap: &CoverageBitmap) -> f32 {
        bitmap.gaps().map(|gap| self.get(gap.start(), gap.end())).sum()
    }

    /// Same as [`calc_estimated_score`](Self::calc_estimated_score) for `bitmap`
    /// with `range` marked as covered, without building that bitmap.
    pub fn calc_estimated_score_with(&self, bitmap: &CoverageBitmap, range: &SourceRange) -> f32 {
        let mut total = 0.0;
        for gap in bitmap.gaps() {
            if !gap.overlaps(range) {
                total += self.get(gap.start(), gap.end());
                continue;
            }
            if gap.start() < range.start() {
                total += self.get(gap.start(), range.start() - 1);
            }
            if range.end() < gap.end() {
                total += self.get(range.end() + 1, gap.end());
            }
        }
        total
    }
}
