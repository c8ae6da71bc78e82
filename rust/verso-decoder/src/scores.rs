//! Dense per-feature score vectors.

use std::ops::Range;

/// Named slot of the score vector owned by one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSlot {
    pub name: String,
    pub offset: usize,
    pub len: usize,
}

impl ScoreSlot {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Maps feature names onto contiguous ranges of a [`ScoreBreakdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLayout {
    slots: Vec<ScoreSlot>,
    total: usize,
}

impl ScoreLayout {
    pub fn new() -> ScoreLayout {
        ScoreLayout::default()
    }

    /// Appends a slot and returns its range.
    pub fn push(&mut self, name: impl Into<String>, len: usize) -> Range<usize> {
        let slot = ScoreSlot {
            name: name.into(),
            offset: self.total,
            len,
        };
        self.total += len;
        let range = slot.range();
        self.slots.push(slot);
        range
    }

    pub fn slots(&self) -> &[ScoreSlot] {
        &self.slots
    }

    pub fn find(&self, name: &str) -> Option<&ScoreSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Total number of scores.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Unweighted feature scores of a phrase, hypothesis or path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreBreakdown(Vec<f32>);

impl ScoreBreakdown {
    pub fn zeros(len: usize) -> ScoreBreakdown {
        ScoreBreakdown(vec![0.0; len])
    }

    pub fn from_values(values: Vec<f32>) -> ScoreBreakdown {
        ScoreBreakdown(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slice(&self, range: Range<usize>) -> &[f32] {
        &self.0[range]
    }

    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [f32] {
        &mut self.0[range]
    }

    pub fn plus_equals(&mut self, other: &ScoreBreakdown) {
        debug_assert_eq!(self.0.len(), other.0.len());
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a += *b;
        }
    }

    pub fn minus_equals(&mut self, other: &ScoreBreakdown) {
        debug_assert_eq!(self.0.len(), other.0.len());
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a -= *b;
        }
    }

    pub fn inner_product(&self, weights: &[f32]) -> f32 {
        debug_assert_eq!(self.0.len(), weights.len());
        self.0.iter().zip(weights).map(|(s, w)| s * w).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_slots_are_contiguous() {
        let mut layout = ScoreLayout::new();
        assert_eq!(layout.push("a", 1), 0..1);
        assert_eq!(layout.push("b", 3), 1..4);
        assert_eq!(layout.push("c", 0), 4..4);
        assert_eq!(layout.len(), 4);
        assert_eq!(layout.find("b").unwrap().range(), 1..4);
        assert!(layout.find("d").is_none());
    }

    #[test]
    fn test_arithmetic() {
        let mut a = ScoreBreakdown::from_values(vec![1.0, -2.0, 0.5]);
        let b = ScoreBreakdown::from_values(vec![0.5, 1.0, 0.5]);
        a.plus_equals(&b);
        assert_eq!(a.values(), &[1.5, -1.0, 1.0]);
        a.minus_equals(&b);
        assert_eq!(a.values(), &[1.0, -2.0, 0.5]);
        assert_eq!(a.inner_product(&[2.0, 1.0, 4.0]), 2.0);
        a.slice_mut(1..3).copy_from_slice(&[0.0, 0.0]);
        assert_eq!(a.slice(0..2), &[1.0, 0.0]);
    }
}
