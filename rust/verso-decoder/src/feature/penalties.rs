use crate::{options::TargetPhrase, sentence::Word};

use super::StatelessFeature;

pub const WORD_PENALTY: &str = "WordPenalty";

pub const PHRASE_PENALTY: &str = "PhrasePenalty";

/// Scores `-1` per target word.
#[derive(Debug, Default)]
pub struct WordPenalty;

impl WordPenalty {
    pub fn new() -> WordPenalty {
        WordPenalty
    }
}

impl StatelessFeature for WordPenalty {
    fn name(&self) -> &str {
        WORD_PENALTY
    }

    fn evaluate_in_isolation(&self, _source: &[Word], target: &TargetPhrase, scores: &mut [f32]) {
        scores[0] -= target.len() as f32;
    }
}

/// Scores `1` per applied phrase, letting the weight trade off long against
/// short segmentations.
#[derive(Debug, Default)]
pub struct PhrasePenalty;

impl PhrasePenalty {
    pub fn new() -> PhrasePenalty {
        PhrasePenalty
    }
}

impl StatelessFeature for PhrasePenalty {
    fn name(&self) -> &str {
        PHRASE_PENALTY
    }

    fn evaluate_in_isolation(&self, _source: &[Word], _target: &TargetPhrase, scores: &mut [f32]) {
        scores[0] += 1.0;
    }
}
