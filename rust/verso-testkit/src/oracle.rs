//! Brute-force reference decoder.
//!
//! Enumerates every derivation admitted by a [`ReorderingPolicy`] and scores it
//! with the same [`FeatureSet`] the decoder uses. Exponential in the sentence
//! length; meant for sentences of up to six or seven words.

use verso_coverage::{CoverageBitmap, SourceRange};
use verso_decoder::{
    FeatureSet, ReorderingPolicy, ScoreBreakdown, Sentence, TranslationOptionCollection,
    feature::{ApplyContext, FeatureState},
};

/// The best complete derivation found by [`best_derivation`].
#[derive(Debug, Clone, PartialEq)]
pub struct OracleResult {
    pub score: f32,
    /// Source spans in target order, as `(start, end)`.
    pub alignment: Vec<(usize, usize)>,
    /// Target words of the best derivation.
    pub words: Vec<String>,
    /// Scores of every complete derivation, best first.
    pub scores: Vec<f32>,
}

impl OracleResult {
    /// Number of complete derivations visited.
    pub fn derivations(&self) -> usize {
        self.scores.len()
    }
}

/// Finds the highest scoring derivation, or `None` if no derivation covers
/// the whole sentence.
pub fn best_derivation(
    sentence: &Sentence,
    options: &TranslationOptionCollection,
    features: &FeatureSet,
    policy: &ReorderingPolicy<'_>,
) -> Option<OracleResult> {
    let mut walk = Walk {
        sentence,
        options,
        features,
        policy,
        path: Vec::new(),
        best: None,
        scores: Vec::new(),
    };
    walk.visit(
        &CoverageBitmap::new(sentence.len()),
        None,
        &features.initial_states(sentence),
        &ScoreBreakdown::zeros(features.num_scores()),
    );
    let mut scores = walk.scores;
    scores.sort_by(|a, b| b.total_cmp(a));
    walk.best.map(|(score, path)| OracleResult {
        score,
        alignment: path.iter().map(|step| step.0).collect(),
        words: path.into_iter().flat_map(|step| step.1).collect(),
        scores,
    })
}

type Step = ((usize, usize), Vec<String>);

struct Walk<'a, 'p> {
    sentence: &'a Sentence,
    options: &'a TranslationOptionCollection,
    features: &'a FeatureSet,
    policy: &'a ReorderingPolicy<'p>,
    path: Vec<Step>,
    best: Option<(f32, Vec<Step>)>,
    scores: Vec<f32>,
}

impl Walk<'_, '_> {
    fn visit(
        &mut self,
        bitmap: &CoverageBitmap,
        prev: Option<SourceRange>,
        states: &[Box<dyn FeatureState>],
        breakdown: &ScoreBreakdown,
    ) {
        if bitmap.is_complete() {
            let score = self.features.score(breakdown);
            self.scores.push(score);
            if self.best.as_ref().is_none_or(|(best, _)| score > *best) {
                self.best = Some((score, self.path.clone()));
            }
            return;
        }

        let len = bitmap.len();
        for start in 0..len {
            for end in start..(start + self.options.max_phrase_length()).min(len) {
                let range = SourceRange::new(start, end);
                if !self.policy.can_extend(bitmap, prev.as_ref(), &range) {
                    continue;
                }
                let next = bitmap.with_range(&range).expect("admissible span");
                for option in self.options.get(range) {
                    let mut next_breakdown = breakdown.clone();
                    next_breakdown.plus_equals(option.scores());
                    let ctx = ApplyContext {
                        sentence: self.sentence,
                        prev_range: prev,
                        range,
                        coverage: &next,
                        phrase: option.target(),
                    };
                    let next_states =
                        self.features
                            .evaluate_when_applied(&ctx, states, &mut next_breakdown);
                    let words = option.target().words().iter().map(|w| w.to_string()).collect();
                    self.path.push(((start, end), words));
                    self.visit(&next, Some(range), &next_states, &next_breakdown);
                    self.path.pop();
                }
            }
        }
    }
}
