//! Feature functions and the weighted model they form.
//!
//! Every feature writes unweighted scores into its own slot of a
//! [`ScoreBreakdown`]; the model score is the inner product of the breakdown
//! with the weight vector. The breakdown is laid out as
//!
//! ```text
//! [UnknownWordPenalty][TranslationModel scores...][stateless...][stateful...]
//! ```
//!
//! Stateless features only see the phrase being applied. Stateful features also
//! see the state left by the previous hypothesis and return a new one; these
//! states take part in recombination, so two hypotheses are only merged when
//! every stateful feature considers their states equal.

pub mod distortion;
pub mod language_model;
pub mod penalties;

use std::{any::Any, fmt, hash::Hash, ops::Range};

use verso_common::{Result, error::Error};
use verso_coverage::{CoverageBitmap, SourceRange};

use crate::{
    config::WeightsConfig,
    options::TargetPhrase,
    scores::{ScoreBreakdown, ScoreLayout},
    sentence::{Sentence, Word},
};

pub use distortion::{DISTORTION, DistortionPenalty};
pub use language_model::{LanguageModel, LanguageModelFeature};
pub use penalties::{PHRASE_PENALTY, PhrasePenalty, WORD_PENALTY, WordPenalty};

pub const UNKNOWN_WORD_PENALTY: &str = "UnknownWordPenalty";

pub const TRANSLATION_MODEL: &str = "TranslationModel";

/// Unknown-word penalty value of a pass-through option (a floored log-probability).
pub const UNKNOWN_WORD_SCORE: f32 = -100.0;

/// Hashes a value with fixed keys so that equal states hash equally in every
/// hypothesis of a run.
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    ahash::RandomState::with_seeds(
        0x5665_7273_6f00_0001,
        0x5665_7273_6f00_0002,
        0x5665_7273_6f00_0003,
        0x5665_7273_6f00_0004,
    )
    .hash_one(value)
}

/// Opaque per-hypothesis state of a stateful feature.
pub trait FeatureState: fmt::Debug + Send + Sync + 'static {
    fn hash_value(&self) -> u64;

    /// Compares with a state produced by the same feature.
    fn equals(&self, other: &dyn FeatureState) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// What a feature sees when a phrase is appended to a hypothesis.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    pub sentence: &'a Sentence,
    /// Source range of the previous phrase, `None` when extending the initial hypothesis.
    pub prev_range: Option<SourceRange>,
    pub range: SourceRange,
    /// Coverage after the phrase is applied.
    pub coverage: &'a CoverageBitmap,
    pub phrase: &'a TargetPhrase,
}

impl ApplyContext<'_> {
    pub fn is_complete(&self) -> bool {
        self.coverage.is_complete()
    }
}

pub trait StatelessFeature: Send + Sync {
    fn name(&self) -> &str;

    fn num_scores(&self) -> usize {
        1
    }

    /// Scores a phrase pair on its own, when options are collected.
    fn evaluate_in_isolation(&self, source: &[Word], target: &TargetPhrase, scores: &mut [f32]);

    /// Scores that depend on where the phrase is applied but carry no state.
    fn evaluate_when_applied(&self, _ctx: &ApplyContext<'_>, _scores: &mut [f32]) {}
}

pub trait StatefulFeature: Send + Sync {
    fn name(&self) -> &str;

    fn num_scores(&self) -> usize {
        1
    }

    fn empty_state(&self, sentence: &Sentence) -> Box<dyn FeatureState>;

    /// Adds the score delta of applying `ctx.phrase` after `prev` and returns
    /// the resulting state.
    fn evaluate_when_applied(
        &self,
        ctx: &ApplyContext<'_>,
        prev: &dyn FeatureState,
        scores: &mut [f32],
    ) -> Box<dyn FeatureState>;

    /// Adds a context-free estimate of what `target` will score once applied.
    /// The estimate only ranks options and feeds future costs; it never
    /// becomes part of a hypothesis score.
    fn estimate_in_isolation(&self, _target: &TargetPhrase, _scores: &mut [f32]) {}
}

/// Collects features before the weights are bound.
pub struct FeatureSetBuilder {
    phrase_scores: usize,
    stateless: Vec<Box<dyn StatelessFeature>>,
    stateful: Vec<Box<dyn StatefulFeature>>,
}

impl FeatureSetBuilder {
    /// `phrase_scores` is the number of scores every phrase candidate carries.
    pub fn new(phrase_scores: usize) -> FeatureSetBuilder {
        FeatureSetBuilder {
            phrase_scores,
            stateless: Vec::new(),
            stateful: Vec::new(),
        }
    }

    pub fn stateless(mut self, feature: impl StatelessFeature + 'static) -> FeatureSetBuilder {
        self.stateless.push(Box::new(feature));
        self
    }

    pub fn stateful(mut self, feature: impl StatefulFeature + 'static) -> FeatureSetBuilder {
        self.stateful.push(Box::new(feature));
        self
    }

    /// Lays out the score vector and binds `weights` to it.
    ///
    /// Every feature with at least one score needs an entry of matching length,
    /// except the unknown-word penalty which defaults to weight 1. Entries that
    /// name no feature are rejected.
    pub fn build(self, weights: &WeightsConfig) -> Result<FeatureSet> {
        let mut layout = ScoreLayout::new();
        let unknown_slot = layout.push(UNKNOWN_WORD_PENALTY, 1).start;
        let phrase_slot = layout.push(TRANSLATION_MODEL, self.phrase_scores);

        let mut stateless = Vec::with_capacity(self.stateless.len());
        for feature in self.stateless {
            check_unique_name(&layout, feature.name())?;
            let range = layout.push(feature.name(), feature.num_scores());
            stateless.push((feature, range));
        }
        let mut stateful = Vec::with_capacity(self.stateful.len());
        for feature in self.stateful {
            check_unique_name(&layout, feature.name())?;
            let range = layout.push(feature.name(), feature.num_scores());
            stateful.push((feature, range));
        }

        if let Some(name) = weights.names().find(|name| layout.find(name).is_none()) {
            return Err(Error::invalid_arg(
                "weights",
                format!("weights given for unknown feature '{name}'"),
            ));
        }

        let mut weight_vec = Vec::with_capacity(layout.len());
        for slot in layout.slots() {
            match weights.get(&slot.name) {
                Some(w) if w.len() == slot.len => weight_vec.extend_from_slice(w),
                Some(w) => {
                    return Err(Error::invalid_arg(
                        "weights",
                        format!(
                            "feature '{}' has {} scores but {} weights",
                            slot.name,
                            slot.len,
                            w.len()
                        ),
                    ));
                }
                None if slot.name == UNKNOWN_WORD_PENALTY => weight_vec.push(1.0),
                None if slot.len == 0 => {}
                None => {
                    return Err(Error::invalid_arg(
                        "weights",
                        format!("missing weights for feature '{}'", slot.name),
                    ));
                }
            }
        }

        Ok(FeatureSet {
            layout,
            weights: weight_vec,
            unknown_slot,
            phrase_slot,
            stateless,
            stateful,
        })
    }
}

fn check_unique_name(layout: &ScoreLayout, name: &str) -> Result<()> {
    if layout.find(name).is_some() {
        return Err(Error::invalid_arg(
            "features",
            format!("duplicate feature name '{name}'"),
        ));
    }
    Ok(())
}

/// The weighted log-linear model: all features, their score layout and weights.
pub struct FeatureSet {
    layout: ScoreLayout,
    weights: Vec<f32>,
    unknown_slot: usize,
    phrase_slot: Range<usize>,
    stateless: Vec<(Box<dyn StatelessFeature>, Range<usize>)>,
    stateful: Vec<(Box<dyn StatefulFeature>, Range<usize>)>,
}

impl FeatureSet {
    pub fn builder(phrase_scores: usize) -> FeatureSetBuilder {
        FeatureSetBuilder::new(phrase_scores)
    }

    pub fn layout(&self) -> &ScoreLayout {
        &self.layout
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn num_scores(&self) -> usize {
        self.layout.len()
    }

    pub fn num_phrase_scores(&self) -> usize {
        self.phrase_slot.len()
    }

    pub fn num_stateful(&self) -> usize {
        self.stateful.len()
    }

    pub fn score(&self, breakdown: &ScoreBreakdown) -> f32 {
        breakdown.inner_product(&self.weights)
    }

    /// Scores of a phrase pair independent of its context: phrase-table scores,
    /// the unknown-word penalty and every stateless in-isolation feature.
    pub fn isolated_scores(
        &self,
        source: &[Word],
        target: &TargetPhrase,
        phrase_scores: &[f32],
        unknown: bool,
    ) -> Result<ScoreBreakdown> {
        let mut breakdown = ScoreBreakdown::zeros(self.layout.len());
        if unknown {
            breakdown.slice_mut(self.unknown_slot..self.unknown_slot + 1)[0] = UNKNOWN_WORD_SCORE;
        } else if phrase_scores.len() != self.phrase_slot.len() {
            return Err(Error::invalid_arg(
                "phrase_scores",
                format!(
                    "expected {} phrase scores, got {}",
                    self.phrase_slot.len(),
                    phrase_scores.len()
                ),
            ));
        } else {
            breakdown
                .slice_mut(self.phrase_slot.clone())
                .copy_from_slice(phrase_scores);
        }
        for (feature, range) in &self.stateless {
            feature.evaluate_in_isolation(source, target, breakdown.slice_mut(range.clone()));
        }
        Ok(breakdown)
    }

    /// Weighted score used to rank an option and estimate future costs: its
    /// isolated scores plus the stateful features' estimates for `target`.
    pub fn future_score(&self, isolated: &ScoreBreakdown, target: &TargetPhrase) -> f32 {
        if self.stateful.is_empty() {
            return self.score(isolated);
        }
        let mut estimate = isolated.clone();
        for (feature, range) in &self.stateful {
            feature.estimate_in_isolation(target, estimate.slice_mut(range.clone()));
        }
        self.score(&estimate)
    }

    pub fn initial_states(&self, sentence: &Sentence) -> Vec<Box<dyn FeatureState>> {
        self.stateful
            .iter()
            .map(|(feature, _)| feature.empty_state(sentence))
            .collect()
    }

    /// Runs every when-applied feature, adding the deltas to `breakdown`, and
    /// returns the new stateful feature states.
    pub fn evaluate_when_applied(
        &self,
        ctx: &ApplyContext<'_>,
        prev_states: &[Box<dyn FeatureState>],
        breakdown: &mut ScoreBreakdown,
    ) -> Vec<Box<dyn FeatureState>> {
        debug_assert_eq!(prev_states.len(), self.stateful.len());
        for (feature, range) in &self.stateless {
            feature.evaluate_when_applied(ctx, breakdown.slice_mut(range.clone()));
        }
        self.stateful
            .iter()
            .zip(prev_states)
            .map(|((feature, range), prev)| {
                feature.evaluate_when_applied(ctx, prev.as_ref(), breakdown.slice_mut(range.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("layout", &self.layout)
            .field("weights", &self.weights)
            .finish()
    }
}
