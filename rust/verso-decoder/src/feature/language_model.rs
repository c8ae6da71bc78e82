//! N-gram language-model feature.
//!
//! The model itself is external; [`LanguageModelFeature`] only keeps the last
//! `order - 1` target words as its state and asks the model for word scores.

use std::{any::Any, sync::Arc};

use crate::{
    options::TargetPhrase,
    sentence::{Sentence, Word},
};

use super::{ApplyContext, FeatureState, StatefulFeature, stable_hash};

pub const BEGIN_OF_SENTENCE: &str = "<s>";

/// An n-gram language model queried word by word.
pub trait LanguageModel: Send + Sync {
    /// Length of the n-grams the model scores. At least 1.
    fn order(&self) -> usize;

    /// Log-probability of `word` given `context`, oldest word first.
    /// `context` holds at most `order - 1` words and starts with
    /// [`BEGIN_OF_SENTENCE`] at the beginning of a sentence.
    fn score_word(&self, context: &[Word], word: &str) -> f32;

    /// Log-probability of ending the sentence after `context`.
    fn end_of_sentence_score(&self, context: &[Word]) -> f32;

    /// Score of `word` for future-cost estimates, when only the words before
    /// it inside the same phrase are known. `context` is then shorter than
    /// `order - 1` and never starts with [`BEGIN_OF_SENTENCE`]. Models that
    /// can bound the score over every possible left context should return
    /// that bound.
    fn estimate_word(&self, context: &[Word], word: &str) -> f32 {
        self.score_word(context, word)
    }
}

pub struct LanguageModelFeature {
    name: String,
    model: Arc<dyn LanguageModel>,
}

impl LanguageModelFeature {
    pub fn new(name: impl Into<String>, model: Arc<dyn LanguageModel>) -> LanguageModelFeature {
        LanguageModelFeature {
            name: name.into(),
            model,
        }
    }

    fn context_len(&self) -> usize {
        self.model.order().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LmState {
    context: Vec<Word>,
}

impl FeatureState for LmState {
    fn hash_value(&self) -> u64 {
        stable_hash(&self.context)
    }

    fn equals(&self, other: &dyn FeatureState) -> bool {
        other
            .as_any()
            .downcast_ref::<LmState>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StatefulFeature for LanguageModelFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn empty_state(&self, _sentence: &Sentence) -> Box<dyn FeatureState> {
        let context = if self.context_len() > 0 {
            vec![Word::from(BEGIN_OF_SENTENCE)]
        } else {
            Vec::new()
        };
        Box::new(LmState { context })
    }

    fn evaluate_when_applied(
        &self,
        ctx: &ApplyContext<'_>,
        prev: &dyn FeatureState,
        scores: &mut [f32],
    ) -> Box<dyn FeatureState> {
        let mut context = prev
            .as_any()
            .downcast_ref::<LmState>()
            .map(|state| state.context.clone())
            .unwrap_or_default();
        let keep = self.context_len();

        let mut score = 0.0;
        for word in ctx.phrase.words() {
            score += self.model.score_word(&context, word);
            context.push(word.clone());
            if context.len() > keep {
                context.drain(..context.len() - keep);
            }
        }
        if ctx.is_complete() {
            score += self.model.end_of_sentence_score(&context);
        }
        scores[0] += score;
        Box::new(LmState { context })
    }

    /// Scores the phrase with the context it provides itself. The sentence
    /// end is left out.
    fn estimate_in_isolation(&self, target: &TargetPhrase, scores: &mut [f32]) {
        let keep = self.context_len();
        let mut context: Vec<Word> = Vec::with_capacity(keep + 1);
        let mut score = 0.0;
        for word in target.words() {
            score += if context.len() < keep {
                self.model.estimate_word(&context, word)
            } else {
                self.model.score_word(&context, word)
            };
            context.push(word.clone());
            if context.len() > keep {
                context.drain(..context.len() - keep);
            }
        }
        scores[0] += score;
    }
}
