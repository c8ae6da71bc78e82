//! Small, hand-made decoding setups shared by the test suites.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use verso_decoder::{
    FeatureSet, PhraseTable, Sentence, WeightsConfig, Word,
    feature::{
        DistortionPenalty, LanguageModel, LanguageModelFeature, PhrasePenalty, TRANSLATION_MODEL,
        WordPenalty, language_model::BEGIN_OF_SENTENCE,
    },
};

/// Name under which the fixtures register the language model feature.
pub const LM_FEATURE: &str = "LM";

/// Token the fixture models use for the sentence end in their bigram tables.
pub const END_OF_SENTENCE: &str = "</s>";

pub fn sentence(text: &str) -> Sentence {
    Sentence::from_text(text)
}

/// A one-score table translating every distinct word of `text` to its upper
/// case form with log score `score`.
pub fn word_for_word_table(text: &str, score: f32) -> PhraseTable {
    let mut table = PhraseTable::new(1);
    let mut seen = AHashSet::new();
    for word in text.split_whitespace() {
        if seen.insert(word) {
            table
                .insert(word, &word.to_uppercase(), vec![score])
                .expect("valid phrase");
        }
    }
    table
}

/// Unit weights for a translation model with `phrase_scores` scores.
pub fn tm_weights(phrase_scores: usize) -> WeightsConfig {
    WeightsConfig::new().with(TRANSLATION_MODEL, vec![1.0; phrase_scores])
}

/// Translation-model scores only.
pub fn tm_features(phrase_scores: usize) -> FeatureSet {
    FeatureSet::builder(phrase_scores)
        .build(&tm_weights(phrase_scores))
        .expect("features")
}

/// Translation model plus the distortion penalty, all with weight 1.
pub fn tm_distortion_features(phrase_scores: usize) -> FeatureSet {
    FeatureSet::builder(phrase_scores)
        .stateful(DistortionPenalty::new())
        .build(&tm_weights(phrase_scores).with("Distortion", vec![1.0]))
        .expect("features")
}

/// Translation model plus a language model, both with weight 1.
pub fn tm_lm_features(phrase_scores: usize, lm: Arc<dyn LanguageModel>) -> FeatureSet {
    FeatureSet::builder(phrase_scores)
        .stateful(LanguageModelFeature::new(LM_FEATURE, lm))
        .build(&tm_weights(phrase_scores).with(LM_FEATURE, vec![1.0]))
        .expect("features")
}

/// Every built-in feature with moderate weights.
pub fn standard_features(phrase_scores: usize, lm: Arc<dyn LanguageModel>) -> FeatureSet {
    let weights = tm_weights(phrase_scores)
        .with("WordPenalty", vec![0.3])
        .with("PhrasePenalty", vec![-0.2])
        .with("Distortion", vec![0.5])
        .with(LM_FEATURE, vec![1.0]);
    FeatureSet::builder(phrase_scores)
        .stateless(WordPenalty::new())
        .stateless(PhrasePenalty::new())
        .stateful(DistortionPenalty::new())
        .stateful(LanguageModelFeature::new(LM_FEATURE, lm))
        .build(&weights)
        .expect("features")
}

/// A bigram model read from a table. Unlisted bigrams score `default`; the
/// sentence end is scored as the bigram `(last word, </s>)`.
#[derive(Debug, Clone)]
pub struct BigramModel {
    scores: AHashMap<(String, String), f32>,
    default: f32,
}

impl BigramModel {
    pub fn new(default: f32) -> BigramModel {
        BigramModel {
            scores: AHashMap::new(),
            default,
        }
    }

    /// Sets the score of `word` after `prev`. Use `<s>` and `</s>` for the
    /// sentence boundaries.
    pub fn with(mut self, prev: &str, word: &str, score: f32) -> BigramModel {
        self.set(prev, word, score);
        self
    }

    pub fn set(&mut self, prev: &str, word: &str, score: f32) {
        self.scores.insert((prev.to_string(), word.to_string()), score);
    }

    fn bigram(&self, context: &[Word], word: &str) -> f32 {
        let prev = context.last().map_or(BEGIN_OF_SENTENCE, |w| &**w);
        self.scores
            .get(&(prev.to_string(), word.to_string()))
            .copied()
            .unwrap_or(self.default)
    }
}

impl LanguageModel for BigramModel {
    fn order(&self) -> usize {
        2
    }

    fn score_word(&self, context: &[Word], word: &str) -> f32 {
        self.bigram(context, word)
    }

    fn end_of_sentence_score(&self, context: &[Word]) -> f32 {
        self.bigram(context, END_OF_SENTENCE)
    }

    /// Without a previous word, the best score `word` reaches after any word.
    fn estimate_word(&self, context: &[Word], word: &str) -> f32 {
        if !context.is_empty() {
            return self.bigram(context, word);
        }
        self.scores
            .iter()
            .filter(|((_, next), _)| next == word)
            .map(|(_, &score)| score)
            .fold(self.default, f32::max)
    }
}
