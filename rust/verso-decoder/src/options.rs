//! Translation options: phrase candidates bound to source spans.

use std::{fmt, sync::Arc};

use itertools::Itertools;
use log::debug;
use verso_common::Result;
use verso_coverage::SourceRange;

use crate::{
    config::{SearchConfig, UnknownWordPolicy},
    estimated_scores::EstimatedScores,
    feature::FeatureSet,
    phrase_table::PhraseSource,
    scores::ScoreBreakdown,
    sentence::{Sentence, Word},
};

/// Target side of a phrase pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TargetPhrase {
    words: Vec<Word>,
}

impl TargetPhrase {
    pub fn new(words: Vec<Word>) -> TargetPhrase {
        TargetPhrase { words }
    }

    pub fn from_text(text: &str) -> TargetPhrase {
        TargetPhrase::new(text.split_whitespace().map(Word::from).collect())
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for TargetPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words.iter().join(" "))
    }
}

/// A target phrase that can be applied to a specific source span.
#[derive(Debug, Clone)]
pub struct TranslationOption {
    range: SourceRange,
    target: TargetPhrase,
    scores: ScoreBreakdown,
    future_score: f32,
    unknown: bool,
}

impl TranslationOption {
    pub fn range(&self) -> SourceRange {
        self.range
    }

    pub fn target(&self) -> &TargetPhrase {
        &self.target
    }

    /// Scores computed in isolation (phrase scores and stateless features).
    pub fn scores(&self) -> &ScoreBreakdown {
        &self.scores
    }

    /// Weighted isolated score plus the stateful features' context-free
    /// estimates; an optimistic estimate of what the option adds.
    pub fn future_score(&self) -> f32 {
        self.future_score
    }

    /// `true` for pass-through options created for unknown words.
    pub fn is_unknown(&self) -> bool {
        self.unknown
    }
}

/// All options of a sentence, grouped by source span and sorted best first,
/// together with the future-cost table derived from them.
#[derive(Debug)]
pub struct TranslationOptionCollection {
    sentence_len: usize,
    max_phrase_length: usize,
    lists: Vec<Vec<Arc<TranslationOption>>>,
    estimated: EstimatedScores,
}

impl TranslationOptionCollection {
    pub fn build(
        sentence: &Sentence,
        source: &dyn PhraseSource,
        features: &FeatureSet,
        config: &SearchConfig,
    ) -> Result<TranslationOptionCollection> {
        let sentence_len = sentence.len();
        let max_phrase_length = config.max_phrase_length.min(sentence_len).max(1);
        let mut collection = TranslationOptionCollection {
            sentence_len,
            max_phrase_length,
            lists: vec![Vec::new(); sentence_len * max_phrase_length],
            estimated: EstimatedScores::new(0),
        };

        for start in 0..sentence_len {
            for end in start..(start + max_phrase_length).min(sentence_len) {
                let range = SourceRange::new(start, end);
                let words = &sentence.words()[start..=end];
                let mut options = Vec::new();
                for candidate in source.lookup(words)? {
                    let scores =
                        features.isolated_scores(words, &candidate.target, &candidate.scores, false)?;
                    let future_score = features.future_score(&scores, &candidate.target);
                    options.push(TranslationOption {
                        range,
                        target: candidate.target,
                        future_score,
                        scores,
                        unknown: false,
                    });
                }
                collection.set_options(range, options, config);
            }
        }

        if config.unknown_words == UnknownWordPolicy::PassThrough {
            for pos in 0..sentence_len {
                let range = SourceRange::single(pos);
                if !collection.get(range).is_empty() {
                    continue;
                }
                let word = &sentence.words()[pos..=pos];
                let target = TargetPhrase::new(word.to_vec());
                let scores = features.isolated_scores(word, &target, &[], true)?;
                let future_score = features.future_score(&scores, &target);
                debug!("unknown word '{}' at {pos}, passing through", word[0]);
                let option = TranslationOption {
                    range,
                    target,
                    future_score,
                    scores,
                    unknown: true,
                };
                collection.set_options(range, vec![option], config);
            }
        }

        let estimated =
            EstimatedScores::compute(sentence_len, |range| collection.best_future_score(range));
        collection.estimated = estimated;
        debug!(
            "collected {} translation options for {} words",
            collection.lists.iter().map(Vec::len).sum::<usize>(),
            sentence_len
        );
        Ok(collection)
    }

    fn index(&self, range: SourceRange) -> Option<usize> {
        (range.end() < self.sentence_len && range.len() <= self.max_phrase_length)
            .then(|| range.start() * self.max_phrase_length + range.len() - 1)
    }

    fn set_options(
        &mut self,
        range: SourceRange,
        mut options: Vec<TranslationOption>,
        config: &SearchConfig,
    ) {
        options.sort_by(|a, b| b.future_score.total_cmp(&a.future_score));
        if let (Some(threshold), Some(best)) = (config.option_threshold, options.first()) {
            let cutoff = best.future_score - threshold;
            options.retain(|option| option.future_score >= cutoff);
        }
        options.truncate(config.max_options_per_span);
        if let Some(index) = self.index(range) {
            self.lists[index] = options.into_iter().map(Arc::new).collect();
        }
    }

    /// Options for `range`, best first. Empty for spans longer than the
    /// maximum phrase length.
    pub fn get(&self, range: SourceRange) -> &[Arc<TranslationOption>] {
        match self.index(range) {
            Some(index) => &self.lists[index],
            None => &[],
        }
    }

    pub fn best_future_score(&self, range: SourceRange) -> Option<f32> {
        self.get(range).first().map(|option| option.future_score)
    }

    pub fn sentence_len(&self) -> usize {
        self.sentence_len
    }

    pub fn max_phrase_length(&self) -> usize {
        self.max_phrase_length
    }

    pub fn estimated_scores(&self) -> &EstimatedScores {
        &self.estimated
    }

    pub fn num_options(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::WeightsConfig,
        feature::{TRANSLATION_MODEL, UNKNOWN_WORD_SCORE},
        phrase_table::PhraseTable,
    };

    fn features() -> FeatureSet {
        FeatureSet::builder(1)
            .build(&WeightsConfig::new().with(TRANSLATION_MODEL, vec![1.0]))
            .unwrap()
    }

    fn table() -> PhraseTable {
        let mut table = PhraseTable::new(1);
        table.insert("a", "x", vec![-2.0]).unwrap();
        table.insert("a", "y", vec![-1.0]).unwrap();
        table.insert("a", "z", vec![-5.0]).unwrap();
        table.insert("a b", "xy", vec![-1.5]).unwrap();
        table.insert("b", "w", vec![-1.0]).unwrap();
        table
    }

    #[test]
    fn test_options_sorted_and_limited() {
        let sentence = Sentence::from_text("a b");
        let config = SearchConfig {
            max_options_per_span: 2,
            ..Default::default()
        };
        let collection =
            TranslationOptionCollection::build(&sentence, &table(), &features(), &config).unwrap();

        let first = collection.get(SourceRange::single(0));
        assert_eq!(
            first.iter().map(|o| o.target().to_string()).collect::<Vec<_>>(),
            ["y", "x"]
        );
        assert_eq!(collection.get(SourceRange::new(0, 1)).len(), 1);
        assert_eq!(collection.best_future_score(SourceRange::single(1)), Some(-1.0));
        assert_eq!(collection.num_options(), 4);
    }

    #[test]
    fn test_option_threshold() {
        let sentence = Sentence::from_text("a");
        let config = SearchConfig {
            option_threshold: Some(1.5),
            ..Default::default()
        };
        let collection =
            TranslationOptionCollection::build(&sentence, &table(), &features(), &config).unwrap();
        assert_eq!(collection.get(SourceRange::single(0)).len(), 2);
    }

    #[test]
    fn test_max_phrase_length() {
        let sentence = Sentence::from_text("a b");
        let config = SearchConfig {
            max_phrase_length: 1,
            ..Default::default()
        };
        let collection =
            TranslationOptionCollection::build(&sentence, &table(), &features(), &config).unwrap();
        assert!(collection.get(SourceRange::new(0, 1)).is_empty());
    }

    #[test]
    fn test_unknown_words() {
        let sentence = Sentence::from_text("a q");
        let collection = TranslationOptionCollection::build(
            &sentence,
            &table(),
            &features(),
            &SearchConfig::default(),
        )
        .unwrap();
        let unknown = collection.get(SourceRange::single(1));
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].is_unknown());
        assert_eq!(unknown[0].target().to_string(), "q");
        assert_eq!(unknown[0].future_score(), UNKNOWN_WORD_SCORE);

        let config = SearchConfig {
            unknown_words: UnknownWordPolicy::Drop,
            ..Default::default()
        };
        let collection =
            TranslationOptionCollection::build(&sentence, &table(), &features(), &config).unwrap();
        assert!(collection.get(SourceRange::single(1)).is_empty());
    }
}
