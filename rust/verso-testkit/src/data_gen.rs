//! Seeded random decoding problems.
//!
//! Problems are small enough to be solved by the brute-force
//! [`oracle`](crate::oracle), and varied enough to exercise reordering,
//! multi-word phrases, recombination and language-model context.

use std::sync::Arc;

use ahash::AHashSet;
use verso_decoder::{PhraseTable, Sentence, Word, feature::language_model::BEGIN_OF_SENTENCE};

use crate::fixtures::{BigramModel, END_OF_SENTENCE};

/// Number of scores every generated phrase candidate carries.
pub const PROBLEM_PHRASE_SCORES: usize = 2;

/// A sentence together with a phrase table and a language model covering it.
#[derive(Debug, Clone)]
pub struct RandomProblem {
    pub sentence: Sentence,
    pub table: PhraseTable,
    pub lm: Arc<BigramModel>,
}

/// Shape of the generated problems.
#[derive(Debug, Clone, Copy)]
pub struct ProblemShape {
    pub len: usize,
    /// Distinct source words to draw from; smaller values produce repeats.
    pub source_vocab: usize,
    pub target_vocab: usize,
    /// Candidates per source word, at least one.
    pub max_word_options: usize,
    /// Probability that a span of two or three words gets a phrase candidate.
    pub phrase_probability: f64,
}

impl Default for ProblemShape {
    fn default() -> Self {
        ProblemShape {
            len: 5,
            source_vocab: 6,
            target_vocab: 6,
            max_word_options: 2,
            phrase_probability: 0.35,
        }
    }
}

/// Generates a problem in which every source word has at least one candidate,
/// so a complete derivation always exists.
///
/// Scores are multiples of 0.1 so that equally good derivations are rare but
/// possible.
pub fn random_problem(rng: &mut fastrand::Rng, shape: ProblemShape) -> RandomProblem {
    assert!(shape.len > 0 && shape.source_vocab > 0 && shape.target_vocab > 0);
    let words = (0..shape.len)
        .map(|_| format!("s{}", rng.usize(..shape.source_vocab)))
        .collect::<Vec<_>>();

    let mut table = PhraseTable::new(PROBLEM_PHRASE_SCORES);
    // a source phrase never gets the same target twice
    let mut pairs = AHashSet::new();
    let mut known = AHashSet::new();
    for word in &words {
        if !known.insert(word.clone()) {
            continue;
        }
        for _ in 0..rng.usize(1..=shape.max_word_options.max(1)) {
            let target = target_word(rng, shape.target_vocab);
            if pairs.insert((word.clone(), target.clone())) {
                table
                    .insert(word, &target, random_scores(rng))
                    .expect("generated phrase");
            }
        }
    }

    for phrase_len in 2..=3 {
        for start in 0..=shape.len.saturating_sub(phrase_len) {
            if start + phrase_len > shape.len || !(rng.f64() < shape.phrase_probability) {
                continue;
            }
            let source = words[start..start + phrase_len].join(" ");
            let target = (0..rng.usize(1..=phrase_len))
                .map(|_| target_word(rng, shape.target_vocab))
                .collect::<Vec<_>>()
                .join(" ");
            if !pairs.insert((source.clone(), target.clone())) {
                continue;
            }
            table
                .insert(&source, &target, random_scores(rng))
                .expect("generated phrase");
        }
    }

    RandomProblem {
        sentence: Sentence::new(words.iter().map(|w| Word::from(w.as_str())).collect()),
        table,
        lm: Arc::new(random_bigram_model(rng, shape.target_vocab)),
    }
}

/// A bigram model over the target vocabulary `t0..t{vocab}` that prefers a
/// random subset of bigrams.
pub fn random_bigram_model(rng: &mut fastrand::Rng, vocab: usize) -> BigramModel {
    let mut lm = BigramModel::new(-2.0);
    let prev_words = std::iter::once(BEGIN_OF_SENTENCE.to_string())
        .chain((0..vocab).map(|i| format!("t{i}")))
        .collect::<Vec<_>>();
    for prev in &prev_words {
        for i in 0..vocab {
            if rng.f64() < 0.3 {
                lm.set(prev, &format!("t{i}"), tenths(rng, 2, 15));
            }
        }
        if rng.f64() < 0.5 {
            lm.set(prev, END_OF_SENTENCE, tenths(rng, 0, 10));
        }
    }
    lm
}

fn target_word(rng: &mut fastrand::Rng, vocab: usize) -> String {
    format!("t{}", rng.usize(..vocab))
}

fn random_scores(rng: &mut fastrand::Rng) -> Vec<f32> {
    (0..PROBLEM_PHRASE_SCORES)
        .map(|_| tenths(rng, 1, 30))
        .collect()
}

/// A negative multiple of 0.1 between `-max / 10` and `-min / 10`.
fn tenths(rng: &mut fastrand::Rng, min: u32, max: u32) -> f32 {
    -(rng.u32(min..=max) as f32) / 10.0
}

#[cfg(test)]
mod tests {
    use verso_decoder::PhraseSource;

    use super::*;

    #[test]
    fn test_every_word_has_a_candidate() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let problem = random_problem(&mut rng, ProblemShape::default());
            assert_eq!(problem.sentence.len(), 5);
            for pos in 0..problem.sentence.len() {
                let word = &problem.sentence.words()[pos..=pos];
                assert!(!problem.table.lookup(word).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_same_seed_same_problem() {
        let a = random_problem(&mut fastrand::Rng::with_seed(42), ProblemShape::default());
        let b = random_problem(&mut fastrand::Rng::with_seed(42), ProblemShape::default());
        assert_eq!(a.sentence.words(), b.sentence.words());
        assert_eq!(a.table.len(), b.table.len());
    }
}
