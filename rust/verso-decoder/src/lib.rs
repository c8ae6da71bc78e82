//! Phrase-based translation search.
//!
//! A sentence is decoded by growing partial translations ([`Hypothesis`]) left to
//! right in target order while covering the source in any admissible order.
//! Hypotheses are grouped into stacks by the number of source words they cover;
//! equivalent hypotheses are recombined and each stack is pruned by histogram and
//! beam thresholds before it is expanded. Two strategies drive expansion:
//!
//! - [`SearchAlgorithm::Normal`] expands every survivor with every admissible option.
//! - [`SearchAlgorithm::CubePruning`] generates successors lazily from a shared
//!   priority queue over "cube edges" and stops after a fixed number of pops.
//!
//! The entry points are [`Manager`] (one sentence) and [`Decoder`] (a batch of
//! sentences decoded in parallel).

pub mod config;
pub mod coverage_pool;
pub mod decoder;
pub mod estimated_scores;
pub mod feature;
pub mod hypothesis;
pub mod manager;
pub mod options;
pub mod phrase_table;
pub mod reordering;
pub mod scores;
pub mod search;
pub mod sentence;
pub mod stack;
pub mod stats;
pub mod translation;
pub mod trellis;

pub use config::{DecoderConfig, SearchAlgorithm, SearchConfig, UnknownWordPolicy, WeightsConfig};
pub use decoder::Decoder;
pub use feature::{FeatureSet, FeatureSetBuilder};
pub use hypothesis::{Hypothesis, HypothesisArena, HypothesisId};
pub use manager::{DecodeResult, Manager};
pub use options::{TargetPhrase, TranslationOption, TranslationOptionCollection};
pub use phrase_table::{PhraseCandidate, PhraseSource, PhraseTable};
pub use reordering::{ReorderingConstraint, ReorderingPolicy, Walls};
pub use scores::{ScoreBreakdown, ScoreLayout};
pub use sentence::{Sentence, Word};
pub use stats::SentenceStats;
pub use translation::Translation;
