//! Decoder output.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    feature::FeatureSet,
    hypothesis::HypothesisArena,
    scores::ScoreBreakdown,
    sentence::Word,
    trellis::TrellisPath,
};

/// One applied phrase: the source span it translates and its target words.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseAlignment {
    pub source_start: usize,
    pub source_end: usize,
    pub target: Vec<Word>,
    pub unknown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScores {
    pub name: String,
    pub scores: Vec<f32>,
}

/// A complete derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    /// Phrases in target order.
    pub phrases: Vec<PhraseAlignment>,
    pub score: f32,
    pub features: Vec<FeatureScores>,
}

impl Translation {
    pub fn from_path(path: &TrellisPath, arena: &HypothesisArena, features: &FeatureSet) -> Translation {
        let phrases = path
            .hypotheses()
            .filter_map(|id| arena[id].option())
            .map(|option| PhraseAlignment {
                source_start: option.range().start(),
                source_end: option.range().end(),
                target: option.target().words().to_vec(),
                unknown: option.is_unknown(),
            })
            .collect();
        Translation {
            phrases,
            score: path.score(),
            features: feature_scores(path.breakdown(), features),
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.phrases.iter().flat_map(|phrase| phrase.target.iter())
    }

    pub fn text(&self) -> String {
        self.words().join(" ")
    }

    /// Source spans in target order, as `(start, end)`.
    pub fn alignment(&self) -> Vec<(usize, usize)> {
        self.phrases
            .iter()
            .map(|phrase| (phrase.source_start, phrase.source_end))
            .collect()
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words().join(" "))
    }
}

fn feature_scores(breakdown: &ScoreBreakdown, features: &FeatureSet) -> Vec<FeatureScores> {
    features
        .layout()
        .slots()
        .iter()
        .filter(|slot| slot.len > 0)
        .map(|slot| FeatureScores {
            name: slot.name.clone(),
            scores: breakdown.slice(slot.range()).to_vec(),
        })
        .collect()
}
