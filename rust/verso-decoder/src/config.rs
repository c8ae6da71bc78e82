//! Decoder and search configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verso_common::{Result, error::Error, verify_arg};

/// Default maximum number of hypotheses kept per stack.
pub const DEFAULT_STACK_LIMIT: usize = 100;

/// Default beam threshold, as a probability ratio relative to the best hypothesis.
pub const DEFAULT_BEAM_THRESHOLD: f32 = 1e-5;

/// Default number of hypotheses popped per stack by cube pruning.
pub const DEFAULT_CUBE_POP_LIMIT: usize = 1000;

pub const DEFAULT_MAX_DISTORTION: usize = 6;

pub const DEFAULT_MAX_PHRASE_LENGTH: usize = 20;

pub const DEFAULT_NBEST_FACTOR: usize = 20;

pub const DEFAULT_MAX_OPTIONS_PER_SPAN: usize = 20;

/// Selects the search strategy for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    #[default]
    Normal,
    CubePruning,
}

/// What to do with source words that have no phrase-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownWordPolicy {
    /// Copy the source word to the target, penalized by the unknown-word feature.
    #[default]
    PassThrough,
    /// Create no option; a sentence with an unknown word then has no translation.
    Drop,
}

/// Parameters of the per-sentence search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub algorithm: SearchAlgorithm,
    /// Histogram pruning limit per stack. Must be greater than 0.
    pub stack_limit: usize,
    /// Beam width in log space: hypotheses whose future score falls more than
    /// this below the best one in their stack are discarded.
    pub beam_width: f32,
    pub cube_pop_limit: usize,
    pub cube_diversity: bool,
    /// Number of n-best translations to extract; 0 disables arc bookkeeping.
    pub nbest_size: usize,
    pub nbest_distinct: bool,
    pub nbest_factor: usize,
    /// Maximum jump between consecutive phrases; `None` is unlimited.
    pub max_distortion: Option<usize>,
    pub max_phrase_length: usize,
    pub max_options_per_span: usize,
    /// Options whose future score is more than this below the best option of
    /// the same span are dropped.
    pub option_threshold: Option<f32>,
    /// Margin below the destination stack's worst score under which the normal
    /// driver skips building an expansion.
    pub early_discarding_threshold: Option<f32>,
    pub unknown_words: UnknownWordPolicy,
    pub timeout_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            algorithm: SearchAlgorithm::Normal,
            stack_limit: DEFAULT_STACK_LIMIT,
            beam_width: -DEFAULT_BEAM_THRESHOLD.ln(),
            cube_pop_limit: DEFAULT_CUBE_POP_LIMIT,
            cube_diversity: false,
            nbest_size: 0,
            nbest_distinct: false,
            nbest_factor: DEFAULT_NBEST_FACTOR,
            max_distortion: Some(DEFAULT_MAX_DISTORTION),
            max_phrase_length: DEFAULT_MAX_PHRASE_LENGTH,
            max_options_per_span: DEFAULT_MAX_OPTIONS_PER_SPAN,
            option_threshold: None,
            early_discarding_threshold: None,
            unknown_words: UnknownWordPolicy::PassThrough,
            timeout_ms: None,
        }
    }
}

impl SearchConfig {
    /// Settings that never prune: infinite beam, unlimited stacks, pops and
    /// distortion. Mostly useful for tests on short sentences.
    pub fn exhaustive(algorithm: SearchAlgorithm) -> SearchConfig {
        SearchConfig {
            algorithm,
            stack_limit: usize::MAX / 4,
            beam_width: f32::INFINITY,
            cube_pop_limit: usize::MAX,
            max_distortion: None,
            max_options_per_span: usize::MAX,
            ..Default::default()
        }
    }

    pub fn nbest_enabled(&self) -> bool {
        self.nbest_size > 0
    }

    /// Number of arcs kept per surviving hypothesis and the bound on the n-best
    /// candidate collection.
    pub fn nbest_pool_size(&self) -> usize {
        if self.nbest_distinct {
            self.nbest_size.saturating_mul(self.nbest_factor.max(1))
        } else {
            self.nbest_size
        }
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(stack_limit, self.stack_limit > 0);
        if self.beam_width.is_nan() || self.beam_width < 0.0 {
            return Err(Error::invalid_arg(
                "beam_width",
                format!("must be a non-negative number, got {}", self.beam_width),
            ));
        }
        verify_arg!(cube_pop_limit, self.cube_pop_limit > 0);
        verify_arg!(max_phrase_length, self.max_phrase_length > 0);
        verify_arg!(max_options_per_span, self.max_options_per_span > 0);
        if self.nbest_distinct && self.nbest_factor == 0 {
            return Err(Error::invalid_arg(
                "nbest_factor",
                "must be greater than 0 in distinct mode",
            ));
        }
        for (name, value) in [
            ("option_threshold", self.option_threshold),
            ("early_discarding_threshold", self.early_discarding_threshold),
        ] {
            if let Some(value) = value {
                if value.is_nan() || value < 0.0 {
                    return Err(Error::invalid_arg(
                        name,
                        format!("must be a non-negative number, got {value}"),
                    ));
                }
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::invalid_arg("timeout_ms", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Feature weights by feature name. Each entry holds one weight per score the
/// feature produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightsConfig(pub BTreeMap<String, Vec<f32>>);

impl WeightsConfig {
    pub fn new() -> WeightsConfig {
        WeightsConfig::default()
    }

    pub fn with(mut self, name: impl Into<String>, weights: Vec<f32>) -> WeightsConfig {
        self.0.insert(name.into(), weights);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Complete configuration of a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub search: SearchConfig,
    pub weights: WeightsConfig,
    /// Worker threads for batch decoding; `None` uses the rayon default.
    pub threads: Option<usize>,
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.threads == Some(0) {
            return Err(Error::invalid_arg("threads", "must be greater than 0"));
        }
        for (name, weights) in &self.weights.0 {
            if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
                return Err(Error::invalid_arg(
                    "weights",
                    format!("weight {w} of '{name}' is not finite"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.stack_limit, 100);
        assert!((config.beam_width - 11.512_925).abs() < 1e-3);
        assert_eq!(config.max_distortion, Some(6));
        config.validate().unwrap();
        DecoderConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SearchConfig {
            stack_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SearchConfig {
            beam_width: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SearchConfig {
            nbest_distinct: true,
            nbest_factor: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DecoderConfig {
            weights: WeightsConfig::new().with("WordPenalty", vec![f32::NAN]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nbest_pool_size() {
        let mut config = SearchConfig {
            nbest_size: 5,
            nbest_factor: 3,
            ..Default::default()
        };
        assert_eq!(config.nbest_pool_size(), 5);
        config.nbest_distinct = true;
        assert_eq!(config.nbest_pool_size(), 15);
    }

    #[test]
    fn test_json_roundtrip_with_partial_input() {
        let json = r#"{
            "search": { "algorithm": "cube_pruning", "max_distortion": null, "nbest_size": 10 },
            "weights": { "TranslationModel": [0.2, 0.3], "WordPenalty": [-1.0] }
        }"#;
        let config: DecoderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.search.algorithm, SearchAlgorithm::CubePruning);
        assert_eq!(config.search.max_distortion, None);
        assert_eq!(config.search.nbest_size, 10);
        assert_eq!(config.search.stack_limit, DEFAULT_STACK_LIMIT);
        assert_eq!(config.weights.get("TranslationModel"), Some(&[0.2, 0.3][..]));

        let text = serde_json::to_string(&config).unwrap();
        let back: DecoderConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
