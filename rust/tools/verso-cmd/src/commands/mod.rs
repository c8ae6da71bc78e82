//! Command implementations for verso-cmd

use std::fs;

use anyhow::{Context, Result};
use verso_decoder::{
    DecoderConfig, FeatureSet, WeightsConfig,
    feature::{
        DISTORTION, DistortionPenalty, PHRASE_PENALTY, PhrasePenalty, TRANSLATION_MODEL,
        WORD_PENALTY, WordPenalty,
    },
};

use crate::utils::validate_file_exists;

pub mod check_config;
pub mod decode;

/// Reads a JSON decoder configuration, or the defaults when no path is given.
pub fn load_config(path: Option<&str>) -> Result<DecoderConfig> {
    let Some(path) = path else {
        return Ok(DecoderConfig::default());
    };
    validate_file_exists(path)?;
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let config: DecoderConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse decoder configuration {path}"))?;
    Ok(config)
}

/// Builds the feature set the command line supports.
///
/// The translation model is always present and gets unit weights when the
/// configuration names none. Word penalty, phrase penalty and distortion are
/// enabled by giving them a weight.
pub fn build_features(phrase_scores: usize, weights: &WeightsConfig) -> Result<FeatureSet> {
    let mut weights = weights.clone();
    if weights.get(TRANSLATION_MODEL).is_none() {
        weights = weights.with(TRANSLATION_MODEL, vec![1.0; phrase_scores]);
    }

    let mut builder = FeatureSet::builder(phrase_scores);
    if weights.get(WORD_PENALTY).is_some() {
        builder = builder.stateless(WordPenalty::new());
    }
    if weights.get(PHRASE_PENALTY).is_some() {
        builder = builder.stateless(PhrasePenalty::new());
    }
    if weights.get(DISTORTION).is_some() {
        builder = builder.stateful(DistortionPenalty::new());
    }
    let features = builder.build(&weights).context("Invalid feature weights")?;
    Ok(features)
}

#[cfg(test)]
mod tests {
    use verso_decoder::feature::UNKNOWN_WORD_PENALTY;
    use verso_testkit::files::temp_text_file;

    use super::*;

    #[test]
    fn test_build_features_defaults() {
        let features = build_features(2, &WeightsConfig::new()).unwrap();
        assert_eq!(features.num_phrase_scores(), 2);
        assert_eq!(features.num_stateful(), 0);
        assert_eq!(features.weights(), [1.0, 1.0, 1.0]);
        assert!(features.layout().find(UNKNOWN_WORD_PENALTY).is_some());
        assert!(features.layout().find(WORD_PENALTY).is_none());
    }

    #[test]
    fn test_build_features_from_weights() {
        let weights = WeightsConfig::new()
            .with(TRANSLATION_MODEL, vec![0.2])
            .with(WORD_PENALTY, vec![-0.5])
            .with(DISTORTION, vec![0.3]);
        let features = build_features(1, &weights).unwrap();
        assert_eq!(features.num_stateful(), 1);
        assert!(features.layout().find(PHRASE_PENALTY).is_none());
        assert_eq!(features.weights(), [1.0, 0.2, -0.5, 0.3]);
    }

    #[test]
    fn test_build_features_rejects_unknown_weight() {
        let weights = WeightsConfig::new().with("LM", vec![1.0]);
        assert!(build_features(1, &weights).is_err());

        let weights = WeightsConfig::new().with(TRANSLATION_MODEL, vec![1.0, 1.0]);
        assert!(build_features(1, &weights).is_err());
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap(), DecoderConfig::default());

        let file = temp_text_file([
            r#"{"search": {"stack_limit": 7}, "weights": {"Distortion": [0.5]}}"#,
        ])
        .unwrap();
        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.search.stack_limit, 7);
        assert_eq!(config.weights.get(DISTORTION), Some(&[0.5][..]));

        let bad = temp_text_file(["{ not json"]).unwrap();
        assert!(load_config(bad.path().to_str()).is_err());
        assert!(load_config(Some("/nonexistent/verso.json")).is_err());
    }
}
