//! Decoding of many sentences in parallel.

use std::sync::Arc;

use log::info;
use rayon::prelude::*;
use verso_common::{
    Result,
    error::{Error, ErrorKind},
};

use crate::{
    config::DecoderConfig,
    feature::FeatureSet,
    manager::{DecodeResult, Manager},
    phrase_table::PhraseSource,
    sentence::Sentence,
};

/// Shares one phrase source, model and configuration across sentences.
///
/// Sentences are independent: each one is decoded with its own hypothesis
/// arena, and a failing sentence does not affect the others.
pub struct Decoder {
    phrases: Arc<dyn PhraseSource>,
    features: Arc<FeatureSet>,
    config: DecoderConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Decoder {
    pub fn new(
        phrases: Arc<dyn PhraseSource>,
        features: Arc<FeatureSet>,
        config: DecoderConfig,
    ) -> Result<Decoder> {
        config.validate()?;
        if phrases.num_scores() != features.num_phrase_scores() {
            return Err(Error::invalid_arg(
                "features",
                format!(
                    "phrase source provides {} scores but the model expects {}",
                    phrases.num_scores(),
                    features.num_phrase_scores()
                ),
            ));
        }
        let pool = config
            .threads
            .map(|threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("verso-decode-{i}"))
                    .build()
                    .map_err(|e| {
                        Error::from(ErrorKind::External {
                            context: "decoder thread pool".to_string(),
                            source: Box::new(e),
                        })
                    })
            })
            .transpose()?;
        Ok(Decoder {
            phrases,
            features,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn decode(&self, sentence: &Sentence) -> Result<DecodeResult> {
        Manager::new(
            sentence,
            self.phrases.as_ref(),
            &self.features,
            &self.config.search,
        )
        .decode()
    }

    /// Decodes every sentence, returning one result per input in input order.
    /// Errors are wrapped with the index of the failing sentence.
    pub fn decode_batch(&self, sentences: &[Sentence]) -> Vec<Result<DecodeResult>> {
        info!("decoding batch of {} sentences", sentences.len());
        let run = || {
            sentences
                .par_iter()
                .enumerate()
                .map(|(index, sentence)| {
                    self.decode(sentence)
                        .map_err(|e| Error::sentence(index, e))
                })
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}
