//! Decoding of a single sentence.

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;
use verso_common::Result;

use crate::{
    config::SearchConfig,
    feature::FeatureSet,
    options::TranslationOptionCollection,
    phrase_table::PhraseSource,
    search::{self, SearchContext, SearchGraph},
    sentence::Sentence,
    stats::SentenceStats,
    translation::Translation,
    trellis::{TrellisPath, calc_nbest},
};

/// Outcome of decoding one sentence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeResult {
    /// `None` when no complete derivation exists or the search timed out.
    pub best: Option<Translation>,
    /// Best first; empty unless n-best extraction is enabled.
    pub nbest: Vec<Translation>,
    pub stats: SentenceStats,
    pub timed_out: bool,
}

/// Runs option collection, search and output extraction for one sentence.
pub struct Manager<'a> {
    sentence: &'a Sentence,
    phrases: &'a dyn PhraseSource,
    features: &'a FeatureSet,
    config: &'a SearchConfig,
}

impl<'a> Manager<'a> {
    pub fn new(
        sentence: &'a Sentence,
        phrases: &'a dyn PhraseSource,
        features: &'a FeatureSet,
        config: &'a SearchConfig,
    ) -> Manager<'a> {
        Manager {
            sentence,
            phrases,
            features,
            config,
        }
    }

    /// Runs the search and returns the whole search graph.
    pub fn search(&self) -> Result<SearchGraph> {
        let deadline = self
            .config
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let options =
            TranslationOptionCollection::build(self.sentence, self.phrases, self.features, self.config)?;
        let ctx = SearchContext::new(self.sentence, &options, self.features, self.config)
            .with_deadline(deadline);
        search::search(&ctx)
    }

    pub fn decode(&self) -> Result<DecodeResult> {
        let started = Instant::now();
        info!(
            "decoding {} words with {:?} search",
            self.sentence.len(),
            self.config.algorithm
        );

        let graph = self.search()?;
        let arena = graph.arena();
        let best = graph
            .best_final()
            .map(|id| Translation::from_path(&TrellisPath::pure(arena, id), arena, self.features));

        let nbest = if self.config.nbest_enabled() {
            calc_nbest(
                arena,
                &graph.final_hypotheses(),
                self.config.nbest_size,
                self.config.nbest_distinct,
                self.config.nbest_factor,
            )
            .iter()
            .map(|path| Translation::from_path(path, arena, self.features))
            .collect()
        } else {
            Vec::new()
        };

        let mut stats = graph.stats().clone();
        stats.elapsed = started.elapsed();
        debug!("{stats}");
        match &best {
            Some(best) => info!("best score {:.4}: {best}", best.score),
            None if graph.timed_out() => info!("no translation, search timed out"),
            None => info!("no complete translation"),
        }

        Ok(DecodeResult {
            best,
            nbest,
            stats,
            timed_out: graph.timed_out(),
        })
    }
}
