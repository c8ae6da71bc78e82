use std::{fmt, time::Duration};

use serde::Serialize;

/// Counters collected while decoding one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentenceStats {
    /// Hypotheses built and evaluated.
    pub created: usize,
    /// Hypotheses rejected by the beam or histogram threshold on insertion.
    pub discarded: usize,
    /// Hypotheses merged into an equivalent one.
    pub recombined: usize,
    /// Survivors removed when a stack was cut down to its size limit.
    pub pruned: usize,
    /// Expansions skipped by early discarding before they were built.
    pub not_built: usize,
    /// Cube pruning queue pops.
    pub cube_pops: usize,
    /// Stack sizes after pruning, by number of covered words.
    pub stack_sizes: Vec<usize>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl fmt::Display for SentenceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} discarded={} recombined={} pruned={} not_built={} pops={} time={:?}",
            self.created,
            self.discarded,
            self.recombined,
            self.pruned,
            self.not_built,
            self.cube_pops,
            self.elapsed
        )
    }
}
