//! Search drivers.
//!
//! Both strategies fill one [`HypothesisStack`] per number of covered source
//! words, in increasing order, and leave behind a [`SearchGraph`] from which
//! the best and n-best translations are read.

pub mod cube;
pub mod normal;

use std::{sync::Arc, time::Instant};

use log::{debug, warn};
use verso_common::Result;

use crate::{
    config::{SearchAlgorithm, SearchConfig},
    coverage_pool::{CoverageId, CoveragePool},
    feature::FeatureSet,
    hypothesis::{Hypothesis, HypothesisArena, HypothesisId},
    options::{TranslationOption, TranslationOptionCollection},
    reordering::ReorderingPolicy,
    sentence::Sentence,
    stack::HypothesisStack,
    stats::SentenceStats,
};

pub use cube::CubePruningSearch;
pub use normal::NormalSearch;

/// Read-only inputs of one sentence's search.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub sentence: &'a Sentence,
    pub options: &'a TranslationOptionCollection,
    pub features: &'a FeatureSet,
    pub config: &'a SearchConfig,
    pub policy: ReorderingPolicy<'a>,
    pub deadline: Option<Instant>,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        sentence: &'a Sentence,
        options: &'a TranslationOptionCollection,
        features: &'a FeatureSet,
        config: &'a SearchConfig,
    ) -> SearchContext<'a> {
        SearchContext {
            sentence,
            options,
            features,
            config,
            policy: ReorderingPolicy::new(config.max_distortion, sentence.constraint()),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> SearchContext<'a> {
        self.deadline = deadline;
        self
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Runs the configured strategy.
pub fn search(ctx: &SearchContext<'_>) -> Result<SearchGraph> {
    match ctx.config.algorithm {
        SearchAlgorithm::Normal => NormalSearch::new(ctx).decode(),
        SearchAlgorithm::CubePruning => CubePruningSearch::new(ctx).decode(),
    }
}

/// Hypotheses, coverages and stacks of a searched sentence.
#[derive(Debug)]
pub struct SearchGraph {
    arena: HypothesisArena,
    coverage: CoveragePool,
    stacks: Vec<HypothesisStack>,
    stats: SentenceStats,
    timed_out: bool,
}

impl SearchGraph {
    /// Creates the stacks and places the initial hypothesis in the first one.
    fn new(ctx: &SearchContext<'_>) -> SearchGraph {
        let len = ctx.sentence.len();
        let config = ctx.config;
        let estimated = ctx.options.estimated_scores();
        let coverage = CoveragePool::new(len, estimated);
        let with_target_end = config.algorithm == SearchAlgorithm::CubePruning;
        let stacks = (0..=len)
            .map(|_| {
                HypothesisStack::new(
                    config.stack_limit,
                    config.beam_width,
                    config.nbest_enabled(),
                    with_target_end,
                )
            })
            .collect();

        let mut graph = SearchGraph {
            arena: HypothesisArena::new(),
            coverage,
            stacks,
            stats: SentenceStats::default(),
            timed_out: false,
        };
        let empty = graph.coverage.empty();
        let initial = Hypothesis::initial(
            ctx.sentence,
            ctx.features,
            empty,
            graph.coverage.estimated_score(empty),
        );
        let id = graph.arena.insert(initial);
        graph.stats.created += 1;
        graph.stacks[0].add_prune(&mut graph.arena, id, &mut graph.stats);
        graph
    }

    pub fn arena(&self) -> &HypothesisArena {
        &self.arena
    }

    pub fn coverage(&self) -> &CoveragePool {
        &self.coverage
    }

    pub fn stacks(&self) -> &[HypothesisStack] {
        &self.stacks
    }

    pub fn stats(&self) -> &SentenceStats {
        &self.stats
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Complete hypotheses, best first.
    pub fn final_hypotheses(&self) -> Vec<HypothesisId> {
        match self.stacks.last() {
            Some(stack) if !self.timed_out => stack.sorted(&self.arena),
            _ => Vec::new(),
        }
    }

    pub fn best_final(&self) -> Option<HypothesisId> {
        if self.timed_out {
            return None;
        }
        self.stacks.last().and_then(|stack| stack.best(&self.arena))
    }

    /// Builds and evaluates the successor of `parent` applying `option`.
    fn expand(
        &mut self,
        ctx: &SearchContext<'_>,
        parent: HypothesisId,
        option: &Arc<TranslationOption>,
        coverage: CoverageId,
    ) -> Result<HypothesisId> {
        let parent_hypothesis = &self.arena[parent];
        let mut hypothesis = Hypothesis::extend(
            parent,
            parent_hypothesis,
            self.coverage.get(parent_hypothesis.coverage()),
            option.clone(),
            coverage,
            self.coverage.estimated_score(coverage),
        )?;
        hypothesis.evaluate_when_applied(
            parent_hypothesis,
            ctx.sentence,
            self.coverage.get(coverage),
            ctx.features,
        );
        self.stats.created += 1;
        Ok(self.arena.insert(hypothesis))
    }

    /// Applies the size limit to stack `index`, trims arc lists and returns
    /// the survivors best first.
    fn close_stack(&mut self, ctx: &SearchContext<'_>, index: usize) -> Vec<HypothesisId> {
        let stack = &mut self.stacks[index];
        let survivors = stack.sorted_and_pruned(&mut self.arena, &mut self.stats);
        stack.cleanup_arc_lists(&mut self.arena, ctx.config.nbest_pool_size());
        self.stats.stack_sizes.push(survivors.len());
        debug!(
            "stack {index}: {} hypotheses, best {:.4}, arena {} live",
            survivors.len(),
            stack.best_score(),
            self.arena.live()
        );
        survivors
    }

    /// Returns `true` and marks the search as abandoned once the deadline passed.
    fn check_deadline(&mut self, ctx: &SearchContext<'_>, index: usize) -> bool {
        if ctx.deadline_passed() {
            warn!("search timed out before stack {index} of {}", self.stacks.len() - 1);
            self.timed_out = true;
        }
        self.timed_out
    }
}
