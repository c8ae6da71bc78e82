//! Exhaustive stack decoding.
//!
//! Every surviving hypothesis of a stack is expanded with every option of
//! every admissible span before the next stack is processed.

use log::trace;
use verso_common::Result;
use verso_coverage::SourceRange;

use crate::hypothesis::HypothesisId;

use super::{SearchContext, SearchGraph};

pub struct NormalSearch<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    graph: SearchGraph,
}

impl<'c, 'a> NormalSearch<'c, 'a> {
    pub fn new(ctx: &'c SearchContext<'a>) -> NormalSearch<'c, 'a> {
        NormalSearch {
            ctx,
            graph: SearchGraph::new(ctx),
        }
    }

    pub fn decode(mut self) -> Result<SearchGraph> {
        for index in 0..self.graph.stacks.len() {
            if self.graph.check_deadline(self.ctx, index) {
                break;
            }
            let survivors = self.graph.close_stack(self.ctx, index);
            for id in survivors {
                self.process_one_hypothesis(id)?;
            }
        }
        Ok(self.graph)
    }

    /// Expands `id` over every span it may translate next.
    fn process_one_hypothesis(&mut self, id: HypothesisId) -> Result<()> {
        let ctx = self.ctx;
        let hypothesis = &self.graph.arena[id];
        let prev_range = hypothesis.source_range();
        let bitmap = self.graph.coverage.get(hypothesis.coverage());
        let Some(first_gap) = bitmap.first_gap() else {
            return Ok(());
        };

        let len = bitmap.len();
        let max_phrase_length = ctx.options.max_phrase_length();
        let mut spans = Vec::new();
        for start in first_gap..len {
            if bitmap.is_covered(start) {
                continue;
            }
            for end in start..(start + max_phrase_length).min(len) {
                if bitmap.is_covered(end) {
                    break;
                }
                let range = SourceRange::new(start, end);
                if ctx.options.get(range).is_empty() {
                    continue;
                }
                if ctx.policy.can_extend(bitmap, prev_range.as_ref(), &range) {
                    spans.push(range);
                }
            }
        }

        for range in spans {
            self.expand_all(id, range)?;
        }
        Ok(())
    }

    /// Expands `id` with every option of `range`.
    fn expand_all(&mut self, id: HypothesisId, range: SourceRange) -> Result<()> {
        let ctx = self.ctx;
        let graph = &mut self.graph;
        let parent_coverage = graph.arena[id].coverage();
        let coverage =
            graph
                .coverage
                .extend(parent_coverage, range, ctx.options.estimated_scores())?;
        let dest = graph.coverage.get(coverage).words_covered();
        let estimated = graph.coverage.estimated_score(coverage);
        let parent_score = graph.arena[id].score();

        for option in ctx.options.get(range) {
            if let Some(threshold) = ctx.config.early_discarding_threshold {
                let expected = parent_score + estimated + option.future_score();
                let allowed = graph.stacks[dest].worst_score() - threshold;
                if expected < allowed {
                    trace!("not building {id:?} + {range}: {expected} < {allowed}");
                    graph.stats.not_built += 1;
                    continue;
                }
            }
            let child = graph.expand(ctx, id, option, coverage)?;
            graph.stacks[dest].add_prune(&mut graph.arena, child, &mut graph.stats);
        }
        Ok(())
    }
}
