//! Cube pruning.
//!
//! When a stack is closed its survivors are grouped by coverage, and every
//! group is paired with every span it may translate next. Each pairing is a
//! [`CubeEdge`]: a grid whose rows are the group's hypotheses and whose columns
//! are the span's options, both sorted best first. The cell `(0, 0)` of every
//! edge leading into a stack is built up front; after that cells are built only
//! as neighbours of popped cells, so a stack is filled from a bounded number of
//! pops of one shared priority queue instead of the full cross product.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use ahash::{AHashMap, AHashSet};
use log::trace;
use ordered_float::OrderedFloat;
use verso_common::Result;
use verso_coverage::SourceRange;

use crate::{
    coverage_pool::CoverageId, hypothesis::HypothesisId, options::TranslationOption,
    stack::AddOutcome,
};

use super::{SearchContext, SearchGraph};

/// Lazily enumerated product of hypotheses and options for one span.
#[derive(Debug)]
struct CubeEdge<'a> {
    hypotheses: Vec<HypothesisId>,
    options: &'a [Arc<TranslationOption>],
    coverage: CoverageId,
    seen: AHashSet<(u32, u32)>,
    pops: usize,
}

impl<'a> CubeEdge<'a> {
    fn new(
        hypotheses: Vec<HypothesisId>,
        options: &'a [Arc<TranslationOption>],
        coverage: CoverageId,
    ) -> CubeEdge<'a> {
        CubeEdge {
            hypotheses,
            options,
            coverage,
            seen: AHashSet::new(),
            pops: 0,
        }
    }

    fn in_bounds(&self, x: u32, y: u32) -> bool {
        (x as usize) < self.hypotheses.len() && (y as usize) < self.options.len()
    }
}

/// A built but not yet accepted hypothesis at cell `(x, y)` of an edge.
#[derive(Debug)]
struct QueueItem {
    future_score: OrderedFloat<f32>,
    seq: u64,
    edge: usize,
    x: u32,
    y: u32,
    hypothesis: HypothesisId,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    // max-heap: higher score first, then the earlier built item
    fn cmp(&self, other: &Self) -> Ordering {
        self.future_score
            .cmp(&other.future_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct CubePruningSearch<'c, 'a> {
    ctx: &'c SearchContext<'a>,
    graph: SearchGraph,
    /// Edges by the stack they lead into.
    pending: Vec<Vec<CubeEdge<'a>>>,
}

impl<'c, 'a> CubePruningSearch<'c, 'a> {
    pub fn new(ctx: &'c SearchContext<'a>) -> CubePruningSearch<'c, 'a> {
        let graph = SearchGraph::new(ctx);
        let pending = (0..graph.stacks.len()).map(|_| Vec::new()).collect();
        CubePruningSearch {
            ctx,
            graph,
            pending,
        }
    }

    pub fn decode(mut self) -> Result<SearchGraph> {
        for index in 0..self.graph.stacks.len() {
            if self.graph.check_deadline(self.ctx, index) {
                break;
            }
            if index > 0 {
                self.fill_stack(index)?;
            }
            let survivors = self.graph.close_stack(self.ctx, index);
            self.create_forward_edges(index, &survivors)?;
        }
        Ok(self.graph)
    }

    /// Pops up to the configured limit of items from the edges leading into
    /// stack `index`.
    fn fill_stack(&mut self, index: usize) -> Result<()> {
        let mut edges = std::mem::take(&mut self.pending[index]);
        let mut queue = BinaryHeap::new();
        for edge in 0..edges.len() {
            if let Some(item) = self.build_item(&mut edges, edge, 0, 0)? {
                queue.push(item);
            }
        }

        let pop_limit = self.ctx.config.cube_pop_limit;
        let mut pops = 0;
        while pops < pop_limit {
            let Some(item) = queue.pop() else {
                break;
            };
            pops += 1;
            edges[item.edge].pops += 1;
            self.accept(index, item.hypothesis);

            for (x, y) in [(item.x + 1, item.y), (item.x, item.y + 1)] {
                if let Some(next) = self.build_item(&mut edges, item.edge, x, y)? {
                    queue.push(next);
                }
            }
        }
        self.graph.stats.cube_pops += pops;

        let diversity = self.ctx.config.cube_diversity;
        for item in queue.into_vec() {
            let corner = item.x == 0 && item.y == 0;
            if diversity && corner && edges[item.edge].pops == 0 {
                edges[item.edge].pops += 1;
                self.accept(index, item.hypothesis);
            } else {
                self.graph.arena.recycle(item.hypothesis);
            }
        }
        trace!("stack {index}: {pops} pops over {} edges", edges.len());
        Ok(())
    }

    fn accept(&mut self, index: usize, id: HypothesisId) {
        let graph = &mut self.graph;
        let outcome = graph.stacks[index].add_prune(&mut graph.arena, id, &mut graph.stats);
        if outcome == AddOutcome::Added {
            trace!("cube item {id:?} added to stack {index}");
        }
    }

    /// Builds the hypothesis at `(x, y)` of `edges[edge]` unless it lies outside
    /// the grid or was built before.
    fn build_item(
        &mut self,
        edges: &mut [CubeEdge<'a>],
        edge: usize,
        x: u32,
        y: u32,
    ) -> Result<Option<QueueItem>> {
        let cube = &mut edges[edge];
        if !cube.in_bounds(x, y) || !cube.seen.insert((x, y)) {
            return Ok(None);
        }
        let parent = cube.hypotheses[x as usize];
        let option = &cube.options[y as usize];
        let hypothesis = self.graph.expand(self.ctx, parent, option, cube.coverage)?;
        let built = &self.graph.arena[hypothesis];
        Ok(Some(QueueItem {
            future_score: OrderedFloat(built.future_score()),
            seq: built.seq(),
            edge,
            x,
            y,
            hypothesis,
        }))
    }

    /// Groups the survivors of stack `index` by coverage and registers an edge
    /// for every admissible span of every group.
    fn create_forward_edges(&mut self, index: usize, survivors: &[HypothesisId]) -> Result<()> {
        let ctx = self.ctx;
        let options = ctx.options;
        let graph = &mut self.graph;

        let mut containers: Vec<(CoverageId, Vec<HypothesisId>)> = Vec::new();
        let mut by_coverage = AHashMap::new();
        for &id in survivors {
            let coverage = graph.arena[id].coverage();
            let slot = *by_coverage.entry(coverage).or_insert_with(|| {
                containers.push((coverage, Vec::new()));
                containers.len() - 1
            });
            containers[slot].1.push(id);
        }

        for (coverage, hypotheses) in containers {
            let bitmap = graph.coverage.get(coverage);
            let len = bitmap.len();
            let mut spans = Vec::new();
            for start in 0..len {
                if bitmap.is_covered(start) {
                    continue;
                }
                for end in start..(start + options.max_phrase_length()).min(len) {
                    if bitmap.is_covered(end) {
                        break;
                    }
                    let range = SourceRange::new(start, end);
                    if !options.get(range).is_empty() && ctx.policy.allows_span(bitmap, &range) {
                        spans.push(range);
                    }
                }
            }

            for range in spans {
                let admitted = hypotheses
                    .iter()
                    .copied()
                    .filter(|&id| {
                        let prev = graph.arena[id].source_range();
                        ctx.policy.allows_jump(prev.as_ref(), &range)
                    })
                    .collect::<Vec<_>>();
                if admitted.is_empty() {
                    continue;
                }
                let next = graph
                    .coverage
                    .extend(coverage, range, options.estimated_scores())?;
                let dest = index + range.len();
                self.pending[dest].push(CubeEdge::new(admitted, options.get(range), next));
            }
        }
        Ok(())
    }
}
