//! Lazy n-best extraction over the recombination arcs of the search graph.
//!
//! A path is a list of hypotheses from a complete hypothesis back to the
//! initial one. Every arc recorded at a hypothesis of the path is a way to
//! reach the same recombination state with a lower score, so substituting the
//! arc (and the arc's own ancestors) for that part of the path yields the next
//! best candidates. Paths are expanded best first; each deviant only deviates
//! further at edges closer to the start than its last substitution, so no
//! derivation is produced twice.

use std::{cmp::Reverse, collections::BTreeMap};

use ahash::AHashSet;
use ordered_float::OrderedFloat;

use crate::{
    hypothesis::{HypothesisArena, HypothesisId},
    scores::ScoreBreakdown,
    sentence::Word,
};

#[derive(Debug, Clone)]
pub struct TrellisPath {
    /// Final hypothesis first, initial hypothesis last.
    edges: Vec<HypothesisId>,
    prev_edge_changed: Option<usize>,
    score: f32,
    breakdown: ScoreBreakdown,
}

impl TrellisPath {
    /// The derivation ending in `last`, with no substitutions.
    pub fn pure(arena: &HypothesisArena, last: HypothesisId) -> TrellisPath {
        let hypothesis = &arena[last];
        TrellisPath {
            edges: arena.chain(last).collect(),
            prev_edge_changed: None,
            score: hypothesis.score(),
            breakdown: hypothesis.breakdown().clone(),
        }
    }

    /// Copy of `self` with edge `edge` replaced by `arc` and everything before
    /// it by the arc's ancestors.
    fn deviant(&self, arena: &HypothesisArena, edge: usize, arc: HypothesisId) -> TrellisPath {
        let replaced = &arena[self.edges[edge]];
        let substitute = &arena[arc];
        debug_assert!(substitute.winner().is_none_or(|w| w == self.edges[edge]));

        let mut edges = Vec::with_capacity(edge + substitute.words_covered() + 1);
        edges.extend_from_slice(&self.edges[..edge]);
        edges.extend(arena.chain(arc));

        let mut breakdown = self.breakdown.clone();
        breakdown.minus_equals(replaced.breakdown());
        breakdown.plus_equals(substitute.breakdown());

        TrellisPath {
            edges,
            prev_edge_changed: Some(edge),
            score: self.score - replaced.score() + substitute.score(),
            breakdown,
        }
    }

    /// Adds every path deviating from `self` at one arc to `contenders`.
    pub fn create_deviant_paths(
        &self,
        arena: &HypothesisArena,
        contenders: &mut TrellisPathCollection,
    ) {
        let first = self.prev_edge_changed.map_or(0, |edge| edge + 1);
        for edge in first..self.edges.len() {
            for &arc in arena[self.edges[edge]].arcs() {
                contenders.add(self.deviant(arena, edge, arc));
            }
        }
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn edges(&self) -> &[HypothesisId] {
        &self.edges
    }

    /// Index of the substituted edge, `None` for a pure path.
    pub fn prev_edge_changed(&self) -> Option<usize> {
        self.prev_edge_changed
    }

    /// Hypotheses in derivation order, skipping the initial one.
    pub fn hypotheses(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.edges.iter().rev().skip(1).copied()
    }

    pub fn target_words(&self, arena: &HypothesisArena) -> Vec<Word> {
        self.hypotheses()
            .filter_map(|id| arena[id].target_phrase())
            .flat_map(|phrase| phrase.words().iter().cloned())
            .collect()
    }
}

/// Candidate paths ordered by score, best first. Equal scores keep insertion order.
#[derive(Debug, Default)]
pub struct TrellisPathCollection {
    paths: BTreeMap<(Reverse<OrderedFloat<f32>>, u64), TrellisPath>,
    next_seq: u64,
}

impl TrellisPathCollection {
    pub fn new() -> TrellisPathCollection {
        TrellisPathCollection::default()
    }

    pub fn add(&mut self, path: TrellisPath) {
        let key = (Reverse(OrderedFloat(path.score)), self.next_seq);
        self.next_seq += 1;
        self.paths.insert(key, path);
    }

    pub fn pop_best(&mut self) -> Option<TrellisPath> {
        self.paths.pop_first().map(|(_, path)| path)
    }

    /// Drops the worst paths until at most `limit` remain.
    pub fn prune(&mut self, limit: usize) {
        while self.paths.len() > limit {
            self.paths.pop_last();
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Extracts up to `count` paths, best first, from the complete hypotheses
/// `finals`.
///
/// In distinct mode paths with an already emitted target string are skipped,
/// the candidate pool holds `count * factor` paths and at most
/// `count * factor` candidates are examined.
pub fn calc_nbest(
    arena: &HypothesisArena,
    finals: &[HypothesisId],
    count: usize,
    distinct: bool,
    factor: usize,
) -> Vec<TrellisPath> {
    let mut results = Vec::new();
    if count == 0 {
        return results;
    }
    let factor = factor.max(1);
    let pool_size = if distinct {
        count.saturating_mul(factor)
    } else {
        count
    };
    let max_iterations = count.saturating_mul(factor);

    let mut contenders = TrellisPathCollection::new();
    for &last in finals {
        contenders.add(TrellisPath::pure(arena, last));
    }
    contenders.prune(pool_size);

    let mut seen = AHashSet::new();
    let mut iterations = 0;
    while results.len() < count && iterations < max_iterations {
        let Some(path) = contenders.pop_best() else {
            break;
        };
        iterations += 1;
        path.create_deviant_paths(arena, &mut contenders);
        contenders.prune(pool_size);
        if distinct && !seen.insert(path.target_words(arena)) {
            continue;
        }
        results.push(path);
    }
    results
}
