//! Hypothesis stacks: recombination plus histogram and beam pruning.

use ahash::AHashMap;
use log::trace;

use crate::{
    hypothesis::{HypothesisArena, HypothesisId},
    stats::SentenceStats,
};

/// Result of offering a hypothesis to a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored under a new recombination key.
    Added,
    /// Merged with an equivalent entry; `survivor` is the one kept.
    Recombined { survivor: HypothesisId },
    /// Below the stack threshold and recycled.
    Discarded,
}

/// All hypotheses covering the same number of source words.
///
/// At most one hypothesis is kept per recombination key. With n-best
/// extraction enabled the losers of recombination are archived as arcs of the
/// survivor, otherwise they are recycled immediately.
#[derive(Debug)]
pub struct HypothesisStack {
    buckets: AHashMap<u64, Vec<HypothesisId>>,
    len: usize,
    stack_limit: usize,
    beam_width: f32,
    keep_arcs: bool,
    with_target_end: bool,
    best_score: f32,
    worst_score: f32,
}

impl HypothesisStack {
    /// `with_target_end` adds the target length to the recombination key.
    pub fn new(
        stack_limit: usize,
        beam_width: f32,
        keep_arcs: bool,
        with_target_end: bool,
    ) -> HypothesisStack {
        HypothesisStack {
            buckets: AHashMap::new(),
            len: 0,
            stack_limit,
            beam_width,
            keep_arcs,
            with_target_end,
            best_score: f32::NEG_INFINITY,
            worst_score: f32::NEG_INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    /// Future score a new hypothesis must reach to be admitted.
    pub fn worst_score(&self) -> f32 {
        self.worst_score
    }

    pub fn iter(&self) -> impl Iterator<Item = HypothesisId> + '_ {
        self.buckets.values().flatten().copied()
    }

    /// Adds `id` unless it falls below the threshold, recombining it with an
    /// equivalent entry if there is one.
    pub fn add_prune(
        &mut self,
        arena: &mut HypothesisArena,
        id: HypothesisId,
        stats: &mut SentenceStats,
    ) -> AddOutcome {
        let future_score = arena[id].future_score();
        if future_score == f32::NEG_INFINITY || future_score < self.worst_score {
            trace!("discarded {id:?} at {future_score} (worst {})", self.worst_score);
            stats.discarded += 1;
            arena.recycle(id);
            return AddOutcome::Discarded;
        }

        let hash = arena[id].recombination_hash(self.with_target_end);
        let bucket = self.buckets.entry(hash).or_default();
        let existing = bucket
            .iter()
            .position(|&other| arena[other].recombines_with(&arena[id], self.with_target_end));

        let Some(index) = existing else {
            bucket.push(id);
            self.len += 1;
            trace!("added {id:?} at {future_score}");
            self.update_scores(future_score);
            if self.len > self.stack_limit.saturating_mul(2) {
                self.prune_to_size(arena, self.stack_limit, stats);
            }
            return AddOutcome::Added;
        };

        stats.recombined += 1;
        let other = bucket[index];
        if future_score > arena[other].future_score() {
            trace!("{id:?} replaces {other:?}");
            bucket[index] = id;
            if self.keep_arcs {
                arena.add_arc(id, other);
            } else {
                arena.recycle(other);
            }
            self.update_scores(future_score);
            AddOutcome::Recombined { survivor: id }
        } else {
            trace!("{id:?} recombined into {other:?}");
            if self.keep_arcs {
                arena.add_arc(other, id);
            } else {
                arena.recycle(id);
            }
            AddOutcome::Recombined { survivor: other }
        }
    }

    fn update_scores(&mut self, future_score: f32) {
        if future_score > self.best_score {
            self.best_score = future_score;
            self.worst_score = self.worst_score.max(self.best_score - self.beam_width);
        }
    }

    /// Entries ordered best first, ties broken by creation order.
    pub fn sorted(&self, arena: &HypothesisArena) -> Vec<HypothesisId> {
        let mut ids = self.iter().collect::<Vec<_>>();
        ids.sort_by(|&a, &b| {
            let (a, b) = (&arena[a], &arena[b]);
            b.future_score()
                .total_cmp(&a.future_score())
                .then(a.seq().cmp(&b.seq()))
        });
        ids
    }

    /// Keeps the best `limit` entries and recycles the rest with their arcs.
    pub fn prune_to_size(
        &mut self,
        arena: &mut HypothesisArena,
        limit: usize,
        stats: &mut SentenceStats,
    ) {
        if self.len <= limit {
            return;
        }
        let sorted = self.sorted(arena);
        if let Some(&last) = limit.checked_sub(1).and_then(|i| sorted.get(i)) {
            self.worst_score = self.worst_score.max(arena[last].future_score());
        }
        for &id in &sorted[limit..] {
            self.remove(arena, id);
            arena.recycle(id);
            stats.pruned += 1;
        }
        trace!("pruned stack from {} to {}", sorted.len(), self.len);
    }

    fn remove(&mut self, arena: &HypothesisArena, id: HypothesisId) {
        let hash = arena[id].recombination_hash(self.with_target_end);
        if let Some(bucket) = self.buckets.get_mut(&hash) {
            if let Some(index) = bucket.iter().position(|&other| other == id) {
                bucket.swap_remove(index);
                self.len -= 1;
                if bucket.is_empty() {
                    self.buckets.remove(&hash);
                }
            }
        }
    }

    /// Applies the size limit and returns the survivors best first.
    pub fn sorted_and_pruned(
        &mut self,
        arena: &mut HypothesisArena,
        stats: &mut SentenceStats,
    ) -> Vec<HypothesisId> {
        self.prune_to_size(arena, self.stack_limit, stats);
        self.sorted(arena)
    }

    /// Trims every survivor's arcs to the best `keep` and stamps their winner.
    pub fn cleanup_arc_lists(&self, arena: &mut HypothesisArena, keep: usize) {
        if !self.keep_arcs {
            return;
        }
        for id in self.iter() {
            arena.cleanup_arcs(id, keep);
        }
    }

    pub fn best(&self, arena: &HypothesisArena) -> Option<HypothesisId> {
        self.iter().max_by(|&a, &b| {
            let (a, b) = (&arena[a], &arena[b]);
            a.future_score()
                .total_cmp(&b.future_score())
                .then(b.seq().cmp(&a.seq()))
        })
    }
}
