//! Partial translations and the per-sentence arena that owns them.
//!
//! A [`Hypothesis`] extends its parent by one translation option. Parents are
//! referenced by [`HypothesisId`] handles into a [`HypothesisArena`], so the
//! derivations of a sentence form an acyclic lattice with no reference
//! counting: every child covers strictly more source words than its parent.

use std::{
    ops::{Index, IndexMut, Range},
    sync::Arc,
};

use verso_common::{Result, verify_contract};
use verso_coverage::{CoverageBitmap, SourceRange};

use crate::{
    coverage_pool::CoverageId,
    feature::{ApplyContext, FeatureSet, FeatureState, stable_hash},
    options::{TargetPhrase, TranslationOption},
    scores::ScoreBreakdown,
    sentence::Sentence,
};

/// Stable handle of a hypothesis within its sentence's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HypothesisId(u32);

impl HypothesisId {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> HypothesisId {
        HypothesisId(raw)
    }
}

#[derive(Debug)]
pub struct Hypothesis {
    seq: u64,
    parent: Option<HypothesisId>,
    coverage: CoverageId,
    words_covered: usize,
    source_range: Option<SourceRange>,
    option: Option<Arc<TranslationOption>>,
    target_start: usize,
    target_end: usize,
    breakdown: ScoreBreakdown,
    score: f32,
    estimated: f32,
    future_score: f32,
    states: Vec<Box<dyn FeatureState>>,
    arcs: Vec<HypothesisId>,
    winner: Option<HypothesisId>,
    evaluated: bool,
}

impl Hypothesis {
    /// The empty hypothesis every derivation starts from.
    pub fn initial(
        sentence: &Sentence,
        features: &FeatureSet,
        coverage: CoverageId,
        estimated: f32,
    ) -> Hypothesis {
        Hypothesis {
            seq: 0,
            parent: None,
            coverage,
            words_covered: 0,
            source_range: None,
            option: None,
            target_start: 0,
            target_end: 0,
            breakdown: ScoreBreakdown::zeros(features.num_scores()),
            score: 0.0,
            estimated,
            future_score: estimated,
            states: features.initial_states(sentence),
            arcs: Vec::new(),
            winner: None,
            evaluated: true,
        }
    }

    /// Builds the successor of `parent` that applies `option`.
    ///
    /// `parent_bitmap` is the parent's coverage and `coverage` the interned
    /// coverage after applying the option. The result is pending until
    /// [`evaluate_when_applied`](Self::evaluate_when_applied) runs.
    pub fn extend(
        parent_id: HypothesisId,
        parent: &Hypothesis,
        parent_bitmap: &CoverageBitmap,
        option: Arc<TranslationOption>,
        coverage: CoverageId,
        estimated: f32,
    ) -> Result<Hypothesis> {
        let range = option.range();
        verify_contract!(
            !parent_bitmap.overlaps(&range),
            "option {range} overlaps coverage {parent_bitmap}"
        );
        let mut breakdown = parent.breakdown.clone();
        breakdown.plus_equals(option.scores());
        let target_start = parent.target_end;
        let target_end = target_start + option.target().len();
        Ok(Hypothesis {
            seq: 0,
            parent: Some(parent_id),
            coverage,
            words_covered: parent.words_covered + range.len(),
            source_range: Some(range),
            option: Some(option),
            target_start,
            target_end,
            breakdown,
            score: f32::NEG_INFINITY,
            estimated,
            future_score: f32::NEG_INFINITY,
            states: Vec::new(),
            arcs: Vec::new(),
            winner: None,
            evaluated: false,
        })
    }

    /// Runs the context-dependent features and computes the final scores.
    ///
    /// `bitmap` is this hypothesis' own coverage.
    pub fn evaluate_when_applied(
        &mut self,
        parent: &Hypothesis,
        sentence: &Sentence,
        bitmap: &CoverageBitmap,
        features: &FeatureSet,
    ) {
        debug_assert!(!self.evaluated);
        let Some(option) = self.option.clone() else {
            return;
        };
        let ctx = ApplyContext {
            sentence,
            prev_range: parent.source_range,
            range: option.range(),
            coverage: bitmap,
            phrase: option.target(),
        };
        self.states = features.evaluate_when_applied(&ctx, &parent.states, &mut self.breakdown);
        self.score = features.score(&self.breakdown);
        self.future_score = self.score + self.estimated;
        self.evaluated = true;
    }

    /// Creation order within the sentence; later hypotheses have larger values.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn parent(&self) -> Option<HypothesisId> {
        self.parent
    }

    pub fn coverage(&self) -> CoverageId {
        self.coverage
    }

    pub fn words_covered(&self) -> usize {
        self.words_covered
    }

    /// Source span of the last applied phrase; `None` for the initial hypothesis.
    pub fn source_range(&self) -> Option<SourceRange> {
        self.source_range
    }

    pub fn option(&self) -> Option<&Arc<TranslationOption>> {
        self.option.as_ref()
    }

    pub fn target_phrase(&self) -> Option<&TargetPhrase> {
        self.option.as_deref().map(TranslationOption::target)
    }

    /// Target positions produced by the last phrase, half-open. Each child's
    /// range starts where its parent's ends.
    pub fn target_range(&self) -> Range<usize> {
        self.target_start..self.target_end
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        debug_assert!(self.evaluated, "scores of a pending hypothesis");
        &self.breakdown
    }

    /// Model score of the derivation so far.
    pub fn score(&self) -> f32 {
        debug_assert!(self.evaluated, "scores of a pending hypothesis");
        self.score
    }

    /// Model score plus the estimate for the uncovered words.
    pub fn future_score(&self) -> f32 {
        debug_assert!(self.evaluated, "scores of a pending hypothesis");
        self.future_score
    }

    pub fn estimated_score(&self) -> f32 {
        self.estimated
    }

    pub fn states(&self) -> &[Box<dyn FeatureState>] {
        &self.states
    }

    /// Recombined hypotheses this one won against, kept for n-best extraction.
    pub fn arcs(&self) -> &[HypothesisId] {
        &self.arcs
    }

    /// For an arc, the hypothesis that replaced it.
    pub fn winner(&self) -> Option<HypothesisId> {
        self.winner
    }

    /// Hash over everything that decides future scoring: the coverage, every
    /// feature state and, when requested, the end of the target range.
    pub fn recombination_hash(&self, with_target_end: bool) -> u64 {
        let mut hash = stable_hash(&(self.coverage, with_target_end.then_some(self.target_end)));
        for state in &self.states {
            hash = stable_hash(&(hash, state.hash_value()));
        }
        hash
    }

    pub fn recombines_with(&self, other: &Hypothesis, with_target_end: bool) -> bool {
        self.coverage == other.coverage
            && (!with_target_end || self.target_end == other.target_end)
            && self.states.len() == other.states.len()
            && self
                .states
                .iter()
                .zip(&other.states)
                .all(|(a, b)| a.equals(b.as_ref()))
    }
}

/// Owns every hypothesis of a sentence. Recycled slots are reused.
#[derive(Debug, Default)]
pub struct HypothesisArena {
    slots: Vec<Option<Hypothesis>>,
    free: Vec<u32>,
    next_seq: u64,
    live: usize,
}

impl HypothesisArena {
    pub fn new() -> HypothesisArena {
        HypothesisArena::default()
    }

    pub fn insert(&mut self, mut hypothesis: Hypothesis) -> HypothesisId {
        hypothesis.seq = self.next_seq;
        self.next_seq += 1;
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(hypothesis);
                HypothesisId(slot)
            }
            None => {
                self.slots.push(Some(hypothesis));
                HypothesisId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, id: HypothesisId) -> Option<&Hypothesis> {
        self.slots.get(id.as_usize()).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: HypothesisId) -> bool {
        self.get(id).is_some()
    }

    /// Releases `id` and every arc it holds. The caller guarantees that no
    /// other hypothesis refers to them.
    pub fn recycle(&mut self, id: HypothesisId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(hypothesis) = self.slots.get_mut(id.as_usize()).and_then(Option::take) {
                pending.extend(hypothesis.arcs);
                self.free.push(id.0);
                self.live -= 1;
            }
        }
    }

    /// Archives `loser` as an arc of `winner`, moving the loser's own arcs along.
    pub fn add_arc(&mut self, winner: HypothesisId, loser: HypothesisId) {
        let mut moved = std::mem::take(&mut self[loser].arcs);
        moved.push(loser);
        self[winner].arcs.append(&mut moved);
    }

    /// Keeps the best `keep` arcs of `id`, recycles the rest and stamps the
    /// kept ones with their winner.
    pub fn cleanup_arcs(&mut self, id: HypothesisId, keep: usize) {
        let mut arcs = std::mem::take(&mut self[id].arcs);
        arcs.sort_by(|&a, &b| {
            let (a, b) = (&self[a], &self[b]);
            b.future_score
                .total_cmp(&a.future_score)
                .then(a.seq.cmp(&b.seq))
        });
        for dropped in arcs.drain(keep.min(arcs.len())..) {
            self.recycle(dropped);
        }
        for &arc in &arcs {
            self[arc].winner = Some(id);
        }
        self[id].arcs = arcs;
    }

    /// `id` followed by its ancestors, ending with the initial hypothesis.
    pub fn chain(&self, id: HypothesisId) -> impl Iterator<Item = HypothesisId> + '_ {
        std::iter::successors(Some(id), |&id| self[id].parent)
    }

    /// Number of hypotheses currently alive.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HypothesisId, &Hypothesis)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|h| (HypothesisId(i as u32), h)))
    }
}

impl Index<HypothesisId> for HypothesisArena {
    type Output = Hypothesis;

    fn index(&self, id: HypothesisId) -> &Hypothesis {
        match self.get(id) {
            Some(hypothesis) => hypothesis,
            None => panic!("hypothesis {id:?} was recycled"),
        }
    }
}

impl IndexMut<HypothesisId> for HypothesisArena {
    fn index_mut(&mut self, id: HypothesisId) -> &mut Hypothesis {
        match self.slots.get_mut(id.as_usize()).and_then(Option::as_mut) {
            Some(hypothesis) => hypothesis,
            None => panic!("hypothesis {id:?} was recycled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{SearchConfig, WeightsConfig},
        coverage_pool::CoveragePool,
        estimated_scores::EstimatedScores,
        feature::{DistortionPenalty, TRANSLATION_MODEL},
        options::TranslationOptionCollection,
        phrase_table::PhraseTable,
    };

    struct Fixture {
        sentence: Sentence,
        features: FeatureSet,
        options: TranslationOptionCollection,
    }

    fn fixture() -> Fixture {
        let sentence = Sentence::from_text("a b c");
        let mut table = PhraseTable::new(1);
        table.insert("a", "x", vec![-1.0]).unwrap();
        table.insert("b", "y y", vec![-2.0]).unwrap();
        table.insert("c", "z", vec![-0.5]).unwrap();
        let features = FeatureSet::builder(1)
            .stateful(DistortionPenalty::new())
            .build(
                &WeightsConfig::new()
                    .with(TRANSLATION_MODEL, vec![1.0])
                    .with("Distortion", vec![1.0]),
            )
            .unwrap();
        let options = TranslationOptionCollection::build(
            &sentence,
            &table,
            &features,
            &SearchConfig::default(),
        )
        .unwrap();
        Fixture {
            sentence,
            features,
            options,
        }
    }

    fn expand(
        f: &Fixture,
        arena: &mut HypothesisArena,
        pool: &mut CoveragePool,
        parent: HypothesisId,
        pos: usize,
    ) -> Result<HypothesisId> {
        let option = f.options.get(SourceRange::single(pos))[0].clone();
        let estimated: &EstimatedScores = f.options.estimated_scores();
        let parent_coverage = arena[parent].coverage();
        let coverage = pool.extend(parent_coverage, option.range(), estimated)?;
        let mut hypothesis = Hypothesis::extend(
            parent,
            &arena[parent],
            pool.get(parent_coverage),
            option,
            coverage,
            pool.estimated_score(coverage),
        )?;
        hypothesis.evaluate_when_applied(
            &arena[parent],
            &f.sentence,
            pool.get(coverage),
            &f.features,
        );
        Ok(arena.insert(hypothesis))
    }

    #[test]
    fn test_scores_and_target_chaining() {
        let f = fixture();
        let mut pool = CoveragePool::new(3, f.options.estimated_scores());
        let mut arena = HypothesisArena::new();
        let root = arena.insert(Hypothesis::initial(
            &f.sentence,
            &f.features,
            pool.empty(),
            pool.estimated_score(pool.empty()),
        ));
        assert_eq!(arena[root].future_score(), -3.5);

        let b = expand(&f, &mut arena, &mut pool, root, 1).unwrap();
        assert_eq!(arena[b].target_range(), 0..2);
        // -2 for the phrase, -1 for jumping over "a"
        assert_eq!(arena[b].score(), -3.0);
        assert_eq!(arena[b].future_score(), -4.5);

        let a = expand(&f, &mut arena, &mut pool, b, 0).unwrap();
        assert_eq!(arena[a].target_range(), 2..3);
        // jump back from the end of "b" costs 2
        assert_eq!(arena[a].score(), -6.0);
        assert_eq!(arena[a].breakdown().values(), &[0.0, -3.0, -3.0]);
        assert_eq!(arena.chain(a).collect::<Vec<_>>(), [a, b, root]);

        let err = expand(&f, &mut arena, &mut pool, a, 1).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_recombination_equality() {
        let f = fixture();
        let mut pool = CoveragePool::new(3, f.options.estimated_scores());
        let mut arena = HypothesisArena::new();
        let root = arena.insert(Hypothesis::initial(&f.sentence, &f.features, pool.empty(), 0.0));
        let a = expand(&f, &mut arena, &mut pool, root, 0).unwrap();
        let ab = expand(&f, &mut arena, &mut pool, a, 1).unwrap();
        let b = expand(&f, &mut arena, &mut pool, root, 1).unwrap();
        let ba = expand(&f, &mut arena, &mut pool, b, 0).unwrap();
        let c = expand(&f, &mut arena, &mut pool, root, 2).unwrap();
        let cb = expand(&f, &mut arena, &mut pool, c, 1).unwrap();

        // same coverage but the distortion states differ (last end 1 vs 0)
        assert!(!arena[ab].recombines_with(&arena[ba], false));
        let ca = expand(&f, &mut arena, &mut pool, c, 0).unwrap();
        let cab = expand(&f, &mut arena, &mut pool, ca, 1).unwrap();
        let acb = expand(&f, &mut arena, &mut pool, ab, 2).unwrap();
        let cba = expand(&f, &mut arena, &mut pool, cb, 0).unwrap();
        assert!(!arena[cab].recombines_with(&arena[acb], false));
        assert!(!arena[cab].recombines_with(&arena[cba], false));

        let bac = expand(&f, &mut arena, &mut pool, ba, 2).unwrap();
        assert!(arena[acb].recombines_with(&arena[bac], false));
        assert_eq!(
            arena[acb].recombination_hash(false),
            arena[bac].recombination_hash(false)
        );
        // both produce 4 target words, so the target end agrees too
        assert!(arena[acb].recombines_with(&arena[bac], true));
    }

    #[test]
    fn test_arena_recycles_slots_and_arcs() {
        let f = fixture();
        let mut pool = CoveragePool::new(3, f.options.estimated_scores());
        let mut arena = HypothesisArena::new();
        let root = arena.insert(Hypothesis::initial(&f.sentence, &f.features, pool.empty(), 0.0));
        let a = expand(&f, &mut arena, &mut pool, root, 0).unwrap();
        let b = expand(&f, &mut arena, &mut pool, root, 1).unwrap();
        let c = expand(&f, &mut arena, &mut pool, root, 2).unwrap();

        arena.add_arc(a, b);
        arena.add_arc(c, a);
        assert_eq!(arena[c].arcs(), &[b, a]);
        assert!(arena[a].arcs().is_empty());

        arena.cleanup_arcs(c, 1);
        // "a" scores -1, "b" -3 including the jump
        assert_eq!(arena[c].arcs(), &[a]);
        assert_eq!(arena[a].winner(), Some(c));
        assert!(!arena.contains(b));
        assert_eq!(arena.live(), 3);

        arena.recycle(c);
        assert_eq!(arena.live(), 1);
        let again = expand(&f, &mut arena, &mut pool, root, 0).unwrap();
        assert!(again == a || again == c);
        assert!(arena[again].seq() > arena[root].seq());
        assert_eq!(arena.capacity(), 4);
    }
}
