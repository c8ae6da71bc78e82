//! Interned coverage bitmaps.
//!
//! Hypotheses refer to their coverage by [`CoverageId`]. Equal bitmaps always
//! receive the same id, so ids can be compared and hashed in place of the
//! bitmaps themselves.

use ahash::AHashMap;
use verso_common::Result;
use verso_coverage::{CoverageBitmap, SourceRange};

use crate::estimated_scores::EstimatedScores;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoverageId(u32);

impl CoverageId {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Per-sentence store of distinct coverage bitmaps and their future-cost estimates.
#[derive(Debug)]
pub struct CoveragePool {
    bitmaps: Vec<CoverageBitmap>,
    estimates: Vec<f32>,
    ids: AHashMap<CoverageBitmap, CoverageId>,
    transitions: AHashMap<(CoverageId, SourceRange), CoverageId>,
}

impl CoveragePool {
    /// Creates the pool holding the empty coverage of a sentence of `len` words.
    pub fn new(len: usize, estimated: &EstimatedScores) -> CoveragePool {
        let mut pool = CoveragePool {
            bitmaps: Vec::new(),
            estimates: Vec::new(),
            ids: AHashMap::new(),
            transitions: AHashMap::new(),
        };
        pool.intern(CoverageBitmap::new(len), estimated);
        pool
    }

    pub fn empty(&self) -> CoverageId {
        CoverageId(0)
    }

    pub fn get(&self, id: CoverageId) -> &CoverageBitmap {
        &self.bitmaps[id.as_usize()]
    }

    /// Future-cost estimate of the uncovered part of `id`.
    pub fn estimated_score(&self, id: CoverageId) -> f32 {
        self.estimates[id.as_usize()]
    }

    /// Coverage of `id` with `range` marked. Fails if `range` overlaps `id`.
    pub fn extend(
        &mut self,
        id: CoverageId,
        range: SourceRange,
        estimated: &EstimatedScores,
    ) -> Result<CoverageId> {
        if let Some(&next) = self.transitions.get(&(id, range)) {
            return Ok(next);
        }
        let bitmap = self.get(id).with_range(&range)?;
        let next = self.intern(bitmap, estimated);
        self.transitions.insert((id, range), next);
        Ok(next)
    }

    fn intern(&mut self, bitmap: CoverageBitmap, estimated: &EstimatedScores) -> CoverageId {
        if let Some(&id) = self.ids.get(&bitmap) {
            return id;
        }
        let id = CoverageId(self.bitmaps.len() as u32);
        self.estimates.push(estimated.calc_estimated_score(&bitmap));
        self.ids.insert(bitmap.clone(), id);
        self.bitmaps.push(bitmap);
        id
    }

    /// Number of distinct coverages seen.
    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }
}
