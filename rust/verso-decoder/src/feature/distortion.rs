use std::any::Any;

use crate::{reordering::distortion_distance, sentence::Sentence};

use super::{ApplyContext, FeatureState, StatefulFeature, stable_hash};

pub const DISTORTION: &str = "Distortion";

/// Linear distortion: `-distance` for every jump between consecutive source
/// phrases, see [`distortion_distance`].
#[derive(Debug, Default)]
pub struct DistortionPenalty;

impl DistortionPenalty {
    pub fn new() -> DistortionPenalty {
        DistortionPenalty
    }
}

/// End of the last translated source phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DistortionState {
    last_end: Option<usize>,
}

impl FeatureState for DistortionState {
    fn hash_value(&self) -> u64 {
        stable_hash(&self.last_end)
    }

    fn equals(&self, other: &dyn FeatureState) -> bool {
        other
            .as_any()
            .downcast_ref::<DistortionState>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StatefulFeature for DistortionPenalty {
    fn name(&self) -> &str {
        DISTORTION
    }

    fn empty_state(&self, _sentence: &Sentence) -> Box<dyn FeatureState> {
        Box::new(DistortionState { last_end: None })
    }

    fn evaluate_when_applied(
        &self,
        ctx: &ApplyContext<'_>,
        _prev: &dyn FeatureState,
        scores: &mut [f32],
    ) -> Box<dyn FeatureState> {
        scores[0] -= distortion_distance(ctx.prev_range.as_ref(), &ctx.range) as f32;
        Box::new(DistortionState {
            last_end: Some(ctx.range.end()),
        })
    }
}
