use crate::ml::encoding::{DRAW_OPTIONS, PLAY_ACTIONS, STATE_FEATURES};

/// Interface for decision-making agents.
///
/// Agents are pure functions of the feature vector and legality mask; they
/// never touch the engine and hold no state of the match. The returned
/// index must point into the corresponding action space and be marked legal
/// in the mask; the orchestration layer decodes it and applies it through
/// the engine, which re-validates.
pub trait Agent {
    fn pick_play(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; PLAY_ACTIONS],
    ) -> usize;

    fn pick_draw(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; DRAW_OPTIONS],
    ) -> usize;
}
