use rand::Rng;

use crate::agent::Agent;
use crate::card::HAND_SIZE;
use crate::ml::encoding::{DRAW_OPTIONS, PLAY_ACTIONS, STATE_FEATURES};

/// Baseline agent: noise over the legality mask, with playing normalised
/// against discarding. Discarding is legal for every hand card, so a plain
/// uniform pick would discard almost always; the normalisation boosts play
/// entries in proportion to how few of them are available.
pub struct RandomAgent<R: Rng> {
    rng: R,
    play_vs_discard_weighting: f32,
}

impl<R: Rng> RandomAgent<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, play_vs_discard_weighting: 1.0 }
    }

    pub fn with_weighting(mut self, weighting: f32) -> Self {
        assert!(weighting > 0.0, "weighting must be positive");
        self.play_vs_discard_weighting = weighting;
        self
    }

    fn argmax(values: &[f32]) -> usize {
        let mut best = 0;
        for (index, value) in values.iter().enumerate() {
            if *value > values[best] {
                best = index;
            }
        }
        best
    }
}

impl<R: Rng> Agent for RandomAgent<R> {
    fn pick_play(
        &mut self,
        _features: &[f32; STATE_FEATURES],
        mask: &[f32; PLAY_ACTIONS],
    ) -> usize {
        let mut noise = [0.0f32; PLAY_ACTIONS];
        for entry in noise.iter_mut() {
            *entry = self.rng.gen_range(0.0..1.0);
        }
        let num_playable = mask
            .iter()
            .step_by(2)
            .filter(|&&bit| bit == 1.0)
            .count();
        if num_playable > 0 {
            let scale = num_playable as f32 / HAND_SIZE as f32;
            for entry in noise.iter_mut().step_by(2) {
                *entry = 1.0 - scale * *entry / self.play_vs_discard_weighting;
            }
        }
        let scored: Vec<f32> = noise
            .iter()
            .zip(mask.iter())
            .map(|(n, m)| n * m)
            .collect();
        Self::argmax(&scored)
    }

    fn pick_draw(
        &mut self,
        _features: &[f32; STATE_FEATURES],
        mask: &[f32; DRAW_OPTIONS],
    ) -> usize {
        let scored: Vec<f32> = mask
            .iter()
            .map(|m| self.rng.gen_range(0.0..1.0f32) * m)
            .collect();
        Self::argmax(&scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::game::GameState;
    use crate::ml::encoding::{draw_features, play_features};

    #[test]
    fn picks_stay_inside_the_mask() {
        let mut agent = RandomAgent::new(StdRng::seed_from_u64(9));
        let mut game = GameState::builder().with_seed(9).build().expect("game");
        for _ in 0..20 {
            let view = game.state_view();
            let legal = game.legal_plays();
            let (features, mask) = play_features(&view, &legal);
            let choice = agent.pick_play(&features, &mask);
            assert_eq!(mask[choice], 1.0);
            let action = crate::ml::PlaySpace::index_to_action(choice).expect("decoded");
            game.play_or_discard(action.card, action.is_discard).expect("legal play");

            let view = game.state_view();
            let legal = game.legal_draws();
            let (features, mask) = draw_features(&view, &legal);
            let choice = agent.pick_draw(&features, &mask);
            assert_eq!(mask[choice], 1.0);
            let draw = crate::ml::DrawSpace::index_to_choice(choice).expect("decoded");
            game.draw_replacement(draw).expect("legal draw");
            game.end_sub_turn().expect("swap");
        }
    }
}
