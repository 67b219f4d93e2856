use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::agent::Agent;
use crate::ml::encoding::{DRAW_OPTIONS, PLAY_ACTIONS, STATE_FEATURES};
use crate::ml::policy::PolicyNetwork;

/// Agent backed by a trained play/draw network pair. Each decision is a
/// masked argmax over the head's logits; illegal entries never win because
/// only mask-legal indices compete.
pub struct PolicyAgent<B: Backend> {
    play: PolicyNetwork<B>,
    draw: PolicyNetwork<B>,
}

impl<B> PolicyAgent<B>
where
    B: Backend,
    B::Device: Default,
{
    pub fn new(play: PolicyNetwork<B>, draw: PolicyNetwork<B>) -> Self {
        Self { play, draw }
    }

    pub fn play_network(&self) -> &PolicyNetwork<B> {
        &self.play
    }

    pub fn draw_network(&self) -> &PolicyNetwork<B> {
        &self.draw
    }

    fn logits(network: &PolicyNetwork<B>, features: &[f32; STATE_FEATURES]) -> Vec<f32> {
        let input = Tensor::<B, 2>::from_data(
            TensorData::new(features.to_vec(), [1, STATE_FEATURES]),
            &B::Device::default(),
        );
        network
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .expect("logits convert to a flat f32 vector")
    }

    fn masked_argmax(logits: &[f32], mask: &[f32]) -> usize {
        let mut best: Option<(f32, usize)> = None;
        for (index, (&logit, &bit)) in logits.iter().zip(mask.iter()).enumerate() {
            if bit != 1.0 {
                continue;
            }
            if best.map_or(true, |(best_logit, _)| logit > best_logit) {
                best = Some((logit, index));
            }
        }
        best.map(|(_, index)| index)
            .expect("the legality mask must admit at least one action")
    }
}

impl<B> Agent for PolicyAgent<B>
where
    B: Backend,
    B::Device: Default,
{
    fn pick_play(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; PLAY_ACTIONS],
    ) -> usize {
        let logits = Self::logits(&self.play, features);
        Self::masked_argmax(&logits, mask)
    }

    fn pick_draw(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; DRAW_OPTIONS],
    ) -> usize {
        let logits = Self::logits(&self.draw, features);
        Self::masked_argmax(&logits, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    use crate::game::GameState;
    use crate::ml::encoding::{PlaySpace, play_features};

    type TestBackend = NdArray<f32>;

    #[test]
    fn untrained_agent_still_picks_legally() {
        let mut agent = PolicyAgent::<TestBackend>::new(
            PolicyNetwork::play_head(),
            PolicyNetwork::draw_head(),
        );
        let game = GameState::builder().with_seed(2).build().expect("game");
        let view = game.state_view();
        let legal = game.legal_plays();
        let (features, mask) = play_features(&view, &legal);
        let choice = agent.pick_play(&features, &mask);
        assert_eq!(mask[choice], 1.0);
        let action = PlaySpace::index_to_action(choice).expect("decoded");
        assert!(legal.contains(&action));
    }
}
