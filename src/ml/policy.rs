use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;

use super::encoding::{DRAW_OPTIONS, PLAY_ACTIONS, STATE_FEATURES};

pub const DEFAULT_HIDDEN: usize = 256;
pub const DEFAULT_STACK: usize = 3;

/// Relu MLP over the 301-wide feature vector. The output width is chosen at
/// construction so the same module serves both decision heads: 120 logits
/// for the play choice, 6 for the draw choice.
#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    stack: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B> PolicyNetwork<B>
where
    B: Backend,
    B::Device: Default,
{
    pub fn new(hidden: usize, stack_depth: usize, outputs: usize) -> Self {
        assert!(stack_depth > 0, "stack depth must be positive");
        assert!(outputs > 0, "output width must be positive");
        let device = B::Device::default();
        let mut stack = Vec::with_capacity(stack_depth);
        let mut input_size = STATE_FEATURES;
        for _ in 0..stack_depth {
            stack.push(LinearConfig::new(input_size, hidden).init(&device));
            input_size = hidden;
        }
        let output = LinearConfig::new(input_size, outputs).init(&device);
        Self { stack, output }
    }

    /// Default-sized network for the 120-way play head.
    pub fn play_head() -> Self {
        Self::new(DEFAULT_HIDDEN, DEFAULT_STACK, PLAY_ACTIONS)
    }

    /// Default-sized network for the 6-way draw head.
    pub fn draw_head() -> Self {
        Self::new(DEFAULT_HIDDEN, DEFAULT_STACK, DRAW_OPTIONS)
    }

    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut activations = input;
        for layer in &self.stack {
            activations = relu(layer.forward(activations));
        }
        self.output.forward(activations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;
    use crate::ml::encoding::StateEncoder;
    use burn_ndarray::NdArray;

    #[test]
    fn heads_produce_expected_shapes() {
        let game = GameState::builder().build().expect("game");
        let view = game.state_view();
        let batch = StateEncoder::encode_tensor::<NdArray<f32>>(&view);

        let play = PolicyNetwork::<NdArray<f32>>::play_head();
        let logits = play.forward(batch.clone());
        assert_eq!(logits.shape().dims, [1, PLAY_ACTIONS]);

        let draw = PolicyNetwork::<NdArray<f32>>::draw_head();
        let logits = draw.forward(batch);
        assert_eq!(logits.shape().dims, [1, DRAW_OPTIONS]);
    }
}
