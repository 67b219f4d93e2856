use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, LearningRate, Optimizer};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;
use rand::seq::SliceRandom;

use super::encoding::{DRAW_OPTIONS, PLAY_ACTIONS, STATE_FEATURES};
use super::policy::PolicyNetwork;

const MIN_SAMPLE_WEIGHT: f32 = 1.0e-8;
/// Additive logit suppression applied where the 0/1 mask reads 0.
const MASK_SUPPRESSION: f32 = 1.0e9;

/// One supervised step: the encoded state, the 0/1 legality mask, a target
/// distribution over the action space and an outcome-derived weight. The
/// const parameter is the action-space width, so the same machinery trains
/// the 120-way play head and the 6-way draw head.
#[derive(Clone, Debug)]
pub struct PolicySample<const A: usize> {
    pub state: [f32; STATE_FEATURES],
    pub mask: [f32; A],
    pub target: [f32; A],
    pub weight: f32,
}

pub type PlaySample = PolicySample<PLAY_ACTIONS>;
pub type DrawSample = PolicySample<DRAW_OPTIONS>;

impl<const A: usize> PolicySample<A> {
    pub fn new(
        state: [f32; STATE_FEATURES],
        mask: [f32; A],
        target: [f32; A],
        weight: f32,
    ) -> Self {
        let weight = if weight.is_finite() {
            weight.max(MIN_SAMPLE_WEIGHT)
        } else {
            MIN_SAMPLE_WEIGHT
        };
        Self { state, mask, target, weight }
    }

    /// Sample whose target puts all probability mass on one chosen index.
    pub fn from_choice(
        state: [f32; STATE_FEATURES],
        mask: [f32; A],
        chosen: usize,
        weight: f32,
    ) -> Self {
        let mut target = [0.0; A];
        if chosen < A {
            target[chosen] = 1.0;
        }
        Self::new(state, mask, target, weight)
    }
}

#[derive(Clone, Debug)]
pub struct PolicyDataset<const A: usize> {
    samples: Vec<PolicySample<A>>,
}

impl<const A: usize> Default for PolicyDataset<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const A: usize> PolicyDataset<A> {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[PolicySample<A>] {
        &self.samples
    }

    pub fn push(&mut self, sample: PolicySample<A>) {
        if sample.weight.is_finite() && sample.weight > 0.0 {
            self.samples.push(sample);
        }
    }

    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = PolicySample<A>>,
    {
        for sample in iter {
            self.push(sample);
        }
    }

    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.samples.shuffle(rng);
    }

    pub fn batches(&self, batch_size: usize) -> std::slice::Chunks<'_, PolicySample<A>> {
        self.samples.chunks(batch_size.max(1))
    }

    /// Splits off a validation fraction after shuffling. Degenerates to an
    /// empty validation set for tiny datasets or a non-positive fraction.
    pub fn split<R: Rng>(mut self, validation_fraction: f32, rng: &mut R) -> (Self, Self) {
        if self.samples.len() < 2 || validation_fraction <= 0.0 {
            return (self, Self::new());
        }
        let fraction = validation_fraction.clamp(0.0, 0.9);
        self.samples.shuffle(rng);
        let total = self.samples.len();
        let validation_size = (((total as f32) * fraction).round() as usize).clamp(1, total - 1);
        let validation = self.samples.split_off(total - validation_size);
        (Self { samples: self.samples }, Self { samples: validation })
    }
}

impl<const A: usize> From<Vec<PolicySample<A>>> for PolicyDataset<A> {
    fn from(samples: Vec<PolicySample<A>>) -> Self {
        let mut dataset = Self::new();
        dataset.extend(samples);
        dataset
    }
}

#[derive(Debug)]
pub struct PolicyBatch<B: AutodiffBackend, const A: usize> {
    pub states: Tensor<B, 2>,
    pub masks: Tensor<B, 2>,
    pub targets: Tensor<B, 2>,
    pub weights: Tensor<B, 2>,
}

impl<B: AutodiffBackend, const A: usize> PolicyBatch<B, A> {
    pub fn from_samples(samples: &[PolicySample<A>]) -> Self {
        assert!(
            !samples.is_empty(),
            "cannot construct a policy batch from an empty sample slice"
        );
        let batch_size = samples.len();
        let mut states = Vec::with_capacity(batch_size * STATE_FEATURES);
        let mut masks = Vec::with_capacity(batch_size * A);
        let mut targets = Vec::with_capacity(batch_size * A);
        let mut weights = Vec::with_capacity(batch_size);
        for sample in samples {
            states.extend_from_slice(&sample.state);
            masks.extend_from_slice(&sample.mask);
            targets.extend_from_slice(&sample.target);
            weights.push(sample.weight);
        }
        let device = B::Device::default();
        Self {
            states: Tensor::from_data(
                TensorData::new(states, [batch_size, STATE_FEATURES]),
                &device,
            ),
            masks: Tensor::from_data(TensorData::new(masks, [batch_size, A]), &device),
            targets: Tensor::from_data(TensorData::new(targets, [batch_size, A]), &device),
            weights: Tensor::from_data(TensorData::new(weights, [batch_size, 1]), &device),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.states.shape().dims[0]
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights
            .clone()
            .detach()
            .into_data()
            .to_vec::<f32>()
            .map(|values| values.into_iter().sum())
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrainingLoopConfig {
    pub epochs: usize,
    pub batch_size: usize,
}

#[derive(Clone, Debug)]
pub struct TrainingEpochMetrics {
    pub epoch: usize,
    pub train_loss: f32,
    pub validation_loss: Option<f32>,
    pub batches: usize,
    pub samples: usize,
}

/// Adam-driven trainer for one policy head. The loss is weighted
/// cross-entropy over log-softmaxed logits with illegal actions suppressed
/// through the mask before normalization.
pub struct PolicyTrainer<B: AutodiffBackend, const A: usize> {
    model: PolicyNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, PolicyNetwork<B>, B>,
    learning_rate: LearningRate,
    step: usize,
}

impl<B, const A: usize> PolicyTrainer<B, A>
where
    B: AutodiffBackend,
    B::Device: Default,
{
    pub fn new(
        model: PolicyNetwork<B>,
        optimizer: OptimizerAdaptor<Adam, PolicyNetwork<B>, B>,
        learning_rate: LearningRate,
    ) -> Self {
        Self { model, optimizer, learning_rate, step: 0 }
    }

    pub fn with_config(
        model: PolicyNetwork<B>,
        config: AdamConfig,
        learning_rate: LearningRate,
    ) -> Self {
        let optimizer = config.init();
        Self::new(model, optimizer, learning_rate)
    }

    pub fn model(&self) -> &PolicyNetwork<B> {
        &self.model
    }

    pub fn step_count(&self) -> usize {
        self.step
    }

    pub fn train_step(&mut self, batch: PolicyBatch<B, A>) -> f32 {
        let (loss_sum, weight_sum) = Self::loss_components(&self.model, &batch);
        let loss = loss_sum / weight_sum;
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        let model = self.model.clone();
        self.model = self.optimizer.step(self.learning_rate, model, grads);
        self.step += 1;
        Self::tensor_to_f32(loss)
    }

    pub fn evaluate(&self, dataset: &PolicyDataset<A>, batch_size: usize) -> f32 {
        if dataset.is_empty() {
            return 0.0;
        }
        let mut total_loss = 0.0;
        let mut total_weight = 0.0;
        for chunk in dataset.batches(batch_size) {
            let batch = PolicyBatch::<B, A>::from_samples(chunk);
            let (loss_sum, weight_sum) = Self::loss_components(&self.model, &batch);
            total_loss += Self::tensor_to_f32(loss_sum);
            total_weight += Self::tensor_to_f32(weight_sum);
        }
        if total_weight > 0.0 {
            total_loss / total_weight
        } else {
            0.0
        }
    }

    pub fn fit<R: Rng>(
        &mut self,
        train: &mut PolicyDataset<A>,
        validation: Option<&PolicyDataset<A>>,
        config: TrainingLoopConfig,
        rng: &mut R,
    ) -> Vec<TrainingEpochMetrics> {
        self.fit_streaming(train, validation, config, rng, |_| true, None)
    }

    /// Epoch loop with a continuation callback (return `false` to stop
    /// early) and an optional hook invoked whenever the validation loss
    /// improves, used by the trainer binary for best-checkpointing.
    pub fn fit_streaming<R, F>(
        &mut self,
        train: &mut PolicyDataset<A>,
        validation: Option<&PolicyDataset<A>>,
        config: TrainingLoopConfig,
        rng: &mut R,
        mut on_epoch: F,
        mut on_best: Option<&mut dyn FnMut(&PolicyNetwork<B>, &TrainingEpochMetrics)>,
    ) -> Vec<TrainingEpochMetrics>
    where
        R: Rng,
        F: FnMut(&TrainingEpochMetrics) -> bool,
    {
        assert!(config.batch_size > 0, "batch size must be positive");
        let mut history = Vec::with_capacity(config.epochs);
        let mut best_validation: Option<f32> = None;
        for epoch in 0..config.epochs {
            train.shuffle(rng);
            let mut weighted_loss = 0.0;
            let mut weight_sum = 0.0;
            let mut batches = 0usize;
            let mut samples = 0usize;
            for chunk in train.batches(config.batch_size) {
                let batch = PolicyBatch::<B, A>::from_samples(chunk);
                let batch_weight = batch.weight_sum();
                if batch_weight <= 0.0 {
                    continue;
                }
                let loss = self.train_step(batch);
                weighted_loss += loss * batch_weight;
                weight_sum += batch_weight;
                batches += 1;
                samples += chunk.len();
            }
            let train_loss = if weight_sum > 0.0 {
                weighted_loss / weight_sum
            } else {
                0.0
            };
            let validation_loss = validation.map(|set| self.evaluate(set, config.batch_size));
            let metrics = TrainingEpochMetrics {
                epoch: epoch + 1,
                train_loss,
                validation_loss,
                batches,
                samples,
            };
            if let Some(val_loss) = validation_loss {
                let improved = best_validation.map(|best| val_loss < best).unwrap_or(true);
                if improved {
                    best_validation = Some(val_loss);
                    if let Some(hook) = on_best.as_deref_mut() {
                        hook(&self.model, &metrics);
                    }
                }
            }
            let proceed = on_epoch(&metrics);
            history.push(metrics);
            if !proceed {
                break;
            }
        }
        history
    }

    fn loss_components(
        model: &PolicyNetwork<B>,
        batch: &PolicyBatch<B, A>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let logits = model.forward(batch.states.clone());
        let suppression = batch
            .masks
            .clone()
            .sub_scalar(1.0)
            .mul_scalar(MASK_SUPPRESSION);
        let log_probs = log_softmax(logits + suppression, 1);
        let cross_entropy = -(batch.targets.clone() * log_probs).sum_dim(1);
        let batch_size = batch.sample_count();
        let cross_entropy = cross_entropy.reshape([batch_size, 1]);
        let weighted = cross_entropy * batch.weights.clone();
        (weighted.sum(), batch.weights.clone().sum())
    }

    fn tensor_to_f32(tensor: Tensor<B, 1>) -> f32 {
        tensor
            .detach()
            .into_data()
            .to_vec::<f32>()
            .map(|mut values| values.pop().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::game::GameState;
    use crate::ml::encoding::{DrawSpace, PlaySpace, StateEncoder};

    type Backend = Autodiff<NdArray<f32>>;

    fn fresh_play_sample(weight: f32) -> PlaySample {
        let game = GameState::builder().with_seed(21).build().expect("game");
        let view = game.state_view();
        let legal = game.legal_plays();
        let chosen = PlaySpace::action_index(&legal[0]);
        PolicySample::from_choice(
            StateEncoder::encode(&view),
            PlaySpace::mask(&legal),
            chosen,
            weight,
        )
    }

    #[test]
    fn trainer_produces_finite_loss() {
        let model = PolicyNetwork::<Backend>::play_head();
        let mut trainer =
            PolicyTrainer::<Backend, PLAY_ACTIONS>::with_config(model, AdamConfig::new(), 1.0e-3);
        let batch = PolicyBatch::from_samples(&[fresh_play_sample(1.0)]);
        let loss = trainer.train_step(batch);
        assert!(loss.is_finite());
        assert_eq!(trainer.step_count(), 1);
    }

    #[test]
    fn draw_head_trains_on_its_own_space() {
        let model = PolicyNetwork::<Backend>::draw_head();
        let mut trainer =
            PolicyTrainer::<Backend, DRAW_OPTIONS>::with_config(model, AdamConfig::new(), 1.0e-3);
        let mut game = GameState::builder().with_seed(5).build().expect("game");
        let card = game.hand(0)[0].expect("dealt slot");
        game.play_or_discard(card, true).expect("discard");
        let view = game.state_view();
        let legal = game.legal_draws();
        let sample = PolicySample::from_choice(
            StateEncoder::encode(&view),
            DrawSpace::mask(&legal),
            DrawSpace::choice_index(&legal[0]),
            1.0,
        );
        let loss = trainer.train_step(PolicyBatch::from_samples(&[sample]));
        assert!(loss.is_finite());
    }

    #[test]
    fn dataset_split_respects_fraction() {
        let mut dataset = PolicyDataset::<PLAY_ACTIONS>::new();
        dataset.extend(std::iter::repeat_n(fresh_play_sample(1.0), 20));
        let mut rng = StdRng::seed_from_u64(42);
        let (train, validation) = dataset.split(0.2, &mut rng);
        assert_eq!(train.len(), 16);
        assert_eq!(validation.len(), 4);
    }

    #[test]
    fn non_positive_weights_are_dropped() {
        let mut dataset = PolicyDataset::<PLAY_ACTIONS>::new();
        let mut sample = fresh_play_sample(1.0);
        sample.weight = 0.0;
        dataset.push(sample);
        assert!(dataset.is_empty());
    }

    #[test]
    fn fit_returns_metrics_per_epoch() {
        let mut dataset = PolicyDataset::<PLAY_ACTIONS>::new();
        dataset.extend(std::iter::repeat_n(fresh_play_sample(1.0), 32));
        let mut rng = StdRng::seed_from_u64(7);
        let (mut train, validation) = dataset.split(0.25, &mut rng);
        let mut trainer = PolicyTrainer::<Backend, PLAY_ACTIONS>::with_config(
            PolicyNetwork::play_head(),
            AdamConfig::new(),
            1.0e-3,
        );
        let history = trainer.fit(
            &mut train,
            Some(&validation),
            TrainingLoopConfig { epochs: 3, batch_size: 8 },
            &mut rng,
        );
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|metrics| metrics.samples > 0));
        assert!(history.iter().all(|metrics| metrics.validation_loss.is_some()));
    }
}
