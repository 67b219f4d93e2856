pub mod encoding;
pub mod policy;
pub mod training;

pub use encoding::{
    DRAW_OPTIONS, DrawSpace, PLAY_ACTIONS, PlaySpace, STATE_FEATURES, StateEncoder, draw_features,
    play_features,
};
pub use policy::{DEFAULT_HIDDEN, DEFAULT_STACK, PolicyNetwork};
pub use training::{
    DrawSample, PlaySample, PolicyBatch, PolicyDataset, PolicySample, PolicyTrainer,
    TrainingEpochMetrics, TrainingLoopConfig,
};
