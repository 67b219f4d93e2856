//! Two-player patience-battle engine tailored for reinforcement learning
//! workloads and scripted-opponent experimentation.

pub mod action;
pub mod agent;
pub mod agents;
pub mod card;
pub mod error;
pub mod game;
pub mod ml;
pub mod score;
pub mod state;
pub mod visualize;

pub use crate::action::{DrawChoice, PlayAction, PlayerId};
pub use crate::agent::Agent;
pub use crate::agents::{
    MinAgent, PolicyAgent, RandomAgent, create_agent_from_spec, label_for_spec,
};
pub use crate::card::{Card, Colour, full_deck};
pub use crate::error::{GameError, InvalidMove};
pub use crate::game::{GameBuilder, GameState};
pub use crate::ml::{
    DEFAULT_HIDDEN, DEFAULT_STACK, DRAW_OPTIONS, DrawSpace, PLAY_ACTIONS, PlaySpace,
    PolicyNetwork, STATE_FEATURES, StateEncoder, draw_features, play_features,
};
pub use crate::score::{player_score, score_delta, score_stack, scores, stack_scores};
pub use crate::state::{GameStateView, TurnPhase};
pub use crate::visualize::{describe_draw, describe_play, render_state};
