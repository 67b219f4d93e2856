use thiserror::Error;

use crate::card::{Card, Colour};
use crate::state::TurnPhase;

/// Errors that can occur when manipulating the game state.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("the match is already finished")]
    MatchFinished,
    #[error("operation requires the {expected:?} phase")]
    WrongPhase { expected: TurnPhase },
    #[error("invalid move: {0}")]
    InvalidMove(#[from] InvalidMove),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Recoverable rule violations; the caller offered an action outside the
/// legality mask. Invariant breaches (drawing from the blocked pile, a hand
/// with no empty slot) are assertions instead, since they can only be
/// reached by bypassing the mask.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidMove {
    #[error("card {0:?} is not in the acting player's hand")]
    CardNotInHand(Card),
    #[error("card {card:?} cannot extend a stack topped by {top:?}")]
    StackOrder { card: Card, top: Card },
    #[error("the {0:?} discard pile is empty")]
    EmptyDiscardPile(Colour),
}
