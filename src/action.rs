use serde::{Deserialize, Serialize};

use crate::card::{Card, Colour};

/// Zero-based index of a player within the match (always 0 or 1).
pub type PlayerId = usize;

/// First half of a sub-turn: move one hand card to a stack or a discard pile.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayAction {
    pub card: Card,
    /// When set the card goes to its colour's shared discard pile instead of
    /// the acting player's stack.
    pub is_discard: bool,
}

impl PlayAction {
    pub fn play(card: Card) -> Self {
        Self { card, is_discard: false }
    }

    pub fn discard(card: Card) -> Self {
        Self { card, is_discard: true }
    }
}

/// Second half of a sub-turn: where the replacement card comes from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DrawChoice {
    /// Top card of the chosen colour's shared discard pile.
    Pile(Colour),
    /// Top card of the face-down deck.
    Deck,
}
