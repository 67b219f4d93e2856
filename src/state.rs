use serde::{Deserialize, Serialize};

use crate::action::PlayerId;
use crate::card::{COLOUR_COUNT, Card, Colour, HAND_SIZE};

/// Position within a sub-turn. A play or discard must precede every draw,
/// and the player swap is only legal once the draw has happened.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingPlay,
    AwaitingDraw,
}

/// Snapshot of the match from the acting player's perspective, consumed by
/// the feature encoder, the renderer and the tests. Derived from the
/// canonical state on every call; holding one across mutations is fine, it
/// simply goes stale.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStateView {
    pub current_player: PlayerId,
    pub phase: TurnPhase,
    pub deck_len: usize,
    /// The acting player's eight hand slots; `None` marks the vacated slot
    /// between a play and its replacement draw.
    pub hand: [Option<Card>; HAND_SIZE],
    pub own_stacks: [Vec<Card>; COLOUR_COUNT],
    pub opponent_stacks: [Vec<Card>; COLOUR_COUNT],
    /// Shared discard piles, bottom first.
    pub discard_piles: [Vec<Card>; COLOUR_COUNT],
    /// Colour the acting player just discarded to, if any; drawing from it
    /// is forbidden until the pending draw completes.
    pub blocked_pile: Option<Colour>,
}

impl GameStateView {
    pub fn hand_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.hand.iter().flatten().copied()
    }

    pub fn discard_top(&self, colour: Colour) -> Option<Card> {
        self.discard_piles[colour.index()].last().copied()
    }

    pub fn own_stack_top(&self, colour: Colour) -> Option<Card> {
        self.own_stacks[colour.index()].last().copied()
    }
}
