use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::action::{DrawChoice, PlayAction};
use crate::card::{COLOUR_COUNT, Card, Colour, DECK_SIZE};
use crate::state::GameStateView;

/// Per-card feature channels, card-major in the encoded vector.
pub const CH_HAND: usize = 0;
pub const CH_OWN_STACKS: usize = 1;
pub const CH_OPPONENT_STACKS: usize = 2;
pub const CH_DISCARD_TOP: usize = 3;
pub const CH_COVERED: usize = 4;
pub const CARD_CHANNELS: usize = 5;

/// 60 cards x 5 channels plus the remaining deck size.
pub const STATE_FEATURES: usize = DECK_SIZE * CARD_CHANNELS + 1;

/// Play action space: two sub-actions (play, discard) per card identity.
pub const PLAY_ACTIONS: usize = DECK_SIZE * 2;
/// Draw action space: the five discard piles plus the deck.
pub const DRAW_OPTIONS: usize = COLOUR_COUNT + 1;
const DECK_DRAW_INDEX: usize = COLOUR_COUNT;

#[inline]
fn signed(present: bool) -> f32 {
    if present { 1.0 } else { -1.0 }
}

/// Derives the 301-wide feature vector from a state view. A pure function
/// of the view: calling it twice without an intervening mutation yields
/// identical vectors.
pub struct StateEncoder;

impl StateEncoder {
    pub fn encode(view: &GameStateView) -> [f32; STATE_FEATURES] {
        let mut in_hand = [false; DECK_SIZE];
        for card in view.hand_cards() {
            in_hand[card.index()] = true;
        }
        let mut on_own = [false; DECK_SIZE];
        for stack in &view.own_stacks {
            for card in stack {
                on_own[card.index()] = true;
            }
        }
        let mut on_opponent = [false; DECK_SIZE];
        for stack in &view.opponent_stacks {
            for card in stack {
                on_opponent[card.index()] = true;
            }
        }
        let mut pile_top = [false; DECK_SIZE];
        let mut covered = [0u8; DECK_SIZE];
        for pile in &view.discard_piles {
            let len = pile.len();
            for (depth, card) in pile.iter().enumerate() {
                covered[card.index()] = (len - 1 - depth) as u8;
                if depth == len - 1 {
                    pile_top[card.index()] = true;
                }
            }
        }

        let mut out = [0.0; STATE_FEATURES];
        for index in 0..DECK_SIZE {
            let base = index * CARD_CHANNELS;
            out[base + CH_HAND] = signed(in_hand[index]);
            out[base + CH_OWN_STACKS] = signed(on_own[index]);
            out[base + CH_OPPONENT_STACKS] = signed(on_opponent[index]);
            out[base + CH_DISCARD_TOP] = signed(pile_top[index]);
            out[base + CH_COVERED] = covered[index] as f32;
        }
        out[STATE_FEATURES - 1] = view.deck_len as f32;
        out
    }

    pub fn encode_tensor<B>(view: &GameStateView) -> Tensor<B, 2>
    where
        B: Backend,
        B::Device: Default,
    {
        let features = Self::encode(view);
        let data = TensorData::new(features.to_vec(), [1, STATE_FEATURES]);
        Tensor::<B, 2>::from_data(data, &B::Device::default())
    }

    /// Reads one card channel back out of an encoded vector. Agents that
    /// reason about concrete cards (the cost-minimising opponent) use this
    /// instead of touching engine state.
    #[inline]
    pub fn card_channel(features: &[f32; STATE_FEATURES], card: Card, channel: usize) -> f32 {
        features[card.index() * CARD_CHANNELS + channel]
    }

    #[inline]
    pub fn deck_len(features: &[f32; STATE_FEATURES]) -> f32 {
        features[STATE_FEATURES - 1]
    }
}

/// Index mapping and legality masks for the 120-way play space.
pub struct PlaySpace;

impl PlaySpace {
    #[inline]
    pub fn action_index(action: &PlayAction) -> usize {
        2 * action.card.index() + usize::from(action.is_discard)
    }

    pub fn index_to_action(index: usize) -> Option<PlayAction> {
        let card = Card::new(index / 2)?;
        Some(PlayAction { card, is_discard: index % 2 == 1 })
    }

    /// 0/1 mask aligned with the action indices.
    pub fn mask(legal: &[PlayAction]) -> [f32; PLAY_ACTIONS] {
        let mut mask = [0.0; PLAY_ACTIONS];
        for action in legal {
            mask[Self::action_index(action)] = 1.0;
        }
        mask
    }
}

/// Index mapping and legality masks for the 6-way draw space.
pub struct DrawSpace;

impl DrawSpace {
    #[inline]
    pub fn choice_index(choice: &DrawChoice) -> usize {
        match choice {
            DrawChoice::Pile(colour) => colour.index(),
            DrawChoice::Deck => DECK_DRAW_INDEX,
        }
    }

    pub fn index_to_choice(index: usize) -> Option<DrawChoice> {
        if index == DECK_DRAW_INDEX {
            Some(DrawChoice::Deck)
        } else {
            Colour::from_index(index).map(DrawChoice::Pile)
        }
    }

    pub fn mask(legal: &[DrawChoice]) -> [f32; DRAW_OPTIONS] {
        let mut mask = [0.0; DRAW_OPTIONS];
        for choice in legal {
            mask[Self::choice_index(choice)] = 1.0;
        }
        mask
    }
}

/// Feature vector plus play mask for the acting player, the pair handed to
/// an agent's `pick_play`.
pub fn play_features(
    view: &GameStateView,
    legal: &[PlayAction],
) -> ([f32; STATE_FEATURES], [f32; PLAY_ACTIONS]) {
    (StateEncoder::encode(view), PlaySpace::mask(legal))
}

/// Feature vector plus draw mask for the acting player, the pair handed to
/// an agent's `pick_draw`.
pub fn draw_features(
    view: &GameStateView,
    legal: &[DrawChoice],
) -> ([f32; STATE_FEATURES], [f32; DRAW_OPTIONS]) {
    (StateEncoder::encode(view), DrawSpace::mask(legal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::full_deck;
    use crate::game::GameState;

    #[test]
    fn play_index_round_trip() {
        for index in 0..PLAY_ACTIONS {
            let action = PlaySpace::index_to_action(index).expect("decoded");
            assert_eq!(PlaySpace::action_index(&action), index);
        }
        assert!(PlaySpace::index_to_action(PLAY_ACTIONS).is_none());
    }

    #[test]
    fn draw_index_round_trip() {
        for index in 0..DRAW_OPTIONS {
            let choice = DrawSpace::index_to_choice(index).expect("decoded");
            assert_eq!(DrawSpace::choice_index(&choice), index);
        }
        assert!(DrawSpace::index_to_choice(DRAW_OPTIONS).is_none());
    }

    #[test]
    fn masks_mark_exactly_the_legal_set() {
        let game = GameState::builder().with_seed(11).build().expect("game");
        let legal = game.legal_plays();
        let mask = PlaySpace::mask(&legal);
        assert_eq!(
            mask.iter().filter(|&&bit| bit == 1.0).count(),
            legal.len(),
            "each legal action owns a distinct index"
        );
        for action in &legal {
            assert_eq!(mask[PlaySpace::action_index(action)], 1.0);
        }
    }

    #[test]
    fn fresh_deal_encodes_hand_and_deck_size() {
        let game = GameState::builder().with_seed(3).build().expect("game");
        let view = game.state_view();
        let features = StateEncoder::encode(&view);
        assert_eq!(StateEncoder::deck_len(&features), 44.0);
        let in_hand = full_deck()
            .into_iter()
            .filter(|card| StateEncoder::card_channel(&features, *card, CH_HAND) > 0.0)
            .count();
        assert_eq!(in_hand, 8);
        for card in full_deck() {
            assert_eq!(StateEncoder::card_channel(&features, card, CH_OWN_STACKS), -1.0);
            assert_eq!(StateEncoder::card_channel(&features, card, CH_COVERED), 0.0);
        }
    }
}
