use crate::agent::Agent;
use crate::card::{COLOUR_COUNT, Card, DECK_SIZE, MAX_CARD_VALUE};
use crate::ml::encoding::{
    CH_DISCARD_TOP, CH_OPPONENT_STACKS, CH_OWN_STACKS, DRAW_OPTIONS, DrawSpace, PLAY_ACTIONS,
    PlaySpace, STATE_FEATURES, StateEncoder,
};

// Strategy weights, all in rough "points" units. Negative is attractive.
const PLAY_BONUS: i32 = 12;
const GAP_WEIGHT: i32 = 2;
const OPEN_THRESHOLD: i32 = 20;
const WILDCARD_DISCARD_COST: i32 = 6;
const OPPONENT_FEED_COST: i32 = 3;
const WILDCARD_PICKUP_GAIN: i32 = 4;
const DEAD_PILE_COST: i32 = 5;
const FORBIDDEN: i32 = i32::MAX / 2;

/// The scripted opponent: a cost-minimising heuristic over the feature
/// interface. Every legal option is priced in points-flavoured units
/// (values skipped by a play, the 20-point commitment of opening a stack,
/// the value surrendered to the shared piles by a discard) and the
/// cheapest option wins. It sees exactly what a learned agent sees: the
/// feature vector and the legality mask, nothing else.
pub struct MinAgent {
    /// When unset, wildcards are never committed to a stack (they still get
    /// discarded when that is the cheapest option).
    play_wildcards: bool,
}

impl MinAgent {
    pub fn new() -> Self {
        Self { play_wildcards: true }
    }

    pub fn without_wildcard_plays() -> Self {
        Self { play_wildcards: false }
    }

    /// Top value of each of the acting player's stacks, reconstructed from
    /// the own-stacks channel. Stacks are non-decreasing, so the top value
    /// is the highest value present. `None` marks an unopened stack.
    fn stack_tops(
        features: &[f32; STATE_FEATURES],
        channel: usize,
    ) -> [Option<u8>; COLOUR_COUNT] {
        let mut tops = [None; COLOUR_COUNT];
        for index in 0..DECK_SIZE {
            let card = Card::new(index).expect("index in deck range");
            if StateEncoder::card_channel(features, card, channel) > 0.0 {
                let entry = &mut tops[card.colour().index()];
                *entry = Some(entry.map_or(card.value(), |top: u8| top.max(card.value())));
            }
        }
        tops
    }

    fn play_cost(&self, card: Card, own_top: Option<u8>) -> i32 {
        if card.is_wildcard() && !self.play_wildcards {
            return FORBIDDEN;
        }
        match own_top {
            Some(top) => {
                let gap = card.value() as i32 - top as i32;
                GAP_WEIGHT * gap - PLAY_BONUS
            }
            None => OPEN_THRESHOLD - 2 * card.value() as i32 - PLAY_BONUS,
        }
    }

    fn discard_cost(card: Card, opponent_top: Option<u8>) -> i32 {
        let base = if card.is_wildcard() {
            WILDCARD_DISCARD_COST
        } else {
            card.value() as i32
        };
        // A discard the opponent can immediately stack is a gift.
        let feeds_opponent = match opponent_top {
            Some(top) => top <= card.value(),
            None => true,
        };
        base + if feeds_opponent { OPPONENT_FEED_COST } else { 0 }
    }

    fn pile_pickup_cost(card: Card, own_top: Option<u8>) -> i32 {
        let playable = own_top.map_or(true, |top| top <= card.value());
        if !playable {
            return DEAD_PILE_COST;
        }
        if card.is_wildcard() {
            return -WILDCARD_PICKUP_GAIN;
        }
        let gap = own_top.map_or(MAX_CARD_VALUE as i32 - card.value() as i32, |top| {
            card.value() as i32 - top as i32
        });
        GAP_WEIGHT * gap - card.value() as i32 - 1
    }
}

impl Default for MinAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for MinAgent {
    fn pick_play(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; PLAY_ACTIONS],
    ) -> usize {
        let own_tops = Self::stack_tops(features, CH_OWN_STACKS);
        let opponent_tops = Self::stack_tops(features, CH_OPPONENT_STACKS);
        let mut best: Option<(i32, usize)> = None;
        for index in 0..PLAY_ACTIONS {
            if mask[index] != 1.0 {
                continue;
            }
            let action = PlaySpace::index_to_action(index).expect("masked index decodes");
            let colour = action.card.colour().index();
            let cost = if action.is_discard {
                Self::discard_cost(action.card, opponent_tops[colour])
            } else {
                self.play_cost(action.card, own_tops[colour])
            };
            if best.map_or(true, |(best_cost, _)| cost < best_cost) {
                best = Some((cost, index));
            }
        }
        best.map(|(_, index)| index)
            .expect("at least one legal play or discard must exist")
    }

    fn pick_draw(
        &mut self,
        features: &[f32; STATE_FEATURES],
        mask: &[f32; DRAW_OPTIONS],
    ) -> usize {
        let own_tops = Self::stack_tops(features, CH_OWN_STACKS);
        let deck_index = DrawSpace::choice_index(&crate::action::DrawChoice::Deck);
        let mut best = (0, deck_index);
        for colour_index in 0..COLOUR_COUNT {
            if mask[colour_index] != 1.0 {
                continue;
            }
            // The pile's top card is the only card of this colour flagged on
            // the discard-top channel.
            let top = (0..DECK_SIZE)
                .filter_map(Card::new)
                .filter(|card| card.colour().index() == colour_index)
                .find(|card| StateEncoder::card_channel(features, *card, CH_DISCARD_TOP) > 0.0);
            let Some(top) = top else { continue };
            let cost = Self::pile_pickup_cost(top, own_tops[colour_index]);
            if cost < best.0 {
                best = (cost, colour_index);
            }
        }
        best.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;
    use crate::ml::encoding::{draw_features, play_features};

    #[test]
    fn picks_stay_inside_the_mask() {
        let mut agent = MinAgent::new();
        let mut game = GameState::builder().with_seed(17).build().expect("game");
        for _ in 0..15 {
            let view = game.state_view();
            let (features, mask) = play_features(&view, &game.legal_plays());
            let choice = agent.pick_play(&features, &mask);
            assert_eq!(mask[choice], 1.0);
            let action = PlaySpace::index_to_action(choice).expect("decoded");
            game.play_or_discard(action.card, action.is_discard).expect("legal");

            let view = game.state_view();
            let (features, mask) = draw_features(&view, &game.legal_draws());
            let choice = agent.pick_draw(&features, &mask);
            assert_eq!(mask[choice], 1.0);
            let draw = DrawSpace::index_to_choice(choice).expect("decoded");
            game.draw_replacement(draw).expect("legal");
            game.end_sub_turn().expect("swap");
        }
    }

    #[test]
    fn wildcard_plays_can_be_disabled() {
        let agent = MinAgent::without_wildcard_plays();
        let wildcard = Card::new(0).expect("first red wildcard");
        assert_eq!(agent.play_cost(wildcard, None), FORBIDDEN);
        let enabled = MinAgent::new();
        assert!(enabled.play_cost(wildcard, None) < FORBIDDEN);
    }
}
