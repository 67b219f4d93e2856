//! Scoring for finished and in-progress matches.
//!
//! A stack is worth the sum of its card values minus the 20-point
//! commitment threshold, multiplied by one plus the number of wildcards
//! among its first three cards, with a flat 20-point bonus once it reaches
//! eight cards. Empty stacks score nothing.

use crate::card::{COLOUR_COUNT, Card};
use crate::state::GameStateView;

const COMMITMENT_THRESHOLD: i32 = 20;
const COMPLETION_BONUS: i32 = 20;
const COMPLETION_LENGTH: usize = 8;
const MULTIPLIER_WINDOW: usize = 3;

/// Score a single colour stack.
pub fn score_stack(stack: &[Card]) -> i32 {
    if stack.is_empty() {
        return 0;
    }
    let sum: i32 = stack.iter().map(|card| card.value() as i32).sum();
    let multiplier = 1 + stack
        .iter()
        .take(MULTIPLIER_WINDOW)
        .filter(|card| card.is_wildcard())
        .count() as i32;
    let bonus = if stack.len() >= COMPLETION_LENGTH {
        COMPLETION_BONUS
    } else {
        0
    };
    (sum - COMMITMENT_THRESHOLD) * multiplier + bonus
}

/// Per-colour scores for one player's five stacks.
pub fn stack_scores(stacks: &[Vec<Card>; COLOUR_COUNT]) -> [i32; COLOUR_COUNT] {
    std::array::from_fn(|idx| score_stack(&stacks[idx]))
}

/// Total score of one player's stacks.
pub fn player_score(stacks: &[Vec<Card>; COLOUR_COUNT]) -> i32 {
    stacks.iter().map(|stack| score_stack(stack)).sum()
}

/// (acting player's total, opponent's total).
pub fn scores(view: &GameStateView) -> (i32, i32) {
    (
        player_score(&view.own_stacks),
        player_score(&view.opponent_stacks),
    )
}

/// Acting player's total minus the opponent's. Callers that want a stable
/// player-0 viewpoint flip the sign when `view.current_player` is 1.
pub fn score_delta(view: &GameStateView) -> i32 {
    let (own, opponent) = scores(view);
    own - opponent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, Colour, full_deck};

    fn card(colour: Colour, value: u8) -> Card {
        full_deck()
            .into_iter()
            .find(|c| c.colour() == colour && c.value() == value)
            .expect("card exists")
    }

    #[test]
    fn empty_stack_scores_zero() {
        assert_eq!(score_stack(&[]), 0);
    }

    #[test]
    fn early_wildcard_doubles_the_deficit() {
        let stack = vec![
            card(Colour::Red, 0),
            card(Colour::Red, 5),
            card(Colour::Red, 7),
        ];
        assert_eq!(score_stack(&stack), -16);
    }

    #[test]
    fn completion_bonus_is_added_after_the_multiplier() {
        // Eight cards summing to 28 with no wildcard in the first three.
        let stack = vec![
            card(Colour::Green, 2),
            card(Colour::Green, 3),
            card(Colour::Green, 4),
            Card::new(12).unwrap(), // green wildcard
            Card::new(13).unwrap(), // green wildcard
            Card::new(14).unwrap(), // green wildcard
            card(Colour::Green, 9),
            card(Colour::Green, 10),
        ];
        assert_eq!(stack.iter().map(|c| c.value() as i32).sum::<i32>(), 28);
        assert_eq!(score_stack(&stack), 28);
    }

    #[test]
    fn late_wildcards_do_not_multiply() {
        let stack = vec![
            card(Colour::Blue, 4),
            card(Colour::Blue, 5),
            card(Colour::Blue, 6),
        ];
        assert_eq!(score_stack(&stack), -5);
    }
}
