use std::array::from_fn;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::action::{DrawChoice, PlayAction, PlayerId};
use crate::card::{COLOUR_COUNT, Card, Colour, DECK_SIZE, HAND_SIZE, full_deck};
use crate::error::{GameError, InvalidMove};
use crate::state::{GameStateView, TurnPhase};

const DEFAULT_SEED: u64 = 0x5EED_5EED_5EED_5EED;

/// Builder that enables seeding and deterministic deck injection for tests
/// and RL experiments.
pub struct GameBuilder {
    seed: u64,
    deck: Option<Vec<Card>>,
}

impl GameBuilder {
    pub fn new() -> Self {
        Self { seed: DEFAULT_SEED, deck: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Inject a full deck in draw order (cards are popped from the end).
    /// The deck must be a permutation of the 60 card identities.
    pub fn with_deck(mut self, deck: Vec<Card>) -> Self {
        self.deck = Some(deck);
        self
    }

    pub fn build(self) -> Result<GameState, GameError> {
        GameState::from_builder(self)
    }
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
struct PlayerAreas {
    hand: [Option<Card>; HAND_SIZE],
    stacks: [Vec<Card>; COLOUR_COUNT],
}

impl PlayerAreas {
    fn new() -> Self {
        Self {
            hand: [None; HAND_SIZE],
            stacks: from_fn(|_| Vec::new()),
        }
    }

    fn hand_slot_of(&self, card: Card) -> Option<usize> {
        self.hand.iter().position(|slot| *slot == Some(card))
    }

    fn empty_slot(&self) -> Option<usize> {
        self.hand.iter().position(|slot| slot.is_none())
    }
}

/// Core engine for a single two-player match. Owns the canonical card
/// collections; everything agents and renderers consume is derived from
/// them through [`GameState::state_view`] and the legality queries.
///
/// Both players' areas live in a fixed two-element array and the acting
/// player is an index into it, so the player swap never moves card data.
pub struct GameState {
    players: [PlayerAreas; 2],
    current_player: PlayerId,
    deck: Vec<Card>,
    discard_piles: [Vec<Card>; COLOUR_COUNT],
    blocked_pile: Option<Colour>,
    phase: TurnPhase,
}

impl GameState {
    pub fn builder() -> GameBuilder {
        GameBuilder::new()
    }

    fn from_builder(builder: GameBuilder) -> Result<Self, GameError> {
        let mut deck = match builder.deck {
            Some(deck) => {
                validate_deck(&deck)?;
                deck
            }
            None => {
                let mut deck = full_deck();
                let mut rng = StdRng::seed_from_u64(builder.seed);
                deck.shuffle(&mut rng);
                deck
            }
        };

        let mut players = [PlayerAreas::new(), PlayerAreas::new()];
        for player in players.iter_mut() {
            for slot in player.hand.iter_mut() {
                *slot = Some(deck.pop().ok_or(GameError::InvalidConfiguration(
                    "deck exhausted while dealing hands",
                ))?);
            }
        }

        Ok(Self {
            players,
            current_player: 0,
            deck,
            discard_piles: from_fn(|_| Vec::new()),
            blocked_pile: None,
            phase: TurnPhase::AwaitingPlay,
        })
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    /// The match ends the moment the deck runs dry; hands cannot jam because
    /// every played or discarded card is replaced before the turn passes.
    pub fn is_finished(&self) -> bool {
        self.deck.is_empty()
    }

    pub fn blocked_pile(&self) -> Option<Colour> {
        self.blocked_pile
    }

    pub fn hand(&self, player: PlayerId) -> &[Option<Card>; HAND_SIZE] {
        &self.players[player].hand
    }

    pub fn stacks(&self, player: PlayerId) -> &[Vec<Card>; COLOUR_COUNT] {
        &self.players[player].stacks
    }

    pub fn discard_pile(&self, colour: Colour) -> &[Card] {
        &self.discard_piles[colour.index()]
    }

    pub fn discard_top(&self, colour: Colour) -> Option<Card> {
        self.discard_piles[colour.index()].last().copied()
    }

    /// Snapshot from the acting player's perspective.
    pub fn state_view(&self) -> GameStateView {
        let me = self.current_player;
        let opponent = 1 - me;
        GameStateView {
            current_player: me,
            phase: self.phase,
            deck_len: self.deck.len(),
            hand: self.players[me].hand,
            own_stacks: self.players[me].stacks.clone(),
            opponent_stacks: self.players[opponent].stacks.clone(),
            discard_piles: self.discard_piles.clone(),
            blocked_pile: self.blocked_pile,
        }
    }

    /// Every legal first-half action for the acting player: any in-hand card
    /// may be discarded, and may be played when its colour's stack is empty
    /// or topped by a card of equal or lower value.
    pub fn legal_plays(&self) -> Vec<PlayAction> {
        if self.is_finished() || self.phase != TurnPhase::AwaitingPlay {
            return Vec::new();
        }
        let me = &self.players[self.current_player];
        let mut actions = Vec::new();
        for card in me.hand.iter().flatten().copied() {
            if self.play_is_legal(card) {
                actions.push(PlayAction::play(card));
            }
            actions.push(PlayAction::discard(card));
        }
        actions
    }

    /// Every legal replacement source: the deck while it lasts, plus any
    /// non-empty discard pile except the one just discarded to.
    pub fn legal_draws(&self) -> Vec<DrawChoice> {
        if self.is_finished() || self.phase != TurnPhase::AwaitingDraw {
            return Vec::new();
        }
        let mut choices = Vec::new();
        for colour in crate::card::COLOURS {
            if self.discard_piles[colour.index()].is_empty() {
                continue;
            }
            if self.blocked_pile == Some(colour) {
                continue;
            }
            choices.push(DrawChoice::Pile(colour));
        }
        choices.push(DrawChoice::Deck);
        choices
    }

    fn play_is_legal(&self, card: Card) -> bool {
        let stack = &self.players[self.current_player].stacks[card.colour().index()];
        match stack.last() {
            Some(top) => top.value() <= card.value(),
            None => true,
        }
    }

    /// First half of a sub-turn: move `card` from the acting hand onto its
    /// colour's stack, or onto the shared discard pile when `is_discard`.
    /// Stack ordering is validated here rather than trusted to the caller.
    pub fn play_or_discard(&mut self, card: Card, is_discard: bool) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        if self.phase != TurnPhase::AwaitingPlay {
            return Err(GameError::WrongPhase { expected: TurnPhase::AwaitingPlay });
        }
        let me = self.current_player;
        let slot = self.players[me]
            .hand_slot_of(card)
            .ok_or(InvalidMove::CardNotInHand(card))?;
        if !is_discard && !self.play_is_legal(card) {
            let top = self.players[me].stacks[card.colour().index()]
                .last()
                .copied()
                .expect("an illegal play implies a non-empty stack");
            return Err(InvalidMove::StackOrder { card, top }.into());
        }

        self.players[me].hand[slot] = None;
        if is_discard {
            self.discard_piles[card.colour().index()].push(card);
            self.blocked_pile = Some(card.colour());
        } else {
            self.players[me].stacks[card.colour().index()].push(card);
        }
        self.phase = TurnPhase::AwaitingDraw;
        Ok(())
    }

    /// Second half of a sub-turn: fill the vacated hand slot from the deck
    /// or from the top of a discard pile, and lift the discard block.
    /// Returns the drawn card.
    ///
    /// Drawing from the blocked pile is a caller bug (the legality mask was
    /// ignored) and panics rather than erroring.
    pub fn draw_replacement(&mut self, choice: DrawChoice) -> Result<Card, GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        if self.phase != TurnPhase::AwaitingDraw {
            return Err(GameError::WrongPhase { expected: TurnPhase::AwaitingDraw });
        }
        let card = match choice {
            DrawChoice::Deck => self
                .deck
                .pop()
                .expect("a non-finished match always has deck cards"),
            DrawChoice::Pile(colour) => {
                assert_ne!(
                    self.blocked_pile,
                    Some(colour),
                    "draw from the pile just discarded to; the legality mask was bypassed"
                );
                self.discard_piles[colour.index()]
                    .pop()
                    .ok_or(InvalidMove::EmptyDiscardPile(colour))?
            }
        };
        let me = self.current_player;
        let slot = self.players[me]
            .empty_slot()
            .expect("a play or discard must precede every draw");
        self.players[me].hand[slot] = Some(card);
        self.blocked_pile = None;
        self.phase = TurnPhase::AwaitingPlay;
        Ok(card)
    }

    /// Pass control to the other player. A pure relabeling: no card moves.
    pub fn end_sub_turn(&mut self) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::MatchFinished);
        }
        if self.phase != TurnPhase::AwaitingPlay {
            return Err(GameError::WrongPhase { expected: TurnPhase::AwaitingPlay });
        }
        self.current_player = 1 - self.current_player;
        Ok(())
    }
}

fn validate_deck(deck: &[Card]) -> Result<(), GameError> {
    if deck.len() != DECK_SIZE {
        return Err(GameError::InvalidConfiguration(
            "injected deck must contain exactly 60 cards",
        ));
    }
    let mut seen = [false; DECK_SIZE];
    for card in deck {
        if std::mem::replace(&mut seen[card.index()], true) {
            return Err(GameError::InvalidConfiguration(
                "injected deck must be a permutation of the 60 card identities",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_leaves_44_deck_cards_and_full_hands() {
        let game = GameState::builder().with_seed(7).build().expect("game");
        assert_eq!(game.deck_len(), DECK_SIZE - 2 * HAND_SIZE);
        for player in 0..2 {
            assert_eq!(game.hand(player).iter().flatten().count(), HAND_SIZE);
        }
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.phase(), TurnPhase::AwaitingPlay);
        assert!(game.blocked_pile().is_none());
    }

    #[test]
    fn injected_deck_must_be_a_permutation() {
        let mut deck = full_deck();
        deck[1] = deck[0];
        assert!(matches!(
            GameState::builder().with_deck(deck).build(),
            Err(GameError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            GameState::builder().with_deck(full_deck()[..59].to_vec()).build(),
            Err(GameError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn draw_before_play_is_rejected() {
        let mut game = GameState::builder().build().expect("game");
        assert!(matches!(
            game.draw_replacement(DrawChoice::Deck),
            Err(GameError::WrongPhase { .. })
        ));
    }

    #[test]
    fn swap_mid_sub_turn_is_rejected() {
        let mut game = GameState::builder().build().expect("game");
        let card = game.hand(0)[0].expect("dealt slot");
        game.play_or_discard(card, true).expect("discard");
        assert!(matches!(game.end_sub_turn(), Err(GameError::WrongPhase { .. })));
    }
}
