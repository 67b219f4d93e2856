use serde::{Deserialize, Serialize};

pub const DECK_SIZE: usize = 60;
pub const COLOUR_COUNT: usize = 5;
pub const CARDS_PER_COLOUR: usize = 12;
pub const WILDCARDS_PER_COLOUR: usize = 3;
pub const HAND_SIZE: usize = 8;
pub const MIN_NUMBER_VALUE: u8 = 2;
pub const MAX_CARD_VALUE: u8 = 10;

/// One of the five card colours, doubling as the index of that colour's
/// stacks and shared discard pile.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Colour {
    Red = 0,
    Green = 1,
    White = 2,
    Blue = 3,
    Yellow = 4,
}

pub const COLOURS: [Colour; COLOUR_COUNT] = [
    Colour::Red,
    Colour::Green,
    Colour::White,
    Colour::Blue,
    Colour::Yellow,
];

impl Colour {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        COLOURS.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Colour::Red => "red",
            Colour::Green => "green",
            Colour::White => "white",
            Colour::Blue => "blue",
            Colour::Yellow => "yellow",
        }
    }
}

/// A card identity. The index in [0, 60) is the canonical representation;
/// colour and value are derived. Each colour owns twelve consecutive
/// indices: three wildcards followed by the numbers 2 through 10.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Card(u8);

impl Card {
    pub fn new(index: usize) -> Option<Self> {
        (index < DECK_SIZE).then_some(Self(index as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn colour(self) -> Colour {
        COLOURS[self.0 as usize / CARDS_PER_COLOUR]
    }

    /// Face value: 0 for a wildcard, 2..=10 otherwise.
    #[inline]
    pub fn value(self) -> u8 {
        let rank = self.0 as usize % CARDS_PER_COLOUR;
        if rank < WILDCARDS_PER_COLOUR {
            0
        } else {
            (rank - 1) as u8
        }
    }

    /// Wildcards carry value 0 and may open any stack or extend one whose
    /// top is itself a wildcard.
    #[inline]
    pub fn is_wildcard(self) -> bool {
        self.value() == 0
    }
}

/// The full 60-card deck in deterministic, unshuffled order.
pub fn full_deck() -> Vec<Card> {
    (0..DECK_SIZE as u8).map(Card).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_composition() {
        let deck = full_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        for colour in COLOURS {
            let of_colour: Vec<Card> =
                deck.iter().copied().filter(|c| c.colour() == colour).collect();
            assert_eq!(of_colour.len(), CARDS_PER_COLOUR);
            let wildcards = of_colour.iter().filter(|c| c.is_wildcard()).count();
            assert_eq!(wildcards, WILDCARDS_PER_COLOUR);
            for value in MIN_NUMBER_VALUE..=MAX_CARD_VALUE {
                assert_eq!(of_colour.iter().filter(|c| c.value() == value).count(), 1);
            }
        }
    }

    #[test]
    fn derived_attributes() {
        let first_blue = Card::new(36).expect("in range");
        assert_eq!(first_blue.colour(), Colour::Blue);
        assert!(first_blue.is_wildcard());
        let last = Card::new(59).expect("in range");
        assert_eq!(last.colour(), Colour::Yellow);
        assert_eq!(last.value(), MAX_CARD_VALUE);
        assert!(Card::new(60).is_none());
    }
}
