use std::fmt::Write;

use crate::action::{DrawChoice, PlayAction};
use crate::card::{COLOURS, Card};
use crate::score::{score_stack, scores};
use crate::state::GameStateView;

/// Customize state rendering for CLI visualization.
#[derive(Clone, Copy, Debug)]
pub struct VisualOptions {
    pub show_stack_sequences: bool,
    pub show_pile_depths: bool,
}

impl Default for VisualOptions {
    fn default() -> Self {
        Self {
            show_stack_sequences: true,
            show_pile_depths: true,
        }
    }
}

pub fn render_state(view: &GameStateView) -> String {
    render_state_with_options(view, VisualOptions::default())
}

pub fn render_state_with_options(view: &GameStateView, options: VisualOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Player {} to act ({:?})  |  Deck: {} cards",
        view.current_player, view.phase, view.deck_len
    );
    let (own_score, opponent_score) = scores(view);
    let _ = writeln!(out, "Score: you {own_score}  opponent {opponent_score}");

    let _ = writeln!(out, "Stacks (yours / opponent's):");
    for colour in COLOURS {
        let own = &view.own_stacks[colour.index()];
        let theirs = &view.opponent_stacks[colour.index()];
        let own_seq = if options.show_stack_sequences {
            format_pile(own)
        } else {
            format_top(own.last().copied())
        };
        let theirs_seq = if options.show_stack_sequences {
            format_pile(theirs)
        } else {
            format_top(theirs.last().copied())
        };
        let _ = writeln!(
            out,
            "  {:<6} {own_seq} ({:+})  /  {theirs_seq} ({:+})",
            colour.name(),
            score_stack(own),
            score_stack(theirs),
        );
    }

    let _ = writeln!(out, "Discard piles:");
    for colour in COLOURS {
        let pile = &view.discard_piles[colour.index()];
        let top = format_top(pile.last().copied());
        let blocked = if view.blocked_pile == Some(colour) {
            "  <- blocked"
        } else {
            ""
        };
        if options.show_pile_depths {
            let _ = writeln!(out, "  {:<6} {top} ({}){blocked}", colour.name(), pile.len());
        } else {
            let _ = writeln!(out, "  {:<6} {top}{blocked}", colour.name());
        }
    }

    let mut hand_entries = Vec::with_capacity(view.hand.len());
    for (slot, card) in view.hand.iter().enumerate() {
        match card {
            Some(card) => hand_entries.push(format!("{slot}:{}", format_card(*card))),
            None => hand_entries.push(format!("{slot}:--")),
        }
    }
    let _ = writeln!(out, "Hand: {}", hand_entries.join("  "));
    out
}

pub fn describe_play(action: &PlayAction) -> String {
    if action.is_discard {
        format!(
            "Discard {} onto the {} pile",
            format_card(action.card),
            action.card.colour().name()
        )
    } else {
        format!(
            "Play {} onto your {} stack",
            format_card(action.card),
            action.card.colour().name()
        )
    }
}

pub fn describe_draw(choice: &DrawChoice) -> String {
    match choice {
        DrawChoice::Pile(colour) => format!("Draw from the {} discard pile", colour.name()),
        DrawChoice::Deck => String::from("Draw from the deck"),
    }
}

fn format_card(card: Card) -> String {
    let value = if card.is_wildcard() {
        String::from("X")
    } else {
        card.value().to_string()
    };
    format!("{}{}", card.colour().name().chars().next().unwrap_or('?'), value)
}

fn format_pile(pile: &[Card]) -> String {
    if pile.is_empty() {
        return String::from("[-]");
    }
    let seq = pile
        .iter()
        .map(|card| format_card(*card))
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{seq}]")
}

fn format_top(top: Option<Card>) -> String {
    top.map(format_card).unwrap_or_else(|| String::from("--"))
}
