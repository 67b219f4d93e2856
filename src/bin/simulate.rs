use std::env;
use std::error::Error;
use std::io::{self, Write};
use std::process;

use stackduel::ml::{DrawSpace, PlaySpace, draw_features, play_features};
use stackduel::{
    Agent, DrawChoice, GameState, PlayAction, create_agent_from_spec, describe_draw,
    describe_play, render_state, score_delta,
};

const DEFAULT_SEED: u64 = 0xDEC0_1DED_5EED_F00D;

/// A seat is either an interactive human, prompted through the rendered
/// state, or a feature-driven agent.
enum Seat {
    Human(String),
    Agent(Box<dyn Agent>),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mut visualize = false;
    let mut seed = DEFAULT_SEED;
    let mut max_turns: Option<usize> = None;
    let mut seat_specs: Vec<String> = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--visualize" => visualize = true,
            "--seed" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("invalid seed value: {value}"))?;
            }
            "--max-turns" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--max-turns requires a value".to_string())?;
                max_turns = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("invalid max-turns value: {value}"))?,
                );
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => seat_specs.push(other.to_string()),
        }
    }

    if seat_specs.is_empty() {
        seat_specs = vec![String::from("human"), String::from("min")];
    }
    if seat_specs.len() != 2 {
        return Err(format!("expected exactly 2 seats, received {}", seat_specs.len()).into());
    }

    let mut seats: Vec<Seat> = Vec::with_capacity(2);
    for (index, spec) in seat_specs.iter().enumerate() {
        seats.push(create_seat(spec, index, seed)?);
    }

    let mut game = GameState::builder().with_seed(seed).build()?;
    println!("Starting a match: {} vs {}.\n", seat_specs[0], seat_specs[1]);

    let mut turns = 0usize;
    loop {
        if game.is_finished() {
            break;
        }
        if let Some(limit) = max_turns {
            if turns >= limit {
                println!("Max turn limit {limit} reached. Stopping simulation.");
                break;
            }
        }
        let current = game.current_player();
        if visualize {
            println!("{}", render_state(&game.state_view()));
        }

        let play = match &mut seats[current] {
            Seat::Human(name) => prompt_play(name, &game)?,
            Seat::Agent(agent) => {
                let view = game.state_view();
                let legal = game.legal_plays();
                let (features, mask) = play_features(&view, &legal);
                let choice = agent.pick_play(&features, &mask);
                PlaySpace::index_to_action(choice)
                    .ok_or("agent returned an out-of-range play index")?
            }
        };
        if visualize {
            println!("Player {current}: {}", describe_play(&play));
        }
        game.play_or_discard(play.card, play.is_discard)?;

        let draw = match &mut seats[current] {
            Seat::Human(name) => prompt_draw(name, &game)?,
            Seat::Agent(agent) => {
                let view = game.state_view();
                let legal = game.legal_draws();
                let (features, mask) = draw_features(&view, &legal);
                let choice = agent.pick_draw(&features, &mask);
                DrawSpace::index_to_choice(choice)
                    .ok_or("agent returned an out-of-range draw index")?
            }
        };
        if visualize {
            println!("Player {current}: {}\n", describe_draw(&draw));
        }
        game.draw_replacement(draw)?;

        turns += 1;
        if game.is_finished() {
            break;
        }
        game.end_sub_turn()?;
    }

    let view = game.state_view();
    let mut player0_delta = score_delta(&view);
    if view.current_player == 1 {
        player0_delta = -player0_delta;
    }
    if game.is_finished() {
        println!("Match finished after {turns} sub-turns.");
    }
    match player0_delta.cmp(&0) {
        std::cmp::Ordering::Greater => {
            println!("Player 0 ({}) wins by {player0_delta}.", seat_specs[0])
        }
        std::cmp::Ordering::Less => {
            println!("Player 1 ({}) wins by {}.", seat_specs[1], -player0_delta)
        }
        std::cmp::Ordering::Equal => println!("The match is a tie."),
    }
    Ok(())
}

fn create_seat(spec: &str, index: usize, seed: u64) -> Result<Seat, Box<dyn Error>> {
    let spec_lower = spec.to_ascii_lowercase();
    if spec_lower.starts_with("human") {
        let name = spec
            .split_once(':')
            .map(|(_, name)| name.trim().to_string())
            .unwrap_or_else(|| format!("Human {index}"));
        Ok(Seat::Human(name))
    } else {
        Ok(Seat::Agent(create_agent_from_spec(spec, index, seed)?))
    }
}

fn prompt_play(name: &str, game: &GameState) -> Result<PlayAction, Box<dyn Error>> {
    let view = game.state_view();
    let legal = game.legal_plays();
    println!("\n=== {name}'s turn (player {}) ===", view.current_player);
    println!("{}", render_state(&view));
    prompt_choice(&legal, |action| describe_play(action))
}

fn prompt_draw(name: &str, game: &GameState) -> Result<DrawChoice, Box<dyn Error>> {
    let legal = game.legal_draws();
    println!("\n{name}, pick a replacement card.");
    prompt_choice(&legal, |choice| describe_draw(choice))
}

fn prompt_choice<T: Copy>(
    options: &[T],
    describe: impl Fn(&T) -> String,
) -> Result<T, Box<dyn Error>> {
    assert!(!options.is_empty(), "at least one legal option must exist");
    loop {
        println!("Available actions:");
        for (index, option) in options.iter().enumerate() {
            println!("  [{index}] {}", describe(option));
        }
        println!("Type the action index, 'help' or 'q' to quit.");
        print!("Selection: ");
        if io::stdout().flush().is_err() {
            eprintln!("failed to flush stdout");
        }
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            eprintln!("failed to read input");
            continue;
        }
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
            println!("Exiting game at user's request.");
            process::exit(0);
        }
        if trimmed.eq_ignore_ascii_case("help") {
            println!("Enter the numeric index listed next to the action you wish to perform.");
            continue;
        }
        let Ok(choice) = trimmed.parse::<usize>() else {
            println!("Invalid input: '{trimmed}'. Please enter a number.");
            continue;
        };
        if let Some(option) = options.get(choice) {
            return Ok(*option);
        }
        println!("Index out of range. Please choose a valid option.");
    }
}

fn print_usage() {
    println!("Usage: simulate [OPTIONS] [SEAT SEAT]");
    println!("  --visualize           Show the game state and chosen actions each sub-turn");
    println!("  --seed <u64>          Seed for shuffling (default: {DEFAULT_SEED:#x})");
    println!("  --max-turns <usize>   Stop after the specified number of sub-turns");
    println!("  --help                Show this help message");
    println!("Seat entries (exactly 2):");
    println!("  human[:name]          Interactive human-controlled player");
    println!("  random[:seed]         Random agent with optional per-seat seed");
    println!("  min[:nowild]          Cost-minimising scripted opponent");
    println!("If no seats are provided, defaults to one human against the min agent.");
}
