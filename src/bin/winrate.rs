use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::{ArgAction, Parser};
use plotters::prelude::*;

use stackduel::ml::{DrawSpace, PlaySpace, draw_features, play_features};
use stackduel::{Agent, GameState, create_agent_from_spec, label_for_spec, score_delta};

/// Default base seed for deterministic runs.
const DEFAULT_SEED: u64 = 0xC0FFEE_u64 << 32 | 0x5EED_u64;

#[derive(Parser, Debug)]
#[command(
    name = "winrate",
    about = "Run multiple matches between two agents and plot win rates."
)]
struct Args {
    /// Number of matches to simulate
    #[arg(short = 'g', long = "games", default_value_t = 200)]
    games: usize,

    /// Base RNG seed (deck and agent RNGs are derived deterministically)
    #[arg(short = 's', long = "seed", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Output chart file (PNG)
    #[arg(short = 'o', long = "out", default_value = "winrates.png")]
    out: PathBuf,

    /// Show a textual summary only (no chart)
    #[arg(long = "no-chart", action = ArgAction::SetTrue)]
    no_chart: bool,

    /// Safety cap on sub-turns per match
    #[arg(long = "max-turns", default_value_t = 500)]
    max_turns: usize,

    /// Agent specs for the two seats, e.g. `min random`
    specs: Vec<String>,
}

struct SeatTally {
    label: String,
    wins: usize,
    ties: usize,
    total_delta: i64,
    decision_time_ns: u128,
    decisions: usize,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if args.specs.len() != 2 {
        return Err("please provide exactly 2 agent specs (e.g., min random)".into());
    }
    if args
        .specs
        .iter()
        .any(|spec| spec.to_ascii_lowercase().starts_with("human"))
    {
        return Err("human players are not supported in winrate runs".into());
    }

    let mut tallies: Vec<SeatTally> = args
        .specs
        .iter()
        .map(|spec| SeatTally {
            label: label_for_spec(spec),
            wins: 0,
            ties: 0,
            total_delta: 0,
            decision_time_ns: 0,
            decisions: 0,
        })
        .collect();
    let mut aborted_games = 0usize;

    for game_idx in 0..args.games {
        // Alternate seats each match so neither agent always moves first.
        let swap = game_idx % 2 == 1;
        let seat_to_spec = |seat: usize| if swap { 1 - seat } else { seat };

        let deck_seed = mix_seed(args.seed, game_idx as u64, 0x5EED_15);
        let mut game = GameState::builder().with_seed(deck_seed).build()?;
        let mut agents: Vec<Box<dyn Agent>> = Vec::with_capacity(2);
        for seat in 0..2 {
            let spec = &args.specs[seat_to_spec(seat)];
            let agent_seed = mix_seed(args.seed, game_idx as u64, seat as u64);
            agents.push(create_agent_from_spec(spec, seat, agent_seed)?);
        }

        let mut turns = 0usize;
        while !game.is_finished() && turns < args.max_turns {
            let current = game.current_player();
            let spec_idx = seat_to_spec(current);

            let view = game.state_view();
            let legal = game.legal_plays();
            let (features, mask) = play_features(&view, &legal);
            let t0 = Instant::now();
            let choice = agents[current].pick_play(&features, &mask);
            tallies[spec_idx].decision_time_ns += t0.elapsed().as_nanos();
            tallies[spec_idx].decisions += 1;
            let play = PlaySpace::index_to_action(choice)
                .ok_or("agent returned an out-of-range play index")?;
            game.play_or_discard(play.card, play.is_discard)?;

            let view = game.state_view();
            let legal = game.legal_draws();
            let (features, mask) = draw_features(&view, &legal);
            let t0 = Instant::now();
            let choice = agents[current].pick_draw(&features, &mask);
            tallies[spec_idx].decision_time_ns += t0.elapsed().as_nanos();
            tallies[spec_idx].decisions += 1;
            let draw = DrawSpace::index_to_choice(choice)
                .ok_or("agent returned an out-of-range draw index")?;
            game.draw_replacement(draw)?;

            turns += 1;
            if game.is_finished() {
                break;
            }
            game.end_sub_turn()?;
        }

        if !game.is_finished() {
            aborted_games += 1;
            continue;
        }

        let view = game.state_view();
        let mut player0_delta = score_delta(&view) as i64;
        if view.current_player == 1 {
            player0_delta = -player0_delta;
        }
        tallies[seat_to_spec(0)].total_delta += player0_delta;
        tallies[seat_to_spec(1)].total_delta -= player0_delta;
        match player0_delta.cmp(&0) {
            std::cmp::Ordering::Greater => tallies[seat_to_spec(0)].wins += 1,
            std::cmp::Ordering::Less => tallies[seat_to_spec(1)].wins += 1,
            std::cmp::Ordering::Equal => {
                tallies[seat_to_spec(0)].ties += 1;
                tallies[seat_to_spec(1)].ties += 1;
            }
        }
    }

    let completed = args.games - aborted_games;
    println!("Results over {completed} completed matches:");
    for tally in &tallies {
        let rate = if completed > 0 {
            tally.wins as f64 / completed as f64
        } else {
            0.0
        };
        let avg_delta = if completed > 0 {
            tally.total_delta as f64 / completed as f64
        } else {
            0.0
        };
        println!(
            "  {:<12}  wins {}/{completed}  ({:.2}%)   ties: {}   avg score delta: {:+.2}",
            tally.label,
            tally.wins,
            rate * 100.0,
            tally.ties,
            avg_delta,
        );
    }
    if aborted_games > 0 {
        println!("\nNote: {aborted_games} match(es) hit the turn cap and were aborted.");
    }

    if !tallies.iter().all(|tally| tally.decisions == 0) {
        println!("\nDecision time (per agent):");
        for tally in &tallies {
            let total_ms = tally.decision_time_ns as f64 / 1.0e6;
            let avg_ms = if tally.decisions > 0 {
                total_ms / tally.decisions as f64
            } else {
                0.0
            };
            println!(
                "  {:<12}  decisions: {:<7}  total: {total_ms:.3} ms  avg: {avg_ms:.3} ms",
                tally.label, tally.decisions
            );
        }
    }

    if !args.no_chart {
        render_bar_chart(&args.out, &tallies, completed)?;
        println!("\nChart written to {}", args.out.display());
    }
    Ok(())
}

fn mix_seed(base: u64, a: u64, b: u64) -> u64 {
    let mut z =
        base ^ (a.wrapping_mul(0x9E37_79B97F4A7C15)) ^ (b.wrapping_mul(0xBF58_476D1CE4E5B9));
    z ^= z >> 12;
    z ^= z << 25;
    z ^= z >> 27;
    z
}

fn render_bar_chart(
    out: &PathBuf,
    tallies: &[SeatTally],
    completed: usize,
) -> Result<(), Box<dyn Error>> {
    let labels: Vec<String> = tallies.iter().map(|tally| tally.label.clone()).collect();
    let values: Vec<f64> = tallies
        .iter()
        .map(|tally| {
            if completed > 0 {
                tally.wins as f64 / completed as f64 * 100.0
            } else {
                0.0
            }
        })
        .collect();

    let root = BitMapBackend::new(out, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| format!("{e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Agent win rates", ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0..labels.len(), 0.0f64..100.0)
        .map_err(|e| format!("{e}"))?;

    chart
        .configure_mesh()
        .y_desc("Win rate (%)")
        .x_desc("Agent")
        .x_labels(labels.len())
        .x_label_formatter(&|idx| {
            if *idx < labels.len() {
                labels[*idx].clone()
            } else {
                idx.to_string()
            }
        })
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()
        .map_err(|e| format!("{e}"))?;

    for (i, value) in values.iter().enumerate() {
        let rect = Rectangle::new([(i, 0.0), (i, *value)], BLUE.filled());
        chart
            .draw_series(std::iter::once(rect))
            .map_err(|e| format!("{e}"))?;
    }

    root.present().map_err(|e| format!("{e}"))?;
    Ok(())
}
