use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use burn::data::dataloader::Progress;
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, LearningRate};
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use burn_train::Interrupter;
use burn_train::logger::{FileMetricLogger, MetricLogger};
use burn_train::metric::{MetricEntry, NumericEntry};
use burn_train::renderer::tui::TuiMetricsRenderer;
use burn_train::renderer::{MetricState, MetricsRendererTraining, TrainingProgress};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use stackduel::ml::{
    DRAW_OPTIONS, DrawSpace, PLAY_ACTIONS, PlaySpace, PolicyDataset, PolicyNetwork, PolicySample,
    PolicyTrainer, TrainingEpochMetrics, TrainingLoopConfig, draw_features, play_features,
};
use stackduel::{
    Agent, DEFAULT_HIDDEN, DEFAULT_STACK, GameState, MinAgent, PolicyAgent, RandomAgent,
    score_delta,
};

type TrainBackend = Autodiff<NdArray<f32>>;
type InferenceBackend = NdArray<f32>;
type PolicyRecord = <PolicyNetwork<InferenceBackend> as Module<InferenceBackend>>::Record;

#[derive(Parser, Debug)]
#[command(
    about = "Train play/draw policy networks from self-play using the Burn framework",
    version,
    author
)]
struct TrainArgs {
    /// Number of self-play matches to collect.
    #[arg(long = "games", default_value_t = 512)]
    games: usize,
    /// Mini-batch size used during optimization.
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    /// Number of training epochs per head.
    #[arg(long, default_value_t = 20)]
    epochs: usize,
    /// Hidden layer width for both policy networks.
    #[arg(long, default_value_t = DEFAULT_HIDDEN)]
    hidden: usize,
    /// Number of hidden layers (stack depth) for both policy networks.
    #[arg(long, default_value_t = DEFAULT_STACK)]
    depth: usize,
    /// Learning rate passed to the Adam optimizer.
    #[arg(long, default_value_t = 1.0e-3)]
    learning_rate: f32,
    /// Fraction of the dataset to hold out for validation (0.0 - 0.5).
    #[arg(long, default_value_t = 0.1)]
    validation_split: f32,
    /// Directory where checkpoints will be written.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Exploration probability applied during data collection.
    #[arg(long, default_value_t = 0.05)]
    exploration: f32,
    /// Weight multiplier applied to moves made by the match winner.
    #[arg(long, default_value_t = 2.0)]
    winner_weight: f32,
    /// Weight multiplier applied to moves made by the loser.
    #[arg(long, default_value_t = 1.0)]
    loser_weight: f32,
    /// Weight multiplier applied when a match ties or is aborted.
    #[arg(long, default_value_t = 1.0)]
    tie_weight: f32,
    /// Cap on sub-turns per match during collection.
    #[arg(long, default_value_t = 500)]
    max_turns: usize,
    /// Master seed controlling reproducibility.
    #[arg(long, default_value_t = 0xA11C_E5EE_DF00_Du64)]
    seed: u64,
    /// Scripted policy used to generate training data.
    #[arg(long, value_enum, default_value_t = TeacherKind::Min)]
    teacher: TeacherKind,
    /// Early stopping patience (epochs without validation improvement).
    #[arg(long)]
    patience: Option<usize>,
    /// Number of evaluation matches against the random agent after training.
    #[arg(long, default_value_t = 50)]
    eval_games: usize,
    /// Resume training from a checkpoint (.bin) created by this program.
    #[arg(long)]
    resume: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum, Serialize, Deserialize)]
enum TeacherKind {
    Min,
    Random,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PolicyMetadata {
    hidden: usize,
    depth: usize,
    learning_rate: f32,
    epochs: usize,
    batch_size: usize,
    games: usize,
    seed: u64,
    dataset_seed: u64,
    play_train_samples: usize,
    play_validation_samples: usize,
    draw_train_samples: usize,
    draw_validation_samples: usize,
    exploration: f32,
    teacher: TeacherKind,
    winner_weight: f32,
    loser_weight: f32,
    tie_weight: f32,
    max_turns: usize,
    patience: Option<usize>,
    play_best_validation_loss: Option<f32>,
    draw_best_validation_loss: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct PolicyCheckpoint {
    metadata: PolicyMetadata,
    play_weights: Vec<u8>,
    draw_weights: Vec<u8>,
}

struct PendingSubTurn {
    player: usize,
    play: PolicySample<PLAY_ACTIONS>,
    draw: PolicySample<DRAW_OPTIONS>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = TrainArgs::parse();
    validate_args(&args)?;

    let resume_checkpoint: Option<PolicyCheckpoint> = match args.resume.as_ref() {
        Some(path) => Some(load_checkpoint(path)?),
        None => None,
    };
    let output_dir = if let Some(dir) = args.output.clone() {
        dir
    } else if let Some(ref ckpt_path) = args.resume {
        ckpt_path.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        PathBuf::from("checkpoints")
    };
    fs::create_dir_all(&output_dir)?;

    let mut master_rng = StdRng::seed_from_u64(args.seed);
    let dataset_seed = resume_checkpoint
        .as_ref()
        .map(|ckpt| ckpt.metadata.dataset_seed)
        .unwrap_or_else(|| master_rng.next_u64());
    let hidden = resume_checkpoint
        .as_ref()
        .map(|ckpt| ckpt.metadata.hidden)
        .unwrap_or(args.hidden);
    let depth = resume_checkpoint
        .as_ref()
        .map(|ckpt| ckpt.metadata.depth)
        .unwrap_or(args.depth);

    println!("Collecting {} self-play matches (seed {dataset_seed:#x})...", args.games);
    let (play_raw, draw_raw) = collect_datasets(&args, dataset_seed)?;
    if play_raw.is_empty() || draw_raw.is_empty() {
        return Err("data collection returned an empty dataset".into());
    }

    let mut split_rng = StdRng::seed_from_u64(dataset_seed ^ 0x5EED_B07);
    let (mut play_train, play_validation) = play_raw.split(args.validation_split, &mut split_rng);
    let play_validation = (!play_validation.is_empty()).then_some(play_validation);
    let (mut draw_train, draw_validation) = draw_raw.split(args.validation_split, &mut split_rng);
    let draw_validation = (!draw_validation.is_empty()).then_some(draw_validation);
    println!(
        "  play head -> train: {} | validation: {}",
        play_train.len(),
        play_validation.as_ref().map(|ds| ds.len()).unwrap_or(0),
    );
    println!(
        "  draw head -> train: {} | validation: {}",
        draw_train.len(),
        draw_validation.as_ref().map(|ds| ds.len()).unwrap_or(0),
    );

    let learning_rate: LearningRate = args.learning_rate as f64;

    let mut play_model = PolicyNetwork::<TrainBackend>::new(hidden, depth, PLAY_ACTIONS);
    let mut draw_model = PolicyNetwork::<TrainBackend>::new(hidden, depth, DRAW_OPTIONS);
    if let Some(ref ckpt) = resume_checkpoint {
        play_model = load_weights(play_model, &ckpt.play_weights)?;
        draw_model = load_weights(draw_model, &ckpt.draw_weights)?;
        println!(
            "  resumed from checkpoint (hidden={}, depth={}, best_val={:?}/{:?})",
            ckpt.metadata.hidden,
            ckpt.metadata.depth,
            ckpt.metadata.play_best_validation_loss,
            ckpt.metadata.draw_best_validation_loss,
        );
    }

    let mut play_trainer = PolicyTrainer::<TrainBackend, PLAY_ACTIONS>::with_config(
        play_model,
        AdamConfig::new(),
        learning_rate,
    );
    let mut draw_trainer = PolicyTrainer::<TrainBackend, DRAW_OPTIONS>::with_config(
        draw_model,
        AdamConfig::new(),
        learning_rate,
    );
    let loop_config = TrainingLoopConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
    };

    let mut training_rng = StdRng::seed_from_u64(dataset_seed ^ 0x9E37_79B9);
    let play_outcome = train_head(
        "play",
        &output_dir,
        &mut play_trainer,
        &mut play_train,
        play_validation.as_ref(),
        loop_config,
        &mut training_rng,
        args.patience,
        resume_checkpoint
            .as_ref()
            .and_then(|ckpt| ckpt.metadata.play_best_validation_loss),
    )?;
    let draw_outcome = train_head(
        "draw",
        &output_dir,
        &mut draw_trainer,
        &mut draw_train,
        draw_validation.as_ref(),
        loop_config,
        &mut training_rng,
        args.patience,
        resume_checkpoint
            .as_ref()
            .and_then(|ckpt| ckpt.metadata.draw_best_validation_loss),
    )?;

    let play_inference = play_trainer.model().clone().valid();
    let draw_inference = draw_trainer.model().clone().valid();

    let metadata = PolicyMetadata {
        hidden,
        depth,
        learning_rate: args.learning_rate,
        epochs: args.epochs,
        batch_size: args.batch_size,
        games: args.games,
        seed: args.seed,
        dataset_seed,
        play_train_samples: play_train.len(),
        play_validation_samples: play_validation.as_ref().map(|ds| ds.len()).unwrap_or(0),
        draw_train_samples: draw_train.len(),
        draw_validation_samples: draw_validation.as_ref().map(|ds| ds.len()).unwrap_or(0),
        exploration: args.exploration,
        teacher: args.teacher,
        winner_weight: args.winner_weight,
        loser_weight: args.loser_weight,
        tie_weight: args.tie_weight,
        max_turns: args.max_turns,
        patience: args.patience,
        play_best_validation_loss: play_outcome.best_validation_loss,
        draw_best_validation_loss: draw_outcome.best_validation_loss,
    };
    let checkpoint = PolicyCheckpoint {
        metadata,
        play_weights: record_weights(&play_inference)?,
        draw_weights: record_weights(&draw_inference)?,
    };
    let bytes = bincode::serde::encode_to_vec(&checkpoint, bincode::config::standard())?;
    let path = output_dir.join("policy.bin");
    fs::write(&path, bytes)?;
    println!("Checkpoint saved -> {}", path.display());

    if args.eval_games > 0 {
        let mean_delta = evaluate_against_random(
            play_inference,
            draw_inference,
            args.eval_games,
            args.max_turns,
            dataset_seed ^ 0xE7A1_5EED,
        )?;
        println!(
            "Eval: mean score delta vs random over {} matches: {mean_delta:+.2}",
            args.eval_games
        );
    }
    Ok(())
}

struct HeadOutcome {
    best_validation_loss: Option<f32>,
}

/// Runs the epoch loop for one head with live TUI rendering, file metric
/// logs compatible with the Burn dashboard, and optional early stopping.
#[allow(clippy::too_many_arguments)]
fn train_head<const A: usize>(
    name: &str,
    output_dir: &Path,
    trainer: &mut PolicyTrainer<TrainBackend, A>,
    train: &mut PolicyDataset<A>,
    validation: Option<&PolicyDataset<A>>,
    config: TrainingLoopConfig,
    rng: &mut StdRng,
    patience: Option<usize>,
    resume_best: Option<f32>,
) -> Result<HeadOutcome, Box<dyn Error>> {
    let run_dir = output_dir.join(format!("burn-run-{name}"));
    let train_log_dir = run_dir.join("train");
    let valid_log_dir = run_dir.join("valid");
    fs::create_dir_all(&train_log_dir)?;
    fs::create_dir_all(&valid_log_dir)?;
    let mut train_logger = FileMetricLogger::new_train(&train_log_dir);
    let mut valid_logger = FileMetricLogger::new_eval(&valid_log_dir);
    let mut tui = TuiMetricsRenderer::new(Interrupter::default(), Some(config.epochs)).persistent();

    let train_len = train.len();
    let epochs_total = config.epochs;
    let mut best_val: Option<f32> = resume_best;
    let mut epochs_no_improve = 0usize;

    let history = trainer.fit_streaming(
        train,
        validation,
        config,
        rng,
        |metrics| {
            if metrics.batches > 0 && metrics.samples > 0 {
                let serialize = format!("{:.8},{}", metrics.train_loss as f64, metrics.samples);
                let entry = MetricEntry::new(
                    "Loss".to_string().into(),
                    format!(
                        "epoch {:.6} (batches {}, samples {})",
                        metrics.train_loss, metrics.batches, metrics.samples
                    ),
                    serialize,
                );
                train_logger.log(&entry);
                let num = NumericEntry::Value(metrics.train_loss as f64);
                tui.update_train(MetricState::Numeric(entry, num));
                tui.render_train(TrainingProgress {
                    progress: Progress {
                        items_processed: metrics.samples,
                        items_total: train_len,
                    },
                    epoch: metrics.epoch,
                    epoch_total: epochs_total,
                    iteration: metrics.batches,
                });
            }
            let mut proceed = true;
            if let Some(val_loss) = metrics.validation_loss {
                let val_samples = validation.map(|ds| ds.len()).unwrap_or(0).max(1);
                let serialize = format!("{:.8},{}", val_loss as f64, val_samples);
                let entry = MetricEntry::new(
                    "Loss".to_string().into(),
                    format!("epoch {:.6} (samples {})", val_loss, val_samples),
                    serialize,
                );
                valid_logger.log(&entry);
                let num_val = NumericEntry::Value(val_loss as f64);
                tui.update_valid(MetricState::Numeric(entry, num_val));
                tui.render_valid(TrainingProgress {
                    progress: Progress {
                        items_processed: val_samples,
                        items_total: val_samples,
                    },
                    epoch: metrics.epoch,
                    epoch_total: epochs_total,
                    iteration: metrics.batches,
                });
                let improved = best_val.map(|best| val_loss < best).unwrap_or(true);
                if improved {
                    best_val = Some(val_loss);
                    epochs_no_improve = 0;
                } else if let Some(patience) = patience {
                    epochs_no_improve += 1;
                    if epochs_no_improve >= patience {
                        proceed = false;
                    }
                }
            }
            train_logger.end_epoch(metrics.epoch);
            proceed
        },
        None,
    );
    let _ = tui.on_train_end(None);

    let final_metrics: Option<&TrainingEpochMetrics> = history.last();
    if let Some(metrics) = final_metrics {
        println!(
            "  {name} head: {} epochs, final train loss {:.6}, validation {:?}",
            history.len(),
            metrics.train_loss,
            metrics.validation_loss,
        );
    }
    Ok(HeadOutcome { best_validation_loss: best_val })
}

fn validate_args(args: &TrainArgs) -> Result<(), Box<dyn Error>> {
    if args.games == 0 {
        return Err("games must be positive".into());
    }
    if args.batch_size == 0 {
        return Err("batch size must be positive".into());
    }
    if !(0.0..1.0).contains(&args.validation_split) {
        return Err("validation split must be in [0, 1)".into());
    }
    if !(0.0..=1.0).contains(&args.exploration) {
        return Err("exploration rate must be between 0 and 1".into());
    }
    if args.learning_rate <= 0.0 {
        return Err("learning rate must be positive".into());
    }
    if args.max_turns == 0 {
        return Err("max-turns must be positive".into());
    }
    Ok(())
}

fn load_checkpoint(path: &Path) -> Result<PolicyCheckpoint, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    let (ckpt, _): (PolicyCheckpoint, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
    Ok(ckpt)
}

fn load_weights(
    model: PolicyNetwork<TrainBackend>,
    weights: &[u8],
) -> Result<PolicyNetwork<TrainBackend>, Box<dyn Error>> {
    let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
    let record = BinBytesRecorder::<FullPrecisionSettings>::new()
        .load::<<PolicyNetwork<TrainBackend> as Module<TrainBackend>>::Record>(
            weights.to_vec(),
            &device,
        )?;
    Ok(model.load_record(record))
}

fn record_weights(model: &PolicyNetwork<InferenceBackend>) -> Result<Vec<u8>, Box<dyn Error>> {
    let record: PolicyRecord = model.clone().into_record();
    BinBytesRecorder::<FullPrecisionSettings>::new()
        .record(record, ())
        .map_err(|err| -> Box<dyn Error> { Box::new(err) })
}

fn collect_datasets(
    args: &TrainArgs,
    dataset_seed: u64,
) -> Result<(PolicyDataset<PLAY_ACTIONS>, PolicyDataset<DRAW_OPTIONS>), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(dataset_seed);
    let mut play_dataset = PolicyDataset::new();
    let mut draw_dataset = PolicyDataset::new();

    for game_index in 0..args.games {
        let game_seed = rng.next_u64();
        let mut game = GameState::builder().with_seed(game_seed).build()?;
        let mut agent = build_teacher_agent(args.teacher, dataset_seed, &mut rng);
        let mut trajectory: Vec<PendingSubTurn> = Vec::new();
        let mut turns = 0usize;

        while !game.is_finished() && turns < args.max_turns {
            let player = game.current_player();

            let view = game.state_view();
            let legal = game.legal_plays();
            let (features, mask) = play_features(&view, &legal);
            let play_choice = pick_with_exploration(
                agent.as_mut(),
                &mut rng,
                args.exploration,
                &legal,
                |agent| agent.pick_play(&features, &mask),
                |action| PlaySpace::action_index(action),
            );
            let play_sample = PolicySample::from_choice(features, mask, play_choice, 1.0);
            let play = PlaySpace::index_to_action(play_choice)
                .ok_or("teacher agent returned an out-of-range play index")?;
            game.play_or_discard(play.card, play.is_discard)?;

            let view = game.state_view();
            let legal = game.legal_draws();
            let (features, mask) = draw_features(&view, &legal);
            let draw_choice = pick_with_exploration(
                agent.as_mut(),
                &mut rng,
                args.exploration,
                &legal,
                |agent| agent.pick_draw(&features, &mask),
                |choice| DrawSpace::choice_index(choice),
            );
            let draw_sample = PolicySample::from_choice(features, mask, draw_choice, 1.0);
            let draw = DrawSpace::index_to_choice(draw_choice)
                .ok_or("teacher agent returned an out-of-range draw index")?;
            game.draw_replacement(draw)?;

            trajectory.push(PendingSubTurn {
                player,
                play: play_sample,
                draw: draw_sample,
            });
            turns += 1;
            if game.is_finished() {
                break;
            }
            game.end_sub_turn()?;
        }

        let winner = if game.is_finished() {
            let view = game.state_view();
            let mut player0_delta = score_delta(&view);
            if view.current_player == 1 {
                player0_delta = -player0_delta;
            }
            match player0_delta.cmp(&0) {
                std::cmp::Ordering::Greater => Some(0),
                std::cmp::Ordering::Less => Some(1),
                std::cmp::Ordering::Equal => None,
            }
        } else {
            None
        };
        for sub_turn in trajectory {
            let weight = match winner {
                Some(id) if id == sub_turn.player => args.winner_weight,
                Some(_) => args.loser_weight,
                None => args.tie_weight,
            }
            .max(0.0);
            let mut play = sub_turn.play;
            play.weight = weight;
            play_dataset.push(play);
            let mut draw = sub_turn.draw;
            draw.weight = weight;
            draw_dataset.push(draw);
        }
        if (game_index + 1) % 50 == 0 {
            println!(
                "  collected matches: {}/{} (samples: {} play / {} draw)",
                game_index + 1,
                args.games,
                play_dataset.len(),
                draw_dataset.len(),
            );
        }
    }
    Ok((play_dataset, draw_dataset))
}

fn build_teacher_agent(kind: TeacherKind, base_seed: u64, rng: &mut StdRng) -> Box<dyn Agent> {
    match kind {
        TeacherKind::Min => Box::new(MinAgent::new()),
        TeacherKind::Random => {
            let seed = rng.next_u64() ^ base_seed;
            Box::new(RandomAgent::new(StdRng::seed_from_u64(seed)))
        }
    }
}

/// With probability `exploration` the scripted choice is replaced by a
/// uniformly random legal action, keeping some off-policy coverage in the
/// dataset.
fn pick_with_exploration<T>(
    agent: &mut dyn Agent,
    rng: &mut StdRng,
    exploration: f32,
    legal: &[T],
    scripted: impl FnOnce(&mut dyn Agent) -> usize,
    to_index: impl Fn(&T) -> usize,
) -> usize {
    if !legal.is_empty() && rng.gen_range(0.0..1.0) < exploration {
        to_index(&legal[rng.gen_range(0..legal.len())])
    } else {
        scripted(agent)
    }
}

fn evaluate_against_random(
    play: PolicyNetwork<InferenceBackend>,
    draw: PolicyNetwork<InferenceBackend>,
    games: usize,
    max_turns: usize,
    seed: u64,
) -> Result<f64, Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut policy_agent = PolicyAgent::new(play, draw);
    let mut total_delta = 0i64;
    let mut completed = 0usize;

    for game_index in 0..games {
        // Alternate which seat the policy occupies.
        let policy_seat = game_index % 2;
        let mut game = GameState::builder().with_seed(rng.next_u64()).build()?;
        let mut random_agent = RandomAgent::new(StdRng::seed_from_u64(rng.next_u64()));
        let mut turns = 0usize;

        while !game.is_finished() && turns < max_turns {
            let current = game.current_player();
            let view = game.state_view();
            let legal = game.legal_plays();
            let (features, mask) = play_features(&view, &legal);
            let choice = if current == policy_seat {
                policy_agent.pick_play(&features, &mask)
            } else {
                random_agent.pick_play(&features, &mask)
            };
            let action = PlaySpace::index_to_action(choice)
                .ok_or("agent returned an out-of-range play index")?;
            game.play_or_discard(action.card, action.is_discard)?;

            let view = game.state_view();
            let legal = game.legal_draws();
            let (features, mask) = draw_features(&view, &legal);
            let choice = if current == policy_seat {
                policy_agent.pick_draw(&features, &mask)
            } else {
                random_agent.pick_draw(&features, &mask)
            };
            let draw_choice = DrawSpace::index_to_choice(choice)
                .ok_or("agent returned an out-of-range draw index")?;
            game.draw_replacement(draw_choice)?;

            turns += 1;
            if game.is_finished() {
                break;
            }
            game.end_sub_turn()?;
        }
        if !game.is_finished() {
            continue;
        }
        let view = game.state_view();
        let mut delta = score_delta(&view) as i64;
        // Normalize to the policy agent's perspective.
        if view.current_player != policy_seat {
            delta = -delta;
        }
        total_delta += delta;
        completed += 1;
    }
    if completed == 0 {
        return Err("no evaluation match ran to completion".into());
    }
    Ok(total_delta as f64 / completed as f64)
}
