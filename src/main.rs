use std::time::{Duration, Instant};

use ai_2048_td::agent::Player;
use ai_2048_td::config::{EnvironmentConfig, PlayerConfig};
use ai_2048_td::engine as GameEngine;
use ai_2048_td::episode::{evaluate_parallel, play_episode, BlockSummary, DEFAULT_OPENING};
use ai_2048_td::weights::WeightStore;
use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "td-2048", about = "Train and evaluate an n-tuple TD player")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Hide the progress bar
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Self-play training with a learning player
    Train {
        #[arg(long, default_value_t = 1000)]
        episodes: u64,
        /// Episodes per logged summary block
        #[arg(long, default_value_t = 100)]
        block: u64,
        /// Player options, e.g. "alpha=0.01 init=15x12 load=w.bin save=w.bin"
        #[arg(long, default_value = "")]
        player: String,
        /// Environment options, e.g. "seed=7 bonus_trip=21"
        #[arg(long, default_value = "")]
        env: String,
        /// Environment placements before the first slide
        #[arg(long, default_value_t = DEFAULT_OPENING)]
        opening: usize,
    },
    /// Greedy evaluation of saved weights, games run in parallel
    Evaluate {
        #[arg(long)]
        weights: std::path::PathBuf,
        /// Topology the weights were trained with
        #[arg(long, default_value = "default")]
        init: String,
        #[arg(long, default_value_t = 1000)]
        games: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = "")]
        env: String,
        #[arg(long, default_value_t = DEFAULT_OPENING)]
        opening: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
    GameEngine::new();

    match args.cmd {
        Cmd::Train { episodes, block, player, env, opening } => {
            train(episodes, block.max(1), &player, &env, opening, args.quiet)
        }
        Cmd::Evaluate { weights, init, games, seed, env, opening } => {
            evaluate(&weights, &init, games, seed, &env, opening)
        }
    }
}

fn train(episodes: u64, block: u64, player: &str, env: &str, opening: usize, quiet: bool) -> anyhow::Result<()> {
    let player_config: PlayerConfig = player.parse().context("parsing --player")?;
    let env_config: EnvironmentConfig = env.parse().context("parsing --env")?;
    if player_config.save.is_none() {
        warn!("no save= path given, trained weights will be discarded");
    }
    let mut player = Player::from_config(&player_config)?;
    let mut env = env_config.build().context("building the environment")?;
    info!(episodes, block, opening, bag = ?env_config.bag, "training");

    let pb = if !quiet {
        let pb = ProgressBar::new(episodes);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let mut summary = BlockSummary::default();
    for episode in 0..episodes {
        let stats = play_episode(&mut player, &mut env, opening);
        summary.record(&stats);
        if let Some(pb) = &pb {
            pb.inc(1);
            pb.set_message(format!("mean {:.0} | top {}", summary.mean_score(), 1u32 << summary.max_rank));
        }
        if (episode + 1) % block == 0 || episode + 1 == episodes {
            let first = episode + 1 - summary.games as u64;
            if let Some(pb) = &pb {
                pb.suspend(|| summary.log(first));
            } else {
                summary.log(first);
            }
            summary = BlockSummary::default();
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    info!(elapsed_s = start.elapsed().as_secs_f64(), "training finished");
    player.finish().context("saving weights")?;
    Ok(())
}

fn evaluate(
    weights: &std::path::Path,
    init: &str,
    games: usize,
    seed: u64,
    env: &str,
    opening: usize,
) -> anyhow::Result<()> {
    let topology = init.parse().context("parsing --init")?;
    let env_config: EnvironmentConfig = env.parse().context("parsing --env")?;
    let store = WeightStore::load(weights, topology)
        .with_context(|| format!("loading {}", weights.display()))?;

    let start = Instant::now();
    let results = evaluate_parallel(&store, &env_config, games, seed, opening)
        .context("building the environment")?;
    let mut summary = BlockSummary::default();
    for stats in &results {
        summary.record(stats);
    }
    summary.log(0);
    info!(games, elapsed_s = start.elapsed().as_secs_f64(), "evaluation finished");
    Ok(())
}
