use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use threes_tdl::agent::{RandomPlacer, TdlAgent};
use threes_tdl::engine::{self as GameEngine, Board};
use threes_tdl::episode::Episode;
use threes_tdl::evaluate::evaluate;
use threes_tdl::network::Network;
use threes_tdl::stats::{BlockSummary, Statistics};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "threes-tdl", about = "Train and evaluate an n-tuple TD(0) player for Threes!")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Train the TD slider against the random placer
    Train {
        /// Episodes to play
        #[arg(long, default_value_t = 1000)]
        total: usize,
        /// Episodes per statistics block
        #[arg(long, default_value_t = 1000)]
        block: usize,
        /// Slider arguments, e.g. "alpha=0.1 load=w.bin save=w.bin"
        #[arg(long, default_value = "")]
        slide: String,
        /// Placer arguments, e.g. "seed=1"
        #[arg(long, default_value = "")]
        place: String,
        /// Append block summaries to this file as JSON lines
        #[arg(long)]
        stats_out: Option<PathBuf>,
        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },
    /// Play greedy games with saved weights
    Eval {
        #[arg(long, default_value_t = 100)]
        games: usize,
        /// Weight file written by `train`
        #[arg(long)]
        weights: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Worker threads (default: one per core)
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("threes_tdl=info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    GameEngine::new();

    match args.cmd {
        Cmd::Train { total, block, slide, place, stats_out, quiet } => {
            train(total, block, &slide, &place, stats_out, quiet)
        }
        Cmd::Eval { games, weights, seed, threads } => eval(games, weights, seed, threads),
    }
}

fn train(
    total: usize,
    block: usize,
    slide: &str,
    place: &str,
    stats_out: Option<PathBuf>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut slider = TdlAgent::<Board>::new(slide).context("creating slider")?;
    let mut placer = RandomPlacer::new(place).context("creating placer")?;
    let mut stats = Statistics::new(total, block);
    if let Some(path) = &stats_out {
        stats = stats.with_output(path).with_context(|| format!("opening {}", path.display()))?;
    }

    let pb = if quiet { ProgressBar::hidden() } else { ProgressBar::new(total as u64) };
    pb.set_style(
        ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} | {msg}")?
            .progress_chars("=> ")
            .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
    );
    while !stats.is_finished() {
        let ep = Episode::play(&mut slider, &mut placer);
        if let Some(summary) = stats.push(ep.outcome())? {
            pb.set_message(format!("avg: {:.0} | max: {}", summary.avg_score, summary.max_score));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(())
}

fn eval(games: usize, weights: PathBuf, seed: u64, threads: Option<usize>) -> anyhow::Result<()> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
    }
    let mut network = Network::tdl();
    if !network.load(&weights)? {
        bail!("cannot open weights {}", weights.display());
    }

    let start = Instant::now();
    let episodes = evaluate(&network, games, seed)?;
    let mut stats = Statistics::new(episodes.len(), episodes.len());
    let mut summary = None;
    for ep in &episodes {
        summary = stats.push(ep.outcome())?.or(summary);
    }
    match summary {
        Some(s) => print_summary(&s, start.elapsed().as_secs_f64()),
        None => println!("no games played"),
    }
    Ok(())
}

fn print_summary(s: &BlockSummary, wall_s: f64) {
    println!(
        "Games: {} | avg: {:.1} | max: {} | slides/sec: {:.1} | wall: {:.2}s",
        s.episodes, s.avg_score, s.max_score, s.slides_per_sec, wall_s
    );
    for t in &s.tiles {
        println!("{:>6}  {:6.2}%  ({:6.2}%)", t.tile, t.reached * 100.0, t.share * 100.0);
    }
}
