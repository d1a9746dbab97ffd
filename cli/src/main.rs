use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tiered_queue_sim_core::models::{TierDescriptor, TierId, Transition};
use tiered_queue_sim_core::orchestrator::{Ensemble, EnsembleConfig, RoundResult};
use tiered_queue_sim_core::{capacity, TransitionObserver};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tqsim", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print how many slots fit in a rectangle.
    Capacity(CapacityArgs),
    /// Run an ensemble and stream transitions as JSON lines.
    Run(RunArgs),
    /// Run an ensemble and print its snapshot JSON.
    Snapshot(RunArgs),
}

#[derive(Parser, Debug)]
struct CapacityArgs {
    #[arg(long)]
    width: f64,

    #[arg(long)]
    height: f64,

    #[arg(long, default_value_t = 0.12)]
    spacing: f64,

    #[arg(long, default_value_t = 0.1)]
    margin: f64,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Ensemble config JSON.
    #[arg(long, conflicts_with_all = ["reference", "randomized"])]
    config: Option<PathBuf>,

    /// Use the built-in three-tier scripted scenario.
    #[arg(long, conflicts_with = "randomized")]
    reference: bool,

    /// Use the built-in three-tier random-arrival ensemble.
    #[arg(long)]
    randomized: bool,

    /// Rounds to run. Defaults to the scenario length, or 20 without one.
    #[arg(long)]
    rounds: Option<usize>,

    /// Override the config's RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Output path (stdout if omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Capacity(args) => cmd_capacity(args),
        Command::Run(args) => cmd_run(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn cmd_capacity(args: CapacityArgs) -> anyhow::Result<()> {
    let dims = capacity(args.width, args.height, args.spacing, args.margin);
    let slots = dims.checked_capacity().with_context(|| {
        format!("{} columns x {} rows overflows the slot count", dims.columns, dims.rows)
    })?;
    println!("{} columns x {} rows = {} slots", dims.columns, dims.rows, slots);
    Ok(())
}

fn load_config(args: &RunArgs) -> anyhow::Result<EnsembleConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            EnsembleConfig::from_json(&json)
                .with_context(|| format!("parse config '{}'", path.display()))?
        }
        None if args.randomized => EnsembleConfig::randomized(args.seed.unwrap_or(42)),
        None if args.reference => EnsembleConfig::reference(),
        None => anyhow::bail!("one of --config, --reference or --randomized is required"),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    Ok(config)
}

fn open_output(out: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let file =
                File::create(path).with_context(|| format!("create '{}'", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

const UNSCRIPTED_ROUNDS: usize = 20;

fn drive(ensemble: &mut Ensemble, rounds: Option<usize>) -> anyhow::Result<()> {
    match rounds {
        Some(n) => ensemble.run_rounds(n)?,
        None if ensemble.config().scenario.is_empty() => ensemble.run_rounds(UNSCRIPTED_ROUNDS)?,
        None => ensemble.run_scenario()?,
    };
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let writer = open_output(args.out.as_deref())?;

    let observers: Vec<Box<dyn TransitionObserver>> = vec![Box::new(JsonLines::new(writer))];
    let mut ensemble = Ensemble::with_observers(config, observers)?;
    drive(&mut ensemble, args.rounds)?;

    for stats in ensemble.stats() {
        tracing::info!(
            tier = %stats.id,
            label = %stats.label,
            backlog = stats.backlog_len,
            active = stats.active_len,
            confirmed = stats.confirmed_len,
            "final state"
        );
    }
    Ok(())
}

fn cmd_snapshot(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let mut ensemble = Ensemble::new(config)?;
    drive(&mut ensemble, args.rounds)?;

    let json = ensemble.snapshot()?.to_json()?;
    let mut writer = open_output(args.out.as_deref())?;
    writeln!(writer, "{}", json).context("write snapshot")?;
    writer.flush().context("flush snapshot")?;
    Ok(())
}

// ============================================================================
// JSON-lines observer
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Tier(&'a TierDescriptor),
    Transition {
        round: usize,
        tier: TierId,
        #[serde(flatten)]
        transition: &'a Transition,
    },
    Round(&'a RoundResult),
}

/// Writes one JSON object per line; the first write error is logged and
/// further output is dropped.
struct JsonLines {
    writer: Box<dyn Write>,
    failed: bool,
}

impl JsonLines {
    fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    fn emit(&mut self, line: &Line<'_>) {
        if self.failed {
            return;
        }
        let result = serde_json::to_writer(&mut self.writer, line)
            .map_err(io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            tracing::error!(error = %e, "output write failed");
            self.failed = true;
        }
    }
}

impl TransitionObserver for JsonLines {
    fn tier_configured(&mut self, descriptor: &TierDescriptor) {
        self.emit(&Line::Tier(descriptor));
    }

    fn transitions(&mut self, round: usize, tier: TierId, transitions: &[Transition]) {
        for transition in transitions {
            self.emit(&Line::Transition {
                round,
                tier,
                transition,
            });
        }
    }

    fn round_completed(&mut self, result: &RoundResult) {
        self.emit(&Line::Round(result));
        if let Err(e) = self.writer.flush() {
            tracing::error!(error = %e, "output flush failed");
            self.failed = true;
        }
    }
}
