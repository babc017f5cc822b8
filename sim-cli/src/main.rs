use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sim_config::load_world_config;
use sim_core::Simulation;
use sim_types::{MetricsSnapshot, WorldSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sim-cli")]
#[command(about = "DNA bots simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1_000)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Step {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = false)]
        print_state: bool,
    },
    /// Runs the simulation and prints the per-generation lifetimes.
    History {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 10_000)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    Benchmark {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1_000)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        bots: Option<u32>,
    },
    Export {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 50)]
        ticks: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = ExportFormat::Jsonl)]
        format: ExportFormat,
        #[arg(long)]
        out: PathBuf,
    },
    Replay {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Jsonl,
    Json,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ticks: u64,
    seed: u64,
    generation: u32,
    timelife: u64,
    alive: u32,
    generations_recorded: usize,
    halted: bool,
}

impl RunSummary {
    fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        Self {
            ticks: snapshot.metrics.ticks,
            seed: snapshot.rng_seed,
            generation: snapshot.generation,
            timelife: snapshot.timelife,
            alive: snapshot.metrics.agents_alive,
            generations_recorded: snapshot.history.len(),
            halted: snapshot.halted,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepSummary {
    ticks: u32,
    generation: u32,
    timelife: u64,
    instructions_last_tick: u64,
}

#[derive(Debug, Serialize)]
struct HistorySummary {
    seed: u64,
    generations: usize,
    best_timelife: Option<u64>,
    history: Vec<u64>,
}

#[derive(Debug, Serialize)]
struct BenchmarkSummary {
    ticks: u32,
    bots: u32,
    elapsed_ms: u128,
    avg_us_per_tick: f64,
    us_per_agent_tick: f64,
    final_metrics: MetricsSnapshot,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            format,
            out,
        } => run_command(config, ticks, seed, format, out),
        Commands::Step {
            config,
            ticks,
            seed,
            print_state,
        } => step_command(config, ticks, seed, print_state),
        Commands::History {
            config,
            ticks,
            seed,
        } => history_command(config, ticks, seed),
        Commands::Benchmark {
            config,
            ticks,
            seed,
            bots,
        } => benchmark_command(config, ticks, seed, bots),
        Commands::Export {
            config,
            ticks,
            seed,
            format,
            out,
        } => export_command(config, ticks, seed, format, out),
        Commands::Replay { input } => replay_command(input),
    }
}

fn build_simulation(config_path: Option<&Path>, seed: u64) -> Result<Simulation> {
    let cfg = load_world_config(config_path)?;
    Simulation::new(cfg, seed).context("failed to initialize simulation")
}

fn run_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut sim = build_simulation(config_path.as_deref(), seed)?;
    let deltas = sim.step_n(ticks);
    info!(ticks = deltas.len(), halted = sim.is_halted(), "run finished");
    let summary = RunSummary::from_snapshot(&sim.snapshot());

    let text = match format {
        OutputFormat::Pretty => format!(
            "ticks={} seed={} generation={} timelife={} alive={} generations_recorded={} halted={}",
            summary.ticks,
            summary.seed,
            summary.generation,
            summary.timelife,
            summary.alive,
            summary.generations_recorded,
            summary.halted
        ),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    write_output(text, out)
}

fn step_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    print_state: bool,
) -> Result<()> {
    let mut sim = build_simulation(config_path.as_deref(), seed)?;
    let deltas = sim.step_n(ticks.max(1));
    let snapshot = sim.snapshot();

    let summary = StepSummary {
        ticks: deltas.len() as u32,
        generation: snapshot.generation,
        timelife: snapshot.timelife,
        instructions_last_tick: snapshot.metrics.instructions_last_tick,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if print_state {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

fn history_command(config_path: Option<PathBuf>, ticks: u32, seed: u64) -> Result<()> {
    let mut sim = build_simulation(config_path.as_deref(), seed)?;
    sim.step_n(ticks);

    let history = sim.history().to_vec();
    let summary = HistorySummary {
        seed,
        generations: history.len(),
        best_timelife: history.iter().copied().max(),
        history,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn benchmark_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    bots: Option<u32>,
) -> Result<()> {
    let mut cfg = load_world_config(config_path.as_deref())?;
    if let Some(bots) = bots {
        cfg.bots_num = bots;
    }
    // Benchmarks should not stop early on the generation cap.
    cfg.max_generations = u32::MAX;

    let mut sim = Simulation::new(cfg.clone(), seed).context("failed to initialize simulation")?;
    let ticks = ticks.max(1);
    let start = Instant::now();
    sim.step_n(ticks);
    let elapsed = start.elapsed();

    let agent_ticks = f64::from(cfg.bots_num) * f64::from(ticks);
    let summary = BenchmarkSummary {
        ticks,
        bots: cfg.bots_num,
        elapsed_ms: elapsed.as_millis(),
        avg_us_per_tick: elapsed.as_secs_f64() * 1_000_000.0 / f64::from(ticks),
        us_per_agent_tick: elapsed.as_secs_f64() * 1_000_000.0 / agent_ticks.max(1.0),
        final_metrics: sim.metrics().clone(),
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn export_command(
    config_path: Option<PathBuf>,
    ticks: u32,
    seed: u64,
    format: ExportFormat,
    out: PathBuf,
) -> Result<()> {
    let mut sim = build_simulation(config_path.as_deref(), seed)?;
    let lines = sim.export_trace_jsonl(ticks);

    let payload = match format {
        ExportFormat::Jsonl => lines.join("\n"),
        ExportFormat::Json => {
            let snapshots: Vec<WorldSnapshot> = lines
                .iter()
                .map(|line| serde_json::from_str::<WorldSnapshot>(line))
                .collect::<std::result::Result<_, _>>()?;
            serde_json::to_string_pretty(&snapshots)?
        }
    };

    fs::write(&out, payload)
        .with_context(|| format!("failed writing export to {}", out.display()))?;
    println!("exported trace to {}", out.display());
    Ok(())
}

fn replay_command(input: PathBuf) -> Result<()> {
    let content = fs::read_to_string(&input)
        .with_context(|| format!("failed to read replay input {}", input.display()))?;

    let snapshots: Vec<WorldSnapshot> = if input
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
    {
        parse_jsonl(&content)?
    } else {
        serde_json::from_str::<Vec<WorldSnapshot>>(&content)
            .or_else(|_| parse_jsonl(&content))
            .context("input is neither valid JSON array nor JSONL snapshots")?
    };

    let last = snapshots.last().context("replay input is empty")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&RunSummary::from_snapshot(last))?
    );
    Ok(())
}

fn parse_jsonl(content: &str) -> Result<Vec<WorldSnapshot>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<WorldSnapshot>(line).context("invalid snapshot line"))
        .collect()
}

fn write_output(text: String, out: Option<PathBuf>) -> Result<()> {
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating output directory {}", parent.display())
            })?;
        }
        fs::write(&path, text).with_context(|| format!("failed writing {}", path.display()))?;
        println!("wrote output to {}", path.display());
    } else {
        println!("{text}");
    }
    Ok(())
}
