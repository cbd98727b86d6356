mod session;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rca_core::{Monitoring, Verdict, build_monitor};
use rca_store::{
    LogFollower, RandomHarness, RcaConfig, RunStore, load_config, load_contract,
    save_contract_json,
};

use crate::session::{Output, Session};

#[derive(Parser)]
#[command(name = "rca", about = "Runtime monitor for timed contract automata")]
struct Cli {
    /// Directory holding the run archive
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a contract and describe its automaton
    Check {
        /// Contract file (.json or .toml)
        contract: PathBuf,
    },

    /// Replay a finished sample log
    Run {
        contract: PathBuf,
        samples: PathBuf,

        /// rca.toml with [monitor] and [driver] tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print one JSON object per step
        #[arg(long, conflicts_with = "quiet")]
        json: bool,

        /// Print the final verdict only
        #[arg(long)]
        quiet: bool,

        /// Archive the run
        #[arg(long)]
        record: bool,
    },

    /// Follow a growing sample log until ctrl-c or the monitor runs dry
    Watch {
        contract: PathBuf,
        log: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,

        #[arg(long)]
        record: bool,
    },

    /// Generate random samples for a contract
    Simulate {
        contract: PathBuf,

        #[arg(long, default_value_t = 20)]
        steps: usize,

        /// Seed for reproducible samples (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Largest time delta per sample
        #[arg(long, default_value_t = 3)]
        max_delta: u64,

        /// Write samples here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List archived runs
    Runs,

    /// Show the steps of an archived run
    Show {
        /// Run id or unique prefix
        run: String,
    },

    /// Re-emit a contract in the versioned JSON format
    Export {
        contract: PathBuf,
        out: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Check { contract } => cmd_check(contract),
        Commands::Run {
            contract,
            samples,
            config,
            json,
            quiet,
            record,
        } => {
            let output = match (*json, *quiet) {
                (true, _) => Output::Json,
                (_, true) => Output::Quiet,
                _ => Output::Text,
            };
            let store = record.then(|| open_store(&cli)).transpose()?;
            cmd_run(contract, samples, config.as_deref(), output, store)
        }
        Commands::Watch {
            contract,
            log,
            config,
            json,
            record,
        } => {
            let output = if *json { Output::Json } else { Output::Text };
            let store = record.then(|| open_store(&cli)).transpose()?;
            cmd_watch(contract, log, config.as_deref(), output, store).await
        }
        Commands::Simulate {
            contract,
            steps,
            seed,
            max_delta,
            out,
            config,
        } => cmd_simulate(
            contract,
            *steps,
            *seed,
            *max_delta,
            out.as_deref(),
            config.as_deref(),
        ),
        Commands::Runs => cmd_runs(&open_store(&cli)?),
        Commands::Show { run } => cmd_show(&open_store(&cli)?, run),
        Commands::Export { contract, out } => cmd_export(contract, out),
    }
}

fn open_store(cli: &Cli) -> Result<RunStore> {
    let path = rca_store::data_dir(cli.data_dir.as_deref()).join("runs.db");
    RunStore::open(&path).with_context(|| format!("failed to open run archive {}", path.display()))
}

fn read_config(path: Option<&Path>) -> Result<RcaConfig> {
    match path {
        Some(path) => {
            load_config(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(RcaConfig::default()),
    }
}

fn exit_code(verdict: Verdict) -> ExitCode {
    match verdict {
        Verdict::Running => ExitCode::SUCCESS,
        Verdict::EnvironmentLoses => ExitCode::from(2),
        Verdict::SystemLoses => ExitCode::from(3),
    }
}

fn open_contract(path: &Path) -> Result<rca_core::Contract> {
    load_contract(path).with_context(|| format!("failed to load contract {}", path.display()))
}

fn cmd_check(path: &Path) -> Result<ExitCode> {
    let contract = open_contract(path)?;
    let automaton = contract
        .build()
        .with_context(|| format!("invalid contract {}", path.display()))?;

    let initial: Vec<&str> = automaton
        .initial
        .iter()
        .map(|&m| automaton.mode_name(m))
        .collect();
    let variables: Vec<String> = automaton
        .vars
        .iter()
        .map(|v| {
            let history = if v.depth > 0 {
                format!(", history {}", v.depth)
            } else {
                String::new()
            };
            format!("{} ({} {}{history})", v.name, v.role.as_str(), v.ty.label())
        })
        .collect();
    let clocks: Vec<String> = automaton
        .clocks
        .iter()
        .map(|c| {
            if c.depth > 0 {
                format!("{} (history {})", c.name, c.depth)
            } else {
                c.name.clone()
            }
        })
        .collect();

    println!("contract:    {}", automaton.name);
    println!("modes:       {}", automaton.modes.join(", "));
    println!("initial:     {}", initial.join(", "));
    println!("variables:   {}", variables.join(", "));
    println!("clocks:      {}", clocks.join(", "));
    println!("transitions: {}", automaton.transitions.len());
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(
    contract_path: &Path,
    samples: &Path,
    config: Option<&Path>,
    output: Output,
    store: Option<RunStore>,
) -> Result<ExitCode> {
    if !samples.exists() {
        anyhow::bail!("sample log {} does not exist", samples.display());
    }
    let contract = open_contract(contract_path)?;
    let config = read_config(config)?;
    let mut session = Session::new(contract, &config, output)?;
    if let Some(store) = store {
        session.record_to(store, &samples.display().to_string())?;
    }

    let mut follower = LogFollower::new(samples);
    let mut lines = follower
        .drain()
        .with_context(|| format!("failed to read {}", samples.display()))?;
    lines.extend(follower.take_partial());

    for line in &lines {
        session.feed(line)?;
        if session.should_stop() {
            tracing::info!("no live tokens left; stopping");
            break;
        }
    }
    Ok(exit_code(session.finish()?))
}

async fn cmd_watch(
    contract_path: &Path,
    log: &Path,
    config: Option<&Path>,
    output: Output,
    store: Option<RunStore>,
) -> Result<ExitCode> {
    let contract = open_contract(contract_path)?;
    let config = read_config(config)?;
    let mut session = Session::new(contract, &config, output)?;
    if let Some(store) = store {
        session.record_to(store, &log.display().to_string())?;
    }

    let mut follower = LogFollower::new(log);
    let mut interval = tokio::time::interval(Duration::from_millis(
        config.driver.poll_interval_ms.max(1),
    ));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    tracing::info!("watching {}", log.display());

    'watch: loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            _ = interval.tick() => {
                let lines = follower
                    .drain()
                    .with_context(|| format!("failed to read {}", log.display()))?;
                for line in &lines {
                    if let Err(e) = session.feed(line) {
                        tracing::warn!("skipping sample: {e:#}");
                        continue;
                    }
                    if session.should_stop() {
                        tracing::info!("no live tokens left; stopping");
                        break 'watch;
                    }
                }
            }
        }
    }
    tracing::debug!(cursor = follower.cursor(), "stopped following");
    Ok(exit_code(session.finish()?))
}

fn cmd_simulate(
    contract_path: &Path,
    steps: usize,
    seed: Option<u64>,
    max_delta: u64,
    out: Option<&Path>,
    config: Option<&Path>,
) -> Result<ExitCode> {
    let contract = open_contract(contract_path)?;
    let config = read_config(config)?;
    let seed = seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "simulating {steps} samples");

    let mut harness = RandomHarness::new(&contract.signature, seed).with_max_delta(max_delta);
    let mut monitor: Box<dyn Monitoring> = build_monitor(contract, &config.monitor)
        .with_context(|| format!("invalid contract {}", contract_path.display()))?;

    let mut lines = Vec::with_capacity(steps);
    for _ in 0..steps {
        let sample = harness.next_sample();
        monitor.step(&sample)?;
        lines.push(sample.to_line(&config.driver.format));
    }

    match out {
        Some(path) => {
            let mut text = lines.join("\n");
            text.push('\n');
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "wrote {steps} samples to {} (seed {seed}); verdict: {}",
                path.display(),
                monitor.verdict()
            );
        }
        None => {
            for line in &lines {
                println!("{line}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_runs(store: &RunStore) -> Result<ExitCode> {
    let runs = store.list_runs().context("failed to list runs")?;
    if runs.is_empty() {
        println!("(no runs recorded)");
        return Ok(ExitCode::SUCCESS);
    }
    for run in runs {
        println!(
            "{}  {:<16} {:>6} steps  {:<17} {}",
            run.id, run.contract, run.steps, run.verdict, run.started_at
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(store: &RunStore, prefix: &str) -> Result<ExitCode> {
    let run = store.find_run(prefix).context("failed to find run")?;
    println!("run:      {}", run.id);
    println!("contract: {}", run.contract);
    if !run.source.is_empty() {
        println!("source:   {}", run.source);
    }
    println!("started:  {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("finished: {finished}");
    }
    println!("verdict:  {}", run.verdict);

    for step in store.run_steps(run.id).context("failed to load steps")? {
        let mut faults = String::new();
        if step.pre_fault {
            faults.push_str(" pre-fault");
        }
        if step.post_fault {
            faults.push_str(" post-fault");
        }
        println!(
            "{:>5}  +({},{})  pre={} fired={} tokens={} {}{faults}",
            step.step,
            step.delta_env,
            step.delta_sys,
            step.any_pre,
            step.fired,
            step.tokens,
            step.verdict
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(contract_path: &Path, out: &Path) -> Result<ExitCode> {
    let contract = open_contract(contract_path)?;
    contract
        .clone()
        .build()
        .with_context(|| format!("invalid contract {}", contract_path.display()))?;
    save_contract_json(out, &contract)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("exported {} to {}", contract.name, out.display());
    Ok(ExitCode::SUCCESS)
}
