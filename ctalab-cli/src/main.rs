//! ctalab CLI — run a backtest job or a parameter sweep.
//!
//! Commands:
//! - `run` — execute one job from a TOML config, print the result document
//! - `sweep` — expand the config's axes, run the grid, write a CSV table
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=ctalab_core=debug`) to control logging.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ctalab_core::strategies::default_registry;
use ctalab_runner::{
    expand_axes, load_bars_csv, load_job_config, load_sweep_config, load_ticks_csv, run_job,
    run_job_ticks, run_sweep, write_sweep_csv, JobOutcome, Mode,
};

#[derive(Parser)]
#[command(name = "ctalab", about = "ctalab — futures backtesting runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest job from a TOML config file.
    Run {
        /// Path to the job TOML.
        #[arg(long)]
        config: PathBuf,

        /// Write the result document here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the parameter sweep described by a TOML config file.
    Sweep {
        /// Path to the sweep TOML.
        #[arg(long)]
        config: PathBuf,

        /// CSV output path for the result table.
        #[arg(long, default_value = "sweep_results.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output } => cmd_run(&config, output.as_deref()),
        Commands::Sweep { config, output } => cmd_sweep(&config, &output),
    }
}

fn cmd_run(config_path: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    let config = load_job_config(config_path)?;
    let registry = default_registry();

    let outcome = match config.job.mode {
        Mode::Bar => {
            let bars = load_bars_csv(
                &config.data.path,
                &config.job.symbol,
                config.job.start,
                config.job.end,
            )?;
            run_job(&registry, &config.job, &bars)
        }
        Mode::Tick => {
            let ticks = load_ticks_csv(
                &config.data.path,
                &config.job.symbol,
                config.job.start,
                config.job.end,
            )?;
            run_job_ticks(&registry, &config.job, &ticks)
        }
    };

    let document = serde_json::to_string_pretty(&outcome)?;
    match output {
        Some(path) => std::fs::write(path, document)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{document}"),
    }

    if let JobOutcome {
        failure: Some(reason),
        ..
    } = &outcome
    {
        bail!("job failed: {reason}");
    }
    Ok(())
}

fn cmd_sweep(config_path: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let config = load_sweep_config(config_path)?;
    if config.job.mode == Mode::Tick {
        bail!("sweeps run in bar mode; set mode = \"bar\"");
    }
    let axes = config.axes()?;
    let specs = expand_axes(&config.job, &axes);
    let bars = load_bars_csv(
        &config.data.path,
        &config.job.symbol,
        config.job.start,
        config.job.end,
    )?;

    let registry = default_registry();
    let outcomes = run_sweep(&registry, &specs, &bars);

    let file = std::fs::File::create(output)
        .with_context(|| format!("creating {}", output.display()))?;
    write_sweep_csv(&outcomes, file)?;

    let failures = outcomes.iter().filter(|o| o.is_failure()).count();
    eprintln!(
        "{} jobs, {} failed, results in {}",
        outcomes.len(),
        failures,
        output.display()
    );
    if failures == outcomes.len() {
        bail!("every job in the sweep failed");
    }
    Ok(())
}
