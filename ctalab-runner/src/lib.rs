//! Job layer around the backtesting core.
//!
//! A [`job::JobSpec`] is the flat record a scheduler hands a worker: symbol,
//! strategy, knobs, contract economics, capital. [`job::run_job`] executes
//! it against a bar feed in full isolation and returns a
//! [`job::JobOutcome`] — the spec merged with the run's statistics, or a
//! failure marker. [`sweep`] expands parameter grids into many specs and
//! runs them in parallel; [`data`] loads bar/tick feeds from CSV;
//! [`config`] reads job and sweep definitions from TOML.

pub mod config;
pub mod data;
pub mod job;
pub mod sweep;

pub use config::{load_job_config, load_sweep_config, ConfigError, DataConfig, JobConfig, SweepConfig};
pub use data::{load_bars_csv, load_ticks_csv, LoadError};
pub use job::{run_job, run_job_ticks, JobOutcome, JobSpec, Mode};
pub use sweep::{expand_axes, run_sweep, write_sweep_csv};
