//! Job spec and outcome — the worker's unit of work.
//!
//! A job is self-contained: everything needed to reproduce the run is in
//! the spec, and `job_id()` is a content hash over it, so a re-issued job
//! (at-least-once delivery upstream) maps to the same result key. A failed
//! run produces an outcome with a failure marker instead of statistics;
//! the job is never retried here — a strategy error is a logic bug.

use chrono::NaiveDate;
use ctalab_core::domain::{Bar, Instrument, Tick};
use ctalab_core::strategy::StrategyParams;
use ctalab_core::{
    BacktestLoop, BacktestReport, BacktestSettings, BacktestStats, Period, RunError,
    StrategyRegistry,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Replay granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Bar,
    Tick,
}

/// Flat description of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub symbol: String,
    pub strategy: String,
    #[serde(default)]
    pub params: StrategyParams,

    // Contract economics
    pub size: f64,
    pub price_tick: f64,
    pub margin_rate: f64,
    #[serde(default)]
    pub commission_rate: f64,
    #[serde(default)]
    pub fixed_commission: f64,
    #[serde(default)]
    pub slippage: f64,

    pub initial_capital: f64,
    /// Inclusive trading-day bounds; `None` means unbounded.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub warmup_bars: usize,
    #[serde(default = "default_period")]
    pub period: Period,
    #[serde(default = "default_capacity")]
    pub indicator_capacity: usize,
}

fn default_period() -> Period {
    Period::Minutes(1)
}

fn default_capacity() -> usize {
    1
}

impl JobSpec {
    /// Content-addressed identity: identical specs hash to the same key.
    pub fn job_id(&self) -> String {
        let json = serde_json::to_string(self).expect("JobSpec serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn instrument(&self) -> Instrument {
        Instrument {
            symbol: self.symbol.clone(),
            size: self.size,
            price_tick: self.price_tick,
            margin_rate: self.margin_rate,
            commission_rate: self.commission_rate,
            fixed_commission: self.fixed_commission,
            slippage: self.slippage,
        }
    }

    pub fn settings(&self) -> BacktestSettings {
        BacktestSettings {
            warmup_bars: self.warmup_bars,
            period: self.period,
            indicator_capacity: self.indicator_capacity,
            initial_capital: self.initial_capital,
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("strategy: {0}")]
    Strategy(#[from] ctalab_core::StrategyError),
    #[error("run: {0}")]
    Run(#[from] RunError),
}

/// The spec merged with what the run produced — one flat result document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    #[serde(flatten)]
    pub spec: JobSpec,
    #[serde(flatten)]
    pub stats: Option<BacktestStats>,
    /// Captured error text when the run failed; `None` on success.
    pub failure: Option<String>,
}

impl JobOutcome {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    fn failed(spec: &JobSpec, error: JobError) -> Self {
        Self {
            job_id: spec.job_id(),
            spec: spec.clone(),
            stats: None,
            failure: Some(error.to_string()),
        }
    }

    fn succeeded(spec: &JobSpec, report: &BacktestReport) -> Self {
        Self {
            job_id: spec.job_id(),
            spec: spec.clone(),
            stats: Some(report.stats.clone()),
            failure: None,
        }
    }
}

/// Run one job over a bar feed, fully isolated from any other job.
pub fn run_job(registry: &StrategyRegistry, spec: &JobSpec, bars: &[Bar]) -> JobOutcome {
    let strategy = match registry.create(&spec.strategy, &spec.params) {
        Ok(strategy) => strategy,
        Err(error) => return JobOutcome::failed(spec, error.into()),
    };
    let bars = clip_bars(bars, spec.start, spec.end);
    info!(job_id = %spec.job_id(), symbol = %spec.symbol, bars = bars.len(), "running job");

    let lp = BacktestLoop::new(spec.instrument(), spec.settings(), strategy);
    match lp.run(bars) {
        Ok(report) => JobOutcome::succeeded(spec, &report),
        Err(error) => JobOutcome::failed(spec, error.into()),
    }
}

/// Tick-mode variant of [`run_job`].
pub fn run_job_ticks(registry: &StrategyRegistry, spec: &JobSpec, ticks: &[Tick]) -> JobOutcome {
    let strategy = match registry.create(&spec.strategy, &spec.params) {
        Ok(strategy) => strategy,
        Err(error) => return JobOutcome::failed(spec, error.into()),
    };
    let ticks = clip_ticks(ticks, spec.start, spec.end);
    info!(job_id = %spec.job_id(), symbol = %spec.symbol, ticks = ticks.len(), "running tick job");

    let lp = BacktestLoop::new(spec.instrument(), spec.settings(), strategy);
    match lp.run_ticks(ticks) {
        Ok(report) => JobOutcome::succeeded(spec, &report),
        Err(error) => JobOutcome::failed(spec, error.into()),
    }
}

fn clip_bars(bars: &[Bar], start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[Bar] {
    clip(bars, |b| b.trading_day, start, end)
}

fn clip_ticks(ticks: &[Tick], start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[Tick] {
    clip(ticks, |t| t.trading_day, start, end)
}

/// Narrow a chronologically sorted feed to the inclusive date bounds.
fn clip<T>(
    feed: &[T],
    day: impl Fn(&T) -> NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> &[T] {
    let from = match start {
        Some(start) => feed.partition_point(|item| day(item) < start),
        None => 0,
    };
    let to = match end {
        Some(end) => feed.partition_point(|item| day(item) <= end),
        None => feed.len(),
    };
    &feed[from..to.max(from)]
}
