//! BacktestLoop — lifecycle around the engine for one full run.
//!
//! A run replays the first `warmup_bars` events with trading disabled so
//! indicator windows fill without fills, then trades the remainder. The
//! strategy lifecycle is `on_init` before warm-up, `on_start` when trading
//! begins, `on_stop` after the last event. A panicking strategy aborts the
//! run with an error instead of tearing down the caller.

use crate::accounting::PerformanceAccountant;
use crate::aggregator::Period;
use crate::domain::{Bar, DailyResult, Instrument, RoundTrip, Tick, Trade};
use crate::engine::MatchingEngine;
use crate::stats::BacktestStats;
use crate::strategy::Strategy;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Initializing,
    Trading,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Events replayed with trading disabled before the run proper.
    pub warmup_bars: usize,
    pub period: Period,
    pub indicator_capacity: usize,
    pub initial_capital: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            warmup_bars: 0,
            period: Period::Minutes(1),
            indicator_capacity: 1,
            initial_capital: 1_000_000.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty data feed")]
    EmptyFeed,
    #[error("events out of chronological order at index {index}")]
    UnorderedEvents { index: usize },
    #[error("strategy panicked: {0}")]
    StrategyPanic(String),
}

/// Everything a run produces, self-contained for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub stats: BacktestStats,
    pub daily: Vec<DailyResult>,
    pub round_trips: Vec<RoundTrip>,
    pub trades: Vec<Trade>,
}

pub struct BacktestLoop {
    engine: MatchingEngine,
    settings: BacktestSettings,
    state: RunState,
}

impl BacktestLoop {
    pub fn new(
        instrument: Instrument,
        settings: BacktestSettings,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        let engine = MatchingEngine::new(
            instrument,
            settings.period,
            settings.indicator_capacity,
            settings.initial_capital,
            strategy,
        );
        Self {
            engine,
            settings,
            state: RunState::Uninitialized,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn accountant(&self) -> &PerformanceAccountant {
        self.engine.accountant()
    }

    /// Replay a chronological bar feed end to end.
    pub fn run(mut self, bars: &[Bar]) -> Result<BacktestReport, RunError> {
        check_order(bars.iter().map(|b| b.datetime))?;
        let warmup = self.begin(bars.len())?;

        for bar in &bars[..warmup] {
            self.step(|engine| engine.on_bar(bar))?;
        }
        self.start()?;
        for bar in &bars[warmup..] {
            self.step(|engine| engine.on_bar(bar))?;
        }
        self.finish()
    }

    /// Replay a chronological tick feed end to end. Warm-up is counted in
    /// ticks; pair tick runs with `Period::Minutes(1)` so every tick
    /// reaches the indicator window.
    pub fn run_ticks(mut self, ticks: &[Tick]) -> Result<BacktestReport, RunError> {
        check_order(ticks.iter().map(|t| t.datetime))?;
        let warmup = self.begin(ticks.len())?;

        for tick in &ticks[..warmup] {
            self.step(|engine| engine.on_tick(tick))?;
        }
        self.start()?;
        for tick in &ticks[warmup..] {
            self.step(|engine| engine.on_tick(tick))?;
        }
        self.finish()
    }

    /// Enter warm-up; returns the clamped warm-up length.
    fn begin(&mut self, feed_len: usize) -> Result<usize, RunError> {
        if feed_len == 0 {
            return Err(RunError::EmptyFeed);
        }
        if feed_len <= self.settings.warmup_bars {
            warn!(
                feed_len,
                warmup = self.settings.warmup_bars,
                "feed shorter than the warm-up window; the run will place no orders"
            );
        }
        self.state = RunState::Initializing;
        self.step(|engine| engine.notify(|strategy, ctx| strategy.on_init(ctx)))?;
        Ok(self.settings.warmup_bars.min(feed_len))
    }

    fn start(&mut self) -> Result<(), RunError> {
        self.engine.set_trading(true);
        self.state = RunState::Trading;
        self.step(|engine| engine.notify(|strategy, ctx| strategy.on_start(ctx)))
    }

    fn finish(mut self) -> Result<BacktestReport, RunError> {
        self.step(|engine| engine.notify(|strategy, ctx| strategy.on_stop(ctx)))?;
        self.engine.set_trading(false);
        self.state = RunState::Stopped;

        let accountant = self.engine.accountant();
        let daily = accountant.daily_results();
        let round_trips = accountant.round_trips().to_vec();
        let trades = accountant.trades().to_vec();
        let stats = BacktestStats::compute(&daily, &round_trips, accountant.initial_capital());
        Ok(BacktestReport {
            stats,
            daily,
            round_trips,
            trades,
        })
    }

    /// Run one engine step, converting a strategy panic into an error.
    fn step<F>(&mut self, f: F) -> Result<(), RunError>
    where
        F: FnOnce(&mut MatchingEngine),
    {
        catch_unwind(AssertUnwindSafe(|| f(&mut self.engine)))
            .map_err(|payload| RunError::StrategyPanic(panic_message(payload)))
    }
}

fn check_order(datetimes: impl Iterator<Item = NaiveDateTime>) -> Result<(), RunError> {
    let mut previous: Option<NaiveDateTime> = None;
    for (index, datetime) in datetimes.enumerate() {
        if let Some(prev) = previous {
            if datetime < prev {
                return Err(RunError::UnorderedEvents { index });
            }
        }
        previous = Some(datetime);
    }
    Ok(())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
