//! Event-driven backtesting core for single-instrument futures strategies.
//!
//! The pipeline per market event: the [`aggregator::BarAggregator`] merges
//! raw bars into the strategy's decision period, the
//! [`window::IndicatorWindow`] retains history for indicator queries, the
//! strategy queues stop orders through its [`strategy::Context`], and the
//! [`book::StopOrderBook`] resolves triggers deterministically, one per
//! round, re-evaluating the remaining candidates after every fill. The
//! [`accounting::PerformanceAccountant`] turns the resulting trades into
//! round-trips, daily results and summary statistics.
//!
//! [`runner::BacktestLoop`] wires the pieces together for a full run.

pub mod accounting;
pub mod aggregator;
pub mod book;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod runner;
pub mod sizing;
pub mod stats;
pub mod strategies;
pub mod strategy;
pub mod window;

pub use accounting::PerformanceAccountant;
pub use aggregator::{BarAggregator, Period};
pub use book::{MarketView, StopOrderBook, StopOrderRequest, TriggerEvent, MAX_TRIGGER_ROUNDS};
pub use domain::{
    Bar, DailyResult, Direction, Instrument, Offset, Order, OrderId, RoundTrip, StopOrder,
    StopOrderId, StopOrderStatus, Symbol, Tick, Trade, TradeId,
};
pub use engine::MatchingEngine;
pub use runner::{BacktestLoop, BacktestReport, BacktestSettings, RunError, RunState};
pub use stats::BacktestStats;
pub use strategy::{Context, Strategy, StrategyError, StrategyParams, StrategyRegistry};
pub use window::IndicatorWindow;
