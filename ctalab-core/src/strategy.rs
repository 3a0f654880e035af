//! Strategy interface: callbacks, order submission context, registry.
//!
//! A strategy is a state machine driven by the engine's callbacks. It never
//! touches the book directly: order submissions and cancellations are queued
//! on the [`Context`] passed into each callback and applied by the engine
//! when the callback returns. Commands queued inside `on_trade` take part in
//! the remaining trigger rounds of the same bar.

use crate::book::StopOrderRequest;
use crate::domain::{Bar, Direction, Instrument, Offset, Order, StopOrder, StopOrderId, Trade};
use crate::window::IndicatorWindow;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Free-form numeric/boolean knobs, strategy-specific.
pub type StrategyParams = HashMap<String, Value>;

/// Queued book mutation. Insert carries the id the context pre-assigned so
/// the strategy can cancel the order later.
#[derive(Debug, Clone, PartialEq)]
pub enum StopCommand {
    Insert(StopOrderId, StopOrderRequest),
    Cancel(StopOrderId),
    CancelAll,
}

/// Per-callback view of the engine plus the command queue.
pub struct Context<'a> {
    window: &'a IndicatorWindow,
    instrument: &'a Instrument,
    position: i64,
    capital: f64,
    trading: bool,
    next_stop_id: u64,
    commands: Vec<StopCommand>,
}

impl<'a> Context<'a> {
    pub fn new(
        window: &'a IndicatorWindow,
        instrument: &'a Instrument,
        position: i64,
        capital: f64,
        trading: bool,
        next_stop_id: u64,
    ) -> Self {
        Self {
            window,
            instrument,
            position,
            capital,
            trading,
            next_stop_id,
            commands: Vec::new(),
        }
    }

    pub fn window(&self) -> &IndicatorWindow {
        self.window
    }

    pub fn instrument(&self) -> &Instrument {
        self.instrument
    }

    /// Net position: positive long, negative short.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Current capital, already floored at zero by the accountant.
    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// False during warm-up replay; submissions are dropped then.
    pub fn trading(&self) -> bool {
        self.trading
    }

    /// Buy to open a long position.
    ///
    /// `stop = true` submits the crossing (stop) variant; `stop = false`
    /// submits the reach (limit-like) variant, which is the same trigger
    /// logic as a stop-profit order. Returns `None` during warm-up.
    pub fn buy(&mut self, price: f64, volume: u32, stop: bool) -> Option<StopOrderId> {
        self.send(Direction::Long, Offset::Open, price, volume, !stop)
    }

    /// Sell to close a long position.
    pub fn sell(&mut self, price: f64, volume: u32, stop: bool) -> Option<StopOrderId> {
        self.send(Direction::Short, Offset::Close, price, volume, !stop)
    }

    /// Sell to open a short position.
    pub fn short(&mut self, price: f64, volume: u32, stop: bool) -> Option<StopOrderId> {
        self.send(Direction::Short, Offset::Open, price, volume, !stop)
    }

    /// Buy to cover a short position.
    pub fn cover(&mut self, price: f64, volume: u32, stop: bool) -> Option<StopOrderId> {
        self.send(Direction::Long, Offset::Close, price, volume, !stop)
    }

    pub fn cancel_order(&mut self, id: StopOrderId) {
        if self.trading {
            self.commands.push(StopCommand::Cancel(id));
        }
    }

    pub fn cancel_all(&mut self) {
        if self.trading {
            self.commands.push(StopCommand::CancelAll);
        }
    }

    fn send(
        &mut self,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: u32,
        stop_profile: bool,
    ) -> Option<StopOrderId> {
        if !self.trading {
            return None;
        }
        let id = StopOrderId(self.next_stop_id);
        self.next_stop_id += 1;
        self.commands.push(StopCommand::Insert(
            id,
            StopOrderRequest {
                direction,
                offset,
                trigger_price: price,
                volume,
                stop_profile,
            },
        ));
        Some(id)
    }

    /// Drain the queued commands and the id counter for the engine.
    pub fn into_commands(self) -> (Vec<StopCommand>, u64) {
        (self.commands, self.next_stop_id)
    }
}

/// Callback surface a strategy implements.
///
/// The engine guarantees the calling order: `on_init` (warm-up replay),
/// `on_start`, then per bar `on_bar` / `on_xmin_bar` before matching, with
/// `on_order` then `on_trade` for each fill, and finally `on_stop`.
pub trait Strategy {
    fn on_init(&mut self, _ctx: &mut Context) {}
    fn on_start(&mut self, _ctx: &mut Context) {}
    fn on_stop(&mut self, _ctx: &mut Context) {}

    /// Every raw bar, warm-up included.
    fn on_bar(&mut self, bar: &Bar, ctx: &mut Context);

    /// Every completed aggregation window.
    fn on_xmin_bar(&mut self, _bar: &Bar, _ctx: &mut Context) {}

    fn on_order(&mut self, _order: &Order, _ctx: &mut Context) {}
    fn on_trade(&mut self, _trade: &Trade, _ctx: &mut Context) {}
    fn on_stop_order(&mut self, _stop_order: &StopOrder, _ctx: &mut Context) {}
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unknown strategy '{0}'")]
    Unknown(String),
    #[error("bad parameter '{name}': {reason}")]
    BadParam { name: String, reason: String },
}

type Constructor = Box<dyn Fn(&StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync>;

/// Strategy factory map, injected into the backtest loop at construction.
#[derive(Default)]
pub struct StrategyRegistry {
    constructors: HashMap<String, Constructor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&StrategyParams) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(ctor));
    }

    pub fn create(
        &self,
        name: &str,
        params: &StrategyParams,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let ctor = self
            .constructors
            .get(name)
            .ok_or_else(|| StrategyError::Unknown(name.to_string()))?;
        ctor(params)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Fetch a float parameter with a default.
pub fn param_f64(params: &StrategyParams, name: &str, default: f64) -> Result<f64, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| StrategyError::BadParam {
            name: name.to_string(),
            reason: format!("expected a number, got {v}"),
        }),
    }
}

/// Fetch an integer parameter with a default.
pub fn param_usize(
    params: &StrategyParams,
    name: &str,
    default: usize,
) -> Result<usize, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| StrategyError::BadParam {
                name: name.to_string(),
                reason: format!("expected a non-negative integer, got {v}"),
            }),
    }
}
