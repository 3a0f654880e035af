//! Instrument — contract terms that price every fill.

use serde::{Deserialize, Serialize};

/// Futures contract specification and backtest cost model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,

    /// Contract multiplier: yuan per point per hand.
    pub size: f64,

    /// Minimum price increment.
    pub price_tick: f64,

    /// Exchange margin rate (fraction of notional).
    pub margin_rate: f64,

    /// Commission as a fraction of turnover.
    pub commission_rate: f64,

    /// Fixed commission per hand, on top of the rate component.
    pub fixed_commission: f64,

    /// Synthetic backtest slippage, in price units per hand.
    pub slippage: f64,
}

impl Instrument {
    /// Commission for one fill: rate on turnover plus the fixed per-hand part.
    pub fn commission(&self, price: f64, volume: u32) -> f64 {
        price * volume as f64 * self.size * self.commission_rate
            + self.fixed_commission * volume as f64
    }

    /// Synthetic slippage cost for one fill.
    pub fn slippage_cost(&self, volume: u32) -> f64 {
        volume as f64 * self.size * self.slippage
    }

    /// Margin required to carry `volume` hands at `price`.
    pub fn margin(&self, price: f64, volume: u32) -> f64 {
        price * volume as f64 * self.size * self.margin_rate
    }

    /// Snap a price to the nearest tick.
    pub fn round_to_tick(&self, price: f64) -> f64 {
        if self.price_tick <= 0.0 {
            return price;
        }
        (price / self.price_tick).round() * self.price_tick
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            size: 10.0,
            price_tick: 1.0,
            margin_rate: 0.1,
            commission_rate: 0.0,
            fixed_commission: 0.0,
            slippage: 0.0,
        }
    }
}
