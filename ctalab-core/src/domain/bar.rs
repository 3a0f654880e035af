//! Bar and Tick — the market data units fed into the engine.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol, closed and immutable once emitted.
///
/// `trading_day` is the exchange session date, which may differ from the
/// calendar date of `datetime` (night sessions roll into the next trading day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub datetime: NaiveDateTime,
    pub trading_day: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: f64,
}

impl Bar {
    /// A bar is bearish when it closes at or below its open.
    ///
    /// Bar direction decides the evaluation order of the stop-order buckets,
    /// so the boundary case (doji, open == close) must be fixed: it counts
    /// as bearish.
    pub fn is_bearish(&self) -> bool {
        self.open >= self.close
    }

    /// Basic OHLC sanity check: high is the top of the range, low the bottom.
    pub fn is_sane(&self) -> bool {
        !self.open.is_nan()
            && !self.high.is_nan()
            && !self.low.is_nan()
            && !self.close.is_nan()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Market tick: a single trade print plus top-of-book quotes.
///
/// Used only in tick-mode backtests. `volume` is the cumulative session
/// volume as reported by the exchange, not the size of this trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub datetime: NaiveDateTime,
    pub trading_day: NaiveDate,
    pub last_price: f64,
    pub volume: f64,
    pub open_interest: f64,
    pub bid_price: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_volume: f64,
}

impl Tick {
    /// Convert a tick into a synthetic one-trade bar so that indicator and
    /// aggregation code can consume a uniform stream.
    pub fn to_bar(&self) -> Bar {
        Bar {
            symbol: self.symbol.clone(),
            datetime: self.datetime,
            trading_day: self.trading_day,
            open: self.last_price,
            high: self.last_price,
            low: self.last_price,
            close: self.last_price,
            volume: self.volume,
            open_interest: self.open_interest,
        }
    }
}
