//! BarAggregator — merges raw 1-minute bars into N-minute or daily bars.
//!
//! Merge rule: open is the first bar's open, high/low are running extremes,
//! close and open interest are the latest bar's, volume accumulates. An
//! N-minute window closes with the bar whose minute satisfies
//! `(minute + 1) % n == 0`; a daily window closes when the trading day
//! changes. A partial trailing window is only emitted via `finish()`.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    /// N-minute bars, N >= 1. N = 1 passes bars through unchanged.
    Minutes(u32),
    /// One bar per trading day.
    Daily,
}

#[derive(Debug, Clone)]
pub struct BarAggregator {
    period: Period,
    current: Option<Bar>,
}

impl BarAggregator {
    pub fn new(period: Period) -> Self {
        if let Period::Minutes(n) = period {
            assert!(n >= 1, "minute window must be >= 1");
        }
        Self { period, current: None }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Feed one 1-minute bar. Returns the merged bar when a window closes.
    pub fn update(&mut self, bar: &Bar) -> Option<Bar> {
        match self.period {
            Period::Minutes(1) => Some(bar.clone()),
            Period::Minutes(n) => self.update_minutes(bar, n),
            Period::Daily => self.update_daily(bar),
        }
    }

    /// Flush the partial window under construction, if any.
    pub fn finish(&mut self) -> Option<Bar> {
        self.current.take()
    }

    fn update_minutes(&mut self, bar: &Bar, n: u32) -> Option<Bar> {
        self.merge(bar);
        use chrono::Timelike;
        if (bar.datetime.time().minute() + 1) % n == 0 {
            self.current.take()
        } else {
            None
        }
    }

    fn update_daily(&mut self, bar: &Bar) -> Option<Bar> {
        let finished = match &self.current {
            Some(cur) if cur.trading_day != bar.trading_day => self.current.take(),
            _ => None,
        };
        self.merge(bar);
        finished
    }

    fn merge(&mut self, bar: &Bar) {
        match &mut self.current {
            None => self.current = Some(bar.clone()),
            Some(cur) => {
                cur.high = cur.high.max(bar.high);
                cur.low = cur.low.min(bar.low);
                cur.close = bar.close;
                cur.volume += bar.volume;
                cur.open_interest = bar.open_interest;
                cur.datetime = bar.datetime;
                cur.trading_day = bar.trading_day;
            }
        }
    }
}
