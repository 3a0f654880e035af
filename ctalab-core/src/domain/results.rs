//! Aggregate result records built from the trade ledger.

use crate::domain::order::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of mark-to-market accounting.
///
/// Invariant: `close_pos` of day N equals `open_pos` of day N+1, and the
/// day's unrealized P&L is marked against `close_price` with the previous
/// day's close as the carry-in mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyResult {
    pub date: NaiveDate,
    pub close_price: f64,
    pub pre_close: f64,
    /// Net position carried into the day.
    pub open_pos: i64,
    /// Net position carried out of the day.
    pub close_pos: i64,
    pub trade_count: usize,
    pub turnover: f64,
    pub commission: f64,
    pub slippage: f64,
    /// Mark-to-market P&L of the day, costs deducted.
    pub net_pnl: f64,
}

impl DailyResult {
    pub fn new(date: NaiveDate, close_price: f64) -> Self {
        Self {
            date,
            close_price,
            pre_close: 0.0,
            open_pos: 0,
            close_pos: 0,
            trade_count: 0,
            turnover: 0.0,
            commission: 0.0,
            slippage: 0.0,
            net_pnl: 0.0,
        }
    }
}

/// One closed round-trip: an opening fill paired with a closing fill by
/// FIFO queue consumption, possibly a partial slice of either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    /// Direction of the *position* the round-trip held (Long means the
    /// entry was a buy and the exit a sell).
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub volume: u32,
    /// Price P&L before costs.
    pub gross_pnl: f64,
    /// P&L with the entry and exit cost shares netted in.
    pub pnl: f64,
    pub commission: f64,
    pub slippage: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_result_starts_flat() {
        let d = DailyResult::new(NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(), 3700.0);
        assert_eq!(d.open_pos, 0);
        assert_eq!(d.close_pos, 0);
        assert_eq!(d.trade_count, 0);
    }

    #[test]
    fn round_trip_winner_flag_uses_net_pnl() {
        let rt = RoundTrip {
            direction: Direction::Long,
            entry_date: NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2023, 9, 5).unwrap(),
            entry_price: 3700.0,
            exit_price: 3701.0,
            volume: 1,
            gross_pnl: 10.0,
            pnl: -2.0,
            commission: 8.0,
            slippage: 4.0,
        };
        assert!(!rt.is_winner());
    }
}
