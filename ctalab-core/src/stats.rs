//! Backtest statistics — one pass over daily results and round-trips.
//!
//! Futures sessions here annualize at 240 trading days. Every statistic
//! degrades to 0.0 on empty or degenerate input instead of dividing by zero.

use crate::domain::{DailyResult, RoundTrip};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trading days per year for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 240.0;

/// Aggregate statistics of one run, flat so the job layer can merge it
/// into a single result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_days: usize,
    pub profit_days: usize,
    pub loss_days: usize,
    pub ending_balance: f64,
    pub total_net_pnl: f64,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub total_turnover: f64,
    pub total_trade_count: usize,
    /// Deepest balance drop below the high-water mark, in currency (<= 0).
    pub max_drawdown: f64,
    /// The same drop as a fraction of the high-water mark (<= 0).
    pub max_drawdown_ratio: f64,
    pub daily_return_mean: f64,
    pub daily_return_std: f64,
    pub sharpe: f64,
    pub round_trip_count: usize,
    pub win_rate: f64,
    /// Average winning round-trip over the average losing one.
    pub profit_factor: f64,
}

impl BacktestStats {
    pub fn compute(
        daily: &[DailyResult],
        round_trips: &[RoundTrip],
        initial_capital: f64,
    ) -> Self {
        let mut balance = initial_capital;
        let mut high_water = initial_capital;
        let mut max_drawdown = 0.0_f64;
        let mut max_drawdown_ratio = 0.0_f64;
        let mut returns = Vec::with_capacity(daily.len());
        let mut profit_days = 0;
        let mut loss_days = 0;
        let mut total_commission = 0.0;
        let mut total_slippage = 0.0;
        let mut total_turnover = 0.0;
        let mut total_trade_count = 0;
        let mut total_net_pnl = 0.0;

        for day in daily {
            let previous = balance;
            balance += day.net_pnl;
            total_net_pnl += day.net_pnl;
            total_commission += day.commission;
            total_slippage += day.slippage;
            total_turnover += day.turnover;
            total_trade_count += day.trade_count;

            if day.net_pnl > 0.0 {
                profit_days += 1;
            } else if day.net_pnl < 0.0 {
                loss_days += 1;
            }

            if balance > high_water {
                high_water = balance;
            }
            let drawdown = balance - high_water;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
                max_drawdown_ratio = if high_water > 0.0 {
                    drawdown / high_water
                } else {
                    0.0
                };
            }

            returns.push(if previous > 0.0 && balance > 0.0 {
                (balance / previous).ln()
            } else {
                0.0
            });
        }

        let daily_return_mean = mean(&returns);
        let daily_return_std = std_dev(&returns);
        let sharpe = if daily_return_std > 1e-15 {
            daily_return_mean / daily_return_std * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let winners: Vec<f64> = round_trips
            .iter()
            .filter(|rt| rt.pnl > 0.0)
            .map(|rt| rt.pnl)
            .collect();
        let losers: Vec<f64> = round_trips
            .iter()
            .filter(|rt| rt.pnl <= 0.0)
            .map(|rt| rt.pnl)
            .collect();

        let win_rate = if round_trips.is_empty() {
            0.0
        } else {
            winners.len() as f64 / round_trips.len() as f64
        };
        let avg_win = mean(&winners);
        let avg_loss = mean(&losers);
        let profit_factor = if avg_loss.abs() > 1e-15 {
            avg_win / avg_loss.abs()
        } else {
            0.0
        };

        Self {
            start_date: daily.first().map(|d| d.date),
            end_date: daily.last().map(|d| d.date),
            total_days: daily.len(),
            profit_days,
            loss_days,
            ending_balance: balance,
            total_net_pnl,
            total_commission,
            total_slippage,
            total_turnover,
            total_trade_count,
            max_drawdown,
            max_drawdown_ratio,
            daily_return_mean,
            daily_return_std,
            sharpe,
            round_trip_count: round_trips.len(),
            win_rate,
            profit_factor,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn day(d: u32, net_pnl: f64) -> DailyResult {
        let mut daily =
            DailyResult::new(NaiveDate::from_ymd_opt(2023, 9, d).unwrap(), 3700.0);
        daily.net_pnl = net_pnl;
        daily.commission = 1.0;
        daily
    }

    fn round_trip(pnl: f64) -> RoundTrip {
        RoundTrip {
            direction: Direction::Long,
            entry_date: NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2023, 9, 5).unwrap(),
            entry_price: 3700.0,
            exit_price: 3700.0,
            volume: 1,
            gross_pnl: pnl,
            pnl,
            commission: 0.0,
            slippage: 0.0,
        }
    }

    #[test]
    fn empty_run_is_all_zeroes() {
        let stats = BacktestStats::compute(&[], &[], 100_000.0);
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.ending_balance, 100_000.0);
        assert_eq!(stats.sharpe, 0.0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.start_date, None);
    }

    #[test]
    fn drawdown_tracks_high_water_mark() {
        let daily = vec![day(4, 1000.0), day(5, -3000.0), day(6, 500.0)];
        let stats = BacktestStats::compute(&daily, &[], 100_000.0);
        assert_eq!(stats.max_drawdown, -3000.0);
        assert!((stats.max_drawdown_ratio - (-3000.0 / 101_000.0)).abs() < 1e-12);
        assert_eq!(stats.ending_balance, 98_500.0);
        assert_eq!(stats.profit_days, 2);
        assert_eq!(stats.loss_days, 1);
    }

    #[test]
    fn flat_curve_has_zero_sharpe() {
        let daily = vec![day(4, 0.0), day(5, 0.0), day(6, 0.0)];
        let stats = BacktestStats::compute(&daily, &[], 100_000.0);
        assert_eq!(stats.sharpe, 0.0);
        assert_eq!(stats.profit_days, 0);
        assert_eq!(stats.loss_days, 0);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let rts = vec![
            round_trip(300.0),
            round_trip(100.0),
            round_trip(-100.0),
            round_trip(-100.0),
        ];
        let stats = BacktestStats::compute(&[], &rts, 100_000.0);
        assert_eq!(stats.round_trip_count, 4);
        assert_eq!(stats.win_rate, 0.5);
        // avg win 200 over |avg loss| 100
        assert!((stats.profit_factor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn all_winners_degrades_profit_factor_to_zero() {
        let rts = vec![round_trip(100.0)];
        let stats = BacktestStats::compute(&[], &rts, 100_000.0);
        assert_eq!(stats.win_rate, 1.0);
        assert_eq!(stats.profit_factor, 0.0);
    }

    #[test]
    fn stats_serialize_flat() {
        let stats = BacktestStats::compute(&[day(4, 10.0)], &[], 1000.0);
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("ending_balance").is_some());
        assert!(json.get("sharpe").is_some());
    }
}
