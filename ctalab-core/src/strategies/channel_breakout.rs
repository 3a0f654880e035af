//! Donchian channel breakout with ATR-scaled sizing.
//!
//! Flat: a buy stop rides the entry-channel high and a short stop the
//! entry-channel low. In a position: a single stop exits at the opposite
//! side of the (tighter) exit channel. All stops are cancelled and
//! re-placed on every completed aggregation window, so they always track
//! the latest channel.

use crate::domain::Bar;
use crate::sizing::atr_risk_hands;
use crate::strategy::{param_f64, param_usize, Context, Strategy, StrategyError, StrategyParams};

pub struct ChannelBreakout {
    entry_window: usize,
    exit_window: usize,
    atr_window: usize,
    risk_fraction: f64,
}

impl ChannelBreakout {
    pub fn new(
        entry_window: usize,
        exit_window: usize,
        atr_window: usize,
        risk_fraction: f64,
    ) -> Self {
        Self {
            entry_window,
            exit_window,
            atr_window,
            risk_fraction,
        }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, StrategyError> {
        let entry_window = param_usize(params, "entry_window", 20)?;
        let exit_window = param_usize(params, "exit_window", 10)?;
        let atr_window = param_usize(params, "atr_window", 14)?;
        let risk_fraction = param_f64(params, "risk_fraction", 0.01)?;
        if entry_window == 0 || exit_window == 0 || atr_window == 0 {
            return Err(StrategyError::BadParam {
                name: "entry_window/exit_window/atr_window".into(),
                reason: "windows must be >= 1".into(),
            });
        }
        Ok(Self::new(entry_window, exit_window, atr_window, risk_fraction))
    }
}

impl Strategy for ChannelBreakout {
    fn on_bar(&mut self, _bar: &Bar, _ctx: &mut Context) {}

    fn on_xmin_bar(&mut self, _bar: &Bar, ctx: &mut Context) {
        ctx.cancel_all();

        let window = ctx.window();
        let Some((entry_up, entry_down)) = window.channel(self.entry_window) else {
            return;
        };
        let Some((exit_up, exit_down)) = window.channel(self.exit_window) else {
            return;
        };
        let Some(atr) = window.atr(self.atr_window) else {
            return;
        };

        let position = ctx.position();
        if position == 0 {
            let hands = atr_risk_hands(
                ctx.capital(),
                self.risk_fraction,
                atr,
                ctx.instrument().size,
            );
            if hands == 0 {
                return;
            }
            ctx.buy(entry_up, hands, true);
            ctx.short(entry_down, hands, true);
        } else if position > 0 {
            ctx.sell(exit_down, position as u32, true);
        } else {
            ctx.cover(exit_up, (-position) as u32, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Period;
    use crate::domain::Instrument;
    use crate::runner::{BacktestLoop, BacktestSettings};
    use chrono::NaiveDate;

    fn instrument() -> Instrument {
        Instrument {
            symbol: "rb2401".into(),
            size: 10.0,
            price_tick: 1.0,
            margin_rate: 0.1,
            commission_rate: 0.0,
            fixed_commission: 0.0,
            slippage: 0.0,
        }
    }

    fn bar(minute: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        let day = NaiveDate::from_ymd_opt(2023, 9, 4).unwrap();
        Bar {
            symbol: "rb2401".into(),
            datetime: day.and_hms_opt(9, minute, 0).unwrap(),
            trading_day: day,
            open,
            high,
            low,
            close,
            volume: 100.0,
            open_interest: 0.0,
        }
    }

    #[test]
    fn params_reject_zero_windows() {
        let mut params = StrategyParams::new();
        params.insert("entry_window".into(), serde_json::json!(0));
        assert!(matches!(
            ChannelBreakout::from_params(&params),
            Err(StrategyError::BadParam { .. })
        ));
    }

    #[test]
    fn breakout_above_the_channel_opens_a_long() {
        let strategy = ChannelBreakout::new(3, 2, 3, 0.01);
        let settings = BacktestSettings {
            warmup_bars: 0,
            period: Period::Minutes(1),
            indicator_capacity: 3,
            initial_capital: 1_000_000.0,
        };
        let lp = BacktestLoop::new(instrument(), settings, Box::new(strategy));

        // Three quiet bars fill the window (channel high 102), then a
        // breakout bar punches through it.
        let bars = vec![
            bar(1, 100.0, 102.0, 99.0, 101.0),
            bar(2, 101.0, 102.0, 100.0, 101.0),
            bar(3, 101.0, 102.0, 100.0, 101.5),
            bar(4, 101.5, 106.0, 101.0, 105.0),
        ];
        let report = lp.run(&bars).unwrap();

        assert!(!report.trades.is_empty());
        let entry = &report.trades[0];
        assert_eq!(entry.price, 102.0);
        assert!(entry.volume > 0);
    }

    #[test]
    fn no_orders_before_the_window_is_ready() {
        let strategy = ChannelBreakout::new(5, 3, 5, 0.01);
        let settings = BacktestSettings {
            warmup_bars: 0,
            period: Period::Minutes(1),
            indicator_capacity: 5,
            initial_capital: 1_000_000.0,
        };
        let lp = BacktestLoop::new(instrument(), settings, Box::new(strategy));
        let bars = vec![
            bar(1, 100.0, 101.0, 99.0, 100.5),
            bar(2, 100.5, 108.0, 100.0, 107.0),
        ];
        let report = lp.run(&bars).unwrap();
        assert!(report.trades.is_empty());
    }
}
