//! PerformanceAccountant — capital, costs, round-trip pairing, daily results.
//!
//! The accountant only reads trades; it never mutates the ledger. Costs
//! (commission plus synthetic slippage) are deducted from capital at fill
//! time. Realized P&L is recognized by FIFO round-trip pairing: an
//! opposite-direction fill consumes the oldest open lots first, splitting a
//! lot when volumes differ. Capital is floored at zero — a blown-up account
//! stays at zero rather than going negative.

use crate::domain::{DailyResult, Direction, Instrument, RoundTrip, Trade};
use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// An opening fill (or the unpaired remainder of one) awaiting its exit.
#[derive(Debug, Clone)]
struct OpenLot {
    price: f64,
    volume: u32,
    date: NaiveDate,
    /// Entry cost shares carried until the lot closes.
    commission_per_hand: f64,
    slippage_per_hand: f64,
}

#[derive(Debug, Clone)]
pub struct PerformanceAccountant {
    instrument: Instrument,
    initial_capital: f64,
    capital: f64,
    total_commission: f64,
    total_slippage: f64,
    total_turnover: f64,
    open_longs: VecDeque<OpenLot>,
    open_shorts: VecDeque<OpenLot>,
    round_trips: Vec<RoundTrip>,
    trades: Vec<Trade>,
    /// Last seen close per trading day, the mark for daily P&L.
    close_marks: BTreeMap<NaiveDate, f64>,
}

impl PerformanceAccountant {
    pub fn new(instrument: Instrument, initial_capital: f64) -> Self {
        Self {
            instrument,
            initial_capital,
            capital: initial_capital,
            total_commission: 0.0,
            total_slippage: 0.0,
            total_turnover: 0.0,
            open_longs: VecDeque::new(),
            open_shorts: VecDeque::new(),
            round_trips: Vec::new(),
            trades: Vec::new(),
            close_marks: BTreeMap::new(),
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    pub fn total_turnover(&self) -> f64 {
        self.total_turnover
    }

    pub fn round_trips(&self) -> &[RoundTrip] {
        &self.round_trips
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Record the close of the bar just processed; overwrites within a day
    /// so the final value is the day's settlement mark.
    pub fn mark_close(&mut self, day: NaiveDate, close: f64) {
        self.close_marks.insert(day, close);
    }

    /// Account for one confirmed fill.
    pub fn on_trade(&mut self, trade: &Trade) {
        let commission = self.instrument.commission(trade.price, trade.volume);
        let slippage = self.instrument.slippage_cost(trade.volume);
        let turnover = trade.price * trade.volume as f64 * self.instrument.size;

        self.total_commission += commission;
        self.total_slippage += slippage;
        self.total_turnover += turnover;
        self.capital -= commission + slippage;
        self.clamp_capital();

        let per_hand = if trade.volume > 0 {
            (
                commission / trade.volume as f64,
                slippage / trade.volume as f64,
            )
        } else {
            (0.0, 0.0)
        };

        self.pair(trade, per_hand.0, per_hand.1);
        self.trades.push(trade.clone());
    }

    /// FIFO pairing: a Long fill covers open shorts first, a Short fill
    /// exits open longs first; the unmatched remainder opens a new lot.
    fn pair(&mut self, trade: &Trade, commission_per_hand: f64, slippage_per_hand: f64) {
        let mut remaining = trade.volume;
        let size = self.instrument.size;

        // Queue of lots this fill closes, and the direction those lots held.
        let (queue, held) = match trade.direction {
            Direction::Long => (&mut self.open_shorts, Direction::Short),
            Direction::Short => (&mut self.open_longs, Direction::Long),
        };

        while remaining > 0 {
            let Some(lot) = queue.front_mut() else { break };
            let matched = remaining.min(lot.volume);

            let gross = match held {
                Direction::Long => (trade.price - lot.price) * matched as f64 * size,
                Direction::Short => (lot.price - trade.price) * matched as f64 * size,
            };
            let commission =
                (lot.commission_per_hand + commission_per_hand) * matched as f64;
            let slippage = (lot.slippage_per_hand + slippage_per_hand) * matched as f64;

            self.round_trips.push(RoundTrip {
                direction: held,
                entry_date: lot.date,
                exit_date: trade.trading_day,
                entry_price: lot.price,
                exit_price: trade.price,
                volume: matched,
                gross_pnl: gross,
                pnl: gross - commission - slippage,
                commission,
                slippage,
            });

            // Costs were deducted at fill time, so capital takes the gross leg.
            self.capital += gross;

            lot.volume -= matched;
            remaining -= matched;
            if lot.volume == 0 {
                queue.pop_front();
            }
        }
        self.clamp_capital();

        if remaining > 0 {
            let opened = match trade.direction {
                Direction::Long => &mut self.open_longs,
                Direction::Short => &mut self.open_shorts,
            };
            opened.push_back(OpenLot {
                price: trade.price,
                volume: remaining,
                date: trade.trading_day,
                commission_per_hand,
                slippage_per_hand,
            });
        }
    }

    fn clamp_capital(&mut self) {
        if self.capital < 0.0 {
            warn!(capital = self.capital, "capital exhausted; clamped to zero");
            self.capital = 0.0;
        }
    }

    /// Build one result per trading day from the marks and the ledger,
    /// chaining each day's close into the next day's carry-in mark.
    pub fn daily_results(&self) -> Vec<DailyResult> {
        let size = self.instrument.size;
        let mut trades_by_day: BTreeMap<NaiveDate, Vec<&Trade>> = BTreeMap::new();
        for trade in &self.trades {
            trades_by_day.entry(trade.trading_day).or_default().push(trade);
        }

        let mut results = Vec::with_capacity(self.close_marks.len());
        let mut position: i64 = 0;
        let mut pre_close: Option<f64> = None;

        for (&date, &close) in &self.close_marks {
            let mut daily = DailyResult::new(date, close);
            // First day has no prior mark; holding P&L starts from its own close.
            daily.pre_close = pre_close.unwrap_or(close);
            daily.open_pos = position;

            let holding_pnl = position as f64 * (close - daily.pre_close) * size;
            let mut trading_pnl = 0.0;

            if let Some(day_trades) = trades_by_day.get(&date) {
                for trade in day_trades {
                    position += trade.signed_volume();
                    trading_pnl += trade.signed_volume() as f64 * (close - trade.price) * size;
                    daily.turnover += trade.price * trade.volume as f64 * size;
                    daily.commission += self.instrument.commission(trade.price, trade.volume);
                    daily.slippage += self.instrument.slippage_cost(trade.volume);
                    daily.trade_count += 1;
                }
            }

            daily.close_pos = position;
            daily.net_pnl = holding_pnl + trading_pnl - daily.commission - daily.slippage;
            pre_close = Some(close);
            results.push(daily);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Offset, OrderId, TradeId};

    fn instrument() -> Instrument {
        Instrument {
            symbol: "rb2401".into(),
            size: 10.0,
            price_tick: 1.0,
            margin_rate: 0.1,
            commission_rate: 0.0,
            fixed_commission: 1.0,
            slippage: 0.5,
        }
    }

    fn trade(
        seq: u64,
        day: u32,
        direction: Direction,
        offset: Offset,
        price: f64,
        volume: u32,
    ) -> Trade {
        let date = NaiveDate::from_ymd_opt(2023, 9, day).unwrap();
        Trade {
            id: TradeId(seq),
            order_id: OrderId(seq),
            symbol: "rb2401".into(),
            direction,
            offset,
            price,
            volume,
            datetime: date.and_hms_opt(9, 30, 0).unwrap(),
            trading_day: date,
        }
    }

    #[test]
    fn round_trip_pairs_fifo_with_partial_split() {
        let mut acc = PerformanceAccountant::new(instrument(), 100_000.0);
        acc.on_trade(&trade(1, 4, Direction::Long, Offset::Open, 100.0, 2));
        acc.on_trade(&trade(2, 4, Direction::Long, Offset::Open, 102.0, 1));
        // Exit 3 hands at 105: 2 off the first lot, 1 off the second.
        acc.on_trade(&trade(3, 5, Direction::Short, Offset::Close, 105.0, 3));

        let rts = acc.round_trips();
        assert_eq!(rts.len(), 2);
        assert_eq!(rts[0].volume, 2);
        assert_eq!(rts[0].entry_price, 100.0);
        assert_eq!(rts[0].gross_pnl, (105.0 - 100.0) * 2.0 * 10.0);
        assert_eq!(rts[1].volume, 1);
        assert_eq!(rts[1].entry_price, 102.0);
        assert!(acc.open_longs.is_empty());
    }

    #[test]
    fn short_round_trip_profits_when_price_falls() {
        let mut acc = PerformanceAccountant::new(instrument(), 100_000.0);
        acc.on_trade(&trade(1, 4, Direction::Short, Offset::Open, 100.0, 1));
        acc.on_trade(&trade(2, 5, Direction::Long, Offset::Close, 95.0, 1));
        let rt = &acc.round_trips()[0];
        assert_eq!(rt.direction, Direction::Short);
        assert_eq!(rt.gross_pnl, 50.0);
        // per-hand costs: entry 1 + 5, exit 1 + 5
        assert_eq!(rt.pnl, 50.0 - 2.0 - 10.0);
    }

    #[test]
    fn capital_identity_holds_over_a_closed_book() {
        let mut acc = PerformanceAccountant::new(instrument(), 100_000.0);
        acc.on_trade(&trade(1, 4, Direction::Long, Offset::Open, 100.0, 2));
        acc.on_trade(&trade(2, 5, Direction::Short, Offset::Close, 103.0, 2));
        acc.on_trade(&trade(3, 5, Direction::Short, Offset::Open, 103.0, 1));
        acc.on_trade(&trade(4, 6, Direction::Long, Offset::Close, 101.0, 1));

        let gross: f64 = acc.round_trips().iter().map(|rt| rt.gross_pnl).sum();
        let net: f64 = acc.round_trips().iter().map(|rt| rt.pnl).sum();
        let delta = acc.capital() - acc.initial_capital();
        assert!((gross - (delta + acc.total_commission() + acc.total_slippage())).abs() < 1e-9);
        assert!((net - delta).abs() < 1e-9);
    }

    #[test]
    fn capital_clamps_at_zero() {
        let mut acc = PerformanceAccountant::new(instrument(), 10.0);
        acc.on_trade(&trade(1, 4, Direction::Long, Offset::Open, 100.0, 1));
        // Exit far underwater: gross = -500, way past the tiny account.
        acc.on_trade(&trade(2, 5, Direction::Short, Offset::Close, 50.0, 1));
        assert_eq!(acc.capital(), 0.0);
    }

    #[test]
    fn daily_results_chain_marks_and_positions() {
        let mut acc = PerformanceAccountant::new(instrument(), 100_000.0);
        let d4 = NaiveDate::from_ymd_opt(2023, 9, 4).unwrap();
        let d5 = NaiveDate::from_ymd_opt(2023, 9, 5).unwrap();
        let d6 = NaiveDate::from_ymd_opt(2023, 9, 6).unwrap();

        acc.on_trade(&trade(1, 4, Direction::Long, Offset::Open, 100.0, 1));
        acc.mark_close(d4, 102.0);
        acc.mark_close(d5, 104.0);
        acc.on_trade(&trade(2, 6, Direction::Short, Offset::Close, 103.0, 1));
        acc.mark_close(d6, 101.0);

        let daily = acc.daily_results();
        assert_eq!(daily.len(), 3);

        // Day 4: buy at 100, marked at 102 → trading pnl 20, costs 1 + 5.
        assert_eq!(daily[0].open_pos, 0);
        assert_eq!(daily[0].close_pos, 1);
        assert!((daily[0].net_pnl - (20.0 - 6.0)).abs() < 1e-9);

        // Day 5: carry 1 hand, 102 → 104.
        assert_eq!(daily[1].open_pos, 1);
        assert_eq!(daily[1].close_pos, 1);
        assert_eq!(daily[1].trade_count, 0);
        assert!((daily[1].net_pnl - 20.0).abs() < 1e-9);

        // Day 6: holding 104 → 101 on 1 hand = -30; sell at 103 marked at
        // 101 → trading pnl = -1 * (101 - 103) * 10 = +20; costs 6.
        assert_eq!(daily[2].open_pos, 1);
        assert_eq!(daily[2].close_pos, 0);
        assert!((daily[2].net_pnl - (-30.0 + 20.0 - 6.0)).abs() < 1e-9);

        // Continuity invariant.
        assert_eq!(daily[0].close_pos, daily[1].open_pos);
        assert_eq!(daily[1].close_pos, daily[2].open_pos);
        assert_eq!(daily[1].pre_close, 102.0);
    }

    #[test]
    fn reversal_fill_closes_then_opens() {
        let mut acc = PerformanceAccountant::new(instrument(), 100_000.0);
        acc.on_trade(&trade(1, 4, Direction::Long, Offset::Open, 100.0, 1));
        // Sell 2: closes the long and leaves 1 hand short.
        acc.on_trade(&trade(2, 5, Direction::Short, Offset::Open, 104.0, 2));
        assert_eq!(acc.round_trips().len(), 1);
        assert_eq!(acc.open_shorts.len(), 1);
        assert_eq!(acc.open_shorts[0].volume, 1);
    }
}
