//! StopOrderBook — pending conditional orders and trigger resolution.
//!
//! The book owns every stop order for one instrument from insertion until
//! it triggers or is cancelled. `resolve_triggers` is the deterministic
//! heart of the simulator: orders trigger one at a time, in a fixed sort
//! order, and after every trigger the remaining candidates are re-evaluated
//! against the post-fill position before the next one may fire.
//!
//! Sort order within a bar:
//! - four buckets by (direction, offset): long-open, short-close,
//!   short-open, long-close;
//! - long-open by (price asc, priority asc); long-close by (price asc,
//!   priority asc) reversed; short-close and short-open by (price asc,
//!   priority desc) reversed;
//! - bearish bar (open >= close) concatenates [short-close, long-close,
//!   long-open, short-open]; bullish concatenates [long-close, short-close,
//!   short-open, long-open]. Closing buckets always precede opening ones.

use crate::domain::{Bar, Direction, Offset, StopOrder, StopOrderId, StopOrderStatus, Tick};
use std::collections::BTreeMap;
use tracing::warn;

/// Hard cap on trigger rounds per bar. A bar that keeps producing triggers
/// past this is abandoned for liveness; the run continues on the next bar.
pub const MAX_TRIGGER_ROUNDS: usize = 100;

/// The market event driving one resolution pass: a closed bar (OHLC
/// crossing semantics) or a single tick (last-price semantics).
#[derive(Debug, Clone, Copy)]
pub enum MarketView<'a> {
    Bar(&'a Bar),
    Tick(&'a Tick),
}

impl<'a> MarketView<'a> {
    /// Bucket concatenation order follows the bar direction. A tick carries
    /// no direction and sorts as bearish, same as a doji bar.
    pub fn is_bearish(&self) -> bool {
        match self {
            MarketView::Bar(bar) => bar.is_bearish(),
            MarketView::Tick(_) => true,
        }
    }

    /// Best obtainable price for the buy side (bar open or last trade).
    fn buy_best(&self) -> f64 {
        match self {
            MarketView::Bar(bar) => bar.open,
            MarketView::Tick(tick) => tick.last_price,
        }
    }

    /// Worst price the bar reached on the buy side.
    fn buy_worst(&self) -> f64 {
        match self {
            MarketView::Bar(bar) => bar.high,
            MarketView::Tick(tick) => tick.last_price,
        }
    }

    fn sell_best(&self) -> f64 {
        match self {
            MarketView::Bar(bar) => bar.open,
            MarketView::Tick(tick) => tick.last_price,
        }
    }

    fn sell_worst(&self) -> f64 {
        match self {
            MarketView::Bar(bar) => bar.low,
            MarketView::Tick(tick) => tick.last_price,
        }
    }
}

/// Parameters for a new stop order; the book assigns id, priority, status.
#[derive(Debug, Clone, PartialEq)]
pub struct StopOrderRequest {
    pub direction: Direction,
    pub offset: Offset,
    pub trigger_price: f64,
    pub volume: u32,
    pub stop_profile: bool,
}

/// One trigger produced by `resolve_triggers`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub stop_order_id: StopOrderId,
    pub direction: Direction,
    pub offset: Offset,
    pub stop_profile: bool,
    pub volume: u32,
    pub trigger_price: f64,
    pub fill_price: f64,
    /// 1-based round index within the bar. Closing fills always carry a
    /// round index no later than opening fills that crossed the same bar.
    pub round: usize,
}

/// A book mutation requested from inside a fill callback, applied between
/// rounds in the order the strategy issued it.
#[derive(Debug, Clone, PartialEq)]
pub enum BookCommand {
    Insert(StopOrderRequest),
    Cancel(StopOrderId),
    CancelAll,
}

/// What the caller did with a trigger: the position after applying the
/// fill, plus any book mutations the strategy queued from inside its fill
/// callback. Both become visible to the next round.
#[derive(Debug, Default)]
pub struct TriggerOutcome {
    pub position: i64,
    pub commands: Vec<BookCommand>,
}

/// Consumer of trigger events during a resolution pass.
pub trait TriggerSink {
    fn on_trigger(&mut self, event: &TriggerEvent) -> TriggerOutcome;
}

#[derive(Debug, Default)]
pub struct StopOrderBook {
    symbol: String,
    orders: BTreeMap<StopOrderId, StopOrder>,
    next_id: u64,
}

impl StopOrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            orders: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// The id the next `insert` will assign.
    pub fn peek_next_id(&self) -> StopOrderId {
        StopOrderId(self.next_id)
    }

    /// Insert a new stop order in Waiting state.
    ///
    /// Zero volume is tolerated: the order is tracked for bookkeeping but
    /// will never trigger.
    pub fn insert(&mut self, req: StopOrderRequest) -> StopOrderId {
        let id = StopOrderId(self.next_id);
        self.next_id += 1;

        if req.volume == 0 {
            warn!(%id, trigger_price = req.trigger_price, "zero-volume stop order inserted; it will never trigger");
        }

        let order = StopOrder {
            id,
            symbol: self.symbol.clone(),
            direction: req.direction,
            offset: req.offset,
            trigger_price: req.trigger_price,
            volume: req.volume,
            priority: id.0,
            status: StopOrderStatus::Waiting,
            stop_profile: req.stop_profile,
        };
        self.orders.insert(id, order);
        id
    }

    /// Cancel a waiting order. Idempotent: returns false without effect if
    /// the order is unknown, already triggered, or already cancelled.
    pub fn cancel(&mut self, id: StopOrderId) -> bool {
        match self.orders.get_mut(&id) {
            Some(order) if order.status == StopOrderStatus::Waiting => {
                order.status = StopOrderStatus::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Cancel every waiting order, returning the ids actually cancelled.
    pub fn cancel_all(&mut self) -> Vec<StopOrderId> {
        let ids: Vec<StopOrderId> = self
            .orders
            .values()
            .filter(|o| o.status == StopOrderStatus::Waiting)
            .map(|o| o.id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        ids
    }

    pub fn get(&self, id: StopOrderId) -> Option<&StopOrder> {
        self.orders.get(&id)
    }

    pub fn waiting_orders(&self) -> impl Iterator<Item = &StopOrder> {
        self.orders
            .values()
            .filter(|o| o.status == StopOrderStatus::Waiting)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting_orders().count()
    }

    /// Resolve all triggers for one market event.
    ///
    /// Orders fire one per round. After each trigger the sink applies the
    /// fill (position change, strategy callbacks); any orders it inserted
    /// or cancelled take part in subsequent rounds of the same bar. The
    /// pass ends when a full scan produces no trigger, or at
    /// `MAX_TRIGGER_ROUNDS` with a warning.
    pub fn resolve_triggers(
        &mut self,
        view: &MarketView,
        mut position: i64,
        sink: &mut dyn TriggerSink,
    ) -> Vec<TriggerEvent> {
        let mut events = Vec::new();

        for round in 1..=MAX_TRIGGER_ROUNDS {
            let Some(event) = self.fire_first(view, position, round) else {
                return events;
            };

            let outcome = sink.on_trigger(&event);
            events.push(event);

            position = outcome.position;
            for command in outcome.commands {
                match command {
                    BookCommand::Insert(req) => {
                        self.insert(req);
                    }
                    BookCommand::Cancel(id) => {
                        self.cancel(id);
                    }
                    BookCommand::CancelAll => {
                        self.cancel_all();
                    }
                }
            }
        }

        if self.scan(view, position).is_some() {
            warn!(
                symbol = %self.symbol,
                rounds = MAX_TRIGGER_ROUNDS,
                "trigger resolution hit the round cap; abandoning remaining stop orders for this bar"
            );
        }
        events
    }

    /// Find, mark and report the first order that triggers this round.
    fn fire_first(&mut self, view: &MarketView, position: i64, round: usize) -> Option<TriggerEvent> {
        let (id, fill_price) = self.scan(view, position)?;
        let order = self.orders.get_mut(&id).expect("scanned order exists");
        order.status = StopOrderStatus::Triggered;
        Some(TriggerEvent {
            stop_order_id: id,
            direction: order.direction,
            offset: order.offset,
            stop_profile: order.stop_profile,
            volume: order.volume,
            trigger_price: order.trigger_price,
            fill_price,
            round,
        })
    }

    /// Scan the sorted candidates and return the first that triggers, with
    /// its fill price. Does not mutate.
    fn scan(&self, view: &MarketView, position: i64) -> Option<(StopOrderId, f64)> {
        for id in self.sorted_candidates(view) {
            let order = &self.orders[&id];
            if !Self::close_is_covered(order, position) {
                continue;
            }
            if let Some(fill_price) = evaluate(order, view) {
                return Some((id, fill_price));
            }
        }
        None
    }

    /// A closing order is only eligible while the position it closes is at
    /// least its volume; a fill earlier in the bar can invalidate it (or a
    /// fresh open can validate it) between rounds.
    fn close_is_covered(order: &StopOrder, position: i64) -> bool {
        if !order.offset.is_close() {
            return true;
        }
        match order.direction {
            // Short close sells out of a long position.
            Direction::Short => position >= order.volume as i64,
            // Long close covers a short position.
            Direction::Long => -position >= order.volume as i64,
        }
    }

    /// Build the evaluation order for one round: four (direction, offset)
    /// buckets, each with its own price/priority tie-break, concatenated by
    /// bar direction with closing buckets first.
    fn sorted_candidates(&self, view: &MarketView) -> Vec<StopOrderId> {
        let mut long_open: Vec<&StopOrder> = Vec::new();
        let mut short_close: Vec<&StopOrder> = Vec::new();
        let mut short_open: Vec<&StopOrder> = Vec::new();
        let mut long_close: Vec<&StopOrder> = Vec::new();

        for order in self.waiting_orders() {
            if order.volume == 0 {
                continue;
            }
            match (order.direction, order.offset.is_close()) {
                (Direction::Long, false) => long_open.push(order),
                (Direction::Short, true) => short_close.push(order),
                (Direction::Short, false) => short_open.push(order),
                (Direction::Long, true) => long_close.push(order),
            }
        }

        long_open.sort_by(|a, b| {
            a.trigger_price
                .total_cmp(&b.trigger_price)
                .then(a.priority.cmp(&b.priority))
        });
        short_close.sort_by(|a, b| {
            a.trigger_price
                .total_cmp(&b.trigger_price)
                .then(b.priority.cmp(&a.priority))
        });
        short_close.reverse();
        short_open.sort_by(|a, b| {
            a.trigger_price
                .total_cmp(&b.trigger_price)
                .then(b.priority.cmp(&a.priority))
        });
        short_open.reverse();
        long_close.sort_by(|a, b| {
            a.trigger_price
                .total_cmp(&b.trigger_price)
                .then(a.priority.cmp(&b.priority))
        });
        long_close.reverse();

        let buckets: [Vec<&StopOrder>; 4] = if view.is_bearish() {
            [short_close, long_close, long_open, short_open]
        } else {
            [long_close, short_close, short_open, long_open]
        };

        buckets
            .into_iter()
            .flatten()
            .map(|o| o.id)
            .collect()
    }
}

/// Does this order trigger on this market event, and at what price?
///
/// Stop variant: fires when price crosses through the trigger adversely;
/// fill is the bar open clamped towards the trigger, never better than the
/// trigger (gap-through fills at the open).
/// Stop-profit variant: limit-like, fires as soon as the trigger is reached
/// favorably; a favorable gap fills at the better open.
fn evaluate(order: &StopOrder, view: &MarketView) -> Option<f64> {
    let trigger = order.trigger_price;
    match (order.direction, order.stop_profile) {
        (Direction::Long, false) => {
            (view.buy_worst() >= trigger).then(|| view.buy_best().max(trigger))
        }
        (Direction::Short, false) => {
            (view.sell_worst() <= trigger).then(|| view.sell_best().min(trigger))
        }
        (Direction::Long, true) => {
            (view.sell_worst() <= trigger).then(|| view.buy_best().min(trigger))
        }
        (Direction::Short, true) => {
            (view.buy_worst() >= trigger).then(|| view.sell_best().max(trigger))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        let day = NaiveDate::from_ymd_opt(2023, 9, 4).unwrap();
        Bar {
            symbol: "rb2401".into(),
            datetime: day.and_hms_opt(9, 1, 0).unwrap(),
            trading_day: day,
            open,
            high,
            low,
            close,
            volume: 100.0,
            open_interest: 0.0,
        }
    }

    fn stop(direction: Direction, offset: Offset, trigger: f64, volume: u32) -> StopOrderRequest {
        StopOrderRequest {
            direction,
            offset,
            trigger_price: trigger,
            volume,
            stop_profile: false,
        }
    }

    /// Applies each fill to a running position; no strategy reaction.
    struct PositionSink {
        position: i64,
    }

    impl TriggerSink for PositionSink {
        fn on_trigger(&mut self, event: &TriggerEvent) -> TriggerOutcome {
            self.position += event.direction.sign() * event.volume as i64;
            TriggerOutcome {
                position: self.position,
                ..Default::default()
            }
        }
    }

    fn resolve(book: &mut StopOrderBook, bar: &Bar, position: i64) -> Vec<TriggerEvent> {
        let mut sink = PositionSink { position };
        book.resolve_triggers(&MarketView::Bar(bar), position, &mut sink)
    }

    #[test]
    fn long_stop_fills_at_trigger_when_open_below() {
        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fill_price, 100.0);
    }

    #[test]
    fn long_stop_fills_at_open_on_gap_through() {
        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let events = resolve(&mut book, &bar(103.0, 105.0, 102.0, 104.0), 0);
        assert_eq!(events[0].fill_price, 103.0);
    }

    #[test]
    fn short_stop_fills_at_trigger_capped_by_open() {
        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Short, Offset::Open, 100.0, 1));
        let events = resolve(&mut book, &bar(105.0, 106.0, 95.0, 96.0), 0);
        assert_eq!(events[0].fill_price, 100.0);
    }

    #[test]
    fn untouched_trigger_does_not_fire() {
        let mut book = StopOrderBook::new("rb2401");
        let id = book.insert(stop(Direction::Long, Offset::Open, 110.0, 1));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert!(events.is_empty());
        assert_eq!(book.get(id).unwrap().status, StopOrderStatus::Waiting);
    }

    #[test]
    fn stop_profit_fires_on_reach_and_fills_favorably() {
        let mut book = StopOrderBook::new("rb2401");
        // Take profit on a long position: sell once price reaches 104.
        book.insert(StopOrderRequest {
            direction: Direction::Short,
            offset: Offset::Close,
            trigger_price: 104.0,
            volume: 1,
            stop_profile: true,
        });
        let events = resolve(&mut book, &bar(103.0, 105.0, 102.0, 104.5), 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fill_price, 104.0);

        // Favorable gap: bar opens above the target, fill at the open.
        let mut book = StopOrderBook::new("rb2401");
        book.insert(StopOrderRequest {
            direction: Direction::Short,
            offset: Offset::Close,
            trigger_price: 104.0,
            volume: 1,
            stop_profile: true,
        });
        let events = resolve(&mut book, &bar(106.0, 107.0, 105.0, 106.5), 1);
        assert_eq!(events[0].fill_price, 106.0);
    }

    #[test]
    fn cancelled_order_is_ignored_by_resolution() {
        let mut book = StopOrderBook::new("rb2401");
        let id = book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        assert!(book.cancel(id));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert!(events.is_empty());
        assert_eq!(book.get(id).unwrap().status, StopOrderStatus::Cancelled);
    }

    #[test]
    fn cancel_is_idempotent_after_trigger() {
        let mut book = StopOrderBook::new("rb2401");
        let id = book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert_eq!(events.len(), 1);
        assert!(!book.cancel(id));
        assert_eq!(book.get(id).unwrap().status, StopOrderStatus::Triggered);
    }

    #[test]
    fn triggered_order_never_fires_twice() {
        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let first = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert_eq!(first.len(), 1);
        let second = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn zero_volume_order_is_tracked_but_never_fires() {
        let mut book = StopOrderBook::new("rb2401");
        let id = book.insert(stop(Direction::Long, Offset::Open, 100.0, 0));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        assert!(events.is_empty());
        assert_eq!(book.get(id).unwrap().status, StopOrderStatus::Waiting);
    }

    #[test]
    fn close_before_open_on_price_tie() {
        let mut book = StopOrderBook::new("rb2401");
        let close_id = book.insert(stop(Direction::Short, Offset::Close, 100.0, 1));
        let open_id = book.insert(stop(Direction::Short, Offset::Open, 100.0, 1));
        // Bullish bar: order is [long-close, short-close, short-open, long-open].
        let events = resolve(&mut book, &bar(99.0, 103.0, 98.0, 102.0), 1);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].stop_order_id, close_id);
        assert_eq!(events[1].stop_order_id, open_id);
        assert!(events[0].round <= events[1].round);
    }

    #[test]
    fn bearish_bar_evaluates_short_close_bucket_first() {
        let mut book = StopOrderBook::new("rb2401");
        let long_open = book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let short_close = book.insert(stop(Direction::Short, Offset::Close, 100.0, 1));
        // Bearish bar sweeping both triggers; position long 1 covers the close.
        let events = resolve(&mut book, &bar(105.0, 106.0, 95.0, 96.0), 1);
        assert_eq!(events[0].stop_order_id, short_close);
        assert_eq!(events[1].stop_order_id, long_open);
        let _ = long_open;
    }

    #[test]
    fn long_open_bucket_prefers_lower_price_then_insertion() {
        let mut book = StopOrderBook::new("rb2401");
        let high_trigger = book.insert(stop(Direction::Long, Offset::Open, 102.0, 1));
        let low_trigger = book.insert(stop(Direction::Long, Offset::Open, 99.0, 1));
        let low_later = book.insert(stop(Direction::Long, Offset::Open, 99.0, 1));
        let events = resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0);
        let order: Vec<StopOrderId> = events.iter().map(|e| e.stop_order_id).collect();
        assert_eq!(order, vec![low_trigger, low_later, high_trigger]);
    }

    #[test]
    fn uncovered_close_waits_until_an_open_fill_validates_it() {
        let mut book = StopOrderBook::new("rb2401");
        // Flat book: the close has nothing to close until the open fires.
        let close_id = book.insert(stop(Direction::Short, Offset::Close, 99.0, 1));
        let open_id = book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let events = resolve(&mut book, &bar(98.0, 105.0, 96.0, 102.0), 0);
        let order: Vec<StopOrderId> = events.iter().map(|e| e.stop_order_id).collect();
        // The open validates the close in a later round of the same bar.
        assert_eq!(order, vec![open_id, close_id]);
        assert_eq!(events[0].round, 1);
        assert_eq!(events[1].round, 2);
    }

    #[test]
    fn oversized_close_never_triggers() {
        let mut book = StopOrderBook::new("rb2401");
        let id = book.insert(stop(Direction::Short, Offset::Close, 100.0, 5));
        let events = resolve(&mut book, &bar(105.0, 106.0, 95.0, 96.0), 2);
        assert!(events.is_empty());
        assert_eq!(book.get(id).unwrap().status, StopOrderStatus::Waiting);
    }

    #[test]
    fn orders_inserted_by_sink_fire_within_the_same_bar() {
        struct Chaining {
            position: i64,
            chained: bool,
        }
        impl TriggerSink for Chaining {
            fn on_trigger(&mut self, event: &TriggerEvent) -> TriggerOutcome {
                self.position += event.direction.sign() * event.volume as i64;
                let commands = if !self.chained {
                    self.chained = true;
                    // Exit immediately: a close the bar's range also covers.
                    vec![BookCommand::Insert(StopOrderRequest {
                        direction: Direction::Short,
                        offset: Offset::Close,
                        trigger_price: 99.0,
                        volume: 1,
                        stop_profile: false,
                    })]
                } else {
                    Vec::new()
                };
                TriggerOutcome {
                    position: self.position,
                    commands,
                }
            }
        }

        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let mut sink = Chaining {
            position: 0,
            chained: false,
        };
        let events =
            book.resolve_triggers(&MarketView::Bar(&bar(98.0, 105.0, 96.0, 102.0)), 0, &mut sink);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].direction, Direction::Short);
        assert_eq!(events[1].round, 2);
        assert_eq!(sink.position, 0);
    }

    #[test]
    fn runaway_trigger_chain_stops_at_round_cap() {
        // A sink that flips position and re-arms an always-crossed stop on
        // every fill would loop forever; the cap abandons the bar instead.
        struct Flipper {
            position: i64,
        }
        impl TriggerSink for Flipper {
            fn on_trigger(&mut self, event: &TriggerEvent) -> TriggerOutcome {
                self.position += event.direction.sign() * event.volume as i64;
                let next = if event.direction == Direction::Long {
                    Direction::Short
                } else {
                    Direction::Long
                };
                TriggerOutcome {
                    position: self.position,
                    commands: vec![BookCommand::Insert(StopOrderRequest {
                        direction: next,
                        offset: Offset::Open,
                        trigger_price: 100.0,
                        volume: 1,
                        stop_profile: false,
                    })],
                }
            }
        }

        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let mut sink = Flipper { position: 0 };
        let events =
            book.resolve_triggers(&MarketView::Bar(&bar(99.0, 103.0, 96.0, 102.0)), 0, &mut sink);
        assert_eq!(events.len(), MAX_TRIGGER_ROUNDS);
        assert_eq!(events.last().unwrap().round, MAX_TRIGGER_ROUNDS);
    }

    #[test]
    fn tick_view_triggers_on_last_price() {
        let day = NaiveDate::from_ymd_opt(2023, 9, 4).unwrap();
        let tick = Tick {
            symbol: "rb2401".into(),
            datetime: day.and_hms_opt(9, 0, 1).unwrap(),
            trading_day: day,
            last_price: 101.0,
            volume: 10.0,
            open_interest: 0.0,
            bid_price: 100.5,
            bid_volume: 3.0,
            ask_price: 101.0,
            ask_volume: 2.0,
        };
        let mut book = StopOrderBook::new("rb2401");
        book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        book.insert(stop(Direction::Short, Offset::Open, 95.0, 1));
        let mut sink = PositionSink { position: 0 };
        let events = book.resolve_triggers(&MarketView::Tick(&tick), 0, &mut sink);
        // Only the long stop is crossed; it fills at the last price.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fill_price, 101.0);
    }

    #[test]
    fn cancel_all_reports_only_waiting_orders() {
        let mut book = StopOrderBook::new("rb2401");
        let a = book.insert(stop(Direction::Long, Offset::Open, 100.0, 1));
        let b = book.insert(stop(Direction::Short, Offset::Open, 90.0, 1));
        resolve(&mut book, &bar(98.0, 105.0, 97.0, 102.0), 0); // triggers a
        let cancelled = book.cancel_all();
        assert_eq!(cancelled, vec![b]);
        assert_eq!(book.get(a).unwrap().status, StopOrderStatus::Triggered);
        assert_eq!(book.waiting_count(), 0);
    }
}
