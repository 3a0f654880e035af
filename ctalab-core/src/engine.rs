//! MatchingEngine — turns market events into fills and strategy callbacks.
//!
//! Per bar, in strict order: aggregate (and update the indicator window
//! when a window closes) → strategy decision callbacks → trigger
//! resolution. Each trigger synthesizes one fully-filled Order and one
//! Trade, applies the signed volume to the position, books the costs, and
//! invokes `on_stop_order`, `on_order`, `on_trade` in that order. Commands
//! a strategy queues inside `on_trade` join the remaining trigger rounds of
//! the same bar.

use crate::accounting::PerformanceAccountant;
use crate::aggregator::{BarAggregator, Period};
use crate::book::{BookCommand, MarketView, StopOrderBook, TriggerEvent, TriggerOutcome, TriggerSink};
use crate::domain::{
    Bar, Instrument, Order, OrderId, OrderStatus, StopOrder, StopOrderStatus, Tick, Trade, TradeId,
};
use crate::strategy::{Context, StopCommand, Strategy};
use crate::window::IndicatorWindow;
use chrono::{NaiveDate, NaiveDateTime};

pub struct MatchingEngine {
    instrument: Instrument,
    book: StopOrderBook,
    aggregator: BarAggregator,
    window: IndicatorWindow,
    strategy: Box<dyn Strategy>,
    accountant: PerformanceAccountant,
    position: i64,
    trading: bool,
    orders: Vec<Order>,
    next_order_id: u64,
    next_trade_id: u64,
    datetime: NaiveDateTime,
    trading_day: NaiveDate,
}

impl MatchingEngine {
    pub fn new(
        instrument: Instrument,
        period: Period,
        window_capacity: usize,
        initial_capital: f64,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        let accountant = PerformanceAccountant::new(instrument.clone(), initial_capital);
        let book = StopOrderBook::new(instrument.symbol.clone());
        Self {
            instrument,
            book,
            aggregator: BarAggregator::new(period),
            window: IndicatorWindow::new(window_capacity),
            strategy,
            accountant,
            position: 0,
            trading: false,
            orders: Vec::new(),
            next_order_id: 1,
            next_trade_id: 1,
            datetime: NaiveDateTime::default(),
            trading_day: NaiveDate::default(),
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn trading(&self) -> bool {
        self.trading
    }

    /// Warm-up replay runs with trading disabled; submissions are dropped.
    pub fn set_trading(&mut self, trading: bool) {
        self.trading = trading;
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn book(&self) -> &StopOrderBook {
        &self.book
    }

    pub fn window(&self) -> &IndicatorWindow {
        &self.window
    }

    pub fn accountant(&self) -> &PerformanceAccountant {
        &self.accountant
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Process one closed bar.
    pub fn on_bar(&mut self, bar: &Bar) {
        self.datetime = bar.datetime;
        self.trading_day = bar.trading_day;

        let emitted = self.aggregator.update(bar);
        if let Some(xbar) = &emitted {
            self.window.update(xbar);
        }

        self.notify(|strategy, ctx| strategy.on_bar(bar, ctx));
        if let Some(xbar) = &emitted {
            self.notify(|strategy, ctx| strategy.on_xmin_bar(xbar, ctx));
        }

        if self.trading {
            self.resolve(MarketView::Bar(bar));
        }
        self.accountant.mark_close(bar.trading_day, bar.close);
    }

    /// Process one tick. The tick is mirrored as a synthetic one-trade bar
    /// for aggregation and the `on_bar` decision callback; triggering uses
    /// last-price semantics. Tick runs normally pair with
    /// `Period::Minutes(1)` so every tick reaches the indicator window.
    pub fn on_tick(&mut self, tick: &Tick) {
        self.datetime = tick.datetime;
        self.trading_day = tick.trading_day;

        let synthetic = tick.to_bar();
        let emitted = self.aggregator.update(&synthetic);
        if let Some(xbar) = &emitted {
            self.window.update(xbar);
        }

        self.notify(|strategy, ctx| strategy.on_bar(&synthetic, ctx));
        if let Some(xbar) = &emitted {
            self.notify(|strategy, ctx| strategy.on_xmin_bar(xbar, ctx));
        }

        if self.trading {
            self.resolve(MarketView::Tick(tick));
        }
        self.accountant.mark_close(tick.trading_day, tick.last_price);
    }

    /// Run a strategy callback and apply the commands it queued.
    pub fn notify<F>(&mut self, f: F)
    where
        F: FnOnce(&mut dyn Strategy, &mut Context),
    {
        let next_stop_id = self.book.peek_next_id().0;
        let (commands, _) = self.collect(next_stop_id, f);
        self.apply_commands(commands);
    }

    /// Run a strategy callback, returning its queued commands and the
    /// advanced stop-id counter instead of touching the book.
    fn collect<F>(&mut self, next_stop_id: u64, f: F) -> (Vec<StopCommand>, u64)
    where
        F: FnOnce(&mut dyn Strategy, &mut Context),
    {
        let mut ctx = Context::new(
            &self.window,
            &self.instrument,
            self.position,
            self.accountant.capital(),
            self.trading,
            next_stop_id,
        );
        f(self.strategy.as_mut(), &mut ctx);
        ctx.into_commands()
    }

    fn apply_commands(&mut self, commands: Vec<StopCommand>) {
        for command in commands {
            match command {
                StopCommand::Insert(id, req) => {
                    let assigned = self.book.insert(req);
                    debug_assert_eq!(assigned, id);
                }
                StopCommand::Cancel(id) => {
                    if self.book.cancel(id) {
                        self.notify_stop_order(id);
                    }
                }
                StopCommand::CancelAll => {
                    for id in self.book.cancel_all() {
                        self.notify_stop_order(id);
                    }
                }
            }
        }
    }

    fn notify_stop_order(&mut self, id: crate::domain::StopOrderId) {
        if let Some(snapshot) = self.book.get(id).cloned() {
            self.notify(|strategy, ctx| strategy.on_stop_order(&snapshot, ctx));
        }
    }

    fn resolve(&mut self, view: MarketView<'_>) {
        let mut book = std::mem::take(&mut self.book);
        let position = self.position;
        let next_stop_id = book.peek_next_id().0;
        {
            let mut sink = ResolveSink {
                engine: self,
                next_stop_id,
            };
            book.resolve_triggers(&view, position, &mut sink);
        }
        self.book = book;
    }
}

/// Applies each trigger: fill synthesis, accounting, strategy callbacks.
struct ResolveSink<'e> {
    engine: &'e mut MatchingEngine,
    /// Mirror of the book's id counter while the book is out on loan, so
    /// ids handed to the strategy match the ones the book will assign.
    next_stop_id: u64,
}

impl TriggerSink for ResolveSink<'_> {
    fn on_trigger(&mut self, event: &TriggerEvent) -> TriggerOutcome {
        let mut next_stop_id = self.next_stop_id;
        let engine = &mut *self.engine;

        let order = Order {
            id: OrderId(engine.next_order_id),
            stop_order_id: event.stop_order_id,
            symbol: engine.instrument.symbol.clone(),
            direction: event.direction,
            offset: event.offset,
            price: event.fill_price,
            volume: event.volume,
            status: OrderStatus::AllTraded,
            datetime: engine.datetime,
        };
        engine.next_order_id += 1;

        let trade = Trade {
            id: TradeId(engine.next_trade_id),
            order_id: order.id,
            symbol: engine.instrument.symbol.clone(),
            direction: event.direction,
            offset: event.offset,
            price: event.fill_price,
            volume: event.volume,
            datetime: engine.datetime,
            trading_day: engine.trading_day,
        };
        engine.next_trade_id += 1;

        engine.position += trade.signed_volume();
        engine.accountant.on_trade(&trade);

        let snapshot = StopOrder {
            id: event.stop_order_id,
            symbol: engine.instrument.symbol.clone(),
            direction: event.direction,
            offset: event.offset,
            trigger_price: event.trigger_price,
            volume: event.volume,
            priority: event.stop_order_id.0,
            status: StopOrderStatus::Triggered,
            stop_profile: event.stop_profile,
        };

        let mut queued = Vec::new();
        let (commands, next) =
            engine.collect(next_stop_id, |strategy, ctx| strategy.on_stop_order(&snapshot, ctx));
        queued.extend(commands);
        next_stop_id = next;

        let (commands, next) =
            engine.collect(next_stop_id, |strategy, ctx| strategy.on_order(&order, ctx));
        queued.extend(commands);
        next_stop_id = next;

        let (commands, next) =
            engine.collect(next_stop_id, |strategy, ctx| strategy.on_trade(&trade, ctx));
        queued.extend(commands);
        next_stop_id = next;

        engine.orders.push(order);
        self.next_stop_id = next_stop_id;

        TriggerOutcome {
            position: engine.position,
            commands: queued.into_iter().map(to_book_command).collect(),
        }
    }
}

fn to_book_command(command: StopCommand) -> BookCommand {
    match command {
        StopCommand::Insert(_, req) => BookCommand::Insert(req),
        StopCommand::Cancel(id) => BookCommand::Cancel(id),
        StopCommand::CancelAll => BookCommand::CancelAll,
    }
}
