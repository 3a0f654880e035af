//! Orders and trades.
//!
//! A `StopOrder` is a conditional order resting in the book. When it
//! triggers, the engine synthesizes one fully-filled `Order` and one `Trade`;
//! the trade ledger is the sole basis for position and P&L.

use crate::domain::ids::{OrderId, StopOrderId, TradeId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Trade direction of the order itself (not the resulting position sign:
/// a Long order with Close offset covers a short position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for Long, -1 for Short — the sign applied to traded volume.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Position-effect tag required by Chinese futures exchanges.
///
/// The today/yesterday split affects the commission tier at a real broker;
/// in the simulator all three close variants reduce position identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
    CloseToday,
    CloseYesterday,
}

impl Offset {
    pub fn is_close(self) -> bool {
        !matches!(self, Offset::Open)
    }
}

/// Stop-order lifecycle. One-directional: Waiting → Triggered or
/// Waiting → Cancelled; never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopOrderStatus {
    Waiting,
    Triggered,
    Cancelled,
}

/// A conditional order resting in the stop-order book.
///
/// `stop_profile = false` is the stop-loss/breakout variant: it fires when
/// price crosses *through* the trigger adversely. `stop_profile = true` is
/// the stop-profit variant: limit-like, it fires as soon as price *reaches*
/// the trigger favorably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopOrder {
    pub id: StopOrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub trigger_price: f64,
    pub volume: u32,
    /// Tie-break rank: lower number was inserted earlier.
    pub priority: u64,
    pub status: StopOrderStatus,
    pub stop_profile: bool,
}

/// Order status of a synthesized order. The simulator fills in one shot,
/// so the only terminal state it produces is `AllTraded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    AllTraded,
}

/// Synthetic order emitted for each triggered stop order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub stop_order_id: StopOrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: u32,
    pub status: OrderStatus,
    pub datetime: NaiveDateTime,
}

/// Confirmed fill. Immutable, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: f64,
    pub volume: u32,
    pub datetime: NaiveDateTime,
    pub trading_day: NaiveDate,
}

impl Trade {
    /// Signed volume: positive for Long fills, negative for Short.
    /// `position == sum(signed_volume)` over the whole ledger.
    pub fn signed_volume(&self) -> i64 {
        self.direction.sign() * self.volume as i64
    }
}
