//! Domain types for the backtesting engine.

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod results;

pub use bar::{Bar, Tick};
pub use ids::{OrderId, StopOrderId, TradeId};
pub use instrument::Instrument;
pub use order::{Direction, Offset, Order, OrderStatus, StopOrder, StopOrderStatus, Trade};
pub use results::{DailyResult, RoundTrip};

/// Symbol type alias
pub type Symbol = String;
