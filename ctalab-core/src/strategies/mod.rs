//! Built-in strategies and the default registry.

mod channel_breakout;

pub use channel_breakout::ChannelBreakout;

use crate::strategy::StrategyRegistry;

/// Registry preloaded with every built-in strategy.
pub fn default_registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    registry.register("channel_breakout", |params| {
        Ok(Box::new(ChannelBreakout::from_params(params)?) as _)
    });
    registry
}
