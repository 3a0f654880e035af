//! IndicatorWindow — fixed-capacity rolling OHLCV history.
//!
//! The window absorbs closed bars and answers indicator queries over the
//! retained history. It reports not-ready (`None`) until `capacity` bars
//! have been seen; any trading decision that depends on an unready
//! indicator must no-op.

use crate::domain::Bar;
use crate::indicators;

#[derive(Debug, Clone)]
pub struct IndicatorWindow {
    capacity: usize,
    count: usize,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl IndicatorWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self {
            capacity,
            count: 0,
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
        }
    }

    /// Absorb one closed bar, dropping the oldest when full.
    pub fn update(&mut self, bar: &Bar) {
        if self.open.len() == self.capacity {
            self.open.remove(0);
            self.high.remove(0);
            self.low.remove(0);
            self.close.remove(0);
            self.volume.remove(0);
        }
        self.open.push(bar.open);
        self.high.push(bar.high);
        self.low.push(bar.low);
        self.close.push(bar.close);
        self.volume.push(bar.volume);
        self.count += 1;
    }

    /// True once the window has seen at least `capacity` bars.
    pub fn is_ready(&self) -> bool {
        self.count >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn closes(&self) -> &[f64] {
        &self.close
    }

    pub fn highs(&self) -> &[f64] {
        &self.high
    }

    pub fn lows(&self) -> &[f64] {
        &self.low
    }

    /// Wilder ATR over the retained history. `None` until ready.
    pub fn atr(&self, period: usize) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let tr = indicators::true_range(&self.high, &self.low, &self.close);
        indicators::atr(&tr, period)
    }

    /// Simple moving average of closes. `None` until ready.
    pub fn sma(&self, period: usize) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        indicators::sma(&self.close, period)
    }

    /// Channel (Donchian) extremes over the last `period` bars:
    /// (highest high, lowest low). `None` until ready.
    pub fn channel(&self, period: usize) -> Option<(f64, f64)> {
        if !self.is_ready() {
            return None;
        }
        let up = indicators::highest(&self.high, period)?;
        let down = indicators::lowest(&self.low, period)?;
        Some((up, down))
    }
}
