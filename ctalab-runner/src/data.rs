//! CSV feeds — bar and tick history for one symbol.
//!
//! The loader is the run's only I/O: it reads the whole file upfront,
//! filters by symbol and trading-day range, and returns a chronologically
//! sorted vector the core replays without touching the disk again.

use chrono::{NaiveDate, NaiveDateTime};
use ctalab_core::domain::{Bar, Tick};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("opening '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no rows for symbol '{symbol}' in the requested range")]
    Empty { symbol: String },
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    symbol: String,
    datetime: NaiveDateTime,
    trading_day: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    open_interest: f64,
}

#[derive(Debug, Deserialize)]
struct TickRecord {
    symbol: String,
    datetime: NaiveDateTime,
    trading_day: NaiveDate,
    last_price: f64,
    volume: f64,
    #[serde(default)]
    open_interest: f64,
    bid_price: f64,
    bid_volume: f64,
    ask_price: f64,
    ask_volume: f64,
}

/// Load one symbol's bars from a CSV file, sorted by timestamp.
///
/// Expected header: `symbol,datetime,trading_day,open,high,low,close,
/// volume,open_interest` (open interest optional).
pub fn load_bars_csv(
    path: &Path,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let record: BarRecord = record?;
        if record.symbol != symbol || !in_range(record.trading_day, start, end) {
            continue;
        }
        bars.push(Bar {
            symbol: record.symbol,
            datetime: record.datetime,
            trading_day: record.trading_day,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            open_interest: record.open_interest,
        });
    }
    if bars.is_empty() {
        return Err(LoadError::Empty {
            symbol: symbol.to_string(),
        });
    }
    bars.sort_by_key(|b| b.datetime);
    debug!(symbol, rows = bars.len(), "loaded bar history");
    Ok(bars)
}

/// Load one symbol's ticks from a CSV file, sorted by timestamp.
pub fn load_ticks_csv(
    path: &Path,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<Tick>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mut ticks = Vec::new();
    for record in reader.deserialize() {
        let record: TickRecord = record?;
        if record.symbol != symbol || !in_range(record.trading_day, start, end) {
            continue;
        }
        ticks.push(Tick {
            symbol: record.symbol,
            datetime: record.datetime,
            trading_day: record.trading_day,
            last_price: record.last_price,
            volume: record.volume,
            open_interest: record.open_interest,
            bid_price: record.bid_price,
            bid_volume: record.bid_volume,
            ask_price: record.ask_price,
            ask_volume: record.ask_volume,
        });
    }
    if ticks.is_empty() {
        return Err(LoadError::Empty {
            symbol: symbol.to_string(),
        });
    }
    ticks.sort_by_key(|t| t.datetime);
    debug!(symbol, rows = ticks.len(), "loaded tick history");
    Ok(ticks)
}

fn in_range(day: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
}
