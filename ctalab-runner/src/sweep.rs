//! Parameter sweeps — cartesian expansion and parallel execution.
//!
//! An axis is a named parameter with a list of candidate values. The
//! expansion walks axes in sorted name order, so the resulting spec list
//! (and every job id in it) is deterministic. Jobs are independent and run
//! across the rayon pool; each owns its engine and accountant.

use crate::job::{run_job, JobOutcome, JobSpec};
use ctalab_core::StrategyRegistry;
use ctalab_core::domain::Bar;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;

/// Named parameter axes for a grid sweep.
pub type SweepAxes = BTreeMap<String, Vec<Value>>;

/// Expand a base spec across the cartesian product of the axes.
///
/// Empty axes produce the base spec alone. Axis values land in
/// `spec.params` under the axis name, overriding any base value.
pub fn expand_axes(base: &JobSpec, axes: &SweepAxes) -> Vec<JobSpec> {
    let mut specs = vec![base.clone()];
    for (name, values) in axes {
        if values.is_empty() {
            continue;
        }
        let mut next = Vec::with_capacity(specs.len() * values.len());
        for spec in &specs {
            for value in values {
                let mut candidate = spec.clone();
                candidate.params.insert(name.clone(), value.clone());
                next.push(candidate);
            }
        }
        specs = next;
    }
    specs
}

/// Run every spec over the shared bar feed, in parallel, preserving order.
pub fn run_sweep(
    registry: &StrategyRegistry,
    specs: &[JobSpec],
    bars: &[Bar],
) -> Vec<JobOutcome> {
    info!(jobs = specs.len(), "starting sweep");
    specs
        .par_iter()
        .map(|spec| run_job(registry, spec, bars))
        .collect()
}

/// One CSV row per job: identity, knobs and headline statistics.
#[derive(Debug, Serialize)]
struct SweepRow<'a> {
    job_id: &'a str,
    symbol: &'a str,
    strategy: &'a str,
    params: String,
    ending_balance: Option<f64>,
    total_net_pnl: Option<f64>,
    sharpe: Option<f64>,
    max_drawdown: Option<f64>,
    win_rate: Option<f64>,
    round_trips: Option<usize>,
    total_days: Option<usize>,
    failure: Option<&'a str>,
}

/// Write the sweep results as a flat CSV table.
pub fn write_sweep_csv<W: Write>(outcomes: &[JobOutcome], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for outcome in outcomes {
        let stats = outcome.stats.as_ref();
        csv_writer.serialize(SweepRow {
            job_id: &outcome.job_id,
            symbol: &outcome.spec.symbol,
            strategy: &outcome.spec.strategy,
            params: serde_json::to_string(&outcome.spec.params).unwrap_or_default(),
            ending_balance: stats.map(|s| s.ending_balance),
            total_net_pnl: stats.map(|s| s.total_net_pnl),
            sharpe: stats.map(|s| s.sharpe),
            max_drawdown: stats.map(|s| s.max_drawdown),
            win_rate: stats.map(|s| s.win_rate),
            round_trips: stats.map(|s| s.round_trip_count),
            total_days: stats.map(|s| s.total_days),
            failure: outcome.failure.as_deref(),
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
