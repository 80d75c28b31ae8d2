use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;

use crate::store::DataStore;

/// Counts from a run of the points job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsSummary {
    pub runs: u64,
    pub failures: u64,
}

/// Invoke the prediction-points procedure once.
pub async fn run_once(store: &dyn DataStore, procedure: &str) -> Result<serde_json::Value> {
    tracing::info!(procedure, "calculating prediction points");
    let value = store
        .call_procedure(procedure)
        .await
        .with_context(|| format!("Procedure '{}' failed", procedure))?;
    tracing::info!(procedure, "prediction points updated");
    Ok(value)
}

/// Invoke the procedure every `every`, starting immediately.
///
/// Failures are logged and the schedule continues. Each call is awaited
/// before the next tick, and missed ticks are skipped. Stops when `shutdown`
/// resolves or after `max_runs` invocations. A call still in flight when
/// `shutdown` resolves is abandoned and counted as neither success nor failure.
pub async fn run_every<F>(
    store: &dyn DataStore,
    procedure: &str,
    every: Duration,
    max_runs: Option<u64>,
    shutdown: F,
) -> PointsSummary
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut summary = PointsSummary::default();
    loop {
        if max_runs.is_some_and(|max| summary.runs >= max) {
            break;
        }

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("points schedule stopped");
                break;
            }
            _ = ticker.tick() => {
                summary.runs += 1;
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::info!(procedure, "points schedule stopped during a call");
                        break;
                    }
                    outcome = run_once(store, procedure) => {
                        if let Err(e) = outcome {
                            summary.failures += 1;
                            tracing::error!("{:#}", e);
                        }
                    }
                }
            }
        }
    }
    summary
}
