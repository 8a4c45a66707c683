use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::UnitError;
use crate::notify::Notifier;
use crate::progress::Phase;

use super::report::PhaseReport;
use super::unit::{PhaseProgress, UnitProgress, UnitReporter};

/// Launch policy for one phase.
#[derive(Debug, Clone, Default)]
pub struct FanOutOptions {
    /// Cap on concurrently running units; `None` runs them all at once.
    pub max_parallel: Option<usize>,
    /// Deadline per unit; an expired unit is cancelled and reported failed.
    pub unit_timeout: Option<Duration>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}

/// Run one unit per envelope concurrently and wait for the phase to drain.
///
/// # Arguments
///
/// * `phase` - Phase the fresh trackers belong to
/// * `envelope_ids` - Envelopes to process; duplicates are dropped
/// * `notifier` - Destination of every progress message
/// * `options` - Parallelism cap and per-unit timeout
/// * `run_unit` - Builds the unit future from its progress handle
///
/// Every unit runs in its own task. Whatever it returns, including a panic or
/// a timeout, is turned into exactly one terminal report on both trackers.
pub async fn run_phase<F, Fut>(
    phase: Phase,
    envelope_ids: Vec<String>,
    notifier: &Notifier,
    options: &FanOutOptions,
    run_unit: F,
) -> PhaseReport
where
    F: Fn(UnitProgress) -> Fut,
    Fut: Future<Output = Result<Vec<String>, UnitError>> + Send + 'static,
{
    let start = Instant::now();

    let mut seen = HashSet::new();
    let envelope_ids: Vec<String> = envelope_ids
        .into_iter()
        .filter(|id| {
            let fresh = seen.insert(id.clone());
            if !fresh {
                tracing::warn!(
                    target: "docflow.pipeline",
                    envelope_id = %id,
                    phase = %phase,
                    "duplicate envelope dropped"
                );
            }
            fresh
        })
        .collect();

    tracing::info!(
        target: "docflow.pipeline",
        phase = %phase,
        envelopes = envelope_ids.len(),
        max_parallel = ?options.max_parallel,
        "phase started"
    );

    let progress = Arc::new(PhaseProgress::new(
        phase,
        envelope_ids.len(),
        notifier.clone(),
    ));
    let sem = options.max_parallel.map(|n| Arc::new(Semaphore::new(n.max(1))));
    let mut futs = FuturesUnordered::new();

    for envelope_id in &envelope_ids {
        let reporter = UnitReporter::new(envelope_id, progress.clone());
        let unit = run_unit(reporter.handle());
        let sem = sem.clone();
        let timeout = options.unit_timeout;

        let task = tokio::spawn(async move {
            let _permit = match sem {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            match timeout {
                Some(limit) => tokio::time::timeout(limit, unit)
                    .await
                    .unwrap_or_else(|_| Err(UnitError::Timeout(limit))),
                None => unit.await,
            }
        });

        futs.push(async move { (reporter, task.await) });
    }

    let mut units = Vec::with_capacity(envelope_ids.len());
    while let Some((reporter, joined)) = futs.next().await {
        let outcome = match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(UnitError::Panicked(panic_message(err.into_panic()))),
            Err(err) => Err(UnitError::Panicked(err.to_string())),
        };
        units.push(reporter.finish(outcome).await);
    }

    progress.batch().wait_drained().await;

    let state = progress.batch().snapshot();
    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        target: "docflow.pipeline",
        phase = %phase,
        completed = state.completed_envelopes,
        failed = state.failed_envelopes(),
        items = state.completed_items,
        duration_ms,
        "phase drained"
    );

    PhaseReport {
        phase,
        skipped: false,
        state,
        units,
        duration_ms,
    }
}
