//! CLI assembly layer: builds adapters and sinks from the merged configuration,
//! runs one batch and summarizes the outcome.

use std::sync::Arc;
use std::time::Duration;

use docflow_core::api::{
    self as core_api, AppConfig, BatchReport, CliError, EventsOutSink, EventsOutTx, FanOutOptions,
    NotificationSink, Notifier, PhaseDriver, ProgressMonitor,
};
use docflow_plugins::factory;

/// Exit code for a run that finished but left failed envelopes behind.
pub const EXIT_PARTIAL_FAILURE: i32 = 40;

const EVENTS_OUT_GRACE: Duration = Duration::from_secs(5);

/// Assembles the notifier: webhook first, then the events-out stream and the
/// terminal monitor when enabled.
pub fn build_notifier(
    webhook: Option<Arc<dyn NotificationSink>>,
    events_out: Option<EventsOutTx>,
    monitor: Option<Arc<ProgressMonitor>>,
) -> Notifier {
    let mut notifier = Notifier::new();
    if let Some(webhook) = webhook {
        notifier.push(webhook);
    }
    if let Some(out) = events_out {
        notifier.push(Arc::new(EventsOutSink::new(out)));
    }
    if let Some(monitor) = monitor {
        notifier.push(monitor);
    }
    notifier
}

fn config_error(err: anyhow::Error) -> CliError {
    CliError::Config(format!("{err:#}"))
}

#[tracing::instrument(name = "cli.run_batch", skip_all)]
pub async fn run_batch(cfg: AppConfig) -> Result<BatchReport, CliError> {
    cfg.validate_for_run()?;

    let source = factory::build_source(&cfg).map_err(config_error)?;
    let converter = factory::build_converter(&cfg).map_err(config_error)?;
    let store = factory::build_store(&cfg).map_err(config_error)?;
    let webhook = factory::build_webhook(&cfg).map_err(config_error)?;

    let events_out = core_api::start_events_out(&cfg.events_out)
        .await
        .map_err(CliError::Command)?;
    let monitor = (cfg.notify.progress && atty::is(atty::Stream::Stderr))
        .then(|| Arc::new(ProgressMonitor::new(true)));
    let notifier = build_notifier(webhook, events_out.clone(), monitor.clone());

    tracing::info!(
        target: "docflow.cli",
        account_id = %cfg.source.account_id,
        data_dir = %cfg.pipeline.data_dir_path().display(),
        sinks = ?notifier.sink_names(),
        "starting batch"
    );

    let driver = PhaseDriver::builder()
        .source(source)
        .converter(converter)
        .store(store)
        .notifier(notifier)
        .data_dir(cfg.pipeline.data_dir_path())
        .options(FanOutOptions {
            max_parallel: cfg.pipeline.max_parallel(),
            unit_timeout: cfg.pipeline.unit_timeout(),
        })
        .build()?;

    let result = driver.run().await;

    // Release the driver's sink handles so the writer can drain.
    drop(driver);
    if let Some(monitor) = monitor {
        monitor.clear();
    }
    if let Some(out) = events_out {
        let dropped = out.dropped_count();
        if !out.shutdown(EVENTS_OUT_GRACE).await {
            tracing::warn!(target: "docflow.cli", "events_out did not drain in time");
        }
        if dropped > 0 {
            tracing::warn!(target: "docflow.cli", dropped, "events_out dropped lines");
        }
    }

    let report = result?;
    print_summary(&report);
    Ok(report)
}

pub fn exit_code_for_report(report: &BatchReport) -> i32 {
    if report.is_success() {
        0
    } else {
        EXIT_PARTIAL_FAILURE
    }
}

fn print_summary(report: &BatchReport) {
    eprintln!(
        "run {}: {} envelope(s) discovered",
        report.run_id, report.envelopes_discovered
    );
    for phase in &report.phases {
        if phase.skipped {
            eprintln!("  {:<14} skipped", phase.phase.as_str());
            continue;
        }
        let failed = phase.failed_ids();
        eprintln!(
            "  {:<14} {}/{} envelopes, {}/{} documents, {} failed ({} ms)",
            phase.phase.as_str(),
            phase.state.completed_envelopes,
            phase.state.total_envelopes,
            phase.state.completed_items,
            phase.state.total_items,
            failed.len(),
            phase.duration_ms
        );
        for unit in phase.units.iter().filter(|u| u.error.is_some()) {
            eprintln!(
                "    {}: {}",
                unit.envelope_id,
                unit.error.as_deref().unwrap_or_default()
            );
        }
    }
    for err in &report.post_index_errors {
        eprintln!("  post-index: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::api::PipelineError;

    #[tokio::test]
    async fn test_missing_settings_fail_before_any_work() {
        let err = run_batch(AppConfig::default()).await.unwrap_err();
        assert!(
            matches!(err, CliError::Pipeline(PipelineError::Config(_))),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_malformed_notify_url_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let events_path = dir.path().join("events.jsonl");

        let mut cfg = AppConfig::default();
        cfg.source.account_id = "acct-1".to_string();
        cfg.source.token = "tok".to_string();
        cfg.converter.url = "http://127.0.0.1:9/extract".to_string();
        cfg.notify.url = "not a url at all".to_string();
        cfg.pipeline.data_dir = dir.path().join("data").to_string_lossy().to_string();
        cfg.events_out.path = events_path.to_string_lossy().to_string();

        let err = run_batch(cfg).await.unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "{err}");
        assert!(err.to_string().contains("invalid webhook url"), "{err}");
        assert!(!events_path.exists());
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_notifier_includes_configured_sinks() {
        let mut cfg = AppConfig::default();
        assert!(build_notifier(None, None, None).is_empty());

        cfg.notify.url = "http://127.0.0.1:8787/webhook/progress".to_string();
        let webhook = factory::build_webhook(&cfg).unwrap();
        let monitor = Arc::new(ProgressMonitor::new(false));
        let notifier = build_notifier(webhook, None, Some(monitor));
        assert_eq!(notifier.sink_names(), vec!["webhook", "progress"]);
    }

    #[test]
    fn test_exit_code_reflects_failures() {
        let mut report = BatchReport::new("run-1".to_string());
        assert_eq!(exit_code_for_report(&report), 0);
        report.post_index_errors.push("build_indices: refused".to_string());
        assert_eq!(exit_code_for_report(&report), EXIT_PARTIAL_FAILURE);
    }
}
