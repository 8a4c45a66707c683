use docflow_core::api::{AppConfig, CliError};

use crate::app;
use crate::commands::cli::RunArgs;

/// Layers command-line flags over the loaded configuration.
pub fn apply_overrides(cfg: &mut AppConfig, args: &RunArgs) -> Result<(), CliError> {
    if let Some(v) = &args.account_id {
        cfg.source.account_id = v.clone();
    }
    if let Some(v) = &args.token {
        cfg.source.token = v.clone();
    }
    if let Some(v) = &args.base_uri {
        cfg.source.base_uri = v.clone();
    }
    if let Some(v) = &args.data_dir {
        cfg.pipeline.data_dir = v.clone();
    }
    if let Some(v) = &args.notify_url {
        cfg.notify.url = v.clone();
    }
    for raw in &args.notify_headers {
        let (key, value) = parse_header(raw)?;
        cfg.notify.headers.insert(key, value);
    }
    if let Some(n) = args.max_parallel {
        cfg.pipeline.max_parallel = n;
    }
    if let Some(secs) = args.unit_timeout_secs {
        cfg.pipeline.unit_timeout_ms = secs.saturating_mul(1000);
    }
    if args.progress {
        cfg.notify.progress = true;
    }
    if args.progress_json {
        cfg.events_out.enabled = true;
        cfg.events_out.path = "stdout:".to_string();
        cfg.events_out.drop_when_full = false;
    }
    Ok(())
}

fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        CliError::Config(format!(
            "invalid --notify-header {raw:?}: expected KEY=VALUE"
        ))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Config(format!(
            "invalid --notify-header {raw:?}: empty header name"
        )));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub async fn handle_run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, &args)?;
    let report = app::run_batch(cfg).await?;
    Ok(app::exit_code_for_report(&report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut cfg = AppConfig::default();
        cfg.source.account_id = "from-file".to_string();
        let args = RunArgs {
            account_id: Some("acct-9".to_string()),
            notify_headers: vec!["X-Api-Key = abc".to_string(), "Accept=a=b".to_string()],
            unit_timeout_secs: Some(30),
            progress_json: true,
            ..RunArgs::default()
        };

        apply_overrides(&mut cfg, &args).unwrap();

        assert_eq!(cfg.source.account_id, "acct-9");
        assert_eq!(cfg.notify.headers["X-Api-Key"], "abc");
        assert_eq!(cfg.notify.headers["Accept"], "a=b");
        assert_eq!(cfg.pipeline.unit_timeout_ms, 30_000);
        assert_eq!(cfg.events_out.path, "stdout:");
        assert!(cfg.events_out.enabled);
        assert!(!cfg.events_out.drop_when_full);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.max_parallel = 3;
        apply_overrides(&mut cfg, &RunArgs::default()).unwrap();
        assert_eq!(cfg.pipeline.max_parallel, 3);
        assert!(!cfg.notify.progress);
    }

    #[test]
    fn test_malformed_header_is_config_error() {
        let mut cfg = AppConfig::default();
        for bad in ["no-separator", "=value"] {
            let args = RunArgs {
                notify_headers: vec![bad.to_string()],
                ..RunArgs::default()
            };
            let err = apply_overrides(&mut cfg, &args).unwrap_err();
            assert!(matches!(err, CliError::Config(_)), "{bad}: {err}");
        }
    }
}
