use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default docflow data directory: ~/.docflow
pub fn get_docflow_home_dir() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".docflow"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.docflow/config.toml (highest)
    let docflow_dir = get_docflow_home_dir()?;
    let home_config = docflow_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if home_config.exists() {
        load_from_path(&home_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    // Keep the events_out mirror under the docflow directory if using default
    if cfg.events_out.path == "./progress.events.jsonl" {
        let events_dir = docflow_dir.join("events_out");
        std::fs::create_dir_all(&events_dir)?;
        cfg.events_out.path = events_dir
            .join("progress.events.jsonl")
            .to_string_lossy()
            .to_string();
    }

    if cfg
        .logging
        .directory
        .as_ref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        let logs_dir = docflow_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (Priority 0: highest)
    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok());

    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
}

/// Apply `DOCFLOW_*` overrides. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("DOCFLOW_SOURCE_TOKEN") {
        cfg.source.token = v;
    }
    if let Some(v) = get("DOCFLOW_ACCOUNT_ID") {
        cfg.source.account_id = v;
    }
    if let Some(v) = get("DOCFLOW_SOURCE_BASE_URI") {
        cfg.source.base_uri = v;
    }
    if let Some(v) = get("DOCFLOW_CONVERTER_URL") {
        cfg.converter.url = v;
    }
    if let Some(v) = get("DOCFLOW_CONVERTER_API_KEY") {
        cfg.converter.api_key = v;
    }
    if let Some(v) = get("DOCFLOW_GRAPH_URI") {
        cfg.graph.uri = v;
    }
    if let Some(v) = get("DOCFLOW_GRAPH_USER") {
        cfg.graph.user = v;
    }
    if let Some(v) = get("DOCFLOW_GRAPH_PASSWORD") {
        cfg.graph.password = v;
    }
    if let Some(v) = get("DOCFLOW_EMBEDDING_TOKEN") {
        cfg.graph.embedding_token = v;
    }
    if let Some(v) = get("DOCFLOW_NOTIFY_URL") {
        cfg.notify.url = v;
    }
}
