use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};

use crate::config::EventsOutConfig;

const STDOUT_TARGET: &str = "stdout:";

fn line_preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s.to_string();
    }
    let end = s
        .char_indices()
        .take_while(|(i, _)| *i < MAX)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let mut out = s[..end].to_string();
    out.push_str("...");
    out
}

/// Handle to the background JSONL writer.
#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
    drop_when_full: bool,
    done: watch::Receiver<bool>,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub async fn send_line(&self, line: String) {
        if self.drop_when_full {
            if self.tx.try_send(line).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.tx.send(line).await.is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Releases this handle and waits up to `grace` for the writer to drain.
    ///
    /// The writer only finishes once every clone of the handle is gone.
    pub async fn shutdown(self, grace: std::time::Duration) -> bool {
        let EventsOutTx { tx, mut done, .. } = self;
        drop(tx);
        let waited = tokio::time::timeout(grace, done.wait_for(|finished| *finished)).await;
        matches!(waited, Ok(Ok(_)))
    }
}

/// Open the configured destination and spawn the writer task.
///
/// Returns `Ok(None)` when events-out is disabled. The destination is opened
/// eagerly so a bad path surfaces before any pipeline work starts.
pub async fn start_events_out(cfg: &EventsOutConfig) -> Result<Option<EventsOutTx>, String> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let path = cfg.path.clone();
    let to_stdout = path == STDOUT_TARGET;
    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if to_stdout {
        Box::new(tokio::io::stdout())
    } else {
        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("events_out dir {}: {e}", parent.display()))?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("events_out open {path}: {e}"))?;
        Box::new(file)
    };

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let (done_tx, done) = watch::channel(false);

    tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if to_stdout {
                tracing::debug!(
                    target: "docflow.stdout_audit",
                    kind = "events_out",
                    bytes = line.len(),
                    preview = %line_preview(line.trim_end())
                );
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::warn!(target: "docflow.events_out", error = %e, "events_out write failed");
                done_tx.send_replace(true);
                return;
            }
            // Flush per line so observers tailing the file see whole records.
            let _ = writer.flush().await;
        }

        let _ = writer.flush().await;
        done_tx.send_replace(true);
    });

    Ok(Some(EventsOutTx {
        tx,
        dropped,
        drop_when_full: cfg.drop_when_full,
        done,
    }))
}
