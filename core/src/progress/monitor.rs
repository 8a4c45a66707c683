use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::message::{Phase, ProgressMessage};
use crate::notify::NotificationSink;

#[derive(Default)]
struct MonitorState {
    /// Overall bar for the phase currently running
    overall: Option<(Phase, ProgressBar)>,
    /// Per-envelope bars keyed by envelope id
    envelope_bars: HashMap<String, ProgressBar>,
}

/// Terminal progress monitor driven by the pipeline's message stream
///
/// Renders one overall bar per phase plus one bar per in-flight envelope
pub struct ProgressMonitor {
    /// Multi-progress container
    multi: MultiProgress,
    state: Mutex<MonitorState>,
    /// Whether monitoring is enabled
    enabled: bool,
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} documents ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

fn envelope_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {spinner:.green} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to draw anything (disabled when stderr is not a terminal)
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(MonitorState::default()),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn guard(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply one message to the bars
    pub fn observe(&self, message: &ProgressMessage) {
        if !self.enabled {
            return;
        }
        let mut state = self.guard();

        match message {
            ProgressMessage::Started {
                envelope_id,
                total_items,
                phase,
            } => {
                let bar = self.multi.add(ProgressBar::new(*total_items as u64));
                bar.set_style(envelope_style());
                bar.set_message(format!("⏳ [{phase}] {envelope_id}"));
                bar.enable_steady_tick(Duration::from_millis(100));
                if let Some(old) = state.envelope_bars.insert(envelope_id.clone(), bar) {
                    old.finish_and_clear();
                }
            }
            ProgressMessage::Progress {
                envelope_id,
                progress,
                phase,
            } => {
                if let Some(bar) = state.envelope_bars.get(envelope_id) {
                    bar.set_position(progress.completed as u64);
                    bar.set_message(format!(
                        "⏳ [{phase}] {envelope_id} {}",
                        progress.current_item
                    ));
                }
            }
            ProgressMessage::Completed {
                envelope_id,
                files,
                phase,
            } => {
                if let Some(bar) = state.envelope_bars.remove(envelope_id) {
                    bar.finish_with_message(format!(
                        "✅ [{phase}] {envelope_id} ({} files)",
                        files.len()
                    ));
                }
            }
            ProgressMessage::Error {
                envelope_id,
                error,
                phase,
            } => {
                let bar = state
                    .envelope_bars
                    .remove(envelope_id)
                    .unwrap_or_else(|| self.multi.add(ProgressBar::new(0)));
                bar.set_style(envelope_style());
                bar.finish_with_message(format!("❌ [{phase}] {envelope_id}: {error}"));
            }
            ProgressMessage::BatchProgress { overall, phase, .. } => {
                let bar = self.overall_for(&mut state, *phase);
                bar.set_length(overall.total_items as u64);
                bar.set_position(overall.completed_items as u64);
                bar.set_message(format!(
                    "{phase}: {}/{} envelopes",
                    overall.completed_envelopes, overall.total_envelopes
                ));
            }
            ProgressMessage::BatchCompleted { overall, phase, .. } => {
                let bar = self.overall_for(&mut state, *phase);
                bar.set_length(overall.total_items as u64);
                bar.set_position(overall.completed_items as u64);
                bar.finish_with_message(format!(
                    "✅ {phase}: {}/{} envelopes",
                    overall.completed_envelopes, overall.total_envelopes
                ));
            }
            ProgressMessage::Terminate => {
                if let Some((_, bar)) = state.overall.take() {
                    if !bar.is_finished() {
                        bar.finish();
                    }
                }
                for (_, bar) in state.envelope_bars.drain() {
                    bar.finish_and_clear();
                }
            }
        }
    }

    fn overall_for(&self, state: &mut MonitorState, phase: Phase) -> ProgressBar {
        if let Some((current, bar)) = &state.overall {
            if *current == phase {
                return bar.clone();
            }
            if !bar.is_finished() {
                bar.finish();
            }
        }
        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(overall_style());
        state.overall = Some((phase, bar.clone()));
        bar
    }

    /// Clear all progress indicators (cleanup)
    pub fn clear(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.guard();
        if let Some((_, bar)) = state.overall.take() {
            bar.finish_and_clear();
        }
        for (_, bar) in state.envelope_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[async_trait]
impl NotificationSink for ProgressMonitor {
    fn name(&self) -> &str {
        "progress"
    }

    async fn send(&self, message: &ProgressMessage) -> bool {
        self.observe(message);
        true
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        // Ensure all spinners are cleaned up
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, bar) in state.envelope_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
