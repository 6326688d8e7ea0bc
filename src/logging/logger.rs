//! The run's logger: tracing events plus the step summary.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DELTA, DRY_RUN, STAGE, STEP, SUMMARY};
use super::types::{DeltaCounts, Log, TaskEntry, TaskStatus};

#[derive(Debug, Default)]
struct State {
    entries: Vec<TaskEntry>,
    /// Delta reported by the running step, attached when it is recorded.
    pending: Option<DeltaCounts>,
}

/// Emits every [`Log`] call as a `tracing` event and keeps one
/// [`TaskEntry`] per finished step.
///
/// Step results are also written to the log file as `shaper::step` events
/// carrying `status` and `detail` fields, so remedies for steps that need
/// attention survive after the console scrolls away.
#[derive(Debug)]
pub struct Logger {
    state: Mutex<State>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`; the summary points at its log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(super::log_file_path(command))
    }

    /// Logger whose summary points at `log_file`.
    #[must_use]
    pub fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            log_file,
        }
    }

    /// Entries recorded so far, in run order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.state
            .lock()
            .map_or_else(|_| vec![], |s| s.entries.clone())
    }

    /// Count the number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    /// Count steps recorded with `status`.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> usize {
        self.state.lock().map_or(0, |s| {
            s.entries.iter().filter(|t| t.status == status).count()
        })
    }

    /// Log an error.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a step header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console shows it only with `-v`).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run preview.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN, "{msg}");
    }

    /// Log `counts` and remember them for the step being run.
    pub fn delta(&self, category: &str, counts: DeltaCounts) {
        tracing::debug!(
            target: DELTA,
            desired = counts.desired,
            present = counts.present,
            missing = counts.missing,
            "{category}"
        );
        if let Ok(mut state) = self.state.lock() {
            state.pending = Some(counts);
        }
    }

    /// Record a finished step.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        tracing::info!(
            target: STEP,
            step = name,
            status = status.label(),
            detail = message.unwrap_or(""),
            "step finished"
        );
        if let Ok(mut state) = self.state.lock() {
            let delta = state.pending.take();
            state.entries.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
                delta,
            });
        }
    }

    /// Print one line per step and the totals.
    pub fn print_summary(&self) {
        let entries = self.task_entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");
        for entry in &entries {
            tracing::info!(
                target: SUMMARY,
                status = entry.status.label(),
                "{}",
                summary_line(entry)
            );
        }
        tracing::info!(target: SUMMARY, "{}", totals(&entries));

        if let Some(path) = &self.log_file {
            self.debug(&format!("log: {}", path.display()));
        }
    }
}

/// `"<icon> <name>"` plus installed/already-ok counts and the message.
fn summary_line(entry: &TaskEntry) -> String {
    let mut line = format!("{} {}", entry.status.icon(), entry.name);
    let counts = entry
        .delta
        .filter(|d| matches!(entry.status, TaskStatus::Ok | TaskStatus::DryRun) && d.desired > 0);
    if let Some(delta) = counts {
        let verb = if entry.status == TaskStatus::DryRun {
            "missing"
        } else {
            "installed"
        };
        line.push_str(&format!(
            " [{} {verb}, {} already ok]",
            delta.missing,
            delta.already_ok()
        ));
    }
    if let Some(message) = &entry.message {
        line.push_str(&format!(" ({message})"));
    }
    line
}

/// `"<n> steps: 3 ok, 1 attention"`, listing only statuses that occurred.
fn totals(entries: &[TaskEntry]) -> String {
    let parts: Vec<String> = TaskStatus::ALL
        .iter()
        .filter_map(|&status| {
            let n = entries.iter().filter(|e| e.status == status).count();
            (n > 0).then(|| format!("{n} {}", status.label()))
        })
        .collect();
    format!("{} steps: {}", entries.len(), parts.join(", "))
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        self.stage(msg);
    }

    fn info(&self, msg: &str) {
        self.info(msg);
    }

    fn debug(&self, msg: &str) {
        self.debug(msg);
    }

    fn warn(&self, msg: &str) {
        self.warn(msg);
    }

    fn error(&self, msg: &str) {
        self.error(msg);
    }

    fn dry_run(&self, msg: &str) {
        self.dry_run(msg);
    }

    fn delta(&self, category: &str, counts: DeltaCounts) {
        self.delta(category, counts);
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.record_task(name, status, message);
    }
}
