//! Step records, statuses, and the [`Log`] trait.

/// Sizes of one desired/existing/missing comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaCounts {
    /// Identifiers the step wants present.
    pub desired: usize,
    /// Identifiers the probe found.
    pub present: usize,
    /// Desired identifiers the probe did not find.
    pub missing: usize,
}

impl DeltaCounts {
    /// Desired identifiers that needed no change.
    #[must_use]
    pub const fn already_ok(&self) -> usize {
        self.desired.saturating_sub(self.missing)
    }
}

/// One finished step, as shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Step name.
    pub name: String,
    /// Final status.
    pub status: TaskStatus,
    /// Skip reason, remedy, or error text.
    pub message: Option<String>,
    /// Last delta computed while the step ran, for set-based steps.
    pub delta: Option<DeltaCounts>,
}

/// Status of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Step converged.
    Ok,
    /// Step does not apply to this machine.
    NotApplicable,
    /// Step had nothing to do, e.g. an empty list.
    Skipped,
    /// Step ran in dry-run mode; nothing changed.
    DryRun,
    /// Step finished but left something for the operator, e.g. a checkout
    /// conflict with its remedy.
    NeedsAttention,
    /// Step failed and the run stopped.
    Failed,
}

impl TaskStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 6] = [
        Self::Ok,
        Self::NotApplicable,
        Self::Skipped,
        Self::DryRun,
        Self::NeedsAttention,
        Self::Failed,
    ];

    /// Short lowercase label used in log fields and totals.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotApplicable => "n/a",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::NeedsAttention => "attention",
            Self::Failed => "failed",
        }
    }

    /// Marker shown before the step name in the summary.
    #[must_use]
    pub const fn icon(self) -> char {
        match self {
            Self::Ok => '✓',
            Self::NotApplicable => '·',
            Self::Skipped => '○',
            Self::DryRun => '~',
            Self::NeedsAttention => '!',
            Self::Failed => '✗',
        }
    }
}

/// Logging backend used by tasks.
///
/// Task code logs through this trait so tests can substitute a logger
/// without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (one per step).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (console shows it only with `-v`).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run preview of an action.
    fn dry_run(&self, msg: &str);
    /// Report the delta computed for `category` in the current step.
    fn delta(&self, category: &str, counts: DeltaCounts) {
        self.debug(&format!(
            "{category}: {} desired, {} present, {} missing",
            counts.desired, counts.present, counts.missing
        ));
    }
    /// Record a step result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), TaskStatus::ALL.len());
    }

    #[test]
    fn already_ok_is_desired_minus_missing() {
        let counts = DeltaCounts {
            desired: 5,
            present: 40,
            missing: 2,
        };
        assert_eq!(counts.already_ok(), 3);
    }
}
