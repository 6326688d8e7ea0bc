//! Playbook steps as named, executable tasks.
pub mod context;
pub mod converge;
pub mod dnf;
pub mod dotfiles;
pub mod fonts;
pub mod golang;
pub mod languages;
pub mod release;
pub mod remote_script;
pub mod ssh;

pub use context::Context;
pub use converge::{Converge, converge};

use anyhow::Result;

use crate::config::Step;
use crate::config::step::{DEFAULT_HTTPS_PREFIX, DEFAULT_SSH_PREFIX};
use crate::logging::TaskStatus;

/// Result of a single task execution.
///
/// # Examples
///
/// ```
/// use shaper::tasks::TaskResult;
///
/// let skipped = TaskResult::Skipped("nothing listed".into());
/// assert!(matches!(skipped, TaskResult::Skipped(_)));
/// assert!(matches!(TaskResult::DryRun, TaskResult::DryRun));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task was skipped.
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun,
    /// Task finished but the operator has to act, e.g. a checkout conflict.
    NeedsAttention(String),
}

/// Counters for tasks that process many items.
///
/// # Examples
///
/// ```
/// use shaper::tasks::TaskStats;
///
/// let stats = TaskStats { changed: 3, already_ok: 10, skipped: 0 };
/// assert_eq!(stats.summary(false), "3 changed, 10 already ok");
/// assert_eq!(stats.summary(true), "3 would change, 10 already ok");
///
/// let stats = TaskStats { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of items changed or applied.
    pub changed: usize,
    /// Number of items already in the correct state.
    pub already_ok: usize,
    /// Number of items skipped.
    pub skipped: usize,
}

impl TaskStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }

    /// Log the summary and return the appropriate `TaskResult`.
    #[must_use]
    pub fn finish(self, ctx: &Context) -> TaskResult {
        ctx.log.info(&self.summary(ctx.dry_run));
        if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        }
    }
}

/// A named, executable task.
pub trait Task {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task applies to the current machine.
    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if a probe or install command fails. The run stops
    /// at the first failed task.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Build the task for one playbook step.
#[must_use]
pub fn task_for_step(step: &Step) -> Box<dyn Task> {
    match step {
        Step::RpmKeys { manifest } => Box::new(dnf::RpmKeys::new(manifest.clone())),
        Step::DnfRepos { list } => Box::new(dnf::DnfRepos::new(list.clone())),
        Step::CoprRepos { list } => Box::new(dnf::CoprRepos::new(list.clone())),
        Step::RpmFusion {} => Box::new(dnf::RpmFusion),
        Step::DnfPackages { list } => Box::new(dnf::DnfPackages::new(list.clone())),
        Step::Fonts { list } => Box::new(fonts::InstallFonts::new(list.clone())),
        Step::CargoPackages { list } => Box::new(languages::CargoPackages::new(list.clone())),
        Step::GoPackages { list } => Box::new(golang::GoPackages::new(list.clone())),
        Step::GoToolchain {} => Box::new(golang::GoToolchain),
        Step::NpmPackages { list } => Box::new(languages::NpmPackages::new(list.clone())),
        Step::PipPackages { list } => Box::new(languages::PipPackages::new(list.clone())),
        Step::RemoteScript { command, url, args } => Box::new(remote_script::RemoteScript::new(
            command.clone(),
            url.clone(),
            args.clone(),
        )),
        Step::ReleaseArchive {
            name,
            release,
            archive,
            binary,
            version_args,
        } => Box::new(release::ReleaseArchive::new(
            name,
            release.clone(),
            archive.clone(),
            binary.clone(),
            version_args.clone(),
        )),
        Step::SshAgent {} => Box::new(ssh::SshAgent),
        Step::SshDotfiles {
            repo,
            ssh_prefix,
            https_prefix,
        } => Box::new(ssh::SshDotfiles::new(
            repo.clone(),
            ssh_prefix.as_deref().unwrap_or(DEFAULT_SSH_PREFIX).to_string(),
            https_prefix
                .as_deref()
                .unwrap_or(DEFAULT_HTTPS_PREFIX)
                .to_string(),
        )),
        Step::Dotfiles { module, url } => {
            Box::new(dotfiles::DotfileModule::new(module.clone(), url.clone()))
        }
    }
}

/// Execute a task, recording the result in the logger.
///
/// Returns `false` when the task failed and the run must stop.
pub fn execute(task: &dyn Task, ctx: &Context) -> bool {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return true;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
            true
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
            true
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
            true
        }
        Ok(TaskResult::NeedsAttention(message)) => {
            ctx.log
                .record_task(task.name(), TaskStatus::NeedsAttention, Some(&message));
            true
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            false
        }
    }
}

/// Display name for a list-backed step: `"<label> (<file name>)"`.
pub(crate) fn list_task_name(label: &str, list: &std::path::Path) -> String {
    list.file_name().map_or_else(
        || label.to_string(),
        |name| format!("{label} ({})", name.to_string_lossy()),
    )
}
