//! Command: run playbook steps in order.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, RunOpts};
use crate::config::Playbook;
use crate::config::validation;
use crate::logging::Logger;
use crate::tasks::{self, Context, Task};

/// Run the `run` command against the real system.
///
/// # Errors
///
/// Returns an error if the playbook cannot be loaded or validated, or if
/// a step fails.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("shaper {}", super::version::version()));

    let home = super::resolve_home(global)?;
    log.stage("Loading playbook");
    let playbook = super::load_playbook(global, &home, log)?;

    let ctx = super::system_context(home, log, &playbook.settings).with_dry_run(opts.dry_run);
    run_playbook(&playbook, &ctx, log, opts)
}

/// Validate `playbook`, then execute the steps selected by `opts` with `ctx`.
///
/// # Errors
///
/// Returns the first validation error, or an error if a step fails.
pub fn run_playbook(playbook: &Playbook, ctx: &Context, log: &Logger, opts: &RunOpts) -> Result<()> {
    let warnings = validation::validate(playbook)?;
    if !warnings.is_empty() {
        log.warn(&format!("found {} playbook warning(s):", warnings.len()));
        for warning in &warnings {
            log.warn(&format!(
                "  step {} ({}): {}",
                warning.index, warning.kind, warning.message
            ));
        }
    }

    let selected = playbook.selected_steps(&opts.only, &opts.skip);
    log.debug(&format!(
        "{} of {} step(s) selected",
        selected.len(),
        playbook.steps.len()
    ));
    let all_tasks: Vec<Box<dyn Task>> = selected.into_iter().map(tasks::task_for_step).collect();

    super::run_tasks_to_completion(all_tasks.iter().map(AsRef::as_ref), ctx, log)
}
