pub mod dtf;
pub mod fetch;
pub mod hash;
pub mod run;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, Playbook, Settings};
use crate::error::ConfigError;
use crate::exec::SystemExecutor;
use crate::fetch::SafeFetcher;
use crate::logging::{Log, Logger};
use crate::tasks::{self, Context, Task};

/// Home directory from `--home`, else `$HOME`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHome`] when neither is set.
pub fn resolve_home(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(home) = &global.home {
        return Ok(home.clone());
    }
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::NoHome.into())
}

/// Load the playbook selected by the global options.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing or malformed.
pub fn load_playbook(global: &GlobalOpts, home: &std::path::Path, log: &Logger) -> Result<Playbook> {
    let path = config::playbook_path(global.playbook.as_deref());
    let playbook = Playbook::load(&path, home)?;
    log.info(&format!(
        "loaded {} step(s) from {}",
        playbook.steps.len(),
        path.display()
    ));
    Ok(playbook)
}

/// Apply playbook settings on top of a context's defaults.
#[must_use]
pub fn apply_settings(mut ctx: Context, settings: &Settings) -> Context {
    if let Some(root) = &settings.dotfiles_root {
        ctx = ctx.with_dotfiles_root(root.clone());
    }
    if let Some(privilege) = &settings.privilege {
        ctx = ctx.with_privilege(privilege.as_str());
    }
    if let Some(key) = &settings.ssh_key {
        ctx = ctx.with_ssh_key(key.as_str());
    }
    ctx
}

/// Context that spawns real processes and performs real downloads.
#[must_use]
pub fn system_context(home: PathBuf, log: &Arc<Logger>, settings: &Settings) -> Context {
    let executor = SystemExecutor::new(SystemExecutor::user_search_path(&home));
    let log: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let ctx = Context::new(home, log, Arc::new(executor), Arc::new(SafeFetcher::new()));
    apply_settings(ctx, settings)
}

/// Execute tasks in order, stopping at the first failure, then print the
/// summary and bail if any task failed.
///
/// # Errors
///
/// Returns an error if a task recorded a failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        if !tasks::execute(task, ctx) {
            break;
        }
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
