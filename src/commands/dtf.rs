//! Command: git passthrough for one dotfile module.
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::cli::{DtfOpts, GlobalOpts};
use crate::config::{self, Settings};
use crate::dotfiles::{ModuleState, Synchronizer};
use crate::logging::Logger;
use crate::probe::parse;
use crate::tasks::Context;
use crate::tasks::ssh::AGENT_INFO;

/// Run `git --git-dir=<root>/<module> --work-tree=<home> <args…>`.
///
/// The dotfiles root comes from the playbook's settings when a playbook is
/// found, otherwise the default `~/.dotfiles`.
///
/// # Errors
///
/// Returns an error if the module is not cloned or git exits non-zero.
pub fn run(global: &GlobalOpts, opts: &DtfOpts, log: &Arc<Logger>) -> Result<()> {
    let home = super::resolve_home(global)?;
    let settings = if config::playbook_path(global.playbook.as_deref()).is_file() {
        super::load_playbook(global, &home, log)?.settings
    } else {
        Settings::default()
    };
    let ctx = super::system_context(home, log, &settings);
    passthrough(&ctx, opts)
}

/// Run git for `opts.module` on the caller's terminal.
///
/// # Errors
///
/// Returns an error if the module is absent or git exits non-zero.
pub fn passthrough(ctx: &Context, opts: &DtfOpts) -> Result<()> {
    let sync = Synchronizer::new(ctx);
    if sync.state(&opts.module) == ModuleState::Absent {
        bail!(
            "dotfile module '{}' not found at {}",
            opts.module,
            sync.git_dir(&opts.module).display()
        );
    }

    // Reuse a saved agent so pushes over SSH work from a fresh shell.
    let info = ctx.home_path(AGENT_INFO);
    if let Ok(saved) = std::fs::read_to_string(&info) {
        ctx.set_session_env(parse::ssh_agent_env(&saved));
    }

    let args: Vec<&str> = opts.args.iter().map(String::as_str).collect();
    sync.git_attached(&opts.module, &args)
}
