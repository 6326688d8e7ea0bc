//! Bare-repository dotfile modules checked out into the home directory.
//!
//! A module is bootstrapped once:
//!
//! ```text
//! Absent ──clone──▶ Cloning ──checkout ok──▶ CheckedOut
//!                          └─checkout fails─▶ ConflictReported
//! ```
//!
//! Once `<dotfiles_root>/<module>` exists the module counts as synchronized.
//! Nothing is re-cloned or re-checked-out and drift is not detected. A
//! conflicting checkout leaves the bare repository in place; the operator
//! resolves it with `shaper dtf <module> checkout`.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::error::EngineError;
use crate::exec::ExecResult;
use crate::tasks::Context;

/// Observable state of a module on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// No bare repository directory.
    Absent,
    /// The bare repository directory exists.
    Present,
}

/// What [`Synchronizer::sync`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The bare repository already existed; no git command ran.
    AlreadySynchronized,
    /// Cloned and checked out.
    CheckedOut,
    /// Cloned, but the checkout collided with existing files.
    ConflictReported {
        /// Command the operator should run.
        remedy: String,
    },
}

/// The command that finishes a conflicted checkout.
///
/// ```
/// use shaper::dotfiles::remedy;
///
/// assert_eq!(remedy("base"), "shaper dtf base checkout");
/// ```
#[must_use]
pub fn remedy(module: &str) -> String {
    format!("shaper dtf {module} checkout")
}

/// Arguments that point git at a bare repository and a work tree.
#[must_use]
pub fn git_args(git_dir: &Path, work_tree: &Path, args: &[&str]) -> Vec<String> {
    let mut argv = vec![
        format!("--git-dir={}", git_dir.display()),
        format!("--work-tree={}", work_tree.display()),
    ];
    argv.extend(args.iter().map(|a| (*a).to_string()));
    argv
}

/// Drives the module state machine for one run context.
#[derive(Debug)]
pub struct Synchronizer<'a> {
    ctx: &'a Context,
}

impl<'a> Synchronizer<'a> {
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Bare repository directory for `module`.
    #[must_use]
    pub fn git_dir(&self, module: &str) -> PathBuf {
        self.ctx.module_dir(module)
    }

    #[must_use]
    pub fn state(&self, module: &str) -> ModuleState {
        if self.git_dir(module).is_dir() {
            ModuleState::Present
        } else {
            ModuleState::Absent
        }
    }

    /// Bootstrap `module` from `url` if its bare repository does not exist.
    ///
    /// # Errors
    ///
    /// A failed clone propagates. A failed checkout does not; it becomes
    /// [`SyncOutcome::ConflictReported`].
    pub fn sync(&self, module: &str, url: &str) -> Result<SyncOutcome> {
        if self.state(module) == ModuleState::Present {
            self.ctx
                .log
                .debug(&format!("dotfile module {module} already present"));
            return Ok(SyncOutcome::AlreadySynchronized);
        }

        self.clone_bare(module, url)?;

        match self.checkout(module) {
            Ok(()) => Ok(SyncOutcome::CheckedOut),
            Err(err) => match err.downcast_ref::<EngineError>() {
                Some(EngineError::CheckoutConflict { .. }) => {
                    let remedy = remedy(module);
                    self.ctx.log.warn(&format!(
                        "{err:#}; move the conflicting files away and run `{remedy}` (add -f to overwrite them)"
                    ));
                    Ok(SyncOutcome::ConflictReported { remedy })
                }
                _ => Err(err),
            },
        }
    }

    /// Clone `url` as a bare repository at the module directory.
    ///
    /// The clone's work tree goes to a throwaway `dtf-*` directory so no
    /// `.git` ever appears under home.
    fn clone_bare(&self, module: &str, url: &str) -> Result<()> {
        let root = &self.ctx.dotfiles_root;
        std::fs::create_dir_all(root).map_err(|e| EngineError::io(root, e))?;

        let staging = tempfile::Builder::new()
            .prefix("dtf-")
            .tempdir()
            .context("creating clone staging directory")?;
        let git_dir = self.git_dir(module);
        let git_dir_arg = git_dir.to_string_lossy();
        let staging_arg = staging.path().to_string_lossy();

        self.ctx.log.info(&format!("cloning {module} from {url}"));
        self.ctx
            .executor
            .run_with_env(
                "git",
                &[
                    "clone",
                    "-c",
                    "status.showUntrackedFiles=no",
                    "-n",
                    "--separate-git-dir",
                    &git_dir_arg,
                    url,
                    &staging_arg,
                ],
                &self.ctx.session_env(),
            )
            .with_context(|| format!("cloning dotfile module {module}"))?;
        Ok(())
    }

    fn checkout(&self, module: &str) -> Result<()> {
        let result = self.git_unchecked(module, &["checkout"])?;
        if !result.success {
            self.ctx.log.debug(result.stderr.trim());
            return Err(EngineError::CheckoutConflict {
                module: module.to_string(),
            }
            .into());
        }
        self.ctx.log.info(&format!("checked out {module}"));
        Ok(())
    }

    fn git_unchecked(&self, module: &str, args: &[&str]) -> Result<ExecResult> {
        let argv = git_args(&self.git_dir(module), &self.ctx.home, args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.ctx
            .executor
            .run_unchecked_with_env("git", &argv, &self.ctx.session_env())
    }

    /// Run git against `module` with home as the work tree.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` or `CommandFailed`.
    pub fn git(&self, module: &str, args: &[&str]) -> Result<ExecResult> {
        self.git_unchecked(module, args)?.check("git")
    }

    /// Like [`git`](Self::git), with git attached to the terminal.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` or `CommandFailed`.
    pub fn git_attached(&self, module: &str, args: &[&str]) -> Result<()> {
        let argv = git_args(&self.git_dir(module), &self.ctx.home, args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.ctx
            .executor
            .run_attached_with_env("git", &argv, &self.ctx.session_env())?
            .check("git")?;
        Ok(())
    }
}
