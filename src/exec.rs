//! External command execution.
//!
//! Every tool invocation goes through the [`Executor`] trait so tasks can be
//! exercised in tests without spawning processes. [`SystemExecutor`] resolves
//! programs against an explicit search path instead of mutating `PATH`.
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context as _, Result};

use crate::error::EngineError;

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl ExecResult {
    /// Convert a non-zero exit into [`EngineError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns `CommandFailed` carrying the exit code and trimmed stderr.
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        Err(EngineError::CommandFailed {
            program: program.to_string(),
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
        .into())
    }
}

/// Abstraction over process spawning.
///
/// Implementors provide [`run_unchecked_with_env`](Self::run_unchecked_with_env)
/// and [`which`](Self::which); the checked variants are derived from them.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Spawn `program` with `args` plus extra environment variables and wait
    /// for it, returning the result regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingExecutable`] if the program cannot be
    /// resolved, or an I/O error if spawning fails.
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult>;

    /// Whether `program` resolves on the search path.
    fn which(&self, program: &str) -> bool;

    /// Run a command, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` or `CommandFailed`.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run_with_env(program, args, &[])
    }

    /// Run a command with extra environment variables, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` or `CommandFailed`.
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        self.run_unchecked_with_env(program, args, env)?
            .check(program)
    }

    /// Run a command attached to the caller's terminal, allowing failure.
    ///
    /// stdin, stdout and stderr are inherited so editors, pagers and
    /// credential prompts work; the returned result carries no output.
    /// The default implementation captures like
    /// [`run_unchecked_with_env`](Self::run_unchecked_with_env).
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` if the program cannot be resolved.
    fn run_attached_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        self.run_unchecked_with_env(program, args, env)
    }

    /// Run a command, allowing failure.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` if the program cannot be resolved.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run_unchecked_with_env(program, args, &[])
    }
}

/// Executor that spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    search_path: Option<OsString>,
}

impl SystemExecutor {
    /// Create an executor that resolves programs against `search_path`
    /// (a `PATH`-style list). `None` uses the inherited `PATH`.
    #[must_use]
    pub const fn new(search_path: Option<OsString>) -> Self {
        Self { search_path }
    }

    /// Build the search path used for a run: tool directories under `home`
    /// followed by the inherited `PATH`.
    #[must_use]
    pub fn user_search_path(home: &Path) -> Option<OsString> {
        let mut dirs: Vec<PathBuf> = vec![
            home.join(".cargo/bin"),
            home.join(".volta/bin"),
            home.join("go/bin"),
            PathBuf::from("/usr/local/go/bin"),
        ];
        if let Some(inherited) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&inherited));
        }
        std::env::join_paths(dirs).ok()
    }

    fn command(&self, program: &str, args: &[&str], env: &[(String, String)]) -> Result<Command> {
        let resolved = self
            .resolve(program)
            .ok_or_else(|| EngineError::MissingExecutable {
                program: program.to_string(),
            })?;
        tracing::debug!("exec: {program} {}", args.join(" "));
        let mut cmd = Command::new(&resolved);
        cmd.args(args);
        if let Some(paths) = &self.search_path {
            cmd.env("PATH", paths);
        }
        cmd.envs(env.iter().map(|(k, v)| (OsStr::new(k), OsStr::new(v))));
        Ok(cmd)
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        match &self.search_path {
            Some(paths) => which::which_in(program, Some(paths), cwd).ok(),
            None => which::which(program).ok(),
        }
    }
}

impl Executor for SystemExecutor {
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        let output = self
            .command(program, args, env)?
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_attached_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        let status = self
            .command(program, args, env)?
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult {
            success: status.success(),
            code: status.code(),
            ..ExecResult::default()
        })
    }

    fn which(&self, program: &str) -> bool {
        self.resolve(program).is_some()
    }
}
