use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use anyhow::Result;

use crate::exec::Executor;
use crate::fetch::Fetch;
use crate::logging::Log;
use crate::probe::repos::{RepoCatalog, RepoVars};

/// Default privilege-escalation prefix.
pub const DEFAULT_PRIVILEGE: &str = "sudo";
/// Default SSH private key file name under `~/.ssh`.
pub const DEFAULT_SSH_KEY: &str = "id_ed25519";
/// Directory holding `.repo` definitions.
pub const DEFAULT_REPOS_DIR: &str = "/etc/yum.repos.d";

/// Shared context for one provisioning run.
///
/// Everything a step needs is reachable from here; nothing is read from or
/// written to process-wide state after construction.
pub struct Context {
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// URL opener used for downloads and remote scripts.
    pub fetcher: Arc<dyn Fetch>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// User's home directory path.
    pub home: PathBuf,
    /// Directory holding one bare repository per dotfile module.
    pub dotfiles_root: PathBuf,
    /// Program prepended to commands that need root.
    pub privilege: String,
    /// SSH private key name checked by the SSH bootstrap.
    pub ssh_key: String,
    /// Directory of `.repo` files read by the repository catalog.
    pub repos_dir: PathBuf,
    fedora_version: OnceLock<String>,
    repo_catalog: OnceLock<RepoCatalog>,
    session_env: RwLock<Vec<(String, String)>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("fetcher", &"<dyn Fetch>")
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("dotfiles_root", &self.dotfiles_root)
            .field("privilege", &self.privilege)
            .field("ssh_key", &self.ssh_key)
            .field("repos_dir", &self.repos_dir)
            .field("fedora_version", &self.fedora_version.get())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a context rooted at `home` with default settings.
    #[must_use]
    pub fn new(
        home: PathBuf,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            log,
            executor,
            fetcher,
            dry_run: false,
            dotfiles_root: home.join(".dotfiles"),
            home,
            privilege: DEFAULT_PRIVILEGE.to_string(),
            ssh_key: DEFAULT_SSH_KEY.to_string(),
            repos_dir: PathBuf::from(DEFAULT_REPOS_DIR),
            fedora_version: OnceLock::new(),
            repo_catalog: OnceLock::new(),
            session_env: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_dotfiles_root(mut self, root: PathBuf) -> Self {
        self.dotfiles_root = root;
        self
    }

    #[must_use]
    pub fn with_privilege(mut self, privilege: impl Into<String>) -> Self {
        self.privilege = privilege.into();
        self
    }

    #[must_use]
    pub fn with_ssh_key(mut self, key: impl Into<String>) -> Self {
        self.ssh_key = key.into();
        self
    }

    #[must_use]
    pub fn with_repos_dir(mut self, dir: PathBuf) -> Self {
        self.repos_dir = dir;
        self
    }

    /// Bare repository path for a dotfile module.
    #[must_use]
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.dotfiles_root.join(module)
    }

    /// Path of `relative` under the home directory.
    #[must_use]
    pub fn home_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.home.join(relative)
    }

    /// Run `program` with root privileges, failing on non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns `MissingExecutable` or `CommandFailed`.
    pub fn privileged(&self, program: &str, args: &[&str]) -> Result<crate::exec::ExecResult> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program);
        argv.extend_from_slice(args);
        self.executor.run(&self.privilege, &argv)
    }

    /// Fedora release number from `rpm -E %fedora`, queried once per run.
    ///
    /// # Errors
    ///
    /// Returns an error if `rpm` is missing or fails.
    pub fn fedora_version(&self) -> Result<&str> {
        if let Some(version) = self.fedora_version.get() {
            return Ok(version);
        }
        let output = self.executor.run("rpm", &["-E", "%fedora"])?;
        let version = output.stdout.trim().to_string();
        self.log.debug(&format!("fedora version: {version}"));
        Ok(self.fedora_version.get_or_init(|| version))
    }

    /// Repository catalog, parsed from [`repos_dir`](Self::repos_dir) on
    /// first use and kept for the rest of the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the Fedora version cannot be determined or a repo
    /// file cannot be read.
    pub fn repo_catalog(&self) -> Result<&RepoCatalog> {
        if let Some(catalog) = self.repo_catalog.get() {
            return Ok(catalog);
        }
        let releasever = self.fedora_version()?.to_string();
        let vars = RepoVars {
            releasever: &releasever,
            basearch: std::env::consts::ARCH,
        };
        let catalog = RepoCatalog::load(&self.repos_dir, &vars)?;
        self.log.debug(&format!(
            "loaded {} repositories from {}",
            catalog.entries.len(),
            self.repos_dir.display()
        ));
        Ok(self.repo_catalog.get_or_init(|| catalog))
    }

    /// Environment added to commands that talk to the SSH agent.
    #[must_use]
    pub fn session_env(&self) -> Vec<(String, String)> {
        self.session_env
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the session environment.
    pub fn set_session_env(&self, env: Vec<(String, String)>) {
        *self
            .session_env
            .write()
            .unwrap_or_else(PoisonError::into_inner) = env;
    }
}
