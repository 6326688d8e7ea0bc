//! SSH key bootstrap and agent setup.
use std::path::Path;

use anyhow::{Result, bail};

use super::{Context, Task, TaskResult};
use crate::dotfiles::{ModuleState, SyncOutcome, Synchronizer};
use crate::error::EngineError;
use crate::probe::{ProbeResult, parse};

/// Dotfile module holding `~/.ssh`.
pub const SSH_MODULE: &str = "ssh";
/// Saved `ssh-agent` output, relative to home.
pub const AGENT_INFO: &str = ".ssh-agent-info";
/// Agent socket, relative to home.
pub const AGENT_SOCKET: &str = ".ssh-agent.sock";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// Restore `~/.ssh` from its dotfile module over HTTPS, then point the
/// module's origin at the SSH remote so later pulls use the restored key.
#[derive(Debug)]
pub struct SshDotfiles {
    repo: String,
    ssh_prefix: String,
    https_prefix: String,
}

impl SshDotfiles {
    #[must_use]
    pub const fn new(repo: String, ssh_prefix: String, https_prefix: String) -> Self {
        Self {
            repo,
            ssh_prefix,
            https_prefix,
        }
    }

    fn https_url(&self) -> String {
        format!("{}{}", self.https_prefix, self.repo)
    }

    fn ssh_url(&self) -> String {
        format!("{}{}", self.ssh_prefix, self.repo)
    }
}

/// `0700` on `path` and every directory below it, `0600` on every file.
/// Symlinks are left alone and never followed.
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::symlink_metadata(path).map_err(|e| EngineError::io(path, e))?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }

    let mode = if meta.is_dir() { DIR_MODE } else { FILE_MODE };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| EngineError::io(path, e))?;

    if meta.is_dir() {
        for entry in std::fs::read_dir(path).map_err(|e| EngineError::io(path, e))? {
            let entry = entry.map_err(|e| EngineError::io(path, e))?;
            restrict_permissions(&entry.path())?;
        }
    }
    Ok(())
}

impl Task for SshDotfiles {
    fn name(&self) -> &str {
        "Restore ssh dotfiles"
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let sync = Synchronizer::new(ctx);
        let ssh_dir = ctx.home_path(".ssh");
        let key = ssh_dir.join(&ctx.ssh_key);
        let mut result = TaskResult::Ok;

        if key.is_file() {
            ctx.log.debug(&format!("{} present", key.display()));
        } else {
            if ctx.dry_run {
                ctx.log
                    .dry_run(&format!("would restore {} from {}", ssh_dir.display(), self.https_url()));
                return Ok(TaskResult::DryRun);
            }
            if let SyncOutcome::ConflictReported { remedy } =
                sync.sync(SSH_MODULE, &self.https_url())?
            {
                result = TaskResult::NeedsAttention(format!("run `{remedy}`"));
            }
            if ssh_dir.is_dir() {
                restrict_permissions(&ssh_dir)?;
                ctx.log.info(&format!("restricted permissions on {}", ssh_dir.display()));
            }
        }

        if sync.state(SSH_MODULE) == ModuleState::Absent {
            ctx.log.debug("ssh module not cloned, leaving remote unchanged");
            return Ok(result);
        }
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would set ssh origin to {}", self.ssh_url()));
            return Ok(TaskResult::DryRun);
        }
        sync.git(
            SSH_MODULE,
            &["remote", "set-url", "origin", &self.ssh_url()],
        )?;
        Ok(result)
    }
}

/// Make sure an agent is running with keys loaded and expose its
/// environment to later git calls.
#[derive(Debug)]
pub struct SshAgent;

impl SshAgent {
    /// Output of a running agent, or of a freshly started one.
    fn agent_output(ctx: &Context) -> Result<String> {
        let info = ctx.home_path(AGENT_INFO);
        let running =
            ProbeResult::from_result(ctx.executor.run("pidof", &["-s", "ssh-agent"])).is_present();
        if running && info.is_file() {
            ctx.log.debug("reusing running ssh-agent");
            return std::fs::read_to_string(&info).map_err(|e| EngineError::io(&info, e).into());
        }

        let socket = ctx.home_path(AGENT_SOCKET);
        if socket.exists() {
            std::fs::remove_file(&socket).map_err(|e| EngineError::io(&socket, e))?;
        }
        let output = ctx
            .executor
            .run("ssh-agent", &["-t", "3d", "-a", &socket.to_string_lossy()])?
            .stdout;
        std::fs::write(&info, &output).map_err(|e| EngineError::io(&info, e))?;
        ctx.log.info("started ssh-agent");
        Ok(output)
    }
}

impl Task for SshAgent {
    fn name(&self) -> &str {
        "Start ssh agent"
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let loaded = ctx
            .executor
            .run_unchecked_with_env("ssh-add", &["-l"], &ctx.session_env())?;
        if loaded.success {
            ctx.log.info("ssh agent already holds keys");
            return Ok(TaskResult::Ok);
        }
        if ctx.dry_run {
            ctx.log.dry_run("would start ssh-agent and add keys");
            return Ok(TaskResult::DryRun);
        }

        let env = parse::ssh_agent_env(&Self::agent_output(ctx)?);
        if env.is_empty() {
            bail!("ssh-agent output has no SSH_* variables");
        }
        ctx.executor.run_with_env("ssh-add", &[], &env)?;
        ctx.set_session_env(env);
        Ok(TaskResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::test_support::{MockExecutor, MockFetcher, context};
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    const AGENT_OUT: &str = "SSH_AUTH_SOCK=/home/u/.ssh-agent.sock; export SSH_AUTH_SOCK;\nSSH_AGENT_PID=4242; export SSH_AGENT_PID;\necho Agent pid 4242;\n";

    fn task() -> SshDotfiles {
        SshDotfiles::new(
            "me/ssh.git".into(),
            "git@github.com:".into(),
            "https://github.com/".into(),
        )
    }

    fn mode(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn restrict_permissions_does_not_follow_symlinks() {
        let home = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        let outside = home.path().join("outside");
        std::fs::create_dir_all(&ssh).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(ssh.join("id_ed25519"), "key").unwrap();
        std::fs::write(outside.join("shared"), "x").unwrap();
        std::fs::set_permissions(&outside, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::set_permissions(outside.join("shared"), std::fs::Permissions::from_mode(0o644))
            .unwrap();
        std::os::unix::fs::symlink(&outside, ssh.join("sockets")).unwrap();
        std::os::unix::fs::symlink(".", ssh.join("loop")).unwrap();

        restrict_permissions(&ssh).unwrap();

        assert_eq!(mode(&ssh), 0o700);
        assert_eq!(mode(&ssh.join("id_ed25519")), 0o600);
        assert_eq!(mode(&outside), 0o755);
        assert_eq!(mode(&outside.join("shared")), 0o644);
    }

    #[test]
    fn missing_key_restores_over_https_and_switches_to_ssh() {
        let home = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        std::fs::create_dir_all(ssh.join("keys")).unwrap();
        std::fs::write(ssh.join("config"), "Host *\n").unwrap();
        std::fs::set_permissions(ssh.join("config"), std::fs::Permissions::from_mode(0o644)).unwrap();
        let git_dir = home.path().join(".dotfiles/ssh");
        let exec = Arc::new(MockExecutor::new().ok_creating(&git_dir).ok("").ok(""));
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        assert_eq!(task().run(&ctx).unwrap(), TaskResult::Ok);

        let calls = exec.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains(" https://github.com/me/ssh.git "));
        assert!(calls[2].ends_with("remote set-url origin git@github.com:me/ssh.git"));
        assert_eq!(mode(&ssh), 0o700);
        assert_eq!(mode(&ssh.join("keys")), 0o700);
        assert_eq!(mode(&ssh.join("config")), 0o600);
    }

    #[test]
    fn present_key_only_sets_remote() {
        let home = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        std::fs::create_dir_all(&ssh).unwrap();
        std::fs::write(ssh.join("id_ed25519"), "key").unwrap();
        std::fs::create_dir_all(home.path().join(".dotfiles/ssh")).unwrap();
        let exec = Arc::new(MockExecutor::new().ok(""));
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        task().run(&ctx).unwrap();
        assert_eq!(exec.call_count(), 1);
        assert!(exec.calls()[0].contains("remote set-url origin"));
    }

    #[test]
    fn present_key_without_module_runs_nothing() {
        let home = tempfile::tempdir().unwrap();
        let ssh = home.path().join(".ssh");
        std::fs::create_dir_all(&ssh).unwrap();
        std::fs::write(ssh.join("id_ed25519"), "key").unwrap();
        let exec = Arc::new(MockExecutor::new());
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        assert_eq!(task().run(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn dry_run_restores_nothing() {
        let home = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new());
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()))
            .with_dry_run(true);

        assert_eq!(task().run(&ctx).unwrap(), TaskResult::DryRun);
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn loaded_agent_is_left_alone() {
        let home = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new().ok("256 SHA256:abc me (ED25519)\n"));
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        assert_eq!(SshAgent.run(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(exec.calls(), ["ssh-add -l"]);
        assert!(ctx.session_env().is_empty());
    }

    #[test]
    fn starts_agent_and_exports_session_env() {
        let home = tempfile::tempdir().unwrap();
        let exec = Arc::new(
            MockExecutor::new()
                .fail("Could not open a connection to your authentication agent.")
                .fail("") // pidof: none running
                .ok(AGENT_OUT)
                .ok(""),
        );
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        assert_eq!(SshAgent.run(&ctx).unwrap(), TaskResult::Ok);

        let calls = exec.calls();
        assert_eq!(calls[1], "pidof -s ssh-agent");
        assert_eq!(
            calls[2],
            format!("ssh-agent -t 3d -a {}", home.path().join(AGENT_SOCKET).display())
        );
        assert_eq!(calls[3], "ssh-add");
        let env = ctx.session_env();
        assert_eq!(env[0], ("SSH_AUTH_SOCK".to_string(), "/home/u/.ssh-agent.sock".to_string()));
        assert_eq!(env[1], ("SSH_AGENT_PID".to_string(), "4242".to_string()));
        assert_eq!(exec.envs()[3], env);
        assert_eq!(
            std::fs::read_to_string(home.path().join(AGENT_INFO)).unwrap(),
            AGENT_OUT
        );
    }

    #[test]
    fn reuses_running_agent_info() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join(AGENT_INFO), AGENT_OUT).unwrap();
        let exec = Arc::new(MockExecutor::new().fail("").ok("4242\n").ok(""));
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        SshAgent.run(&ctx).unwrap();
        assert_eq!(exec.calls(), ["ssh-add -l", "pidof -s ssh-agent", "ssh-add"]);
        assert_eq!(ctx.session_env().len(), 2);
    }
}
