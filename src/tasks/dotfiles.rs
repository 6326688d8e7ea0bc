//! Playbook step for one dotfile module.
use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::dotfiles::{ModuleState, SyncOutcome, Synchronizer};

/// Clone and check out a dotfile module unless its bare repository exists.
#[derive(Debug)]
pub struct DotfileModule {
    name: String,
    module: String,
    url: String,
}

impl DotfileModule {
    #[must_use]
    pub fn new(module: String, url: String) -> Self {
        Self {
            name: format!("Restore dotfiles ({module})"),
            module,
            url,
        }
    }
}

impl Task for DotfileModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let sync = Synchronizer::new(ctx);
        if ctx.dry_run && sync.state(&self.module) == ModuleState::Absent {
            ctx.log.dry_run(&format!(
                "would clone {} into {}",
                self.url,
                sync.git_dir(&self.module).display()
            ));
            return Ok(TaskResult::DryRun);
        }

        match sync.sync(&self.module, &self.url)? {
            SyncOutcome::AlreadySynchronized => {
                ctx.log.info(&format!("{} already synchronized", self.module));
                Ok(TaskResult::Ok)
            }
            SyncOutcome::CheckedOut => Ok(TaskResult::Ok),
            SyncOutcome::ConflictReported { remedy } => {
                Ok(TaskResult::NeedsAttention(format!("run `{remedy}`")))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::test_support::{MockExecutor, MockFetcher, context};
    use std::sync::Arc;

    const URL: &str = "https://github.com/me/dotfiles-vim.git";

    #[test]
    fn dry_run_clones_nothing() {
        let home = tempfile::tempdir().unwrap();
        let exec = Arc::new(MockExecutor::new());
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()))
            .with_dry_run(true);

        let task = DotfileModule::new("vim".into(), URL.into());
        assert_eq!(task.run(&ctx).unwrap(), TaskResult::DryRun);
        assert_eq!(exec.call_count(), 0);
        assert!(!home.path().join(".dotfiles").exists());
    }

    #[test]
    fn conflict_needs_attention() {
        let home = tempfile::tempdir().unwrap();
        let git_dir = home.path().join(".dotfiles/vim");
        let exec = Arc::new(MockExecutor::new().ok_creating(&git_dir).fail("would be overwritten"));
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()));

        let result = DotfileModule::new("vim".into(), URL.into()).run(&ctx).unwrap();
        assert_eq!(
            result,
            TaskResult::NeedsAttention("run `shaper dtf vim checkout`".into())
        );
    }

    #[test]
    fn present_module_is_ok_even_in_dry_run() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".dotfiles/vim")).unwrap();
        let exec = Arc::new(MockExecutor::new());
        let ctx = context(home.path(), Arc::clone(&exec), Arc::new(MockFetcher::new()))
            .with_dry_run(true);

        let result = DotfileModule::new("vim".into(), URL.into()).run(&ctx).unwrap();
        assert_eq!(result, TaskResult::Ok);
        assert_eq!(exec.call_count(), 0);
    }
}
