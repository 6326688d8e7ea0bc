//! Tools installed by piping a downloaded script to bash.
use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::fetch;

/// Run an installer script unless `command` already resolves.
#[derive(Debug)]
pub struct RemoteScript {
    name: String,
    command: String,
    url: String,
    args: Vec<String>,
}

impl RemoteScript {
    #[must_use]
    pub fn new(command: String, url: String, args: Vec<String>) -> Self {
        Self {
            name: format!("Install {command}"),
            command,
            url,
            args,
        }
    }
}

impl Task for RemoteScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.executor.which(&self.command) {
            ctx.log.info(&format!("{} already installed", self.command));
            return Ok(TaskResult::Ok);
        }
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would run installer {} for {}", self.url, self.command));
            return Ok(TaskResult::DryRun);
        }
        fetch::run_remote_install_script(
            ctx.executor.as_ref(),
            ctx.fetcher.as_ref(),
            &self.command,
            &self.url,
            &self.args,
        )?;
        ctx.log.info(&format!("installed {}", self.command));
        Ok(TaskResult::Ok)
    }
}
