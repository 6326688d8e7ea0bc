//! Shared mocks for unit tests.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::error::EngineError;
use crate::exec::{ExecResult, Executor};
use crate::fetch::Fetch;
use crate::logging::{Log, Logger};
use crate::tasks::Context;

#[derive(Debug)]
enum Reply {
    Exit {
        success: bool,
        stdout: String,
        stderr: String,
        creates: Option<PathBuf>,
    },
    NotFound,
}

/// Scripted executor.
///
/// Replies are consumed in FIFO order. Once the queue is empty every call
/// fails with stderr `"unexpected call"`. Each call is recorded as a single
/// space-joined string.
#[derive(Debug, Default)]
pub struct MockExecutor {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
    envs: Mutex<Vec<Vec<(String, String)>>>,
    attached: Mutex<Vec<String>>,
    available: Vec<String>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful exit with `stdout`.
    pub fn ok(self, stdout: &str) -> Self {
        self.push(Reply::Exit {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
            creates: None,
        })
    }

    /// Queue a successful exit that also creates `dir`, the way
    /// `git clone --separate-git-dir` does.
    pub fn ok_creating(self, dir: &Path) -> Self {
        self.push(Reply::Exit {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            creates: Some(dir.to_path_buf()),
        })
    }

    /// Queue a non-zero exit with `stderr`.
    pub fn fail(self, stderr: &str) -> Self {
        self.push(Reply::Exit {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
            creates: None,
        })
    }

    /// Queue a missing-executable error.
    pub fn missing(self) -> Self {
        self.push(Reply::NotFound)
    }

    /// Programs that [`Executor::which`] reports as present.
    pub fn with_which(mut self, programs: &[&str]) -> Self {
        self.available = programs.iter().map(|p| (*p).to_string()).collect();
        self
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Environment passed to each call, in call order.
    pub fn envs(&self) -> Vec<Vec<(String, String)>> {
        self.envs.lock().unwrap().clone()
    }

    /// Calls made through [`Executor::run_attached_with_env`].
    pub fn attached_calls(&self) -> Vec<String> {
        self.attached.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Executor for MockExecutor {
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line);
        self.envs.lock().unwrap().push(env.to_vec());

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::NotFound) => Err(EngineError::MissingExecutable {
                program: program.to_string(),
            }
            .into()),
            Some(Reply::Exit {
                success,
                stdout,
                stderr,
                creates,
            }) => {
                if let Some(dir) = creates {
                    std::fs::create_dir_all(dir)?;
                }
                Ok(ExecResult {
                    stdout,
                    stderr,
                    success,
                    code: Some(i32::from(!success)),
                })
            }
            None => Ok(ExecResult {
                stdout: String::new(),
                stderr: "unexpected call".to_string(),
                success: false,
                code: Some(1),
            }),
        }
    }

    fn run_attached_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<ExecResult> {
        let result = self.run_unchecked_with_env(program, args, env)?;
        let line = self.calls.lock().unwrap().last().cloned().unwrap_or_default();
        self.attached.lock().unwrap().push(line);
        Ok(result)
    }

    fn which(&self, program: &str) -> bool {
        self.available.iter().any(|p| p == program)
    }
}

/// In-memory fetcher keyed by URL.
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    opened: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Fetch for MockFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        self.opened.lock().unwrap().push(url.to_string());
        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| EngineError::Fetch {
                url: url.to_string(),
                reason: "http status: 404".to_string(),
            })?
            .clone();
        Ok(Box::new(Cursor::new(body)))
    }
}

/// Context rooted at `home` with the given mocks.
pub fn context(home: &Path, executor: Arc<MockExecutor>, fetcher: Arc<MockFetcher>) -> Context {
    let log: Arc<dyn Log> = Arc::new(Logger::with_log_file(None));
    Context::new(home.to_path_buf(), log, executor, fetcher)
}
