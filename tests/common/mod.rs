// Shared helpers for integration tests.
//
// Provides a temporary home directory with a playbook fixture, a scripted
// executor that records every command, and an in-memory fetcher, so each
// test can drive whole playbooks without touching the real system.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shaper::config::Playbook;
use shaper::error::EngineError;
use shaper::exec::{ExecResult, Executor};
use shaper::fetch::Fetch;
use shaper::logging::{Log, Logger};
use shaper::tasks::Context;

#[derive(Debug)]
enum Reply {
    Exit { success: bool, stdout: String },
    CreatesDir(PathBuf),
}

/// Executor that replays queued replies and records each call as one
/// space-joined line. An exhausted queue fails every further call.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, stdout: &str) -> Self {
        self.push(Reply::Exit {
            success: true,
            stdout: stdout.to_string(),
        })
    }

    pub fn fail(self) -> Self {
        self.push(Reply::Exit {
            success: false,
            stdout: String::new(),
        })
    }

    /// Succeed and create `dir`, like `git clone --separate-git-dir`.
    pub fn clone_into(self, dir: &Path) -> Self {
        self.push(Reply::CreatesDir(dir.to_path_buf()))
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().expect("replies lock").push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Executor for ScriptedExecutor {
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(String, String)],
    ) -> anyhow::Result<ExecResult> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().expect("calls lock").push(line);

        let reply = self.replies.lock().expect("replies lock").pop_front();
        let (success, stdout) = match reply {
            Some(Reply::Exit { success, stdout }) => (success, stdout),
            Some(Reply::CreatesDir(dir)) => {
                std::fs::create_dir_all(dir)?;
                (true, String::new())
            }
            None => (false, String::new()),
        };
        Ok(ExecResult {
            stdout,
            stderr: if success { String::new() } else { "scripted failure".into() },
            success,
            code: Some(i32::from(!success)),
        })
    }

    fn which(&self, _program: &str) -> bool {
        false
    }
}

/// Fetcher serving fixed bodies.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }
}

impl Fetch for StaticFetcher {
    fn open(&self, url: &str) -> anyhow::Result<Box<dyn Read>> {
        let body = self.bodies.get(url).ok_or_else(|| EngineError::Fetch {
            url: url.to_string(),
            reason: "http status: 404".to_string(),
        })?;
        Ok(Box::new(Cursor::new(body.clone())))
    }
}

/// A throwaway home directory holding list files and a playbook.
pub struct PlaybookFixture {
    pub home: tempfile::TempDir,
    steps: Vec<String>,
}

impl PlaybookFixture {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create temp home"),
            steps: Vec::new(),
        }
    }

    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Write `lines` to `<home>/lists/<name>`.
    pub fn list(self, name: &str, lines: &[&str]) -> Self {
        let dir = self.home.path().join("lists");
        std::fs::create_dir_all(&dir).expect("create lists dir");
        std::fs::write(dir.join(name), lines.join("\n")).expect("write list");
        self
    }

    /// Append a raw `[[step]]` table body.
    pub fn step(mut self, body: &str) -> Self {
        self.steps.push(format!("[[step]]\n{body}\n"));
        self
    }

    pub fn playbook_text(&self) -> String {
        self.steps.join("\n")
    }

    /// Parse the playbook with relative paths anchored at `<home>/lists`.
    pub fn playbook(&self) -> Playbook {
        Playbook::parse(
            &self.playbook_text(),
            &self.home.path().join("lists"),
            self.home.path(),
        )
        .expect("valid playbook")
    }

    /// A fresh run context and its logger.
    pub fn context(&self, executor: &Arc<ScriptedExecutor>, dry_run: bool) -> (Context, Arc<Logger>) {
        let logger = Arc::new(Logger::new("integration"));
        let log: Arc<dyn Log> = Arc::<Logger>::clone(&logger);
        let executor: Arc<dyn Executor> = Arc::<ScriptedExecutor>::clone(executor);
        let ctx = Context::new(
            self.home.path().to_path_buf(),
            log,
            executor,
            Arc::new(StaticFetcher::default()),
        )
        .with_dry_run(dry_run);
        (ctx, logger)
    }
}
