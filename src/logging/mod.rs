//! Console and file logging, and the per-run step summary.
//!
//! Tasks log through [`Log`]. [`Logger`] turns each call into a `tracing`
//! event and keeps one [`TaskEntry`] per step for the summary. Each command
//! truncates its own log file, so the file always holds the latest run.
use std::path::PathBuf;

mod logger;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{DeltaCounts, Log, TaskEntry, TaskStatus};

/// `$XDG_CACHE_HOME/shaper/<command>.log`, falling back to
/// `~/.cache/shaper/<command>.log`. `None` when neither variable is set.
#[must_use]
pub fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    Some(cache.join("shaper").join(format!("{command}.log")))
}

/// A logger whose events go to a file layer in a temp dir, installed as the
/// thread's default subscriber until the guard drops.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("test.log");
    let file_layer = subscriber::FileLayer::create(&path).expect("file layer");
    let log = Logger::with_log_file(Some(path));
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
