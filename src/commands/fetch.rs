//! Command: download a file through the restricted fetcher.
use anyhow::Result;

use crate::cli::FetchOpts;
use crate::fetch::{self, SafeFetcher};
use crate::logging::Logger;

/// Download `opts.url` to `opts.destination`.
///
/// # Errors
///
/// Returns `UnsupportedUrl` for non-HTTPS URLs, or a fetch or I/O error.
pub fn run(opts: &FetchOpts, log: &Logger) -> Result<()> {
    let stored = fetch::fetch_and_store(&SafeFetcher::new(), &opts.url, &opts.destination)?;
    log.info(&format!("saved {}", stored.display()));
    Ok(())
}
