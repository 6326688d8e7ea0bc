//! Restricted HTTPS fetching.
//!
//! [`SafeFetcher`] only speaks `https`, ignores proxy environment variables,
//! follows a bounded number of redirects (never downgrading to plain HTTP)
//! and turns every non-2xx status into an error. Everything downloaded by
//! the engine goes through the [`Fetch`] trait so it can be replaced in
//! tests.
use std::fs::File;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::error::EngineError;
use crate::exec::Executor;

/// Bytes copied per iteration when storing a download.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Redirects followed before giving up.
const MAX_REDIRECTS: u32 = 10;

/// An opener for remote resources.
pub trait Fetch: Send + Sync + std::fmt::Debug {
    /// Open `url` and return a reader over the response body.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Fetch`] on transport failure or error status.
    fn open(&self, url: &str) -> Result<Box<dyn Read>>;
}

/// The production opener, backed by a locked-down [`ureq::Agent`].
#[derive(Debug, Clone)]
pub struct SafeFetcher {
    agent: ureq::Agent,
}

impl SafeFetcher {
    /// Build the restricted agent.
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .https_only(true)
            .proxy(None)
            .max_redirects(MAX_REDIRECTS)
            .http_status_as_error(true)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for SafeFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for SafeFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        validate_url(url)?;
        tracing::debug!("fetch: {url}");
        let response = self.agent.get(url).call().map_err(|e| EngineError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(response.into_body().into_reader()))
    }
}

/// Reject any URL that is not `https://`.
///
/// # Errors
///
/// Returns [`EngineError::UnsupportedUrl`].
pub fn validate_url(url: &str) -> Result<()> {
    let is_https = url
        .get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"));
    if is_https && url.len() > 8 {
        Ok(())
    } else {
        Err(EngineError::UnsupportedUrl {
            url: url.to_string(),
        }
        .into())
    }
}

/// Fetch `url` and parse the body as JSON.
///
/// # Errors
///
/// Returns a fetch error or a JSON parse error.
pub fn fetch_json(fetcher: &dyn Fetch, url: &str) -> Result<serde_json::Value> {
    validate_url(url)?;
    let reader = fetcher.open(url)?;
    serde_json::from_reader(reader).with_context(|| format!("invalid JSON from {url}"))
}

/// Fetch `url` and return the body as text.
///
/// # Errors
///
/// Returns a fetch error or an I/O error while reading the body.
pub fn fetch_text(fetcher: &dyn Fetch, url: &str) -> Result<String> {
    validate_url(url)?;
    let mut reader = fetcher.open(url)?;
    let mut body = String::new();
    reader
        .read_to_string(&mut body)
        .with_context(|| format!("reading response body from {url}"))?;
    Ok(body)
}

/// Decode `%XX` escapes. Invalid escapes are kept literally; the decoded
/// bytes are interpreted as UTF-8 (lossy).
#[must_use]
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        if b == b'%'
            && let Some(hex) = s.get(i + 1..i + 3)
            && hex.bytes().all(|c| c.is_ascii_hexdigit())
            && let Ok(decoded) = u8::from_str_radix(hex, 16)
        {
            out.push(decoded);
            i += 3;
            continue;
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// The percent-decoded last path segment of `url`, without query or fragment.
///
/// ```
/// use shaper::fetch::url_file_name;
///
/// assert_eq!(
///     url_file_name("https://example.com/fonts/Fira%20Code.ttf?raw=true"),
///     "Fira Code.ttf"
/// );
/// ```
#[must_use]
pub fn url_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let segment = after_scheme
        .split_once('/')
        .map_or("", |(_, p)| p)
        .rsplit('/')
        .next()
        .unwrap_or("");
    percent_decode(segment)
}

/// Where a download of `url` to `destination` ends up.
///
/// If `destination` is an existing directory or has no extension, the URL's
/// file name is appended.
#[must_use]
pub fn resolve_destination(url: &str, destination: &Path) -> PathBuf {
    if destination.is_dir() || destination.extension().is_none() {
        destination.join(url_file_name(url))
    } else {
        destination.to_path_buf()
    }
}

/// Stream `url` to disk and return the path written.
///
/// # Errors
///
/// Returns a fetch error, [`EngineError::UnsupportedUrl`], or
/// [`EngineError::Io`] when the destination cannot be written.
pub fn fetch_and_store(fetcher: &dyn Fetch, url: &str, destination: &Path) -> Result<PathBuf> {
    validate_url(url)?;
    let target = resolve_destination(url, destination);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }

    let mut reader = fetcher.open(url)?;
    let mut file = File::create(&target).map_err(|e| EngineError::io(&target, e))?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer).map_err(|e| EngineError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        file.write_all(buffer.get(..n).unwrap_or_default())
            .map_err(|e| EngineError::io(&target, e))?;
    }
    file.flush().map_err(|e| EngineError::io(&target, e))?;
    Ok(target)
}

/// Install a tool from a remote shell script unless `probe_command` already
/// resolves.
///
/// The script body is passed to `/bin/bash -c` with `extra_args` as its
/// positional parameters. Returns `true` if the script ran.
///
/// # Errors
///
/// Returns a fetch error, or [`EngineError::CommandFailed`] if the script
/// exits non-zero.
pub fn run_remote_install_script(
    executor: &dyn Executor,
    fetcher: &dyn Fetch,
    probe_command: &str,
    url: &str,
    extra_args: &[String],
) -> Result<bool> {
    if executor.which(probe_command) {
        return Ok(false);
    }
    let script = fetch_text(fetcher, url)?;
    let mut args: Vec<&str> = vec!["-c", script.as_str(), "--"];
    args.extend(extra_args.iter().map(String::as_str));
    executor.run("/bin/bash", &args)?;
    Ok(true)
}
