//! Prebuilt tools tracked by their latest published release.
use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use crate::fetch;
use crate::hash::{self, HashAlgorithm};
use crate::probe::{self, ProbeResult};

/// Where release archives are unpacked.
pub const INSTALL_ROOT: &str = "/usr/local";

/// Download `url` into a fresh `<prefix>*` directory, check its SHA-256 when
/// one is known, and unpack it over [`INSTALL_ROOT`] with root privileges.
///
/// # Errors
///
/// Returns `Fetch`, `ChecksumMismatch` or `CommandFailed`. Nothing is
/// unpacked unless the digest matched.
pub fn unpack_archive(ctx: &Context, url: &str, prefix: &str, sha256: Option<&str>) -> Result<()> {
    let staging = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .context("creating download directory")?;
    let archive = fetch::fetch_and_store(ctx.fetcher.as_ref(), url, staging.path())?;
    if let Some(expected) = sha256 {
        hash::verify_file(&archive, expected, HashAlgorithm::Sha256)?;
    }
    ctx.privileged(
        "tar",
        &[
            "-x",
            "-C",
            INSTALL_ROOT,
            "--recursive-unlink",
            "-f",
            &archive.to_string_lossy(),
        ],
    )?;
    Ok(())
}

/// Reinstall a tool from `archive` whenever the name of the latest release
/// at `release` does not appear in the tool's version output.
///
/// `release` is a GitHub-style "latest release" JSON document; its `name`
/// field is the version marker.
#[derive(Debug)]
pub struct ReleaseArchive {
    name: String,
    release: String,
    archive: String,
    binary: String,
    version_args: Vec<String>,
}

impl ReleaseArchive {
    #[must_use]
    pub fn new(
        name: &str,
        release: String,
        archive: String,
        binary: String,
        version_args: Vec<String>,
    ) -> Self {
        Self {
            name: format!("Update {name}"),
            release,
            archive,
            binary,
            version_args,
        }
    }

    /// Version output of the installed binary; empty when it is not installed.
    fn current(&self, ctx: &Context) -> Result<String> {
        let args: Vec<&str> = self.version_args.iter().map(String::as_str).collect();
        match probe::probe_output(ctx.executor.as_ref(), &self.binary, &args) {
            ProbeResult::Present(out) => Ok(out),
            ProbeResult::Absent { .. } => Ok(String::new()),
            ProbeResult::Failed(err) => {
                Err(err.context(format!("querying {} version", self.binary)))
            }
        }
    }

    fn latest(&self, ctx: &Context) -> Result<String> {
        let release = fetch::fetch_json(ctx.fetcher.as_ref(), &self.release)?;
        release
            .get("name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .with_context(|| format!("release at {} has no name", self.release))
    }
}

impl Task for ReleaseArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let latest = self.latest(ctx)?;
        let current = self.current(ctx)?;

        if current.contains(&latest) {
            ctx.log.info(&format!("{latest} already installed"));
            return Ok(TaskResult::Ok);
        }

        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would install {latest} from {}", self.archive));
            return Ok(TaskResult::DryRun);
        }

        unpack_archive(ctx, &self.archive, "release-", None)?;
        ctx.log.info(&format!("installed {latest}"));
        Ok(TaskResult::Ok)
    }
}
