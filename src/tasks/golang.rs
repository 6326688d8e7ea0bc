//! Go modules installed with `go install`, and the Go toolchain itself.
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use super::release::unpack_archive;
use super::{Context, Converge, Task, TaskResult, converge, list_task_name};
use crate::fetch;
use crate::inventory::{self, IdentifierSet};
use crate::probe::{self, ProbePolicy, ProbeResult, parse};

/// Release manifest, newest first.
pub const GO_RELEASES_URL: &str = "https://go.dev/dl/?mode=json";
/// Base URL of release archives.
pub const GO_DOWNLOAD_URL: &str = "https://go.dev/dl/";

/// `go install <module>@latest` for each module missing from `~/go/bin`.
#[derive(Debug)]
pub struct GoPackages {
    name: String,
    list: PathBuf,
}

impl GoPackages {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install go packages", &list),
            list,
        }
    }
}

impl Converge for GoPackages {
    fn category(&self) -> &str {
        "go module"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        Ok(inventory::without_blank(inventory::read_set_from_file(&self.list)?))
    }

    /// Module paths embedded in the binaries under `~/go/bin`. No directory
    /// means nothing installed, without running `go`.
    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        let bin = ctx.home_path("go/bin");
        if !bin.is_dir() {
            return Ok(IdentifierSet::new());
        }
        probe::probe_output(
            ctx.executor.as_ref(),
            "go",
            &["version", "-m", &bin.to_string_lossy()],
        )
        .map(|out| parse::go_installed(&out))
        .resolve(ProbePolicy::Strict)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        for module in delta {
            ctx.executor
                .run("go", &["install", &format!("{module}@latest")])?;
        }
        Ok(())
    }
}

impl Task for GoPackages {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// One entry of the release manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct GoRelease {
    /// Version string, e.g. `go1.23.1`.
    pub version: String,
    /// Downloadable files for every platform.
    pub files: Vec<GoFile>,
}

/// One downloadable file of a release.
#[derive(Debug, Clone, Deserialize)]
pub struct GoFile {
    pub filename: String,
    pub os: String,
    pub arch: String,
    pub kind: String,
    pub sha256: String,
}

impl GoRelease {
    /// The linux archive for `arch` (Go naming).
    #[must_use]
    pub fn linux_archive(&self, arch: &str) -> Option<&GoFile> {
        self.files
            .iter()
            .find(|f| f.os == "linux" && f.kind == "archive" && f.arch == arch)
    }
}

/// Map a Rust target architecture to Go's name for it.
///
/// ```
/// use shaper::tasks::golang::go_arch;
///
/// assert_eq!(go_arch("x86_64"), Some("amd64"));
/// assert_eq!(go_arch("riscv64"), None);
/// ```
#[must_use]
pub fn go_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("amd64"),
        "aarch64" => Some("arm64"),
        "x86" => Some("386"),
        "arm" => Some("armv6l"),
        _ => None,
    }
}

/// Installed version from `go version` output (`go version go1.22.1 linux/amd64`).
#[must_use]
pub fn installed_version(output: &str) -> Option<&str> {
    output.split_whitespace().nth(2)
}

/// Replace `/usr/local/go` with the newest release when it differs from the
/// installed one. The archive's SHA-256 is checked before unpacking.
#[derive(Debug)]
pub struct GoToolchain;

impl GoToolchain {
    fn current(ctx: &Context) -> Result<Option<String>> {
        match probe::probe_output(ctx.executor.as_ref(), "go", &["version"]) {
            ProbeResult::Present(out) => Ok(installed_version(&out).map(str::to_string)),
            ProbeResult::Absent { .. } => Ok(None),
            ProbeResult::Failed(err) => Err(err.context("querying installed go version")),
        }
    }

    fn latest(ctx: &Context) -> Result<GoRelease> {
        let manifest = fetch::fetch_json(ctx.fetcher.as_ref(), GO_RELEASES_URL)?;
        let releases: Vec<GoRelease> =
            serde_json::from_value(manifest).context("unexpected go release manifest")?;
        releases
            .into_iter()
            .next()
            .context("go release manifest is empty")
    }
}

impl Task for GoToolchain {
    fn name(&self) -> &str {
        "Update go toolchain"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        go_arch(std::env::consts::ARCH).is_some()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let arch = go_arch(std::env::consts::ARCH)
            .with_context(|| format!("no go build for {}", std::env::consts::ARCH))?;
        let current = Self::current(ctx)?;
        let latest = Self::latest(ctx)?;

        if current.as_deref() == Some(latest.version.as_str()) {
            ctx.log.info(&format!("{} already installed", latest.version));
            return Ok(TaskResult::Ok);
        }

        let file = latest
            .linux_archive(arch)
            .with_context(|| format!("{} has no linux/{arch} archive", latest.version))?;

        if ctx.dry_run {
            ctx.log.dry_run(&format!(
                "would update go {} -> {}",
                current.as_deref().unwrap_or("(none)"),
                latest.version
            ));
            return Ok(TaskResult::DryRun);
        }

        let url = format!("{GO_DOWNLOAD_URL}{}", file.filename);
        unpack_archive(ctx, &url, "golang-", Some(&file.sha256))?;
        ctx.log.info(&format!("installed {}", latest.version));
        Ok(TaskResult::Ok)
    }
}
