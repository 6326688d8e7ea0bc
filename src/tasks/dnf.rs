//! System packages, repositories and signing keys managed through dnf/rpm.
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use super::{Context, Converge, Task, TaskResult, converge, list_task_name};
use crate::delta;
use crate::error::EngineError;
use crate::inventory::{self, IdentifierSet};
use crate::probe::{self, ProbePolicy, ProbeResult};

const DNF: &str = "/usr/bin/dnf";
const RPM: &str = "/usr/bin/rpm";

/// Names of packages the user asked for, as opposed to dependencies.
fn userinstalled(ctx: &Context) -> Result<IdentifierSet> {
    probe::probe_lines(
        ctx.executor.as_ref(),
        "dnf",
        &["repoquery", "--userinstalled", "--queryformat", "%{name}"],
    )
    .resolve(ProbePolicy::Strict)
    .context("querying user-installed packages")
}

/// Run `dnf <args…> <delta…>` with root privileges as one batch.
fn dnf_batch(ctx: &Context, args: &[&str], delta: &IdentifierSet) -> Result<()> {
    let mut argv: Vec<&str> = args.to_vec();
    argv.extend(delta.iter().map(String::as_str));
    ctx.privileged(DNF, &argv)?;
    Ok(())
}

fn read_list(list: &std::path::Path) -> Result<IdentifierSet> {
    Ok(inventory::without_blank(inventory::read_set_from_file(list)?))
}

/// Install system packages from a list file.
#[derive(Debug)]
pub struct DnfPackages {
    name: String,
    list: PathBuf,
}

impl DnfPackages {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install dnf packages", &list),
            list,
        }
    }
}

impl Converge for DnfPackages {
    fn category(&self) -> &str {
        "package"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        userinstalled(ctx)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        dnf_batch(ctx, &["install", "-y"], delta)
    }
}

impl Task for DnfPackages {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// Add repositories by URL with `dnf config-manager --add-repo`.
#[derive(Debug)]
pub struct DnfRepos {
    name: String,
    list: PathBuf,
}

impl DnfRepos {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Add dnf repositories", &list),
            list,
        }
    }
}

impl Converge for DnfRepos {
    fn category(&self) -> &str {
        "repository"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        Ok(ctx.repo_catalog()?.base_urls())
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        dnf_batch(ctx, &["config-manager", "--add-repo"], delta)
    }
}

impl Task for DnfRepos {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// Enable COPR repositories given as `owner/project`.
#[derive(Debug)]
pub struct CoprRepos {
    name: String,
    list: PathBuf,
}

impl CoprRepos {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Enable COPR repositories", &list),
            list,
        }
    }
}

impl Converge for CoprRepos {
    fn category(&self) -> &str {
        "copr repository"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        Ok(ctx.repo_catalog()?.copr_names())
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        dnf_batch(ctx, &["copr", "enable", "-y"], delta)
    }
}

impl Task for CoprRepos {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// Release packages that configure the RPM Fusion repositories.
pub const RPM_FUSION_PACKAGES: [&str; 2] = ["rpmfusion-free-release", "rpmfusion-nonfree-release"];

/// Download URL of an RPM Fusion release package (`"free"` or `"nonfree"`).
#[must_use]
pub fn rpm_fusion_url(flavor: &str, fedora_version: &str) -> String {
    format!(
        "https://download1.rpmfusion.org/{flavor}/fedora/rpmfusion-{flavor}-release-{fedora_version}.noarch.rpm"
    )
}

/// Install the RPM Fusion free and nonfree release packages.
///
/// Both are installed together unless both are already present.
#[derive(Debug)]
pub struct RpmFusion;

impl Converge for RpmFusion {
    fn category(&self) -> &str {
        "release package"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        Ok(RPM_FUSION_PACKAGES.iter().map(|p| (*p).to_string()).collect())
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        userinstalled(ctx)
    }

    fn install_delta(&self, ctx: &Context, _delta: &IdentifierSet) -> Result<()> {
        let version = ctx.fedora_version()?;
        let free = rpm_fusion_url("free", version);
        let nonfree = rpm_fusion_url("nonfree", version);
        ctx.privileged(DNF, &["install", "-y", &free, &nonfree])?;
        Ok(())
    }
}

impl Task for RpmFusion {
    fn name(&self) -> &str {
        "Enable RPM Fusion"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.fedora_version()
            .is_ok_and(|v| v.parse::<u32>().is_ok())
    }

    /// Subset test rather than a per-package delta: the two release
    /// packages are always installed together.
    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let required = self.desired(ctx)?;
        let existing = self.probe_existing(ctx)?;
        if delta::is_satisfied(&required, &existing) {
            ctx.log.info("RPM Fusion already enabled");
            return Ok(TaskResult::Ok);
        }
        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would install {}", RPM_FUSION_PACKAGES.join(" and ")));
            return Ok(TaskResult::DryRun);
        }
        self.install_delta(ctx, &delta::resolve(&required, &existing))?;
        ctx.log.info("RPM Fusion enabled");
        Ok(TaskResult::Ok)
    }
}

/// One entry of the signing key manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyEntry {
    /// Substring expected in the installed key's packager field.
    pub keyword: String,
    /// Where to import the key from.
    pub url: String,
}

/// Parse a key manifest: a JSON array of `{keyword, url}` objects.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file cannot be read, or a parse error.
pub fn load_key_manifest(path: &std::path::Path) -> Result<Vec<KeyEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Import RPM signing keys whose keyword matches no installed key.
#[derive(Debug)]
pub struct RpmKeys {
    name: String,
    manifest: PathBuf,
}

impl RpmKeys {
    #[must_use]
    pub fn new(manifest: PathBuf) -> Self {
        Self {
            name: list_task_name("Import RPM keys", &manifest),
            manifest,
        }
    }
}

impl Converge for RpmKeys {
    fn category(&self) -> &str {
        "key"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        Ok(load_key_manifest(&self.manifest)?
            .into_iter()
            .map(|k| k.keyword)
            .collect())
    }

    /// Keywords that already match an installed `gpg-pubkey` packager.
    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        let output = ProbeResult::from_result(
            ctx.privileged(RPM, &["-qa", "--qf", "%{PACKAGER}\n", "gpg-pubkey*"])
                .map(|r| r.stdout),
        )
        .resolve(ProbePolicy::Strict)?;
        let packagers = inventory::lines_to_set(&output);
        let keywords = self.desired(ctx)?;
        let missing = delta::missing_keys(keywords.iter().map(String::as_str), &packagers);
        Ok(delta::resolve(&keywords, &missing))
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        for entry in load_key_manifest(&self.manifest)?
            .iter()
            .filter(|k| delta.contains(&k.keyword))
        {
            ctx.log.debug(&format!("importing key {}", entry.keyword));
            ctx.privileged(RPM, &["--import", &entry.url])?;
        }
        Ok(())
    }
}

impl Task for RpmKeys {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}
