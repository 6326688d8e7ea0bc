//! Language-ecosystem packages: cargo, npm (through volta) and pip.
use std::path::PathBuf;

use anyhow::Result;

use super::{Context, Converge, Task, TaskResult, converge, list_task_name};
use crate::fetch;
use crate::inventory::{self, IdentifierSet};
use crate::probe::{self, ProbePolicy, ProbeResult, parse};

/// Installer script for volta.
pub const VOLTA_INSTALLER: &str = "https://get.volta.sh";
/// Virtual environment used for pip packages, relative to home.
pub const VENV_DIR: &str = ".venv";

fn read_list(list: &std::path::Path) -> Result<IdentifierSet> {
    Ok(inventory::without_blank(inventory::read_set_from_file(list)?))
}

/// `cargo install` each missing package spec.
#[derive(Debug)]
pub struct CargoPackages {
    name: String,
    list: PathBuf,
}

impl CargoPackages {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install cargo packages", &list),
            list,
        }
    }
}

impl Converge for CargoPackages {
    fn category(&self) -> &str {
        "crate"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        probe::probe_output(ctx.executor.as_ref(), "cargo", &["install", "--list"])
            .map(|out| parse::cargo_installed(&out))
            .resolve(ProbePolicy::Strict)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        for spec in delta {
            let tokens = inventory::split_spec(spec);
            let mut args = vec!["install"];
            args.extend(tokens.iter().map(String::as_str));
            ctx.executor.run("cargo", &args)?;
        }
        Ok(())
    }
}

impl Task for CargoPackages {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// Global npm packages installed with volta's managed npm.
///
/// volta is optional: when it is missing the existing set is empty and the
/// first install bootstraps volta and a node toolchain.
#[derive(Debug)]
pub struct NpmPackages {
    name: String,
    list: PathBuf,
}

impl NpmPackages {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install npm packages", &list),
            list,
        }
    }
}

/// Install volta from its remote script, then node, if either is missing.
fn ensure_volta_node(ctx: &Context) -> Result<()> {
    if fetch::run_remote_install_script(
        ctx.executor.as_ref(),
        ctx.fetcher.as_ref(),
        "volta",
        VOLTA_INSTALLER,
        &["--skip-setup".to_string()],
    )? {
        ctx.log.info("installed volta");
    }
    let node = probe::probe_output(ctx.executor.as_ref(), "node", &["-v"]);
    if let ProbeResult::Present(version) = node {
        ctx.log.debug(&format!("node {}", version.trim()));
    } else {
        ctx.executor.run("volta", &["install", "node"])?;
        ctx.log.info("installed node");
    }
    Ok(())
}

impl Converge for NpmPackages {
    fn category(&self) -> &str {
        "npm package"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        probe::probe_output(ctx.executor.as_ref(), "volta", &["list", "--format", "plain"])
            .map(|out| parse::volta_installed(&out))
            .resolve(ProbePolicy::DegradeToEmpty)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        ensure_volta_node(ctx)?;
        for spec in delta {
            let tokens = inventory::split_spec(spec);
            let mut args = vec!["run", "--npm", "latest", "npm", "install", "--global"];
            args.extend(tokens.iter().map(String::as_str));
            ctx.executor.run("volta", &args)?;
        }
        Ok(())
    }
}

impl Task for NpmPackages {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}

/// Packages in the user's `~/.venv`, created on first install.
#[derive(Debug)]
pub struct PipPackages {
    name: String,
    list: PathBuf,
}

impl PipPackages {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install pip packages", &list),
            list,
        }
    }

    fn pip(ctx: &Context) -> PathBuf {
        ctx.home_path(VENV_DIR).join("bin/pip")
    }
}

impl Converge for PipPackages {
    fn category(&self) -> &str {
        "python package"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        read_list(&self.list)
    }

    /// A venv that does not exist yet holds nothing.
    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        let pip = Self::pip(ctx);
        if !pip.is_file() {
            ctx.log
                .debug(&format!("{} not found, assuming empty venv", pip.display()));
            return Ok(IdentifierSet::new());
        }
        let output = probe::probe_output(
            ctx.executor.as_ref(),
            &pip.to_string_lossy(),
            &["list", "--format", "json"],
        )
        .resolve(ProbePolicy::Strict)?;
        parse::pip_installed(&output)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        let pip = Self::pip(ctx);
        if !pip.is_file() {
            let venv = ctx.home_path(VENV_DIR);
            ctx.executor.run(
                "python3",
                &[
                    "-m",
                    "venv",
                    "--system-site-packages",
                    "--upgrade-deps",
                    &venv.to_string_lossy(),
                ],
            )?;
            ctx.log.info(&format!("created {}", venv.display()));
        }
        let mut args = vec!["install"];
        args.extend(delta.iter().map(String::as_str));
        ctx.executor.run(&pip.to_string_lossy(), &args)?;
        Ok(())
    }
}

impl Task for PipPackages {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}
