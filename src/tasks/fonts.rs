//! Font downloads keyed by the font's full name.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{Context, Converge, Task, TaskResult, converge, list_task_name};
use crate::fetch;
use crate::inventory::{self, IdentifierSet};
use crate::probe::{self, ProbePolicy, parse};

/// Directory fonts are downloaded into, relative to home.
pub const FONTS_DIR: &str = ".local/share/fonts";

/// The name `fc-list` is expected to report for a font URL: the
/// percent-decoded file name without its extension.
///
/// ```
/// use shaper::tasks::fonts::font_key;
///
/// assert_eq!(
///     font_key("https://example.com/raw/Fira%20Code%20Regular.ttf"),
///     "Fira Code Regular"
/// );
/// ```
#[must_use]
pub fn font_key(url: &str) -> String {
    let file_name = fetch::url_file_name(url);
    Path::new(&file_name)
        .file_stem()
        .map_or_else(|| file_name.clone(), |stem| stem.to_string_lossy().into_owned())
}

/// Download fonts that `fc-list` does not report, then rebuild the cache.
#[derive(Debug)]
pub struct InstallFonts {
    name: String,
    list: PathBuf,
}

impl InstallFonts {
    #[must_use]
    pub fn new(list: PathBuf) -> Self {
        Self {
            name: list_task_name("Install fonts", &list),
            list,
        }
    }

    /// Font key to download URL.
    fn urls(&self) -> Result<BTreeMap<String, String>> {
        let urls = inventory::without_blank(inventory::read_set_from_file(&self.list)?);
        Ok(urls.into_iter().map(|url| (font_key(&url), url)).collect())
    }
}

impl Converge for InstallFonts {
    fn category(&self) -> &str {
        "font"
    }

    fn desired(&self, _ctx: &Context) -> Result<IdentifierSet> {
        Ok(self.urls()?.into_keys().collect())
    }

    fn probe_existing(&self, ctx: &Context) -> Result<IdentifierSet> {
        probe::probe_output(ctx.executor.as_ref(), "fc-list", &["-f", "%{fullname[0]}\n"])
            .map(|out| parse::fonts_installed(&out))
            .resolve(ProbePolicy::Strict)
    }

    fn install_delta(&self, ctx: &Context, delta: &IdentifierSet) -> Result<()> {
        let urls = self.urls()?;
        let dir = ctx.home_path(FONTS_DIR);
        for url in delta.iter().filter_map(|key| urls.get(key)) {
            let stored = fetch::fetch_and_store(ctx.fetcher.as_ref(), url, &dir)?;
            ctx.log.debug(&format!("stored {}", stored.display()));
        }
        ctx.executor.run("fc-cache", &["-f"])?;
        Ok(())
    }
}

impl Task for InstallFonts {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        converge(self, ctx)
    }
}
