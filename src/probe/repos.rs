//! Configured package repositories, read from `.repo` files.
//!
//! The catalog is expensive enough to read that a run parses it once and
//! keeps it in the [`Context`](crate::tasks::Context). It includes disabled
//! repositories, matching what the package manager itself reports.
use std::path::Path;

use anyhow::{Context as _, Result};

use super::parse::copr_name;
use crate::error::EngineError;
use crate::inventory::IdentifierSet;

/// One `[section]` of a `.repo` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Repository id (the section header).
    pub id: String,
    /// First base URL, with `$releasever`/`$basearch` substituted.
    pub baseurl: Option<String>,
}

/// Every repository defined under a repo directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoCatalog {
    /// Entries in file-name then section order.
    pub entries: Vec<RepoEntry>,
}

/// Values substituted into base URLs.
#[derive(Debug, Clone)]
pub struct RepoVars<'a> {
    /// Value for `$releasever`.
    pub releasever: &'a str,
    /// Value for `$basearch`.
    pub basearch: &'a str,
}

impl RepoCatalog {
    /// Parse every `*.repo` file in `dir`. A missing directory yields an
    /// empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if a repo file cannot be read.
    pub fn load(dir: &Path, vars: &RepoVars<'_>) -> Result<Self> {
        if !dir.is_dir() {
            return Ok(Self::default());
        }
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| EngineError::io(dir, e))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "repo"))
            .collect();
        files.sort();

        let mut entries = Vec::new();
        for path in &files {
            let content = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
            entries.extend(
                parse_repo_file(&content, vars)
                    .with_context(|| format!("parsing {}", path.display()))?,
            );
        }
        Ok(Self { entries })
    }

    /// First base URL of every repository that has one.
    #[must_use]
    pub fn base_urls(&self) -> IdentifierSet {
        self.entries
            .iter()
            .filter_map(|e| e.baseurl.clone())
            .collect()
    }

    /// `owner/project` names of configured COPR repositories.
    #[must_use]
    pub fn copr_names(&self) -> IdentifierSet {
        self.entries.iter().filter_map(|e| copr_name(&e.id)).collect()
    }
}

/// Parse the contents of one `.repo` file.
///
/// Continuation lines (indented extra URLs) and `#`/`;` comments are
/// ignored. Only the first whitespace- or comma-separated `baseurl` value
/// is kept.
///
/// # Errors
///
/// Returns an error if a `key=value` line appears before any section.
pub fn parse_repo_file(content: &str, vars: &RepoVars<'_>) -> Result<Vec<RepoEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<RepoEntry> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(id) = parse_header(trimmed) {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(RepoEntry { id, baseurl: None });
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let Some(entry) = current.as_mut() else {
            anyhow::bail!("entry outside of section at line {}: {trimmed}", line_num + 1);
        };
        if key.trim() == "baseurl" && entry.baseurl.is_none() {
            entry.baseurl = value
                .split(|c: char| c.is_whitespace() || c == ',')
                .find(|s| !s.is_empty())
                .map(|url| substitute(url, vars));
        }
    }

    if let Some(entry) = current {
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

fn substitute(url: &str, vars: &RepoVars<'_>) -> String {
    url.replace("$releasever", vars.releasever)
        .replace("$basearch", vars.basearch)
}
