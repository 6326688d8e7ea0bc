//! Playbook loading: TOML settings plus an ordered list of steps.
pub mod step;
pub mod validation;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use step::Step;

use crate::error::ConfigError;

/// Environment variable naming the playbook when `--playbook` is absent.
pub const PLAYBOOK_ENV: &str = "SHAPER_PLAYBOOK";
/// Playbook file looked up in the current directory as a last resort.
pub const DEFAULT_PLAYBOOK: &str = "playbook.toml";

/// Run-wide settings from the `[settings]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Directory of bare dotfile repositories (default `~/.dotfiles`).
    pub dotfiles_root: Option<PathBuf>,
    /// Privilege-escalation program (default `sudo`).
    pub privilege: Option<String>,
    /// SSH private key name under `~/.ssh` (default `id_ed25519`).
    pub ssh_key: Option<String>,
}

/// A parsed playbook with every path made absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Playbook {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Playbook {
    /// Read and parse the playbook at `path`.
    ///
    /// Relative paths inside the playbook resolve against the playbook's
    /// directory; a leading `~` resolves against `home`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid playbook.
    pub fn load(path: &Path, home: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir, home).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse playbook text, resolving relative paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns the parser message on malformed input.
    pub fn parse(content: &str, base_dir: &Path, home: &Path) -> Result<Self, String> {
        let mut playbook: Self = toml::from_str(content).map_err(|e| e.message().to_string())?;
        if let Some(root) = playbook.settings.dotfiles_root.take() {
            playbook.settings.dotfiles_root = Some(resolve_path(&root, base_dir, home));
        }
        for step in &mut playbook.steps {
            if let Some(path) = step.source_path_mut() {
                *path = resolve_path(path, base_dir, home);
            }
        }
        Ok(playbook)
    }

    /// Steps left after applying `--only` and `--skip` kind filters.
    ///
    /// An empty `only` keeps every kind.
    #[must_use]
    pub fn selected_steps(&self, only: &[String], skip: &[String]) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|step| only.is_empty() || only.iter().any(|k| k == step.kind()))
            .filter(|step| !skip.iter().any(|k| k == step.kind()))
            .collect()
    }
}

/// Locate the playbook: explicit path, then `$SHAPER_PLAYBOOK`, then
/// `./playbook.toml`.
#[must_use]
pub fn playbook_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os(PLAYBOOK_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_PLAYBOOK), PathBuf::from)
}

/// Expand a leading `~` against `home`, then anchor relative paths at `base_dir`.
#[must_use]
pub fn resolve_path(path: &Path, base_dir: &Path, home: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let home_str = home.to_string_lossy();
    let expanded =
        PathBuf::from(shellexpand::tilde_with_context(&*raw, || Some(&*home_str)).into_owned());
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const HOME: &str = "/home/u";

    fn parse(content: &str) -> Playbook {
        Playbook::parse(content, Path::new("/srv/play"), Path::new(HOME)).unwrap()
    }

    #[test]
    fn empty_playbook_has_defaults() {
        let playbook = parse("");
        assert_eq!(playbook, Playbook::default());
    }

    #[test]
    fn relative_list_paths_anchor_at_playbook_dir() {
        let playbook = parse("[[step]]\nkind = \"dnf-packages\"\nlist = \"packages/base.txt\"\n");
        assert_eq!(
            playbook.steps[0].source_path(),
            Some(Path::new("/srv/play/packages/base.txt"))
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let playbook = parse(
            "[settings]\ndotfiles_root = \"~/src/dots\"\n\n[[step]]\nkind = \"fonts\"\nlist = \"~/fonts.txt\"\n",
        );
        assert_eq!(
            playbook.settings.dotfiles_root,
            Some(PathBuf::from("/home/u/src/dots"))
        );
        assert_eq!(
            playbook.steps[0].source_path(),
            Some(Path::new("/home/u/fonts.txt"))
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        assert_eq!(
            resolve_path(Path::new("/etc/list"), Path::new("/srv"), Path::new(HOME)),
            PathBuf::from("/etc/list")
        );
    }

    #[test]
    fn unknown_setting_is_rejected() {
        let err = Playbook::parse("[settings]\nparallel = true\n", Path::new("."), Path::new(HOME));
        assert!(err.is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Playbook::load(Path::new("/nonexistent/playbook.toml"), Path::new(HOME))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playbook.toml");
        std::fs::write(&path, "[[step]]\nkind = \"nope\"\n").unwrap();
        let err = Playbook::load(&path, Path::new(HOME)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("playbook.toml"));
    }

    #[test]
    fn only_and_skip_filter_by_kind() {
        let playbook = parse(
            "[[step]]\nkind = \"rpm-fusion\"\n\n[[step]]\nkind = \"go-toolchain\"\n\n[[step]]\nkind = \"ssh-agent\"\n",
        );
        let kinds = |steps: Vec<&Step>| steps.iter().map(|s| s.kind()).collect::<Vec<_>>();

        assert_eq!(kinds(playbook.selected_steps(&[], &[])).len(), 3);
        assert_eq!(
            kinds(playbook.selected_steps(&["go-toolchain".to_string()], &[])),
            ["go-toolchain"]
        );
        assert_eq!(
            kinds(playbook.selected_steps(&[], &["rpm-fusion".to_string()])),
            ["go-toolchain", "ssh-agent"]
        );
    }

    #[test]
    fn explicit_playbook_path_wins() {
        assert_eq!(
            playbook_path(Some(Path::new("/tmp/p.toml"))),
            PathBuf::from("/tmp/p.toml")
        );
    }
}
