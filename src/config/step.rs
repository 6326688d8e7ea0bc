//! Playbook step definitions.
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default SSH remote prefix used after the SSH bootstrap.
pub const DEFAULT_SSH_PREFIX: &str = "git@github.com:";
/// Default HTTPS remote prefix used to clone the `ssh` module.
pub const DEFAULT_HTTPS_PREFIX: &str = "https://github.com/";

/// One `[[step]]` entry, tagged by `kind`.
///
/// Kinds without fields are empty struct variants: serde ignores
/// `deny_unknown_fields` on unit variants of an internally tagged enum.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Step {
    /// Import RPM signing keys listed in a JSON manifest.
    RpmKeys {
        /// Path to a JSON array of `{keyword, url}` objects.
        manifest: PathBuf,
    },
    /// Add `.repo` URLs with `dnf config-manager`.
    DnfRepos {
        /// List file of repository URLs.
        list: PathBuf,
    },
    /// Enable COPR repositories.
    CoprRepos {
        /// List file of `owner/project` names.
        list: PathBuf,
    },
    /// Install the RPM Fusion free and nonfree release packages.
    RpmFusion {},
    /// Install system packages.
    DnfPackages {
        /// List file of package names.
        list: PathBuf,
    },
    /// Download fonts into `~/.local/share/fonts`.
    Fonts {
        /// List file of font URLs.
        list: PathBuf,
    },
    /// `cargo install` each listed spec.
    CargoPackages {
        /// List file of package specs.
        list: PathBuf,
    },
    /// `go install` each listed module.
    GoPackages {
        /// List file of module paths.
        list: PathBuf,
    },
    /// Update `/usr/local/go` to the newest release.
    GoToolchain {},
    /// Global npm packages through volta.
    NpmPackages {
        /// List file of package specs.
        list: PathBuf,
    },
    /// Packages in the `~/.venv` virtual environment.
    PipPackages {
        /// List file of package names.
        list: PathBuf,
    },
    /// Run a remote installer unless `command` already resolves.
    RemoteScript {
        /// Program whose presence means the tool is installed.
        command: String,
        /// HTTPS URL of the install script.
        url: String,
        /// Arguments appended after the script.
        #[serde(default)]
        args: Vec<String>,
    },
    /// Reinstall a prebuilt tool when a newer release is published.
    ReleaseArchive {
        /// Display name, e.g. `MultiMC`.
        name: String,
        /// HTTPS URL of the latest-release JSON; its `name` is the version.
        release: String,
        /// HTTPS URL of the tarball unpacked into `/usr/local`.
        archive: String,
        /// Installed binary queried for its version.
        binary: String,
        /// Arguments that make `binary` print its version.
        #[serde(default = "default_version_args")]
        version_args: Vec<String>,
    },
    /// Make sure an SSH agent holds the user's key.
    SshAgent {},
    /// Restore the `ssh` dotfile module over HTTPS when no key exists.
    SshDotfiles {
        /// Repository path appended to both prefixes, e.g. `me/dotfiles-ssh.git`.
        repo: String,
        /// Remote prefix set after the bootstrap.
        ssh_prefix: Option<String>,
        /// Remote prefix used for the initial clone.
        https_prefix: Option<String>,
    },
    /// Restore a dotfile module into the home directory.
    Dotfiles {
        /// Module name; the bare repository lives at `<dotfiles_root>/<module>`.
        module: String,
        /// Remote URL.
        url: String,
    },
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

impl Step {
    /// The `kind` tag, used by `--only` and `--skip`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RpmKeys { .. } => "rpm-keys",
            Self::DnfRepos { .. } => "dnf-repos",
            Self::CoprRepos { .. } => "copr-repos",
            Self::RpmFusion {} => "rpm-fusion",
            Self::DnfPackages { .. } => "dnf-packages",
            Self::Fonts { .. } => "fonts",
            Self::CargoPackages { .. } => "cargo-packages",
            Self::GoPackages { .. } => "go-packages",
            Self::GoToolchain {} => "go-toolchain",
            Self::NpmPackages { .. } => "npm-packages",
            Self::PipPackages { .. } => "pip-packages",
            Self::RemoteScript { .. } => "remote-script",
            Self::ReleaseArchive { .. } => "release-archive",
            Self::SshAgent {} => "ssh-agent",
            Self::SshDotfiles { .. } => "ssh-dotfiles",
            Self::Dotfiles { .. } => "dotfiles",
        }
    }

    /// The list or manifest file this step reads, if any.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Self::RpmKeys { manifest } => Some(manifest),
            Self::DnfRepos { list }
            | Self::CoprRepos { list }
            | Self::DnfPackages { list }
            | Self::Fonts { list }
            | Self::CargoPackages { list }
            | Self::GoPackages { list }
            | Self::NpmPackages { list }
            | Self::PipPackages { list } => Some(list),
            _ => None,
        }
    }

    pub(super) fn source_path_mut(&mut self) -> Option<&mut PathBuf> {
        match self {
            Self::RpmKeys { manifest } => Some(manifest),
            Self::DnfRepos { list }
            | Self::CoprRepos { list }
            | Self::DnfPackages { list }
            | Self::Fonts { list }
            | Self::CargoPackages { list }
            | Self::GoPackages { list }
            | Self::NpmPackages { list }
            | Self::PipPackages { list } => Some(list),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        step: Vec<Step>,
    }

    fn parse(toml: &str) -> Result<Vec<Step>, toml::de::Error> {
        toml::from_str::<Wrapper>(toml).map(|w| w.step)
    }

    #[test]
    fn parses_every_shape() {
        let steps = parse(
            r#"
[[step]]
kind = "dnf-packages"
list = "base.txt"

[[step]]
kind = "rpm-fusion"

[[step]]
kind = "remote-script"
command = "volta"
url = "https://get.volta.sh"
args = ["--skip-setup"]

[[step]]
kind = "ssh-dotfiles"
repo = "me/dotfiles-ssh.git"

[[step]]
kind = "dotfiles"
module = "base"
url = "git@github.com:me/dotfiles-base.git"
"#,
        )
        .unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(
            steps[0],
            Step::DnfPackages {
                list: PathBuf::from("base.txt")
            }
        );
        assert_eq!(steps[1], Step::RpmFusion {});
        assert!(matches!(&steps[2], Step::RemoteScript { args, .. } if args == &["--skip-setup"]));
        assert!(matches!(
            &steps[3],
            Step::SshDotfiles { ssh_prefix: None, https_prefix: None, .. }
        ));
        assert_eq!(steps[4].kind(), "dotfiles");
    }

    #[test]
    fn remote_script_args_default_empty() {
        let steps = parse(
            "[[step]]\nkind = \"remote-script\"\ncommand = \"x\"\nurl = \"https://x.example/i.sh\"\n",
        )
        .unwrap();
        assert!(matches!(&steps[0], Step::RemoteScript { args, .. } if args.is_empty()));
    }

    #[test]
    fn release_archive_defaults_version_args() {
        let steps = parse(
            r#"
[[step]]
kind = "release-archive"
name = "MultiMC"
release = "https://api.github.com/repos/MultiMC/launcher/releases/latest"
archive = "https://files.multimc.org/downloads/mmc-stable-lin64.tar.gz"
binary = "/usr/local/MultiMC/MultiMC"
"#,
        )
        .unwrap();
        assert!(matches!(
            &steps[0],
            Step::ReleaseArchive { version_args, .. } if version_args == &["--version"]
        ));
        assert_eq!(steps[0].kind(), "release-archive");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(parse("[[step]]\nkind = \"flatpak\"\n").is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(parse("[[step]]\nkind = \"fonts\"\nlist = \"f.txt\"\nmirror = \"x\"\n").is_err());
    }

    #[test]
    fn unknown_field_on_fieldless_kind_is_rejected() {
        for kind in ["rpm-fusion", "go-toolchain", "ssh-agent"] {
            let toml = format!("[[step]]\nkind = \"{kind}\"\nflavor = \"free\"\n");
            assert!(parse(&toml).is_err(), "{kind} accepted an unknown field");
        }
    }

    #[test]
    fn missing_field_is_rejected() {
        assert!(parse("[[step]]\nkind = \"dotfiles\"\nmodule = \"base\"\n").is_err());
    }

    #[test]
    fn source_path_only_for_file_backed_steps() {
        let step = Step::Fonts {
            list: PathBuf::from("fonts.txt"),
        };
        assert_eq!(step.source_path(), Some(Path::new("fonts.txt")));
        assert_eq!(Step::GoToolchain {}.source_path(), None);
    }
}
