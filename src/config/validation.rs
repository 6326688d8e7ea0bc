//! Checks that run after parsing and before any step executes.
use std::collections::HashSet;

use super::{Playbook, Step};
use crate::error::ConfigError;

/// A problem that does not stop the run but is worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Zero-based step index.
    pub index: usize,
    /// Step kind.
    pub kind: &'static str,
    /// Human-readable warning message.
    pub message: String,
}

/// Reject steps that cannot possibly succeed and collect warnings for the
/// rest.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidStep`] for the first hard error: a
/// non-HTTPS remote script or release URL, an empty or path-like module name, or a
/// duplicated dotfile module.
pub fn validate(playbook: &Playbook) -> Result<Vec<ValidationWarning>, ConfigError> {
    let mut warnings = Vec::new();
    let mut modules = HashSet::new();

    for (index, step) in playbook.steps.iter().enumerate() {
        let invalid = |message: String| ConfigError::InvalidStep {
            index,
            kind: step.kind().to_string(),
            message,
        };

        if let Some(path) = step.source_path()
            && !path.is_file()
        {
            warnings.push(ValidationWarning {
                index,
                kind: step.kind(),
                message: format!("{} does not exist", path.display()),
            });
        }

        match step {
            Step::RemoteScript { command, url, .. } => {
                if command.trim().is_empty() {
                    return Err(invalid("command must not be empty".to_string()));
                }
                if !url.to_ascii_lowercase().starts_with("https://") {
                    return Err(invalid(format!("url must use https: {url}")));
                }
            }
            Step::ReleaseArchive {
                release, archive, binary, ..
            } => {
                if binary.trim().is_empty() {
                    return Err(invalid("binary must not be empty".to_string()));
                }
                for url in [release, archive] {
                    if !url.to_ascii_lowercase().starts_with("https://") {
                        return Err(invalid(format!("url must use https: {url}")));
                    }
                }
            }
            Step::Dotfiles { module, url } => {
                check_module_name(module).map_err(invalid)?;
                if url.trim().is_empty() {
                    return Err(invalid("url must not be empty".to_string()));
                }
                if !modules.insert(module.as_str()) {
                    return Err(invalid(format!("module '{module}' is listed twice")));
                }
            }
            Step::SshDotfiles { repo, .. } => {
                if repo.trim().is_empty() {
                    return Err(invalid("repo must not be empty".to_string()));
                }
                if !modules.insert("ssh") {
                    return Err(invalid("module 'ssh' is listed twice".to_string()));
                }
            }
            _ => {}
        }
    }

    Ok(warnings)
}

fn check_module_name(module: &str) -> Result<(), String> {
    if module.is_empty() {
        return Err("module must not be empty".to_string());
    }
    if module.contains('/') || module == "." || module == ".." {
        return Err(format!("module '{module}' must be a plain directory name"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn playbook(steps: Vec<Step>) -> Playbook {
        Playbook {
            steps,
            ..Playbook::default()
        }
    }

    fn dotfiles(module: &str) -> Step {
        Step::Dotfiles {
            module: module.to_string(),
            url: "https://example.com/d.git".to_string(),
        }
    }

    #[test]
    fn valid_playbook_has_no_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("pkgs.txt");
        std::fs::write(&list, "git\n").unwrap();
        let warnings = validate(&playbook(vec![
            Step::DnfPackages { list },
            dotfiles("base"),
        ]))
        .unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_list_file_is_a_warning() {
        let warnings = validate(&playbook(vec![Step::Fonts {
            list: PathBuf::from("/nonexistent/fonts.txt"),
        }]))
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, "fonts");
    }

    #[test]
    fn http_remote_script_is_rejected() {
        let err = validate(&playbook(vec![Step::RemoteScript {
            command: "volta".to_string(),
            url: "http://get.volta.sh".to_string(),
            args: vec![],
        }]))
        .unwrap_err();
        assert!(err.to_string().contains("step 0 (remote-script)"));
    }

    #[test]
    fn http_release_archive_is_rejected() {
        let step = Step::ReleaseArchive {
            name: "MultiMC".to_string(),
            release: "https://api.github.com/repos/MultiMC/launcher/releases/latest".to_string(),
            archive: "http://files.multimc.org/downloads/mmc-stable-lin64.tar.gz".to_string(),
            binary: "/usr/local/MultiMC/MultiMC".to_string(),
            version_args: vec!["-V".to_string()],
        };
        let err = validate(&playbook(vec![step])).unwrap_err();
        assert!(err.to_string().contains("release-archive"));
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let err = validate(&playbook(vec![dotfiles("base"), dotfiles("base")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStep { index: 1, .. }));
    }

    #[test]
    fn path_like_module_is_rejected() {
        assert!(validate(&playbook(vec![dotfiles("../etc")])).is_err());
        assert!(validate(&playbook(vec![dotfiles("")])).is_err());
    }

    #[test]
    fn ssh_module_conflicts_with_explicit_ssh_dotfiles() {
        let steps = vec![
            Step::SshDotfiles {
                repo: "me/ssh.git".to_string(),
                ssh_prefix: None,
                https_prefix: None,
            },
            dotfiles("ssh"),
        ];
        assert!(validate(&playbook(steps)).is_err());
    }
}
