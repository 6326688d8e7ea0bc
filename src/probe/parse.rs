//! Parsers turning tool output into identifier sets.
//!
//! Each function takes the raw stdout of one query command.
use crate::inventory::{IdentifierSet, lines_to_set};

/// Installed crates and binaries from `cargo install --list`.
///
/// Header lines (`ripgrep v14.1.0:`) contribute the crate name; indented
/// lines contribute binary names. Both are kept so a list file may name
/// either.
///
/// ```
/// use shaper::probe::parse::cargo_installed;
///
/// let set = cargo_installed("ripgrep v14.1.0:\n    rg\n");
/// assert!(set.contains("ripgrep"));
/// assert!(set.contains("rg"));
/// ```
#[must_use]
pub fn cargo_installed(output: &str) -> IdentifierSet {
    output
        .lines()
        .filter_map(|line| {
            if line.starts_with("  ") {
                Some(line.trim().to_string())
            } else {
                line.split_whitespace().next().map(str::to_string)
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Module paths from `go version -m <dir>`.
#[must_use]
pub fn go_installed(output: &str) -> IdentifierSet {
    output
        .lines()
        .filter(|line| line.starts_with("\tpath"))
        .map(|line| line.replacen("\tpath\t", "", 1).trim().to_string())
        .collect()
}

/// Package names from `volta list --format plain`.
///
/// Lines look like `package typescript@5.4.5 (default)`. The version is
/// split at the last `@` so scoped names such as `@vue/cli@5.0.8` survive.
#[must_use]
pub fn volta_installed(output: &str) -> IdentifierSet {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            (words.next() == Some("package")).then(|| words.next()).flatten()
        })
        .map(|spec| match spec.rsplit_once('@') {
            Some((name, _)) if !name.is_empty() => name.to_string(),
            _ => spec.to_string(),
        })
        .collect()
}

/// Package names from `pip list --format json`.
///
/// # Errors
///
/// Returns an error if the output is not a JSON array of objects with a
/// `name` string.
pub fn pip_installed(output: &str) -> anyhow::Result<IdentifierSet> {
    #[derive(serde::Deserialize)]
    struct Entry {
        name: String,
    }
    let entries: Vec<Entry> = serde_json::from_str(output)?;
    Ok(entries.into_iter().map(|e| e.name).collect())
}

/// Font full names from `fc-list -f '%{fullname[0]}\n'`, minus the empty
/// name reported for fonts without one.
#[must_use]
pub fn fonts_installed(output: &str) -> IdentifierSet {
    let mut fonts = lines_to_set(output);
    fonts.remove("");
    fonts
}

/// COPR `owner/project` from a repo id like `copr:copr.fedorainfracloud.org:owner:project`.
///
/// Returns `None` for ids that are not COPR repos.
///
/// ```
/// use shaper::probe::parse::copr_name;
///
/// assert_eq!(
///     copr_name("copr:copr.fedorainfracloud.org:atim:starship").as_deref(),
///     Some("atim/starship")
/// );
/// assert_eq!(copr_name("fedora"), None);
/// ```
#[must_use]
pub fn copr_name(repo_id: &str) -> Option<String> {
    if !repo_id.starts_with("copr") {
        return None;
    }
    Some(repo_id.split(':').skip(2).collect::<Vec<_>>().join("/"))
}

/// `SSH_*` assignments from `ssh-agent` output.
///
/// ```text
/// SSH_AUTH_SOCK=/home/u/.ssh-agent.sock; export SSH_AUTH_SOCK;
/// SSH_AGENT_PID=1234; export SSH_AGENT_PID;
/// ```
#[must_use]
pub fn ssh_agent_env(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter(|line| line.starts_with("SSH"))
        .filter_map(|line| line.split(';').next())
        .filter_map(|assignment| assignment.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}
