//! Desired-set sources: flat list files, command output, package specs.
//!
//! Lines are taken verbatim. Nothing is trimmed or comment-stripped, so a
//! blank line becomes an empty identifier; adapters that read list files
//! drop it with [`without_blank`].
use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use crate::error::EngineError;
use crate::exec::Executor;

/// An ordered set of resource identifiers.
///
/// Ordering only makes batched argv and logs deterministic; set semantics
/// are exact string equality.
pub type IdentifierSet = BTreeSet<String>;

/// Split text into a set of its lines.
///
/// # Examples
///
/// ```
/// use shaper::inventory::lines_to_set;
///
/// let set = lines_to_set("git\nvim\ngit\n");
/// assert_eq!(set.len(), 2);
/// assert!(set.contains("vim"));
/// ```
#[must_use]
pub fn lines_to_set(text: &str) -> IdentifierSet {
    text.lines().map(str::to_string).collect()
}

/// Read a newline-delimited list file into a set.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the file is missing or unreadable.
pub fn read_set_from_file(path: &Path) -> Result<IdentifierSet> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    Ok(lines_to_set(&text))
}

/// Run a command and collect its stdout lines into a set.
///
/// # Errors
///
/// Returns [`EngineError::MissingExecutable`] when the program is not found
/// and [`EngineError::CommandFailed`] on non-zero exit. Callers decide
/// whether either means "nothing installed yet".
pub fn read_set_from_command(
    executor: &dyn Executor,
    program: &str,
    args: &[&str],
) -> Result<IdentifierSet> {
    let result = executor.run(program, args)?;
    Ok(lines_to_set(&result.stdout))
}

/// Drop the empty identifier produced by blank lines.
#[must_use]
pub fn without_blank(mut set: IdentifierSet) -> IdentifierSet {
    set.remove("");
    set
}

/// Tokenize a package spec line into argv words.
///
/// Only plain whitespace-separated specs are supported; quotes have no
/// special meaning.
///
/// ```
/// use shaper::inventory::split_spec;
///
/// assert_eq!(split_spec("  ripgrep --locked "), ["ripgrep", "--locked"]);
/// assert!(split_spec("   ").is_empty());
/// ```
#[must_use]
pub fn split_spec(spec: &str) -> Vec<String> {
    spec.split_whitespace().map(str::to_string).collect()
}
