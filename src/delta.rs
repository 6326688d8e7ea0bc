//! Set difference between desired and observed state.
//!
//! Convergence is monotonic: identifiers already present are never touched
//! and nothing is ever removed, so a second run over the end state of a
//! first run resolves to an empty delta.
use crate::inventory::IdentifierSet;

/// Identifiers in `desired` that are not in `existing`.
///
/// ```
/// use shaper::delta::resolve;
/// use shaper::inventory::lines_to_set;
///
/// let delta = resolve(&lines_to_set("git\nvim"), &lines_to_set("vim\nemacs"));
/// assert_eq!(delta, lines_to_set("git"));
/// ```
#[must_use]
pub fn resolve(desired: &IdentifierSet, existing: &IdentifierSet) -> IdentifierSet {
    desired.difference(existing).cloned().collect()
}

/// Whether every identifier in `required` is already present.
#[must_use]
pub fn is_satisfied(required: &IdentifierSet, existing: &IdentifierSet) -> bool {
    required.is_subset(existing)
}

/// Whether a key keyword matches any installed packager string.
///
/// Matching is substring containment, so `"Fedora"` matches
/// `"Fedora (40) <fedora-40-primary@fedoraproject.org>"`.
#[must_use]
pub fn keyword_present(keyword: &str, packagers: &IdentifierSet) -> bool {
    packagers.iter().any(|packager| packager.contains(keyword))
}

/// Keywords that match none of the installed packager strings.
///
/// ```
/// use shaper::delta::missing_keys;
/// use shaper::inventory::lines_to_set;
///
/// let packagers = lines_to_set("Fedora (40) <fedora-40-primary@fedoraproject.org>");
/// let missing = missing_keys(["Fedora", "RPM Fusion"], &packagers);
/// assert_eq!(missing, lines_to_set("RPM Fusion"));
/// ```
#[must_use]
pub fn missing_keys<'a>(
    keywords: impl IntoIterator<Item = &'a str>,
    packagers: &IdentifierSet,
) -> IdentifierSet {
    keywords
        .into_iter()
        .filter(|keyword| !keyword_present(keyword, packagers))
        .map(str::to_string)
        .collect()
}
