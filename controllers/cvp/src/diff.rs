//! Configlet diff engine
//!
//! Works on configlet *names*: which to attach and which to detach so the
//! attached list matches the declaration. Content differences are shown as a
//! unified text diff.

use cvp_state::ApplyMode;
use serde::Serialize;
use std::collections::HashSet;

/// Attach and detach plan for one device or container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigletDiff {
    /// Declared but not attached, in declaration order
    pub to_add: Vec<String>,
    /// Attached but not declared, in attachment order (strict mode only)
    pub to_remove: Vec<String>,
    /// Declared and attached
    pub unchanged: Vec<String>,
}

impl ConfigletDiff {
    /// True when nothing has to be attached or detached
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Attached list once the diff is applied: current minus removals, then additions
    pub fn resulting(&self, current: &[String]) -> Vec<String> {
        let mut result = dedup(current.iter().map(String::as_str));
        result.retain(|name| !self.to_remove.contains(name));
        for name in &self.to_add {
            if !result.contains(name) {
                result.push(name.clone());
            }
        }
        result
    }
}

/// Compare declared and attached configlet names
///
/// Duplicates are dropped, first occurrence wins. In loose mode undeclared
/// configlets stay attached; strict mode lists them in `to_remove`.
pub fn diff_configlets(desired: &[String], current: &[String], mode: ApplyMode) -> ConfigletDiff {
    let desired = dedup(desired.iter().map(String::as_str));
    let current = dedup(current.iter().map(String::as_str));

    let current_set: HashSet<String> = current.iter().cloned().collect();
    let desired_set: HashSet<String> = desired.iter().cloned().collect();

    let (unchanged, to_add): (Vec<String>, Vec<String>) = desired
        .into_iter()
        .partition(|name| current_set.contains(name));

    let to_remove = match mode {
        ApplyMode::Strict => current
            .into_iter()
            .filter(|name| !desired_set.contains(name))
            .collect(),
        ApplyMode::Loose => Vec::new(),
    };

    ConfigletDiff {
        to_add,
        to_remove,
        unchanged,
    }
}

/// Unified diff from `current` to `desired`, `None` when they only differ in
/// line endings or trailing whitespace
pub fn config_text_diff(name: &str, current: &str, desired: &str) -> Option<String> {
    let current = normalize(current);
    let desired = normalize(desired);
    if current == desired {
        return None;
    }

    let diff = similar::TextDiff::from_lines(&current, &desired);
    Some(
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("{} (cvp)", name), &format!("{} (desired)", name))
            .to_string(),
    )
}

fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn dedup<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|n| seen.insert(*n))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_loose_only_adds() {
        let diff = diff_configlets(
            &names(&["base", "mlag", "bgp"]),
            &names(&["base", "legacy"]),
            ApplyMode::Loose,
        );

        assert_eq!(diff.to_add, names(&["mlag", "bgp"]));
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.unchanged, names(&["base"]));
        assert_eq!(diff.resulting(&names(&["base", "legacy"])), names(&["base", "legacy", "mlag", "bgp"]));
    }

    #[test]
    fn test_strict_removes_undeclared() {
        let current = names(&["legacy", "base", "old-ntp"]);
        let diff = diff_configlets(&names(&["base", "ntp"]), &current, ApplyMode::Strict);

        assert_eq!(diff.to_add, names(&["ntp"]));
        assert_eq!(diff.to_remove, names(&["legacy", "old-ntp"]));
        assert_eq!(diff.resulting(&current), names(&["base", "ntp"]));
    }

    #[test]
    fn test_in_sync_is_empty() {
        let diff = diff_configlets(&names(&["a", "b"]), &names(&["b", "a"]), ApplyMode::Strict);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, names(&["a", "b"]));
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let diff = diff_configlets(&names(&["a", "a", "b"]), &names(&["c", "c"]), ApplyMode::Strict);
        assert_eq!(diff.to_add, names(&["a", "b"]));
        assert_eq!(diff.to_remove, names(&["c"]));
    }

    #[test]
    fn test_text_diff_ignores_whitespace_noise() {
        assert!(config_text_diff("base", "hostname a\r\nntp server 1.1.1.1  \n", "hostname a\nntp server 1.1.1.1\n\n").is_none());

        let diff = config_text_diff("base", "hostname a\n", "hostname b\n").unwrap();
        assert!(diff.contains("--- base (cvp)"));
        assert!(diff.contains("-hostname a"));
        assert!(diff.contains("+hostname b"));
    }
}
