#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::fuzzy;
use crate::core::registry::{self, Registry};

/// Resolved batch targets: repository path -> highlight char offsets into the
/// display name. Highlight sets accumulate across selector tokens; a
/// repository matched twice keeps the union of both position sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    entries: BTreeMap<PathBuf, BTreeSet<usize>>,
}

impl TargetSet {
    /// Every registry repository, nothing highlighted.
    #[must_use]
    pub fn all(registry: &Registry) -> Self {
        let entries = registry
            .paths()
            .iter()
            .map(|p| (p.clone(), BTreeSet::new()))
            .collect();
        Self { entries }
    }

    pub fn merge(&mut self, path: &Path, positions: BTreeSet<usize>) {
        self.entries
            .entry(path.to_path_buf())
            .or_default()
            .extend(positions);
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    #[must_use]
    pub fn highlights(&self, path: &Path) -> Option<&BTreeSet<usize>> {
        self.entries.get(path)
    }

    /// Targets in registry iteration order, the order batch results and
    /// listings are rendered in.
    pub fn ordered<'a>(
        &'a self,
        registry: &'a Registry,
    ) -> impl Iterator<Item = (&'a PathBuf, &'a BTreeSet<usize>)> {
        registry
            .paths()
            .iter()
            .filter_map(|p| self.entries.get_key_value(p))
    }

    /// Snapshot of the targets in registry order, detached from the registry.
    /// Batch operations run against this, so concurrent registry edits cannot
    /// race with an in-flight dispatch.
    #[must_use]
    pub fn snapshot(&self, registry: &Registry) -> Vec<(PathBuf, BTreeSet<usize>)> {
        self.ordered(registry)
            .map(|(p, h)| (p.clone(), h.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub targets: TargetSet,
    /// Non-numeric tokens that matched nothing; advisory, reported by the CLI.
    pub unmatched: Vec<String>,
}

/// Resolves a comma-separated selector against the registry.
///
/// Tokens are trimmed; empty ones are dropped. A token parsing as an integer
/// selects by index (out of range is silently ignored) and never falls
/// through to fuzzy matching. Anything else is fuzzy-matched against every
/// display name, unioning highlight positions into already-selected entries.
#[must_use]
pub fn resolve(selector: Option<&str>, registry: &Registry) -> Resolution {
    let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return Resolution {
            targets: TargetSet::all(registry),
            unmatched: Vec::new(),
        };
    };

    let mut targets = TargetSet::default();
    let mut unmatched = Vec::new();

    for token in selector.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Ok(idx) = token.parse::<i64>() {
            if let Ok(idx) = usize::try_from(idx)
                && let Some(path) = registry.get(idx)
            {
                targets.merge(path, BTreeSet::new());
            }
            continue;
        }

        let mut matched = false;
        for path in registry.paths() {
            let name = registry::display_name(path);
            if let Some(positions) = fuzzy::subsequence_match(token, &name) {
                matched = true;
                targets.merge(path, positions);
            }
        }
        if !matched {
            unmatched.push(token.to_owned());
        }
    }

    Resolution { targets, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(vec![
            PathBuf::from("/work/repo1"),
            PathBuf::from("/work/repo2"),
            PathBuf::from("/work/web-client"),
        ])
    }

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn empty_selector_selects_everything_unhighlighted() {
        let reg = registry();
        for sel in [None, Some(""), Some("  ")] {
            let res = resolve(sel, &reg);
            assert_eq!(res.targets.len(), 3);
            for path in reg.paths() {
                assert_eq!(res.targets.highlights(path), Some(&BTreeSet::new()));
            }
            assert!(res.unmatched.is_empty());
        }
    }

    #[test]
    fn numeric_token_selects_by_index_without_highlights() {
        let reg = registry();
        let res = resolve(Some("0"), &reg);
        assert_eq!(res.targets.len(), 1);
        assert_eq!(
            res.targets.highlights(Path::new("/work/repo1")),
            Some(&BTreeSet::new())
        );
    }

    #[test]
    fn out_of_range_index_is_silently_ignored() {
        let reg = registry();
        let res = resolve(Some("99,-1"), &reg);
        assert!(res.targets.is_empty());
        assert!(res.unmatched.is_empty());
    }

    #[test]
    fn fuzzy_token_selects_all_matches_with_positions() {
        let reg = registry();
        let res = resolve(Some("re1"), &reg);
        assert_eq!(res.targets.len(), 1);
        assert_eq!(
            res.targets.highlights(Path::new("/work/repo1")),
            Some(&set(&[0, 1, 4]))
        );
    }

    #[test]
    fn token_matching_several_repos_selects_each() {
        let reg = registry();
        let res = resolve(Some("repo"), &reg);
        assert_eq!(res.targets.len(), 2);
        assert!(res.targets.contains(Path::new("/work/repo1")));
        assert!(res.targets.contains(Path::new("/work/repo2")));
    }

    #[test]
    fn highlights_union_across_tokens() {
        let reg = registry();
        // "re1" -> {0,1,4}; "po" -> {2,3}; union covers both.
        let res = resolve(Some("re1,po"), &reg);
        assert_eq!(
            res.targets.highlights(Path::new("/work/repo1")),
            Some(&set(&[0, 1, 2, 3, 4]))
        );
    }

    #[test]
    fn numeric_token_never_falls_through_to_fuzzy() {
        // "1" would fuzzy-match repo1's trailing digit; index wins and adds
        // repo2 (index 1) with no highlights instead.
        let reg = registry();
        let res = resolve(Some("1"), &reg);
        assert_eq!(res.targets.len(), 1);
        assert_eq!(
            res.targets.highlights(Path::new("/work/repo2")),
            Some(&BTreeSet::new())
        );
    }

    #[test]
    fn unmatched_tokens_are_reported_without_aborting_the_rest() {
        let reg = registry();
        let res = resolve(Some("zzz,re1"), &reg);
        assert_eq!(res.unmatched, vec!["zzz".to_owned()]);
        assert_eq!(res.targets.len(), 1);
    }

    #[test]
    fn resolution_is_idempotent() {
        let reg = registry();
        let a = resolve(Some("re, 1,web"), &reg);
        let b = resolve(Some("re, 1,web"), &reg);
        assert_eq!(a.targets, b.targets);
    }

    #[test]
    fn ordered_iteration_follows_registry_order() {
        let reg = registry();
        let res = resolve(Some("web,re1"), &reg);
        let order: Vec<&PathBuf> = res.targets.ordered(&reg).map(|(p, _)| p).collect();
        assert_eq!(
            order,
            vec![
                &PathBuf::from("/work/repo1"),
                &PathBuf::from("/work/web-client")
            ]
        );
    }
}
