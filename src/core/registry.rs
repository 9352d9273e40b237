#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::core::git;
use crate::error::MgitError;

/// Ordered collection of registered repository paths.
///
/// Paths are unique and absolute; insertion order is preserved and supplies
/// the indices shown by `repo-list` and accepted by selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    paths: Vec<PathBuf>,
}

impl Registry {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Loads the registry from its JSON file. A missing file is an empty
    /// registry; an unreadable or corrupt file is an error the caller is
    /// expected to downgrade to a warning plus an empty registry.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let paths: Vec<PathBuf> = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self { paths })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&self.paths)?;
        std::fs::write(&tmp, &data)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }

    /// Registers an absolute path. Rejects non-repositories and duplicates.
    pub fn add(&mut self, path: PathBuf) -> Result<(), MgitError> {
        if !git::is_git_repo(&path) {
            return Err(MgitError::NotAGitRepo(path));
        }
        if self.paths.contains(&path) {
            return Err(MgitError::AlreadyRegistered(path));
        }
        self.paths.push(path);
        Ok(())
    }

    /// Removes by 0-based index or by path, returning the removed entry.
    pub fn remove(&mut self, target: &str, resolved_path: Option<&Path>) -> Result<PathBuf, MgitError> {
        if let Ok(idx) = target.trim().parse::<usize>() {
            if idx < self.paths.len() {
                return Ok(self.paths.remove(idx));
            }
            return Err(MgitError::RepoNotFound(target.to_owned()));
        }
        if let Some(wanted) = resolved_path
            && let Some(pos) = self.paths.iter().position(|p| p == wanted)
        {
            return Ok(self.paths.remove(pos));
        }
        Err(MgitError::RepoNotFound(target.to_owned()))
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&PathBuf> {
        self.paths.get(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Name a repository is matched and displayed by: the basename of its path.
#[must_use]
pub fn display_name(path: &Path) -> String {
    match path.file_name().and_then(|s| s.to_str()) {
        Some(name) => name.to_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_dir(root: &Path, name: &str) -> PathBuf {
        let p = root.join(name);
        std::fs::create_dir_all(p.join(".git")).expect("mkdir");
        p
    }

    #[test]
    fn save_and_load_roundtrip_preserves_order() {
        let td = tempfile::tempdir().expect("tempdir");
        let a = git_dir(td.path(), "alpha");
        let b = git_dir(td.path(), "beta");

        let mut reg = Registry::default();
        reg.add(b.clone()).unwrap();
        reg.add(a.clone()).unwrap();

        let file = td.path().join("state").join("registry.json");
        reg.save(&file).unwrap();

        let loaded = Registry::load(&file).unwrap();
        assert_eq!(loaded.paths(), &[b, a]);
    }

    #[test]
    fn missing_file_loads_empty() {
        let td = tempfile::tempdir().expect("tempdir");
        let reg = Registry::load(&td.path().join("nope.json")).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let td = tempfile::tempdir().expect("tempdir");
        let file = td.path().join("registry.json");
        std::fs::write(&file, b"not json").unwrap();
        assert!(Registry::load(&file).is_err());
    }

    #[test]
    fn add_rejects_duplicates_and_non_repos() {
        let td = tempfile::tempdir().expect("tempdir");
        let repo = git_dir(td.path(), "repo");
        let plain = td.path().join("plain");
        std::fs::create_dir_all(&plain).unwrap();

        let mut reg = Registry::default();
        reg.add(repo.clone()).unwrap();
        assert!(matches!(
            reg.add(repo.clone()),
            Err(MgitError::AlreadyRegistered(_))
        ));
        assert!(matches!(reg.add(plain), Err(MgitError::NotAGitRepo(_))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_by_index_and_by_path() {
        let td = tempfile::tempdir().expect("tempdir");
        let a = git_dir(td.path(), "alpha");
        let b = git_dir(td.path(), "beta");

        let mut reg = Registry::default();
        reg.add(a.clone()).unwrap();
        reg.add(b.clone()).unwrap();

        let removed = reg.remove("0", None).unwrap();
        assert_eq!(removed, a);

        let removed = reg.remove("beta", Some(&b)).unwrap();
        assert_eq!(removed, b);
        assert!(reg.is_empty());

        assert!(matches!(
            reg.remove("5", None),
            Err(MgitError::RepoNotFound(_))
        ));
    }

    #[test]
    fn display_name_is_basename() {
        assert_eq!(display_name(Path::new("/home/me/work/repo1")), "repo1");
    }
}
