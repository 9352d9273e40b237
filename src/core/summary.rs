#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::core::git::Git;
use crate::core::registry;
use crate::error::MgitError;

/// Hard cap on simultaneous status workers. Queries are read-only and cheap,
/// so this sits higher than the dispatcher's process cap.
pub const MAX_PARALLEL: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepoState {
    Clean,
    Dirty,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SyncCounts {
    pub ahead: u32,
    pub behind: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub name: String,
    #[serde(skip)]
    pub highlights: BTreeSet<usize>,
    pub path: String,
    pub branch: String,
    pub state: RepoState,
    /// `None` when the branch has no same-named remote counterpart (or the
    /// comparison failed); the sync column is simply omitted then.
    pub sync: Option<SyncCounts>,
}

/// Computes one summary row per target, `MAX_PARALLEL.min(n)` at a time, and
/// returns them in the order the targets were given (registry order for a
/// snapshotted target set) regardless of which worker finished first.
pub async fn summarize(
    targets: Vec<(PathBuf, BTreeSet<usize>)>,
) -> anyhow::Result<Vec<SummaryRow>> {
    let cap = MAX_PARALLEL.min(targets.len()).max(1);
    let sem = Arc::new(Semaphore::new(cap));

    let mut handles = Vec::with_capacity(targets.len());
    for (path, highlights) in &targets {
        let permit = sem.clone().acquire_owned().await.map_err(|_| {
            anyhow::anyhow!("failed to acquire summary semaphore")
        })?;
        let path = path.clone();
        let highlights = highlights.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            summarize_one_blocking(&path, highlights)
        }));
    }

    let mut rows = Vec::with_capacity(targets.len());
    for (h, (path, highlights)) in handles.into_iter().zip(targets) {
        match h.await {
            Ok(row) => rows.push(row),
            // A panicked worker degrades to an error row like any other
            // per-repository failure.
            Err(_) => rows.push(error_row(&path, highlights)),
        }
    }

    Ok(rows)
}

fn summarize_one_blocking(path: &Path, highlights: BTreeSet<usize>) -> SummaryRow {
    match query_repo(path) {
        Ok((branch, dirty, sync)) => SummaryRow {
            name: registry::display_name(path),
            highlights,
            path: path.display().to_string(),
            branch,
            state: if dirty { RepoState::Dirty } else { RepoState::Clean },
            sync,
        },
        Err(_) => error_row(path, highlights),
    }
}

fn query_repo(path: &Path) -> Result<(String, bool, Option<SyncCounts>), MgitError> {
    let git = Git::new(path.to_path_buf());

    let porcelain = git.run(&["status", "--porcelain"])?;
    let dirty = !porcelain.is_empty();

    let branch = git.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;

    // Comparison against the same-named remote branch; absence of the remote
    // branch is expected and only drops the sync column.
    let sync = git
        .run(&[
            "rev-list",
            "--left-right",
            "--count",
            &format!("{branch}...origin/{branch}"),
        ])
        .ok()
        .and_then(|out| parse_left_right(&out));

    Ok((branch, dirty, sync))
}

fn parse_left_right(out: &str) -> Option<SyncCounts> {
    let mut parts = out.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some(SyncCounts { ahead, behind })
}

fn error_row(path: &Path, highlights: BTreeSet<usize>) -> SummaryRow {
    SummaryRow {
        name: registry::display_name(path),
        highlights,
        path: path.display().to_string(),
        branch: "Unknown".to_owned(),
        state: RepoState::Error,
        sync: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_left_right_counts() {
        assert_eq!(
            parse_left_right("2\t5"),
            Some(SyncCounts { ahead: 2, behind: 5 })
        );
        assert_eq!(
            parse_left_right("0 0"),
            Some(SyncCounts { ahead: 0, behind: 0 })
        );
        assert_eq!(parse_left_right(""), None);
        assert_eq!(parse_left_right("x y"), None);
    }

    #[tokio::test]
    async fn unreadable_repos_become_error_rows_in_input_order() {
        let targets: Vec<(PathBuf, BTreeSet<usize>)> = (0..5)
            .map(|i| (PathBuf::from(format!("/no/such/repo{i}")), BTreeSet::new()))
            .collect();

        let rows = summarize(targets).await.unwrap();
        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.name, format!("repo{i}"));
            assert_eq!(row.branch, "Unknown");
            assert_eq!(row.state, RepoState::Error);
            assert_eq!(row.sync, None);
        }
    }

    #[tokio::test]
    async fn empty_target_list_yields_no_rows() {
        let rows = summarize(Vec::new()).await.unwrap();
        assert!(rows.is_empty());
    }
}
