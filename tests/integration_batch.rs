use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use mgit::core::dispatch::{BatchCommand, Dispatcher};
use mgit::core::registry::Registry;
use mgit::core::select;
use mgit::core::summary::{self, RepoState};
use mgit::output::style::Style;

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn run(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command");
    if !out.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
    }
}

fn make_repo(root: &Path, name: &str) -> PathBuf {
    let repo = root.join(name);
    std::fs::create_dir_all(&repo).expect("mkdir repo");
    run(&repo, &["init"]);
    run(&repo, &["config", "user.email", "test@example.com"]);
    run(&repo, &["config", "user.name", "Test"]);
    std::fs::write(repo.join("README.md"), "hello\n").expect("write");
    run(&repo, &["add", "."]);
    run(&repo, &["commit", "-m", "init"]);
    repo
}

fn current_branch(repo: &Path) -> String {
    let out = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(repo)
        .output()
        .expect("git rev-parse");
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

#[test]
fn registry_selector_roundtrip_with_real_repos() {
    if !git_available() {
        eprintln!("skipping: git not found");
        return;
    }

    let td = tempfile::tempdir().expect("tempdir");
    let repo1 = make_repo(td.path(), "repo1");
    let repo2 = make_repo(td.path(), "repo2");

    let mut reg = Registry::default();
    reg.add(repo1.clone()).expect("add repo1");
    reg.add(repo2.clone()).expect("add repo2");

    let file = td.path().join("registry.json");
    reg.save(&file).expect("save");
    let reg = Registry::load(&file).expect("load");
    assert_eq!(reg.paths(), &[repo1.clone(), repo2]);

    let res = select::resolve(Some("re1"), &reg);
    assert_eq!(res.targets.len(), 1);
    let expected: BTreeSet<usize> = [0, 1, 4].into_iter().collect();
    assert_eq!(res.targets.highlights(&repo1), Some(&expected));
    assert!(res.unmatched.is_empty());
}

#[tokio::test]
async fn dispatcher_runs_git_across_repos() {
    if !git_available() {
        eprintln!("skipping: git not found");
        return;
    }

    let td = tempfile::tempdir().expect("tempdir");
    let repo1 = make_repo(td.path(), "repo1");
    let repo2 = make_repo(td.path(), "repo2");

    let targets = vec![
        (repo1, BTreeSet::new()),
        (repo2, BTreeSet::new()),
    ];

    let writer = Arc::new(Mutex::new(Vec::new()));
    Dispatcher::new(Style::plain())
        .run_with_writer(
            targets,
            BatchCommand::Git(vec!["log".into(), "--oneline".into()]),
            writer.clone(),
        )
        .await
        .expect("dispatch");

    let text = String::from_utf8(writer.lock().unwrap().clone()).unwrap();
    assert_eq!(text.matches("┌── [").count(), 2);
    assert_eq!(text.matches("└──").count(), 2);
    assert!(text.contains("[repo1] in "));
    assert!(text.contains("[repo2] in "));
    assert_eq!(text.matches("init").count(), 2);
}

#[tokio::test]
async fn summary_classifies_and_orders_rows() {
    if !git_available() {
        eprintln!("skipping: git not found");
        return;
    }

    let td = tempfile::tempdir().expect("tempdir");
    let clean = make_repo(td.path(), "clean-repo");
    let dirty = make_repo(td.path(), "dirty-repo");
    std::fs::write(dirty.join("README.md"), "edited\n").expect("write");
    let missing = td.path().join("missing-repo");

    let branch = current_branch(&clean);

    let targets = vec![
        (clean, BTreeSet::new()),
        (missing, BTreeSet::new()),
        (dirty, BTreeSet::new()),
    ];

    let rows = summary::summarize(targets).await.expect("summarize");
    assert_eq!(rows.len(), 3);

    // Rows come back in input (registry) order, not completion order.
    assert_eq!(rows[0].name, "clean-repo");
    assert_eq!(rows[1].name, "missing-repo");
    assert_eq!(rows[2].name, "dirty-repo");

    assert_eq!(rows[0].state, RepoState::Clean);
    assert_eq!(rows[0].branch, branch);
    // No remote configured, so the sync comparison is omitted, not an error.
    assert_eq!(rows[0].sync, None);

    assert_eq!(rows[1].state, RepoState::Error);
    assert_eq!(rows[1].branch, "Unknown");

    assert_eq!(rows[2].state, RepoState::Dirty);
}
