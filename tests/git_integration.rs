//! Integration tests against real repositories created with tempfile.
//!
//! Skipped silently when no git binary is on PATH.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use gitter_access::git::cache::Entity;
use gitter_access::git::{AccessConfig, GitContext, GitRepository};
use gitter_access::models::{DiffStatus, TagType};
use gitter_access::GitError;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A repository with one commit on README.md.
struct TestRepo {
    dir: TempDir,
    context: Arc<GitContext>,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        run_git(dir.path(), &["config", "tag.gpgsign", "false"]);

        let repo = Self {
            dir,
            context: GitContext::new(AccessConfig::default()),
        };
        repo.commit_file("README.md", "# Test\n", "Initial commit");
        repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn open(&self) -> GitRepository {
        GitRepository::open(self.path(), self.context.clone()).expect("failed to open test repo")
    }

    fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        std::fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-q", "-m", message]);
        run_git(self.path(), &["rev-parse", "HEAD"])
    }
}

#[test]
fn opening_a_plain_directory_fails() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let context = GitContext::new(AccessConfig::default());
    let missing = dir.path().join("missing");
    assert!(matches!(
        GitRepository::open(&missing, context.clone()),
        Err(GitError::RepoNotFound(_))
    ));
    assert!(!GitRepository::is_valid(&missing, &context));
}

#[test]
fn detects_supported_git_version() {
    if !git_available() {
        return;
    }
    let context = GitContext::new(AccessConfig::default());
    let version = context.ensure_supported().unwrap();
    assert_eq!(context.version().unwrap(), version);
}

#[test]
fn config_set_list_and_unset() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let repo = test_repo.open();

    let answer = repo.set_config("gitter.answer", "42").unwrap();
    assert_eq!(answer.value().unwrap(), "42");

    let listed = repo.config().unwrap();
    let found = listed
        .iter()
        .find(|p| p.name() == "gitter.answer")
        .expect("parameter listed");
    assert!(Arc::ptr_eq(found, &answer));
    assert!(listed.iter().any(|p| p.name() == "user.name"));

    let reread = repo.config_parameter("gitter.answer").unwrap().unwrap();
    assert!(Arc::ptr_eq(&reread, &answer));

    repo.unset_config("gitter.answer").unwrap();
    assert!(matches!(answer.value(), Err(GitError::Deleted { .. })));
    assert!(repo.config_parameter("gitter.answer").unwrap().is_none());

    let err = repo.unset_config("gitter.answer").unwrap_err();
    assert!(matches!(err, GitError::ConfigParameterDoesNotExist { .. }));
}

#[test]
fn config_values_with_newlines_survive_listing() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let repo = test_repo.open();
    repo.set_config("gitter.multi", "first\nsecond").unwrap();

    let listed = repo.config().unwrap();
    let multi = listed.iter().find(|p| p.name() == "gitter.multi").unwrap();
    assert_eq!(multi.value().unwrap(), "first\nsecond");
}

#[test]
fn config_sections_rename_and_remove() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let repo = test_repo.open();
    let old = repo.set_config("alpha.key", "v").unwrap();

    repo.rename_config_section("alpha", "beta").unwrap();
    assert!(old.is_deleted());
    let renamed = repo.config_parameter("beta.key").unwrap().unwrap();
    assert_eq!(renamed.value().unwrap(), "v");

    repo.remove_config_section("beta").unwrap();
    assert!(renamed.is_deleted());
}

#[test]
fn tags_resolve_to_commits() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let head = run_git(test_repo.path(), &["rev-parse", "HEAD"]);
    run_git(test_repo.path(), &["tag", "light"]);
    run_git(test_repo.path(), &["tag", "-a", "heavy", "-m", "annotated"]);

    let repo = test_repo.open();
    let tags = repo.tags().unwrap();
    assert_eq!(tags.len(), 2);

    let heavy = repo.tag("heavy").unwrap();
    assert_eq!(heavy.tag_type().unwrap(), TagType::Annotated);
    assert_eq!(heavy.target().unwrap().hash(), head);
    let light = repo.tag("light").unwrap();
    assert_eq!(light.tag_type().unwrap(), TagType::Lightweight);

    // Both tags share the single revision entity for HEAD.
    assert!(Arc::ptr_eq(&heavy.target().unwrap(), &light.target().unwrap()));

    run_git(test_repo.path(), &["tag", "-d", "light"]);
    assert_eq!(repo.tags().unwrap().len(), 1);
    assert!(light.is_deleted());
}

#[test]
fn empty_tag_listing_is_not_an_error() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    assert!(test_repo.open().tags().unwrap().is_empty());
}

#[test]
fn history_links_parents() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let first = run_git(test_repo.path(), &["rev-parse", "HEAD"]);
    let second = test_repo.commit_file("a.txt", "a\n", "Add a");

    let repo = test_repo.open();
    let revisions = repo.get_revisions("HEAD", 10).unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0].hash(), second);
    assert_eq!(revisions[0].info().unwrap().unwrap().subject, "Add a");

    let parents = revisions[0].parents().unwrap();
    assert_eq!(parents.len(), 1);
    assert!(Arc::ptr_eq(&parents[0], &revisions[1]));
    assert_eq!(revisions[1].hash(), first);

    assert!(repo.get_revision("does-not-exist").unwrap().is_none());
    let by_hash = repo.revision_by_hash(&first).unwrap();
    assert!(Arc::ptr_eq(&by_hash, &revisions[1]));
}

#[test]
fn diffs_revisions_and_working_tree() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let second = test_repo.commit_file("README.md", "# Test\nmore\n", "Extend readme");

    let repo = test_repo.open();
    let diff = repo.get_diff(None, &second, None).unwrap();
    let file = diff.file("README.md").unwrap();
    assert_eq!(file.status, DiffStatus::Modified);
    assert_eq!(file.stats().insertions, 1);

    std::fs::write(test_repo.path().join("new.txt"), "x\n").unwrap();
    run_git(test_repo.path(), &["add", "new.txt"]);
    let staged = repo.get_working_tree_diff(true, None).unwrap();
    assert_eq!(staged.file("new.txt").unwrap().status, DiffStatus::Added);
    assert!(repo.get_working_tree_diff(false, None).unwrap().is_empty());
}

#[test]
fn non_ascii_paths_are_decoded_in_diffs() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    test_repo.commit_file("café.txt", "one\n", "Add café");
    std::fs::write(test_repo.path().join("café.txt"), "two\n").unwrap();

    let repo = test_repo.open();
    let diff = repo.get_working_tree_diff(false, None).unwrap();
    let file = diff.file("café.txt").unwrap();
    assert_eq!(file.status, DiffStatus::Modified);
    assert_eq!(file.source_file.as_deref(), Some("café.txt"));
}

#[test]
fn option_like_revisions_never_reach_git() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let outside = TempDir::new().unwrap();
    let target = outside.path().join("written");
    let injected = format!("--output={}", target.display());

    let repo = test_repo.open();
    assert!(matches!(
        repo.get_revisions(&injected, 5),
        Err(GitError::InvalidArgument(_))
    ));
    assert!(matches!(
        repo.get_revision(&injected),
        Err(GitError::InvalidArgument(_))
    ));
    assert!(matches!(
        repo.get_diff(Some(&injected), "HEAD", None),
        Err(GitError::InvalidArgument(_))
    ));
    assert!(!target.exists());
}

#[test]
fn repository_info_and_close() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let repo = test_repo.open();
    let info = repo.info().unwrap();
    assert!(!info.is_bare);
    assert!(info.head_branch.is_some());
    assert_eq!(info.head_commit.unwrap().message, "Initial commit");

    let head = repo.get_revision("HEAD").unwrap().unwrap();
    repo.close().unwrap();
    assert!(matches!(head.parents(), Err(GitError::Deleted { .. })));
}

#[test]
fn submodules_come_from_gitmodules() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    let repo = test_repo.open();
    assert!(repo.submodules().unwrap().is_empty());

    std::fs::write(
        test_repo.path().join(".gitmodules"),
        "[submodule \"vendor/lib\"]\n\tpath = vendor/lib\n\turl = https://example.com/lib.git\n",
    )
    .unwrap();
    let submodules = repo.submodules().unwrap();
    assert_eq!(submodules.len(), 1);
    assert_eq!(submodules[0].name(), "vendor/lib");
    assert_eq!(
        submodules[0].url().unwrap().as_deref(),
        Some("https://example.com/lib.git")
    );
}

#[test]
fn remotes_merge_fetch_and_push_urls() {
    if !git_available() {
        return;
    }
    let test_repo = TestRepo::new();
    run_git(
        test_repo.path(),
        &["remote", "add", "origin", "https://example.com/a.git"],
    );
    run_git(
        test_repo.path(),
        &["remote", "set-url", "--push", "origin", "ssh://example.com/a.git"],
    );

    let remotes = test_repo.open().remotes().unwrap();
    assert_eq!(remotes.len(), 1);
    assert_eq!(
        remotes[0].fetch_url().unwrap().as_deref(),
        Some("https://example.com/a.git")
    );
    assert_eq!(
        remotes[0].push_url().unwrap().as_deref(),
        Some("ssh://example.com/a.git")
    );
}
