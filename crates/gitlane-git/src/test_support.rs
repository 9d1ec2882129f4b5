use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_NONCE: AtomicU64 = AtomicU64::new(0);

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let nonce = TEMP_NONCE.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("gitlane-git-{prefix}-{now}-{nonce}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

pub(crate) fn run_git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub(crate) fn init_repo(prefix: &str) -> PathBuf {
    let root = unique_temp_dir(prefix);
    run_git(&root, &["init"]);
    // Identity for commits made through GitCli, which adds no `-c` flags.
    run_git(&root, &["config", "user.name", "Test User"]);
    run_git(&root, &["config", "user.email", "test@example.com"]);
    run_git(&root, &["config", "commit.gpgsign", "false"]);
    root
}

pub(crate) fn commit_file(root: &Path, path: &str, contents: &str, message: &str) -> String {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&full, contents).expect("write file");
    run_git(root, &["add", path]);
    run_git(root, &["commit", "-m", message]);
    run_git(root, &["rev-parse", "HEAD"]).trim().to_string()
}
