use std::fs;
use std::path::{Path, PathBuf};

use gitlane_core::types::RepoInfo;
use tracing::debug;

use crate::command::GitCli;
use crate::error::GitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub root: PathBuf,
    pub git_dir: PathBuf,
}

pub fn discover_repo(start_path: &Path, git: &GitCli) -> Result<RepoHandle, GitError> {
    let inside = match git.run(start_path, ["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => output.stdout.trim().eq("true"),
        Err(GitError::CommandFailed { .. }) => false,
        Err(err) => return Err(err),
    };

    if !inside {
        return Err(GitError::NotARepository {
            path: start_path.to_path_buf(),
        });
    }

    let root_raw = git.run(start_path, ["rev-parse", "--show-toplevel"])?;
    let root = PathBuf::from(root_raw.stdout.trim());

    let git_dir_raw = git.run(&root, ["rev-parse", "--git-dir"])?;
    let git_dir_rel = PathBuf::from(git_dir_raw.stdout.trim());
    let git_dir = if git_dir_rel.is_absolute() {
        git_dir_rel
    } else {
        root.join(git_dir_rel)
    };

    Ok(RepoHandle { root, git_dir })
}

pub fn current_branch(repo: &RepoHandle, git: &GitCli) -> Result<String, GitError> {
    let output = git.run(&repo.root, ["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.stdout.trim().to_string())
}

pub fn head_sha(repo: &RepoHandle, git: &GitCli) -> Result<String, GitError> {
    let output = git.run(&repo.root, ["rev-parse", "HEAD"])?;
    Ok(output.stdout.trim().to_string())
}

/// Check if the worktree has uncommitted changes (staged, unstaged or untracked).
pub fn has_uncommitted_changes(repo: &RepoHandle, git: &GitCli) -> Result<bool, GitError> {
    let output = git.run(&repo.root, ["status", "--porcelain"])?;
    Ok(!output.stdout.trim().is_empty())
}

/// Summary used by repository lists. Every part degrades to its default on
/// failure; a branch without upstream reports zero ahead/behind.
pub fn repo_info(repo: &RepoHandle, git: &GitCli) -> RepoInfo {
    let branch = git
        .run_silent(&repo.root, ["rev-parse", "--abbrev-ref", "HEAD"])
        .trim()
        .to_string();
    let status = git.run_silent(&repo.root, ["status", "--porcelain"]);
    let changed_files = status.lines().filter(|line| !line.trim().is_empty()).count();
    let counts = git.run_silent(
        &repo.root,
        ["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
    );
    let (ahead, behind) = parse_ahead_behind(&counts);

    RepoInfo {
        branch,
        dirty: changed_files > 0,
        changed_files,
        ahead,
        behind,
    }
}

/// Default depth for [`find_repositories`].
pub const DEFAULT_SCAN_DEPTH: usize = 3;

/// Directories under `search_root` (inclusive, at most `max_depth` levels
/// down) that contain a `.git` entry. A repository's own subdirectories are
/// not searched. Unreadable directories are skipped.
pub fn find_repositories(search_root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk_for_repositories(search_root, 0, max_depth, &mut found);
    found
}

fn walk_for_repositories(dir: &Path, depth: usize, max_depth: usize, found: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    if dir.join(".git").exists() {
        found.push(dir.to_path_buf());
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };
    let mut children = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    children.sort();
    for child in children {
        walk_for_repositories(&child, depth + 1, max_depth, found);
    }
}

fn parse_ahead_behind(raw: &str) -> (u32, u32) {
    let mut parts = raw.split_whitespace();
    let ahead = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let behind = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    (ahead, behind)
}
