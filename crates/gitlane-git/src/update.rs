//! Bring every branch that is behind its upstream up to date, stashing local
//! edits if they block a checkout or pull and restoring them afterwards.

use std::ffi::OsStr;
use std::path::Path;

use gitlane_core::types::ActionOutcome;
use tracing::{info, warn};

use crate::command::{GitCli, GitOutput};
use crate::error::GitError;
use crate::repo::RepoHandle;

const NOTHING_TO_STASH: &str = "No local changes to save";

/// One line of `git branch -vv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerboseBranch {
    pub name: String,
    pub is_current: bool,
    pub behind: bool,
}

/// Parses `git branch -vv`. Detached-HEAD lines are reported as current with
/// an empty name so the caller can tell a branch was checked out at all.
pub fn parse_branch_verbose(raw: &str) -> Vec<VerboseBranch> {
    raw.lines()
        .filter_map(|line| {
            if line.trim().is_empty() {
                return None;
            }
            let is_current = line.starts_with('*');
            // `+` marks a branch checked out in another worktree.
            let rest = line.get(2..).unwrap_or_default().trim_start();
            if rest.starts_with('(') {
                return Some(VerboseBranch {
                    name: String::new(),
                    is_current,
                    behind: false,
                });
            }
            let name = rest.split_whitespace().next()?;
            let after_name = rest[name.len()..].trim_start();
            let hash = after_name.split_whitespace().next()?;
            let tail = after_name[hash.len()..].trim_start();
            let behind = tail
                .strip_prefix('[')
                .and_then(|inner| inner.split_once(']'))
                .is_some_and(|(tracking, _)| tracking.contains("behind "));
            Some(VerboseBranch {
                name: name.to_string(),
                is_current,
                behind,
            })
        })
        .collect()
}

struct Updater<'a, P> {
    git: &'a GitCli,
    root: &'a Path,
    progress: P,
    stashed: bool,
}

impl<P> Updater<'_, P>
where
    P: FnMut(u8, &str),
{
    fn run<I, S>(&self, args: I) -> Result<GitOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.git.run_lossy(self.root, args)
    }

    /// Runs `args`; if local edits block it, stashes them once and retries.
    fn run_with_autostash(&mut self, args: &[&str]) -> Result<(), GitError> {
        let err = match self.run(args) {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_local_changes_conflict() || self.stashed {
            return Err(err);
        }

        (self.progress)(55, "Conflict detected, stashing...");
        let stash = self.run(["stash"])?;
        if stash.stdout.contains(NOTHING_TO_STASH) {
            return Err(err);
        }
        self.stashed = true;
        info!(repo = %self.root.display(), "stashed local changes");
        self.run(args).map(|_| ())
    }

    fn update(&mut self) -> Result<(), GitError> {
        (self.progress)(10, "Fetching...");
        self.run(["fetch", "--all"])?;

        (self.progress)(30, "Checking branches...");
        let branches = parse_branch_verbose(&self.run(["branch", "-vv"])?.stdout);
        let current = branches.iter().find(|branch| branch.is_current).cloned();

        (self.progress)(50, "Checking for updates...");
        let behind = branches
            .iter()
            .filter(|branch| branch.behind && !branch.is_current && !branch.name.is_empty())
            .map(|branch| branch.name.clone())
            .collect::<Vec<_>>();

        let return_to = match &current {
            Some(branch) if !branch.name.is_empty() => branch.name.clone(),
            _ => self.run(["rev-parse", "HEAD"])?.stdout.trim().to_string(),
        };

        for name in &behind {
            (self.progress)(70, &format!("Updating {name}..."));
            self.run_with_autostash(&["checkout", name.as_str()])?;
            self.run_with_autostash(&["pull"])?;
        }
        if !behind.is_empty() {
            self.run_with_autostash(&["checkout", return_to.as_str()])?;
        }

        if let Some(current) = current.filter(|branch| branch.behind) {
            (self.progress)(90, &format!("Updating {}...", current.name));
            self.run_with_autostash(&["pull"])?;
        }

        if self.stashed {
            (self.progress)(95, "Restoring changes...");
            self.run(["stash", "pop"])?;
            self.stashed = false;
        }

        (self.progress)(100, "Finished");
        Ok(())
    }
}

/// Fetches all remotes and pulls every local branch that is behind its
/// upstream, then returns to the branch that was checked out. If a stash was
/// made along the way it is popped on success and on failure.
pub fn update_repo<P>(repo: &RepoHandle, git: &GitCli, progress: P) -> ActionOutcome
where
    P: FnMut(u8, &str),
{
    let mut updater = Updater {
        git,
        root: &repo.root,
        progress,
        stashed: false,
    };

    match updater.update() {
        Ok(()) => ActionOutcome::ok(),
        Err(err) => {
            if updater.stashed {
                if let Err(pop_err) = updater.run(["stash", "pop"]) {
                    warn!(
                        repo = %repo.root.display(),
                        error = %pop_err,
                        "could not restore stashed changes after failed update"
                    );
                }
            }
            warn!(repo = %repo.root.display(), error = %err, "update failed");
            ActionOutcome::failure(err.user_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{parse_branch_verbose, update_repo, VerboseBranch};
    use crate::command::GitCli;
    use crate::repo::discover_repo;
    use crate::stash::list_stashes;
    use crate::test_support::{commit_file, init_repo, run_git, unique_temp_dir};

    fn verbose(name: &str, is_current: bool, behind: bool) -> VerboseBranch {
        VerboseBranch {
            name: name.to_string(),
            is_current,
            behind,
        }
    }

    #[test]
    fn branch_verbose_lines_report_behind_tracking() {
        let raw = "\
* main       1111111 [origin/main: behind 2] subject mentions behind things
  dev        2222222 [origin/dev: ahead 1, behind 3] work
  local-only 3333333 no upstream but behind in subject
+ wt-branch  4444444 [origin/wt-branch] checked out elsewhere
";
        assert_eq!(
            parse_branch_verbose(raw),
            vec![
                verbose("main", true, true),
                verbose("dev", false, true),
                verbose("local-only", false, false),
                verbose("wt-branch", false, false),
            ]
        );
    }

    #[test]
    fn detached_head_is_current_without_a_name() {
        let raw = "* (HEAD detached at 1111111) 1111111 subject\n  main 2222222 [origin/main] x\n";
        let branches = parse_branch_verbose(raw);
        assert_eq!(branches[0], verbose("", true, false));
        assert_eq!(branches[1], verbose("main", false, false));
    }

    fn ten_lines() -> String {
        (1..=10).map(|n| format!("line {n}\n")).collect()
    }

    fn clone_of(upstream: &Path) -> (PathBuf, PathBuf) {
        let parent = unique_temp_dir("update-clone");
        let clone = parent.join("clone");
        run_git(
            &parent,
            &["clone", upstream.to_str().expect("utf-8 path"), "clone"],
        );
        run_git(&clone, &["config", "user.name", "Test User"]);
        run_git(&clone, &["config", "user.email", "test@example.com"]);
        (parent, clone)
    }

    #[test]
    fn update_pulls_behind_branches_and_restores_stashed_edits() {
        let upstream = init_repo("update-upstream");
        commit_file(&upstream, "a.txt", &ten_lines(), "base");
        run_git(&upstream, &["branch", "dev"]);
        let (parent, clone) = clone_of(&upstream);
        run_git(&clone, &["branch", "--track", "dev", "origin/dev"]);

        let upstream_main = ten_lines().replacen("line 1\n", "line one\n", 1);
        commit_file(&upstream, "a.txt", &upstream_main, "upstream main");
        run_git(&upstream, &["checkout", "dev"]);
        let dev_head = commit_file(&upstream, "dev.txt", "dev\n", "upstream dev");
        run_git(&upstream, &["checkout", "main"]);

        let local_edit = ten_lines().replacen("line 10\n", "line ten\n", 1);
        fs::write(clone.join("a.txt"), &local_edit).expect("local edit");

        let git = GitCli::default();
        let repo = discover_repo(&clone, &git).expect("discover clone");
        let mut steps = Vec::new();
        let outcome = update_repo(&repo, &git, |percent, message| {
            steps.push((percent, message.to_string()));
        });
        assert!(outcome.success, "{outcome:?}");

        let percents = steps.iter().map(|(p, _)| *p).collect::<Vec<_>>();
        assert_eq!(percents.first(), Some(&10));
        assert_eq!(percents.last(), Some(&100));
        assert!(steps.iter().any(|(p, m)| *p == 70 && m == "Updating dev..."));
        assert!(steps.iter().any(|(p, m)| *p == 90 && m == "Updating main..."));
        assert!(percents.contains(&55));
        assert!(percents.contains(&95));

        let contents = fs::read_to_string(clone.join("a.txt")).expect("read");
        assert!(contents.starts_with("line one\n"));
        assert!(contents.ends_with("line ten\n"));
        assert!(list_stashes(&repo, &git).is_empty());

        let branch = run_git(&clone, &["rev-parse", "--abbrev-ref", "HEAD"]);
        assert_eq!(branch.trim(), "main");
        let dev = run_git(&clone, &["rev-parse", "dev"]);
        assert_eq!(dev.trim(), dev_head);

        let _ = fs::remove_dir_all(&upstream);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn update_without_remote_changes_only_reports_progress() {
        let upstream = init_repo("update-noop-upstream");
        commit_file(&upstream, "a.txt", "a\n", "base");
        let (parent, clone) = clone_of(&upstream);

        let git = GitCli::default();
        let repo = discover_repo(&clone, &git).expect("discover clone");
        let mut percents = Vec::new();
        let outcome = update_repo(&repo, &git, |percent, _| percents.push(percent));

        assert!(outcome.success, "{outcome:?}");
        assert_eq!(percents, vec![10, 30, 50, 100]);

        let _ = fs::remove_dir_all(&upstream);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn failed_fetch_reports_git_error_text() {
        let root = init_repo("update-bad-remote");
        commit_file(&root, "a.txt", "a\n", "base");
        run_git(
            &root,
            &["remote", "add", "origin", "/definitely/missing/remote.git"],
        );

        let git = GitCli::default();
        let repo = discover_repo(&root, &git).expect("discover repo");
        let outcome = update_repo(&repo, &git, |_, _| {});

        assert!(!outcome.success);
        assert!(outcome.error.is_some_and(|e| !e.is_empty()));

        let _ = fs::remove_dir_all(&root);
    }
}
