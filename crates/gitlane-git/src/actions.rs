//! User-triggered mutations. Each returns an [`ActionOutcome`] carrying git's
//! own error text instead of an error value, so a caller can always display
//! something.
//!
//! Calls against one repository are not serialized here; overlapping
//! mutations meet git's own index lock.

use std::ffi::OsStr;
use std::path::PathBuf;

use gitlane_core::types::ActionOutcome;
use tracing::{info, warn};

use crate::command::GitCli;
use crate::repo::RepoHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoActions {
    git: GitCli,
    root: PathBuf,
}

impl RepoActions {
    pub fn new(git: GitCli, root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            root: root.into(),
        }
    }

    pub fn for_repo(git: GitCli, repo: &RepoHandle) -> Self {
        Self::new(git, repo.root.clone())
    }

    pub fn stage(&self, path: &str) -> ActionOutcome {
        self.run(["add", "--", path])
    }

    pub fn unstage(&self, path: &str) -> ActionOutcome {
        self.run(["restore", "--staged", "--", path])
    }

    pub fn stage_all(&self) -> ActionOutcome {
        self.run(["add", "-A"])
    }

    pub fn unstage_all(&self) -> ActionOutcome {
        self.run(["restore", "--staged", "."])
    }

    pub fn commit(&self, message: &str) -> ActionOutcome {
        if message.trim().is_empty() {
            return ActionOutcome::failure("commit message must not be empty");
        }
        self.run(["commit", "-m", message])
    }

    pub fn checkout(&self, branch: &str) -> ActionOutcome {
        if let Some(rejected) = reject_branch_name(branch) {
            return rejected;
        }
        self.run(["checkout", branch])
    }

    /// Creates `name` at `from` (default `HEAD`) and switches to it.
    pub fn create_branch(&self, name: &str, from: Option<&str>) -> ActionOutcome {
        if let Some(rejected) = reject_branch_name(name) {
            return rejected;
        }
        let from = from
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("HEAD");
        self.run(["checkout", "-b", name, from])
    }

    pub fn delete_branch(&self, name: &str, force: bool) -> ActionOutcome {
        if let Some(rejected) = reject_branch_name(name) {
            return rejected;
        }
        let flag = if force { "-D" } else { "-d" };
        self.run(["branch", flag, name])
    }

    pub fn fetch(&self) -> ActionOutcome {
        self.run(["fetch", "--all", "--prune"])
    }

    pub fn pull(&self) -> ActionOutcome {
        self.run(["pull"])
    }

    pub fn push(&self, force: bool) -> ActionOutcome {
        if force {
            self.run(["push", "--force-with-lease"])
        } else {
            self.run(["push"])
        }
    }

    pub fn stash_push(&self, message: Option<&str>) -> ActionOutcome {
        match message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => self.run(["stash", "push", "-m", message]),
            None => self.run(["stash", "push"]),
        }
    }

    pub fn stash_pop(&self, stash_ref: Option<&str>) -> ActionOutcome {
        match stash_ref {
            Some(stash_ref) => self.run(["stash", "pop", stash_ref]),
            None => self.run(["stash", "pop"]),
        }
    }

    pub fn stash_apply(&self, stash_ref: Option<&str>) -> ActionOutcome {
        match stash_ref {
            Some(stash_ref) => self.run(["stash", "apply", stash_ref]),
            None => self.run(["stash", "apply"]),
        }
    }

    pub fn stash_drop(&self, stash_ref: &str) -> ActionOutcome {
        self.run(["stash", "drop", stash_ref])
    }

    pub fn stash_clear(&self) -> ActionOutcome {
        self.run(["stash", "clear"])
    }

    fn run<I, S>(&self, args: I) -> ActionOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match self.git.run_lossy(&self.root, args) {
            Ok(output) => {
                let stdout = output.stdout.trim();
                if stdout.is_empty() {
                    ActionOutcome::ok()
                } else {
                    ActionOutcome::ok_with_output(stdout)
                }
            }
            Err(err) => {
                info!(repo = %self.root.display(), error = %err, "git action failed");
                ActionOutcome::failure(err.user_message())
            }
        }
    }
}

fn reject_branch_name(name: &str) -> Option<ActionOutcome> {
    if name.trim().is_empty() {
        warn!("rejected empty branch name");
        return Some(ActionOutcome::failure("branch name must not be empty"));
    }
    None
}
