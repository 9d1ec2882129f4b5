use gitlane_core::types::{FileChange, StashEntry};

use crate::command::GitCli;
use crate::diff::parse_name_status;
use crate::repo::RepoHandle;

const STASH_FORMAT: &str = "--pretty=format:%gd%x00%s%x00%ai";

pub fn list_stashes(repo: &RepoHandle, git: &GitCli) -> Vec<StashEntry> {
    let raw = git.run_silent(&repo.root, ["stash", "list", STASH_FORMAT]);
    parse_stash_list(&raw)
}

pub fn parse_stash_list(raw: &str) -> Vec<StashEntry> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\0');
            let reference = fields.next()?.trim();
            if reference.is_empty() {
                return None;
            }
            Some(StashEntry {
                reference: reference.to_string(),
                message: fields.next().unwrap_or_default().to_string(),
                date: fields.next().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

pub fn stash_files(repo: &RepoHandle, git: &GitCli, stash_ref: &str) -> Vec<FileChange> {
    let raw = git.run_silent(&repo.root, ["stash", "show", "--name-status", stash_ref]);
    parse_name_status(&raw)
}
