//! Working-tree status from `git status --porcelain=v2 -z -u`.

use gitlane_core::types::StatusEntry;
use tracing::debug;

use crate::command::GitCli;
use crate::repo::RepoHandle;

/// Porcelain marker for "unmodified" in an XY pair.
const UNMODIFIED: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRecord {
    Ordinary {
        index_state: char,
        worktree_state: char,
        path: String,
    },
    RenameOrCopy {
        index_state: char,
        worktree_state: char,
        path: String,
        original_path: String,
    },
    Untracked {
        path: String,
    },
    Conflict {
        index_state: char,
        worktree_state: char,
        path: String,
    },
}

pub fn load_status(repo: &RepoHandle, git: &GitCli) -> Vec<StatusEntry> {
    let raw = git.run_silent(&repo.root, ["status", "--porcelain=v2", "-z", "-u"]);
    reconcile_status(&parse_status_records(&raw))
}

/// Splits NUL-delimited porcelain v2 output into records. A rename/copy
/// record consumes the token after it as its original path. Ignored files,
/// header lines and unrecognized records are skipped.
pub fn parse_status_records(raw: &str) -> Vec<StatusRecord> {
    let mut records = Vec::new();
    let mut tokens = raw.split('\0');

    while let Some(token) = tokens.next() {
        if token.is_empty() {
            continue;
        }
        let record = match token.as_bytes()[0] {
            b'1' => parse_ordinary(token),
            b'2' => {
                let original_path = tokens.next().unwrap_or_default();
                parse_rename(token, original_path)
            }
            b'u' => parse_conflict(token),
            b'?' => token
                .strip_prefix("? ")
                .filter(|path| !path.is_empty())
                .map(|path| StatusRecord::Untracked {
                    path: path.to_string(),
                }),
            b'!' | b'#' => continue,
            _ => None,
        };
        match record {
            Some(record) => records.push(record),
            None => debug!(record = token, "skipping unrecognized status record"),
        }
    }

    records
}

fn xy(field: &str) -> Option<(char, char)> {
    let mut chars = field.chars();
    let index_state = chars.next()?;
    let worktree_state = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some((index_state, worktree_state))
}

// 1 XY sub mH mI mW hH hI path
fn parse_ordinary(token: &str) -> Option<StatusRecord> {
    let fields = token.splitn(9, ' ').collect::<Vec<_>>();
    if fields.len() != 9 || fields[8].is_empty() {
        return None;
    }
    let (index_state, worktree_state) = xy(fields[1])?;
    Some(StatusRecord::Ordinary {
        index_state,
        worktree_state,
        path: fields[8].to_string(),
    })
}

// 2 XY sub mH mI mW hH hI Xscore path
fn parse_rename(token: &str, original_path: &str) -> Option<StatusRecord> {
    let fields = token.splitn(10, ' ').collect::<Vec<_>>();
    if fields.len() != 10 || fields[9].is_empty() {
        return None;
    }
    let (index_state, worktree_state) = xy(fields[1])?;
    Some(StatusRecord::RenameOrCopy {
        index_state,
        worktree_state,
        path: fields[9].to_string(),
        original_path: original_path.to_string(),
    })
}

// u XY sub m1 m2 m3 mW h1 h2 h3 path
fn parse_conflict(token: &str) -> Option<StatusRecord> {
    let fields = token.splitn(11, ' ').collect::<Vec<_>>();
    if fields.len() != 11 || fields[10].is_empty() {
        return None;
    }
    let (index_state, worktree_state) = xy(fields[1])?;
    Some(StatusRecord::Conflict {
        index_state,
        worktree_state,
        path: fields[10].to_string(),
    })
}

/// Projects records into staged and unstaged entries, unstaged first. A path
/// changed on both sides appears once in each group; untracked paths appear
/// only unstaged and conflicts only staged.
pub fn reconcile_status(records: &[StatusRecord]) -> Vec<StatusEntry> {
    let mut unstaged = Vec::new();
    let mut staged = Vec::new();

    for record in records {
        match record {
            StatusRecord::Ordinary {
                index_state,
                worktree_state,
                path,
            } => project(
                path,
                None,
                *index_state,
                *worktree_state,
                &mut staged,
                &mut unstaged,
            ),
            StatusRecord::RenameOrCopy {
                index_state,
                worktree_state,
                path,
                original_path,
            } => project(
                path,
                Some(original_path),
                *index_state,
                *worktree_state,
                &mut staged,
                &mut unstaged,
            ),
            StatusRecord::Untracked { path } => unstaged.push(StatusEntry {
                path: path.clone(),
                original_path: None,
                index_state: '?',
                worktree_state: '?',
                status_char: '?',
                staged: false,
                untracked: true,
            }),
            StatusRecord::Conflict {
                index_state,
                worktree_state,
                path,
            } => staged.push(StatusEntry {
                path: path.clone(),
                original_path: None,
                index_state: *index_state,
                worktree_state: *worktree_state,
                status_char: 'U',
                staged: true,
                untracked: false,
            }),
        }
    }

    unstaged.extend(staged);
    unstaged
}

fn project(
    path: &str,
    original_path: Option<&String>,
    index_state: char,
    worktree_state: char,
    staged: &mut Vec<StatusEntry>,
    unstaged: &mut Vec<StatusEntry>,
) {
    let entry = |status_char: char, is_staged: bool| StatusEntry {
        path: path.to_string(),
        original_path: original_path.cloned(),
        index_state,
        worktree_state,
        status_char,
        staged: is_staged,
        untracked: false,
    };
    if index_state != UNMODIFIED {
        staged.push(entry(index_state, true));
    }
    if worktree_state != UNMODIFIED {
        unstaged.push(entry(worktree_state, false));
    }
}
