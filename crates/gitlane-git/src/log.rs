//! Commit listing: the `git log` query and the parser over its output.

use chrono::DateTime;
use gitlane_core::config::{LogSettings, DEFAULT_LOG_LIMIT};
use gitlane_core::types::{Commit, CommitDetail};
use tracing::debug;

use crate::command::GitCli;
use crate::repo::RepoHandle;

/// Per-commit format: full hash, short hash, subject, author name, author
/// date, decorations, parents; NUL separated, one commit per line.
pub const LOG_FORMAT: &str = "%H%x00%h%x00%s%x00%an%x00%ai%x00%D%x00%P";

const DETAIL_FORMAT: &str = "%H%x00%h%x00%s%x00%b%x00%an%x00%ae%x00%ai%x00%cn%x00%ci%x00%D";
const FIELD_SEPARATOR: char = '\0';
const LOG_FIELD_COUNT: usize = 7;
const DETAIL_FIELD_COUNT: usize = 10;
/// `%ai`, e.g. `2024-03-01 10:00:00 +0100`.
const AUTHOR_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: usize,
    pub show_all: bool,
    /// Restricts the listing to one ref; disables `show_all`.
    pub branch: Option<String>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LOG_LIMIT,
            show_all: true,
            branch: None,
        }
    }
}

impl From<&LogSettings> for LogQuery {
    fn from(settings: &LogSettings) -> Self {
        Self {
            limit: settings.limit,
            show_all: settings.show_all,
            branch: None,
        }
    }
}

impl LogQuery {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["log".to_string()];
        match &self.branch {
            Some(branch) => args.push(branch.clone()),
            None if self.show_all => args.push("--all".to_string()),
            None => {}
        }
        args.push(format!("--pretty=format:{LOG_FORMAT}"));
        args.push(format!("--max-count={}", self.limit));
        args
    }
}

/// Runs the log query; a failed query yields an empty listing.
pub fn load_log(repo: &RepoHandle, git: &GitCli, query: &LogQuery) -> Vec<Commit> {
    let raw = git.run_silent(&repo.root, query.args());
    parse_log(&raw)
}

/// Parses [`LOG_FORMAT`] output, preserving source order. Lines that do not
/// have the expected shape are skipped.
pub fn parse_log(raw: &str) -> Vec<Commit> {
    raw.trim()
        .lines()
        .filter_map(|line| {
            let commit = parse_log_line(line);
            if commit.is_none() && !line.trim().is_empty() {
                debug!(line, "skipping malformed log line");
            }
            commit
        })
        .collect()
}

fn parse_log_line(line: &str) -> Option<Commit> {
    let fields = line.split(FIELD_SEPARATOR).collect::<Vec<_>>();
    if fields.len() != LOG_FIELD_COUNT {
        return None;
    }

    let hash = fields[0].trim();
    if hash.is_empty() {
        return None;
    }
    let author_date = DateTime::parse_from_str(fields[4].trim(), AUTHOR_DATE_FORMAT).ok()?;

    Some(Commit {
        hash: hash.to_string(),
        short_hash: fields[1].trim().to_string(),
        subject: fields[2].to_string(),
        author_name: fields[3].to_string(),
        author_date,
        refs: split_refs(fields[5]),
        parents: fields[6].split_whitespace().map(str::to_string).collect(),
    })
}

fn split_refs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn commit_detail(repo: &RepoHandle, git: &GitCli, hash: &str) -> Option<CommitDetail> {
    let raw = git.run_silent(
        &repo.root,
        [
            "show".to_string(),
            "-s".to_string(),
            format!("--pretty=format:{DETAIL_FORMAT}"),
            hash.to_string(),
        ],
    );
    parse_commit_detail(&raw)
}

pub fn parse_commit_detail(raw: &str) -> Option<CommitDetail> {
    let fields = raw.split(FIELD_SEPARATOR).collect::<Vec<_>>();
    if fields.len() != DETAIL_FIELD_COUNT {
        return None;
    }
    let hash = fields[0].trim();
    if hash.is_empty() {
        return None;
    }

    Some(CommitDetail {
        hash: hash.to_string(),
        short_hash: fields[1].trim().to_string(),
        subject: fields[2].to_string(),
        body: fields[3].trim().to_string(),
        author_name: fields[4].to_string(),
        author_email: fields[5].to_string(),
        author_date: fields[6].trim().to_string(),
        committer_name: fields[7].to_string(),
        committer_date: fields[8].trim().to_string(),
        refs: split_refs(fields[9]),
    })
}
