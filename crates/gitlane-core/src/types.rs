//! Core data model shared by the git adapter, the graph layout and the CLI.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One entry of a commit listing, in the order the log query produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    pub subject: String,
    pub author_name: String,
    pub author_date: DateTime<FixedOffset>,
    /// Branch and tag labels pointing at this commit, as decorated by git.
    pub refs: Vec<String>,
    /// Parent hashes; index 0 is the mainline continuation.
    pub parents: Vec<String>,
}

impl Commit {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub hash: String,
    pub short_hash: String,
    pub subject: String,
    pub body: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    pub committer_name: String,
    pub committer_date: String,
    pub refs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatusCode {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Conflict,
}

impl FileStatusCode {
    /// Maps a git status letter (`--name-status`, porcelain XY) to a code.
    /// Type changes are folded into `Modified`.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(FileStatusCode::Added),
            'M' | 'T' => Some(FileStatusCode::Modified),
            'D' => Some(FileStatusCode::Deleted),
            'R' => Some(FileStatusCode::Renamed),
            'C' => Some(FileStatusCode::Copied),
            'U' => Some(FileStatusCode::Conflict),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            FileStatusCode::Added => 'A',
            FileStatusCode::Modified => 'M',
            FileStatusCode::Deleted => 'D',
            FileStatusCode::Renamed => 'R',
            FileStatusCode::Copied => 'C',
            FileStatusCode::Conflict => 'U',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub left_line_number: Option<u32>,
    pub right_line_number: Option<u32>,
    /// Line content without the leading ` `, `+` or `-` marker.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// The raw `@@ -L,S +L,S @@ ...` line.
    pub header: String,
    pub left_start: u32,
    pub left_count: u32,
    pub right_start: u32,
    pub right_count: u32,
    pub lines: Vec<DiffLine>,
}

/// One file section of a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// `diff`, `index`, `---`, `+++` and similar metadata lines.
    pub header_lines: Vec<String>,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub hunks: Vec<DiffHunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedDiff {
    /// Nothing textual to show; callers fall back to rendering the raw blob.
    NoChanges,
    Files { files: Vec<FileDiff> },
}

impl ParsedDiff {
    pub fn is_empty(&self) -> bool {
        matches!(self, ParsedDiff::NoChanges)
    }

    pub fn hunks(&self) -> impl Iterator<Item = &DiffHunk> {
        let files: &[FileDiff] = match self {
            ParsedDiff::NoChanges => &[],
            ParsedDiff::Files { files } => files,
        };
        files.iter().flat_map(|file| file.hunks.iter())
    }
}

/// One projection of a working-tree path: either its staged or its unstaged view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    pub index_state: char,
    pub worktree_state: char,
    /// The state character relevant to this projection.
    pub status_char: char,
    pub staged: bool,
    pub untracked: bool,
}

impl StatusEntry {
    pub fn code(&self) -> Option<FileStatusCode> {
        FileStatusCode::from_letter(self.status_char)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub ahead: u32,
    pub behind: u32,
    /// The configured upstream no longer exists.
    pub gone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    pub target_hash: String,
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Tracking>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchListing {
    pub local: Vec<BranchRef>,
    pub remote: Vec<BranchRef>,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub name: String,
    pub date: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashEntry {
    pub reference: String,
    pub message: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobContent {
    Text {
        content: String,
        line_count: usize,
    },
    Binary {
        size: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime: Option<String>,
    },
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub branch: String,
    pub dirty: bool,
    pub changed_files: usize,
    pub ahead: u32,
    pub behind: u32,
}

/// Result of an explicit, user-triggered git action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            output: None,
            error: None,
        }
    }

    pub fn ok_with_output(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}
