use std::path::PathBuf;
use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git command failed to start ({command}): {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git command returned non-zero exit ({command}) status={status:?}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("git command output was not valid UTF-8 ({command}, {stream}): {source}")]
    NonUtf8Output {
        command: String,
        stream: &'static str,
        #[source]
        source: FromUtf8Error,
    },
    #[error("path is not inside a git repository: {path}")]
    NotARepository { path: PathBuf },
    #[error("path escapes the repository working tree: {path}")]
    PathOutsideRepository { path: PathBuf },
    #[error("invalid git output: {context}")]
    Parse { context: String },
}

impl GitError {
    /// Text shown to a user for a failed action: captured stderr when git
    /// produced any, otherwise the error itself.
    pub fn user_message(&self) -> String {
        match self {
            GitError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                stderr.trim().to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_local_changes_conflict(&self) -> bool {
        match self {
            GitError::CommandFailed { stderr, .. } => looks_like_local_changes_conflict(stderr),
            _ => false,
        }
    }
}

/// Matches git's English messages for a checkout/pull blocked by local edits.
/// Localized git builds will not match.
pub fn looks_like_local_changes_conflict(stderr: &str) -> bool {
    stderr.contains("local changes to the following files would be overwritten")
        || stderr.contains("Please commit your changes or stash them")
}
