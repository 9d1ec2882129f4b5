//! File content at a revision or in the working tree.

use std::io::ErrorKind;
use std::path::{Component, Path};

use gitlane_core::types::BlobContent;

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::RepoHandle;

/// Bytes inspected for a NUL when deciding whether content is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// Content of `path` at `rev`. A path missing at that revision (or an unknown
/// revision) is `NotFound`; failing to run git at all is an error.
pub fn file_blob(
    repo: &RepoHandle,
    git: &GitCli,
    rev: &str,
    path: &str,
) -> Result<BlobContent, GitError> {
    match git.run_bytes(&repo.root, ["show".to_string(), format!("{rev}:{path}")]) {
        Ok(bytes) => Ok(classify(&bytes, path)),
        Err(GitError::CommandFailed { .. }) => Ok(BlobContent::NotFound),
        Err(err) => Err(err),
    }
}

/// Content of `path` as it currently sits in the working tree. `path` is
/// relative to the repository root and may not leave it, neither through
/// `..` components nor through a symlink.
pub fn workdir_blob(repo: &RepoHandle, path: &str) -> Result<BlobContent, GitError> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(GitError::PathOutsideRepository {
            path: relative.to_path_buf(),
        });
    }

    let full = repo.root.join(relative);
    let resolved = match full.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BlobContent::NotFound),
        Err(source) => return Err(read_error(&full, source)),
    };
    let root = repo
        .root
        .canonicalize()
        .map_err(|source| read_error(&repo.root, source))?;
    if !resolved.starts_with(&root) {
        return Err(GitError::PathOutsideRepository { path: full });
    }

    match std::fs::read(&resolved) {
        Ok(bytes) => Ok(classify(&bytes, path)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(BlobContent::NotFound),
        Err(source) => Err(read_error(&full, source)),
    }
}

fn read_error(path: &Path, source: std::io::Error) -> GitError {
    GitError::Io {
        command: format!("read {}", path.display()),
        source,
    }
}

pub fn classify(bytes: &[u8], path: &str) -> BlobContent {
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return BlobContent::Binary {
            size: bytes.len(),
            mime: guess_mime(path).map(str::to_string),
        };
    }
    let content = String::from_utf8_lossy(bytes).into_owned();
    let line_count = content.lines().count();
    BlobContent::Text {
        content,
        line_count,
    }
}

/// Image types a viewer can render inline.
pub fn guess_mime(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}
