//! Unified diff parsing and the queries that produce diffs.

use gitlane_core::types::{
    DiffHunk, DiffLine, DiffLineKind, FileChange, FileDiff, FileStatusCode, ParsedDiff,
};

use crate::command::GitCli;
use crate::error::GitError;
use crate::repo::RepoHandle;

/// Files touched by `hash`. Merge commits list each path once, preferring the
/// entry against the first parent.
pub fn commit_files(repo: &RepoHandle, git: &GitCli, hash: &str) -> Vec<FileChange> {
    let raw = git.run_silent(
        &repo.root,
        [
            "diff-tree",
            "--no-commit-id",
            "-r",
            "--root",
            "-m",
            "-M",
            "--name-status",
            hash,
        ],
    );
    let mut files: Vec<FileChange> = Vec::new();
    for change in parse_name_status(&raw) {
        if !files.iter().any(|existing| existing.path == change.path) {
            files.push(change);
        }
    }
    files
}

/// Whole-commit diff against the first parent.
pub fn commit_diff(repo: &RepoHandle, git: &GitCli, hash: &str) -> Result<ParsedDiff, GitError> {
    let raw = git.run_silent(
        &repo.root,
        ["show", "--format=", "-m", "--first-parent", hash],
    );
    parse_unified_diff(&raw)
}

pub fn file_diff(
    repo: &RepoHandle,
    git: &GitCli,
    hash: &str,
    path: &str,
) -> Result<ParsedDiff, GitError> {
    let raw = git.run_silent(
        &repo.root,
        ["show", "--format=", "-m", "--first-parent", hash, "--", path],
    );
    parse_unified_diff(&raw)
}

/// Staged changes of `path`, or its unstaged changes when nothing is staged.
pub fn workdir_diff(repo: &RepoHandle, git: &GitCli, path: &str) -> Result<ParsedDiff, GitError> {
    let staged = git.run_silent(&repo.root, ["diff", "--cached", "--", path]);
    if !staged.trim().is_empty() {
        return parse_unified_diff(&staged);
    }
    let unstaged = git.run_silent(&repo.root, ["diff", "--", path]);
    parse_unified_diff(&unstaged)
}

/// Changes a stash recorded for `path`, relative to the commit it was made on.
pub fn stash_file_diff(
    repo: &RepoHandle,
    git: &GitCli,
    stash_ref: &str,
    path: &str,
) -> Result<ParsedDiff, GitError> {
    let base = format!("{stash_ref}^1");
    let raw = git.run_silent(&repo.root, ["diff", base.as_str(), stash_ref, "--", path]);
    parse_unified_diff(&raw)
}

/// Parses `--name-status` output (`M\tpath`, `R100\told\tnew`). Lines with an
/// unknown status letter are skipped.
pub fn parse_name_status(raw: &str) -> Vec<FileChange> {
    raw.lines()
        .filter_map(|line| {
            let parts = line.split('\t').collect::<Vec<_>>();
            if parts.len() < 2 {
                return None;
            }
            let status = FileStatusCode::from_letter(parts[0].trim().chars().next()?)?;
            let path = parts[parts.len() - 1].to_string();
            let old_path = match status {
                FileStatusCode::Renamed | FileStatusCode::Copied if parts.len() >= 3 => {
                    Some(parts[1].to_string())
                }
                _ => None,
            };
            Some(FileChange {
                path,
                status,
                old_path,
            })
        })
        .collect()
}

struct OpenHunk {
    hunk: DiffHunk,
    left_remaining: u32,
    right_remaining: u32,
    left_next: u32,
    right_next: u32,
}

impl OpenHunk {
    fn is_exhausted(&self) -> bool {
        self.left_remaining == 0 && self.right_remaining == 0
    }

    /// Consumes `line` if it belongs to this hunk.
    fn accept(&mut self, line: &str) -> bool {
        let (kind, text) = match line.chars().next() {
            Some('+') if self.right_remaining > 0 => (DiffLineKind::Added, &line[1..]),
            Some('-') if self.left_remaining > 0 => (DiffLineKind::Removed, &line[1..]),
            Some(' ') if self.left_remaining > 0 && self.right_remaining > 0 => {
                (DiffLineKind::Context, &line[1..])
            }
            // Some tools strip the single space of an empty context line.
            None if self.left_remaining > 0 && self.right_remaining > 0 => {
                (DiffLineKind::Context, "")
            }
            _ => return false,
        };

        let mut left_line_number = None;
        let mut right_line_number = None;
        if kind != DiffLineKind::Added {
            left_line_number = Some(self.left_next);
            self.left_next += 1;
            self.left_remaining -= 1;
        }
        if kind != DiffLineKind::Removed {
            right_line_number = Some(self.right_next);
            self.right_next += 1;
            self.right_remaining -= 1;
        }

        self.hunk.lines.push(DiffLine {
            kind,
            left_line_number,
            right_line_number,
            text: text.to_string(),
        });
        true
    }
}

/// Parses unified diff text into per-file hunks.
///
/// Text without any hunk (empty output, binary files, mode-only changes)
/// yields [`ParsedDiff::NoChanges`]. Lines before the first `diff`/`---`
/// header, such as a commit header from `git show`, are ignored. Hunk bodies
/// are delimited by the line counts of their header, so content lines that
/// look like `--- ` or `diff ` are still read as content. A hunk header whose
/// ranges cannot be read is an error.
pub fn parse_unified_diff(raw: &str) -> Result<ParsedDiff, GitError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut open: Option<OpenHunk> = None;

    for line in raw.lines() {
        if let Some(hunk) = open.as_mut() {
            if !hunk.is_exhausted() && hunk.accept(line) {
                continue;
            }
        }
        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }
        if let Some(finished) = open.take() {
            if let Some(file) = current.as_mut() {
                file.hunks.push(finished.hunk);
            }
        }

        if line.starts_with("diff ") {
            files.extend(current.take());
            current = Some(FileDiff {
                header_lines: vec![line.to_string()],
                ..FileDiff::default()
            });
            continue;
        }

        if line.starts_with("@@") {
            let (left_start, left_count, right_start, right_count) = parse_hunk_header(line)
                .ok_or_else(|| GitError::Parse {
                    context: format!("malformed hunk header: {line}"),
                })?;
            if current.is_none() {
                current = Some(FileDiff::default());
            }
            open = Some(OpenHunk {
                hunk: DiffHunk {
                    header: line.to_string(),
                    left_start,
                    left_count,
                    right_start,
                    right_count,
                    lines: Vec::new(),
                },
                left_remaining: left_count,
                right_remaining: right_count,
                left_next: left_start,
                right_next: right_start,
            });
            continue;
        }

        if line.starts_with("--- ") {
            let starts_new_file = match current.as_ref() {
                None => true,
                Some(file) => !file.hunks.is_empty(),
            };
            if starts_new_file {
                files.extend(current.take());
                current = Some(FileDiff::default());
            }
        }

        let Some(file) = current.as_mut() else {
            continue;
        };
        if !file.hunks.is_empty() {
            continue;
        }
        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = header_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = header_path(path, "b/");
        }
        file.header_lines.push(line.to_string());
    }

    if let Some(finished) = open.take() {
        if let Some(file) = current.as_mut() {
            file.hunks.push(finished.hunk);
        }
    }
    files.extend(current.take());

    if files.iter().all(|file| file.hunks.is_empty()) {
        return Ok(ParsedDiff::NoChanges);
    }
    Ok(ParsedDiff::Files { files })
}

/// `@@ -L[,S] +L[,S] @@ ...` into `(L, S, L, S)`; an omitted count is 1.
/// Ranges whose end does not fit a `u32` line number are rejected.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut ranges = rest[..end].split_whitespace();
    let (left_start, left_count) = parse_range(ranges.next()?.strip_prefix('-')?)?;
    let (right_start, right_count) = parse_range(ranges.next()?.strip_prefix('+')?)?;
    if ranges.next().is_some() {
        return None;
    }
    Some((left_start, left_count, right_start, right_count))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    let (start, count): (u32, u32) = match range.split_once(',') {
        Some((start, count)) => (start.parse().ok()?, count.parse().ok()?),
        None => (range.parse().ok()?, 1),
    };
    start.checked_add(count)?;
    Some((start, count))
}

fn header_path(raw: &str, prefix: &str) -> Option<String> {
    let path = raw.split('\t').next().unwrap_or(raw).trim_end();
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(path).to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gitlane_core::types::{DiffLineKind, FileStatusCode, ParsedDiff};

    use super::{
        commit_diff, commit_files, file_diff, parse_name_status, parse_unified_diff,
        workdir_diff,
    };
    use crate::command::GitCli;
    use crate::error::GitError;
    use crate::repo::discover_repo;
    use crate::test_support::{commit_file, init_repo, run_git};

    fn numbers(diff: &ParsedDiff) -> Vec<(DiffLineKind, Option<u32>, Option<u32>)> {
        diff.hunks()
            .flat_map(|hunk| hunk.lines.iter())
            .map(|line| (line.kind, line.left_line_number, line.right_line_number))
            .collect()
    }

    #[test]
    fn line_numbers_follow_hunk_header_and_line_kinds() {
        let raw = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,3 +10,5 @@ fn main() {
 keep
-old
+new
+extra
 tail
+appended
";
        let diff = parse_unified_diff(raw).expect("parse diff");
        use DiffLineKind::*;
        assert_eq!(
            numbers(&diff),
            vec![
                (Context, Some(10), Some(10)),
                (Removed, Some(11), None),
                (Added, None, Some(11)),
                (Added, None, Some(12)),
                (Context, Some(12), Some(13)),
                (Added, None, Some(14)),
            ]
        );

        let ParsedDiff::Files { files } = &diff else {
            panic!("expected files");
        };
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].old_path.as_deref(), Some("src/lib.rs"));
        assert_eq!(files[0].new_path.as_deref(), Some("src/lib.rs"));
        assert_eq!(files[0].header_lines.len(), 4);
        let hunk = &files[0].hunks[0];
        assert_eq!(hunk.header, "@@ -10,3 +10,5 @@ fn main() {");
        assert_eq!((hunk.left_count, hunk.right_count), (3, 5));
        assert_eq!(hunk.lines[1].text, "old");
    }

    #[test]
    fn left_numbering_stops_once_left_range_is_consumed() {
        let raw = "\
@@ -1,1 +1,2 @@
-gone
+first
+second
-- not part of the hunk
";
        let diff = parse_unified_diff(raw).expect("parse diff");
        let hunk = diff.hunks().next().expect("one hunk");
        assert_eq!(hunk.lines.len(), 3);
        assert_eq!(hunk.lines[2].left_line_number, None);
        assert_eq!(hunk.lines[2].right_line_number, Some(2));
    }

    #[test]
    fn content_lines_that_look_like_headers_stay_in_the_hunk() {
        let raw = "\
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,2 @@
--- old rule
+++ new rule
 diff stays
";
        let diff = parse_unified_diff(raw).expect("parse diff");
        let kinds = numbers(&diff)
            .into_iter()
            .map(|(kind, _, _)| kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![DiffLineKind::Removed, DiffLineKind::Added, DiffLineKind::Context]
        );
        let line_texts = diff
            .hunks()
            .flat_map(|h| h.lines.iter().map(|l| l.text.clone()))
            .collect::<Vec<_>>();
        assert_eq!(line_texts, vec!["-- old rule", "++ new rule", "diff stays"]);
    }

    #[test]
    fn multiple_files_and_hunks_are_separated() {
        let raw = "\
commit 0123456789
Author: Test User <test@example.com>

    message line
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1 +1 @@
-a
+A
@@ -10,0 +11 @@
+tail
\\ No newline at end of file
diff --git a/new.txt b/new.txt
new file mode 100644
--- /dev/null
+++ b/new.txt
@@ -0,0 +1,2 @@
+one
+two
";
        let diff = parse_unified_diff(raw).expect("parse diff");
        let ParsedDiff::Files { files } = &diff else {
            panic!("expected files");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].hunks.len(), 2);
        assert_eq!(files[0].hunks[1].lines[0].right_line_number, Some(11));
        assert_eq!(files[1].old_path, None);
        assert_eq!(files[1].new_path.as_deref(), Some("new.txt"));
        assert_eq!(files[1].hunks[0].lines.len(), 2);
        assert!(files[1]
            .header_lines
            .iter()
            .any(|line| line == "new file mode 100644"));
    }

    #[test]
    fn empty_or_hunkless_text_reports_no_changes() {
        assert_eq!(parse_unified_diff("").expect("empty"), ParsedDiff::NoChanges);
        assert_eq!(parse_unified_diff("  \n").expect("blank"), ParsedDiff::NoChanges);

        let binary = "\
diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
";
        assert_eq!(parse_unified_diff(binary).expect("binary"), ParsedDiff::NoChanges);
    }

    #[test]
    fn malformed_hunk_header_is_a_parse_error() {
        let err = parse_unified_diff("@@ -x,1 +1 @@\n+a\n").expect_err("bad header");
        assert!(matches!(err, GitError::Parse { context } if context.contains("@@ -x,1")));
    }

    #[test]
    fn hunk_ranges_past_the_last_line_number_are_rejected() {
        let err = parse_unified_diff("@@ -4294967295,2 +1 @@\n-a\n-b\n+c\n")
            .expect_err("overflowing range");
        assert!(matches!(err, GitError::Parse { .. }));

        let edge = parse_unified_diff("@@ -4294967294,1 +4294967294,1 @@\n a\n")
            .expect("range ending at u32::MAX");
        let line = &edge.hunks().next().expect("hunk").lines[0];
        assert_eq!(line.left_line_number, Some(4_294_967_294));
        assert_eq!(line.right_line_number, Some(4_294_967_294));
    }

    #[test]
    fn name_status_lines_map_to_file_changes() {
        let raw = "M\tsrc/main.rs\nA\tnew.txt\nD\told.txt\nR087\tfrom.rs\tto.rs\nT\tlink\nX\tweird\n\n";
        let changes = parse_name_status(raw);
        let summary = changes
            .iter()
            .map(|c| (c.status, c.path.as_str(), c.old_path.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (FileStatusCode::Modified, "src/main.rs", None),
                (FileStatusCode::Added, "new.txt", None),
                (FileStatusCode::Deleted, "old.txt", None),
                (FileStatusCode::Renamed, "to.rs", Some("from.rs")),
                (FileStatusCode::Modified, "link", None),
            ]
        );
    }

    #[test]
    fn repository_diff_queries_return_structured_results() {
        let root = init_repo("diff-queries");
        let first = commit_file(&root, "a.txt", "one\ntwo\nthree\n", "first");
        let second = commit_file(&root, "a.txt", "one\n2\nthree\nfour\n", "second");

        let git = GitCli::default();
        let repo = discover_repo(&root, &git).expect("discover repo");

        let root_files = commit_files(&repo, &git, &first);
        assert_eq!(root_files.len(), 1);
        assert_eq!(root_files[0].status, FileStatusCode::Added);

        let files = commit_files(&repo, &git, &second);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.txt");
        assert_eq!(files[0].status, FileStatusCode::Modified);

        let diff = file_diff(&repo, &git, &second, "a.txt").expect("file diff");
        let added = diff
            .hunks()
            .flat_map(|h| h.lines.iter())
            .filter(|l| l.kind == DiffLineKind::Added)
            .map(|l| (l.text.clone(), l.right_line_number))
            .collect::<Vec<_>>();
        assert_eq!(
            added,
            vec![("2".to_string(), Some(2)), ("four".to_string(), Some(4))]
        );
        assert_eq!(
            commit_diff(&repo, &git, &second).expect("commit diff"),
            diff
        );

        assert_eq!(
            workdir_diff(&repo, &git, "a.txt").expect("clean workdir"),
            ParsedDiff::NoChanges
        );
        fs::write(root.join("a.txt"), "one\n").expect("edit");
        let unstaged = workdir_diff(&repo, &git, "a.txt").expect("unstaged diff");
        assert!(!unstaged.is_empty());
        run_git(&root, &["add", "a.txt"]);
        let staged = workdir_diff(&repo, &git, "a.txt").expect("staged diff");
        assert_eq!(staged, unstaged);

        let _ = fs::remove_dir_all(&root);
    }
}
