//! Branch and tag listings, plus the hierarchical views over branch names.

use gitlane_core::types::{BranchListing, BranchRef, TagRef, Tracking};
use serde::{Deserialize, Serialize};

use crate::command::GitCli;
use crate::repo::RepoHandle;

const LOCAL_FORMAT: &str =
    "--format=%(refname:short)%00%(objectname:short)%00%(upstream:short)%00%(upstream:track)";
const REMOTE_FORMAT: &str = "--format=%(refname:short)%00%(objectname:short)%00%(symref)";
const TAG_FORMAT: &str = "--format=%(refname:short)%00%(creatordate:short)%00%(subject)";

/// Local and remote branches. Failed queries degrade to empty lists.
pub fn list_branches(repo: &RepoHandle, git: &GitCli) -> BranchListing {
    let current = git
        .run_silent(&repo.root, ["rev-parse", "--abbrev-ref", "HEAD"])
        .trim()
        .to_string();
    let local_raw = git.run_silent(&repo.root, ["for-each-ref", LOCAL_FORMAT, "refs/heads/"]);
    let remote_raw = git.run_silent(
        &repo.root,
        ["for-each-ref", REMOTE_FORMAT, "refs/remotes/"],
    );

    BranchListing {
        local: parse_local_branches(&local_raw, &current),
        remote: parse_remote_branches(&remote_raw),
        current,
    }
}

pub fn parse_local_branches(raw: &str, current: &str) -> Vec<BranchRef> {
    raw.lines()
        .filter_map(|line| {
            let fields = line.split('\0').collect::<Vec<_>>();
            let name = fields.first()?.trim();
            if name.is_empty() {
                return None;
            }
            let upstream = fields
                .get(2)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            let tracking = upstream
                .as_ref()
                .map(|_| parse_tracking(fields.get(3).copied().unwrap_or_default()));
            Some(BranchRef {
                name: name.to_string(),
                target_hash: fields.get(1).map(|v| v.trim()).unwrap_or_default().to_string(),
                is_current: name == current,
                upstream,
                tracking,
            })
        })
        .collect()
}

/// Remote branches; symbolic refs such as `origin/HEAD` are dropped.
pub fn parse_remote_branches(raw: &str) -> Vec<BranchRef> {
    raw.lines()
        .filter_map(|line| {
            let fields = line.split('\0').collect::<Vec<_>>();
            let name = fields.first()?.trim();
            let symref = fields.get(2).map(|v| v.trim()).unwrap_or_default();
            if name.is_empty() || !symref.is_empty() || name.ends_with("/HEAD") {
                return None;
            }
            Some(BranchRef {
                name: name.to_string(),
                target_hash: fields.get(1).map(|v| v.trim()).unwrap_or_default().to_string(),
                is_current: false,
                upstream: None,
                tracking: None,
            })
        })
        .collect()
}

/// `%(upstream:track)`: `[ahead 2, behind 1]`, `[gone]`, or empty when in sync.
pub fn parse_tracking(raw: &str) -> Tracking {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let mut tracking = Tracking::default();
    for part in inner.split(',').map(str::trim) {
        if part == "gone" {
            tracking.gone = true;
        } else if let Some(count) = part.strip_prefix("ahead ") {
            tracking.ahead = count.trim().parse().unwrap_or(0);
        } else if let Some(count) = part.strip_prefix("behind ") {
            tracking.behind = count.trim().parse().unwrap_or(0);
        }
    }
    tracking
}

/// Tags, newest first.
pub fn list_tags(repo: &RepoHandle, git: &GitCli) -> Vec<TagRef> {
    let raw = git.run_silent(
        &repo.root,
        ["for-each-ref", "--sort=-creatordate", TAG_FORMAT, "refs/tags/"],
    );
    parse_tags(&raw)
}

pub fn parse_tags(raw: &str) -> Vec<TagRef> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\0');
            let name = fields.next()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(TagRef {
                name: name.to_string(),
                date: fields.next().unwrap_or_default().trim().to_string(),
                message: fields.next().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// One `/`-separated segment of a branch name. A node can carry a branch and
/// children at the same time (`feature` next to `feature/login`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchTreeNode {
    pub segment: String,
    /// Name prefix up to and including this segment.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BranchTreeNode>,
}

impl BranchTreeNode {
    fn new(segment: &str, path: String) -> Self {
        Self {
            segment: segment.to_string(),
            path,
            branch: None,
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Nests branches by name segment. Siblings keep the order in which their
/// first branch was supplied.
pub fn build_branch_tree(branches: &[BranchRef]) -> Vec<BranchTreeNode> {
    let mut roots: Vec<BranchTreeNode> = Vec::new();

    for branch in branches {
        let segments = branch
            .name
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();
        let Some((last, parents)) = segments.split_last() else {
            continue;
        };

        let mut level = &mut roots;
        let mut path = String::new();
        for segment in parents {
            push_segment(&mut path, segment);
            let index = child_index(level, segment, &path);
            level = &mut level[index].children;
        }
        push_segment(&mut path, last);
        let index = child_index(level, last, &path);
        level[index].branch = Some(branch.clone());
    }

    roots
}

fn push_segment(path: &mut String, segment: &str) {
    if !path.is_empty() {
        path.push('/');
    }
    path.push_str(segment);
}

fn child_index(level: &mut Vec<BranchTreeNode>, segment: &str, path: &str) -> usize {
    match level.iter().position(|node| node.segment == segment) {
        Some(index) => index,
        None => {
            level.push(BranchTreeNode::new(segment, path.to_string()));
            level.len() - 1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchGroup {
    /// Text before the first `/`; empty for names without one.
    pub prefix: String,
    pub branches: Vec<BranchRef>,
}

/// Groups branches by their first name segment, in order of first appearance.
pub fn group_branches_by_prefix(branches: &[BranchRef]) -> Vec<BranchGroup> {
    let mut groups: Vec<BranchGroup> = Vec::new();
    for branch in branches {
        let prefix = branch
            .name
            .split_once('/')
            .map(|(prefix, _)| prefix)
            .unwrap_or_default();
        match groups.iter_mut().find(|group| group.prefix == prefix) {
            Some(group) => group.branches.push(branch.clone()),
            None => groups.push(BranchGroup {
                prefix: prefix.to_string(),
                branches: vec![branch.clone()],
            }),
        }
    }
    groups
}

/// Case-insensitive substring match on the branch name. A blank query keeps
/// everything.
pub fn filter_branches<'a>(branches: &'a [BranchRef], query: &str) -> Vec<&'a BranchRef> {
    let needle = query.trim().to_lowercase();
    branches
        .iter()
        .filter(|branch| needle.is_empty() || branch.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gitlane_core::types::{BranchRef, Tracking};

    use super::{
        build_branch_tree, filter_branches, group_branches_by_prefix, list_branches, list_tags,
        parse_local_branches, parse_remote_branches, parse_tags, parse_tracking,
    };
    use crate::command::GitCli;
    use crate::repo::discover_repo;
    use crate::test_support::{commit_file, init_repo, run_git, unique_temp_dir};

    fn branch(name: &str) -> BranchRef {
        BranchRef {
            name: name.to_string(),
            target_hash: "abc1234".to_string(),
            is_current: false,
            upstream: None,
            tracking: None,
        }
    }

    #[test]
    fn local_branches_carry_upstream_and_tracking() {
        let raw = "main\0aaa1111\0origin/main\0[ahead 2, behind 1]\n\
                   feature/x\0bbb2222\0origin/feature/x\0[gone]\n\
                   synced\0ccc3333\0origin/synced\0\n\
                   scratch\0ddd4444\0\0\n";
        let branches = parse_local_branches(raw, "main");

        assert_eq!(branches.len(), 4);
        assert!(branches[0].is_current);
        assert_eq!(branches[0].upstream.as_deref(), Some("origin/main"));
        assert_eq!(
            branches[0].tracking,
            Some(Tracking {
                ahead: 2,
                behind: 1,
                gone: false
            })
        );
        assert!(branches[1].tracking.is_some_and(|t| t.gone));
        assert_eq!(branches[2].tracking, Some(Tracking::default()));
        assert_eq!(branches[3].upstream, None);
        assert_eq!(branches[3].tracking, None);
        assert!(branches[1..].iter().all(|b| !b.is_current));
    }

    #[test]
    fn tracking_text_variants() {
        assert_eq!(parse_tracking("[behind 7]").behind, 7);
        assert_eq!(parse_tracking("[ahead 3]").ahead, 3);
        assert_eq!(parse_tracking(""), Tracking::default());
        assert!(parse_tracking("[gone]").gone);
    }

    #[test]
    fn remote_symbolic_head_is_dropped() {
        let raw = "origin\0aaa1111\0refs/remotes/origin/main\n\
                   origin/HEAD\0aaa1111\0refs/remotes/origin/main\n\
                   origin/main\0aaa1111\0\n\
                   upstream/dev\0bbb2222\0\n";
        let names = parse_remote_branches(raw)
            .into_iter()
            .map(|b| b.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["origin/main", "upstream/dev"]);
    }

    #[test]
    fn tags_parse_name_date_and_subject() {
        let raw = "v1.1\02024-03-02 10:00:00 +0000\0second release\nv1.0\02024-03-01 10:00:00 +0000\0\n";
        let tags = parse_tags(raw);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "v1.1");
        assert_eq!(tags[0].message, "second release");
        assert_eq!(tags[1].message, "");
    }

    #[test]
    fn tree_node_can_be_both_branch_and_folder() {
        let branches = vec![
            branch("main"),
            branch("feature/login"),
            branch("feature"),
            branch("feature/api/v2"),
            branch("bugfix/crash"),
        ];
        let tree = build_branch_tree(&branches);

        let segments = tree.iter().map(|n| n.segment.as_str()).collect::<Vec<_>>();
        assert_eq!(segments, vec!["main", "feature", "bugfix"]);

        let feature = &tree[1];
        assert_eq!(feature.path, "feature");
        assert_eq!(feature.branch.as_ref().map(|b| b.name.as_str()), Some("feature"));
        assert!(feature.is_folder());
        let children = feature
            .children
            .iter()
            .map(|n| n.segment.as_str())
            .collect::<Vec<_>>();
        assert_eq!(children, vec!["login", "api"]);

        let api = &feature.children[1];
        assert!(api.branch.is_none());
        assert_eq!(api.children[0].path, "feature/api/v2");
        assert_eq!(
            api.children[0].branch.as_ref().map(|b| b.name.as_str()),
            Some("feature/api/v2")
        );

        assert!(!tree[0].is_folder());
    }

    #[test]
    fn grouping_uses_first_segment_in_first_seen_order() {
        let branches = vec![
            branch("feature/a"),
            branch("main"),
            branch("bugfix/b"),
            branch("feature/c/d"),
            branch("dev"),
        ];
        let groups = group_branches_by_prefix(&branches);
        let summary = groups
            .iter()
            .map(|g| {
                (
                    g.prefix.as_str(),
                    g.branches.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("feature", vec!["feature/a", "feature/c/d"]),
                ("", vec!["main", "dev"]),
                ("bugfix", vec!["bugfix/b"]),
            ]
        );
    }

    #[test]
    fn filtering_is_case_insensitive() {
        let branches = vec![branch("Feature/Login"), branch("main"), branch("release")];
        let hits = filter_branches(&branches, "LOG");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Feature/Login");
        assert_eq!(filter_branches(&branches, "  ").len(), 3);
        assert!(filter_branches(&branches, "nope").is_empty());
    }

    #[test]
    fn list_branches_and_tags_from_a_clone() {
        let upstream = init_repo("branch-upstream");
        commit_file(&upstream, "a.txt", "a\n", "base");
        run_git(&upstream, &["tag", "-a", "v1.0", "-m", "first release"]);
        run_git(&upstream, &["branch", "feature/x"]);

        let parent = unique_temp_dir("branch-clone");
        let clone = parent.join("clone");
        run_git(
            &parent,
            &["clone", upstream.to_str().expect("utf-8 path"), "clone"],
        );
        run_git(&clone, &["config", "user.name", "Test User"]);
        run_git(&clone, &["config", "user.email", "test@example.com"]);
        commit_file(&clone, "b.txt", "b\n", "local work");

        let git = GitCli::default();
        let repo = discover_repo(&clone, &git).expect("discover clone");
        let listing = list_branches(&repo, &git);

        assert_eq!(listing.current, "main");
        assert_eq!(listing.local.len(), 1);
        assert!(listing.local[0].is_current);
        assert_eq!(listing.local[0].tracking.map(|t| t.ahead), Some(1));

        let remote = listing
            .remote
            .iter()
            .map(|b| b.name.as_str())
            .collect::<Vec<_>>();
        assert!(remote.contains(&"origin/main"));
        assert!(remote.contains(&"origin/feature/x"));
        assert!(remote.iter().all(|name| !name.ends_with("HEAD") && *name != "origin"));

        let tags = list_tags(&repo, &git);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "v1.0");
        assert_eq!(tags[0].message, "first release");

        let _ = fs::remove_dir_all(&upstream);
        let _ = fs::remove_dir_all(&parent);
    }
}
