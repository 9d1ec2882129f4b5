pub mod actions;
pub mod blob;
pub mod branch;
pub mod command;
pub mod diff;
pub mod error;
pub mod log;
pub mod repo;
pub mod stash;
pub mod status;
pub mod update;

#[cfg(test)]
mod test_support;

pub use actions::*;
pub use blob::*;
pub use branch::*;
pub use command::*;
pub use diff::*;
pub use error::*;
pub use log::*;
pub use repo::*;
pub use stash::*;
pub use status::*;
pub use update::*;

#[cfg(test)]
mod tests {
    use super::{
        build_branch_tree, parse_unified_diff, reconcile_status, BranchTreeNode, GitCli,
        GitError, LogQuery, RepoActions, RepoHandle, StatusRecord,
    };
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_runner_and_query_types() {
        let _ = TypeId::of::<GitCli>();
        let _ = TypeId::of::<GitError>();
        let _ = TypeId::of::<RepoHandle>();
        let _ = TypeId::of::<LogQuery>();
        let _ = TypeId::of::<RepoActions>();
        let _ = TypeId::of::<BranchTreeNode>();
    }

    #[test]
    fn crate_root_reexports_pure_parsers() {
        assert!(parse_unified_diff("").expect("empty diff").is_empty());
        assert!(reconcile_status(&[StatusRecord::Untracked {
            path: "x".to_string()
        }])[0]
            .untracked);
        assert!(build_branch_tree(&[]).is_empty());
    }
}
