//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "gitlane",
    version,
    about = "Inspect git repositories as JSON: commit graph lanes, diffs, status, branches",
    after_help = "Logs go to stderr (GITLANE_LOG=debug or -vv); JSON goes to stdout."
)]
pub struct Cli {
    /// Repository to operate on (any path inside its working tree)
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Config file (default: ~/.config/gitlane/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Commit log with graph lanes
    Log(LogArgs),
    /// Working-tree status, unstaged entries first
    Status,
    /// Files changed by a commit
    Files { hash: String },
    /// Diff of a commit, or of one file in it
    Diff { hash: String, path: Option<String> },
    /// Staged diff of a file, or its unstaged diff when nothing is staged
    WorkdirDiff { path: String },
    /// Commit detail
    Show { hash: String },
    /// File content at a revision
    Blob { rev: String, path: String },
    /// File content in the working tree
    WorkdirBlob { path: String },
    /// Local and remote branches
    Branches(BranchesArgs),
    /// Tags, newest first
    Tags,
    /// Stash entries
    Stashes,
    /// Branch, dirty state and ahead/behind counts
    Info,
    /// Find repositories below a directory
    Scan(ScanArgs),
    /// Fetch and pull every branch that is behind, for one or more repositories
    Update(UpdateArgs),
    /// Stage a path, or everything with --all
    Stage(PathArgs),
    /// Unstage a path, or everything with --all
    Unstage(PathArgs),
    /// Commit staged changes
    Commit {
        #[arg(short, long)]
        message: String,
    },
    /// Switch branches
    Checkout { branch: String },
    /// Create or delete a branch
    #[command(subcommand)]
    Branch(BranchCommand),
    /// Fetch all remotes, pruning deleted branches
    Fetch,
    Pull,
    Push {
        /// Use --force-with-lease
        #[arg(long)]
        force: bool,
    },
    /// Stash operations
    #[command(subcommand)]
    Stash(StashCommand),
}

#[derive(Args, Debug, Default)]
pub struct LogArgs {
    /// Only commits reachable from this ref
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Maximum number of commits (default from config)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Only the checked-out branch instead of every ref
    #[arg(long)]
    pub current_only: bool,

    /// Skip lane assignment
    #[arg(long)]
    pub no_graph: bool,
}

#[derive(Args, Debug, Default)]
pub struct BranchesArgs {
    /// Nest branches by `/`-separated name segments
    #[arg(long, conflicts_with = "grouped")]
    pub tree: bool,

    /// Group branches by their first name segment
    #[arg(long)]
    pub grouped: bool,

    /// Case-insensitive name filter
    #[arg(short, long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to search
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// How many directory levels to descend
    #[arg(long, default_value_t = gitlane_git::DEFAULT_SCAN_DEPTH)]
    pub depth: usize,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Repositories to update (default: --repo)
    pub repos: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub path: Option<String>,

    #[arg(short, long)]
    pub all: bool,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommand {
    /// Create a branch and switch to it
    Create {
        name: String,
        /// Start point (default HEAD)
        #[arg(long)]
        from: Option<String>,
    },
    Delete {
        name: String,
        /// Delete even if not merged (-D)
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StashCommand {
    Push {
        #[arg(short, long)]
        message: Option<String>,
    },
    Pop { stash: Option<String> },
    Apply { stash: Option<String> },
    Drop { stash: String },
    Clear,
    /// Files recorded in a stash
    Files { stash: String },
    /// Diff of one file in a stash
    Diff { stash: String, path: String },
}
