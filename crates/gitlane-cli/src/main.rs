mod cli;

use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use clap::Parser;
use gitlane_core::config::{load_config, load_config_or_default, ConfigError, GitlaneConfig};
use gitlane_core::types::{ActionOutcome, Commit, RepoInfo};
use gitlane_core::validation::{Validate, ValidationIssue, ValidationLevel};
use gitlane_git::{
    build_branch_tree, commit_detail, commit_diff, commit_files, discover_repo, file_blob,
    file_diff, filter_branches, find_repositories, group_branches_by_prefix, list_branches,
    list_stashes, list_tags, load_log, load_status, repo_info, stash_file_diff, stash_files,
    update_repo, workdir_blob, workdir_diff, GitCli, GitError, LogQuery, RepoActions, RepoHandle,
};
use gitlane_graph::{assign_lanes, visible_lane_count, LaneAssignment, Palette};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{
    BranchCommand, BranchesArgs, Cli, Command, LogArgs, PathArgs, StashCommand, UpdateArgs,
};

const LOG_ENV: &str = "GITLANE_LOG";
const DEFAULT_CONFIG_RELATIVE: &str = "gitlane/config.toml";

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("failed to load config at {path}: {source}")]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("{0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("commit not found: {0}")]
    CommitNotFound(String),
    #[error("{0}")]
    ActionFailed(String),
    #[error("failed to serialize output as json: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("gitlane: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), MainError> {
    let config = resolve_config(cli.config.as_deref())?;
    let git = GitCli::new(config.git.binary.clone());

    match cli.command {
        Command::Scan(args) => {
            let reports = find_repositories(&args.dir, args.depth)
                .into_iter()
                .map(|path| ScanReport {
                    info: discover_repo(&path, &git)
                        .map(|repo| repo_info(&repo, &git))
                        .unwrap_or_default(),
                    path,
                })
                .collect::<Vec<_>>();
            print_json(&reports)
        }
        Command::Update(args) => run_update(&git, &cli.repo, args),
        command => {
            let repo = discover_repo(&cli.repo, &git)?;
            run_in_repo(&config, &git, &repo, command)
        }
    }
}

fn run_in_repo(
    config: &GitlaneConfig,
    git: &GitCli,
    repo: &RepoHandle,
    command: Command,
) -> Result<(), MainError> {
    let actions = RepoActions::for_repo(git.clone(), repo);
    match command {
        Command::Log(args) => print_json(&build_log_view(config, git, repo, &args)),
        Command::Status => print_json(&load_status(repo, git)),
        Command::Files { hash } => print_json(&commit_files(repo, git, &hash)),
        Command::Diff { hash, path } => {
            let diff = match path {
                Some(path) => file_diff(repo, git, &hash, &path)?,
                None => commit_diff(repo, git, &hash)?,
            };
            print_json(&diff)
        }
        Command::WorkdirDiff { path } => print_json(&workdir_diff(repo, git, &path)?),
        Command::Show { hash } => {
            let detail = commit_detail(repo, git, &hash).ok_or(MainError::CommitNotFound(hash))?;
            print_json(&detail)
        }
        Command::Blob { rev, path } => print_json(&file_blob(repo, git, &rev, &path)?),
        Command::WorkdirBlob { path } => print_json(&workdir_blob(repo, &path)?),
        Command::Branches(args) => print_branches(git, repo, &args),
        Command::Tags => print_json(&list_tags(repo, git)),
        Command::Stashes => print_json(&list_stashes(repo, git)),
        Command::Info => print_json(&repo_info(repo, git)),
        Command::Stage(PathArgs { path, all }) => match path {
            Some(path) if !all => report_action(actions.stage(&path)),
            _ => report_action(actions.stage_all()),
        },
        Command::Unstage(PathArgs { path, all }) => match path {
            Some(path) if !all => report_action(actions.unstage(&path)),
            _ => report_action(actions.unstage_all()),
        },
        Command::Commit { message } => report_action(actions.commit(&message)),
        Command::Checkout { branch } => report_action(actions.checkout(&branch)),
        Command::Branch(BranchCommand::Create { name, from }) => {
            report_action(actions.create_branch(&name, from.as_deref()))
        }
        Command::Branch(BranchCommand::Delete { name, force }) => {
            report_action(actions.delete_branch(&name, force))
        }
        Command::Fetch => report_action(actions.fetch()),
        Command::Pull => report_action(actions.pull()),
        Command::Push { force } => report_action(actions.push(force)),
        Command::Stash(stash) => match stash {
            StashCommand::Push { message } => report_action(actions.stash_push(message.as_deref())),
            StashCommand::Pop { stash } => report_action(actions.stash_pop(stash.as_deref())),
            StashCommand::Apply { stash } => report_action(actions.stash_apply(stash.as_deref())),
            StashCommand::Drop { stash } => report_action(actions.stash_drop(&stash)),
            StashCommand::Clear => report_action(actions.stash_clear()),
            StashCommand::Files { stash } => print_json(&stash_files(repo, git, &stash)),
            StashCommand::Diff { stash, path } => {
                print_json(&stash_file_diff(repo, git, &stash, &path)?)
            }
        },
        Command::Scan(_) | Command::Update(_) => Ok(()),
    }
}

/// Explicit path: must exist. Default path: missing file means defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<GitlaneConfig, MainError> {
    let config = match explicit {
        Some(path) => load_config(path).map_err(|source| MainError::LoadConfig {
            path: path.to_path_buf(),
            source,
        })?,
        None => match dirs::config_dir().map(|dir| dir.join(DEFAULT_CONFIG_RELATIVE)) {
            Some(path) => load_config_or_default(&path)
                .map_err(|source| MainError::LoadConfig { path, source })?,
            None => GitlaneConfig::default(),
        },
    };
    check_config(&config.validate())?;
    Ok(config)
}

fn check_config(issues: &[ValidationIssue]) -> Result<(), MainError> {
    for issue in issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Warning)
    {
        warn!(code = %issue.code, "{}", issue.message);
    }

    let errors = issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Error)
        .collect::<Vec<_>>();
    if errors.is_empty() {
        return Ok(());
    }

    let rendered = errors
        .iter()
        .map(|issue| format!("{}: {}", issue.code, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(MainError::InvalidConfig(format!(
        "config validation failed ({rendered})"
    )))
}

#[derive(Debug, Serialize)]
struct LogRow {
    #[serde(flatten)]
    commit: Commit,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<LaneAssignment>,
}

#[derive(Debug, Serialize)]
struct LogView {
    rows: Vec<LogRow>,
    max_lane: usize,
    visible_lanes: usize,
}

fn build_log_view(
    config: &GitlaneConfig,
    git: &GitCli,
    repo: &RepoHandle,
    args: &LogArgs,
) -> LogView {
    let mut query = LogQuery::from(&config.log);
    if let Some(limit) = args.limit {
        query.limit = limit;
    }
    if args.current_only {
        query.show_all = false;
    }
    query.branch = args.branch.clone();

    let commits = load_log(repo, git, &query);
    let lanes = if args.no_graph {
        Vec::new()
    } else {
        assign_lanes(&commits, Palette::new(config.graph.palette.clone()))
    };
    let max_lane = lanes.first().map(|lane| lane.max_lane).unwrap_or(0);
    let visible_lanes = if lanes.is_empty() {
        0
    } else {
        visible_lane_count(max_lane, config.graph.max_visible_lanes)
    };

    let mut lanes = lanes.into_iter();
    let rows = commits
        .into_iter()
        .map(|commit| LogRow {
            commit,
            graph: lanes.next(),
        })
        .collect();

    LogView {
        rows,
        max_lane,
        visible_lanes,
    }
}

fn print_branches(git: &GitCli, repo: &RepoHandle, args: &BranchesArgs) -> Result<(), MainError> {
    let mut listing = list_branches(repo, git);
    if let Some(query) = &args.filter {
        listing.local = filter_branches(&listing.local, query)
            .into_iter()
            .cloned()
            .collect();
        listing.remote = filter_branches(&listing.remote, query)
            .into_iter()
            .cloned()
            .collect();
    }

    if args.tree {
        print_json(&serde_json::json!({
            "current": listing.current,
            "local": build_branch_tree(&listing.local),
            "remote": build_branch_tree(&listing.remote),
        }))
    } else if args.grouped {
        print_json(&serde_json::json!({
            "current": listing.current,
            "local": group_branches_by_prefix(&listing.local),
            "remote": group_branches_by_prefix(&listing.remote),
        }))
    } else {
        print_json(&listing)
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    path: PathBuf,
    info: RepoInfo,
}

#[derive(Debug, Serialize)]
struct UpdateReport {
    repo: PathBuf,
    #[serde(flatten)]
    outcome: ActionOutcome,
}

/// Updates each repository on its own thread; reports keep input order.
fn run_update(git: &GitCli, default_repo: &Path, args: UpdateArgs) -> Result<(), MainError> {
    let repos = if args.repos.is_empty() {
        vec![default_repo.to_path_buf()]
    } else {
        args.repos
    };

    let reports = thread::scope(|scope| {
        let handles = repos
            .iter()
            .map(|path| scope.spawn(move || update_one(git, path)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .zip(&repos)
            .map(|(handle, path)| {
                handle.join().unwrap_or_else(|_| UpdateReport {
                    repo: path.clone(),
                    outcome: ActionOutcome::failure("update thread panicked"),
                })
            })
            .collect::<Vec<_>>()
    });

    print_json(&reports)?;
    let failed = reports.iter().filter(|report| !report.outcome.success).count();
    if failed > 0 {
        return Err(MainError::ActionFailed(format!(
            "{failed} of {} repositories failed to update",
            reports.len()
        )));
    }
    Ok(())
}

fn update_one(git: &GitCli, path: &Path) -> UpdateReport {
    let outcome = match discover_repo(path, git) {
        Ok(repo) => update_repo(&repo, git, |percent, message| {
            info!(repo = %path.display(), percent, "{message}");
        }),
        Err(err) => ActionOutcome::failure(err.to_string()),
    };
    UpdateReport {
        repo: path.to_path_buf(),
        outcome,
    }
}

fn report_action(outcome: ActionOutcome) -> Result<(), MainError> {
    print_json(&outcome)?;
    if outcome.success {
        return Ok(());
    }
    Err(MainError::ActionFailed(
        outcome.error.unwrap_or_else(|| "action failed".to_string()),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), MainError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|source| MainError::Serialize { source })?;
    println!("{rendered}");
    Ok(())
}
