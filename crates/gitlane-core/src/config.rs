//! Configuration for the git adapter and the graph layout.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_LIMIT: usize = 300;
pub const DEFAULT_MAX_VISIBLE_LANES: usize = 16;

pub const DEFAULT_LANE_PALETTE: [&str; 12] = [
    "#4c9be8", "#e8804c", "#9b59b6", "#27ae60", "#e74c3c", "#16a085", "#f39c12", "#2980b9",
    "#8e44ad", "#1abc9c", "#d35400", "#2ecc71",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to create config parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitlaneConfig {
    pub git: GitSettings,
    pub log: LogSettings,
    pub graph: GraphSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Executable used for every subprocess call.
    pub binary: PathBuf,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub limit: usize,
    /// Include every ref (`--all`) when no branch filter is given.
    pub show_all: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LOG_LIMIT,
            show_all: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub palette: Vec<String>,
    /// Display clamp; lane assignment itself is unbounded.
    pub max_visible_lanes: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            palette: DEFAULT_LANE_PALETTE.iter().map(|c| c.to_string()).collect(),
            max_visible_lanes: DEFAULT_MAX_VISIBLE_LANES,
        }
    }
}

pub fn parse_config(contents: &str) -> Result<GitlaneConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<GitlaneConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}

/// Loads `path` when it exists, otherwise returns the built-in defaults.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<GitlaneConfig, ConfigError> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Ok(GitlaneConfig::default());
    }
    load_config(path_ref)
}

pub fn save_config(path: impl AsRef<Path>, config: &GitlaneConfig) -> Result<(), ConfigError> {
    let path_ref = path.as_ref();
    let parent = path_ref.parent().map(Path::to_path_buf);
    if let Some(parent_dir) = parent {
        fs::create_dir_all(&parent_dir).map_err(|source| ConfigError::CreateDir {
            path: parent_dir,
            source,
        })?;
    }

    let body = toml::to_string_pretty(config).map_err(|source| ConfigError::Serialize {
        path: path_ref.to_path_buf(),
        source,
    })?;
    fs::write(path_ref, body).map_err(|source| ConfigError::Write {
        path: path_ref.to_path_buf(),
        source,
    })?;
    Ok(())
}
