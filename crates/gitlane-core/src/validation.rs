//! Validation for loaded configuration.

use serde::{Deserialize, Serialize};

use crate::config::GitlaneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for GitlaneConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.git.binary.as_os_str().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "git.binary.empty",
                message: "git binary path must not be empty".to_string(),
            });
        }

        if self.log.limit == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "log.limit.zero",
                message: "log limit is 0, no commit would ever be listed".to_string(),
            });
        }

        if self.graph.palette.is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "graph.palette.empty",
                message: "lane palette needs at least one colour".to_string(),
            });
        }

        for color in &self.graph.palette {
            if !is_hex_color(color) {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "graph.palette.not_hex",
                    message: format!("palette entry {color:?} is not a #rrggbb colour"),
                });
            }
        }

        if self.graph.max_visible_lanes == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "graph.max_visible_lanes.zero",
                message: "max_visible_lanes must be greater than zero".to_string(),
            });
        }

        issues
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
