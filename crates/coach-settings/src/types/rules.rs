//! Instruction file discovery settings.

use serde::{Deserialize, Serialize};

/// Glob patterns (relative to the project root) recognised as instruction files.
pub const DEFAULT_INSTRUCTION_PATTERNS: &[&str] = &[
    "**/CLAUDE.md",
    "**/.ruler/*.md",
    "**/.cursor/rules/*.md",
    "**/AGENTS.md",
    "docs/agents/**/*.md",
];

/// Directory paths (relative, forward-slash) never descended into.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &["node_modules", "dist", ".git", "tests/fixtures"];

/// Where instruction files are looked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesSettings {
    /// Glob patterns matched against root-relative paths.
    pub patterns: Vec<String>,
    /// Directory names, or root-relative directory paths, to skip.
    pub ignore_dirs: Vec<String>,
    /// Maximum directory depth below the root.
    pub max_depth: usize,
}

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_INSTRUCTION_PATTERNS.iter().map(|s| (*s).to_owned()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| (*s).to_owned()).collect(),
            max_depth: 12,
        }
    }
}
