//! Instruction file discovery.
//!
//! Walks a project tree and returns every file whose root-relative path
//! matches one of the configured glob patterns (`**/AGENTS.md`,
//! `**/.ruler/*.md`, ...). Ignored directories are pruned before descent.

use std::path::{Path, PathBuf};

use coach_settings::RulesSettings;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Compiled discovery configuration.
#[derive(Clone, Debug)]
pub struct Discovery {
    patterns: GlobSet,
    ignore_dirs: Vec<String>,
    max_depth: usize,
}

impl Discovery {
    /// Compile the patterns in `settings`. Invalid patterns are logged and skipped.
    pub fn new(settings: &RulesSettings) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &settings.patterns {
            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    let _ = builder.add(glob);
                }
                Err(error) => warn!(%pattern, %error, "invalid instruction glob, skipping"),
            }
        }
        let patterns = builder.build().unwrap_or_else(|error| {
            warn!(%error, "failed to compile instruction globs");
            GlobSet::empty()
        });
        Self {
            patterns,
            ignore_dirs: settings
                .ignore_dirs
                .iter()
                .map(|d| d.trim_matches('/').to_owned())
                .collect(),
            max_depth: settings.max_depth,
        }
    }

    /// Whether a root-relative path names an instruction file.
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns.is_match(relative)
    }

    fn is_ignored_dir(&self, relative: &str, name: &str) -> bool {
        self.ignore_dirs
            .iter()
            .any(|ignored| ignored == name || ignored == relative)
    }

    /// Every instruction file under `root`, sorted by path.
    ///
    /// Unreadable directories are logged and skipped.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(root)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let relative = relative_path(root, entry.path());
                !self.is_ignored_dir(&relative, &entry.file_name().to_string_lossy())
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "skipping unreadable path during discovery");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if self.matches(&relative_path(root, entry.path())) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        debug!(root = %root.display(), count = files.len(), "discovered instruction files");
        files
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(&RulesSettings::default())
    }
}

/// `path` relative to `root`, forward-slash separated.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Discover instruction files under `root` with the given settings.
pub fn discover_instruction_files(root: &Path, settings: &RulesSettings) -> Vec<PathBuf> {
    Discovery::new(settings).discover(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# Rules\n").unwrap();
    }

    fn found(root: &Path) -> Vec<String> {
        Discovery::default()
            .discover(root)
            .iter()
            .map(|p| relative_path(root, p))
            .collect()
    }

    #[test]
    fn finds_default_patterns_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "AGENTS.md");
        touch(root, "CLAUDE.md");
        touch(root, "pkg/api/AGENTS.md");
        touch(root, ".ruler/style.md");
        touch(root, ".cursor/rules/testing.md");
        touch(root, "docs/agents/deep/ops.md");
        touch(root, "README.md");
        touch(root, "docs/other/AGENT.md");

        assert_eq!(
            found(root),
            vec![
                ".cursor/rules/testing.md",
                ".ruler/style.md",
                "AGENTS.md",
                "CLAUDE.md",
                "docs/agents/deep/ops.md",
                "pkg/api/AGENTS.md",
            ]
        );
    }

    #[test]
    fn ruler_glob_does_not_cross_directories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), ".ruler/nested/deep.md");
        assert!(found(tmp.path()).is_empty());
    }

    #[test]
    fn ignored_directories_are_pruned() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "node_modules/pkg/AGENTS.md");
        touch(root, "web/dist/AGENTS.md");
        touch(root, "tests/fixtures/AGENTS.md");
        touch(root, "tests/AGENTS.md");
        assert_eq!(found(root), vec!["tests/AGENTS.md"]);
    }

    #[test]
    fn custom_patterns() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "RULES.md");
        touch(tmp.path(), "AGENTS.md");
        let settings = RulesSettings {
            patterns: vec!["RULES.md".into(), "[".into()],
            ..RulesSettings::default()
        };
        let files = discover_instruction_files(tmp.path(), &settings);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("RULES.md"));
    }

    #[test]
    fn missing_root_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(found(&tmp.path().join("absent")).is_empty());
    }
}
