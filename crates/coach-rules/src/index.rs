//! Content-hash deduplicated instruction index and its per-root cache.
//!
//! The same guideline document is often checked in under several paths
//! (`AGENTS.md` next to `CLAUDE.md`, vendored copies, ...). [`InstructionIndex`]
//! keys every file by the SHA-256 of its bytes, so a document is parsed once
//! and later copies only add their path to the existing record.
//!
//! [`InstructionCache`] keeps one index per normalized project root. The
//! first request for a root builds the index; concurrent first requests for
//! the same root wait on the same build instead of racing.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use coach_core::AgentRule;
use coach_settings::RulesSettings;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::discovery::Discovery;
use crate::errors::{Result, RulesError};
use crate::extract::extract_rules;

// ─────────────────────────────────────────────────────────────────────────────
// Index
// ─────────────────────────────────────────────────────────────────────────────

/// One unique instruction document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionRecord {
    /// Hex SHA-256 of the file bytes.
    pub hash: String,
    /// First path ingested with this content.
    pub canonical_path: PathBuf,
    /// Rules extracted from the canonical file.
    pub rules: Vec<AgentRule>,
    /// File size in bytes.
    pub size: usize,
    /// Every path seen with this content, canonical included.
    pub paths: BTreeSet<PathBuf>,
}

/// Result of feeding one file to the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New content; parsed and stored.
    Added {
        /// Content hash.
        hash: String,
        /// Rules extracted.
        rule_count: usize,
    },
    /// Content already indexed under another path; not parsed again.
    Duplicate {
        /// Content hash.
        hash: String,
        /// Path the content was first seen at.
        canonical_path: PathBuf,
    },
}

/// Index counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Distinct documents.
    pub unique_files: usize,
    /// Files skipped as copies of an indexed document.
    pub duplicate_files: usize,
    /// Rules across all distinct documents.
    pub rule_count: usize,
}

/// Instruction documents of one project root, keyed by content hash.
#[derive(Debug, Default)]
pub struct InstructionIndex {
    records: HashMap<String, InstructionRecord>,
    order: Vec<String>,
    duplicates: usize,
}

impl InstructionIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover and ingest every instruction file under `root`.
    ///
    /// Files that cannot be read are logged and skipped.
    pub fn build(root: &Path, discovery: &Discovery) -> Self {
        let mut index = Self::new();
        for path in discovery.discover(root) {
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let _ = index.ingest(&path, &bytes);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to read instruction file, skipping");
                }
            }
        }
        let stats = index.stats();
        info!(
            root = %root.display(),
            rules = stats.rule_count,
            unique_files = stats.unique_files,
            duplicate_files = stats.duplicate_files,
            "loaded agent rules"
        );
        index
    }

    /// Add one file. Content already present only records the extra path.
    pub fn ingest(&mut self, path: &Path, bytes: &[u8]) -> IngestOutcome {
        let hash = hex_sha256(bytes);
        if let Some(record) = self.records.get_mut(&hash) {
            let _ = record.paths.insert(path.to_path_buf());
            self.duplicates += 1;
            debug!(path = %path.display(), canonical = %record.canonical_path.display(), "duplicate instruction file");
            return IngestOutcome::Duplicate {
                hash,
                canonical_path: record.canonical_path.clone(),
            };
        }

        let text = String::from_utf8_lossy(bytes);
        let source = path.to_string_lossy();
        let rules = extract_rules(&text, Some(source.as_ref()));
        let rule_count = rules.len();
        debug!(path = %path.display(), rule_count, "indexed instruction file");
        let record = InstructionRecord {
            hash: hash.clone(),
            canonical_path: path.to_path_buf(),
            rules,
            size: bytes.len(),
            paths: BTreeSet::from([path.to_path_buf()]),
        };
        let _ = self.records.insert(hash.clone(), record);
        self.order.push(hash.clone());
        IngestOutcome::Added { hash, rule_count }
    }

    /// Record for a content hash.
    pub fn lookup(&self, hash: &str) -> Option<&InstructionRecord> {
        self.records.get(hash)
    }

    /// Records in ingestion order.
    pub fn records(&self) -> impl Iterator<Item = &InstructionRecord> {
        self.order.iter().filter_map(|hash| self.records.get(hash))
    }

    /// Canonical rules of every document, in ingestion order.
    pub fn rules(&self) -> Vec<AgentRule> {
        self.records()
            .flat_map(|record| record.rules.iter().cloned())
            .collect()
    }

    /// Counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            unique_files: self.order.len(),
            duplicate_files: self.duplicates,
            rule_count: self.records.values().map(|r| r.rules.len()).sum(),
        }
    }
}

/// Lowercase hex SHA-256.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of [`InstructionCache::check_duplicate_instruction_file`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    /// Hex SHA-256 of the candidate.
    pub hash: String,
    /// Whether another path already provides this content.
    pub is_duplicate: bool,
    /// Canonical path of the existing copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_path: Option<PathBuf>,
}

type IndexSlot = Arc<OnceLock<Arc<InstructionIndex>>>;

/// Per-root instruction indexes, built once and shared.
#[derive(Debug)]
pub struct InstructionCache {
    discovery: Discovery,
    entries: DashMap<String, IndexSlot>,
}

impl InstructionCache {
    /// Cache that discovers files according to `settings`.
    pub fn new(settings: &RulesSettings) -> Self {
        Self {
            discovery: Discovery::new(settings),
            entries: DashMap::new(),
        }
    }

    /// Process-wide cache configured from the global settings.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<InstructionCache> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(&coach_settings::get_settings().rules))
    }

    /// Index for `root`, building it on first request.
    pub fn load(&self, root: &Path) -> Arc<InstructionIndex> {
        let key = normalize_root(root);
        let slot: IndexSlot = Arc::clone(&self.entries.entry(key).or_default());
        let index = slot.get_or_init(|| Arc::new(InstructionIndex::build(root, &self.discovery)));
        Arc::clone(index)
    }

    /// Flattened rules for `root`.
    pub fn load_rules(&self, root: &Path) -> Vec<AgentRule> {
        self.load(root).rules()
    }

    /// Whether an index for `root` has been requested.
    pub fn contains(&self, root: &Path) -> bool {
        self.entries.contains_key(&normalize_root(root))
    }

    /// Forget one root, or every root when `None`.
    pub fn clear(&self, root: Option<&Path>) {
        match root {
            Some(root) => {
                let _ = self.entries.remove(&normalize_root(root));
            }
            None => self.entries.clear(),
        }
    }

    /// Whether `file_path` repeats content already indexed under `root`.
    ///
    /// The candidate is hashed but never added to the index. Its own
    /// canonical path is not a duplicate of itself.
    pub fn check_duplicate_instruction_file(
        &self,
        root: &Path,
        file_path: &Path,
    ) -> Result<DuplicateCheck> {
        let index = self.load(root);
        let bytes = std::fs::read(file_path).map_err(|source| RulesError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;
        let hash = hex_sha256(&bytes);
        let existing = index
            .lookup(&hash)
            .filter(|record| !same_file(&record.canonical_path, file_path))
            .map(|record| record.canonical_path.clone());
        Ok(DuplicateCheck {
            hash,
            is_duplicate: existing.is_some(),
            existing_path: existing,
        })
    }
}

impl Default for InstructionCache {
    fn default() -> Self {
        Self::new(&RulesSettings::default())
    }
}

/// Cache key for a root: forward slashes, no trailing slash.
pub fn normalize_root(root: &Path) -> String {
    let raw = root.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() && raw.starts_with('/') {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;

    const DOC: &str = "## Safety\n\n- Never run rm -rf on the workspace root\n";

    #[test]
    fn hash_is_lowercase_hex() {
        assert_eq!(
            hex_sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn ingest_dedups_by_content() {
        let mut index = InstructionIndex::new();
        let first = index.ingest(Path::new("a/AGENTS.md"), DOC.as_bytes());
        assert_matches!(first, IngestOutcome::Added { rule_count: 1, .. });
        let second = index.ingest(Path::new("b/CLAUDE.md"), DOC.as_bytes());
        assert_matches!(
            second,
            IngestOutcome::Duplicate { ref canonical_path, .. } if canonical_path == Path::new("a/AGENTS.md")
        );

        let stats = index.stats();
        assert_eq!(stats.unique_files, 1);
        assert_eq!(stats.duplicate_files, 1);
        assert_eq!(stats.rule_count, 1);
        assert_eq!(index.rules().len(), 1);
        assert_eq!(index.rules()[0].source, "a/AGENTS.md");

        let record = index.lookup(&hex_sha256(DOC.as_bytes())).unwrap();
        assert_eq!(record.paths.len(), 2);
        assert_eq!(record.size, DOC.len());
    }

    #[test]
    fn rules_follow_ingestion_order() {
        let mut index = InstructionIndex::new();
        index.ingest(Path::new("z.md"), b"## Zeta\n\n- Zebra crossings -> stop\n");
        index.ingest(Path::new("a.md"), b"## Alpha\n\n- Apples always -> wash\n");
        let headings: Vec<_> = index.rules().into_iter().map(|r| r.heading).collect();
        assert_eq!(headings, vec!["Zeta: Zebra crossings", "Alpha: Apples always"]);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut index = InstructionIndex::new();
        let outcome = index.ingest(Path::new("bad.md"), b"## Broken \xff\n\nStill readable text\n");
        assert_matches!(outcome, IngestOutcome::Added { rule_count: 1, .. });
    }

    #[test]
    fn normalize_root_forms() {
        assert_eq!(normalize_root(Path::new("/repo/")), "/repo");
        assert_eq!(normalize_root(Path::new("C:\\repo\\")), "C:/repo");
        assert_eq!(normalize_root(Path::new("/")), "/");
    }

    #[test]
    fn cache_builds_once_and_clears() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("AGENTS.md"), DOC).unwrap();
        let cache = InstructionCache::default();

        let first = cache.load(tmp.path());
        let second = cache.load(tmp.path());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(tmp.path()));

        cache.clear(Some(tmp.path()));
        assert!(!cache.contains(tmp.path()));
        let rebuilt = cache.load(tmp.path());
        assert!(!Arc::ptr_eq(&first, &rebuilt));

        cache.clear(None);
        assert!(!cache.contains(tmp.path()));
    }

    #[test]
    fn concurrent_first_loads_share_one_index() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("AGENTS.md"), DOC).unwrap();
        let cache = Arc::new(InstructionCache::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let root = tmp.path().to_path_buf();
                std::thread::spawn(move || cache.load(&root))
            })
            .collect();
        let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(indexes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn duplicate_check_cases() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("AGENTS.md"), DOC).unwrap();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/AGENTS.md"), DOC).unwrap();
        let outside = root.join("candidate.md");
        fs::write(&outside, DOC).unwrap();
        let fresh = root.join("fresh.md");
        fs::write(&fresh, "## New\n\nUnrelated content here\n").unwrap();

        let cache = InstructionCache::default();

        let canonical = cache
            .check_duplicate_instruction_file(root, &root.join("AGENTS.md"))
            .unwrap();
        assert!(!canonical.is_duplicate);
        assert_eq!(canonical.existing_path, None);

        let copy = cache
            .check_duplicate_instruction_file(root, &root.join("pkg/AGENTS.md"))
            .unwrap();
        assert!(copy.is_duplicate);
        assert_eq!(copy.existing_path, Some(root.join("AGENTS.md")));

        let candidate = cache.check_duplicate_instruction_file(root, &outside).unwrap();
        assert!(candidate.is_duplicate);
        assert_eq!(candidate.hash, hex_sha256(DOC.as_bytes()));

        let unknown = cache.check_duplicate_instruction_file(root, &fresh).unwrap();
        assert!(!unknown.is_duplicate);

        // Candidates are never added.
        assert_eq!(cache.load(root).stats().unique_files, 1);
        assert_eq!(cache.load(root).stats().duplicate_files, 1);
    }

    #[test]
    fn duplicate_check_reports_unreadable_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.md");
        let err = InstructionCache::default()
            .check_duplicate_instruction_file(tmp.path(), &missing)
            .unwrap_err();
        assert_matches!(err, RulesError::Io { ref path, .. } if *path == missing);
    }
}
