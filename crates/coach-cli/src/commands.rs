//! Subcommand implementations.
//!
//! Each command has a pure half that takes an explicit [`InstructionCache`]
//! and returns a value, and a thin printing wrapper over the global cache.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use coach_context::{
    ContextAssemblyResult, ContextLimits, ContextRequest, ProviderConfig, assemble_context,
    resolve_timeline_context,
};
use coach_core::{AgentRule, ChatMessage, MisalignmentRecord, MisalignmentStatus, SessionSnapshot};
use coach_detect::{
    DetectionInput, DetectionOutcome, GateDecision, GateInput, GateSource, Remediation,
    detect_misalignments, evaluate_content, select_primary,
};
use coach_rules::InstructionCache;
use coach_settings::get_settings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

// =============================================================================
// Helpers
// =============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), read_json)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_rules(cache: &InstructionCache, root: &Path) -> Vec<AgentRule> {
    let index = cache.load(root);
    let stats = index.stats();
    info!(
        root = %root.display(),
        unique_files = stats.unique_files,
        duplicate_files = stats.duplicate_files,
        rules = stats.rule_count,
        "instruction rules loaded"
    );
    index.rules()
}

// =============================================================================
// rules / check-duplicate
// =============================================================================

/// Print the rules discovered under `root`.
pub fn rules(root: &Path, json: bool) -> Result<()> {
    let rules = load_rules(InstructionCache::global(), root);
    if json {
        return print_json(&rules);
    }
    for rule in &rules {
        println!("{}\t[{}]\t{}", rule.id, rule.severity.label(), rule.heading);
    }
    Ok(())
}

/// Print whether `file` duplicates an indexed instruction file.
pub fn check_duplicate(root: &Path, file: &Path) -> Result<()> {
    let check = InstructionCache::global().check_duplicate_instruction_file(root, file)?;
    print_json(&check)
}

// =============================================================================
// detect
// =============================================================================

/// Detect misalignments in the session at `session`.
pub fn detect(root: &Path, session: &Path, existing: Option<&Path>) -> Result<()> {
    let snapshot: SessionSnapshot = read_json(session)?;
    let existing: Vec<MisalignmentRecord> = read_optional(existing)?;
    let outcome = run_detection(InstructionCache::global(), root, &snapshot, &existing);
    print_json(&outcome)
}

fn run_detection(
    cache: &InstructionCache,
    root: &Path,
    snapshot: &SessionSnapshot,
    existing: &[MisalignmentRecord],
) -> DetectionOutcome {
    detect_with(&load_rules(cache, root), snapshot, existing)
}

fn detect_with(
    rules: &[AgentRule],
    snapshot: &SessionSnapshot,
    existing: &[MisalignmentRecord],
) -> DetectionOutcome {
    let outcome = detect_misalignments(
        &DetectionInput::new(&snapshot.session_id, &snapshot.events, rules).with_existing(existing),
    );
    for warning in &outcome.warnings {
        warn!(session_id = %snapshot.session_id, "{warning}");
    }
    outcome
}

// =============================================================================
// context
// =============================================================================

/// Arguments of the `context` command.
pub struct ContextArgs<'a> {
    pub root: &'a Path,
    pub session: &'a Path,
    pub existing: Option<&'a Path>,
    pub history: Option<&'a Path>,
    pub prompt: &'a str,
    pub json: bool,
}

/// Detect, resolve timeline references and print the assembled prompt.
pub fn context(args: &ContextArgs<'_>) -> Result<()> {
    let snapshot: SessionSnapshot = read_json(args.session)?;
    let existing: Vec<MisalignmentRecord> = read_optional(args.existing)?;
    let history: Vec<ChatMessage> = read_optional(args.history)?;
    let settings = get_settings();

    let result = build_context(
        InstructionCache::global(),
        args.root,
        &snapshot,
        &existing,
        &history,
        args.prompt,
        ProviderConfig::from(&settings.provider),
        ContextLimits::from(&settings.context),
    );
    if args.json {
        return print_json(&result);
    }
    println!("{}", result.prompt);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_context(
    cache: &InstructionCache,
    root: &Path,
    snapshot: &SessionSnapshot,
    existing: &[MisalignmentRecord],
    history: &[ChatMessage],
    prompt: &str,
    provider: ProviderConfig,
    limits: ContextLimits,
) -> ContextAssemblyResult {
    let rules = load_rules(cache, root);
    let outcome = detect_with(&rules, snapshot, existing);

    let records: Vec<MisalignmentRecord> = existing
        .iter()
        .chain(&outcome.misalignments)
        .cloned()
        .collect();
    let active: Vec<MisalignmentRecord> = records.iter().filter(|r| r.is_active()).cloned().collect();
    let remediation = select_primary(&active).map(Remediation::from);
    let timeline = resolve_timeline_context(snapshot, prompt, remediation.as_ref(), limits.timeline());

    let mut request = ContextRequest::new(snapshot)
        .with_misalignments(&records)
        .with_history(history)
        .with_rules(&rules)
        .with_provider(provider);
    request.limits = limits;
    if let Some(section) = timeline.section {
        request = request.with_section(section);
    }

    let result = assemble_context(&request);
    info!(
        session_id = %snapshot.session_id,
        sections = result.sections.len(),
        used_tokens = result.used_tokens,
        trimmed = ?result.trimmed_section_ids,
        references = timeline.references.len(),
        "coaching context ready"
    );
    result
}

// =============================================================================
// gate
// =============================================================================

/// Print the gate decision for `content`.
pub fn gate(root: &Path, content: &str, source: GateSource, session: Option<&Path>) -> Result<()> {
    let snapshot: Option<SessionSnapshot> = session.map(read_json).transpose()?;
    let decision = run_gate(InstructionCache::global(), root, content, source, snapshot.as_ref());
    print_json(&decision)
}

fn run_gate(
    cache: &InstructionCache,
    root: &Path,
    content: &str,
    source: GateSource,
    snapshot: Option<&SessionSnapshot>,
) -> GateDecision {
    let rules = load_rules(cache, root);
    let session_id = snapshot.map_or_else(|| "manual".into(), |s| s.session_id.clone());
    evaluate_content(&GateInput {
        session_id: &session_id,
        source,
        content,
        rules: &rules,
        snapshot,
    })
}

// =============================================================================
// status
// =============================================================================

/// Transition one stored record and rewrite the file.
pub fn set_status(records_path: &Path, id: &str, status: MisalignmentStatus) -> Result<()> {
    let mut records: Vec<MisalignmentRecord> = read_json(records_path)?;
    let updated = transition_record(&mut records, id, status)?;
    fs::write(records_path, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("Failed to write {}", records_path.display()))?;
    print_json(&updated)
}

fn transition_record(
    records: &mut [MisalignmentRecord],
    id: &str,
    status: MisalignmentStatus,
) -> Result<MisalignmentRecord> {
    let Some(record) = records.iter_mut().find(|r| r.id == id) else {
        bail!("no misalignment with id {id}");
    };
    record.transition(status, Utc::now())?;
    info!(id, status = %status, "misalignment status updated");
    Ok(record.clone())
}
