//! Rule extraction: instruction document → atomic [`AgentRule`]s.
//!
//! Every list item that carries a recognisable trigger becomes its own rule.
//! A section additionally yields a parent rule when it has prose of its own,
//! or when none of its bullets produced a rule.
//!
//! ## Bullet patterns
//!
//! | pattern | trigger | summary | keyword source |
//! |---------|---------|---------|----------------|
//! | `trigger -> resolution` (or `→`) | left side | `When <trigger>, use <resolution>` | trigger |
//! | `topic: instruction` (instruction > 10 chars) | topic | whole bullet | topic |
//! | anything else | whole bullet | whole bullet | whole bullet |
//!
//! Bullets whose keyword source is shorter than five characters are skipped.

use std::sync::LazyLock;

use coach_core::rules::{BULLET_SOURCE, SECTION_SOURCE};
use coach_core::{AgentRule, RuleKind};
use regex::Regex;

use crate::ids::IdAllocator;
use crate::keywords::derive_keywords;
use crate::markdown::{Section, parse_sections};
use crate::severity::infer_severity;

/// Minimum length of a bullet's keyword source.
const MIN_TRIGGER_CHARS: usize = 5;

/// Colon instructions at or under this length are treated as labels.
const MIN_COLON_INSTRUCTION_CHARS: usize = 10;

static ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*(?:->|→)\s*(.+)$").unwrap());

static COLON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.+)$").unwrap());

/// How one bullet reads.
#[derive(Debug, PartialEq, Eq)]
struct BulletShape {
    trigger: String,
    summary: String,
    keyword_source: String,
}

fn classify_bullet(bullet: &str) -> BulletShape {
    if let Some(caps) = ARROW.captures(bullet) {
        let trigger = caps[1].trim().to_owned();
        let resolution = caps[2].trim();
        return BulletShape {
            summary: format!("When {trigger}, use {resolution}"),
            keyword_source: trigger.clone(),
            trigger,
        };
    }
    if let Some(caps) = COLON.captures(bullet) {
        let topic = caps[1].trim();
        if caps[2].trim().chars().count() > MIN_COLON_INSTRUCTION_CHARS {
            return BulletShape {
                trigger: topic.to_owned(),
                summary: bullet.to_owned(),
                keyword_source: topic.to_owned(),
            };
        }
    }
    BulletShape {
        trigger: bullet.to_owned(),
        summary: bullet.to_owned(),
        keyword_source: bullet.to_owned(),
    }
}

/// Extract rules from one document.
///
/// `source` is the originating file path; when absent, rules carry the
/// synthetic `"bullet"` or `"heading"` marker instead. Deterministic and
/// infallible: a document with nothing extractable yields an empty list.
pub fn extract_rules(document: &str, source: Option<&str>) -> Vec<AgentRule> {
    let mut ids = IdAllocator::new();
    let mut rules = Vec::new();
    for section in parse_sections(document) {
        extract_section(&section, source, &mut ids, &mut rules);
    }
    rules
}

fn extract_section(
    section: &Section,
    source: Option<&str>,
    ids: &mut IdAllocator,
    rules: &mut Vec<AgentRule>,
) {
    let before = rules.len();

    for (position, bullet) in section.bullets.iter().enumerate() {
        let shape = classify_bullet(bullet);
        if shape.keyword_source.trim().chars().count() < MIN_TRIGGER_CHARS {
            continue;
        }
        let heading = format!("{}: {}", section.heading, shape.trigger);
        rules.push(AgentRule {
            id: ids.allocate(&format!("{}-item-{}", section.heading, position + 1)),
            severity: infer_severity(&heading, bullet),
            heading,
            level: section.level.saturating_add(1),
            summary: shape.summary,
            body: bullet.clone(),
            bullets: Vec::new(),
            keywords: derive_keywords(&shape.keyword_source),
            source: source.unwrap_or(BULLET_SOURCE).to_owned(),
            kind: RuleKind::Bullet,
        });
    }

    let exploded = rules.len() > before;
    if (exploded && section.prose.is_empty()) || section.body.is_empty() {
        return;
    }

    let mut keywords = derive_keywords(&section.heading);
    if !exploded {
        keywords.extend(derive_keywords(&section.bullets.join(" ")));
    }
    if keywords.is_empty() {
        return;
    }

    rules.push(AgentRule {
        id: ids.allocate(&section.heading),
        heading: section.heading.clone(),
        level: section.level,
        summary: section
            .prose
            .first()
            .cloned()
            .unwrap_or_else(|| section.heading.clone()),
        body: section.body.clone(),
        bullets: if exploded {
            Vec::new()
        } else {
            section.bullets.clone()
        },
        severity: infer_severity(&section.heading, &section.body),
        keywords,
        source: source.unwrap_or(SECTION_SOURCE).to_owned(),
        kind: RuleKind::Section,
    });
}
