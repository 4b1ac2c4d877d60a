//! Severity inference from rule wording.

use coach_core::Severity;

/// Phrase tiers checked in order; the first tier with a match wins.
const SEVERITY_TIERS: &[(Severity, &[&str])] = &[
    (Severity::High, &["never", "do not", "must not", "critical"]),
    (Severity::Medium, &["avoid", "should not", "don't", "don\u{2019}t"]),
    (Severity::Low, &["prefers", "consider"]),
];

/// Infer a rule's severity from its heading and body.
pub fn infer_severity(heading: &str, body: &str) -> Severity {
    let text = format!("{heading}\n{body}").to_lowercase();
    SEVERITY_TIERS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| text.contains(p)))
        .map_or(Severity::Info, |(severity, _)| *severity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_map_to_severities() {
        assert_eq!(infer_severity("Safety", "Never force-push to main"), Severity::High);
        assert_eq!(infer_severity("Critical paths", ""), Severity::High);
        assert_eq!(infer_severity("Style", "Avoid deep nesting"), Severity::Medium);
        assert_eq!(infer_severity("Style", "Don't shadow variables"), Severity::Medium);
        assert_eq!(infer_severity("Style", "Consider early returns"), Severity::Low);
        assert_eq!(infer_severity("Layout", "Modules live in src/"), Severity::Info);
    }

    #[test]
    fn highest_tier_wins() {
        assert_eq!(
            infer_severity("Mixed", "Consider small commits; never commit secrets; avoid merges"),
            Severity::High
        );
        assert_eq!(infer_severity("Mixed", "Avoid this, consider that"), Severity::Medium);
    }

    #[test]
    fn heading_counts() {
        assert_eq!(infer_severity("Do NOT edit generated files", ""), Severity::High);
    }
}
