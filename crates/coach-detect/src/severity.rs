//! Severity ranking across misalignment records.

use coach_core::{MisalignmentRecord, Severity};

/// Numeric rank of a severity, higher is more severe.
pub fn rank(severity: Severity) -> u8 {
    severity.rank()
}

/// The most severe record; the earliest one wins ties.
pub fn select_primary(records: &[MisalignmentRecord]) -> Option<&MisalignmentRecord> {
    records.iter().rev().max_by_key(|record| rank(record.severity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coach_core::{MisalignmentStatus, SessionId};

    fn record(id: &str, severity: Severity) -> MisalignmentRecord {
        let now = Utc::now();
        MisalignmentRecord {
            id: id.into(),
            session_id: SessionId::from("s"),
            rule_id: id.into(),
            title: id.into(),
            summary: String::new(),
            severity,
            status: MisalignmentStatus::Open,
            evidence: Vec::new(),
            event_range: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ranks_are_ordered() {
        assert!(rank(Severity::Critical) > rank(Severity::High));
        assert!(rank(Severity::High) > rank(Severity::Medium));
        assert!(rank(Severity::Low) > rank(Severity::Info));
    }

    #[test]
    fn primary_is_most_severe() {
        let records = vec![
            record("a", Severity::Low),
            record("b", Severity::High),
            record("c", Severity::Medium),
        ];
        assert_eq!(select_primary(&records).unwrap().id, "b");
    }

    #[test]
    fn ties_go_to_the_first() {
        let records = vec![
            record("a", Severity::Medium),
            record("b", Severity::High),
            record("c", Severity::High),
        ];
        assert_eq!(select_primary(&records).unwrap().id, "b");
    }

    #[test]
    fn empty_has_no_primary() {
        assert!(select_primary(&[]).is_none());
    }
}
