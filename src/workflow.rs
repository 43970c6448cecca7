//! # Compliance Workflow
//!
//! Fixed status workflow for compliance records:
//! not_started → in_progress → pending_review → approved | rejected.
//! Rejected records return to in_progress for rework; approved records can
//! only be reopened by an admin.

use serde::{Deserialize, Serialize};

/// Workflow status of a compliance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    NotStarted,
    InProgress,
    PendingReview,
    Approved,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::NotStarted => "not_started",
            RecordStatus::InProgress => "in_progress",
            RecordStatus::PendingReview => "pending_review",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(RecordStatus::NotStarted),
            "in_progress" => Some(RecordStatus::InProgress),
            "pending_review" => Some(RecordStatus::PendingReview),
            "approved" => Some(RecordStatus::Approved),
            "rejected" => Some(RecordStatus::Rejected),
            _ => None,
        }
    }

    /// Statuses that stamp reviewer fields when entered.
    pub fn is_review_outcome(&self) -> bool {
        matches!(self, RecordStatus::Approved | RecordStatus::Rejected)
    }
}

/// Whether moving `from` → `to` is allowed.
///
/// Reopening an approved record is restricted to admins; every other
/// transition is role-independent.
pub fn can_transition(from: RecordStatus, to: RecordStatus, is_admin: bool) -> bool {
    use RecordStatus::*;
    match (from, to) {
        (NotStarted, InProgress) => true,
        (InProgress, PendingReview) => true,
        (PendingReview, Approved) => true,
        (PendingReview, Rejected) => true,
        // Withdraw from review without a decision
        (PendingReview, InProgress) => true,
        (Rejected, InProgress) => true,
        (Approved, InProgress) => is_admin,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecordStatus::*;

    #[test]
    fn status_round_trips() {
        for status in [NotStarted, InProgress, PendingReview, Approved, Rejected] {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("done"), None);
    }

    #[test]
    fn happy_path_is_allowed() {
        assert!(can_transition(NotStarted, InProgress, false));
        assert!(can_transition(InProgress, PendingReview, false));
        assert!(can_transition(PendingReview, Approved, false));
        assert!(can_transition(PendingReview, Rejected, false));
    }

    #[test]
    fn rework_paths() {
        assert!(can_transition(Rejected, InProgress, false));
        assert!(can_transition(PendingReview, InProgress, false));
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(!can_transition(NotStarted, PendingReview, false));
        assert!(!can_transition(NotStarted, Approved, true));
        assert!(!can_transition(InProgress, Approved, false));
        assert!(!can_transition(Rejected, Approved, false));
    }

    #[test]
    fn reopen_requires_admin() {
        assert!(!can_transition(Approved, InProgress, false));
        assert!(can_transition(Approved, InProgress, true));
    }

    #[test]
    fn no_self_transitions() {
        for status in [NotStarted, InProgress, PendingReview, Approved, Rejected] {
            assert!(!can_transition(status, status, true));
        }
    }

    #[test]
    fn review_outcomes() {
        assert!(Approved.is_review_outcome());
        assert!(Rejected.is_review_outcome());
        assert!(!PendingReview.is_review_outcome());
    }
}
