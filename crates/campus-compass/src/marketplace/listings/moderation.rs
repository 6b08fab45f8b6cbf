//! Listing moderation lifecycle: `pending` → `approved` | `rejected`.

use super::domain::{ListingStatus, StatusKind};
use crate::config::ModerationConfig;

/// Admin decision applied to a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationDecision {
    Approve,
    Reject { reason: String },
}

impl ModerationDecision {
    /// Build a decision from a wire status label. Only terminal states can be requested.
    pub fn from_label(label: &str, reason: Option<String>) -> Result<Self, ModerationError> {
        match label.parse::<StatusKind>() {
            Ok(StatusKind::Approved) => Ok(ModerationDecision::Approve),
            Ok(StatusKind::Rejected) => Ok(ModerationDecision::Reject {
                reason: reason.unwrap_or_default(),
            }),
            Ok(StatusKind::Pending) | Err(_) => {
                Err(ModerationError::UnsupportedTarget(label.trim().to_string()))
            }
        }
    }

    pub fn target(&self) -> StatusKind {
        match self {
            ModerationDecision::Approve => StatusKind::Approved,
            ModerationDecision::Reject { .. } => StatusKind::Rejected,
        }
    }

    fn into_status(self) -> ListingStatus {
        match self {
            ModerationDecision::Approve => ListingStatus::Approved,
            ModerationDecision::Reject { reason } => ListingStatus::Rejected { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModerationError {
    #[error("status must be approved or rejected, got '{0}'")]
    UnsupportedTarget(String),
    #[error("listing is already {from} and cannot become {to}")]
    Terminal { from: &'static str, to: &'static str },
    #[error("rejected listings cannot be resubmitted")]
    ResubmissionDisabled,
    #[error("only rejected listings can be resubmitted (listing is {0})")]
    NotRejected(&'static str),
}

/// Transition rules, parameterized by whether rejected listings may be resubmitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModerationPolicy {
    allow_resubmission: bool,
}

impl ModerationPolicy {
    pub fn new(allow_resubmission: bool) -> Self {
        Self { allow_resubmission }
    }

    /// Apply an admin decision.
    ///
    /// Repeating the current decision is an idempotent write; a repeated rejection keeps the
    /// newest reason. Moving between `approved` and `rejected` is refused.
    pub fn decide(
        &self,
        current: &ListingStatus,
        decision: ModerationDecision,
    ) -> Result<ListingStatus, ModerationError> {
        match (current.kind(), decision.target()) {
            (StatusKind::Pending, _) => Ok(decision.into_status()),
            (from, to) if from == to => Ok(decision.into_status()),
            (from, to) => Err(ModerationError::Terminal {
                from: from.label(),
                to: to.label(),
            }),
        }
    }

    /// Owner-initiated return of a rejected listing to the review queue.
    pub fn resubmit(&self, current: &ListingStatus) -> Result<ListingStatus, ModerationError> {
        if !self.allow_resubmission {
            return Err(ModerationError::ResubmissionDisabled);
        }
        match current.kind() {
            StatusKind::Rejected => Ok(ListingStatus::Pending),
            other => Err(ModerationError::NotRejected(other.label())),
        }
    }
}

impl From<&ModerationConfig> for ModerationPolicy {
    fn from(config: &ModerationConfig) -> Self {
        Self::new(config.allow_resubmission)
    }
}
