//! Payment FSM State Definitions
//!
//! ```text
//! pending ──────────────(gateway)──► completed | failed | cancelled
//! pending_verification ─(proof)────► processing
//! processing ───────────(review)───► completed | failed
//! completed ────────────(refund)───► refunded | partially_refunded
//! partially_refunded ───(refund)───► refunded | partially_refunded
//! ```
//!
//! Stored as lowercase text in PostgreSQL (`payments_tb.status`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PaymentError, PaymentResult};

/// Payment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Hosted intent opened, awaiting provider outcome
    Pending,
    /// Manual instructions issued, awaiting user proof
    PendingVerification,
    /// Manual proof submitted, awaiting reviewer
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

/// Who is driving a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Webhook delivery or provider sync
    Gateway,
    /// User proof submission
    ProofSubmitted,
    /// Reviewer approve/reject
    Review,
    /// Authorized refund operation
    Refund,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 8] = [
        PaymentStatus::Pending,
        PaymentStatus::PendingVerification,
        PaymentStatus::Processing,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
        PaymentStatus::Refunded,
        PaymentStatus::PartiallyRefunded,
    ];

    /// Check if this is a terminal state for the collection lifecycle
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed
                | PaymentStatus::Failed
                | PaymentStatus::Cancelled
                | PaymentStatus::Refunded
                | PaymentStatus::PartiallyRefunded
        )
    }

    /// Money was collected at some point (completed, possibly refunded since)
    #[inline]
    pub fn is_collected(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Refunded | PaymentStatus::PartiallyRefunded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PendingVerification => "pending_verification",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// Parse the stored text form
    pub fn parse(s: &str) -> Option<Self> {
        PaymentStatus::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Validate `self -> next` for the given trigger.
    ///
    /// Every edge not drawn in the module diagram is rejected, which includes
    /// any lifecycle move out of a terminal state.
    pub fn check_transition(&self, next: PaymentStatus, trigger: Trigger) -> PaymentResult<()> {
        use PaymentStatus::*;

        let allowed = match (trigger, self) {
            (Trigger::Gateway, Pending) => matches!(next, Completed | Failed | Cancelled),
            (Trigger::ProofSubmitted, PendingVerification) => next == Processing,
            (Trigger::Review, Processing) => matches!(next, Completed | Failed),
            (Trigger::Refund, Completed | PartiallyRefunded) => {
                matches!(next, Refunded | PartiallyRefunded)
            }
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition(format!(
                "{} -> {} not allowed via {:?}",
                self, next, trigger
            )))
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
