//! Withdrawal FSM State Definitions
//!
//! ```text
//! pending ──start──► processing ──complete──► completed
//!    │                   │
//!    └─────reject────────┴──────reject──────► rejected
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PaymentError, PaymentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Amount reserved, awaiting reviewer
    Pending,
    /// Payout in progress
    Processing,
    /// Terminal: paid out, amount left `pending` for `withdrawn`
    Completed,
    /// Terminal: amount returned to `available`
    Rejected,
}

impl WithdrawalStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "processing" => Some(WithdrawalStatus::Processing),
            "completed" => Some(WithdrawalStatus::Completed),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }

    /// Validate `self -> next`
    pub fn check_transition(&self, next: WithdrawalStatus) -> PaymentResult<()> {
        use WithdrawalStatus::*;
        let allowed = matches!(
            (self, next),
            (Pending, Processing) | (Processing, Completed) | (Pending | Processing, Rejected)
        );
        if allowed {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition(format!(
                "withdrawal {} -> {} not allowed",
                self, next
            )))
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
