//! Payment Ledger
//!
//! Authoritative record of every payment and the only place its status moves.
//!
//! # State Machine
//!
//! ```text
//! hosted:  PENDING ──gateway──► COMPLETED | FAILED | CANCELLED
//! manual:  PENDING_VERIFICATION ──proof──► PROCESSING ──review──► COMPLETED | FAILED
//! refund:  COMPLETED | PARTIALLY_REFUNDED ──refund──► PARTIALLY_REFUNDED | REFUNDED
//! ```
//!
//! # Invariants
//!
//! 1. **Single writer**: every status change is a compare-and-set on the prior status
//! 2. **Credit once**: the recipient credit commits with the move to `COMPLETED`
//! 3. **Sealed at rest**: sensitive fields are encrypted before they reach the store

pub mod ledger;
pub mod state;
pub mod types;

#[cfg(test)]
mod integration_tests;

pub use ledger::{CreatedPayment, PaymentLedger, ProviderAmount, ReviewDecision};
pub use state::{PaymentStatus, Trigger};
pub use types::{
    CreatePayment, Payment, PaymentId, PaymentMethod, PaymentTransition, PaymentType,
    ReconcileOutcome, RequestContext, SealedDetails, SensitiveDetails, UserId,
};
