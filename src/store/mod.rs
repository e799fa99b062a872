//! Ledger persistence seam
//!
//! Every mutating call is one atomic operation spanning at most one payment
//! (or withdrawal) row and one balance row:
//!
//! - [`PaymentStore::transition_payment`]: status CAS, plus the completion
//!   credit when present
//! - [`WithdrawalStore::create_withdrawal`]: reserve + insert
//! - [`WithdrawalStore::transition_withdrawal`]: status CAS + release/finalize
//!
//! A failed CAS predicate is `Ok(None)`, not an error: the caller decides
//! whether that means "already handled" or a conflict.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::balance::{BalanceAccount, BalanceMove, Credit};
use crate::error::PaymentResult;
use crate::payment::{Payment, PaymentId, PaymentStatus, PaymentTransition, UserId};
use crate::withdrawal::{Withdrawal, WithdrawalId, WithdrawalTransition};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new payment; a duplicate gateway reference is a `Validation` error
    async fn insert_payment(&self, payment: &Payment) -> PaymentResult<()>;

    async fn get_payment(&self, id: PaymentId) -> PaymentResult<Option<Payment>>;

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> PaymentResult<Option<Payment>>;

    /// CAS transition; `Ok(None)` when the predicate no longer holds
    async fn transition_payment(
        &self,
        id: PaymentId,
        transition: &PaymentTransition,
    ) -> PaymentResult<Option<Payment>>;

    /// Oldest first
    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
        limit: usize,
    ) -> PaymentResult<Vec<Payment>>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Zeroed account if the user has none yet
    async fn get_balance(&self, user_id: UserId) -> PaymentResult<BalanceAccount>;

    async fn credit(&self, credit: &Credit) -> PaymentResult<BalanceAccount>;

    async fn move_balance(&self, mv: &BalanceMove) -> PaymentResult<BalanceAccount>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Reserve `amount` (available -> pending) and insert the record atomically
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> PaymentResult<BalanceAccount>;

    async fn get_withdrawal(&self, id: WithdrawalId) -> PaymentResult<Option<Withdrawal>>;

    /// Newest first
    async fn list_withdrawals(&self, user_id: UserId, limit: usize)
    -> PaymentResult<Vec<Withdrawal>>;

    /// CAS transition; `Ok(None)` when the predicate no longer holds
    async fn transition_withdrawal(
        &self,
        id: WithdrawalId,
        transition: &WithdrawalTransition,
    ) -> PaymentResult<Option<Withdrawal>>;
}

/// Everything the services need from storage
pub trait LedgerStore: PaymentStore + BalanceStore + WithdrawalStore {}

impl<T: PaymentStore + BalanceStore + WithdrawalStore> LedgerStore for T {}
