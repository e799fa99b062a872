//! Balance ledger service

use rust_decimal::Decimal;
use std::sync::Arc;

use super::{BalanceAccount, BalanceMove, Credit, PayoutTable};
use crate::error::{PaymentError, PaymentResult};
use crate::payment::{Payment, UserId};
use crate::store::LedgerStore;
use crate::withdrawal::{Withdrawal, WithdrawalStatus};

/// Per-user balance operations tied to payment and withdrawal transitions
pub struct BalanceLedger {
    store: Arc<dyn LedgerStore>,
    payouts: PayoutTable,
}

impl BalanceLedger {
    pub fn new(store: Arc<dyn LedgerStore>, payouts: PayoutTable) -> Self {
        Self { store, payouts }
    }

    pub fn payouts(&self) -> &PayoutTable {
        &self.payouts
    }

    /// Credit owed to the recipient when `payment` completes.
    ///
    /// `None` when there is no recipient or the payout rounds to zero. The
    /// credit is applied by the store together with the payment's one-shot
    /// transition to `completed`, so it lands exactly once per payment.
    pub fn completion_credit(&self, payment: &Payment) -> Option<Credit> {
        let user_id = payment.recipient_id?;
        let amount = self.payouts.payout(payment.payment_type, payment.amount);
        (amount > Decimal::ZERO).then_some(Credit { user_id, amount })
    }

    /// Bucket move that accompanies `withdrawal` reaching `next`.
    ///
    /// The store applies it inside the withdrawal's status CAS, so the move
    /// and the transition land together or not at all.
    pub fn withdrawal_move(
        &self,
        withdrawal: &Withdrawal,
        next: WithdrawalStatus,
    ) -> Option<BalanceMove> {
        match next {
            WithdrawalStatus::Completed => {
                Some(BalanceMove::finalize(withdrawal.user_id, withdrawal.amount))
            }
            WithdrawalStatus::Rejected => {
                Some(BalanceMove::release(withdrawal.user_id, withdrawal.amount))
            }
            WithdrawalStatus::Pending | WithdrawalStatus::Processing => None,
        }
    }

    /// Fail fast before a withdrawal is sealed and stored.
    ///
    /// Advisory only; the store re-checks `available` atomically on reserve.
    pub async fn ensure_available(&self, user_id: UserId, amount: Decimal) -> PaymentResult<()> {
        let account = self.balance(user_id).await?;
        if account.available() < amount {
            return Err(PaymentError::InsufficientBalance {
                available: account.available().to_string(),
                requested: amount.to_string(),
            });
        }
        Ok(())
    }

    pub async fn balance(&self, user_id: UserId) -> PaymentResult<BalanceAccount> {
        self.store.get_balance(user_id).await
    }

    /// Direct credit to `available` (adjustments, tests)
    pub async fn credit(&self, user_id: UserId, amount: Decimal) -> PaymentResult<BalanceAccount> {
        let account = self.store.credit(&Credit { user_id, amount }).await?;
        tracing::info!(user_id, amount = %amount, available = %account.available(), "Balance credited");
        Ok(account)
    }

    // ============================================================
    // STANDALONE ADJUSTMENTS
    // ============================================================
    //
    // Single bucket moves with no withdrawal record attached (ops
    // corrections). Withdrawal flows go through `withdrawal_move` and the
    // store's CAS instead.

    /// available -> pending; `InsufficientBalance` if available < amount
    pub async fn reserve_for_withdrawal(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> PaymentResult<BalanceAccount> {
        self.store
            .move_balance(&BalanceMove::reserve(user_id, amount))
            .await
    }

    /// pending -> available
    pub async fn release_reservation(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> PaymentResult<BalanceAccount> {
        self.store
            .move_balance(&BalanceMove::release(user_id, amount))
            .await
    }

    /// pending -> withdrawn
    pub async fn finalize_withdrawal(
        &self,
        user_id: UserId,
        amount: Decimal,
    ) -> PaymentResult<BalanceAccount> {
        self.store
            .move_balance(&BalanceMove::finalize(user_id, amount))
            .await
    }
}
