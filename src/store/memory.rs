//! In-memory ledger store
//!
//! Backed by `DashMap`. Per-entry write guards give the same atomicity the
//! PostgreSQL store gets from row locks. Lock order is always
//! payment → balance and withdrawal → balance; no guard is held across an
//! `.await`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{BalanceStore, PaymentStore, WithdrawalStore};
use crate::balance::{BalanceAccount, BalanceMove, Bucket, Credit};
use crate::error::{PaymentError, PaymentResult};
use crate::payment::{Payment, PaymentId, PaymentStatus, PaymentTransition, UserId};
use crate::withdrawal::{Withdrawal, WithdrawalId, WithdrawalTransition};

#[derive(Default)]
pub struct MemoryStore {
    payments: DashMap<PaymentId, Payment>,
    /// gateway_ref -> payment id (uniqueness index)
    gateway_refs: DashMap<String, PaymentId>,
    balances: DashMap<UserId, BalanceAccount>,
    withdrawals: DashMap<WithdrawalId, Withdrawal>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` in place, working on a copy so failures leave it untouched
    fn credit_in_place(account: &mut BalanceAccount, credit: &Credit) -> PaymentResult<()> {
        let mut updated = account.clone();
        updated.credit(credit.amount, Bucket::Available)?;
        *account = updated;
        Ok(())
    }

    fn move_in_place(account: &mut BalanceAccount, mv: &BalanceMove) -> PaymentResult<()> {
        let mut updated = account.clone();
        updated.apply_move(mv)?;
        *account = updated;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> PaymentResult<()> {
        let Entry::Vacant(slot) = self.payments.entry(payment.id) else {
            return Err(PaymentError::Validation(format!(
                "payment {} already exists",
                payment.id
            )));
        };

        if let Some(gateway_ref) = &payment.gateway_ref {
            match self.gateway_refs.entry(gateway_ref.clone()) {
                Entry::Occupied(_) => {
                    return Err(PaymentError::Validation(format!(
                        "gateway reference {} already in use",
                        gateway_ref
                    )));
                }
                Entry::Vacant(idx) => {
                    idx.insert(payment.id);
                }
            }
        }

        slot.insert(payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> PaymentResult<Option<Payment>> {
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> PaymentResult<Option<Payment>> {
        let Some(id) = self.gateway_refs.get(gateway_ref).map(|id| *id) else {
            return Ok(None);
        };
        self.get_payment(id).await
    }

    async fn transition_payment(
        &self,
        id: PaymentId,
        transition: &PaymentTransition,
    ) -> PaymentResult<Option<Payment>> {
        let Some(mut payment) = self.payments.get_mut(&id) else {
            return Err(PaymentError::NotFound(format!("payment {}", id)));
        };

        if !transition.matches(&payment) {
            return Ok(None);
        }

        if let Some(credit) = &transition.credit {
            let mut account = self
                .balances
                .entry(credit.user_id)
                .or_insert_with(|| BalanceAccount::new(credit.user_id));
            Self::credit_in_place(&mut account, credit)?;
        }

        transition.apply_to(&mut payment);
        Ok(Some(payment.clone()))
    }

    async fn list_payments_by_status(
        &self,
        status: PaymentStatus,
        limit: usize,
    ) -> PaymentResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.clone())
            .collect();
        payments.sort_by_key(|p| (p.created_at, p.id));
        payments.truncate(limit);
        Ok(payments)
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn get_balance(&self, user_id: UserId) -> PaymentResult<BalanceAccount> {
        Ok(self
            .balances
            .get(&user_id)
            .map(|b| b.clone())
            .unwrap_or_else(|| BalanceAccount::new(user_id)))
    }

    async fn credit(&self, credit: &Credit) -> PaymentResult<BalanceAccount> {
        let mut account = self
            .balances
            .entry(credit.user_id)
            .or_insert_with(|| BalanceAccount::new(credit.user_id));
        Self::credit_in_place(&mut account, credit)?;
        Ok(account.clone())
    }

    async fn move_balance(&self, mv: &BalanceMove) -> PaymentResult<BalanceAccount> {
        let mut account = self
            .balances
            .entry(mv.user_id)
            .or_insert_with(|| BalanceAccount::new(mv.user_id));
        Self::move_in_place(&mut account, mv)?;
        Ok(account.clone())
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> PaymentResult<BalanceAccount> {
        let Entry::Vacant(slot) = self.withdrawals.entry(withdrawal.id) else {
            return Err(PaymentError::Validation(format!(
                "withdrawal {} already exists",
                withdrawal.id
            )));
        };

        let reserved = {
            let mut account = self
                .balances
                .entry(withdrawal.user_id)
                .or_insert_with(|| BalanceAccount::new(withdrawal.user_id));
            let mv = BalanceMove::reserve(withdrawal.user_id, withdrawal.amount);
            Self::move_in_place(&mut account, &mv)?;
            account.clone()
        };

        slot.insert(withdrawal.clone());
        Ok(reserved)
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> PaymentResult<Option<Withdrawal>> {
        Ok(self.withdrawals.get(&id).map(|w| w.clone()))
    }

    async fn list_withdrawals(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> PaymentResult<Vec<Withdrawal>> {
        let mut list: Vec<Withdrawal> = self
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list.truncate(limit);
        Ok(list)
    }

    async fn transition_withdrawal(
        &self,
        id: WithdrawalId,
        transition: &WithdrawalTransition,
    ) -> PaymentResult<Option<Withdrawal>> {
        let Some(mut withdrawal) = self.withdrawals.get_mut(&id) else {
            return Err(PaymentError::NotFound(format!("withdrawal {}", id)));
        };

        if withdrawal.status != transition.expected {
            return Ok(None);
        }

        if let Some(mv) = &transition.balance_move {
            let mut account = self
                .balances
                .entry(mv.user_id)
                .or_insert_with(|| BalanceAccount::new(mv.user_id));
            Self::move_in_place(&mut account, mv)?;
        }

        transition.apply_to(&mut withdrawal);
        Ok(Some(withdrawal.clone()))
    }
}
