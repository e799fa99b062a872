//! Withdrawal processor service

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::state::WithdrawalStatus;
use super::types::{
    DestinationDetails, DestinationMethod, Withdrawal, WithdrawalId, WithdrawalTransition,
};
use crate::auth::Identity;
use crate::balance::{BalanceAccount, BalanceLedger};
use crate::config::WithdrawalConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money;
use crate::payment::UserId;
use crate::store::LedgerStore;
use crate::vault::{Vault, mask};

/// History page size
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub method: DestinationMethod,
    pub destination: DestinationDetails,
}

/// Reviewer action on a withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessAction {
    Start,
    Complete { external_reference: String },
    Reject { reason: String },
}

#[derive(Debug, Clone)]
pub struct CreatedWithdrawal {
    pub withdrawal: Withdrawal,
    /// Balance right after the reservation
    pub balance: BalanceAccount,
}

pub struct WithdrawalProcessor {
    store: Arc<dyn LedgerStore>,
    vault: Arc<Vault>,
    balances: Arc<BalanceLedger>,
    config: WithdrawalConfig,
}

impl WithdrawalProcessor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        vault: Arc<Vault>,
        balances: Arc<BalanceLedger>,
        config: WithdrawalConfig,
    ) -> Self {
        Self {
            store,
            vault,
            balances,
            config,
        }
    }

    fn validate(&self, request: &WithdrawalRequest) -> PaymentResult<String> {
        let currency = money::normalize_currency(&request.currency)?;
        if currency != self.config.currency {
            return Err(PaymentError::Validation(format!(
                "withdrawals are paid out in {} only",
                self.config.currency
            )));
        }
        let limit = self.config.limits.get(&request.method).ok_or_else(|| {
            PaymentError::Validation(format!(
                "withdrawal method {} is not supported",
                request.method
            ))
        })?;
        if request.amount < limit.min {
            return Err(PaymentError::Validation(format!(
                "minimum withdrawal is {} {}",
                limit.min, currency
            )));
        }
        if request.amount > limit.max {
            return Err(PaymentError::Validation(format!(
                "maximum withdrawal is {} {}",
                limit.max, currency
            )));
        }
        money::to_minor_units(request.amount, &currency)?;

        let dest = &request.destination;
        if dest.provider.trim().is_empty()
            || dest.account_number.trim().is_empty()
            || dest.account_name.trim().is_empty()
        {
            return Err(PaymentError::Validation(
                "destination provider, account number and account name are required".into(),
            ));
        }
        Ok(currency)
    }

    /// Validate limits, seal the destination, then reserve and insert atomically
    pub async fn create(&self, request: WithdrawalRequest) -> PaymentResult<CreatedWithdrawal> {
        let currency = self.validate(&request)?;
        self.balances
            .ensure_available(request.user_id, request.amount)
            .await?;
        let destination_enc = request.destination.seal(&self.vault)?;

        let now = Utc::now();
        let withdrawal = Withdrawal {
            id: WithdrawalId::new(),
            user_id: request.user_id,
            amount: request.amount,
            currency,
            method: request.method,
            destination_enc,
            status: WithdrawalStatus::Pending,
            processed_by: None,
            processor_notes: None,
            external_reference: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let balance = self.store.create_withdrawal(&withdrawal).await?;

        tracing::info!(
            withdrawal_id = %withdrawal.id,
            user_id = withdrawal.user_id,
            amount = %withdrawal.amount,
            method = %withdrawal.method,
            destination = %mask(&request.destination.account_number, 4),
            available = %balance.available(),
            pending = %balance.pending(),
            "Withdrawal requested, amount reserved"
        );

        Ok(CreatedWithdrawal {
            withdrawal,
            balance,
        })
    }

    /// Reviewer-only status transition with its balance effect
    pub async fn process(
        &self,
        id: WithdrawalId,
        reviewer: &Identity,
        action: ProcessAction,
        notes: Option<String>,
    ) -> PaymentResult<Withdrawal> {
        reviewer.require_reviewer()?;
        let current = self.load(id).await?;
        if current.user_id == reviewer.user_id {
            return Err(PaymentError::Forbidden(
                "reviewers cannot process their own withdrawal".into(),
            ));
        }

        let (next, external_reference, notes) = match action {
            ProcessAction::Start => (WithdrawalStatus::Processing, None, notes),
            ProcessAction::Complete { external_reference } => {
                if external_reference.trim().is_empty() {
                    return Err(PaymentError::Validation(
                        "external_reference is required to complete a withdrawal".into(),
                    ));
                }
                (WithdrawalStatus::Completed, Some(external_reference), notes)
            }
            ProcessAction::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(PaymentError::Validation(
                        "rejection reason is required".into(),
                    ));
                }
                (
                    WithdrawalStatus::Rejected,
                    None,
                    Some(match notes {
                        Some(n) => format!("{}: {}", reason, n),
                        None => reason,
                    }),
                )
            }
        };
        current.status.check_transition(next)?;

        let transition = WithdrawalTransition {
            expected: current.status,
            next,
            balance_move: self.balances.withdrawal_move(&current, next),
            processed_by: reviewer.user_id,
            notes,
            external_reference,
            at: Utc::now(),
        };

        let updated = self
            .store
            .transition_withdrawal(id, &transition)
            .await?
            .ok_or_else(|| {
                PaymentError::InvalidTransition(format!(
                    "withdrawal {} is no longer {}",
                    id, current.status
                ))
            })?;

        tracing::info!(
            withdrawal_id = %id,
            reviewer = reviewer.user_id,
            from = %current.status,
            to = %updated.status,
            "Withdrawal processed"
        );
        Ok(updated)
    }

    /// Owner or reviewer; anyone else sees `NotFound`
    pub async fn get(&self, id: WithdrawalId, actor: &Identity) -> PaymentResult<Withdrawal> {
        let withdrawal = self.load(id).await?;
        if withdrawal.user_id == actor.user_id || actor.role.can_review() {
            Ok(withdrawal)
        } else {
            Err(PaymentError::NotFound(format!("withdrawal {}", id)))
        }
    }

    /// Caller's own history, newest first
    pub async fn list(&self, actor: &Identity) -> PaymentResult<Vec<Withdrawal>> {
        self.store
            .list_withdrawals(actor.user_id, HISTORY_LIMIT)
            .await
    }

    /// Plaintext destination for the payout operator
    pub async fn reveal_destination(
        &self,
        id: WithdrawalId,
        reviewer: &Identity,
    ) -> PaymentResult<DestinationDetails> {
        reviewer.require_reviewer()?;
        let withdrawal = self.load(id).await?;
        DestinationDetails::open(&withdrawal.destination_enc, &self.vault).map_err(|e| {
            tracing::error!(withdrawal_id = %id, error = %e, "Failed to decrypt destination");
            PaymentError::from(e)
        })
    }

    async fn load(&self, id: WithdrawalId) -> PaymentResult<Withdrawal> {
        self.store
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("withdrawal {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::PayoutTable;
    use crate::store::{BalanceStore, MemoryStore};
    use crate::vault::test_vault;

    const USER: UserId = 3003;
    const REVIEWER: UserId = 9001;

    async fn setup(available: i64) -> (WithdrawalProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let balances = Arc::new(BalanceLedger::new(store.clone(), PayoutTable::default()));
        if available > 0 {
            store
                .credit(&crate::balance::Credit {
                    user_id: USER,
                    amount: Decimal::from(available),
                })
                .await
                .unwrap();
        }
        let processor = WithdrawalProcessor::new(
            store.clone(),
            Arc::new(test_vault()),
            balances,
            WithdrawalConfig::default(),
        );
        (processor, store)
    }

    fn request(amount: i64) -> WithdrawalRequest {
        WithdrawalRequest {
            user_id: USER,
            amount: Decimal::from(amount),
            currency: "idr".into(),
            method: DestinationMethod::BankTransfer,
            destination: DestinationDetails {
                provider: "BCA".into(),
                account_number: "8830012345".into(),
                account_name: "Siti Rahma".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_create_reserves_amount() {
        let (processor, _) = setup(200_000).await;
        let created = processor.create(request(150_000)).await.unwrap();
        assert_eq!(created.withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(created.withdrawal.currency, "IDR");
        assert!(!created.withdrawal.destination_enc.contains("8830012345"));
        assert_eq!(created.balance.available(), Decimal::from(50_000));
        assert_eq!(created.balance.pending(), Decimal::from(150_000));
    }

    #[tokio::test]
    async fn test_limits_enforced() {
        let (processor, _) = setup(100_000_000).await;
        assert!(matches!(
            processor.create(request(99_999)).await,
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            processor.create(request(50_000_001)).await,
            Err(PaymentError::Validation(_))
        ));
        let mut wrong_currency = request(200_000);
        wrong_currency.currency = "USD".into();
        assert!(matches!(
            processor.create(wrong_currency).await,
            Err(PaymentError::Validation(_))
        ));
        assert!(processor.create(request(100_000)).await.is_ok());
        assert!(processor.create(request(50_000_000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let (processor, store) = setup(120_000).await;
        let err = processor.create(request(150_000)).await.unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
        let balance = store.get_balance(USER).await.unwrap();
        assert_eq!(balance.available(), Decimal::from(120_000));
        assert!(processor.list(&Identity::user(USER)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_finalizes() {
        let (processor, store) = setup(500_000).await;
        let reviewer = Identity::reviewer(REVIEWER);
        let id = processor.create(request(200_000)).await.unwrap().withdrawal.id;

        // Complete straight from pending is not allowed
        let err = processor
            .process(
                id,
                &reviewer,
                ProcessAction::Complete {
                    external_reference: "TRX-1".into(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition(_)));

        processor
            .process(id, &reviewer, ProcessAction::Start, None)
            .await
            .unwrap();
        let err = processor
            .process(
                id,
                &reviewer,
                ProcessAction::Complete {
                    external_reference: " ".into(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        let done = processor
            .process(
                id,
                &reviewer,
                ProcessAction::Complete {
                    external_reference: "TRX-1".into(),
                },
                Some("paid via BCA".into()),
            )
            .await
            .unwrap();
        assert_eq!(done.status, WithdrawalStatus::Completed);
        assert_eq!(done.external_reference.as_deref(), Some("TRX-1"));
        assert_eq!(done.processed_by, Some(REVIEWER));
        assert!(done.completed_at.is_some());

        let balance = store.get_balance(USER).await.unwrap();
        assert_eq!(balance.available(), Decimal::from(300_000));
        assert_eq!(balance.pending(), Decimal::ZERO);
        assert_eq!(balance.withdrawn(), Decimal::from(200_000));
        assert!(balance.is_consistent());

        // Terminal
        let err = processor
            .process(
                id,
                &reviewer,
                ProcessAction::Reject {
                    reason: "late".into(),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_reject_releases() {
        let (processor, store) = setup(180_000).await;
        let before = store.get_balance(USER).await.unwrap();
        let id = processor.create(request(100_000)).await.unwrap().withdrawal.id;

        let rejected = processor
            .process(
                id,
                &Identity::reviewer(REVIEWER),
                ProcessAction::Reject {
                    reason: "name mismatch".into(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(rejected.processor_notes.as_deref(), Some("name mismatch"));

        let after = store.get_balance(USER).await.unwrap();
        assert_eq!(after.available(), before.available());
        assert_eq!(after.pending(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_authorization() {
        let (processor, _) = setup(500_000).await;
        let id = processor.create(request(100_000)).await.unwrap().withdrawal.id;

        let err = processor
            .process(id, &Identity::user(REVIEWER), ProcessAction::Start, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Forbidden(_)));

        let err = processor
            .process(id, &Identity::reviewer(USER), ProcessAction::Start, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Forbidden(_)));

        assert!(matches!(
            processor.get(id, &Identity::user(4242)).await,
            Err(PaymentError::NotFound(_))
        ));
        assert!(processor.get(id, &Identity::user(USER)).await.is_ok());

        let dest = processor
            .reveal_destination(id, &Identity::reviewer(REVIEWER))
            .await
            .unwrap();
        assert_eq!(dest.account_number, "8830012345");
        assert!(
            processor
                .reveal_destination(id, &Identity::user(USER))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let (processor, _) = setup(1_000_000).await;
        let first = processor.create(request(100_000)).await.unwrap().withdrawal.id;
        let second = processor.create(request(100_000)).await.unwrap().withdrawal.id;
        let list = processor.list(&Identity::user(USER)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second);
        assert_eq!(list[1].id, first);
    }
}
