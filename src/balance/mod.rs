//! Balance Ledger
//!
//! Per-user earnings account, mutated only through two primitives:
//! [`BalanceAccount::credit`] and [`BalanceAccount::apply_move`].
//!
//! # Invariants (enforced by private fields):
//! - `available`, `pending`, `withdrawn` are never negative
//! - `available + pending + withdrawn == lifetime_earned`
//! - money only enters through `credit`; `move` conserves the total
//! - `version` increments on every mutation
//!
//! Stores serialize mutations per user (row lock / entry lock) and call the
//! same primitives, so the in-memory and PostgreSQL ledgers agree.

mod ledger;
mod payout;

pub use ledger::BalanceLedger;
pub use payout::PayoutTable;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PaymentError, PaymentResult};
use crate::payment::UserId;

/// Balance bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Available,
    /// Reserved for an open withdrawal
    Pending,
    /// Paid out; final
    Withdrawn,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bucket::Available => "available",
            Bucket::Pending => "pending",
            Bucket::Withdrawn => "withdrawn",
        };
        f.write_str(s)
    }
}

/// Credit of earned funds to a user's available bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub user_id: UserId,
    pub amount: Decimal,
}

/// Movement between buckets of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceMove {
    pub user_id: UserId,
    pub amount: Decimal,
    pub from: Bucket,
    pub to: Bucket,
}

impl BalanceMove {
    /// available -> pending (withdrawal requested)
    pub fn reserve(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            amount,
            from: Bucket::Available,
            to: Bucket::Pending,
        }
    }

    /// pending -> available (withdrawal rejected)
    pub fn release(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            amount,
            from: Bucket::Pending,
            to: Bucket::Available,
        }
    }

    /// pending -> withdrawn (payout completed)
    pub fn finalize(user_id: UserId, amount: Decimal) -> Self {
        Self {
            user_id,
            amount,
            from: Bucket::Pending,
            to: Bucket::Withdrawn,
        }
    }

    /// Positive amount and an allowed bucket pair
    pub fn validate(&self) -> PaymentResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "balance move amount must be positive".into(),
            ));
        }
        match (self.from, self.to) {
            (Bucket::Available, Bucket::Pending)
            | (Bucket::Pending, Bucket::Available)
            | (Bucket::Pending, Bucket::Withdrawn) => Ok(()),
            (from, to) => Err(PaymentError::Validation(format!(
                "balance move {} -> {} is not allowed",
                from, to
            ))),
        }
    }
}

/// Earnings account of a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceAccount {
    user_id: UserId,
    available: Decimal,
    pending: Decimal,
    withdrawn: Decimal,
    lifetime_earned: Decimal,
    version: i64,
}

impl BalanceAccount {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            available: Decimal::ZERO,
            pending: Decimal::ZERO,
            withdrawn: Decimal::ZERO,
            lifetime_earned: Decimal::ZERO,
            version: 0,
        }
    }

    /// Rebuild from persisted columns, rejecting rows that break the invariants
    pub fn from_parts(
        user_id: UserId,
        available: Decimal,
        pending: Decimal,
        withdrawn: Decimal,
        lifetime_earned: Decimal,
        version: i64,
    ) -> PaymentResult<Self> {
        let account = Self {
            user_id,
            available,
            pending,
            withdrawn,
            lifetime_earned,
            version,
        };
        if !account.is_consistent() {
            return Err(PaymentError::Database(format!(
                "balance row for user {} violates ledger invariants",
                user_id
            )));
        }
        Ok(account)
    }

    // ============================================================
    // READ-ONLY GETTERS
    // ============================================================

    #[inline]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline]
    pub fn available(&self) -> Decimal {
        self.available
    }

    #[inline]
    pub fn pending(&self) -> Decimal {
        self.pending
    }

    #[inline]
    pub fn withdrawn(&self) -> Decimal {
        self.withdrawn
    }

    #[inline]
    pub fn lifetime_earned(&self) -> Decimal {
        self.lifetime_earned
    }

    #[inline]
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn bucket(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Available => self.available,
            Bucket::Pending => self.pending,
            Bucket::Withdrawn => self.withdrawn,
        }
    }

    /// All buckets non-negative and summing to lifetime earnings
    pub fn is_consistent(&self) -> bool {
        self.available >= Decimal::ZERO
            && self.pending >= Decimal::ZERO
            && self.withdrawn >= Decimal::ZERO
            && self.available + self.pending + self.withdrawn == self.lifetime_earned
    }

    // ============================================================
    // VALIDATED MUTATIONS
    // ============================================================

    /// Add earned funds to `bucket` (available or pending)
    ///
    /// # Errors
    /// - `Validation` for non-positive amounts or the withdrawn bucket
    pub fn credit(&mut self, amount: Decimal, bucket: Bucket) -> PaymentResult<()> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "credit amount must be positive".into(),
            ));
        }
        let earned = self
            .lifetime_earned
            .checked_add(amount)
            .ok_or_else(|| PaymentError::Validation("credit overflow".into()))?;
        match bucket {
            Bucket::Available => self.available += amount,
            Bucket::Pending => self.pending += amount,
            Bucket::Withdrawn => {
                return Err(PaymentError::Validation(
                    "cannot credit the withdrawn bucket".into(),
                ));
            }
        }
        self.lifetime_earned = earned;
        self.version += 1;
        Ok(())
    }

    /// Move funds between buckets; the total is unchanged
    ///
    /// # Errors
    /// - `Validation` for disallowed bucket pairs or non-positive amounts
    /// - `InsufficientBalance` if the source bucket is short (no change applied)
    pub fn apply_move(&mut self, mv: &BalanceMove) -> PaymentResult<()> {
        mv.validate()?;
        let source = self.bucket(mv.from);
        if source < mv.amount {
            return Err(PaymentError::InsufficientBalance {
                available: source.to_string(),
                requested: mv.amount.to_string(),
            });
        }
        *self.bucket_mut(mv.from) -= mv.amount;
        *self.bucket_mut(mv.to) += mv.amount;
        self.version += 1;
        Ok(())
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Decimal {
        match bucket {
            Bucket::Available => &mut self.available,
            Bucket::Pending => &mut self.pending,
            Bucket::Withdrawn => &mut self.withdrawn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(amount: i64) -> BalanceAccount {
        let mut acc = BalanceAccount::new(7);
        acc.credit(Decimal::from(amount), Bucket::Available).unwrap();
        acc
    }

    #[test]
    fn test_credit() {
        let mut acc = BalanceAccount::new(7);
        acc.credit(Decimal::from(100), Bucket::Available).unwrap();
        assert_eq!(acc.available(), Decimal::from(100));
        assert_eq!(acc.lifetime_earned(), Decimal::from(100));
        assert_eq!(acc.version(), 1);

        acc.credit(Decimal::from(20), Bucket::Pending).unwrap();
        assert_eq!(acc.pending(), Decimal::from(20));
        assert_eq!(acc.lifetime_earned(), Decimal::from(120));
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_credit_rejects_bad_input() {
        let mut acc = BalanceAccount::new(7);
        assert!(acc.credit(Decimal::ZERO, Bucket::Available).is_err());
        assert!(acc.credit(Decimal::from(-5), Bucket::Available).is_err());
        assert!(acc.credit(Decimal::from(5), Bucket::Withdrawn).is_err());
        assert_eq!(acc, BalanceAccount::new(7));
    }

    #[test]
    fn test_reserve_release_finalize() {
        let mut acc = funded(100_000);

        acc.apply_move(&BalanceMove::reserve(7, Decimal::from(50_000)))
            .unwrap();
        assert_eq!(acc.available(), Decimal::from(50_000));
        assert_eq!(acc.pending(), Decimal::from(50_000));

        acc.apply_move(&BalanceMove::release(7, Decimal::from(20_000)))
            .unwrap();
        assert_eq!(acc.available(), Decimal::from(70_000));
        assert_eq!(acc.pending(), Decimal::from(30_000));

        acc.apply_move(&BalanceMove::finalize(7, Decimal::from(30_000)))
            .unwrap();
        assert_eq!(acc.pending(), Decimal::ZERO);
        assert_eq!(acc.withdrawn(), Decimal::from(30_000));
        assert_eq!(acc.lifetime_earned(), Decimal::from(100_000));
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_insufficient_leaves_state_unchanged() {
        let mut acc = funded(10);
        let before = acc.clone();
        let err = acc
            .apply_move(&BalanceMove::reserve(7, Decimal::from(11)))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InsufficientBalance { .. }));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_disallowed_moves() {
        let mut acc = funded(10);
        let back_out = BalanceMove {
            user_id: 7,
            amount: Decimal::ONE,
            from: Bucket::Withdrawn,
            to: Bucket::Available,
        };
        assert!(matches!(
            acc.apply_move(&back_out),
            Err(PaymentError::Validation(_))
        ));
        let skip_pending = BalanceMove {
            user_id: 7,
            amount: Decimal::ONE,
            from: Bucket::Available,
            to: Bucket::Withdrawn,
        };
        assert!(acc.apply_move(&skip_pending).is_err());
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_rows() {
        assert!(
            BalanceAccount::from_parts(
                1,
                Decimal::from(10),
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::from(10),
                3
            )
            .is_ok()
        );
        assert!(
            BalanceAccount::from_parts(
                1,
                Decimal::from(10),
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::from(5),
                3
            )
            .is_err()
        );
    }

    #[test]
    fn test_conservation_under_mixed_sequence() {
        let mut acc = BalanceAccount::new(9);
        let ops: [(u8, i64); 10] = [
            (0, 500),
            (1, 200),
            (1, 400),
            (2, 50),
            (3, 100),
            (0, 30),
            (1, 330),
            (3, 500),
            (2, 20),
            (3, 10),
        ];
        for (op, amt) in ops {
            let amt = Decimal::from(amt);
            let _ = match op {
                0 => acc.credit(amt, Bucket::Available),
                1 => acc.apply_move(&BalanceMove::reserve(9, amt)),
                2 => acc.apply_move(&BalanceMove::release(9, amt)),
                _ => acc.apply_move(&BalanceMove::finalize(9, amt)),
            };
            assert!(acc.is_consistent());
            assert!(acc.available() + acc.pending() <= acc.lifetime_earned());
        }
    }
}
