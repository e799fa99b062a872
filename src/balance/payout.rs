//! Payout fractions per payment type

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

use crate::config::PayoutConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::payment::PaymentType;

/// Decimal places of credited payouts
const PAYOUT_SCALE: u32 = 2;

/// Share of a completed payment credited to its recipient, by type
#[derive(Debug, Clone)]
pub struct PayoutTable {
    fractions: HashMap<PaymentType, Decimal>,
}

impl PayoutTable {
    /// Build from config; every fraction must lie in `[0, 1]`.
    /// Types missing from the table pay out nothing.
    pub fn from_config(config: &PayoutConfig) -> PaymentResult<Self> {
        for (ty, fraction) in &config.fractions {
            if *fraction < Decimal::ZERO || *fraction > Decimal::ONE {
                return Err(PaymentError::Configuration(format!(
                    "payout fraction for {} must be within [0, 1], got {}",
                    ty, fraction
                )));
            }
        }
        Ok(Self {
            fractions: config.fractions.clone(),
        })
    }

    pub fn fraction(&self, payment_type: PaymentType) -> Decimal {
        self.fractions
            .get(&payment_type)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// `amount × fraction`, rounded toward zero to cents
    pub fn payout(&self, payment_type: PaymentType, amount: Decimal) -> Decimal {
        (amount * self.fraction(payment_type))
            .round_dp_with_strategy(PAYOUT_SCALE, RoundingStrategy::ToZero)
    }
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self {
            fractions: PayoutConfig::default().fractions,
        }
    }
}
