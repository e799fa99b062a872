//! Manual bank / e-wallet transfers
//!
//! No external system is contacted: instructions are derived
//! deterministically from the payment id and configured destinations. The
//! user then uploads proof and a reviewer confirms.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{AuditStamp, GatewayAdapter, GatewayOutcome, Instructions, Intent, IntentRequest};
use crate::config::ManualConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money;
use crate::payment::{PaymentId, PaymentMethod};

/// Prefix of gateway references assigned to manual payments
pub const MANUAL_REF_PREFIX: &str = "MAN-";

/// Where and how much to transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualInstructions {
    /// bank name or e-wallet provider
    pub provider: String,
    pub account_number: String,
    pub account_holder: String,
    /// Quote in the transfer description
    pub reference_code: String,
    /// Exact amount to transfer: amount plus a unique code for matching
    pub reference_amount: Decimal,
    pub unique_code: u32,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
}

pub struct ManualTransfer {
    config: ManualConfig,
}

impl ManualTransfer {
    pub fn new(config: ManualConfig) -> Self {
        Self { config }
    }

    /// 8 uppercase hex chars of md5(payment id)
    pub fn reference_code(payment_id: PaymentId) -> String {
        let digest = md5::compute(payment_id.to_string());
        format!("{:x}", digest)[..8].to_ascii_uppercase()
    }

    /// Code in 1..=999 added to the amount so transfers can be told apart
    pub fn unique_code(payment_id: PaymentId) -> u32 {
        let digest = md5::compute(payment_id.to_string());
        let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        n % 999 + 1
    }

    pub fn gateway_ref(payment_id: PaymentId) -> String {
        format!("{}{}", MANUAL_REF_PREFIX, payment_id)
    }

    fn destination(&self, method: PaymentMethod) -> PaymentResult<(String, String, String)> {
        match method {
            PaymentMethod::ManualBankTransfer => {
                let bank = &self.config.bank;
                Ok((
                    bank.bank_name.clone(),
                    bank.account_number.clone(),
                    bank.account_holder.clone(),
                ))
            }
            PaymentMethod::ManualWalletTransfer => {
                let wallet = &self.config.wallet;
                Ok((
                    wallet.provider.clone(),
                    wallet.phone_number.clone(),
                    wallet.account_holder.clone(),
                ))
            }
            other => Err(PaymentError::Validation(format!(
                "{} is not a manual method",
                other
            ))),
        }
    }
}

#[async_trait]
impl GatewayAdapter for ManualTransfer {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn validate(&self, amount: Decimal, currency: &str) -> PaymentResult<()> {
        if currency != self.config.currency {
            return Err(PaymentError::Validation(format!(
                "manual transfers only accept {}",
                self.config.currency
            )));
        }
        if amount < self.config.min_amount {
            return Err(PaymentError::Validation(format!(
                "amount {} below manual transfer minimum {}",
                amount, self.config.min_amount
            )));
        }
        money::to_minor_units(amount, currency)?;
        Ok(())
    }

    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<Intent> {
        let (provider, account_number, account_holder) = self.destination(request.method)?;
        let audit = AuditStamp::from_context(&request.context);
        let unique_code = Self::unique_code(request.payment_id);
        let reference_code = Self::reference_code(request.payment_id);

        let instructions = ManualInstructions {
            provider,
            account_number,
            account_holder,
            reference_code: reference_code.clone(),
            reference_amount: request.amount + Decimal::from(unique_code),
            unique_code,
            currency: request.currency.clone(),
            expires_at: audit.at + Duration::hours(self.config.instruction_ttl_hours),
        };

        Ok(Intent {
            client_handle: reference_code,
            gateway_ref: Self::gateway_ref(request.payment_id),
            instructions: Instructions::Manual(instructions),
            audit,
        })
    }

    async fn confirm(&self, _gateway_ref: &str) -> PaymentResult<GatewayOutcome> {
        Err(PaymentError::Validation(
            "manual payments are confirmed by proof submission".into(),
        ))
    }
}
