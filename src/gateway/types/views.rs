//! Request bodies and response views
//!
//! Views never carry plaintext sensitive fields: payer details are masked and
//! withdrawal destinations are reduced to the provider plus a masked number.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StrictAmount;
use crate::adapter::{Instructions, Intent};
use crate::balance::BalanceAccount;
use crate::payment::{
    Payment, PaymentId, PaymentMethod, PaymentStatus, PaymentType, ReconcileOutcome,
    SensitiveDetails, UserId,
};
use crate::vault::mask;
use crate::withdrawal::{
    DestinationDetails, DestinationMethod, Withdrawal, WithdrawalId, WithdrawalStatus,
};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: StrictAmount,
    pub currency: String,
    pub method: PaymentMethod,
    #[serde(default = "default_payment_type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Party credited on completion
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_payment_type() -> PaymentType {
    PaymentType::Order
}

/// Manual transfer proof submission
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub proof_image_ref: Option<String>,
    pub payer_account_name: Option<String>,
    pub payer_account_number: Option<String>,
    pub payer_phone: Option<String>,
    pub notes: Option<String>,
}

impl From<ConfirmPaymentRequest> for SensitiveDetails {
    fn from(req: ConfirmPaymentRequest) -> Self {
        SensitiveDetails {
            proof_image_ref: req.proof_image_ref,
            payer_account_name: req.payer_account_name,
            payer_account_number: req.payer_account_number,
            payer_phone: req.payer_phone,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: StrictAmount,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub status: PaymentStatus,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DestinationRequest {
    pub provider: String,
    pub account_number: String,
    pub account_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub amount: StrictAmount,
    pub currency: String,
    pub method: DestinationMethod,
    pub destination: DestinationRequest,
}

impl From<DestinationRequest> for DestinationDetails {
    fn from(req: DestinationRequest) -> Self {
        DestinationDetails {
            provider: req.provider,
            account_number: req.account_number,
            account_name: req.account_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessWithdrawalAction {
    Start,
    Complete,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ProcessWithdrawalRequest {
    pub action: ProcessWithdrawalAction,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Masked payer details
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PayerView {
    pub has_proof: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<&SensitiveDetails> for PayerView {
    fn from(details: &SensitiveDetails) -> Self {
        Self {
            has_proof: details.proof_image_ref.is_some(),
            account_name: details.payer_account_name.as_deref().map(|v| mask(v, 3)),
            account_number: details.payer_account_number.as_deref().map(|v| mask(v, 4)),
            phone: details.payer_phone.as_deref().map(|v| mask(v, 4)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub refund_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<PayerView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentView {
    pub fn new(payment: &Payment, details: Option<&SensitiveDetails>) -> Self {
        Self {
            payment_id: payment.id,
            user_id: payment.user_id,
            recipient_id: payment.recipient_id,
            order_id: payment.order_id.clone(),
            payment_type: payment.payment_type,
            method: payment.method,
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: payment.status,
            refund_amount: payment.refund_amount,
            gateway_ref: payment.gateway_ref.clone(),
            failure_reason: payment.failure_reason.clone(),
            payer: details.map(PayerView::from),
            created_at: payment.created_at,
            updated_at: payment.updated_at,
            completed_at: payment.completed_at,
        }
    }
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self::new(payment, None)
    }
}

#[derive(Debug, Serialize)]
pub struct IntentView {
    pub payment: PaymentView,
    pub client_handle: String,
    pub instructions: Instructions,
}

impl IntentView {
    pub fn new(payment: &Payment, intent: Intent) -> Self {
        Self {
            payment: PaymentView::from(payment),
            client_handle: intent.client_handle,
            instructions: intent.instructions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncView {
    pub outcome: ReconcileOutcome,
    pub payment: PaymentView,
}

#[derive(Debug, Serialize)]
pub struct BalanceView {
    pub user_id: UserId,
    pub available: Decimal,
    pub pending: Decimal,
    pub withdrawn: Decimal,
    pub lifetime_earned: Decimal,
}

impl From<&BalanceAccount> for BalanceView {
    fn from(account: &BalanceAccount) -> Self {
        Self {
            user_id: account.user_id(),
            available: account.available(),
            pending: account.pending(),
            withdrawn: account.withdrawn(),
            lifetime_earned: account.lifetime_earned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalView {
    pub withdrawal_id: WithdrawalId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub method: DestinationMethod,
    pub status: WithdrawalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Withdrawal> for WithdrawalView {
    fn from(w: &Withdrawal) -> Self {
        Self {
            withdrawal_id: w.id,
            user_id: w.user_id,
            amount: w.amount,
            currency: w.currency.clone(),
            method: w.method,
            status: w.status,
            processed_by: w.processed_by,
            processor_notes: w.processor_notes.clone(),
            external_reference: w.external_reference.clone(),
            created_at: w.created_at,
            updated_at: w.updated_at,
            completed_at: w.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedWithdrawalView {
    pub withdrawal: WithdrawalView,
    /// Amount moved from available to pending
    pub reserved: Decimal,
    pub balance: BalanceView,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: ReconcileOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payer_view_masks() {
        let details = SensitiveDetails {
            proof_image_ref: Some("uploads/p.png".into()),
            payer_account_name: Some("Budi Santoso".into()),
            payer_account_number: Some("1234567890".into()),
            payer_phone: Some("081234567890".into()),
            notes: Some("secret note".into()),
        };
        let view = PayerView::from(&details);
        assert!(view.has_proof);
        assert_eq!(view.account_number.as_deref(), Some("******7890"));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("1234567890"));
        assert!(!json.contains("081234567890"));
        assert!(!json.contains("secret note"));
        assert!(!json.contains("uploads"));
    }

    #[test]
    fn test_request_defaults() {
        let req: CreateIntentRequest = serde_json::from_str(
            r#"{"amount":"100000","currency":"IDR","method":"manual_bank_transfer"}"#,
        )
        .unwrap();
        assert_eq!(req.payment_type, PaymentType::Order);
        assert!(req.recipient_id.is_none());

        let req: ProcessWithdrawalRequest =
            serde_json::from_str(r#"{"action":"complete","external_reference":"TRX-9"}"#)
                .unwrap();
        assert_eq!(req.action, ProcessWithdrawalAction::Complete);
    }
}
