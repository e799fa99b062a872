//! Payment Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::state::PaymentStatus;
use crate::balance::Credit;
use crate::vault::{Vault, VaultError};

/// User identity as resolved by the auth collaborator
pub type UserId = i64;

/// Payment ID - ULID-based, sortable by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PaymentId(ulid::Ulid);

impl PaymentId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaymentId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl From<PaymentId> for String {
    fn from(id: PaymentId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for PaymentId {
    type Error = ulid::DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What the payment pays for; selects the payout fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Order,
    MembershipUpgrade,
    WithdrawalRelated,
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Order => "order",
            PaymentType::MembershipUpgrade => "membership_upgrade",
            PaymentType::WithdrawalRelated => "withdrawal_related",
            PaymentType::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order" => Some(PaymentType::Order),
            "membership_upgrade" => Some(PaymentType::MembershipUpgrade),
            "withdrawal_related" => Some(PaymentType::WithdrawalRelated),
            "refund" => Some(PaymentType::Refund),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    HostedCard,
    HostedWallet,
    ManualBankTransfer,
    ManualWalletTransfer,
}

impl PaymentMethod {
    #[inline]
    pub fn is_hosted(&self) -> bool {
        matches!(self, PaymentMethod::HostedCard | PaymentMethod::HostedWallet)
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        !self.is_hosted()
    }

    /// Status a freshly created payment starts in
    pub fn initial_status(&self) -> PaymentStatus {
        if self.is_hosted() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::PendingVerification
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::HostedCard => "hosted_card",
            PaymentMethod::HostedWallet => "hosted_wallet",
            PaymentMethod::ManualBankTransfer => "manual_bank_transfer",
            PaymentMethod::ManualWalletTransfer => "manual_wallet_transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hosted_card" => Some(PaymentMethod::HostedCard),
            "hosted_wallet" => Some(PaymentMethod::HostedWallet),
            "manual_bank_transfer" => Some(PaymentMethod::ManualBankTransfer),
            "manual_wallet_transfer" => Some(PaymentMethod::ManualWalletTransfer),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Originating IP / user agent, kept for dispute evidence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

/// Plaintext sensitive fields, only ever held in memory
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SensitiveDetails {
    pub proof_image_ref: Option<String>,
    pub payer_account_name: Option<String>,
    pub payer_account_number: Option<String>,
    pub payer_phone: Option<String>,
    pub notes: Option<String>,
}

impl fmt::Debug for SensitiveDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveDetails").finish_non_exhaustive()
    }
}

impl SensitiveDetails {
    pub fn is_empty(&self) -> bool {
        self.proof_image_ref.is_none()
            && self.payer_account_name.is_none()
            && self.payer_account_number.is_none()
            && self.payer_phone.is_none()
            && self.notes.is_none()
    }

    /// Encrypt every present field
    pub fn seal(&self, vault: &Vault) -> Result<SealedDetails, VaultError> {
        Ok(SealedDetails {
            proof_image_ref: vault.encrypt_opt(self.proof_image_ref.as_deref())?,
            payer_account_name: vault.encrypt_opt(self.payer_account_name.as_deref())?,
            payer_account_number: vault.encrypt_opt(self.payer_account_number.as_deref())?,
            payer_phone: vault.encrypt_opt(self.payer_phone.as_deref())?,
            notes: vault.encrypt_opt(self.notes.as_deref())?,
        })
    }
}

/// Vault envelopes as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SealedDetails {
    pub proof_image_ref: Option<String>,
    pub payer_account_name: Option<String>,
    pub payer_account_number: Option<String>,
    pub payer_phone: Option<String>,
    pub notes: Option<String>,
}

impl SealedDetails {
    pub fn open(&self, vault: &Vault) -> Result<SensitiveDetails, VaultError> {
        Ok(SensitiveDetails {
            proof_image_ref: vault.decrypt_opt(self.proof_image_ref.as_deref())?,
            payer_account_name: vault.decrypt_opt(self.payer_account_name.as_deref())?,
            payer_account_number: vault.decrypt_opt(self.payer_account_number.as_deref())?,
            payer_phone: vault.decrypt_opt(self.payer_phone.as_deref())?,
            notes: vault.decrypt_opt(self.notes.as_deref())?,
        })
    }

    /// Overlay fields present in `update`, keeping the rest
    pub fn merge(&mut self, update: &SealedDetails) {
        fn overlay(dst: &mut Option<String>, src: &Option<String>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        overlay(&mut self.proof_image_ref, &update.proof_image_ref);
        overlay(&mut self.payer_account_name, &update.payer_account_name);
        overlay(&mut self.payer_account_number, &update.payer_account_number);
        overlay(&mut self.payer_phone, &update.payer_phone);
        overlay(&mut self.notes, &update.notes);
    }
}

/// Authoritative payment record
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    /// Party credited on completion (e.g. the seller of an order)
    pub recipient_id: Option<UserId>,
    pub order_id: Option<String>,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    /// Gateway-assigned reference, unique across payments
    pub gateway_ref: Option<String>,
    pub refund_amount: Decimal,
    pub sealed: SealedDetails,
    pub failure_reason: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub created_from: RequestContext,
    pub confirmed_from: RequestContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Amount still eligible for refund
    pub fn refundable(&self) -> Decimal {
        self.amount - self.refund_amount
    }
}

/// Input for creating a payment
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub user_id: UserId,
    pub recipient_id: Option<UserId>,
    pub order_id: Option<String>,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub details: SensitiveDetails,
    pub context: RequestContext,
}

/// A compare-and-set mutation of one payment row.
///
/// Applies only while the row is still in `expected` (and, for refunds,
/// still carries `expected_refund`). The optional `credit` is applied to the
/// balance ledger in the same atomic operation.
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    pub expected: PaymentStatus,
    pub expected_refund: Option<Decimal>,
    pub next: PaymentStatus,
    pub sealed: Option<SealedDetails>,
    pub confirmed_from: Option<RequestContext>,
    pub reviewed_by: Option<UserId>,
    pub failure_reason: Option<String>,
    /// New accumulated refund total
    pub refund_amount: Option<Decimal>,
    pub credit: Option<Credit>,
    pub at: DateTime<Utc>,
}

impl PaymentTransition {
    pub fn new(expected: PaymentStatus, next: PaymentStatus) -> Self {
        Self {
            expected,
            expected_refund: None,
            next,
            sealed: None,
            confirmed_from: None,
            reviewed_by: None,
            failure_reason: None,
            refund_amount: None,
            credit: None,
            at: Utc::now(),
        }
    }

    /// Apply the mutation to an in-memory record (predicate already checked)
    pub fn apply_to(&self, payment: &mut Payment) {
        payment.status = self.next;
        payment.updated_at = self.at;
        payment.processed_at = Some(self.at);
        if self.next == PaymentStatus::Completed {
            payment.completed_at = Some(self.at);
        }
        if let Some(sealed) = &self.sealed {
            payment.sealed.merge(sealed);
        }
        if let Some(ctx) = &self.confirmed_from {
            if ctx.ip.is_some() {
                payment.confirmed_from.ip.clone_from(&ctx.ip);
            }
            if ctx.user_agent.is_some() {
                payment
                    .confirmed_from
                    .user_agent
                    .clone_from(&ctx.user_agent);
            }
        }
        if self.reviewed_by.is_some() {
            payment.reviewed_by = self.reviewed_by;
        }
        if self.failure_reason.is_some() {
            payment.failure_reason.clone_from(&self.failure_reason);
        }
        if let Some(total) = self.refund_amount {
            payment.refund_amount = total;
        }
    }

    /// Whether a record still satisfies the CAS predicate
    pub fn matches(&self, payment: &Payment) -> bool {
        payment.status == self.expected
            && self
                .expected_refund
                .is_none_or(|refund| payment.refund_amount == refund)
    }
}

/// Result of applying an external event to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Transition applied now
    Applied,
    /// Payment already terminal and consistent with the event
    AlreadyApplied,
    /// No payment carries the gateway reference
    NotFound,
    /// Event type or outcome requires no action
    Ignored,
    /// Terminal but inconsistent, or mismatched amount; logged only
    Conflict,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::AlreadyApplied => "already_applied",
            ReconcileOutcome::NotFound => "not_found",
            ReconcileOutcome::Ignored => "ignored",
            ReconcileOutcome::Conflict => "conflict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::test_vault;

    #[test]
    fn test_payment_id_roundtrip() {
        let id = PaymentId::new();
        let parsed: PaymentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-ulid".parse::<PaymentId>().is_err());
    }

    #[test]
    fn test_payment_id_serde_as_string() {
        let id = PaymentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_method_initial_status() {
        assert_eq!(
            PaymentMethod::HostedCard.initial_status(),
            PaymentStatus::Pending
        );
        assert_eq!(
            PaymentMethod::ManualBankTransfer.initial_status(),
            PaymentStatus::PendingVerification
        );
        assert!(PaymentMethod::ManualWalletTransfer.is_manual());
        assert!(PaymentMethod::HostedWallet.is_hosted());
    }

    #[test]
    fn test_enum_text_forms() {
        assert_eq!(
            PaymentMethod::parse("manual_wallet_transfer"),
            Some(PaymentMethod::ManualWalletTransfer)
        );
        assert_eq!(PaymentMethod::parse("cash"), None);
        assert_eq!(
            PaymentType::parse("membership_upgrade"),
            Some(PaymentType::MembershipUpgrade)
        );
        let json = serde_json::to_string(&PaymentType::WithdrawalRelated).unwrap();
        assert_eq!(json, "\"withdrawal_related\"");
    }

    #[test]
    fn test_seal_and_open() {
        let vault = test_vault();
        let details = SensitiveDetails {
            proof_image_ref: Some("uploads/proof/abc.png".into()),
            payer_account_number: Some("1234567890".into()),
            notes: Some(" paid from BCA, ref 0042 ".into()),
            ..Default::default()
        };
        let sealed = details.seal(&vault).unwrap();
        assert!(sealed.payer_account_number.as_deref().unwrap().starts_with("v1."));
        assert!(sealed.payer_phone.is_none());
        assert_eq!(sealed.open(&vault).unwrap(), details);
    }

    #[test]
    fn test_sealed_merge_keeps_existing() {
        let mut base = SealedDetails {
            notes: Some("n1".into()),
            payer_phone: Some("p1".into()),
            ..Default::default()
        };
        base.merge(&SealedDetails {
            notes: Some("n2".into()),
            proof_image_ref: Some("img".into()),
            ..Default::default()
        });
        assert_eq!(base.notes.as_deref(), Some("n2"));
        assert_eq!(base.payer_phone.as_deref(), Some("p1"));
        assert_eq!(base.proof_image_ref.as_deref(), Some("img"));
    }

    #[test]
    fn test_sensitive_debug_is_opaque() {
        let details = SensitiveDetails {
            payer_account_number: Some("1234567890".into()),
            ..Default::default()
        };
        assert!(!format!("{:?}", details).contains("1234567890"));
    }
}
