//! Withdrawal Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::state::WithdrawalStatus;
use crate::balance::BalanceMove;
use crate::payment::UserId;
use crate::vault::{Vault, VaultError};

/// Withdrawal ID - ULID-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WithdrawalId(ulid::Ulid);

impl WithdrawalId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for WithdrawalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WithdrawalId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl From<WithdrawalId> for String {
    fn from(id: WithdrawalId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for WithdrawalId {
    type Error = ulid::DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payout destination family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationMethod {
    BankTransfer,
    EWallet,
}

impl DestinationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationMethod::BankTransfer => "bank_transfer",
            DestinationMethod::EWallet => "e_wallet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bank_transfer" => Some(DestinationMethod::BankTransfer),
            "e_wallet" => Some(DestinationMethod::EWallet),
            _ => None,
        }
    }
}

impl fmt::Display for DestinationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plaintext payout destination; persisted only as one vault envelope
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDetails {
    /// Bank name or e-wallet provider
    pub provider: String,
    /// Account number or wallet phone number
    pub account_number: String,
    pub account_name: String,
}

impl fmt::Debug for DestinationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationDetails")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl DestinationDetails {
    pub fn seal(&self, vault: &Vault) -> Result<String, VaultError> {
        let json =
            serde_json::to_string(self).map_err(|e| VaultError::Encryption(e.to_string()))?;
        vault.encrypt(&json)
    }

    pub fn open(envelope: &str, vault: &Vault) -> Result<Self, VaultError> {
        let json = vault.decrypt(envelope)?;
        serde_json::from_str(&json).map_err(|e| VaultError::Decryption(e.to_string()))
    }
}

/// Withdrawal record
#[derive(Debug, Clone)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub method: DestinationMethod,
    /// Vault envelope of [`DestinationDetails`]
    pub destination_enc: String,
    pub status: WithdrawalStatus,
    pub processed_by: Option<UserId>,
    pub processor_notes: Option<String>,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Compare-and-set mutation of one withdrawal row, with its balance effect
#[derive(Debug, Clone)]
pub struct WithdrawalTransition {
    pub expected: WithdrawalStatus,
    pub next: WithdrawalStatus,
    pub balance_move: Option<BalanceMove>,
    pub processed_by: UserId,
    pub notes: Option<String>,
    pub external_reference: Option<String>,
    pub at: DateTime<Utc>,
}

impl WithdrawalTransition {
    pub fn apply_to(&self, withdrawal: &mut Withdrawal) {
        withdrawal.status = self.next;
        withdrawal.updated_at = self.at;
        withdrawal.processed_by = Some(self.processed_by);
        if self.notes.is_some() {
            withdrawal.processor_notes.clone_from(&self.notes);
        }
        if self.external_reference.is_some() {
            withdrawal
                .external_reference
                .clone_from(&self.external_reference);
        }
        if self.next == WithdrawalStatus::Completed {
            withdrawal.completed_at = Some(self.at);
        }
    }
}
