//! Payment Error Types
//!
//! One error taxonomy for the ledger, adapters, reconciler and withdrawal
//! processor. Stable `code()` strings are the error kind surfaced to clients.

use thiserror::Error;

use crate::vault::VaultError;

/// Payment core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    // === Caller Errors ===
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: String, requested: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not authenticated")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // === Authenticity / Secrets ===
    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // === Gateway ===
    #[error("Gateway transient error: {0}")]
    GatewayTransient(String),

    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    // === System ===
    #[error("Database error: {0}")]
    Database(String),
}

impl PaymentError {
    /// Stable error kind for API responses
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "VALIDATION_ERROR",
            PaymentError::InvalidTransition(_) => "INVALID_TRANSITION",
            PaymentError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            PaymentError::NotFound(_) => "NOT_FOUND",
            PaymentError::Unauthorized => "UNAUTHORIZED",
            PaymentError::Forbidden(_) => "FORBIDDEN",
            PaymentError::SignatureVerification(_) => "SIGNATURE_VERIFICATION_FAILED",
            PaymentError::Decryption(_) => "DECRYPTION_ERROR",
            PaymentError::Configuration(_) => "CONFIGURATION_ERROR",
            PaymentError::GatewayTransient(_) => "GATEWAY_TRANSIENT",
            PaymentError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            PaymentError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            PaymentError::Validation(_) => 400,
            PaymentError::Unauthorized | PaymentError::SignatureVerification(_) => 401,
            PaymentError::Forbidden(_) => 403,
            PaymentError::NotFound(_) => 404,
            PaymentError::InvalidTransition(_) => 409,
            PaymentError::InsufficientBalance { .. } => 422,
            PaymentError::Decryption(_)
            | PaymentError::Configuration(_)
            | PaymentError::Database(_) => 500,
            PaymentError::GatewayTransient(_) | PaymentError::GatewayUnavailable(_) => 503,
        }
    }

    /// Message safe to return to clients.
    ///
    /// Verification and secret-handling internals are replaced with generic text.
    pub fn public_message(&self) -> String {
        match self {
            PaymentError::SignatureVerification(_) => "Invalid webhook signature".to_string(),
            PaymentError::Decryption(_) | PaymentError::Configuration(_) => {
                "Unable to process sensitive payment data".to_string()
            }
            PaymentError::Database(_) => "Internal storage error".to_string(),
            PaymentError::GatewayUnavailable(_) | PaymentError::GatewayTransient(_) => {
                "Payment gateway temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether the client may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayTransient(_) | PaymentError::GatewayUnavailable(_)
        )
    }
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::Database(e.to_string())
    }
}

impl From<VaultError> for PaymentError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Configuration(msg) => PaymentError::Configuration(msg),
            VaultError::Decryption(msg) | VaultError::Encryption(msg) => {
                PaymentError::Decryption(msg)
            }
        }
    }
}

impl From<crate::money::MoneyError> for PaymentError {
    fn from(e: crate::money::MoneyError) -> Self {
        PaymentError::Validation(e.to_string())
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;
