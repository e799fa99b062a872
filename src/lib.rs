//! Payment Core - payment ledger, gateway reconciliation and withdrawals
//!
//! # Modules
//!
//! - [`vault`] - Field encryption, hashing, log masking
//! - [`payment`] - Payment ledger and its state machine
//! - [`balance`] - Per-user balance buckets and payout fractions
//! - [`adapter`] - Hosted and manual gateway adapters
//! - [`webhook`] - Signed provider event reconciliation
//! - [`withdrawal`] - Withdrawal requests and reviewer processing
//! - [`store`] - Persistence traits, in-memory and PostgreSQL stores
//! - [`notify`] - Outbound notification / order events
//! - [`auth`] - JWT identity resolution
//! - [`gateway`] - HTTP surface (axum)
//! - [`money`] - Amount parsing and minor units

// Ambient
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod money;

// Core
pub mod adapter;
pub mod balance;
pub mod payment;
pub mod store;
pub mod vault;
pub mod webhook;
pub mod withdrawal;

// Edges
pub mod auth;
pub mod gateway;
pub mod notify;

// Convenient re-exports at crate root
pub use error::{PaymentError, PaymentResult};
pub use payment::{Payment, PaymentId, PaymentLedger, PaymentMethod, PaymentStatus};
pub use vault::Vault;
pub use withdrawal::{Withdrawal, WithdrawalProcessor, WithdrawalStatus};
