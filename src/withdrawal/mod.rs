//! Withdrawal Processor
//!
//! Moves earned funds out of a user's balance:
//! creation reserves `available -> pending`, completion finalizes
//! `pending -> withdrawn`, rejection releases `pending -> available`.
//! Each step commits together with the withdrawal row's status CAS.

pub mod processor;
pub mod state;
pub mod types;

pub use processor::{CreatedWithdrawal, ProcessAction, WithdrawalProcessor, WithdrawalRequest};
pub use state::WithdrawalStatus;
pub use types::{
    DestinationDetails, DestinationMethod, Withdrawal, WithdrawalId, WithdrawalTransition,
};
