//! Gateway types module
//!
//! ## Input Types
//! - [`StrictAmount`]: format-validated amount for API input
//! - request bodies in [`views`]
//!
//! ## Output Types
//! - [`ApiResponse<T>`] and [`ApiError`]
//! - masked views in [`views`]

pub mod money;
pub mod response;
pub mod views;

pub use money::StrictAmount;
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};
