//! API response envelope and error mapping
//!
//! - `ApiResponse<T>`: success wrapper `{code: 0, msg: "ok", data}`
//! - `ApiError`: `PaymentError` rendered as `{code, error, msg}` with its HTTP status
//! - `error_codes`: numeric codes per error kind

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::PaymentError;

/// Unified API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 0 for success
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const VALIDATION: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const INVALID_TRANSITION: i32 = 1003;

    // Auth errors (2xxx)
    pub const UNAUTHORIZED: i32 = 2001;
    pub const FORBIDDEN: i32 = 2003;
    pub const SIGNATURE_VERIFICATION: i32 = 2010;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const GATEWAY_UNAVAILABLE: i32 = 5001;
    pub const SENSITIVE_DATA: i32 = 5002;
}

pub fn numeric_code(err: &PaymentError) -> i32 {
    use error_codes::*;
    match err {
        PaymentError::Validation(_) => VALIDATION,
        PaymentError::InvalidTransition(_) => INVALID_TRANSITION,
        PaymentError::InsufficientBalance { .. } => INSUFFICIENT_BALANCE,
        PaymentError::NotFound(_) => NOT_FOUND,
        PaymentError::Unauthorized => UNAUTHORIZED,
        PaymentError::Forbidden(_) => FORBIDDEN,
        PaymentError::SignatureVerification(_) => SIGNATURE_VERIFICATION,
        PaymentError::Decryption(_) | PaymentError::Configuration(_) => SENSITIVE_DATA,
        PaymentError::GatewayTransient(_) | PaymentError::GatewayUnavailable(_) => {
            GATEWAY_UNAVAILABLE
        }
        PaymentError::Database(_) => INTERNAL_ERROR,
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: i32,
    /// Stable error kind
    pub error: &'static str,
    pub msg: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

/// Error side of every handler
#[derive(Debug)]
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(PaymentError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
        } else {
            tracing::debug!(code = err.code(), error = %err, "Request rejected");
        }
        let body = ApiErrorBody {
            code: numeric_code(&err),
            error: err.code(),
            msg: err.public_message(),
            retryable: err.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in the success envelope
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
