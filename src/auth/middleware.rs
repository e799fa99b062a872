//! Bearer token middleware
//!
//! Verifies `Authorization: Bearer <jwt>` and injects the resolved
//! [`Identity`](super::Identity) into request extensions.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::PaymentError;
use crate::gateway::{state::AppState, types::ApiError};

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(ApiError(PaymentError::Unauthorized))?;

    let identity = state.verifier.verify(token.trim())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
