//! Provider webhook endpoint (no bearer auth; authenticated by signature)

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;

use super::ClientContext;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiError;
use crate::gateway::types::views::WebhookAck;
use crate::webhook::SIGNATURE_HEADER;

/// POST /api/v1/payments/webhook
///
/// 200 once acknowledged (including unknown references and replays), 401 on
/// signature failure, 500 only when the ledger could not be written.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    ctx: ClientContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let outcome = state
        .reconciler
        .handle(signature, &body, ctx.ip.as_deref())
        .await?;
    Ok((
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            outcome,
        }),
    ))
}
