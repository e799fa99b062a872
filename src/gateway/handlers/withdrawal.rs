//! Withdrawal endpoints

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::parse_id;
use crate::auth::Identity;
use crate::error::PaymentError;
use crate::gateway::state::AppState;
use crate::gateway::types::views::{
    BalanceView, CreateWithdrawalRequest, CreatedWithdrawalView, ProcessWithdrawalAction,
    ProcessWithdrawalRequest, WithdrawalView,
};
use crate::gateway::types::{ApiResult, ok};
use crate::withdrawal::{ProcessAction, WithdrawalId, WithdrawalRequest};

/// POST /api/v1/withdrawals
pub async fn create_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateWithdrawalRequest>, JsonRejection>,
) -> ApiResult<CreatedWithdrawalView> {
    let Json(req) = payload?;
    let created = state
        .withdrawals
        .create(WithdrawalRequest {
            user_id: identity.user_id,
            amount: req.amount.inner(),
            currency: req.currency,
            method: req.method,
            destination: req.destination.into(),
        })
        .await?;
    ok(CreatedWithdrawalView {
        reserved: created.withdrawal.amount,
        withdrawal: WithdrawalView::from(&created.withdrawal),
        balance: BalanceView::from(&created.balance),
    })
}

/// GET /api/v1/withdrawals
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<WithdrawalView>> {
    let list = state.withdrawals.list(&identity).await?;
    ok(list.iter().map(WithdrawalView::from).collect())
}

/// GET /api/v1/withdrawals/{id}
pub async fn get_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<WithdrawalView> {
    let id: WithdrawalId = parse_id(&id, "withdrawal")?;
    let withdrawal = state.withdrawals.get(id, &identity).await?;
    ok(WithdrawalView::from(&withdrawal))
}

/// PUT /api/v1/withdrawals/{id}/process (reviewer)
pub async fn process_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<ProcessWithdrawalRequest>, JsonRejection>,
) -> ApiResult<WithdrawalView> {
    let id: WithdrawalId = parse_id(&id, "withdrawal")?;
    let Json(req) = payload?;
    let action = match req.action {
        ProcessWithdrawalAction::Start => ProcessAction::Start,
        ProcessWithdrawalAction::Complete => ProcessAction::Complete {
            external_reference: req.external_reference.ok_or_else(|| {
                PaymentError::Validation("external_reference is required".into())
            })?,
        },
        ProcessWithdrawalAction::Reject => ProcessAction::Reject {
            reason: req
                .reason
                .ok_or_else(|| PaymentError::Validation("reason is required".into()))?,
        },
    };
    let withdrawal = state
        .withdrawals
        .process(id, &identity, action, req.notes)
        .await?;
    ok(WithdrawalView::from(&withdrawal))
}
