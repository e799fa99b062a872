//! Payment endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::{ClientContext, parse_id};
use crate::auth::Identity;
use crate::error::PaymentError;
use crate::gateway::state::AppState;
use crate::gateway::types::views::{
    ConfirmPaymentRequest, CreateIntentRequest, IntentView, ListPaymentsQuery, PaymentView,
    RefundRequest, ReviewAction, ReviewRequest, SyncView,
};
use crate::gateway::types::{ApiResult, ok};
use crate::payment::{CreatePayment, PaymentId, ReviewDecision, SensitiveDetails};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

/// POST /api/v1/payments/intent
pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ctx: ClientContext,
    payload: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> ApiResult<IntentView> {
    let Json(req) = payload?;
    let created = state
        .payments
        .create_payment(CreatePayment {
            user_id: identity.user_id,
            recipient_id: req.recipient_id,
            order_id: req.order_id,
            payment_type: req.payment_type,
            method: req.method,
            amount: req.amount.inner(),
            currency: req.currency,
            details: SensitiveDetails {
                notes: req.notes,
                ..Default::default()
            },
            context: ctx.into(),
        })
        .await?;
    ok(IntentView::new(&created.payment, created.intent))
}

/// GET /api/v1/payments/{id}
///
/// Payer and reviewers see masked payer details; the recipient does not.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<PaymentView> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let payment = state.payments.get_payment(id, &identity).await?;
    let details = if payment.user_id == identity.user_id || identity.role.can_review() {
        Some(state.payments.decrypt_sensitive(id, &identity).await?)
    } else {
        None
    };
    ok(PaymentView::new(&payment, details.as_ref()))
}

/// GET /api/v1/payments?status=processing (reviewer queue)
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListPaymentsQuery>,
) -> ApiResult<Vec<PaymentView>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let payments = state
        .payments
        .list_by_status(query.status, &identity, limit)
        .await?;
    ok(payments.iter().map(PaymentView::from).collect())
}

/// POST /api/v1/payments/{id}/confirm (manual proof submission)
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ctx: ClientContext,
    Path(id): Path<String>,
    payload: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> ApiResult<PaymentView> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let Json(req) = payload?;
    let payment = state
        .payments
        .submit_proof(id, &identity, req.into(), ctx.into())
        .await?;
    ok(PaymentView::from(&payment))
}

/// POST /api/v1/payments/{id}/sync
pub async fn sync_payment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<SyncView> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let (outcome, payment) = state.payments.sync_with_gateway(id, &identity).await?;
    ok(SyncView {
        outcome,
        payment: PaymentView::from(&payment),
    })
}

/// PUT /api/v1/payments/{id}/review (reviewer)
pub async fn review_payment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<PaymentView> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let Json(req) = payload?;
    let decision = match req.decision {
        ReviewAction::Approve => ReviewDecision::Approve,
        ReviewAction::Reject => ReviewDecision::Reject {
            reason: req.reason.ok_or_else(|| {
                PaymentError::Validation("reason is required when rejecting".into())
            })?,
        },
    };
    let payment = state.payments.review(id, &identity, decision).await?;
    ok(PaymentView::from(&payment))
}

/// POST /api/v1/payments/{id}/refund (admin)
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<RefundRequest>, JsonRejection>,
) -> ApiResult<PaymentView> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let Json(req) = payload?;
    let payment = state
        .payments
        .refund(id, &identity, req.amount.inner())
        .await?;
    ok(PaymentView::from(&payment))
}
