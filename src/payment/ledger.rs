//! Payment ledger service
//!
//! Owns every payment transition. Each mutation is a single compare-and-set
//! against the store; the completion credit rides along in the same atomic
//! operation, so a payment can credit its recipient at most once.

use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

use super::state::{PaymentStatus, Trigger};
use super::types::{
    CreatePayment, Payment, PaymentId, PaymentTransition, ReconcileOutcome, RequestContext,
    SensitiveDetails,
};
use crate::adapter::{AdapterRegistry, GatewayOutcome, Intent, IntentRequest};
use crate::auth::Identity;
use crate::balance::BalanceLedger;
use crate::error::{PaymentError, PaymentResult};
use crate::money;
use crate::notify::{EventSink, OrderPaymentState, OrderUpdate, PaymentEvent};
use crate::store::LedgerStore;
use crate::vault::{Vault, sanitize_for_logging};

/// Reviewer decision on a manual payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
}

/// Amount reported by a provider event, in minor units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAmount {
    pub minor: i64,
    pub currency: String,
}

/// Newly created payment plus what the client needs to pay
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    pub payment: Payment,
    pub intent: Intent,
}

pub struct PaymentLedger {
    store: Arc<dyn LedgerStore>,
    adapters: AdapterRegistry,
    vault: Arc<Vault>,
    balances: Arc<BalanceLedger>,
    sink: Arc<dyn EventSink>,
}

impl PaymentLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        adapters: AdapterRegistry,
        vault: Arc<Vault>,
        balances: Arc<BalanceLedger>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            adapters,
            vault,
            balances,
            sink,
        }
    }

    // ============================================================
    // CREATION
    // ============================================================

    /// Validate, open the intent, then persist the payment.
    ///
    /// Nothing is persisted when validation, encryption or the adapter fails.
    pub async fn create_payment(&self, request: CreatePayment) -> PaymentResult<CreatedPayment> {
        let currency = money::normalize_currency(&request.currency)?;
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::Validation("amount must be positive".into()));
        }
        if request.recipient_id == Some(request.user_id) {
            return Err(PaymentError::Validation(
                "recipient cannot be the paying user".into(),
            ));
        }

        let adapter = self.adapters.get(request.method)?;
        adapter.validate(request.amount, &currency)?;

        let sealed = request.details.seal(&self.vault)?;

        let payment_id = PaymentId::new();
        let intent = adapter
            .create_intent(&IntentRequest {
                payment_id,
                method: request.method,
                amount: request.amount,
                currency: currency.clone(),
                order_id: request.order_id.clone(),
                context: request.context.clone(),
            })
            .await?;

        let payment = Payment {
            id: payment_id,
            user_id: request.user_id,
            recipient_id: request.recipient_id,
            order_id: request.order_id,
            payment_type: request.payment_type,
            method: request.method,
            amount: request.amount,
            currency,
            status: request.method.initial_status(),
            gateway_ref: Some(intent.gateway_ref.clone()),
            refund_amount: Decimal::ZERO,
            sealed,
            failure_reason: None,
            reviewed_by: None,
            created_from: RequestContext {
                ip: intent.audit.ip.clone(),
                user_agent: intent.audit.user_agent.clone(),
            },
            confirmed_from: RequestContext::default(),
            created_at: intent.audit.at,
            updated_at: intent.audit.at,
            processed_at: None,
            completed_at: None,
        };

        self.store.insert_payment(&payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            user_id = payment.user_id,
            method = %payment.method,
            payment_type = %payment.payment_type,
            amount = %payment.amount,
            currency = %payment.currency,
            status = %payment.status,
            "Payment created"
        );

        Ok(CreatedPayment { payment, intent })
    }

    // ============================================================
    // QUERIES
    // ============================================================

    /// Owner, recipient or reviewer; anyone else sees `NotFound`
    pub async fn get_payment(&self, id: PaymentId, actor: &Identity) -> PaymentResult<Payment> {
        let payment = self.load(id).await?;
        let involved = payment.user_id == actor.user_id || payment.recipient_id == Some(actor.user_id);
        if involved || actor.role.can_review() {
            Ok(payment)
        } else {
            Err(PaymentError::NotFound(format!("payment {}", id)))
        }
    }

    /// Plaintext sensitive fields (owner or reviewer). Decryption failure is fatal.
    pub async fn decrypt_sensitive(
        &self,
        id: PaymentId,
        actor: &Identity,
    ) -> PaymentResult<SensitiveDetails> {
        let payment = self.get_payment(id, actor).await?;
        if payment.user_id != actor.user_id && !actor.role.can_review() {
            return Err(PaymentError::Forbidden(
                "only the payer or a reviewer may view payment details".into(),
            ));
        }
        payment.sealed.open(&self.vault).map_err(|e| {
            tracing::error!(payment_id = %id, error = %e, "Failed to decrypt payment fields");
            PaymentError::from(e)
        })
    }

    /// Review queue and ops listing (reviewers only)
    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
        actor: &Identity,
        limit: usize,
    ) -> PaymentResult<Vec<Payment>> {
        actor.require_reviewer()?;
        self.store.list_payments_by_status(status, limit).await
    }

    // ============================================================
    // MANUAL FLOW
    // ============================================================

    /// pending_verification -> processing, storing the encrypted proof
    pub async fn submit_proof(
        &self,
        id: PaymentId,
        actor: &Identity,
        details: SensitiveDetails,
        context: RequestContext,
    ) -> PaymentResult<Payment> {
        let payment = self.load(id).await?;
        if payment.user_id != actor.user_id {
            return Err(PaymentError::Forbidden(
                "only the payer may submit proof".into(),
            ));
        }
        if !payment.method.is_manual() {
            return Err(PaymentError::Validation(
                "proof submission applies to manual methods only".into(),
            ));
        }
        if details
            .proof_image_ref
            .as_deref()
            .is_none_or(|r| r.trim().is_empty())
        {
            return Err(PaymentError::Validation("proof_image_ref is required".into()));
        }
        payment
            .status
            .check_transition(PaymentStatus::Processing, Trigger::ProofSubmitted)?;

        tracing::debug!(
            payment_id = %id,
            submission = %sanitize_for_logging(&json!({
                "proof_image_ref": details.proof_image_ref,
                "account_name": details.payer_account_name,
                "account_number": details.payer_account_number,
                "phone": details.payer_phone,
                "notes": details.notes,
            })),
            "Proof submission received"
        );

        let mut transition =
            PaymentTransition::new(PaymentStatus::PendingVerification, PaymentStatus::Processing);
        transition.sealed = Some(details.seal(&self.vault)?);
        transition.confirmed_from = Some(context);

        let updated = self
            .store
            .transition_payment(id, &transition)
            .await?
            .ok_or_else(|| {
                PaymentError::InvalidTransition(format!(
                    "payment {} is no longer pending_verification",
                    id
                ))
            })?;

        tracing::info!(payment_id = %id, "Proof submitted, awaiting review");
        self.notify(&updated);
        Ok(updated)
    }

    /// processing -> completed | failed, by a reviewer other than the payer
    pub async fn review(
        &self,
        id: PaymentId,
        reviewer: &Identity,
        decision: ReviewDecision,
    ) -> PaymentResult<Payment> {
        reviewer.require_reviewer()?;
        let payment = self.load(id).await?;
        if payment.user_id == reviewer.user_id || payment.recipient_id == Some(reviewer.user_id) {
            return Err(PaymentError::Forbidden(
                "reviewers cannot review a payment they pay or receive".into(),
            ));
        }

        let (next, reason) = match decision {
            ReviewDecision::Approve => (PaymentStatus::Completed, None),
            ReviewDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(PaymentError::Validation(
                        "rejection reason is required".into(),
                    ));
                }
                (PaymentStatus::Failed, Some(reason))
            }
        };
        payment.status.check_transition(next, Trigger::Review)?;

        let mut transition = PaymentTransition::new(PaymentStatus::Processing, next);
        transition.reviewed_by = Some(reviewer.user_id);
        transition.failure_reason = reason;
        if next == PaymentStatus::Completed {
            transition.credit = self.balances.completion_credit(&payment);
        }

        let updated = self
            .store
            .transition_payment(id, &transition)
            .await?
            .ok_or_else(|| {
                PaymentError::InvalidTransition(format!("payment {} was already reviewed", id))
            })?;

        tracing::info!(
            payment_id = %id,
            reviewer = reviewer.user_id,
            status = %updated.status,
            credited = ?transition.credit.as_ref().map(|c| c.amount),
            "Manual payment reviewed"
        );
        self.notify(&updated);
        Ok(updated)
    }

    // ============================================================
    // HOSTED FLOW
    // ============================================================

    /// Apply a provider outcome to the payment carrying `gateway_ref`.
    ///
    /// Not-found, already-applied and conflicting events are expected outcomes,
    /// not errors. Only storage failures surface as `Err`.
    pub async fn apply_gateway_outcome(
        &self,
        gateway_ref: &str,
        outcome: &GatewayOutcome,
        reported: Option<&ProviderAmount>,
    ) -> PaymentResult<ReconcileOutcome> {
        let Some(payment) = self.store.find_by_gateway_ref(gateway_ref).await? else {
            tracing::info!(gateway_ref, "No payment for gateway reference, acknowledging");
            return Ok(ReconcileOutcome::NotFound);
        };

        let Some(target) = outcome.target_status() else {
            tracing::debug!(payment_id = %payment.id, "Non-final provider outcome ignored");
            return Ok(ReconcileOutcome::Ignored);
        };

        if !payment.method.is_hosted() {
            tracing::warn!(
                payment_id = %payment.id,
                method = %payment.method,
                "Provider event for a manual payment, not applied"
            );
            return Ok(ReconcileOutcome::Conflict);
        }

        if let Some(reported) = reported {
            if !Self::amount_matches(&payment, reported) {
                tracing::warn!(
                    payment_id = %payment.id,
                    ledger_amount = %payment.amount,
                    ledger_currency = %payment.currency,
                    event_minor = reported.minor,
                    event_currency = %reported.currency,
                    "Provider amount disagrees with ledger, not applied"
                );
                return Ok(ReconcileOutcome::Conflict);
            }
        }

        if let Some(settled) = Self::classify_settled(&payment, outcome) {
            return Ok(settled);
        }

        let mut transition = PaymentTransition::new(PaymentStatus::Pending, target);
        payment.status.check_transition(target, Trigger::Gateway)?;
        if let GatewayOutcome::Failed { reason } = outcome {
            transition.failure_reason = reason.clone();
        }
        if target == PaymentStatus::Completed {
            transition.credit = self.balances.completion_credit(&payment);
        }

        match self.store.transition_payment(payment.id, &transition).await? {
            Some(updated) => {
                tracing::info!(
                    payment_id = %updated.id,
                    gateway_ref,
                    status = %updated.status,
                    credited = ?transition.credit.as_ref().map(|c| c.amount),
                    "Gateway outcome applied"
                );
                self.notify(&updated);
                Ok(ReconcileOutcome::Applied)
            }
            None => {
                // Lost the race: someone else moved it first
                let current = self.load(payment.id).await?;
                Ok(Self::classify_settled(&current, outcome).unwrap_or_else(|| {
                    tracing::warn!(
                        payment_id = %current.id,
                        status = %current.status,
                        "Payment changed concurrently into an unexpected state"
                    );
                    ReconcileOutcome::Conflict
                }))
            }
        }
    }

    /// Ask the provider for the outcome and apply it like a webhook would
    pub async fn sync_with_gateway(
        &self,
        id: PaymentId,
        actor: &Identity,
    ) -> PaymentResult<(ReconcileOutcome, Payment)> {
        let payment = self.get_payment(id, actor).await?;
        if !payment.method.is_hosted() {
            return Err(PaymentError::Validation(
                "only hosted payments can be synced with the gateway".into(),
            ));
        }
        if payment.status.is_terminal() {
            return Ok((ReconcileOutcome::Ignored, payment));
        }
        let gateway_ref = payment
            .gateway_ref
            .clone()
            .ok_or_else(|| PaymentError::Validation("payment has no gateway reference".into()))?;

        let adapter = self.adapters.get(payment.method)?;
        let outcome = adapter.confirm(&gateway_ref).await?;
        let applied = self
            .apply_gateway_outcome(&gateway_ref, &outcome, None)
            .await?;
        let current = self.load(id).await?;
        Ok((applied, current))
    }

    // ============================================================
    // REFUNDS
    // ============================================================

    /// completed | partially_refunded -> refunded | partially_refunded (admin only)
    pub async fn refund(
        &self,
        id: PaymentId,
        actor: &Identity,
        amount: Decimal,
    ) -> PaymentResult<Payment> {
        actor.require_admin()?;
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation("refund amount must be positive".into()));
        }
        let payment = self.load(id).await?;
        money::to_minor_units(amount, &payment.currency)?;

        let total = payment.refund_amount + amount;
        if total > payment.amount {
            return Err(PaymentError::Validation(format!(
                "refund exceeds remaining refundable amount {}",
                payment.refundable()
            )));
        }
        let next = if total == payment.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        payment.status.check_transition(next, Trigger::Refund)?;

        let mut transition = PaymentTransition::new(payment.status, next);
        transition.expected_refund = Some(payment.refund_amount);
        transition.refund_amount = Some(total);

        let updated = self
            .store
            .transition_payment(id, &transition)
            .await?
            .ok_or_else(|| {
                PaymentError::InvalidTransition(format!(
                    "payment {} changed concurrently, retry the refund",
                    id
                ))
            })?;

        tracing::info!(
            payment_id = %id,
            admin = actor.user_id,
            refunded = %amount,
            refund_total = %total,
            status = %updated.status,
            "Payment refunded"
        );
        self.notify(&updated);
        Ok(updated)
    }

    // ============================================================
    // INTERNALS
    // ============================================================

    async fn load(&self, id: PaymentId) -> PaymentResult<Payment> {
        self.store
            .get_payment(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("payment {}", id)))
    }

    fn amount_matches(payment: &Payment, reported: &ProviderAmount) -> bool {
        reported.currency.eq_ignore_ascii_case(&payment.currency)
            && money::to_minor_units(payment.amount, &payment.currency)
                .is_ok_and(|minor| minor == reported.minor)
    }

    /// Outcome for a payment that needs no transition, `None` if still actionable
    fn classify_settled(payment: &Payment, outcome: &GatewayOutcome) -> Option<ReconcileOutcome> {
        if payment.status == PaymentStatus::Pending {
            return None;
        }
        if payment.status.is_terminal() && outcome.is_consistent_with(payment.status) {
            tracing::info!(
                payment_id = %payment.id,
                status = %payment.status,
                "Provider event already applied"
            );
            return Some(ReconcileOutcome::AlreadyApplied);
        }
        tracing::warn!(
            payment_id = %payment.id,
            status = %payment.status,
            outcome = ?outcome,
            "Provider event conflicts with ledger state, not applied"
        );
        Some(ReconcileOutcome::Conflict)
    }

    /// Fire-and-forget collaborator notifications
    fn notify(&self, payment: &Payment) {
        self.sink.payment_status_changed(PaymentEvent {
            user_id: payment.user_id,
            payment_id: payment.id,
            new_status: payment.status,
            amount: payment.amount,
        });
        if let (Some(order_id), Some(state)) = (
            payment.order_id.as_ref(),
            OrderPaymentState::from_payment(payment.status),
        ) {
            self.sink.order_payment_updated(OrderUpdate {
                order_id: order_id.clone(),
                payment_id: payment.id,
                state,
            });
        }
    }
}
