//! Webhook reconciliation entry point

use chrono::Utc;
use std::sync::Arc;

use super::event::WebhookEvent;
use super::signature::SignatureVerifier;
use crate::error::{PaymentError, PaymentResult};
use crate::payment::{PaymentLedger, ReconcileOutcome};

pub struct WebhookReconciler {
    ledger: Arc<PaymentLedger>,
    /// `None` when no secret is configured: every delivery is rejected
    verifier: Option<SignatureVerifier>,
}

impl WebhookReconciler {
    pub fn new(ledger: Arc<PaymentLedger>, verifier: Option<SignatureVerifier>) -> Self {
        if verifier.is_none() {
            tracing::warn!("Webhook secret not configured, all webhook deliveries will be rejected");
        }
        Self { ledger, verifier }
    }

    /// Verify and apply one delivery.
    ///
    /// `Err` only for signature failures and storage errors. Unknown
    /// references, unknown event types, replays and conflicts are all
    /// acknowledged.
    pub async fn handle(
        &self,
        signature: Option<&str>,
        payload: &[u8],
        source_ip: Option<&str>,
    ) -> PaymentResult<ReconcileOutcome> {
        let verified = match &self.verifier {
            Some(verifier) => verifier.verify(signature, payload, Utc::now().timestamp()),
            None => Err(PaymentError::SignatureVerification(
                "no webhook secret configured".into(),
            )),
        };
        if let Err(e) = verified {
            tracing::warn!(
                source_ip = source_ip.unwrap_or("unknown"),
                error = %e,
                "Rejected webhook delivery"
            );
            return Err(e);
        }

        let event: WebhookEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                // Signed but unparseable: retrying will not help
                tracing::warn!(error = %e, "Signed webhook payload could not be parsed");
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        let Some(outcome) = event.outcome() else {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook event type ignored");
            return Ok(ReconcileOutcome::Ignored);
        };

        let reported = event.reported_amount();
        let result = self
            .ledger
            .apply_gateway_outcome(&event.data.gateway_ref, &outcome, reported.as_ref())
            .await?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            gateway_ref = %event.data.gateway_ref,
            outcome = result.as_str(),
            "Webhook reconciled"
        );
        Ok(result)
    }
}
