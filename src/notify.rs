//! Outbound collaborator events
//!
//! The ledger is the source of truth; these are one-way, fire-and-forget
//! notifications. A sink never reports failure back to the caller.

use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

use crate::config::NotifyConfig;
use crate::payment::{PaymentId, PaymentStatus, UserId};

/// "Payment state changed" event for the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentEvent {
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub new_status: PaymentStatus,
    pub amount: Decimal,
}

/// Order-side payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentState {
    Processing,
    Paid,
    PaymentFailed,
}

impl OrderPaymentState {
    /// Order state implied by a payment status, if any
    pub fn from_payment(status: PaymentStatus) -> Option<Self> {
        match status {
            PaymentStatus::Processing => Some(OrderPaymentState::Processing),
            PaymentStatus::Completed => Some(OrderPaymentState::Paid),
            PaymentStatus::Failed | PaymentStatus::Cancelled => {
                Some(OrderPaymentState::PaymentFailed)
            }
            _ => None,
        }
    }
}

/// Update for the order/catalog collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdate {
    pub order_id: String,
    pub payment_id: PaymentId,
    pub state: OrderPaymentState,
}

pub trait EventSink: Send + Sync {
    fn payment_status_changed(&self, event: PaymentEvent);

    fn order_payment_updated(&self, update: OrderUpdate);
}

/// Writes events to the log only
#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn payment_status_changed(&self, event: PaymentEvent) {
        tracing::info!(
            user_id = event.user_id,
            payment_id = %event.payment_id,
            status = %event.new_status,
            amount = %event.amount,
            "Payment status changed"
        );
    }

    fn order_payment_updated(&self, update: OrderUpdate) {
        tracing::info!(
            order_id = %update.order_id,
            payment_id = %update.payment_id,
            state = ?update.state,
            "Order payment updated"
        );
    }
}

/// Posts events as JSON to collaborator endpoints on a spawned task.
///
/// Must be used inside a tokio runtime.
pub struct HttpEventSink {
    client: reqwest::Client,
    notification_url: Option<String>,
    order_url: Option<String>,
}

impl HttpEventSink {
    pub fn new(config: &NotifyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            notification_url: config.notification_url.clone(),
            order_url: config.order_url.clone(),
        })
    }

    fn post<T: Serialize + Send + 'static>(&self, url: Option<&String>, kind: &'static str, body: T) {
        let Some(url) = url.cloned() else {
            tracing::debug!(kind, "No endpoint configured, event dropped");
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            if let Err(e) = result {
                tracing::warn!(kind, url = %url, error = %e, "Event delivery failed");
            }
        });
    }
}

impl EventSink for HttpEventSink {
    fn payment_status_changed(&self, event: PaymentEvent) {
        self.post(self.notification_url.as_ref(), "payment_status_changed", event);
    }

    fn order_payment_updated(&self, update: OrderUpdate) {
        self.post(self.order_url.as_ref(), "order_payment_updated", update);
    }
}
