//! Provider event payload

use serde::Deserialize;

use crate::adapter::GatewayOutcome;
use crate::payment::ProviderAmount;

pub const EVENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_FAILED: &str = "payment_intent.payment_failed";
pub const EVENT_CANCELED: &str = "payment_intent.canceled";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub gateway_ref: String,
    /// Minor units
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl WebhookEvent {
    /// Outcome carried by the event, `None` for types we do not act on
    pub fn outcome(&self) -> Option<GatewayOutcome> {
        match self.event_type.as_str() {
            EVENT_SUCCEEDED => Some(GatewayOutcome::Succeeded),
            EVENT_FAILED => Some(GatewayOutcome::Failed {
                reason: self.data.failure_reason.clone(),
            }),
            EVENT_CANCELED => Some(GatewayOutcome::Cancelled),
            _ => None,
        }
    }

    /// Amount reported by the provider when both amount and currency are present
    pub fn reported_amount(&self) -> Option<ProviderAmount> {
        match (self.data.amount, self.data.currency.as_ref()) {
            (Some(minor), Some(currency)) => Some(ProviderAmount {
                minor,
                currency: currency.to_ascii_uppercase(),
            }),
            _ => None,
        }
    }
}
