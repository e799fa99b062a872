//! Hosted card / wallet gateway
//!
//! REST contract:
//! - `POST {base}/v1/payment_intents` `{amount, currency, payment_method_type, metadata}`
//!   -> `{id, client_secret, status}`
//! - `GET {base}/v1/payment_intents/{id}` -> `{id, status, last_payment_error?}`
//!
//! Amounts travel in integer minor units. Every request carries the bearer
//! API key and an explicit client timeout.

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AuditStamp, GatewayAdapter, GatewayOutcome, Instructions, Intent, IntentRequest};
use super::retry::RetryPolicy;
use crate::config::HostedConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money;
use crate::payment::PaymentMethod;

#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: String,
    payment_method_type: &'a str,
    metadata: IntentMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct IntentMetadata<'a> {
    payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
    #[serde(default)]
    last_payment_error: Option<PaymentErrorBody>,
}

#[derive(Debug, Deserialize)]
struct PaymentErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct HostedGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    min_amount: Decimal,
    currencies: Vec<String>,
}

impl HostedGateway {
    /// Fails with `Configuration` without an API key
    pub fn new(config: &HostedConfig) -> PaymentResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PaymentError::Configuration("hosted gateway api key missing".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.base_backoff_ms),
            ),
            min_amount: config.min_amount,
            currencies: config.currencies.clone(),
        })
    }

    fn method_type(method: PaymentMethod) -> PaymentResult<&'static str> {
        match method {
            PaymentMethod::HostedCard => Ok("card"),
            PaymentMethod::HostedWallet => Ok("wallet"),
            other => Err(PaymentError::Validation(format!(
                "{} is not a hosted method",
                other
            ))),
        }
    }

    /// Map a provider intent status to an outcome
    fn outcome_for(response: &IntentResponse) -> GatewayOutcome {
        match response.status.as_str() {
            "succeeded" => GatewayOutcome::Succeeded,
            "canceled" | "cancelled" => GatewayOutcome::Cancelled,
            "failed" | "payment_failed" => GatewayOutcome::Failed {
                reason: response
                    .last_payment_error
                    .as_ref()
                    .and_then(|e| e.message.clone()),
            },
            // requires_payment_method, requires_confirmation, requires_action, processing, ...
            _ => GatewayOutcome::Pending,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> PaymentResult<IntentResponse> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json::<IntentResponse>()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(format!("malformed provider response: {}", e)))
    }
}

/// Timeouts and connection failures are worth retrying
fn classify_transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        PaymentError::GatewayTransient(e.to_string())
    } else {
        PaymentError::GatewayUnavailable(e.to_string())
    }
}

/// 5xx and 429 are transient; any other 4xx is a deterministic rejection
fn classify_status(status: StatusCode, body: &str) -> PaymentError {
    let detail: String = body.chars().take(200).collect();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PaymentError::GatewayTransient(format!("provider returned {}", status))
    } else {
        PaymentError::Validation(format!("provider rejected request ({}): {}", status, detail))
    }
}

#[async_trait]
impl GatewayAdapter for HostedGateway {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn validate(&self, amount: Decimal, currency: &str) -> PaymentResult<()> {
        if !self.currencies.iter().any(|c| c == currency) {
            return Err(PaymentError::Validation(format!(
                "currency {} is not supported by the hosted gateway",
                currency
            )));
        }
        if amount < self.min_amount {
            return Err(PaymentError::Validation(format!(
                "amount {} below hosted minimum {}",
                amount, self.min_amount
            )));
        }
        money::to_minor_units(amount, currency)?;
        Ok(())
    }

    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<Intent> {
        let payment_method_type = Self::method_type(request.method)?;
        let body = CreateIntentBody {
            amount: money::to_minor_units(request.amount, &request.currency)?,
            currency: request.currency.to_ascii_lowercase(),
            payment_method_type,
            metadata: IntentMetadata {
                payment_id: request.payment_id.to_string(),
                order_id: request.order_id.as_deref(),
            },
        };
        let url = format!("{}/v1/payment_intents", self.base_url);
        let idempotency_key = request.payment_id.to_string();

        let response = self
            .retry
            .run("create_intent", |_| {
                self.send(
                    self.client
                        .post(&url)
                        .header("Idempotency-Key", &idempotency_key)
                        .json(&body),
                )
            })
            .await?;

        tracing::info!(
            payment_id = %request.payment_id,
            gateway_ref = %response.id,
            provider_status = %response.status,
            "Hosted intent created"
        );

        Ok(Intent {
            client_handle: response.client_secret.unwrap_or_else(|| response.id.clone()),
            gateway_ref: response.id,
            instructions: Instructions::Hosted {
                provider_status: response.status,
            },
            audit: AuditStamp::from_context(&request.context),
        })
    }

    async fn confirm(&self, gateway_ref: &str) -> PaymentResult<GatewayOutcome> {
        let url = format!("{}/v1/payment_intents/{}", self.base_url, gateway_ref);
        let response = self
            .retry
            .run("confirm", |_| self.send(self.client.get(&url)))
            .await?;
        Ok(Self::outcome_for(&response))
    }
}
