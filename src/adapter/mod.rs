//! Gateway Adapters
//!
//! One adapter per method family, normalized into a single creation /
//! confirmation contract. Adapters are constructed once at startup and
//! injected through [`AdapterRegistry`].

pub mod hosted;
pub mod manual;
pub mod retry;

pub use hosted::HostedGateway;
pub use manual::{ManualInstructions, ManualTransfer};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{PaymentError, PaymentResult};
use crate::payment::{PaymentId, PaymentMethod, PaymentStatus, RequestContext};

/// Input for opening an intent
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub order_id: Option<String>,
    pub context: RequestContext,
}

/// Audit stamp produced by every adapter call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStamp {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditStamp {
    pub fn from_context(context: &RequestContext) -> Self {
        Self {
            ip: context.ip.clone(),
            user_agent: context.user_agent.clone(),
            at: Utc::now(),
        }
    }
}

/// Method-specific data handed back to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instructions {
    /// Complete payment with the provider using the client handle
    Hosted { provider_status: String },
    /// Transfer to the platform account, then upload proof
    Manual(ManualInstructions),
}

/// Opened intent
#[derive(Debug, Clone)]
pub struct Intent {
    /// Opaque handle the client uses with the provider (or reference code)
    pub client_handle: String,
    /// Gateway-assigned reference, unique per payment
    pub gateway_ref: String,
    pub instructions: Instructions,
    pub audit: AuditStamp,
}

/// Final or interim provider outcome for an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Succeeded,
    Failed { reason: Option<String> },
    Cancelled,
    /// Not final yet
    Pending,
}

impl GatewayOutcome {
    /// Ledger status this outcome drives a `pending` payment to
    pub fn target_status(&self) -> Option<PaymentStatus> {
        match self {
            GatewayOutcome::Succeeded => Some(PaymentStatus::Completed),
            GatewayOutcome::Failed { .. } => Some(PaymentStatus::Failed),
            GatewayOutcome::Cancelled => Some(PaymentStatus::Cancelled),
            GatewayOutcome::Pending => None,
        }
    }

    /// Whether a terminal ledger status already reflects this outcome
    pub fn is_consistent_with(&self, status: PaymentStatus) -> bool {
        match self {
            GatewayOutcome::Succeeded => status.is_collected(),
            GatewayOutcome::Failed { .. } => status == PaymentStatus::Failed,
            GatewayOutcome::Cancelled => status == PaymentStatus::Cancelled,
            GatewayOutcome::Pending => false,
        }
    }
}

/// Unified payment backend contract
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    /// Check amount and currency against method-specific limits.
    ///
    /// Runs before anything is persisted.
    fn validate(&self, amount: Decimal, currency: &str) -> PaymentResult<()>;

    /// Open an intent (hosted) or generate instructions (manual)
    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<Intent>;

    /// Query the provider for the current outcome.
    ///
    /// Manual adapters have no such call and return `Validation`.
    async fn confirm(&self, gateway_ref: &str) -> PaymentResult<GatewayOutcome>;
}

/// Method -> adapter routing
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<PaymentMethod, Arc<dyn GatewayAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: PaymentMethod, adapter: Arc<dyn GatewayAdapter>) {
        tracing::info!(method = %method, adapter = adapter.name(), "Gateway adapter registered");
        self.adapters.insert(method, adapter);
    }

    pub fn get(&self, method: PaymentMethod) -> PaymentResult<Arc<dyn GatewayAdapter>> {
        self.adapters.get(&method).cloned().ok_or_else(|| {
            PaymentError::Validation(format!("payment method {} is not supported", method))
        })
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.adapters.keys().copied().collect()
    }
}

/// Scripted adapter for tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockGateway {
        min_amount: Decimal,
        create_count: AtomicUsize,
        confirm_count: AtomicUsize,
        outcome: Mutex<GatewayOutcome>,
        fail_create: Mutex<Option<PaymentError>>,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self {
                min_amount: Decimal::new(50, 2),
                create_count: AtomicUsize::new(0),
                confirm_count: AtomicUsize::new(0),
                outcome: Mutex::new(GatewayOutcome::Pending),
                fail_create: Mutex::new(None),
            }
        }

        pub fn set_outcome(&self, outcome: GatewayOutcome) {
            *self.outcome.lock().unwrap() = outcome;
        }

        pub fn set_fail_create(&self, err: Option<PaymentError>) {
            *self.fail_create.lock().unwrap() = err;
        }

        pub fn create_count(&self) -> usize {
            self.create_count.load(Ordering::SeqCst)
        }

        pub fn confirm_count(&self) -> usize {
            self.confirm_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GatewayAdapter for MockGateway {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn validate(&self, amount: Decimal, _currency: &str) -> PaymentResult<()> {
            if amount < self.min_amount {
                return Err(PaymentError::Validation(format!(
                    "amount below minimum {}",
                    self.min_amount
                )));
            }
            Ok(())
        }

        async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<Intent> {
            self.create_count.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_create.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(Intent {
                client_handle: format!("secret_{}", request.payment_id),
                gateway_ref: format!("pi_{}", request.payment_id),
                instructions: Instructions::Hosted {
                    provider_status: "requires_payment_method".into(),
                },
                audit: AuditStamp::from_context(&request.context),
            })
        }

        async fn confirm(&self, _gateway_ref: &str) -> PaymentResult<GatewayOutcome> {
            self.confirm_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome.lock().unwrap().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_targets() {
        assert_eq!(
            GatewayOutcome::Succeeded.target_status(),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(GatewayOutcome::Pending.target_status(), None);
        assert!(GatewayOutcome::Succeeded.is_consistent_with(PaymentStatus::PartiallyRefunded));
        assert!(!GatewayOutcome::Succeeded.is_consistent_with(PaymentStatus::Failed));
        assert!(GatewayOutcome::Cancelled.is_consistent_with(PaymentStatus::Cancelled));
    }

    #[test]
    fn test_registry_unsupported_method() {
        let registry = AdapterRegistry::new();
        let err = registry.get(PaymentMethod::HostedCard).err().unwrap();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
