use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::balance::BalanceLedger;
use crate::db::Database;
use crate::payment::PaymentLedger;
use crate::webhook::WebhookReconciler;
use crate::withdrawal::WithdrawalProcessor;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentLedger>,
    pub balances: Arc<BalanceLedger>,
    pub withdrawals: Arc<WithdrawalProcessor>,
    pub reconciler: Arc<WebhookReconciler>,
    pub verifier: Arc<TokenVerifier>,
    /// PostgreSQL handle for health checks; `None` in in-memory mode
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        payments: Arc<PaymentLedger>,
        balances: Arc<BalanceLedger>,
        withdrawals: Arc<WithdrawalProcessor>,
        reconciler: Arc<WebhookReconciler>,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            payments,
            balances,
            withdrawals,
            reconciler,
            verifier,
            pg_db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<Database>) -> Self {
        self.pg_db = Some(db);
        self
    }
}
