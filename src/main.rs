use anyhow::Context;
use std::sync::Arc;

use payment_core::adapter::{AdapterRegistry, HostedGateway, ManualTransfer};
use payment_core::auth::TokenVerifier;
use payment_core::balance::{BalanceLedger, PayoutTable};
use payment_core::config::AppConfig;
use payment_core::db::{Database, schema};
use payment_core::gateway::{self, state::AppState};
use payment_core::notify::{EventSink, HttpEventSink, LogEventSink};
use payment_core::payment::{PaymentLedger, PaymentMethod};
use payment_core::store::{LedgerStore, MemoryStore, PgStore};
use payment_core::vault::Vault;
use payment_core::webhook::{SignatureVerifier, WebhookReconciler};
use payment_core::withdrawal::WithdrawalProcessor;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn build_adapters(config: &AppConfig) -> anyhow::Result<AdapterRegistry> {
    let mut adapters = AdapterRegistry::new();

    let manual = Arc::new(ManualTransfer::new(config.manual.clone()));
    adapters.register(PaymentMethod::ManualBankTransfer, manual.clone());
    adapters.register(PaymentMethod::ManualWalletTransfer, manual);

    if config.hosted.api_key.is_some() {
        let hosted = Arc::new(
            HostedGateway::new(&config.hosted).context("Failed to build hosted gateway client")?,
        );
        adapters.register(PaymentMethod::HostedCard, hosted.clone());
        adapters.register(PaymentMethod::HostedWallet, hosted);
    } else {
        tracing::warn!("Hosted gateway API key not configured, hosted methods disabled");
    }
    Ok(adapters)
}

fn build_sink(config: &AppConfig) -> anyhow::Result<Arc<dyn EventSink>> {
    let notify = &config.notify;
    if notify.notification_url.is_some() || notify.order_url.is_some() {
        let sink = HttpEventSink::new(notify).context("Failed to build notification client")?;
        Ok(Arc::new(sink))
    } else {
        tracing::info!("No collaborator URLs configured, events are logged only");
        Ok(Arc::new(LogEventSink))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = payment_core::logging::init_logging(&app_config);

    tracing::info!("Starting payment core in {} mode", env);

    // Secrets: a missing or weak key is fatal, never a plaintext fallback
    let vault = Arc::new(
        Vault::from_base64_key(app_config.vault.key.as_deref()).context("Vault key rejected")?,
    );
    let jwt_secret = app_config
        .auth
        .jwt_secret
        .as_deref()
        .context("auth.jwt_secret (PAYMENT_JWT_SECRET) is required")?;
    let verifier = Arc::new(TokenVerifier::new(jwt_secret)?);
    let signature_verifier = match app_config.webhook.secret.as_deref() {
        Some(secret) => Some(SignatureVerifier::new(
            secret,
            app_config.webhook.tolerance_secs,
        )?),
        None => None,
    };

    // Storage
    let (store, pg_db): (Arc<dyn LedgerStore>, Option<Arc<Database>>) =
        match app_config.postgres_url.as_deref() {
            Some(url) => {
                let db = Database::connect_with(url, &app_config.postgres_pool)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                schema::init_schema(db.pool()).await?;
                tracing::info!("PostgreSQL connected and schema initialized");
                let store = Arc::new(PgStore::new(db.pool().clone()));
                (store, Some(Arc::new(db)))
            }
            None => {
                tracing::warn!("postgres_url not set, using in-memory ledger (data is lost on exit)");
                (Arc::new(MemoryStore::new()), None)
            }
        };

    let payouts = PayoutTable::from_config(&app_config.payout)?;
    let balances = Arc::new(BalanceLedger::new(store.clone(), payouts));
    let payments = Arc::new(PaymentLedger::new(
        store.clone(),
        build_adapters(&app_config)?,
        vault.clone(),
        balances.clone(),
        build_sink(&app_config)?,
    ));
    let withdrawals = Arc::new(WithdrawalProcessor::new(
        store,
        vault,
        balances.clone(),
        app_config.withdrawal.clone(),
    ));
    let reconciler = Arc::new(WebhookReconciler::new(payments.clone(), signature_verifier));

    let mut state = AppState::new(payments, balances, withdrawals, reconciler, verifier);
    if let Some(db) = pg_db {
        state = state.with_database(db);
    }

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, Arc::new(state)).await
}
