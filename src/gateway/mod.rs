pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::auth::middleware::jwt_auth_middleware;
use handlers::{balance, health, payment, webhook, withdrawal};
use state::AppState;

/// Build the `/api/v1` router
pub fn router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Authenticated routes (bearer JWT)
    // ==========================================================================
    let private_routes = Router::new()
        .route("/payments", get(payment::list_payments))
        .route("/payments/intent", post(payment::create_intent))
        .route("/payments/{id}", get(payment::get_payment))
        .route("/payments/{id}/confirm", post(payment::confirm_payment))
        .route("/payments/{id}/sync", post(payment::sync_payment))
        .route("/payments/{id}/review", put(payment::review_payment))
        .route("/payments/{id}/refund", post(payment::refund_payment))
        .route("/balance", get(balance::get_balance))
        .route(
            "/withdrawals",
            post(withdrawal::create_withdrawal).get(withdrawal::list_withdrawals),
        )
        .route("/withdrawals/{id}", get(withdrawal::get_withdrawal))
        .route(
            "/withdrawals/{id}/process",
            put(withdrawal::process_withdrawal),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Public routes (provider signature / no auth)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/payments/webhook", post(webhook::receive_webhook))
        .route("/health", get(health::health_check));

    Router::new()
        .nest("/api/v1", private_routes.merge(public_routes))
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {} ({}). Port {} may already be in use",
            addr,
            e,
            port
        )
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("Payments API: /api/v1/payments/*, webhook: /api/v1/payments/webhook");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
