//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub timestamp_ms: i64,
    pub store: &'static str,
}

/// GET /api/v1/health
///
/// Pings PostgreSQL when configured. Internal details are logged, never returned.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let (healthy, store) = match &state.pg_db {
        Some(db) => match db.health_check().await {
            Ok(()) => (true, "postgres"),
            Err(e) => {
                tracing::error!("[HEALTH] PostgreSQL ping failed: {}", e);
                (false, "postgres")
            }
        },
        None => (true, "memory"),
    };

    if healthy {
        (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: Utc::now().timestamp_millis(),
                store,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: 503,
                msg: "unavailable".to_string(),
                data: None,
            }),
        )
    }
}
