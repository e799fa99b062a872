//! Balance endpoint

use axum::{Extension, extract::State};
use std::sync::Arc;

use crate::auth::Identity;
use crate::gateway::state::AppState;
use crate::gateway::types::views::BalanceView;
use crate::gateway::types::{ApiResult, ok};

/// GET /api/v1/balance
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<BalanceView> {
    let account = state.balances.balance(identity.user_id).await?;
    ok(BalanceView::from(&account))
}
