//! Ledger schema
//!
//! Payments and withdrawals are append-mostly: rows are never deleted.
//! Encrypted columns hold vault envelopes (opaque text).

use anyhow::{Context, Result};
use sqlx::PgPool;

pub const CREATE_PAYMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS payments_tb (
    payment_id           TEXT PRIMARY KEY,
    user_id              BIGINT NOT NULL,
    recipient_id         BIGINT,
    order_id             TEXT,
    payment_type         TEXT NOT NULL,
    method               TEXT NOT NULL,
    amount               NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    currency             CHAR(3) NOT NULL,
    status               TEXT NOT NULL,
    gateway_ref          TEXT,
    refund_amount        NUMERIC(20, 2) NOT NULL DEFAULT 0 CHECK (refund_amount >= 0 AND refund_amount <= amount),
    proof_image_enc      TEXT,
    payer_account_name_enc   TEXT,
    payer_account_number_enc TEXT,
    payer_phone_enc      TEXT,
    notes_enc            TEXT,
    failure_reason       TEXT,
    reviewed_by          BIGINT,
    created_ip           TEXT,
    created_user_agent   TEXT,
    confirmed_ip         TEXT,
    confirmed_user_agent TEXT,
    created_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at         TIMESTAMPTZ,
    completed_at         TIMESTAMPTZ
)
"#;

pub const CREATE_PAYMENTS_GATEWAY_REF_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS payments_gateway_ref_uidx
    ON payments_tb (gateway_ref) WHERE gateway_ref IS NOT NULL
"#;

pub const CREATE_PAYMENTS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS payments_status_idx ON payments_tb (status, created_at)
"#;

pub const CREATE_BALANCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS balances_tb (
    user_id         BIGINT PRIMARY KEY,
    available       NUMERIC(20, 2) NOT NULL DEFAULT 0 CHECK (available >= 0),
    pending         NUMERIC(20, 2) NOT NULL DEFAULT 0 CHECK (pending >= 0),
    withdrawn       NUMERIC(20, 2) NOT NULL DEFAULT 0 CHECK (withdrawn >= 0),
    lifetime_earned NUMERIC(20, 2) NOT NULL DEFAULT 0,
    version         BIGINT NOT NULL DEFAULT 0,
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (available + pending + withdrawn = lifetime_earned)
)
"#;

pub const CREATE_WITHDRAWALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS withdrawals_tb (
    withdrawal_id      TEXT PRIMARY KEY,
    user_id            BIGINT NOT NULL,
    amount             NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    currency           CHAR(3) NOT NULL,
    method             TEXT NOT NULL,
    destination_enc    TEXT NOT NULL,
    status             TEXT NOT NULL,
    processed_by       BIGINT,
    processor_notes    TEXT,
    external_reference TEXT,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at       TIMESTAMPTZ
)
"#;

pub const CREATE_WITHDRAWALS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS withdrawals_user_idx ON withdrawals_tb (user_id, created_at DESC)
"#;

/// Create ledger tables if they do not exist
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    let statements = [
        ("payments_tb", CREATE_PAYMENTS_TABLE),
        ("payments gateway_ref index", CREATE_PAYMENTS_GATEWAY_REF_INDEX),
        ("payments status index", CREATE_PAYMENTS_STATUS_INDEX),
        ("balances_tb", CREATE_BALANCES_TABLE),
        ("withdrawals_tb", CREATE_WITHDRAWALS_TABLE),
        ("withdrawals user index", CREATE_WITHDRAWALS_USER_INDEX),
    ];

    for (name, sql) in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {}", name))?;
    }

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}
