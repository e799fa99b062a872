use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use anyhow::Context;

use crate::payment::PaymentType;
use crate::withdrawal::DestinationMethod;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; absent means in-memory ledger (development only)
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub postgres_pool: PoolConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub hosted: HostedConfig,
    #[serde(default)]
    pub manual: ManualConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub payout: PayoutConfig,
    #[serde(default)]
    pub withdrawal: WithdrawalConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// PostgreSQL pool sizing
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Idle connections are closed after this long
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_ms: 5_000,
            idle_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct VaultConfig {
    /// Base64 key material; prefer `PAYMENT_VAULT_KEY`
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret shared with the user/auth service
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

/// Hosted card/wallet gateway
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HostedConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    /// Minimum amount in major units of the payment currency
    pub min_amount: Decimal,
    pub currencies: Vec<String>,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:12111".to_string(),
            api_key: None,
            timeout_ms: 5_000,
            max_attempts: 3,
            base_backoff_ms: 200,
            min_amount: Decimal::new(50, 2),
            currencies: vec!["USD".to_string(), "EUR".to_string(), "IDR".to_string()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankDestination {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WalletDestination {
    pub provider: String,
    pub phone_number: String,
    pub account_holder: String,
}

/// Manual bank / e-wallet transfers
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ManualConfig {
    pub currency: String,
    pub min_amount: Decimal,
    pub instruction_ttl_hours: i64,
    pub bank: BankDestination,
    pub wallet: WalletDestination,
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            currency: "IDR".to_string(),
            min_amount: Decimal::from(50_000),
            instruction_ttl_hours: 24,
            bank: BankDestination {
                bank_name: "BCA".to_string(),
                account_number: "0000000000".to_string(),
                account_holder: "PT Platform".to_string(),
            },
            wallet: WalletDestination {
                provider: "DANA".to_string(),
                phone_number: "080000000000".to_string(),
                account_holder: "PT Platform".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared HMAC secret; prefer `PAYMENT_WEBHOOK_SECRET`
    pub secret: Option<String>,
    pub tolerance_secs: i64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance_secs: 300,
        }
    }
}

/// Payout fraction per payment type
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PayoutConfig {
    pub fractions: HashMap<PaymentType, Decimal>,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        let fractions = HashMap::from([
            (PaymentType::Order, Decimal::new(80, 2)),
            (PaymentType::MembershipUpgrade, Decimal::ZERO),
            (PaymentType::WithdrawalRelated, Decimal::ZERO),
            (PaymentType::Refund, Decimal::ZERO),
        ]);
        Self { fractions }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WithdrawalLimit {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WithdrawalConfig {
    pub currency: String,
    pub limits: HashMap<DestinationMethod, WithdrawalLimit>,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        let limit = WithdrawalLimit {
            min: Decimal::from(100_000),
            max: Decimal::from(50_000_000),
        };
        Self {
            currency: "IDR".to_string(),
            limits: HashMap::from([
                (DestinationMethod::BankTransfer, limit.clone()),
                (DestinationMethod::EWallet, limit),
            ]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub notification_url: Option<String>,
    pub order_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            notification_url: None,
            order_url: None,
            timeout_ms: 3_000,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: AppConfig =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets from the environment take precedence over the YAML file
    fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(v) = var("PAYMENT_VAULT_KEY") {
            self.vault.key = Some(v);
        }
        if let Some(v) = var("PAYMENT_WEBHOOK_SECRET") {
            self.webhook.secret = Some(v);
        }
        if let Some(v) = var("PAYMENT_JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = var("PAYMENT_HOSTED_API_KEY") {
            self.hosted.api_key = Some(v);
        }
        if let Some(v) = var("DATABASE_URL") {
            self.postgres_url = Some(v);
        }
    }
}
