use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose info output drowns the ledger's own events
const QUIET_TARGETS: &[&str] = &["sqlx", "hyper", "hyper_util", "reqwest", "h2"];

/// Filter: ledger modules at the configured level, dependencies at warn.
fn filter_directives(log_level: &str) -> String {
    let mut directives = vec![format!("warn,payment_core={}", log_level)];
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
    directives.join(",")
}

/// Install the global subscriber: rolling file output, plus stdout in text mode.
///
/// `RUST_LOG` replaces the configured filter entirely. The returned guard must
/// live until shutdown or buffered lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // Log shippers key on target to route payment audit lines
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    tracing::info!(
        level = %config.log_level,
        dir = %config.log_dir,
        json = config.use_json,
        "Payment core logging initialized"
    );
    guard
}
