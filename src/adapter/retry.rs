//! Bounded exponential backoff for provider calls

use std::future::Future;
use std::time::Duration;

use crate::error::{PaymentError, PaymentResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay before attempt `attempt + 1` (1-based `attempt`)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }

    /// Run `op`, retrying only `GatewayTransient` failures.
    ///
    /// Deterministic failures return immediately. Exhausting the budget
    /// yields `GatewayUnavailable`.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> PaymentResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PaymentResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(PaymentError::GatewayTransient(msg)) => {
                    if attempt >= self.max_attempts {
                        tracing::error!(op = op_name, attempts = attempt, error = %msg, "Gateway retries exhausted");
                        return Err(PaymentError::GatewayUnavailable(format!(
                            "{} failed after {} attempts: {}",
                            op_name, attempt, msg
                        )));
                    }
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Transient gateway error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_doubles() {
        let p = RetryPolicy::new(5, Duration::from_millis(200));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(400));
        assert_eq!(p.backoff(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("create_intent", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PaymentError::GatewayTransient("503".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_unavailable() {
        let calls = AtomicU32::new(0);
        let result: PaymentResult<()> = fast()
            .run("create_intent", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PaymentError::GatewayTransient("timeout".into())) }
            })
            .await;
        assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_not_retried() {
        let calls = AtomicU32::new(0);
        let result: PaymentResult<()> = fast()
            .run("create_intent", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PaymentError::Validation("amount_too_small".into())) }
            })
            .await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
