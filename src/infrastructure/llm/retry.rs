//! Retry with backoff for decision-engine requests
//!
//! - Retries transient failures (transport errors, HTTP 429 and 5xx)
//! - Exponential backoff, more aggressive for rate limits
//! - Fails immediately on anything else

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::config::AgentConfig;
use crate::infrastructure::llm::error::EngineError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    max_retries: usize,
    /// Base delay in seconds
    base_delay: u64,
    exponential_backoff: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.retry_base_delay_secs, config.max_retries, true)
    }

    pub fn new(base_delay: u64, max_retries: usize, exponential_backoff: bool) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay: base_delay.max(1),
            exponential_backoff,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T>(&self, operation: F, provider_name: &str) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("[{}] Request succeeded on attempt {}", provider_name, attempt);
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) if attempt >= self.max_retries => {
                    return Err(EngineError::RetriesExhausted {
                        attempts: attempt,
                        last_error: Box::new(error),
                    });
                }
                Err(error) => {
                    let delay = self.calculate_delay(attempt, &error);
                    tracing::warn!(
                        "[{}] Request failed (Attempt {}/{}): {}. Retrying in {}s",
                        provider_name,
                        attempt,
                        self.max_retries,
                        error,
                        delay
                    );
                    sleep(Duration::from_secs(delay)).await;
                    attempt += 1;
                }
            }
        }
    }

    fn calculate_delay(&self, attempt: usize, error: &EngineError) -> u64 {
        let is_rate_limit = error.is_rate_limit();

        if self.exponential_backoff {
            let multiplier: u64 = if is_rate_limit { 4 } else { 2 };
            let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
            let delay = self
                .base_delay
                .saturating_mul(multiplier.saturating_pow(exponent));
            // Capped at 10 minutes for rate limits, 5 minutes otherwise
            let max_delay = if is_rate_limit { 600 } else { 300 };
            delay.min(max_delay)
        } else if is_rate_limit {
            self.base_delay * 2
        } else {
            self.base_delay
        }
    }
}
