//! Configurable retry logic for transient RPC failures.
//!
//! This module provides:
//! - [`compute_backoff`], an exponential-backoff delay calculator with optional jitter.
//! - [`is_transient`], which classifies a [`SuiIndexerError`] as retryable or not.
//! - [`RetryingRpcProvider`], a decorator adding retries to any [`RpcProvider`].

use crate::config::RetryConfig;
use crate::types::events::{EventId, EventSelector, EventsPage};
use crate::types::metadata::BlockMetadata;
use crate::utils::error::{Result, SuiIndexerError};
use crate::utils::rpc::RpcProvider;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

// ─────────────────────────────────────────────────────────────────────────────
// Backoff calculation
// ─────────────────────────────────────────────────────────────────────────────

/// Computes the delay before the next retry.
///
/// `attempt` is 1-indexed: `attempt = 1` is the delay before the first retry.
///
/// Formula: `delay = initial_backoff_ms * backoff_multiplier^(attempt - 1)`,
/// capped at `max_backoff_ms`, then ±25 % jitter if enabled.
#[must_use]
pub fn compute_backoff(cfg: &RetryConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let base = cfg.initial_backoff_ms as f64 * cfg.backoff_multiplier.powi(exponent);
    let capped = base.min(cfg.max_backoff_ms as f64);

    let ms = if cfg.jitter {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        // factor in [0.75, 1.25]
        let factor = 0.75 + f64::from(nanos % 1_000_000) / 1_000_000.0 * 0.5;
        capped * factor
    } else {
        capped
    };

    Duration::from_millis(ms as u64)
}

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

/// Returns `true` if `err` is a transient failure that is safe to retry.
///
/// | Error variant        | Retried | Reason                                     |
/// |----------------------|---------|--------------------------------------------|
/// | `RpcError`           | yes     | HTTP 429 / 503, node-side hiccup           |
/// | `RpcRejected`        | depends | Not for -32700, -32600, -32601, -32602     |
/// | `ConnectionError`    | yes     | Refused, reset or timed-out connection     |
/// | `InternalError`      | yes     | tokio task join noise                      |
/// | `SerializationError` | no      | A malformed payload will not self-heal     |
/// | `FilterError`        | no      | Caller error                               |
/// | `ConfigError`        | no      | Programmer error                           |
/// | `RetryExhausted`     | no      | Already exhausted                          |
#[must_use]
pub fn is_transient(err: &SuiIndexerError) -> bool {
    match err {
        SuiIndexerError::RpcRejected { .. } => !err.is_rejected_request(),
        SuiIndexerError::RpcError(_)
        | SuiIndexerError::ConnectionError(_)
        | SuiIndexerError::InternalError(_) => true,
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RetryingRpcProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps any [`RpcProvider`] with configurable retry logic.
///
/// Transient errors are retried after an exponentially increasing delay, up to
/// `config.max_retries` times. Permanent errors are returned immediately.
///
/// # Example
///
/// ```no_run
/// use sui_event_indexer::config::RetryConfig;
/// use sui_event_indexer::utils::retry::RetryingRpcProvider;
/// use sui_event_indexer::utils::rpc::{JsonRpcProvider, RpcProvider};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> sui_event_indexer::Result<()> {
/// let raw = JsonRpcProvider::new("http://127.0.0.1:9000", Duration::from_secs(30))?;
/// let rpc: Arc<dyn RpcProvider> = Arc::new(RetryingRpcProvider::new(raw, RetryConfig::default()));
/// # Ok(())
/// # }
/// ```
pub struct RetryingRpcProvider<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: RpcProvider> RetryingRpcProvider<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calls `op()` until it succeeds, fails permanently, or `max_retries`
    /// retries have been spent.
    async fn with_retry<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            let err = match op().await {
                Ok(val) => return Ok(val),
                Err(err) if !is_transient(&err) => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt > self.config.max_retries {
                return Err(SuiIndexerError::RetryExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = compute_backoff(&self.config, attempt);
            tracing::warn!(
                attempt,
                max = self.config.max_retries,
                delay_ms = delay.as_millis(),
                error = %err,
                "Transient RPC error, retrying"
            );
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl<P: RpcProvider> RpcProvider for RetryingRpcProvider<P> {
    async fn query_events(
        &self,
        selector: &EventSelector,
        limit: usize,
        cursor: Option<&EventId>,
        descending: bool,
    ) -> Result<EventsPage> {
        self.with_retry(|| self.inner.query_events(selector, limit, cursor, descending))
            .await
    }

    async fn block_by_digest(&self, tx_digest: &str) -> Result<BlockMetadata> {
        self.with_retry(|| self.inner.block_by_digest(tx_digest))
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
