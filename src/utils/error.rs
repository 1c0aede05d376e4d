//! Error types for `SuiIndexer` operations.
//!
//! This module defines a comprehensive error enumeration using `thiserror`
//! to provide clear, actionable error reporting throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Custom error type for indexer operations.
///
/// This error type covers every failure mode of the indexer, from configuration
/// issues to runtime failures in RPC communication, database operations, filter
/// compilation and event synchronization.
#[derive(Debug, Error)]
pub enum SuiIndexerError {
    /// Errors encountered during database operations.
    ///
    /// This variant automatically wraps `sqlx::Error` using the `#[from]` attribute,
    /// allowing seamless error propagation with the `?` operator.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Inserting one record of a batch failed. Records before it stay committed.
    #[error("Failed to insert event {handle} at offset {offset}: {source}")]
    InsertFailed {
        handle: String,
        offset: u64,
        #[source]
        source: sqlx::Error,
    },

    /// Errors while encoding or decoding the JSON `data` document of an event.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Errors interacting with the Sui RPC.
    ///
    /// This covers HTTP failures and malformed responses from the full node.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC {method} rejected (code {code}): {message}")]
    RpcRejected {
        method: String,
        code: i64,
        message: String,
    },

    /// Connection error (refused, reset or timed out before a response).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A filter expression could not be compiled into a predicate.
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Errors related to configuration.
    ///
    /// This includes missing environment variables, invalid configuration values,
    /// or failures in parsing configuration data.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Errors from environment variable operations.
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),

    /// A point lookup matched no row.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sync pass exceeded its deadline. Work committed before the deadline stands.
    #[error("Sync pass timed out after {0:?}")]
    Timeout(Duration),

    /// The operation observed cancellation of its token and returned early.
    #[error("Operation cancelled")]
    Cancelled,

    /// Synchronizing a single event stream failed.
    #[error("Event sync failed for {handle}: {source}")]
    EventSync {
        /// Event handle (`package::module::event`) of the failing stream.
        handle: String,
        /// Underlying failure.
        #[source]
        source: Box<SuiIndexerError>,
    },

    /// The service is not in its running state.
    #[error("Service not ready: {0}")]
    NotReady(String),

    /// Generic errors for operations that don't fit other categories.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// All retry attempts were exhausted on a transient error.
    ///
    /// Contains the number of attempts made and the last error message.
    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Total number of attempts (initial call + retries).
        attempts: u32,
        /// String representation of the last error.
        last_error: String,
    },
}

impl SuiIndexerError {
    /// Wraps `self` with the handle of the stream it occurred on.
    #[must_use]
    pub fn for_stream(self, handle: impl Into<String>) -> Self {
        SuiIndexerError::EventSync {
            handle: handle.into(),
            source: Box::new(self),
        }
    }

    /// Returns `true` for JSON-RPC codes that mean the request itself is bad:
    /// parse error, invalid request, unknown method and invalid params.
    #[must_use]
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            SuiIndexerError::RpcRejected {
                code: -32700 | -32600 | -32601 | -32602,
                ..
            }
        )
    }

    /// Returns `true` for deadline failures, looking through stream wrappers.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            SuiIndexerError::Timeout(_) => true,
            SuiIndexerError::EventSync { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// Type alias for Results using `SuiIndexerError`.
///
/// This provides a convenient shorthand for functions that return
/// `Result<T, SuiIndexerError>`.
pub type Result<T> = std::result::Result<T, SuiIndexerError>;

impl From<reqwest::Error> for SuiIndexerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SuiIndexerError::ConnectionError(err.to_string())
        } else {
            SuiIndexerError::RpcError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_stream_keeps_source() {
        let err = SuiIndexerError::RpcError("boom".into()).for_stream("0x1::counter::Inc");
        assert_eq!(
            err.to_string(),
            "Event sync failed for 0x1::counter::Inc: RPC error: boom"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_timeout_through_wrapper() {
        let err = SuiIndexerError::Timeout(Duration::from_secs(1)).for_stream("h");
        assert!(err.is_timeout());
        assert!(!SuiIndexerError::Cancelled.is_timeout());
    }
}
