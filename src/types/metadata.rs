//! Block metadata and per-pass sync results.

use serde::{Deserialize, Serialize};

use crate::utils::error::SuiIndexerError;

/// Block (checkpoint) information resolved for an event's transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub tx_digest: String,
    /// Checkpoint sequence number containing the transaction.
    pub height: u64,
    /// Checkpoint timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// Result of one sync pass across every tracked selector.
///
/// Only used for logging and for deciding what to return; never persisted.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub success_count: usize,
    pub error_count: usize,
    pub last_error: Option<SuiIndexerError>,
}

impl SyncOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }
}
