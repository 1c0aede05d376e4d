//! JSON-RPC client for a Sui full node.
//!
//! [`RpcProvider`] is the chain-facing seam of the sync engine.
//! [`JsonRpcProvider`] implements it over HTTP with `reqwest`, paging events with
//! `suix_queryEvents` and resolving checkpoints with
//! `sui_getTransactionBlock`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::types::events::{EventId, EventSelector, EventsPage, de_opt_u64};
use crate::types::metadata::BlockMetadata;
use crate::utils::error::{Result, SuiIndexerError};

/// Chain reads the sync engine depends on.
#[async_trait]
pub trait RpcProvider: Send + Sync {
    /// Fetches one page of events of `selector`'s type, starting after `cursor`.
    async fn query_events(
        &self,
        selector: &EventSelector,
        limit: usize,
        cursor: Option<&EventId>,
        descending: bool,
    ) -> Result<EventsPage>;

    /// Resolves the checkpoint that contains transaction `tx_digest`.
    async fn block_by_digest(&self, tx_digest: &str) -> Result<BlockMetadata>;
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBlock {
    digest: String,
    #[serde(default, deserialize_with = "de_opt_u64")]
    checkpoint: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    timestamp_ms: Option<u64>,
}

/// [`RpcProvider`] speaking Sui JSON-RPC over HTTP.
pub struct JsonRpcProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    /// Creates a provider for the full node at `rpc_url`.
    ///
    /// # Errors
    ///
    /// Returns `SuiIndexerError::ConfigError` if the HTTP client cannot be built.
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuiIndexerError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::trace!(method, id, "rpc request");
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SuiIndexerError::RpcError(format!(
                "{method}: HTTP {status}"
            )));
        }

        let envelope: RpcResponse<T> = response.json().await?;
        if let Some(err) = envelope.error {
            return Err(SuiIndexerError::RpcRejected {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| SuiIndexerError::RpcError(format!("{method}: empty result")))
    }
}

#[async_trait]
impl RpcProvider for JsonRpcProvider {
    async fn query_events(
        &self,
        selector: &EventSelector,
        limit: usize,
        cursor: Option<&EventId>,
        descending: bool,
    ) -> Result<EventsPage> {
        self.call(
            "suix_queryEvents",
            json!([
                { "MoveEventType": selector.handle() },
                cursor,
                limit,
                descending
            ]),
        )
        .await
    }

    async fn block_by_digest(&self, tx_digest: &str) -> Result<BlockMetadata> {
        let block: TransactionBlock = self
            .call(
                "sui_getTransactionBlock",
                json!([
                    tx_digest,
                    {
                        "showInput": false,
                        "showRawInput": false,
                        "showEffects": false,
                        "showEvents": false,
                        "showObjectChanges": false,
                        "showBalanceChanges": false
                    }
                ]),
            )
            .await?;

        let height = block.checkpoint.ok_or_else(|| {
            SuiIndexerError::RpcError(format!("transaction {tx_digest} is not checkpointed yet"))
        })?;

        Ok(BlockMetadata {
            tx_digest: block.digest,
            height,
            timestamp_ms: block.timestamp_ms.unwrap_or_default(),
        })
    }
}
