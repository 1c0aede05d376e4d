//! Transaction sync loop.
//!
//! Shares the scheduling contract of the events indexer; the pass itself does
//! nothing yet beyond logging.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::config::LoopConfig;
use crate::types::events::EventSelector;
use crate::utils::error::Result;

#[async_trait]
pub trait TransactionsIndexerApi: Send + Sync {
    /// Runs passes on the polling interval until `token` is cancelled.
    async fn start(&self, token: CancellationToken) -> Result<()>;

    /// Records the selector of an event whose transactions should be tracked.
    async fn update_event_config(&self, selector: EventSelector);
}

pub struct TransactionsIndexer {
    config: LoopConfig,
    event_configs: RwLock<HashMap<String, EventSelector>>,
}

impl TransactionsIndexer {
    #[must_use]
    pub fn new(config: LoopConfig) -> Self {
        Self {
            config,
            event_configs: RwLock::new(HashMap::new()),
        }
    }

    /// Selector recorded under `module::event`, if any.
    pub async fn event_config(&self, key: &str) -> Option<EventSelector> {
        self.event_configs.read().await.get(key).cloned()
    }

    async fn sync_pass(&self) -> Result<()> {
        let tracked = self.event_configs.read().await.len();
        tracing::debug!(tracked, "transaction sync pass");
        Ok(())
    }
}

#[async_trait]
impl TransactionsIndexerApi for TransactionsIndexer {
    async fn start(&self, token: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.config.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("transactions indexer started");

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::info!("transactions indexer stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match tokio::time::timeout(self.config.sync_timeout, self.sync_pass()).await {
                Err(_) => tracing::warn!("transaction sync timed out"),
                Ok(Err(err)) => tracing::warn!(error = %err, "transaction sync failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    async fn update_event_config(&self, selector: EventSelector) {
        let key = format!("{}::{}", selector.module, selector.event);
        self.event_configs.write().await.insert(key, selector);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_update_event_config_keys_by_module_and_event() {
        let indexer = TransactionsIndexer::new(LoopConfig::default());
        indexer
            .update_event_config(EventSelector::new("0x2", "counter", "Inc"))
            .await;

        let stored = indexer.event_config("counter::Inc").await.unwrap();
        assert_eq!(stored.package, "0x2");
        assert!(indexer.event_config("0x2::counter::Inc").await.is_none());
    }

    #[tokio::test]
    async fn test_start_returns_after_cancel() {
        let indexer = TransactionsIndexer::new(LoopConfig::new(
            Duration::from_millis(5),
            Duration::from_millis(50),
        ));
        let token = CancellationToken::new();
        token.cancel();
        assert!(indexer.start(token).await.is_ok());
    }
}
