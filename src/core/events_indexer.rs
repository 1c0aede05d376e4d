//! Event sync engine.
//!
//! Walks each tracked event stream page by page with the chain's own cursor
//! and stores every event it sees. Cursors live in memory only; a fresh engine
//! re-reads each stream from its beginning and relies on the store's
//! uniqueness key to drop what it already has.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::config::LoopConfig;
use crate::storage::EventStore;
use crate::types::events::{ChainEvent, EventId, EventRecord, EventSelector};
use crate::types::metadata::{BlockMetadata, SyncOutcome};
use crate::utils::error::{Result, SuiIndexerError};
use crate::utils::logging;
use crate::utils::rpc::RpcProvider;

/// Events requested per RPC page.
pub const PAGE_SIZE: usize = 100;

/// Position of the engine in one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    /// Chain cursor to pass as `cursor` on the next page request.
    pub event_id: EventId,
    /// Offset the first event of the next page will get.
    pub next_offset: u64,
}

#[async_trait]
pub trait EventsIndexerApi: Send + Sync {
    /// Runs sync passes on the polling interval until `token` is cancelled.
    async fn start(&self, token: CancellationToken) -> Result<()>;

    /// Syncs every tracked stream once, in order.
    ///
    /// Returns `Cancelled` as soon as `token` is observed cancelled between
    /// streams, and otherwise the last stream failure (if any) once every
    /// stream has been tried.
    async fn sync_all_events(&self, token: &CancellationToken) -> Result<SyncOutcome>;

    /// Syncs one stream to the end of what the node currently returns.
    /// An untracked selector is added to the tracked set first.
    async fn sync_event(&self, token: &CancellationToken, selector: &EventSelector) -> Result<()>;
}

pub struct EventsIndexer {
    rpc: Arc<dyn RpcProvider>,
    store: Arc<dyn EventStore>,
    config: LoopConfig,
    page_size: usize,
    selectors: RwLock<Vec<EventSelector>>,
    cursors: Mutex<HashMap<String, StreamCursor>>,
    schema_ready: AtomicBool,
}

impl EventsIndexer {
    pub fn new(
        rpc: Arc<dyn RpcProvider>,
        store: Arc<dyn EventStore>,
        selectors: Vec<EventSelector>,
        config: LoopConfig,
    ) -> Self {
        let mut unique: Vec<EventSelector> = Vec::with_capacity(selectors.len());
        for selector in selectors {
            if !unique.contains(&selector) {
                unique.push(selector);
            }
        }

        Self {
            rpc,
            store,
            config,
            page_size: PAGE_SIZE,
            selectors: RwLock::new(unique),
            cursors: Mutex::new(HashMap::new()),
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Overrides the page size. Mostly useful in tests.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds `selector` to the tracked set. Returns `false` if it was already tracked.
    pub async fn track_event(&self, selector: EventSelector) -> bool {
        let mut selectors = self.selectors.write().await;
        if selectors.contains(&selector) {
            return false;
        }
        tracing::info!(handle = %selector, "tracking event stream");
        selectors.push(selector);
        true
    }

    /// Snapshot of the tracked selectors.
    pub async fn tracked(&self) -> Vec<EventSelector> {
        self.selectors.read().await.clone()
    }

    /// Current cursor of the stream with event handle `handle`.
    pub async fn cursor(&self, handle: &str) -> Option<StreamCursor> {
        self.cursors.lock().await.get(handle).cloned()
    }

    async fn ensure_schema(&self) -> Result<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.store.ensure_schema().await?;
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// One pass over every stream. Stream failures are counted, not returned.
    async fn sync_pass(&self, token: &CancellationToken) -> Result<SyncOutcome> {
        self.ensure_schema().await?;

        let selectors = self.tracked().await;
        let mut outcome = SyncOutcome::default();

        for selector in &selectors {
            if token.is_cancelled() {
                return Err(SuiIndexerError::Cancelled);
            }
            match self.sync_event(token, selector).await {
                Ok(()) => outcome.success_count += 1,
                Err(err) => {
                    tracing::warn!(handle = %selector, error = %err, "event stream sync failed");
                    outcome.error_count += 1;
                    outcome.last_error = Some(err.for_stream(selector.handle()));
                }
            }
        }

        Ok(outcome)
    }

    /// Runs one pass under the configured deadline and logs how it ended.
    async fn run_pass(&self, token: &CancellationToken) {
        let pass_token = token.child_token();
        let started = Instant::now();

        let result = tokio::time::timeout(self.config.sync_timeout, self.sync_pass(&pass_token))
            .await
            .unwrap_or(Err(SuiIndexerError::Timeout(self.config.sync_timeout)));

        match result {
            Err(err) if err.is_timeout() => {
                tracing::warn!(
                    timeout_ms = u64::try_from(self.config.sync_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "event sync timed out"
                );
            }
            Err(SuiIndexerError::Cancelled) => {
                tracing::debug!("event sync cancelled");
            }
            Err(err) => {
                tracing::warn!(error = %err, "event sync completed with errors");
            }
            Ok(outcome) => {
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                logging::log_pass(outcome.success_count, outcome.error_count, duration_ms);
                if let Some(err) = &outcome.last_error {
                    tracing::warn!(error = %err, "last event sync error");
                }
            }
        }
    }

    fn to_record(
        selector: &EventSelector,
        handle: &str,
        event: &ChainEvent,
        block: &BlockMetadata,
        offset: u64,
    ) -> EventRecord {
        let block_timestamp = if block.timestamp_ms > 0 {
            block.timestamp_ms
        } else {
            event.timestamp_ms.unwrap_or_default()
        };

        EventRecord {
            id: None,
            event_account_address: selector.package.clone(),
            event_handle: handle.to_string(),
            event_offset: offset,
            tx_digest: event.id.tx_digest.clone(),
            block_version: block.height,
            block_height: block.height.to_string(),
            block_hash: block.tx_digest.as_bytes().to_vec(),
            block_timestamp,
            data: event.data(),
        }
    }
}

#[async_trait]
impl EventsIndexerApi for EventsIndexer {
    async fn start(&self, token: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.config.polling_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let streams = self.selectors.read().await.len();
        tracing::info!(
            polling_interval_ms =
                u64::try_from(self.config.polling_interval.as_millis()).unwrap_or(u64::MAX),
            streams,
            "events indexer started"
        );

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::info!("events indexer stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            self.run_pass(&token).await;
        }
    }

    async fn sync_all_events(&self, token: &CancellationToken) -> Result<SyncOutcome> {
        let mut outcome = self.sync_pass(token).await?;
        match outcome.last_error.take() {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    async fn sync_event(&self, _token: &CancellationToken, selector: &EventSelector) -> Result<()> {
        self.track_event(selector.clone()).await;

        let handle = selector.handle();
        let mut cursor = self.cursor(&handle).await;

        loop {
            let page = self
                .rpc
                .query_events(
                    selector,
                    self.page_size,
                    cursor.as_ref().map(|c| &c.event_id),
                    false,
                )
                .await?;

            if page.data.is_empty() {
                break;
            }

            let base_offset = cursor.as_ref().map_or(0, |c| c.next_offset);
            let mut records = Vec::with_capacity(page.data.len());
            for (index, event) in page.data.iter().enumerate() {
                let block = match self.rpc.block_by_digest(&event.id.tx_digest).await {
                    Ok(block) => block,
                    Err(err) => {
                        tracing::warn!(
                            handle = %handle,
                            tx_digest = %event.id.tx_digest,
                            error = %err,
                            "skipping event without block metadata"
                        );
                        continue;
                    }
                };
                records.push(Self::to_record(
                    selector,
                    &handle,
                    event,
                    &block,
                    base_offset + index as u64,
                ));
            }

            self.store.insert_events(&records).await?;
            logging::log_batch(&handle, records.len(), page.data.len());

            let Some(next) = page.next_cursor.clone() else {
                break;
            };
            let advanced = StreamCursor {
                event_id: next,
                next_offset: base_offset + page.data.len() as u64,
            };
            self.cursors
                .lock()
                .await
                .insert(handle.clone(), advanced.clone());
            cursor = Some(advanced);

            if !page.has_next_page || page.data.len() < self.page_size {
                break;
            }
        }

        Ok(())
    }
}
