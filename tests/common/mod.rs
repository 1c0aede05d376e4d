#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use sui_event_indexer::query::{Expression, LimitAndSort};
use sui_event_indexer::{
    BlockMetadata, ChainEvent, EventId, EventRecord, EventSelector, EventStore, EventsPage,
    MemoryEventStore, Result, RpcProvider, SuiIndexerError,
};

pub const BASE_TIMESTAMP_MS: u64 = 1_700_000_000_000;
pub const BASE_CHECKPOINT: u64 = 1_000;

pub fn counter_selector() -> EventSelector {
    EventSelector::new("0x2", "counter", "CounterIncremented")
}

#[derive(Default)]
struct ChainState {
    streams: HashMap<String, Vec<ChainEvent>>,
    blocks: HashMap<String, BlockMetadata>,
    tx_count: u64,
}

/// Scriptable in-process stand-in for a Sui full node.
///
/// Events are kept per event type in chain order. The cursor handed back with
/// a page is the id of the last event on it, as on a real node.
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<ChainState>,
    failing_digests: Mutex<HashSet<String>>,
    failing_streams: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    max_page_len: Mutex<Option<usize>>,
    pub query_calls: AtomicU32,
    pub block_calls: AtomicU32,
    pub cursors_seen: Mutex<Vec<Option<EventId>>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event of `selector`'s type in its own transaction.
    pub fn emit(&self, selector: &EventSelector, parsed_json: Value) -> EventId {
        let mut state = self.state.lock().unwrap();
        state.tx_count += 1;
        let n = state.tx_count;
        let digest = format!("TX{n:06}");
        let id = EventId::new(digest.clone(), "0");

        state.blocks.insert(
            digest.clone(),
            BlockMetadata {
                tx_digest: digest.clone(),
                height: BASE_CHECKPOINT + n,
                timestamp_ms: BASE_TIMESTAMP_MS + n * 1_000,
            },
        );
        state
            .streams
            .entry(selector.handle())
            .or_default()
            .push(ChainEvent {
                id: id.clone(),
                package_id: selector.package.clone(),
                transaction_module: selector.module.clone(),
                sender: "0xsender".to_string(),
                event_type: selector.handle(),
                parsed_json,
                timestamp_ms: Some(BASE_TIMESTAMP_MS + n * 1_000),
            });
        id
    }

    /// Emits `count` counter events with `newValue` = "1", "2", ...
    pub fn emit_counter(&self, selector: &EventSelector, count: usize) -> Vec<EventId> {
        let existing = self.stream_len(selector);
        (0..count)
            .map(|i| {
                self.emit(
                    selector,
                    json!({ "newValue": (existing + i + 1).to_string() }),
                )
            })
            .collect()
    }

    pub fn stream_len(&self, selector: &EventSelector) -> usize {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(&selector.handle())
            .map_or(0, Vec::len)
    }

    pub fn fail_block_lookup(&self, digest: &str) {
        self.failing_digests
            .lock()
            .unwrap()
            .insert(digest.to_string());
    }

    pub fn fail_stream(&self, selector: &EventSelector) {
        self.failing_streams
            .lock()
            .unwrap()
            .insert(selector.handle());
    }

    pub fn heal_stream(&self, selector: &EventSelector) {
        self.failing_streams
            .lock()
            .unwrap()
            .remove(&selector.handle());
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Caps every page at `len` events, below whatever limit the caller asks
    /// for. `has_next_page` still reports what is left, as a node that trims
    /// pages does.
    pub fn set_max_page_len(&self, len: Option<usize>) {
        *self.max_page_len.lock().unwrap() = len;
    }

    pub fn block(&self, digest: &str) -> Option<BlockMetadata> {
        self.state.lock().unwrap().blocks.get(digest).cloned()
    }
}

#[async_trait]
impl RpcProvider for FakeChain {
    async fn query_events(
        &self,
        selector: &EventSelector,
        limit: usize,
        cursor: Option<&EventId>,
        descending: bool,
    ) -> Result<EventsPage> {
        assert!(!descending, "the sync engine pages in ascending order");
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors_seen.lock().unwrap().push(cursor.cloned());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let handle = selector.handle();
        if self.failing_streams.lock().unwrap().contains(&handle) {
            return Err(SuiIndexerError::RpcError(format!(
                "node unavailable for {handle}"
            )));
        }

        let state = self.state.lock().unwrap();
        let stream = state.streams.get(&handle).cloned().unwrap_or_default();
        let start = match cursor {
            None => 0,
            Some(cursor) => stream
                .iter()
                .position(|e| &e.id == cursor)
                .map_or(stream.len(), |i| i + 1),
        };

        let page_len = self
            .max_page_len
            .lock()
            .unwrap()
            .map_or(limit, |max| max.min(limit));
        let data: Vec<ChainEvent> = stream.iter().skip(start).take(page_len).cloned().collect();
        let has_next_page = start + data.len() < stream.len();
        let next_cursor = data.last().map(|e| e.id.clone()).or_else(|| cursor.cloned());

        Ok(EventsPage {
            data,
            next_cursor,
            has_next_page,
        })
    }

    async fn block_by_digest(&self, tx_digest: &str) -> Result<BlockMetadata> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_digests.lock().unwrap().contains(tx_digest) {
            return Err(SuiIndexerError::RpcError(format!(
                "transaction {tx_digest} not found"
            )));
        }
        self.block(tx_digest)
            .ok_or_else(|| SuiIndexerError::RpcError(format!("unknown digest {tx_digest}")))
    }
}

/// Memory store whose inserts fail from a given offset on, while armed.
///
/// Records before the failing one are stored, like a non-transactional batch.
pub struct FailingStore {
    pub inner: MemoryEventStore,
    fail_from_offset: u64,
    armed: AtomicBool,
}

impl FailingStore {
    pub fn new(fail_from_offset: u64) -> Self {
        Self {
            inner: MemoryEventStore::new(),
            fail_from_offset,
            armed: AtomicBool::new(true),
        }
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for FailingStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.inner.ensure_schema().await
    }

    async fn insert_events(&self, records: &[EventRecord]) -> Result<()> {
        if !self.armed.load(Ordering::SeqCst) {
            return self.inner.insert_events(records).await;
        }
        for record in records {
            if record.event_offset >= self.fail_from_offset {
                return Err(SuiIndexerError::InternalError(format!(
                    "disk full at offset {}",
                    record.event_offset
                )));
            }
            self.inner.insert_events(std::slice::from_ref(record)).await?;
        }
        Ok(())
    }

    async fn query_events(
        &self,
        address: &str,
        handle: &str,
        expressions: &[Expression],
        limit_and_sort: &LimitAndSort,
    ) -> Result<Vec<EventRecord>> {
        self.inner
            .query_events(address, handle, expressions, limit_and_sort)
            .await
    }

    async fn get_latest_offset(&self, address: &str, handle: &str) -> Result<Option<u64>> {
        self.inner.get_latest_offset(address, handle).await
    }

    async fn get_tx_version_by_id(&self, id: i64) -> Result<u64> {
        self.inner.get_tx_version_by_id(id).await
    }

    async fn get_tx_digest_by_id(&self, id: i64) -> Result<String> {
        self.inner.get_tx_digest_by_id(id).await
    }
}

/// Polls `check` every few milliseconds until it holds or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
