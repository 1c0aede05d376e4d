//! In-process [`EventStore`].

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::{EventStore, check_bigint_range};
use crate::query::compiler::EventQuery;
use crate::query::{Expression, LimitAndSort, SortDirection};
use crate::types::events::EventRecord;
use crate::utils::error::{Result, SuiIndexerError};

type RecordKey = (String, String, String, u64);

#[derive(Default)]
struct Inner {
    rows: Vec<EventRecord>,
    keys: HashSet<RecordKey>,
    next_id: i64,
}

/// Keeps rows in a vector and evaluates compiled predicates in memory.
///
/// Enforces the same uniqueness key and ordering as [`super::PgEventStore`].
#[derive(Default)]
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
}

impl MemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored row, in insertion order.
    pub async fn all(&self) -> Vec<EventRecord> {
        self.inner.lock().await.rows.clone()
    }
}

fn key_of(record: &EventRecord) -> RecordKey {
    let (address, handle, digest, offset) = record.key();
    (address.to_string(), handle.to_string(), digest.to_string(), offset)
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_events(&self, records: &[EventRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().await;
        for record in records {
            check_bigint_range(record)?;
            if !inner.keys.insert(key_of(record)) {
                continue;
            }
            inner.next_id += 1;
            let mut row = record.clone();
            row.id = Some(inner.next_id);
            inner.rows.push(row);
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
        let query = EventQuery::new(address, handle, expressions, limit_and_sort)?;
        let inner = self.inner.lock().await;

        let mut rows = Vec::new();
        for row in &inner.rows {
            if query.matches(row)? {
                rows.push(row.clone());
            }
        }
        rows.sort_by_key(|r| r.event_offset);
        if query.direction == SortDirection::Desc {
            rows.reverse();
        }
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    async fn get_latest_offset(&self, address: &str, handle: &str) -> Result<Option<u64>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.event_account_address == address && r.event_handle == handle)
            .map(|r| r.event_offset)
            .max())
    }

    async fn get_tx_version_by_id(&self, id: i64) -> Result<u64> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .iter()
            .find(|r| r.id == Some(id))
            .map(|r| r.block_version)
            .ok_or_else(|| SuiIndexerError::NotFound(format!("event with id {id}")))
    }

    async fn get_tx_digest_by_id(&self, id: i64) -> Result<String> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .iter()
            .find(|r| r.id == Some(id))
            .map(|r| r.tx_digest.clone())
            .ok_or_else(|| SuiIndexerError::NotFound(format!("event with id {id}")))
    }
}
