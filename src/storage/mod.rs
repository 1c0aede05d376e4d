//! Event storage.
//!
//! [`EventStore`] is the seam between the sync engine / query callers and the
//! backend. [`PgEventStore`] persists to PostgreSQL; [`MemoryEventStore`]
//! keeps records in process and is what the tests run against.

pub mod memory;
pub mod queries;

pub use memory::MemoryEventStore;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use std::time::Duration;

use crate::query::LimitAndSort;
use crate::query::compiler::EventQuery;
use crate::query::predicate::SqlParam;
use crate::query::Expression;
use crate::types::events::{EventData, EventRecord};
use crate::utils::error::{Result, SuiIndexerError};

/// Abstract interface for event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Creates the schema if it does not exist. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<()>;

    /// Inserts records one by one, skipping keys that already exist.
    ///
    /// Not atomic: when record *k* fails, records before it stay stored.
    async fn insert_events(&self, records: &[EventRecord]) -> Result<()>;

    /// Reads the events of one stream that satisfy every expression.
    async fn query_events(
        &self,
        address: &str,
        handle: &str,
        expressions: &[Expression],
        limit_and_sort: &LimitAndSort,
    ) -> Result<Vec<EventRecord>>;

    /// Highest stored offset of a stream, if any.
    async fn get_latest_offset(&self, address: &str, handle: &str) -> Result<Option<u64>>;

    /// Block version of the row with surrogate id `id`.
    async fn get_tx_version_by_id(&self, id: i64) -> Result<u64>;

    /// Transaction digest of the row with surrogate id `id`.
    async fn get_tx_digest_by_id(&self, id: i64) -> Result<String>;
}

/// PostgreSQL-backed [`EventStore`].
///
/// # Example
///
/// ```no_run
/// use sui_event_indexer::storage::{EventStore, PgEventStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgEventStore::new("postgresql://localhost/sui").await?;
/// store.ensure_schema().await?;
/// # Ok(())
/// # }
/// ```
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Connects a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SuiIndexerError::DatabaseError` if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn decode_row(row: &PgRow) -> Result<EventRecord> {
        let data_text: String = row.try_get("data")?;
        let data: EventData = serde_json::from_str(&data_text)?;

        Ok(EventRecord {
            id: Some(row.try_get("id")?),
            event_account_address: row.try_get("event_account_address")?,
            event_handle: row.try_get("event_handle")?,
            event_offset: from_bigint("event_offset", row.try_get("event_offset")?)?,
            tx_digest: row.try_get("tx_digest")?,
            block_version: from_bigint("block_version", row.try_get("block_version")?)?,
            block_height: row.try_get("block_height")?,
            block_hash: row.try_get("block_hash")?,
            block_timestamp: from_bigint("block_timestamp", row.try_get("block_timestamp")?)?,
            data,
        })
    }
}

/// `BIGINT` values of a record, in column order.
struct BigIntColumns {
    event_offset: i64,
    block_version: i64,
    block_timestamp: i64,
}

impl BigIntColumns {
    fn of(record: &EventRecord) -> Result<Self> {
        Ok(Self {
            event_offset: to_bigint(record, "event_offset", record.event_offset)?,
            block_version: to_bigint(record, "block_version", record.block_version)?,
            block_timestamp: to_bigint(record, "block_timestamp", record.block_timestamp)?,
        })
    }
}

/// Rejects records whose unsigned fields do not fit the `BIGINT` columns.
///
/// # Errors
///
/// Returns [`SuiIndexerError::InternalError`] naming the first field above `i64::MAX`.
pub(crate) fn check_bigint_range(record: &EventRecord) -> Result<()> {
    BigIntColumns::of(record).map(|_| ())
}

fn to_bigint(record: &EventRecord, column: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        SuiIndexerError::InternalError(format!(
            "{column} {value} of {} at offset {} exceeds BIGINT range",
            record.event_handle, record.event_offset
        ))
    })
}

fn from_bigint(column: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| SuiIndexerError::InternalError(format!("stored {column} is negative: {value}")))
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(queries::CREATE_SCHEMA)
            .execute(&self.pool)
            .await?;
        sqlx::query(queries::CREATE_EVENTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(queries::CREATE_STREAM_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_events(&self, records: &[EventRecord]) -> Result<()> {
        for record in records {
            let columns = BigIntColumns::of(record)?;
            let data = serde_json::to_string(&record.data)?;
            sqlx::query(queries::INSERT_EVENT)
                .bind(&record.event_account_address)
                .bind(&record.event_handle)
                .bind(columns.event_offset)
                .bind(&record.tx_digest)
                .bind(columns.block_version)
                .bind(&record.block_height)
                .bind(&record.block_hash)
                .bind(columns.block_timestamp)
                .bind(data)
                .execute(&self.pool)
                .await
                .map_err(|source| SuiIndexerError::InsertFailed {
                    handle: record.event_handle.clone(),
                    offset: record.event_offset,
                    source,
                })?;
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
        let (sql, params) = query.to_sql(queries::EVENT_COLUMNS, queries::EVENTS_TABLE);
        tracing::trace!(%sql, params = params.len(), "querying events");

        let mut statement = sqlx::query(&sql);
        for param in params {
            statement = match param {
                SqlParam::Text(text) => statement.bind(text),
                SqlParam::BigInt(value) => statement.bind(value),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter().map(Self::decode_row).collect()
    }

    async fn get_latest_offset(&self, address: &str, handle: &str) -> Result<Option<u64>> {
        let result = sqlx::query_scalar::<_, Option<i64>>(queries::LATEST_OFFSET)
            .bind(address)
            .bind(handle)
            .fetch_one(&self.pool)
            .await?;

        result
            .map(|offset| from_bigint("event_offset", offset))
            .transpose()
    }

    async fn get_tx_version_by_id(&self, id: i64) -> Result<u64> {
        sqlx::query_scalar::<_, i64>(queries::TX_VERSION_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SuiIndexerError::NotFound(format!("event with id {id}")))
            .and_then(|version| from_bigint("block_version", version))
    }

    async fn get_tx_digest_by_id(&self, id: i64) -> Result<String> {
        sqlx::query_scalar::<_, String>(queries::TX_DIGEST_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SuiIndexerError::NotFound(format!("event with id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EventRecord {
        EventRecord {
            id: None,
            event_account_address: "0x1".into(),
            event_handle: "0x1::m::E".into(),
            event_offset: 3,
            tx_digest: "D".into(),
            block_version: 7,
            block_height: "7".into(),
            block_hash: vec![],
            block_timestamp: 1_000,
            data: EventData::new(),
        }
    }

    #[test]
    fn test_bigint_range_checked_on_write() {
        assert!(check_bigint_range(&record()).is_ok());

        let mut at_edge = record();
        at_edge.block_timestamp = i64::MAX as u64;
        assert!(check_bigint_range(&at_edge).is_ok());

        let mut too_big = record();
        too_big.block_version = i64::MAX as u64 + 1;
        match check_bigint_range(&too_big) {
            Err(SuiIndexerError::InternalError(msg)) => {
                assert!(msg.contains("block_version"));
                assert!(msg.contains("0x1::m::E"));
            }
            other => panic!("expected InternalError, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_bigint_rejected_on_read() {
        assert_eq!(from_bigint("event_offset", 42).unwrap(), 42);
        assert!(matches!(
            from_bigint("event_offset", -1),
            Err(SuiIndexerError::InternalError(msg)) if msg.contains("event_offset")
        ));
    }
}
