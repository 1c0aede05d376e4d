//! SQL text for the PostgreSQL event store.

pub const EVENTS_TABLE: &str = "sui.events";

pub const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS sui";

pub const CREATE_EVENTS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS sui.events (
        id BIGSERIAL PRIMARY KEY,
        event_account_address TEXT NOT NULL,
        event_handle TEXT NOT NULL,
        event_offset BIGINT NOT NULL,
        tx_digest TEXT NOT NULL,
        block_version BIGINT NOT NULL,
        block_height TEXT NOT NULL,
        block_hash BYTEA NOT NULL,
        block_timestamp BIGINT NOT NULL,
        data JSONB NOT NULL,
        UNIQUE (event_account_address, event_handle, tx_digest, event_offset)
    )
";

pub const CREATE_STREAM_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS idx_sui_events_stream
    ON sui.events (event_account_address, event_handle, event_offset)
";

pub const INSERT_EVENT: &str = r"
    INSERT INTO sui.events (
        event_account_address, event_handle, event_offset, tx_digest,
        block_version, block_height, block_hash, block_timestamp, data
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::jsonb)
    ON CONFLICT DO NOTHING
";

/// Column list for reads; `data` comes back as text and is parsed by the caller.
pub const EVENT_COLUMNS: &str = "id, event_account_address, event_handle, event_offset, \
    tx_digest, block_version, block_height, block_hash, block_timestamp, data::text AS data";

pub const LATEST_OFFSET: &str = r"
    SELECT MAX(event_offset) FROM sui.events
    WHERE event_account_address = $1 AND event_handle = $2
";

pub const TX_VERSION_BY_ID: &str = "SELECT block_version FROM sui.events WHERE id = $1";

pub const TX_DIGEST_BY_ID: &str = "SELECT tx_digest FROM sui.events WHERE id = $1";
