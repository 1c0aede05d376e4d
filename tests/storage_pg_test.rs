//! PostgreSQL store tests. Skipped unless `DATABASE_URL` is set.

use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use sui_event_indexer::query::{
    ComparisonOperator, Expression, LimitAndSort, SortBy, SortDirection, ValueComparator,
};
use sui_event_indexer::{EventRecord, EventStore, PgEventStore, SuiIndexerError};

const HANDLE: &str = "counter::CounterIncremented";

async fn store() -> Option<PgEventStore> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };
    let store = PgEventStore::new(&url).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

/// Address no other run has written to.
fn unique_address() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("0xtest{nanos:x}")
}

fn record(address: &str, offset: u64, data: Value) -> EventRecord {
    EventRecord {
        id: None,
        event_account_address: address.to_string(),
        event_handle: format!("{address}::{HANDLE}"),
        event_offset: offset,
        tx_digest: format!("TX{offset}"),
        block_version: 1_000 + offset,
        block_height: (1_000 + offset).to_string(),
        block_hash: format!("TX{offset}").into_bytes(),
        block_timestamp: 1_700_000_000_000 + offset * 1_000,
        data: data.as_object().cloned().unwrap_or_default(),
    }
}

#[tokio::test]
async fn test_insert_is_idempotent_and_round_trips() {
    let Some(store) = store().await else { return };
    let address = unique_address();
    let handle = format!("{address}::{HANDLE}");

    let records: Vec<_> = (0..3)
        .map(|i| record(&address, i, json!({ "newValue": (i + 1).to_string(), "meta": { "n": i } })))
        .collect();
    store.insert_events(&records).await.unwrap();
    store.insert_events(&records).await.unwrap();
    store.ensure_schema().await.unwrap();

    let rows = store
        .query_events(&address, &handle, &[], &LimitAndSort::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    for (row, expected) in rows.iter().zip(&records) {
        assert!(row.id.is_some());
        assert_eq!(row.event_offset, expected.event_offset);
        assert_eq!(row.block_hash, expected.block_hash);
        assert_eq!(row.block_timestamp, expected.block_timestamp);
        assert_eq!(row.data, expected.data);
    }

    assert_eq!(
        store.get_latest_offset(&address, &handle).await.unwrap(),
        Some(2)
    );
    assert_eq!(
        store.get_latest_offset(&address, "nothing::here::Never").await.unwrap(),
        None
    );

    let id = rows[1].id.unwrap();
    assert_eq!(store.get_tx_digest_by_id(id).await.unwrap(), "TX1");
    assert_eq!(store.get_tx_version_by_id(id).await.unwrap(), 1_001);

    store.close().await;
}

#[tokio::test]
async fn test_filters_run_in_sql() {
    let Some(store) = store().await else { return };
    let address = unique_address();
    let handle = format!("{address}::{HANDLE}");

    let values = ["9", "10", "25", "100"];
    let records: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(i, v)| record(&address, i as u64, json!({ "newValue": v, "meta": { "n": i } })))
        .collect();
    store.insert_events(&records).await.unwrap();

    let offsets = |rows: Vec<EventRecord>| rows.iter().map(|r| r.event_offset).collect::<Vec<_>>();

    // Numbers compare numerically even though the field is a string.
    let numeric = store
        .query_events(
            &address,
            &handle,
            &[Expression::comparator(
                "newValue",
                vec![ValueComparator::new(10, ComparisonOperator::Gt)],
            )],
            &LimitAndSort::new(),
        )
        .await
        .unwrap();
    assert_eq!(offsets(numeric), vec![2, 3]);

    // Strings compare as text.
    let text = store
        .query_events(
            &address,
            &handle,
            &[Expression::comparator(
                "newValue",
                vec![ValueComparator::new("10", ComparisonOperator::Gt)],
            )],
            &LimitAndSort::new(),
        )
        .await
        .unwrap();
    assert_eq!(offsets(text), vec![0, 2, 3]);

    let nested = store
        .query_events(
            &address,
            &handle,
            &[
                Expression::timestamp(1_700_000_001_000, ComparisonOperator::Gte),
                Expression::or(vec![
                    Expression::comparator(
                        "meta.n",
                        vec![ValueComparator::new(1, ComparisonOperator::Eq)],
                    ),
                    Expression::comparator(
                        "meta.n",
                        vec![ValueComparator::new(3, ComparisonOperator::Eq)],
                    ),
                ]),
            ],
            &LimitAndSort::new()
                .with_limit(1)
                .sort(SortBy::Sequence(SortDirection::Desc)),
        )
        .await
        .unwrap();
    assert_eq!(offsets(nested), vec![3]);

    store.close().await;
}

#[tokio::test]
async fn test_missing_id_is_not_found() {
    let Some(store) = store().await else { return };
    assert!(matches!(
        store.get_tx_digest_by_id(i64::MAX).await,
        Err(SuiIndexerError::NotFound(_))
    ));
    assert!(matches!(
        store.get_tx_version_by_id(i64::MAX).await,
        Err(SuiIndexerError::NotFound(_))
    ));
    store.close().await;
}
