use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use sui_event_indexer::query::compiler::{EventQuery, compile};
use sui_event_indexer::query::{
    ComparisonOperator, Expression, LimitAndSort, SortBy, SortDirection, ValueComparator,
};
use sui_event_indexer::storage::queries::{EVENT_COLUMNS, EVENTS_TABLE};
use sui_event_indexer::{EventRecord, EventStore, MemoryEventStore};
use tokio::runtime::Runtime;

const ADDRESS: &str = "0x2";
const HANDLE: &str = "0x2::counter::CounterIncremented";

fn filters() -> Vec<Expression> {
    vec![
        Expression::timestamp(1_700_000_000_000, ComparisonOperator::Gte),
        Expression::and(vec![
            Expression::comparator(
                "newValue",
                vec![
                    ValueComparator::new(100, ComparisonOperator::Gte),
                    ValueComparator::new(900, ComparisonOperator::Lt),
                ],
            ),
            Expression::or(vec![
                Expression::comparator(
                    "owner.id",
                    vec![ValueComparator::new("0xa", ComparisonOperator::Eq)],
                ),
                Expression::comparator(
                    "owner.id",
                    vec![ValueComparator::new("0xb", ComparisonOperator::Eq)],
                ),
            ]),
        ]),
    ]
}

fn record(offset: u64) -> EventRecord {
    let owner = if offset % 2 == 0 { "0xa" } else { "0xc" };
    EventRecord {
        id: None,
        event_account_address: ADDRESS.to_string(),
        event_handle: HANDLE.to_string(),
        event_offset: offset,
        tx_digest: format!("TX{offset}"),
        block_version: offset,
        block_height: offset.to_string(),
        block_hash: vec![0u8; 32],
        block_timestamp: 1_700_000_000_000 + offset,
        data: json!({ "newValue": offset.to_string(), "owner": { "id": owner } })
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }
}

fn compiler_benchmark(c: &mut Criterion) {
    let filters = filters();
    let las = LimitAndSort::new()
        .with_limit(50)
        .sort(SortBy::Sequence(SortDirection::Desc));

    let mut group = c.benchmark_group("compiler");

    group.bench_function("compile_nested_filter", |b| {
        b.iter(|| compile(black_box(&filters[1])).unwrap());
    });

    group.bench_function("render_event_query", |b| {
        b.iter(|| {
            let query =
                EventQuery::new(ADDRESS, HANDLE, black_box(&filters), black_box(&las)).unwrap();
            query.to_sql(EVENT_COLUMNS, EVENTS_TABLE)
        });
    });

    group.finish();
}

fn memory_store_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = MemoryEventStore::new();
    let records: Vec<_> = (0..1_000).map(record).collect();
    rt.block_on(store.insert_events(&records)).unwrap();

    let filters = filters();
    let las = LimitAndSort::new().with_limit(50);

    let mut group = c.benchmark_group("memory_store");

    group.bench_function("query_1000_rows", |b| {
        b.to_async(&rt).iter(|| async {
            store
                .query_events(ADDRESS, HANDLE, black_box(&filters), black_box(&las))
                .await
                .unwrap()
        });
    });

    group.bench_function("insert_duplicate_batch", |b| {
        b.to_async(&rt)
            .iter(|| async { store.insert_events(black_box(&records[..100])).await.unwrap() });
    });

    group.finish();
}

criterion_group!(benches, compiler_benchmark, memory_store_benchmark);
criterion_main!(benches);
