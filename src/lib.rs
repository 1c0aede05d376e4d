//! `sui-event-indexer` - indexes Sui Move events into PostgreSQL.
//!
//! The crate polls a Sui full node for the events of a set of tracked Move
//! event types, stores them idempotently, and lets callers read them back
//! through a small filter language that compiles to parameterized SQL.
//!
//! # Components
//!
//! - [`storage`]: the [`EventStore`] trait with a PostgreSQL backend and an
//!   in-memory backend.
//! - [`query`]: filter expressions, the predicate AST and the compiler.
//! - [`core`]: the events sync engine, the transactions loop and the
//!   [`ChainIndexer`] lifecycle coordinator.
//! - [`utils`]: errors, logging helpers, the JSON-RPC client and retries.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sui_event_indexer::{
//!     ChainIndexer, EventsIndexer, JsonRpcProvider, PgEventStore, RetryingRpcProvider,
//!     SuiIndexerConfigBuilder, TransactionsIndexer,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SuiIndexerConfigBuilder::new()
//!         .with_rpc("http://127.0.0.1:9000")
//!         .with_database("postgresql://localhost/sui")
//!         .track_event("0x2::counter::CounterIncremented".parse()?)
//!         .build()?;
//!
//!     let store = Arc::new(PgEventStore::new(&config.database_url).await?);
//!     let rpc = RetryingRpcProvider::new(
//!         JsonRpcProvider::new(&config.rpc_url, config.rpc_timeout)?,
//!         config.retry.clone(),
//!     );
//!     let events = EventsIndexer::new(
//!         Arc::new(rpc),
//!         store,
//!         config.event_selectors.clone(),
//!         config.events_indexer,
//!     );
//!     let transactions = TransactionsIndexer::new(config.transactions_indexer);
//!
//!     let indexer = ChainIndexer::new(Arc::new(events), Arc::new(transactions));
//!     let root = CancellationToken::new();
//!     indexer.start(&root)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     indexer.close()?;
//!     indexer.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! # Querying stored events
//!
//! ```no_run
//! use sui_event_indexer::query::{ComparisonOperator, Expression, LimitAndSort, ValueComparator};
//! use sui_event_indexer::{EventStore, PgEventStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PgEventStore::new("postgresql://localhost/sui").await?;
//! let rows = store
//!     .query_events(
//!         "0x2",
//!         "0x2::counter::CounterIncremented",
//!         &[Expression::comparator(
//!             "newValue",
//!             vec![ValueComparator::new(2, ComparisonOperator::Gte)],
//!         )],
//!         &LimitAndSort::new().with_limit(10),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Public API exports
pub use config::{LoopConfig, RetryConfig, SuiIndexerConfig, SuiIndexerConfigBuilder};
pub use core::events_indexer::{EventsIndexer, EventsIndexerApi, PAGE_SIZE, StreamCursor};
pub use core::indexer::ChainIndexer;
pub use core::transactions_indexer::{TransactionsIndexer, TransactionsIndexerApi};
pub use storage::{EventStore, MemoryEventStore, PgEventStore};
pub use types::events::{ChainEvent, EventData, EventId, EventRecord, EventSelector, EventsPage};
pub use types::metadata::{BlockMetadata, SyncOutcome};
pub use utils::error::{Result, SuiIndexerError};
pub use utils::retry::RetryingRpcProvider;
pub use utils::rpc::{JsonRpcProvider, RpcProvider};

// Module declarations
pub mod config;
pub mod core;
pub mod query;
pub mod storage;
pub mod telemetry;
pub mod types;
pub mod utils;
