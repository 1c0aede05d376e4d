pub mod events_indexer;
pub mod indexer;
pub mod transactions_indexer;

pub use events_indexer::{EventsIndexer, EventsIndexerApi, PAGE_SIZE, StreamCursor};
pub use indexer::ChainIndexer;
pub use transactions_indexer::{TransactionsIndexer, TransactionsIndexerApi};
