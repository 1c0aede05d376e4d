//! Lifecycle coordinator for the event and transaction loops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::events_indexer::EventsIndexerApi;
use crate::core::transactions_indexer::TransactionsIndexerApi;
use crate::utils::error::{Result, SuiIndexerError};
use crate::utils::logging;

const SERVICE_NAME: &str = "Indexers";

struct LoopHandles {
    events_token: CancellationToken,
    transactions_token: CancellationToken,
    tasks: Vec<JoinHandle<Result<()>>>,
}

enum Lifecycle {
    Unstarted,
    Running(LoopHandles),
    Stopped(Vec<JoinHandle<Result<()>>>),
}

impl Lifecycle {
    fn label(&self) -> &'static str {
        match self {
            Lifecycle::Unstarted => "unstarted",
            Lifecycle::Running(_) => "running",
            Lifecycle::Stopped(_) => "stopped",
        }
    }
}

/// Runs the events indexer and the transactions indexer as one service.
///
/// `start` and `close` each take effect once; repeated calls are no-ops, and a
/// closed coordinator cannot be restarted.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sui_event_indexer::{ChainIndexer, EventsIndexerApi, TransactionsIndexerApi};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(
/// #     events: Arc<dyn EventsIndexerApi>,
/// #     transactions: Arc<dyn TransactionsIndexerApi>,
/// # ) -> sui_event_indexer::Result<()> {
/// let indexer = ChainIndexer::new(events, transactions);
/// let root = CancellationToken::new();
/// indexer.start(&root)?;
/// indexer.ready()?;
/// indexer.close()?;
/// indexer.wait().await;
/// # Ok(())
/// # }
/// ```
pub struct ChainIndexer {
    events: Arc<dyn EventsIndexerApi>,
    transactions: Arc<dyn TransactionsIndexerApi>,
    root: CancellationToken,
    state: Mutex<Lifecycle>,
}

impl ChainIndexer {
    pub fn new(
        events: Arc<dyn EventsIndexerApi>,
        transactions: Arc<dyn TransactionsIndexerApi>,
    ) -> Self {
        Self {
            events,
            transactions,
            root: CancellationToken::new(),
            state: Mutex::new(Lifecycle::Unstarted),
        }
    }

    fn state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    /// Launches both loops. Only the first call has an effect.
    ///
    /// The events loop stops when `parent` is cancelled or on [`close`](Self::close);
    /// the transactions loop only stops on `close`.
    ///
    /// # Errors
    ///
    /// Never fails today; the `Result` mirrors the other lifecycle calls.
    pub fn start(&self, parent: &CancellationToken) -> Result<()> {
        let mut state = self.state();
        if !matches!(*state, Lifecycle::Unstarted) {
            tracing::debug!(state = state.label(), "start ignored");
            return Ok(());
        }

        let events_token = parent.child_token();
        let transactions_token = self.root.child_token();

        let events = Arc::clone(&self.events);
        let events_loop_token = events_token.clone();
        let events_task = tokio::spawn(async move {
            let result = events.start(events_loop_token).await;
            if let Err(err) = &result {
                logging::log_error("events indexer exited", &err.to_string());
            }
            result
        });

        let transactions = Arc::clone(&self.transactions);
        let transactions_loop_token = transactions_token.clone();
        let transactions_task = tokio::spawn(async move {
            let result = transactions.start(transactions_loop_token).await;
            if let Err(err) = &result {
                logging::log_error("transactions indexer exited", &err.to_string());
            }
            result
        });

        *state = Lifecycle::Running(LoopHandles {
            events_token,
            transactions_token,
            tasks: vec![events_task, transactions_task],
        });
        tracing::info!(service = SERVICE_NAME, "started");
        Ok(())
    }

    /// Stops both loops. Only the first call has an effect.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state();
        match std::mem::replace(&mut *state, Lifecycle::Stopped(Vec::new())) {
            Lifecycle::Running(handles) => {
                handles.events_token.cancel();
                handles.transactions_token.cancel();
                *state = Lifecycle::Stopped(handles.tasks);
                tracing::info!(service = SERVICE_NAME, "stopped");
            }
            Lifecycle::Unstarted => {
                tracing::debug!(service = SERVICE_NAME, "closed before start");
            }
            stopped @ Lifecycle::Stopped(_) => {
                *state = stopped;
            }
        }
        Ok(())
    }

    /// `Ok` only while running.
    ///
    /// # Errors
    ///
    /// Returns `SuiIndexerError::NotReady` before `start` and after `close`.
    pub fn ready(&self) -> Result<()> {
        let state = self.state();
        match *state {
            Lifecycle::Running(_) => Ok(()),
            ref other => Err(SuiIndexerError::NotReady(format!(
                "{SERVICE_NAME} is {}",
                other.label()
            ))),
        }
    }

    /// Waits for both loops to exit after [`close`](Self::close).
    ///
    /// Returns immediately if the service was never started or has already
    /// been waited on.
    pub async fn wait(&self) {
        let tasks = match &mut *self.state() {
            Lifecycle::Stopped(tasks) => std::mem::take(tasks),
            _ => return,
        };
        for task in tasks {
            if let Err(err) = task.await {
                logging::log_error("indexer task panicked", &err.to_string());
            }
        }
    }

    #[must_use]
    pub fn events_indexer(&self) -> Arc<dyn EventsIndexerApi> {
        Arc::clone(&self.events)
    }

    #[must_use]
    pub fn transactions_indexer(&self) -> Arc<dyn TransactionsIndexerApi> {
        Arc::clone(&self.transactions)
    }
}
