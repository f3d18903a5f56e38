//! Append-only batch event log storage.

use std::sync::Arc;

use thiserror::Error;

use batchledger_batches::{BatchEvent, BatchKey, NewBatchEvent};
use batchledger_core::ProductId;

pub mod in_memory;

pub use in_memory::InMemoryBatchEventLog;

/// Event log operation error.
///
/// The log's contract exposes storage faults only: there is no update or
/// delete operation to fail, and the algorithmic layers above assume
/// durability once `append` returns.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Append-only record of stock-affecting facts.
///
/// `append` assigns the event id (UUIDv7, time-ordered) and the recorded-at
/// timestamp; callers supply only the fact itself. Events are never mutated
/// or deleted by normal operation. Queries return events in append order.
pub trait BatchEventLog: Send + Sync {
    /// Persist a fact, assigning its id and timestamp.
    fn append(&self, event: NewBatchEvent) -> Result<BatchEvent, EventLogError>;

    /// All facts recorded for a product, across locations and batches.
    fn for_product(&self, product_id: ProductId) -> Result<Vec<BatchEvent>, EventLogError>;

    /// All facts recorded for one exact `(product, location, batch_no)` key.
    fn for_key(&self, key: &BatchKey) -> Result<Vec<BatchEvent>, EventLogError>;
}

impl<S> BatchEventLog for Arc<S>
where
    S: BatchEventLog + ?Sized,
{
    fn append(&self, event: NewBatchEvent) -> Result<BatchEvent, EventLogError> {
        (**self).append(event)
    }

    fn for_product(&self, product_id: ProductId) -> Result<Vec<BatchEvent>, EventLogError> {
        (**self).for_product(product_id)
    }

    fn for_key(&self, key: &BatchKey) -> Result<Vec<BatchEvent>, EventLogError> {
        (**self).for_key(key)
    }
}
