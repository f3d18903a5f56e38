//! Infrastructure layer: storage abstractions and the ledger service.
//!
//! The event log is the source of truth; batch rows and product stock
//! aggregates are derived caches maintained by [`ledger::BatchLedger`].

pub mod batch_store;
pub mod event_log;
pub mod keyed_lock;
pub mod ledger;
pub mod product_store;


pub use batch_store::{BatchStore, InMemoryBatchStore};
pub use event_log::{BatchEventLog, EventLogError, InMemoryBatchEventLog};
pub use keyed_lock::ProductLocks;
pub use ledger::{
    AdjustBatch, BatchAdjustment, BatchLedger, BatchReceipt, BatchTransfer, FulfillSale,
    LedgerError, ReceiveBatch, RecordReturn, SaleFulfillment, StockSync, TransferBatch,
};
pub use product_store::{InMemoryProductStore, ProductStore};
