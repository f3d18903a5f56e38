//! Batch ledger domain module.
//!
//! This crate contains the business rules for batch-level stock: the event
//! facts recorded in the ledger, the materialized per-batch projection, the
//! freshness classifier, and the FIFO allocation planner. All of it is
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod batch;
pub mod event;
pub mod fifo;
pub mod freshness;

pub use batch::{validate_dates, BatchInventory, BatchKey};
pub use event::{BatchEvent, BatchEventKind, EventRef, NewBatchEvent};
pub use fifo::{available_qty, plan_picks, FifoPick, FifoPlan};
pub use freshness::{status_now, status_on, BatchStatus, EXPIRING_SOON_WINDOW_DAYS};
