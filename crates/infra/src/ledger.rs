//! The batch ledger service.
//!
//! Orchestrates the write path: validate, append the fact to the event log,
//! fold it into the materialized batch row, and roll the product aggregate
//! up, all under the product's write lock so a fault cannot interleave with
//! another writer on the same product. Reads (planning, classification)
//! take no lock and tolerate a stale snapshot.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use batchledger_batches::{
    plan_picks, status_now, validate_dates, BatchEvent, BatchEventKind, BatchInventory, BatchKey,
    BatchStatus, EventRef, FifoPlan, NewBatchEvent,
};
use batchledger_core::{BatchNumber, DomainError, LocationId, ProductId};

use crate::batch_store::BatchStore;
use crate::event_log::{BatchEventLog, EventLogError};
use crate::keyed_lock::ProductLocks;
use crate::product_store::ProductStore;

/// Ledger operation error.
///
/// Domain failures (validation, negative stock, unknown keys) and storage
/// faults are both returned to the caller as values; nothing here panics.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] EventLogError),

    /// Allocatable stock does not cover the requested quantity; nothing was
    /// committed.
    #[error("insufficient allocatable stock: requested {requested}, can fulfill {fulfilled}")]
    Shortfall { requested: i64, fulfilled: i64 },

    #[error("write serialization lock poisoned")]
    Poisoned,
}

/// Command: record goods received into a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBatch {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub batch_no: BatchNumber,
    pub qty: i64,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub reference: Option<EventRef>,
    pub note: Option<String>,
}

/// Command: correct a batch's quantity by a signed delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustBatch {
    pub key: BatchKey,
    pub qty_change: i64,
    pub note: Option<String>,
}

/// Command: move quantity between locations within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBatch {
    pub product_id: ProductId,
    pub batch_no: BatchNumber,
    pub from: LocationId,
    pub to: LocationId,
    pub qty: i64,
    pub note: Option<String>,
}

/// Command: record a customer return flowing back into a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReturn {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub batch_no: BatchNumber,
    pub qty: i64,
    pub reference: Option<EventRef>,
    pub note: Option<String>,
}

/// Command: consume stock for a sale, nearest expiry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillSale {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub required_qty: i64,
    pub reference: Option<EventRef>,
    pub note: Option<String>,
}

/// Outcome of a receipt or return: the updated row and the recorded fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt {
    pub batch: BatchInventory,
    pub event: BatchEvent,
}

/// Outcome of an adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAdjustment {
    pub batch: BatchInventory,
    pub event: BatchEvent,
}

/// Outcome of a transfer: both updated rows and the two recorded facts
/// (outbound first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransfer {
    pub from: BatchInventory,
    pub to: BatchInventory,
    pub events: [BatchEvent; 2],
}

/// Outcome of a committed sale: the plan that was executed and one recorded
/// fact per pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFulfillment {
    pub plan: FifoPlan,
    pub events: Vec<BatchEvent>,
}

/// Outcome of a synchronization pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockSync {
    /// The product aggregate was recomputed from the batch rows.
    Applied { stock: i64, available: i64 },
    /// The product is not batch-tracked; nothing was written.
    SkippedNotTracked,
}

/// Batch inventory ledger over pluggable stores.
///
/// Generic over the event log, batch row store and product store so durable
/// backends can be slotted in without touching the orchestration.
#[derive(Debug)]
pub struct BatchLedger<L, B, P> {
    event_log: L,
    batches: B,
    products: P,
    locks: ProductLocks,
}

impl<L, B, P> BatchLedger<L, B, P>
where
    L: BatchEventLog,
    B: BatchStore,
    P: ProductStore,
{
    pub fn new(event_log: L, batches: B, products: P) -> Self {
        Self {
            event_log,
            batches,
            products,
            locks: ProductLocks::new(),
        }
    }

    /// Record goods received into a batch.
    ///
    /// First receipt into a key creates the row with the supplied dates;
    /// later receipts into the same key are additive and leave the row's
    /// identity metadata untouched (the event still records what was
    /// supplied). A receipt that carries a manufacture date but no expiry
    /// derives the expiry from the product's shelf life, when it has one.
    pub fn receive_batch(&self, cmd: ReceiveBatch) -> Result<BatchReceipt, LedgerError> {
        if cmd.qty <= 0 {
            return Err(DomainError::validation(format!(
                "receipt quantity must be positive, got {}",
                cmd.qty
            ))
            .into());
        }

        let lock = self.locks.for_product(cmd.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let Some(product) = self.products.get(cmd.product_id) else {
            return Err(DomainError::not_found().into());
        };
        let expiry_date = match (cmd.expiry_date, cmd.mfg_date) {
            (Some(expiry), _) => Some(expiry),
            (None, Some(mfg)) => product
                .shelf_life_days()
                .map(|days| mfg + chrono::Duration::days(i64::from(days))),
            (None, None) => None,
        };
        validate_dates(cmd.mfg_date, expiry_date)?;

        let key = BatchKey {
            product_id: cmd.product_id,
            location_id: cmd.location_id,
            batch_no: cmd.batch_no.clone(),
        };

        let row = match self.batches.get(&key) {
            Some(mut row) => {
                row.apply_delta(cmd.qty)?;
                row
            }
            None => BatchInventory::create(key.clone(), cmd.qty, cmd.mfg_date, expiry_date)?,
        };

        let event = self.event_log.append(NewBatchEvent {
            kind: BatchEventKind::Receipt,
            product_id: cmd.product_id,
            location_id: cmd.location_id,
            batch_no: cmd.batch_no,
            qty_delta: cmd.qty,
            mfg_date: cmd.mfg_date,
            expiry_date,
            reference: cmd.reference,
            note: cmd.note,
        })?;

        self.batches.upsert(row.clone());
        self.sync_locked(cmd.product_id)?;

        tracing::info!(
            product = %cmd.product_id,
            batch = %row.key.batch_no,
            qty = cmd.qty,
            "batch receipt recorded"
        );

        Ok(BatchReceipt { batch: row, event })
    }

    /// Correct a batch's quantity by a signed delta.
    ///
    /// Unknown keys are reported as not found; a delta that would drive the
    /// row below zero is rejected with nothing mutated.
    pub fn adjust_batch(&self, cmd: AdjustBatch) -> Result<BatchAdjustment, LedgerError> {
        if cmd.qty_change == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero").into());
        }

        let lock = self.locks.for_product(cmd.key.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let Some(mut row) = self.batches.get(&cmd.key) else {
            return Err(DomainError::not_found().into());
        };
        row.apply_delta(cmd.qty_change)?;

        let event = self.event_log.append(NewBatchEvent {
            kind: BatchEventKind::Adjust,
            product_id: cmd.key.product_id,
            location_id: cmd.key.location_id,
            batch_no: cmd.key.batch_no.clone(),
            qty_delta: cmd.qty_change,
            mfg_date: None,
            expiry_date: None,
            reference: Some(EventRef::Manual),
            note: cmd.note,
        })?;

        self.batches.upsert(row.clone());
        self.sync_locked(cmd.key.product_id)?;

        tracing::info!(
            product = %cmd.key.product_id,
            batch = %cmd.key.batch_no,
            delta = cmd.qty_change,
            "batch adjusted"
        );

        Ok(BatchAdjustment { batch: row, event })
    }

    /// Move quantity between two locations within one batch.
    ///
    /// Records one outbound and one inbound fact; the inbound fact carries
    /// the batch's identity dates so a destination row created by replay
    /// keeps them.
    pub fn transfer_batch(&self, cmd: TransferBatch) -> Result<BatchTransfer, LedgerError> {
        if cmd.qty <= 0 {
            return Err(DomainError::validation(format!(
                "transfer quantity must be positive, got {}",
                cmd.qty
            ))
            .into());
        }
        if cmd.from == cmd.to {
            return Err(
                DomainError::validation("transfer requires two distinct locations").into(),
            );
        }

        let lock = self.locks.for_product(cmd.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let from_key = BatchKey {
            product_id: cmd.product_id,
            location_id: cmd.from,
            batch_no: cmd.batch_no.clone(),
        };
        let to_key = BatchKey {
            product_id: cmd.product_id,
            location_id: cmd.to,
            batch_no: cmd.batch_no.clone(),
        };

        let Some(mut source) = self.batches.get(&from_key) else {
            return Err(DomainError::not_found().into());
        };
        source.apply_delta(-cmd.qty)?;

        let dest = match self.batches.get(&to_key) {
            Some(mut dest) => {
                dest.apply_delta(cmd.qty)?;
                dest
            }
            None => BatchInventory::create(
                to_key.clone(),
                cmd.qty,
                source.mfg_date,
                source.expiry_date,
            )?,
        };

        let outbound = self.event_log.append(NewBatchEvent {
            kind: BatchEventKind::Transfer,
            product_id: cmd.product_id,
            location_id: cmd.from,
            batch_no: cmd.batch_no.clone(),
            qty_delta: -cmd.qty,
            mfg_date: None,
            expiry_date: None,
            reference: Some(EventRef::Manual),
            note: cmd.note.clone(),
        })?;
        let inbound = self.event_log.append(NewBatchEvent {
            kind: BatchEventKind::Transfer,
            product_id: cmd.product_id,
            location_id: cmd.to,
            batch_no: cmd.batch_no.clone(),
            qty_delta: cmd.qty,
            mfg_date: source.mfg_date,
            expiry_date: source.expiry_date,
            reference: Some(EventRef::Manual),
            note: cmd.note,
        })?;

        self.batches.upsert(source.clone());
        self.batches.upsert(dest.clone());
        self.sync_locked(cmd.product_id)?;

        tracing::info!(
            product = %cmd.product_id,
            batch = %cmd.batch_no,
            qty = cmd.qty,
            from = %cmd.from,
            to = %cmd.to,
            "batch transferred"
        );

        Ok(BatchTransfer {
            from: source,
            to: dest,
            events: [outbound, inbound],
        })
    }

    /// Record a customer return flowing back into a known batch.
    ///
    /// The key must already exist (possibly drained to zero): goods cannot
    /// return into a batch that was never received, because its identity
    /// dates would be unknown.
    pub fn record_return(&self, cmd: RecordReturn) -> Result<BatchReceipt, LedgerError> {
        if cmd.qty <= 0 {
            return Err(DomainError::validation(format!(
                "return quantity must be positive, got {}",
                cmd.qty
            ))
            .into());
        }

        let lock = self.locks.for_product(cmd.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let key = BatchKey {
            product_id: cmd.product_id,
            location_id: cmd.location_id,
            batch_no: cmd.batch_no.clone(),
        };

        let Some(mut row) = self.batches.get(&key) else {
            return Err(DomainError::not_found().into());
        };
        row.apply_delta(cmd.qty)?;

        let event = self.event_log.append(NewBatchEvent {
            kind: BatchEventKind::Return,
            product_id: cmd.product_id,
            location_id: cmd.location_id,
            batch_no: cmd.batch_no,
            qty_delta: cmd.qty,
            mfg_date: None,
            expiry_date: None,
            reference: cmd.reference,
            note: cmd.note,
        })?;

        self.batches.upsert(row.clone());
        self.sync_locked(cmd.product_id)?;

        tracing::info!(
            product = %cmd.product_id,
            batch = %row.key.batch_no,
            qty = cmd.qty,
            "customer return recorded"
        );

        Ok(BatchReceipt { batch: row, event })
    }

    /// Consume stock for a sale, nearest expiry first.
    ///
    /// Plans under the product write lock (so the observation cannot go
    /// stale before commit), refuses partial coverage, then records one
    /// sale fact per pick.
    pub fn fulfill_sale(&self, cmd: FulfillSale) -> Result<SaleFulfillment, LedgerError> {
        if cmd.required_qty <= 0 {
            return Err(DomainError::validation(format!(
                "required quantity must be positive, got {}",
                cmd.required_qty
            ))
            .into());
        }

        let lock = self.locks.for_product(cmd.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let rows = self
            .batches
            .list_for_location(cmd.product_id, cmd.location_id);
        let today = Utc::now().date_naive();
        let plan = plan_picks(&rows, cmd.required_qty, today);

        if !plan.is_complete() {
            tracing::warn!(
                product = %cmd.product_id,
                requested = cmd.required_qty,
                fulfilled = plan.fulfilled,
                "sale rejected for insufficient allocatable stock"
            );
            return Err(LedgerError::Shortfall {
                requested: cmd.required_qty,
                fulfilled: plan.fulfilled,
            });
        }

        let mut events = Vec::with_capacity(plan.picks.len());
        for pick in &plan.picks {
            let key = BatchKey {
                product_id: cmd.product_id,
                location_id: cmd.location_id,
                batch_no: pick.batch_no.clone(),
            };
            let Some(mut row) = self.batches.get(&key) else {
                return Err(DomainError::conflict(format!(
                    "planned batch {} disappeared before commit",
                    pick.batch_no
                ))
                .into());
            };
            row.apply_delta(-pick.qty)?;

            let event = self.event_log.append(NewBatchEvent {
                kind: BatchEventKind::Sale,
                product_id: cmd.product_id,
                location_id: cmd.location_id,
                batch_no: pick.batch_no.clone(),
                qty_delta: -pick.qty,
                mfg_date: None,
                expiry_date: None,
                reference: cmd.reference,
                note: cmd.note.clone(),
            })?;

            self.batches.upsert(row);
            events.push(event);
        }
        self.sync_locked(cmd.product_id)?;

        tracing::info!(
            product = %cmd.product_id,
            qty = cmd.required_qty,
            picks = plan.picks.len(),
            "sale fulfilled"
        );

        Ok(SaleFulfillment { plan, events })
    }

    /// Plan fulfillment without committing anything.
    ///
    /// Read-only; the plan is valid only at the instant of observation and
    /// must be re-validated before being committed as actual consumption.
    pub fn plan_fulfillment(
        &self,
        product_id: ProductId,
        location_id: Option<LocationId>,
        required_qty: i64,
    ) -> FifoPlan {
        let rows = match location_id {
            Some(location_id) => self.batches.list_for_location(product_id, location_id),
            None => self.batches.list_for_product(product_id),
        };
        plan_picks(&rows, required_qty, Utc::now().date_naive())
    }

    /// Freshness of an expiry date as of the current UTC date.
    pub fn status_for(&self, expiry_date: Option<NaiveDate>) -> BatchStatus {
        status_now(expiry_date)
    }

    /// Roll the materialized batch totals up into the product aggregate.
    ///
    /// No-op for products that are not batch-tracked.
    pub fn sync_product_stock(&self, product_id: ProductId) -> Result<StockSync, LedgerError> {
        let lock = self.locks.for_product(product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;
        self.sync_locked(product_id)
    }

    /// Administrative removal of a batch row.
    ///
    /// Bypasses the event log, leaving it and the materialized state out of
    /// step until the next rebuild; the product aggregate is re-synced so
    /// at least the totals stay honest.
    pub fn remove_batch(&self, key: &BatchKey) -> Result<(), LedgerError> {
        let lock = self.locks.for_product(key.product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        if !self.batches.remove(key) {
            return Err(DomainError::not_found().into());
        }
        self.sync_locked(key.product_id)?;

        tracing::warn!(
            product = %key.product_id,
            batch = %key.batch_no,
            "batch removed administratively, bypassing the event log"
        );

        Ok(())
    }

    /// Re-derive all materialized rows for a product by replaying the log,
    /// then re-sync the aggregate. Returns the number of rebuilt rows.
    ///
    /// Recovery path for a fault between append, materialization and
    /// synchronization.
    pub fn rebuild_product(&self, product_id: ProductId) -> Result<usize, LedgerError> {
        let lock = self.locks.for_product(product_id);
        let _guard = lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let events = self.event_log.for_product(product_id)?;

        let mut rows: HashMap<BatchKey, BatchInventory> = HashMap::new();
        for event in &events {
            let key = event.key();
            // A log that does not replay into valid rows is corrupt.
            match rows.get_mut(&key) {
                Some(row) => row.apply_delta(event.qty_delta).map_err(|_| {
                    DomainError::invariant(format!(
                        "replaying {key} drives its quantity negative"
                    ))
                })?,
                None => {
                    let row = BatchInventory::create(
                        key.clone(),
                        event.qty_delta,
                        event.mfg_date,
                        event.expiry_date,
                    )
                    .map_err(|_| {
                        DomainError::invariant(format!(
                            "first logged fact for {key} does not create a valid row"
                        ))
                    })?;
                    rows.insert(key, row);
                }
            }
        }

        self.batches.clear_product(product_id);
        let count = rows.len();
        for row in rows.into_values() {
            self.batches.upsert(row);
        }
        self.sync_locked(product_id)?;

        tracing::info!(product = %product_id, rows = count, "materialized state rebuilt from log");

        Ok(count)
    }

    /// Quantity for a key as derived by full replay of its events.
    ///
    /// Must equal the materialized row's quantity whenever log and
    /// projection are in step.
    pub fn replayed_qty(&self, key: &BatchKey) -> Result<i64, LedgerError> {
        let events = self.event_log.for_key(key)?;
        Ok(events.iter().map(|e| e.qty_delta).sum())
    }

    /// Current batch rows for a product, optionally scoped to one location.
    pub fn batches_for(
        &self,
        product_id: ProductId,
        location_id: Option<LocationId>,
    ) -> Vec<BatchInventory> {
        match location_id {
            Some(location_id) => self.batches.list_for_location(product_id, location_id),
            None => self.batches.list_for_product(product_id),
        }
    }

    fn sync_locked(&self, product_id: ProductId) -> Result<StockSync, LedgerError> {
        let Some(mut product) = self.products.get(product_id) else {
            return Err(DomainError::not_found().into());
        };

        if !product.is_batch_tracked() {
            return Ok(StockSync::SkippedNotTracked);
        }

        let stock: i64 = self
            .batches
            .list_for_product(product_id)
            .iter()
            .map(|row| row.qty)
            .sum();
        product.apply_stock_total(stock);
        let sync = StockSync::Applied {
            stock: product.stock(),
            available: product.available(),
        };
        self.products.upsert(product);

        tracing::debug!(product = %product_id, stock, "product stock synchronized");

        Ok(sync)
    }
}
