use std::sync::RwLock;

use chrono::Utc;

use batchledger_batches::{BatchEvent, BatchKey, NewBatchEvent};
use batchledger_core::{EventId, ProductId};

use super::{BatchEventLog, EventLogError};

/// In-memory append-only event log.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryBatchEventLog {
    events: RwLock<Vec<BatchEvent>>,
}

impl InMemoryBatchEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fact in the log, in append order.
    pub fn all(&self) -> Result<Vec<BatchEvent>, EventLogError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;
        Ok(events.clone())
    }
}

impl BatchEventLog for InMemoryBatchEventLog {
    fn append(&self, event: NewBatchEvent) -> Result<BatchEvent, EventLogError> {
        let stored = BatchEvent {
            id: EventId::new(),
            recorded_at: Utc::now(),
            kind: event.kind,
            product_id: event.product_id,
            location_id: event.location_id,
            batch_no: event.batch_no,
            qty_delta: event.qty_delta,
            mfg_date: event.mfg_date,
            expiry_date: event.expiry_date,
            reference: event.reference,
            note: event.note,
        };

        let mut events = self
            .events
            .write()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;
        events.push(stored.clone());

        Ok(stored)
    }

    fn for_product(&self, product_id: ProductId) -> Result<Vec<BatchEvent>, EventLogError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;

        Ok(events
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect())
    }

    fn for_key(&self, key: &BatchKey) -> Result<Vec<BatchEvent>, EventLogError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventLogError::Storage("lock poisoned".to_string()))?;

        Ok(events.iter().filter(|e| &e.key() == key).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchledger_batches::BatchEventKind;
    use batchledger_core::{BatchNumber, LocationId};

    fn new_event(product_id: ProductId, batch_no: &str, qty_delta: i64) -> NewBatchEvent {
        NewBatchEvent {
            kind: BatchEventKind::Receipt,
            product_id,
            location_id: LocationId::from_uuid(uuid::Uuid::nil()),
            batch_no: BatchNumber::new(batch_no).unwrap(),
            qty_delta,
            mfg_date: None,
            expiry_date: None,
            reference: None,
            note: None,
        }
    }

    #[test]
    fn append_assigns_id_and_timestamp() {
        let log = InMemoryBatchEventLog::new();
        let product_id = ProductId::new();

        let a = log.append(new_event(product_id, "B1", 5)).unwrap();
        let b = log.append(new_event(product_id, "B1", 5)).unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.recorded_at <= b.recorded_at);
    }

    #[test]
    fn queries_filter_by_product_and_key() {
        let log = InMemoryBatchEventLog::new();
        let product_a = ProductId::new();
        let product_b = ProductId::new();

        log.append(new_event(product_a, "B1", 5)).unwrap();
        log.append(new_event(product_a, "B2", 3)).unwrap();
        log.append(new_event(product_b, "B1", 7)).unwrap();

        assert_eq!(log.for_product(product_a).unwrap().len(), 2);
        assert_eq!(log.for_product(product_b).unwrap().len(), 1);

        let key = BatchKey {
            product_id: product_a,
            location_id: LocationId::from_uuid(uuid::Uuid::nil()),
            batch_no: BatchNumber::new("B1").unwrap(),
        };
        let for_key = log.for_key(&key).unwrap();
        assert_eq!(for_key.len(), 1);
        assert_eq!(for_key[0].qty_delta, 5);
    }

    #[test]
    fn append_order_is_preserved() {
        let log = InMemoryBatchEventLog::new();
        let product_id = ProductId::new();

        for qty in [5, -2, 4] {
            log.append(new_event(product_id, "B1", qty)).unwrap();
        }

        let deltas: Vec<i64> = log
            .for_product(product_id)
            .unwrap()
            .iter()
            .map(|e| e.qty_delta)
            .collect();
        assert_eq!(deltas, vec![5, -2, 4]);
    }
}
