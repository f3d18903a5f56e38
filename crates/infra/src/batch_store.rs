//! Keyed storage for materialized batch rows.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use batchledger_batches::{BatchInventory, BatchKey};
use batchledger_core::{LocationId, ProductId};

/// Keyed store for the materialized batch projection.
///
/// Rows are a derived cache over the event log: disposable and rebuildable
/// by replay. At most one row exists per key; `upsert` replaces in place.
pub trait BatchStore: Send + Sync {
    fn get(&self, key: &BatchKey) -> Option<BatchInventory>;
    fn upsert(&self, row: BatchInventory);
    /// All rows for a product, across locations.
    fn list_for_product(&self, product_id: ProductId) -> Vec<BatchInventory>;
    /// Rows for a product scoped to one location.
    fn list_for_location(&self, product_id: ProductId, location_id: LocationId)
        -> Vec<BatchInventory>;
    /// Administrative removal. Returns whether a row existed.
    fn remove(&self, key: &BatchKey) -> bool;
    /// Drop all rows for a product (rebuild support).
    fn clear_product(&self, product_id: ProductId);
}

impl<S> BatchStore for Arc<S>
where
    S: BatchStore + ?Sized,
{
    fn get(&self, key: &BatchKey) -> Option<BatchInventory> {
        (**self).get(key)
    }

    fn upsert(&self, row: BatchInventory) {
        (**self).upsert(row)
    }

    fn list_for_product(&self, product_id: ProductId) -> Vec<BatchInventory> {
        (**self).list_for_product(product_id)
    }

    fn list_for_location(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Vec<BatchInventory> {
        (**self).list_for_location(product_id, location_id)
    }

    fn remove(&self, key: &BatchKey) -> bool {
        (**self).remove(key)
    }

    fn clear_product(&self, product_id: ProductId) {
        (**self).clear_product(product_id)
    }
}

/// In-memory keyed store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    inner: RwLock<HashMap<BatchKey, BatchInventory>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted<F>(&self, pred: F) -> Vec<BatchInventory>
    where
        F: Fn(&BatchKey) -> bool,
    {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut rows: Vec<BatchInventory> = map
            .iter()
            .filter_map(|(k, v)| if pred(k) { Some(v.clone()) } else { None })
            .collect();

        // Stable listing order regardless of map iteration.
        rows.sort_by(|a, b| {
            a.key
                .batch_no
                .cmp(&b.key.batch_no)
                .then_with(|| a.key.location_id.as_uuid().cmp(b.key.location_id.as_uuid()))
        });
        rows
    }
}

impl BatchStore for InMemoryBatchStore {
    fn get(&self, key: &BatchKey) -> Option<BatchInventory> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    fn upsert(&self, row: BatchInventory) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(row.key.clone(), row);
        }
    }

    fn list_for_product(&self, product_id: ProductId) -> Vec<BatchInventory> {
        self.collect_sorted(|k| k.product_id == product_id)
    }

    fn list_for_location(
        &self,
        product_id: ProductId,
        location_id: LocationId,
    ) -> Vec<BatchInventory> {
        self.collect_sorted(|k| k.product_id == product_id && k.location_id == location_id)
    }

    fn remove(&self, key: &BatchKey) -> bool {
        match self.inner.write() {
            Ok(mut map) => map.remove(key).is_some(),
            Err(_) => false,
        }
    }

    fn clear_product(&self, product_id: ProductId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|k, _| k.product_id != product_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchledger_core::BatchNumber;

    fn key(product_id: ProductId, location_id: LocationId, batch_no: &str) -> BatchKey {
        BatchKey {
            product_id,
            location_id,
            batch_no: BatchNumber::new(batch_no).unwrap(),
        }
    }

    fn row(key: BatchKey, qty: i64) -> BatchInventory {
        BatchInventory {
            key,
            mfg_date: None,
            expiry_date: None,
            qty,
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let store = InMemoryBatchStore::new();
        let k = key(ProductId::new(), LocationId::new(), "B1");

        store.upsert(row(k.clone(), 5));
        store.upsert(row(k.clone(), 9));

        assert_eq!(store.get(&k).unwrap().qty, 9);
        assert_eq!(store.list_for_product(k.product_id).len(), 1);
    }

    #[test]
    fn listings_scope_by_product_and_location() {
        let store = InMemoryBatchStore::new();
        let product = ProductId::new();
        let loc_a = LocationId::new();
        let loc_b = LocationId::new();

        store.upsert(row(key(product, loc_a, "B1"), 5));
        store.upsert(row(key(product, loc_b, "B2"), 3));
        store.upsert(row(key(ProductId::new(), loc_a, "B3"), 8));

        assert_eq!(store.list_for_product(product).len(), 2);
        let scoped = store.list_for_location(product, loc_a);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].key.batch_no.as_str(), "B1");
    }

    #[test]
    fn listings_sort_by_batch_number() {
        let store = InMemoryBatchStore::new();
        let product = ProductId::new();
        let loc = LocationId::new();

        store.upsert(row(key(product, loc, "B3"), 1));
        store.upsert(row(key(product, loc, "B1"), 1));
        store.upsert(row(key(product, loc, "B2"), 1));

        let numbers: Vec<_> = store
            .list_for_product(product)
            .iter()
            .map(|r| r.key.batch_no.as_str().to_string())
            .collect();
        assert_eq!(numbers, vec!["B1", "B2", "B3"]);
    }

    #[test]
    fn remove_reports_existence() {
        let store = InMemoryBatchStore::new();
        let k = key(ProductId::new(), LocationId::new(), "B1");

        assert!(!store.remove(&k));
        store.upsert(row(k.clone(), 5));
        assert!(store.remove(&k));
        assert!(store.get(&k).is_none());
    }

    #[test]
    fn clear_product_leaves_other_products_alone() {
        let store = InMemoryBatchStore::new();
        let product_a = ProductId::new();
        let product_b = ProductId::new();
        let loc = LocationId::new();

        store.upsert(row(key(product_a, loc, "B1"), 5));
        store.upsert(row(key(product_b, loc, "B1"), 3));

        store.clear_product(product_a);
        assert!(store.list_for_product(product_a).is_empty());
        assert_eq!(store.list_for_product(product_b).len(), 1);
    }
}
