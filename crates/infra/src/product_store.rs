//! Product collaborator storage boundary.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use batchledger_core::ProductId;
use batchledger_products::Product;

/// Read/write access to the product collaborator.
///
/// The ledger reads tracking flags and reservations, and writes back the
/// synchronized `stock`/`available` aggregates. Product lifecycle beyond
/// that is owned elsewhere.
pub trait ProductStore: Send + Sync {
    fn get(&self, product_id: ProductId) -> Option<Product>;
    fn upsert(&self, product: Product);
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn get(&self, product_id: ProductId) -> Option<Product> {
        (**self).get(product_id)
    }

    fn upsert(&self, product: Product) {
        (**self).upsert(product)
    }
}

/// In-memory product store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn get(&self, product_id: ProductId) -> Option<Product> {
        let map = self.inner.read().ok()?;
        map.get(&product_id).cloned()
    }

    fn upsert(&self, product: Product) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(product.id_typed(), product);
        }
    }
}
