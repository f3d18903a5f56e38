use serde::{Deserialize, Serialize};

use batchledger_core::{DomainError, DomainResult, Entity, ProductId};

/// Product entity at the ledger's boundary.
///
/// Not event-sourced here: the ledger consumes a handful of fields and
/// writes back the derived stock aggregates. `stock` and `available` are
/// caches over the batch rows and are only meaningful for batch-tracked
/// products immediately after a synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    is_batch_tracked: bool,
    shelf_life_days: Option<u32>,
    reserved: i64,
    stock: i64,
    available: i64,
}

impl Product {
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        is_batch_tracked: bool,
        shelf_life_days: Option<u32>,
    ) -> DomainResult<Self> {
        let sku = sku.into();
        let name = name.into();
        if sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            sku,
            name,
            is_batch_tracked,
            shelf_life_days,
            reserved: 0,
            stock: 0,
            available: 0,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_batch_tracked(&self) -> bool {
        self.is_batch_tracked
    }

    pub fn shelf_life_days(&self) -> Option<u32> {
        self.shelf_life_days
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    /// Reserve quantity against this product (order lines not yet shipped).
    pub fn set_reserved(&mut self, reserved: i64) -> DomainResult<()> {
        if reserved < 0 {
            return Err(DomainError::validation("reserved cannot be negative"));
        }
        self.reserved = reserved;
        self.available = (self.stock - self.reserved).max(0);
        Ok(())
    }

    /// Apply a synchronized stock total from the batch rows.
    ///
    /// `available` is derived as `max(0, stock - reserved)`.
    pub fn apply_stock_total(&mut self, stock: i64) {
        self.stock = stock;
        self.available = (stock - self.reserved).max(0);
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked_product() -> Product {
        Product::new(ProductId::new(), "SKU-001", "Paracetamol 500mg", true, Some(730)).unwrap()
    }

    #[test]
    fn new_rejects_blank_sku_and_name() {
        assert!(matches!(
            Product::new(ProductId::new(), "  ", "Name", true, None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Product::new(ProductId::new(), "SKU-001", "", true, None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn stock_total_derives_available() {
        let mut product = tracked_product();
        product.set_reserved(4).unwrap();
        product.apply_stock_total(10);
        assert_eq!(product.stock(), 10);
        assert_eq!(product.available(), 6);
    }

    #[test]
    fn available_clamps_at_zero_when_overreserved() {
        let mut product = tracked_product();
        product.set_reserved(15).unwrap();
        product.apply_stock_total(10);
        assert_eq!(product.available(), 0);
    }

    #[test]
    fn reserved_cannot_be_negative() {
        let mut product = tracked_product();
        assert!(matches!(
            product.set_reserved(-1),
            Err(DomainError::Validation(_))
        ));
    }
}
