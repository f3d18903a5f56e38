use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use batchledger_core::{BatchNumber, DomainError, DomainResult, LocationId, ProductId};

use crate::freshness::{status_on, BatchStatus};

/// Natural key of a materialized batch row.
///
/// At most one `BatchInventory` exists per key; repeated receipts into the
/// same key are additive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub batch_no: BatchNumber,
}

impl core::fmt::Display for BatchKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.product_id, self.location_id, self.batch_no
        )
    }
}

/// Materialized per-batch stock level, derived from the event log.
///
/// Born on the first receipt into its key, mutated additively by later
/// events, and kept at `qty = 0` rather than deleted when fully consumed.
/// `mfg_date`/`expiry_date` are identity metadata fixed at creation; later
/// events never rewrite them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInventory {
    pub key: BatchKey,
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub qty: i64,
}

impl BatchInventory {
    /// Create a new row for a first receipt.
    ///
    /// Rejects non-positive quantities and inverted date pairs; nothing is
    /// mutated on failure.
    pub fn create(
        key: BatchKey,
        qty: i64,
        mfg_date: Option<NaiveDate>,
        expiry_date: Option<NaiveDate>,
    ) -> DomainResult<Self> {
        if qty <= 0 {
            return Err(DomainError::validation(format!(
                "new batch quantity must be positive, got {qty}"
            )));
        }
        validate_dates(mfg_date, expiry_date)?;

        Ok(Self {
            key,
            mfg_date,
            expiry_date,
            qty,
        })
    }

    /// Add a signed delta to the row's quantity.
    ///
    /// A delta that would drive `qty` below zero is rejected without
    /// mutation.
    pub fn apply_delta(&mut self, delta: i64) -> DomainResult<()> {
        let next = self.qty + delta;
        if next < 0 {
            return Err(DomainError::negative_stock(self.qty, -delta));
        }
        self.qty = next;
        Ok(())
    }

    /// Freshness of this batch as of `today`.
    pub fn status_on(&self, today: NaiveDate) -> BatchStatus {
        status_on(self.expiry_date, today)
    }
}

/// Check that a manufacture/expiry date pair is coherent: when both are
/// present, manufacture must strictly precede expiry.
pub fn validate_dates(
    mfg_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
) -> DomainResult<()> {
    if let (Some(mfg), Some(expiry)) = (mfg_date, expiry_date) {
        if mfg >= expiry {
            return Err(DomainError::validation(format!(
                "manufacture date {mfg} must precede expiry date {expiry}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> BatchKey {
        BatchKey {
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            batch_no: BatchNumber::new("LOT-1").unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_rejects_non_positive_qty() {
        let err = BatchInventory::create(test_key(), 0, None, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = BatchInventory::create(test_key(), -5, None, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_inverted_dates() {
        let err = BatchInventory::create(
            test_key(),
            10,
            Some(date(2025, 6, 1)),
            Some(date(2025, 5, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // Equal dates are also rejected: zero shelf life is not a batch.
        let err = BatchInventory::create(
            test_key(),
            10,
            Some(date(2025, 6, 1)),
            Some(date(2025, 6, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn apply_delta_accumulates() {
        let mut row = BatchInventory::create(test_key(), 10, None, None).unwrap();
        row.apply_delta(5).unwrap();
        row.apply_delta(-3).unwrap();
        assert_eq!(row.qty, 12);
    }

    #[test]
    fn apply_delta_rejects_negative_stock_without_mutation() {
        let mut row = BatchInventory::create(test_key(), 10, None, None).unwrap();
        let err = row.apply_delta(-100).unwrap_err();
        assert_eq!(
            err,
            DomainError::NegativeStock {
                available: 10,
                requested: 100
            }
        );
        assert_eq!(row.qty, 10);
    }

    #[test]
    fn draining_to_zero_is_allowed() {
        let mut row = BatchInventory::create(test_key(), 10, None, None).unwrap();
        row.apply_delta(-10).unwrap();
        assert_eq!(row.qty, 0);
    }
}
