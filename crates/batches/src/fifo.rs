//! Expiry-aware FIFO allocation planning.
//!
//! Planning is pure: same rows + same required quantity always produce the
//! same picks in the same order, and nothing is mutated. A plan is valid
//! only at the instant of observation; callers commit it elsewhere, after
//! re-validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use batchledger_core::BatchNumber;

use crate::batch::BatchInventory;
use crate::freshness::{status_on, BatchStatus};

/// One planned take from a batch. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoPick {
    pub batch_no: BatchNumber,
    pub qty: i64,
    pub expiry_date: Option<NaiveDate>,
}

/// The outcome of a planning pass.
///
/// `shortfall` is carried explicitly so partial fulfillment cannot be
/// ignored by omission: `fulfilled + shortfall` always equals the requested
/// quantity (clamped at zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoPlan {
    pub picks: Vec<FifoPick>,
    pub fulfilled: i64,
    pub shortfall: i64,
}

impl FifoPlan {
    pub fn empty() -> Self {
        Self {
            picks: Vec::new(),
            fulfilled: 0,
            shortfall: 0,
        }
    }

    /// Whether the plan covers the full requested quantity.
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    pub fn requested(&self) -> i64 {
        self.fulfilled + self.shortfall
    }
}

/// Plan fulfillment of `required_qty` across `rows`, nearest expiry first.
///
/// Rows that are empty or already expired as of `today` are not allocatable.
/// Rows without an expiry date cannot spoil, so they order after all dated
/// rows; ties break by batch number ascending. A non-positive requirement
/// yields an empty plan.
pub fn plan_picks(rows: &[BatchInventory], required_qty: i64, today: NaiveDate) -> FifoPlan {
    if required_qty <= 0 {
        return FifoPlan::empty();
    }

    let mut eligible: Vec<&BatchInventory> = rows
        .iter()
        .filter(|row| row.qty > 0 && status_on(row.expiry_date, today) != BatchStatus::Expired)
        .collect();

    eligible.sort_by(|a, b| {
        let a_expiry = a.expiry_date.unwrap_or(NaiveDate::MAX);
        let b_expiry = b.expiry_date.unwrap_or(NaiveDate::MAX);
        a_expiry
            .cmp(&b_expiry)
            .then_with(|| a.key.batch_no.cmp(&b.key.batch_no))
    });

    let mut picks = Vec::new();
    let mut remaining = required_qty;
    for row in eligible {
        if remaining == 0 {
            break;
        }
        let take = row.qty.min(remaining);
        picks.push(FifoPick {
            batch_no: row.key.batch_no.clone(),
            qty: take,
            expiry_date: row.expiry_date,
        });
        remaining -= take;
    }

    FifoPlan {
        picks,
        fulfilled: required_qty - remaining,
        shortfall: remaining,
    }
}

/// Total quantity the planner could draw from as of `today`.
pub fn available_qty(rows: &[BatchInventory], today: NaiveDate) -> i64 {
    rows.iter()
        .filter(|row| row.qty > 0 && status_on(row.expiry_date, today) != BatchStatus::Expired)
        .map(|row| row.qty)
        .sum()
}
