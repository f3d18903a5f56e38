use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use batchledger_core::{BatchNumber, EventId, LocationId, ProductId};

use crate::batch::BatchKey;

/// What kind of fact a ledger entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchEventKind {
    Receipt,
    Transfer,
    Sale,
    Return,
    Adjust,
}

impl BatchEventKind {
    /// Stable event name identifier (e.g. "batch.receipt").
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchEventKind::Receipt => "batch.receipt",
            BatchEventKind::Transfer => "batch.transfer",
            BatchEventKind::Sale => "batch.sale",
            BatchEventKind::Return => "batch.return",
            BatchEventKind::Adjust => "batch.adjust",
        }
    }
}

impl core::fmt::Display for BatchEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured reference to the document that caused a stock movement.
///
/// Closed set of known reference kinds; each carries the identifier of the
/// originating document. `Manual` covers operator-initiated corrections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventRef {
    PurchaseOrder { order_id: Uuid },
    SalesOrder { order_id: Uuid },
    CustomerReturn { return_id: Uuid },
    Manual,
}

/// A stock-affecting fact, ready to be appended (not yet assigned an id or
/// timestamp; the event log assigns both during append).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatchEvent {
    pub kind: BatchEventKind,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub batch_no: BatchNumber,

    /// Signed quantity delta: positive for stock in, negative for stock out.
    pub qty_delta: i64,

    /// Batch identity metadata, recorded on the creating receipt so the
    /// projection is fully re-derivable from the log.
    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,

    pub reference: Option<EventRef>,
    pub note: Option<String>,
}

/// A stored ledger fact. Append-only: never mutated or deleted by normal
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvent {
    pub id: EventId,
    pub recorded_at: DateTime<Utc>,

    pub kind: BatchEventKind,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub batch_no: BatchNumber,
    pub qty_delta: i64,

    pub mfg_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,

    pub reference: Option<EventRef>,
    pub note: Option<String>,
}

impl BatchEvent {
    /// The materialization key this fact folds into.
    pub fn key(&self) -> BatchKey {
        BatchKey {
            product_id: self.product_id,
            location_id: self.location_id,
            batch_no: self.batch_no.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(BatchEventKind::Receipt.as_str(), "batch.receipt");
        assert_eq!(BatchEventKind::Transfer.as_str(), "batch.transfer");
        assert_eq!(BatchEventKind::Sale.as_str(), "batch.sale");
        assert_eq!(BatchEventKind::Return.as_str(), "batch.return");
        assert_eq!(BatchEventKind::Adjust.as_str(), "batch.adjust");
    }

    #[test]
    fn event_round_trips_through_serde() {
        let event = BatchEvent {
            id: EventId::new(),
            recorded_at: Utc::now(),
            kind: BatchEventKind::Receipt,
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            batch_no: BatchNumber::new("LOT-1").unwrap(),
            qty_delta: 12,
            mfg_date: None,
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            reference: Some(EventRef::PurchaseOrder {
                order_id: Uuid::now_v7(),
            }),
            note: Some("initial receipt".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: BatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
