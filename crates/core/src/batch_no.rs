//! Batch number value object.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A batch (lot) number as printed on received goods.
///
/// Part of the natural key `(product, location, batch_no)`, so it must be
/// non-empty. Ordering is lexicographic; the FIFO allocator relies on it to
/// break ties between batches sharing an expiry date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchNumber(String);

impl BatchNumber {
    /// Validate and construct a batch number. Surrounding whitespace is
    /// stripped; an empty result is rejected.
    pub fn new(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for BatchNumber {}

impl core::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BatchNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims_printed_numbers() {
        let no = BatchNumber::new("  LOT-2025-0042 ").unwrap();
        assert_eq!(no.as_str(), "LOT-2025-0042");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(
            BatchNumber::new(""),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            BatchNumber::new("   "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn orders_lexicographically() {
        let a = BatchNumber::new("B1").unwrap();
        let b = BatchNumber::new("B2").unwrap();
        assert!(a < b);
    }
}
