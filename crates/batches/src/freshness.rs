//! Freshness classification by expiry date.
//!
//! Status is never stored; it is recomputed from the expiry date and the
//! current date on every read.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Batches expiring within this many days are flagged for rotation.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 30;

/// Freshness of a batch relative to a reference date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Ok,
    ExpiringSoon,
    Expired,
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            BatchStatus::Ok => "ok",
            BatchStatus::ExpiringSoon => "expiring_soon",
            BatchStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Classify an expiry date against a reference date.
///
/// Both sides are calendar dates, so time-of-day never skews the comparison.
/// Contract:
/// - no expiry date → `Ok`
/// - one day past expiry → `Expired`
/// - the expiry day itself → `Ok` (not yet past)
/// - 1..=30 days until expiry → `ExpiringSoon`
/// - otherwise → `Ok`
pub fn status_on(expiry_date: Option<NaiveDate>, today: NaiveDate) -> BatchStatus {
    let Some(expiry) = expiry_date else {
        return BatchStatus::Ok;
    };

    if today > expiry {
        return BatchStatus::Expired;
    }

    let days_left = (expiry - today).num_days();
    if days_left > 0 && days_left <= EXPIRING_SOON_WINDOW_DAYS {
        BatchStatus::ExpiringSoon
    } else {
        BatchStatus::Ok
    }
}

/// Classify against the current UTC date.
pub fn status_now(expiry_date: Option<NaiveDate>) -> BatchStatus {
    status_on(expiry_date, Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_expiry_is_ok() {
        assert_eq!(status_on(None, date(2025, 1, 1)), BatchStatus::Ok);
    }

    #[test]
    fn thirty_days_out_is_expiring_soon() {
        let today = date(2025, 1, 1);
        assert_eq!(
            status_on(Some(date(2025, 1, 31)), today),
            BatchStatus::ExpiringSoon
        );
    }

    #[test]
    fn thirty_one_days_out_is_ok() {
        let today = date(2025, 1, 1);
        assert_eq!(status_on(Some(date(2025, 2, 1)), today), BatchStatus::Ok);
    }

    #[test]
    fn expiry_day_itself_is_ok() {
        let today = date(2025, 1, 1);
        assert_eq!(status_on(Some(date(2025, 1, 1)), today), BatchStatus::Ok);
    }

    #[test]
    fn one_day_past_is_expired() {
        let today = date(2025, 1, 1);
        assert_eq!(
            status_on(Some(date(2024, 12, 31)), today),
            BatchStatus::Expired
        );
    }

    #[test]
    fn tomorrow_is_expiring_soon() {
        let today = date(2025, 1, 1);
        assert_eq!(
            status_on(Some(date(2025, 1, 2)), today),
            BatchStatus::ExpiringSoon
        );
    }

    #[test]
    fn window_spans_month_boundaries() {
        let today = date(2025, 2, 15);
        assert_eq!(
            status_on(Some(date(2025, 3, 17)), today),
            BatchStatus::ExpiringSoon
        );
        assert_eq!(status_on(Some(date(2025, 3, 18)), today), BatchStatus::Ok);
    }
}
