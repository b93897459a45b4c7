//! Calendar-day timestamp.
//!
//! # Invariants
//! - The stored value is always aligned to 00:00 UTC of its day.
//! - Equality and ordering are by calendar day.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const DAY_LENGTH_MS: i64 = 24 * 60 * 60 * 1000;
// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Opaque calendar-day identifier, stored as unix milliseconds at 00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Builds a timestamp for the day containing `unix_millis`.
    pub fn from_unix_millis(unix_millis: i64) -> Self {
        Self(unix_millis.div_euclid(DAY_LENGTH_MS) * DAY_LENGTH_MS)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let epoch_days = i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
        Self(epoch_days * DAY_LENGTH_MS)
    }

    /// Current UTC day.
    pub fn today() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn unix_millis(self) -> i64 {
        self.0
    }

    pub fn to_date(self) -> Option<NaiveDate> {
        let days_from_ce = self.0.div_euclid(DAY_LENGTH_MS) + UNIX_EPOCH_DAYS_FROM_CE;
        i32::try_from(days_from_ce)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
    }

    pub fn plus_days(self, days: i64) -> Self {
        Self(self.0 + days * DAY_LENGTH_MS)
    }

    /// Number of days from `self` to `other`; negative when `other` is earlier.
    pub fn days_until(self, other: Timestamp) -> i64 {
        (other.0 - self.0) / DAY_LENGTH_MS
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_date() {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => write!(f, "day@{}", self.0),
        }
    }
}
