// Calendar-month time model
//
// The dataset's granularity is monthly, never finer. A `Month` is a
// (year, month-of-year) pair with arithmetic over a linear month index, so
// lag lookups (12 months back, 3 months back) are true calendar offsets and
// stay correct even when a series has gaps.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::AnalyticsError;

/// A single calendar month, the minimal time granularity of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedMonth")]
pub struct Month {
    year: i32,
    /// 1..=12
    month: u32,
}

/// Wire shape for deserialization. Conversion goes through `Month::new`, so
/// a config file cannot smuggle an out-of-range month past validation.
#[derive(Deserialize)]
struct UncheckedMonth {
    year: i32,
    month: u32,
}

impl TryFrom<UncheckedMonth> for Month {
    type Error = AnalyticsError;

    fn try_from(raw: UncheckedMonth) -> Result<Self, Self::Error> {
        Month::new(raw.year, raw.month)
    }
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, AnalyticsError> {
        if !(1..=12).contains(&month) {
            return Err(AnalyticsError::Configuration(format!(
                "month-of-year must be 1..=12, got {}",
                month
            )));
        }
        Ok(Month { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Quarter label in the dataset's tabular shape ("Q1".."Q4").
    pub fn quarter(&self) -> String {
        format!("Q{}", (self.month - 1) / 3 + 1)
    }

    /// Linear month index. Consecutive calendar months differ by exactly 1.
    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> Self {
        Month {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    /// The month exactly `n` calendar months earlier.
    pub fn months_back(&self, n: u32) -> Month {
        Month::from_index(self.index() - n as i64)
    }

    pub fn next(&self) -> Month {
        Month::from_index(self.index() + 1)
    }

    /// First day of the month, for interop with date-based consumers.
    pub fn first_day(&self) -> NaiveDate {
        // month is validated at construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Storage key, "YYYY-MM-01". Lexicographic order equals calendar order,
    /// which the store's BETWEEN filters rely on.
    pub fn storage_key(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month)
    }

    pub fn parse_storage_key(key: &str) -> Result<Self, AnalyticsError> {
        let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|e| {
            AnalyticsError::DataIntegrity(format!("malformed period '{}': {}", key, e))
        })?;
        Ok(Month::from_date(date))
    }

    /// Inclusive iterator from `start` to `end`.
    pub fn range(start: Month, end: Month) -> impl Iterator<Item = Month> {
        (start.index()..=end.index()).map(Month::from_index)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
