// Growth-metric derivation
//
// Enriches raw counts with year-over-year and quarter-over-quarter percent
// change. Comparison values are looked up by exact calendar offset (period
// minus 12 / 3 months) within the (category, manufacturer) partition, never
// by row position, so series with missing months stay correct.
//
// Absence semantics: a growth field is None when no record exists at the
// offset, or when the comparison count is zero. None means "insufficient
// history", which downstream averages must exclude - it is never 0%.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Category;
use crate::errors::AnalyticsError;
use crate::generator::RawRecord;
use crate::temporal::Month;

pub const YOY_LAG_MONTHS: u32 = 12;
pub const QOQ_LAG_MONTHS: u32 = 3;

/// One enriched registration record, the unit the whole engine aggregates.
/// Unique per (period, category, manufacturer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub period: Month,
    pub category: Category,
    pub manufacturer: String,
    pub count: i64,
    /// Percent change vs. 12 months earlier, rounded to 2 decimals.
    pub yoy_growth: Option<f64>,
    /// Percent change vs. 3 months earlier, rounded to 2 decimals.
    pub qoq_growth: Option<f64>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent_change(series: &BTreeMap<Month, i64>, period: Month, lag: u32, current: i64) -> Option<f64> {
    let previous = *series.get(&period.months_back(lag))?;
    if previous == 0 {
        // zero denominator: undefined, not infinite
        return None;
    }
    Some(round2((current - previous) as f64 / previous as f64 * 100.0))
}

/// Derive growth metrics for every raw record.
///
/// Partitions strictly by (category, manufacturer); growth is never computed
/// across partitions. A duplicate (period, category, manufacturer) in the
/// input is a data-integrity failure for the whole batch.
pub fn derive_growth(raw: &[RawRecord]) -> Result<Vec<Record>, AnalyticsError> {
    let mut partitions: BTreeMap<(Category, &str), BTreeMap<Month, i64>> = BTreeMap::new();

    for record in raw {
        let series = partitions
            .entry((record.category, record.manufacturer.as_str()))
            .or_default();
        if series.insert(record.period, record.count).is_some() {
            return Err(AnalyticsError::DataIntegrity(format!(
                "duplicate record for {} / {} at {}",
                record.category, record.manufacturer, record.period
            )));
        }
    }

    let mut enriched = Vec::with_capacity(raw.len());

    for ((category, manufacturer), series) in &partitions {
        for (&period, &count) in series {
            enriched.push(Record {
                period,
                category: *category,
                manufacturer: manufacturer.to_string(),
                count,
                yoy_growth: percent_change(series, period, YOY_LAG_MONTHS, count),
                qoq_growth: percent_change(series, period, QOQ_LAG_MONTHS, count),
            });
        }
    }

    Ok(enriched)
}
