// CSV backup of the enriched dataset
//
// Same tabular shape as the store (period, year, month, quarter, category,
// entity, count, yoy_growth, qoq_growth). Absent growth values are written
// as empty cells, preserving the absent-vs-zero distinction.

use std::path::Path;

use crate::errors::AnalyticsError;
use crate::growth::Record;

const HEADERS: [&str; 9] = [
    "period",
    "year",
    "month",
    "quarter",
    "category",
    "entity",
    "count",
    "yoy_growth",
    "qoq_growth",
];

fn growth_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

pub fn write_csv(path: &Path, records: &[Record]) -> Result<(), AnalyticsError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;

    for record in records {
        writer.write_record([
            record.period.storage_key(),
            record.period.year().to_string(),
            record.period.month().to_string(),
            record.period.quarter(),
            record.category.as_str().to_string(),
            record.manufacturer.clone(),
            record.count.to_string(),
            growth_cell(record.yoy_growth),
            growth_cell(record.qoq_growth),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
