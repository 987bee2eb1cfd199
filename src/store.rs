// SQLite-backed record store
//
// Populated once from a derived batch, read-only afterwards. The table shape
// is the engine's persistence contract: stable column names
// (period, year, month, quarter, category, entity, count, yoy_growth,
// qoq_growth) that any tabular consumer can rely on.

use rusqlite::{params, Connection};
use std::path::Path;

use crate::config::Category;
use crate::errors::AnalyticsError;
use crate::growth::Record;
use crate::temporal::Month;

/// Filter for range + entity queries.
///
/// `None` means "no restriction". A present-but-empty set is a real filter
/// that matches nothing - explicitly deselecting every category yields zero
/// rows, which is different from not filtering at all. Unknown category or
/// manufacturer values simply match nothing; they are never an error.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Inclusive on both bounds.
    pub range: (Month, Month),
    pub categories: Option<Vec<Category>>,
    pub manufacturers: Option<Vec<String>>,
}

impl RecordFilter {
    pub fn range(start: Month, end: Month) -> Self {
        RecordFilter {
            range: (start, end),
            categories: None,
            manufacturers: None,
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn in_memory() -> Result<Self, AnalyticsError> {
        let conn = Connection::open_in_memory()?;
        setup_schema(&conn)?;
        Ok(Store { conn })
    }

    pub fn open(path: &Path) -> Result<Self, AnalyticsError> {
        let conn = Connection::open(path)?;
        // WAL mode for crash recovery on file-backed stores
        conn.pragma_update(None, "journal_mode", "WAL")?;
        setup_schema(&conn)?;
        Ok(Store { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Load the full derived batch in one transaction. Any duplicate
    /// (period, category, entity) aborts the load; no partial dataset is
    /// ever visible.
    pub fn load(&mut self, records: &[Record]) -> Result<usize, AnalyticsError> {
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO vehicle_registrations (
                    period, year, month, quarter, category, entity,
                    count, yoy_growth, qoq_growth
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for record in records {
                let result = stmt.execute(params![
                    record.period.storage_key(),
                    record.period.year(),
                    record.period.month(),
                    record.period.quarter(),
                    record.category.as_str(),
                    record.manufacturer,
                    record.count,
                    record.yoy_growth,
                    record.qoq_growth,
                ]);

                match result {
                    Ok(_) => {}
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        return Err(AnalyticsError::DataIntegrity(format!(
                            "duplicate record for {} / {} at {}",
                            record.category, record.manufacturer, record.period
                        )));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// Drop every record, so a file-backed store can be regenerated in
    /// place. The replacement batch still goes through `load` as a whole.
    pub fn clear(&mut self) -> Result<(), AnalyticsError> {
        self.conn.execute("DELETE FROM vehicle_registrations", [])?;
        Ok(())
    }

    /// Records matching the filter, ordered by period, category, entity.
    pub fn execute(&self, filter: &RecordFilter) -> Result<Vec<Record>, AnalyticsError> {
        let mut sql = String::from(
            "SELECT period, category, entity, count, yoy_growth, qoq_growth
             FROM vehicle_registrations
             WHERE period BETWEEN ?1 AND ?2",
        );
        let mut params: Vec<String> = vec![
            filter.range.0.storage_key(),
            filter.range.1.storage_key(),
        ];

        append_in_clause(
            &mut sql,
            &mut params,
            "category",
            filter
                .categories
                .as_ref()
                .map(|cats| cats.iter().map(|c| c.as_str().to_string()).collect()),
        );
        append_in_clause(&mut sql, &mut params, "entity", filter.manufacturers.clone());

        sql.push_str(" ORDER BY period, category, entity");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (period, category, manufacturer, count, yoy_growth, qoq_growth) in rows {
            records.push(Record {
                period: Month::parse_storage_key(&period)?,
                category: Category::parse(&category).ok_or_else(|| {
                    AnalyticsError::DataIntegrity(format!("unknown stored category '{}'", category))
                })?,
                manufacturer,
                count,
                yoy_growth,
                qoq_growth,
            });
        }

        Ok(records)
    }

    // ========================================================================
    // Dataset metadata
    // ========================================================================

    pub fn record_count(&self) -> Result<i64, AnalyticsError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM vehicle_registrations", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// The (min, max) period present, or None for an empty store.
    pub fn date_range(&self) -> Result<Option<(Month, Month)>, AnalyticsError> {
        let bounds: (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(period), MAX(period) FROM vehicle_registrations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match bounds {
            (Some(min), Some(max)) => Ok(Some((
                Month::parse_storage_key(&min)?,
                Month::parse_storage_key(&max)?,
            ))),
            _ => Ok(None),
        }
    }

    /// Distinct categories present, in category order.
    pub fn categories(&self) -> Result<Vec<Category>, AnalyticsError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM vehicle_registrations ORDER BY category")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        // SQL order '2W' < '3W' < '4W' already matches the enum order
        let mut categories: Vec<Category> = Vec::with_capacity(names.len());
        for name in names {
            categories.push(Category::parse(&name).ok_or_else(|| {
                AnalyticsError::DataIntegrity(format!("unknown stored category '{}'", name))
            })?);
        }
        Ok(categories)
    }

    /// Distinct manufacturer names, optionally restricted to one category.
    pub fn manufacturers(&self, category: Option<Category>) -> Result<Vec<String>, AnalyticsError> {
        let names = match category {
            Some(category) => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT entity FROM vehicle_registrations
                     WHERE category = ?1 ORDER BY entity",
                )?;
                let rows = stmt
                    .query_map([category.as_str()], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT entity FROM vehicle_registrations ORDER BY entity",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(names)
    }
}

fn setup_schema(conn: &Connection) -> Result<(), AnalyticsError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicle_registrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            period TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            quarter TEXT NOT NULL,
            category TEXT NOT NULL,
            entity TEXT NOT NULL,
            count INTEGER NOT NULL CHECK (count >= 0),
            yoy_growth REAL,
            qoq_growth REAL,
            UNIQUE (period, category, entity)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_period ON vehicle_registrations(period)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_category ON vehicle_registrations(category)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entity ON vehicle_registrations(entity)",
        [],
    )?;

    Ok(())
}

/// Append `AND column IN (...)` for a present filter set. A present-but-empty
/// set becomes a contradiction, so it matches nothing (SQLite has no empty
/// IN list).
pub(crate) fn append_in_clause(
    sql: &mut String,
    params: &mut Vec<String>,
    column: &str,
    values: Option<Vec<String>>,
) {
    let Some(values) = values else { return };

    if values.is_empty() {
        sql.push_str(" AND 1 = 0");
        return;
    }

    let placeholders: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", params.len() + i + 1))
        .collect();
    sql.push_str(&format!(" AND {} IN ({})", column, placeholders.join(", ")));
    params.extend(values);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, month: u32, category: Category, manufacturer: &str, count: i64) -> Record {
        Record {
            period: Month::new(year, month).unwrap(),
            category,
            manufacturer: manufacturer.to_string(),
            count,
            yoy_growth: None,
            qoq_growth: Some(5.0),
        }
    }

    fn loaded_store() -> Store {
        let mut store = Store::in_memory().unwrap();
        store
            .load(&[
                record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 100),
                record(2022, 1, Category::TwoWheeler, "Honda", 80),
                record(2022, 1, Category::FourWheeler, "Tata", 40),
                record(2022, 2, Category::TwoWheeler, "Hero MotoCorp", 110),
                record(2022, 3, Category::TwoWheeler, "Hero MotoCorp", 120),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_load_and_count() {
        let store = loaded_store();
        assert_eq!(store.record_count().unwrap(), 5);
    }

    #[test]
    fn test_duplicate_load_fails_whole_batch() {
        let mut store = Store::in_memory().unwrap();
        let err = store
            .load(&[
                record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 100),
                record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 200),
            ])
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::DataIntegrity(_)));
        // transaction rolled back: nothing visible
        assert_eq!(store.record_count().unwrap(), 0);
    }

    #[test]
    fn test_clear_allows_regeneration() {
        let mut store = loaded_store();
        assert_eq!(store.record_count().unwrap(), 5);

        // reloading the same batch over existing rows would be a duplicate
        store.clear().unwrap();
        assert_eq!(store.record_count().unwrap(), 0);

        store
            .load(&[record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 100)])
            .unwrap();
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_filter_composition_is_and() {
        let store = loaded_store();
        let jan = Month::new(2022, 1).unwrap();
        let filter = RecordFilter {
            range: (jan, jan),
            categories: Some(vec![Category::TwoWheeler]),
            manufacturers: Some(vec!["Hero MotoCorp".to_string()]),
        };
        let records = store.execute(&filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].manufacturer, "Hero MotoCorp");
        assert_eq!(records[0].count, 100);
    }

    #[test]
    fn test_range_is_inclusive_both_ends() {
        let store = loaded_store();
        let filter = RecordFilter::range(
            Month::new(2022, 1).unwrap(),
            Month::new(2022, 3).unwrap(),
        );
        assert_eq!(store.execute(&filter).unwrap().len(), 5);

        let narrow = RecordFilter::range(
            Month::new(2022, 2).unwrap(),
            Month::new(2022, 3).unwrap(),
        );
        assert_eq!(store.execute(&narrow).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_filter_set_matches_nothing() {
        let store = loaded_store();
        let mut filter = RecordFilter::range(
            Month::new(2022, 1).unwrap(),
            Month::new(2022, 3).unwrap(),
        );
        filter.categories = Some(vec![]);
        assert!(store.execute(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_manufacturer_matches_nothing() {
        let store = loaded_store();
        let mut filter = RecordFilter::range(
            Month::new(2022, 1).unwrap(),
            Month::new(2022, 3).unwrap(),
        );
        filter.manufacturers = Some(vec!["Nonexistent Motors".to_string()]);
        assert!(store.execute(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_growth_fields_survive_roundtrip() {
        let store = loaded_store();
        let filter = RecordFilter::range(
            Month::new(2022, 1).unwrap(),
            Month::new(2022, 1).unwrap(),
        );
        let records = store.execute(&filter).unwrap();
        assert!(records.iter().all(|r| r.yoy_growth.is_none()));
        assert!(records.iter().all(|r| r.qoq_growth == Some(5.0)));
    }

    #[test]
    fn test_metadata_helpers() {
        let store = loaded_store();
        let (min, max) = store.date_range().unwrap().unwrap();
        assert_eq!(min, Month::new(2022, 1).unwrap());
        assert_eq!(max, Month::new(2022, 3).unwrap());

        assert_eq!(
            store.categories().unwrap(),
            vec![Category::TwoWheeler, Category::FourWheeler]
        );

        let two_wheeler = store.manufacturers(Some(Category::TwoWheeler)).unwrap();
        assert_eq!(two_wheeler, vec!["Hero MotoCorp", "Honda"]);
        assert_eq!(store.manufacturers(None).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_store_date_range() {
        let store = Store::in_memory().unwrap();
        assert!(store.date_range().unwrap().is_none());
    }
}
