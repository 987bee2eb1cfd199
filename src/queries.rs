// Analytical query facade
//
// The fixed set of named aggregation queries a presentation layer may depend
// on. Every computation here defines the dataset's ground truth: grouping,
// ordering, and share normalization must not be re-derived by consumers.
//
// Growth averages lean on SQL AVG semantics: NULL (absent) values are
// excluded from both numerator and denominator, never coerced to zero.

use rusqlite::params;
use serde::Serialize;

use crate::config::Category;
use crate::errors::AnalyticsError;
use crate::store::{append_in_clause, RecordFilter, Store};
use crate::temporal::Month;

/// Minimum in-range volume for the growth leaderboard. Groups at or below
/// this floor are statistically noisy and would distort the ranking.
pub const GROWTH_LEADERS_MIN_VOLUME: i64 = 1000;

/// Leaderboard length.
pub const GROWTH_LEADERS_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMetric {
    Yoy,
    Qoq,
}

impl GrowthMetric {
    fn column(&self) -> &'static str {
        match self {
            GrowthMetric::Yoy => "yoy_growth",
            GrowthMetric::Qoq => "qoq_growth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub total_count: i64,
    /// Mean over non-absent values; None when the range has none.
    pub avg_yoy: Option<f64>,
    pub avg_qoq: Option<f64>,
    pub manufacturer_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManufacturerSummary {
    pub manufacturer: String,
    pub category: Category,
    pub total_count: i64,
    pub avg_yoy: Option<f64>,
    pub avg_qoq: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: Month,
    pub category: Category,
    pub manufacturer: String,
    pub count: i64,
    pub yoy_growth: Option<f64>,
    pub qoq_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthLeader {
    pub manufacturer: String,
    pub category: Category,
    pub avg_growth: f64,
    pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShareRow {
    pub manufacturer: String,
    pub total_count: i64,
    /// Percent of the category-wide total over the same range, 2 decimals.
    pub share: f64,
}

/// Typed analytical queries over a loaded store.
pub struct Analytics<'a> {
    store: &'a Store,
}

impl<'a> Analytics<'a> {
    pub fn new(store: &'a Store) -> Self {
        Analytics { store }
    }

    /// Per-category totals and mean growth, largest categories first.
    /// Categories with no matching records are omitted.
    pub fn category_summary(
        &self,
        range: (Month, Month),
    ) -> Result<Vec<CategorySummary>, AnalyticsError> {
        let mut stmt = self.store.conn().prepare(
            "SELECT
                category,
                SUM(count) AS total_count,
                AVG(yoy_growth) AS avg_yoy,
                AVG(qoq_growth) AS avg_qoq,
                COUNT(DISTINCT entity) AS manufacturer_count
             FROM vehicle_registrations
             WHERE period BETWEEN ?1 AND ?2
             GROUP BY category
             ORDER BY total_count DESC",
        )?;

        let rows = stmt
            .query_map(
                params![range.0.storage_key(), range.1.storage_key()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(category, total_count, avg_yoy, avg_qoq, manufacturer_count)| {
                Ok(CategorySummary {
                    category: parse_category(&category)?,
                    total_count,
                    avg_yoy,
                    avg_qoq,
                    manufacturer_count,
                })
            })
            .collect()
    }

    /// Per-(manufacturer, category) totals and mean growth, optionally
    /// restricted to one category, largest totals first.
    pub fn manufacturer_summary(
        &self,
        range: (Month, Month),
        category: Option<Category>,
    ) -> Result<Vec<ManufacturerSummary>, AnalyticsError> {
        let mut sql = String::from(
            "SELECT
                entity,
                category,
                SUM(count) AS total_count,
                AVG(yoy_growth) AS avg_yoy,
                AVG(qoq_growth) AS avg_qoq
             FROM vehicle_registrations
             WHERE period BETWEEN ?1 AND ?2",
        );
        let mut params: Vec<String> = vec![range.0.storage_key(), range.1.storage_key()];

        if let Some(category) = category {
            sql.push_str(" AND category = ?3");
            params.push(category.as_str().to_string());
        }

        sql.push_str(
            " GROUP BY entity, category
              ORDER BY total_count DESC",
        );

        let mut stmt = self.store.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(manufacturer, category, total_count, avg_yoy, avg_qoq)| {
                Ok(ManufacturerSummary {
                    manufacturer,
                    category: parse_category(&category)?,
                    total_count,
                    avg_yoy,
                    avg_qoq,
                })
            })
            .collect()
    }

    /// Monthly series per (period, category, manufacturer), ordered by
    /// period ascending, then category, then manufacturer. The filter's
    /// category/manufacturer sets narrow the series the same way
    /// `Store::execute` does.
    pub fn monthly_trends(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<TrendPoint>, AnalyticsError> {
        let mut sql = String::from(
            "SELECT
                period,
                category,
                entity,
                SUM(count) AS count,
                AVG(yoy_growth) AS yoy_growth,
                AVG(qoq_growth) AS qoq_growth
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

        sql.push_str(
            " GROUP BY period, category, entity
              ORDER BY period, category, entity",
        );

        let mut stmt = self.store.conn().prepare(&sql)?;
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

        rows.into_iter()
            .map(|(period, category, manufacturer, count, yoy_growth, qoq_growth)| {
                Ok(TrendPoint {
                    period: Month::parse_storage_key(&period)?,
                    category: parse_category(&category)?,
                    manufacturer,
                    count,
                    yoy_growth,
                    qoq_growth,
                })
            })
            .collect()
    }

    /// Top growth performers by mean metric over non-absent values.
    ///
    /// Groups whose in-range volume is at or below
    /// `GROWTH_LEADERS_MIN_VOLUME` are dropped, however high their growth;
    /// groups with no non-absent metric values never appear (the mean of an
    /// empty set is undefined, not zero).
    pub fn growth_leaders(
        &self,
        range: (Month, Month),
        metric: GrowthMetric,
    ) -> Result<Vec<GrowthLeader>, AnalyticsError> {
        // metric.column() is a fixed identifier, not user input
        let sql = format!(
            "SELECT
                entity,
                category,
                AVG({metric}) AS avg_growth,
                SUM(count) AS total_count
             FROM vehicle_registrations
             WHERE period BETWEEN ?1 AND ?2
               AND {metric} IS NOT NULL
             GROUP BY entity, category
             HAVING total_count > ?3
             ORDER BY avg_growth DESC
             LIMIT ?4",
            metric = metric.column(),
        );

        let mut stmt = self.store.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    range.0.storage_key(),
                    range.1.storage_key(),
                    GROWTH_LEADERS_MIN_VOLUME,
                    GROWTH_LEADERS_LIMIT,
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(manufacturer, category, avg_growth, total_count)| {
                Ok(GrowthLeader {
                    manufacturer,
                    category: parse_category(&category)?,
                    avg_growth,
                    total_count,
                })
            })
            .collect()
    }

    /// Market share within one category. Every row's denominator is the
    /// same category-wide total for the range, so shares sum to ~100 (up to
    /// independent per-row rounding).
    pub fn market_share(
        &self,
        range: (Month, Month),
        category: Category,
    ) -> Result<Vec<MarketShareRow>, AnalyticsError> {
        let mut stmt = self.store.conn().prepare(
            "SELECT
                entity,
                SUM(count) AS total_count,
                ROUND(SUM(count) * 100.0 /
                      (SELECT SUM(count)
                       FROM vehicle_registrations
                       WHERE period BETWEEN ?1 AND ?2
                         AND category = ?3), 2) AS share
             FROM vehicle_registrations
             WHERE period BETWEEN ?1 AND ?2
               AND category = ?3
             GROUP BY entity
             ORDER BY total_count DESC",
        )?;

        let rows = stmt
            .query_map(
                params![
                    range.0.storage_key(),
                    range.1.storage_key(),
                    category.as_str(),
                ],
                |row| {
                    Ok(MarketShareRow {
                        manufacturer: row.get(0)?,
                        total_count: row.get(1)?,
                        // NULL share only when the whole category total is 0
                        share: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

fn parse_category(name: &str) -> Result<Category, AnalyticsError> {
    Category::parse(name)
        .ok_or_else(|| AnalyticsError::DataIntegrity(format!("unknown stored category '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::Record;

    fn record(
        year: i32,
        month: u32,
        category: Category,
        manufacturer: &str,
        count: i64,
        yoy: Option<f64>,
        qoq: Option<f64>,
    ) -> Record {
        Record {
            period: Month::new(year, month).unwrap(),
            category,
            manufacturer: manufacturer.to_string(),
            count,
            yoy_growth: yoy,
            qoq_growth: qoq,
        }
    }

    fn full_range() -> (Month, Month) {
        (Month::new(2022, 1).unwrap(), Month::new(2022, 12).unwrap())
    }

    fn loaded_store() -> Store {
        let mut store = Store::in_memory().unwrap();
        store
            .load(&[
                // 2W: two manufacturers, mixed growth availability
                record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 5000, None, None),
                record(2022, 2, Category::TwoWheeler, "Hero MotoCorp", 6000, Some(20.0), Some(10.0)),
                record(2022, 1, Category::TwoWheeler, "Honda", 3000, Some(40.0), None),
                record(2022, 2, Category::TwoWheeler, "Honda", 1000, Some(60.0), Some(-5.0)),
                // 4W: one manufacturer
                record(2022, 1, Category::FourWheeler, "Tata", 2000, Some(5.0), Some(2.0)),
                // 3W: tiny volume, huge growth - must never lead the board
                record(2022, 1, Category::ThreeWheeler, "Atul Auto", 400, Some(900.0), Some(900.0)),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_category_summary_ordering_and_aggregates() {
        let store = loaded_store();
        let summary = Analytics::new(&store).category_summary(full_range()).unwrap();

        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].category, Category::TwoWheeler);
        assert_eq!(summary[0].total_count, 15000);
        assert_eq!(summary[0].manufacturer_count, 2);
        assert_eq!(summary[1].category, Category::FourWheeler);
        assert_eq!(summary[2].category, Category::ThreeWheeler);

        // mean over non-absent yoy values only: (20 + 40 + 60) / 3
        assert_eq!(summary[0].avg_yoy, Some(40.0));
        // mean over non-absent qoq values only: (10 - 5) / 2
        assert_eq!(summary[0].avg_qoq, Some(2.5));
    }

    #[test]
    fn test_category_summary_absent_growth_stays_absent() {
        let mut store = Store::in_memory().unwrap();
        store
            .load(&[record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 100, None, None)])
            .unwrap();
        let summary = Analytics::new(&store).category_summary(full_range()).unwrap();
        assert_eq!(summary[0].avg_yoy, None);
        assert_eq!(summary[0].avg_qoq, None);
    }

    #[test]
    fn test_category_summary_omits_out_of_range() {
        let store = loaded_store();
        let range = (Month::new(2023, 1).unwrap(), Month::new(2023, 12).unwrap());
        assert!(Analytics::new(&store).category_summary(range).unwrap().is_empty());
    }

    #[test]
    fn test_manufacturer_summary_with_category_filter() {
        let store = loaded_store();
        let analytics = Analytics::new(&store);

        let all = analytics.manufacturer_summary(full_range(), None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].manufacturer, "Hero MotoCorp");
        assert_eq!(all[0].total_count, 11000);

        let two_wheeler = analytics
            .manufacturer_summary(full_range(), Some(Category::TwoWheeler))
            .unwrap();
        assert_eq!(two_wheeler.len(), 2);
        assert!(two_wheeler.iter().all(|s| s.category == Category::TwoWheeler));
    }

    #[test]
    fn test_monthly_trends_ordering() {
        let store = loaded_store();
        let filter = RecordFilter::range(full_range().0, full_range().1);
        let trends = Analytics::new(&store).monthly_trends(&filter).unwrap();

        assert_eq!(trends.len(), 6);
        // period ascending, then category, then manufacturer
        let mut sorted = trends.clone();
        sorted.sort_by(|a, b| {
            (a.period, a.category, &a.manufacturer).cmp(&(b.period, b.category, &b.manufacturer))
        });
        assert_eq!(trends, sorted);
        assert_eq!(trends[0].period, Month::new(2022, 1).unwrap());
    }

    #[test]
    fn test_monthly_trends_respects_filters() {
        let store = loaded_store();
        let mut filter = RecordFilter::range(full_range().0, full_range().1);
        filter.categories = Some(vec![Category::TwoWheeler]);
        filter.manufacturers = Some(vec!["Honda".to_string()]);

        let trends = Analytics::new(&store).monthly_trends(&filter).unwrap();
        assert_eq!(trends.len(), 2);
        assert!(trends.iter().all(|t| t.manufacturer == "Honda"));
    }

    #[test]
    fn test_growth_leaders_volume_floor() {
        let store = loaded_store();
        let leaders = Analytics::new(&store)
            .growth_leaders(full_range(), GrowthMetric::Yoy)
            .unwrap();

        // Atul Auto has the highest growth but only 400 units in range
        assert!(leaders.iter().all(|l| l.manufacturer != "Atul Auto"));
        assert!(leaders.iter().all(|l| l.total_count > GROWTH_LEADERS_MIN_VOLUME));

        // Honda leads: (40 + 60) / 2 = 50
        assert_eq!(leaders[0].manufacturer, "Honda");
        assert_eq!(leaders[0].avg_growth, 50.0);
    }

    #[test]
    fn test_growth_leaders_exclude_all_absent_groups() {
        let mut store = Store::in_memory().unwrap();
        store
            .load(&[
                record(2022, 1, Category::TwoWheeler, "Hero MotoCorp", 9000, None, None),
                record(2022, 1, Category::TwoWheeler, "Honda", 8000, Some(12.0), None),
            ])
            .unwrap();
        let leaders = Analytics::new(&store)
            .growth_leaders(full_range(), GrowthMetric::Yoy)
            .unwrap();
        // Hero has volume but no yoy values at all: excluded, not zero
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].manufacturer, "Honda");
    }

    #[test]
    fn test_market_share_sums_to_100_with_shared_denominator() {
        let store = loaded_store();
        let shares = Analytics::new(&store)
            .market_share(full_range(), Category::TwoWheeler)
            .unwrap();

        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].manufacturer, "Hero MotoCorp");
        // 11000 / 15000 and 4000 / 15000
        assert_eq!(shares[0].share, 73.33);
        assert_eq!(shares[1].share, 26.67);

        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert!((sum - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_market_share_empty_category() {
        let store = loaded_store();
        let range = (Month::new(2023, 1).unwrap(), Month::new(2023, 12).unwrap());
        let shares = Analytics::new(&store)
            .market_share(range, Category::TwoWheeler)
            .unwrap();
        assert!(shares.is_empty());
    }

    #[test]
    fn test_idempotent_load_identical_results() {
        use crate::config::GeneratorConfig;
        use crate::generator::SeriesGenerator;
        use crate::growth::derive_growth;

        let mut config = GeneratorConfig::default();
        config.end = Month::new(2021, 12).unwrap();
        let raw = SeriesGenerator::new(config).unwrap().generate().unwrap();
        let records = derive_growth(&raw).unwrap();

        let mut store_a = Store::in_memory().unwrap();
        let mut store_b = Store::in_memory().unwrap();
        store_a.load(&records).unwrap();
        store_b.load(&records).unwrap();

        let range = (Month::new(2020, 1).unwrap(), Month::new(2021, 12).unwrap());
        let a = Analytics::new(&store_a);
        let b = Analytics::new(&store_b);

        assert_eq!(a.category_summary(range).unwrap(), b.category_summary(range).unwrap());
        assert_eq!(
            a.manufacturer_summary(range, None).unwrap(),
            b.manufacturer_summary(range, None).unwrap()
        );
        let filter = RecordFilter::range(range.0, range.1);
        assert_eq!(a.monthly_trends(&filter).unwrap(), b.monthly_trends(&filter).unwrap());
        assert_eq!(
            a.growth_leaders(range, GrowthMetric::Qoq).unwrap(),
            b.growth_leaders(range, GrowthMetric::Qoq).unwrap()
        );
        assert_eq!(
            a.market_share(range, Category::FourWheeler).unwrap(),
            b.market_share(range, Category::FourWheeler).unwrap()
        );
    }
}
