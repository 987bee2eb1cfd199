// Generation configuration - config as data
//
// The whole synthetic-dataset shape (date span, roster, weights, seasonal
// multipliers, shock windows, noise band, seed) lives in one serializable
// struct, so a config file fully determines the dataset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::errors::AnalyticsError;
use crate::temporal::Month;

/// Tolerance when checking that a category's roster weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// VEHICLE CATEGORY
// ============================================================================

/// Vehicle class. The dataset's category axis is this fixed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "2W")]
    TwoWheeler,
    #[serde(rename = "3W")]
    ThreeWheeler,
    #[serde(rename = "4W")]
    FourWheeler,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::TwoWheeler,
        Category::ThreeWheeler,
        Category::FourWheeler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TwoWheeler => "2W",
            Category::ThreeWheeler => "3W",
            Category::FourWheeler => "4W",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "2W" => Some(Category::TwoWheeler),
            "3W" => Some(Category::ThreeWheeler),
            "4W" => Some(Category::FourWheeler),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ROSTER
// ============================================================================

/// One manufacturer and its base market-share weight within a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub manufacturer: String,
    pub weight: f64,
}

/// Ordered manufacturers per category. A manufacturer name is scoped to its
/// category; the same name may recur across categories (e.g. Bajaj in both
/// 2W and 3W) and is treated as two distinct series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRoster {
    pub category: Category,
    pub entries: Vec<RosterEntry>,
}

impl CategoryRoster {
    pub fn new(category: Category, entries: Vec<(&str, f64)>) -> Self {
        CategoryRoster {
            category,
            entries: entries
                .into_iter()
                .map(|(name, weight)| RosterEntry {
                    manufacturer: name.to_string(),
                    weight,
                })
                .collect(),
        }
    }
}

/// A shock window: a multiplicative demand adjustment over an inclusive
/// month range. Models one-time exogenous events (e.g. a lockdown collapse
/// followed by a partial-recovery period).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShockWindow {
    pub start: Month,
    pub end: Month,
    pub multiplier: f64,
}

// ============================================================================
// GENERATOR CONFIG
// ============================================================================

/// Everything the series generator needs. Equal configs with equal seeds
/// produce byte-identical datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub start: Month,
    pub end: Month,
    pub roster: Vec<CategoryRoster>,
    /// Base monthly registration volume per category, before any factor.
    pub base_volumes: HashMap<Category, f64>,
    /// Secular market expansion, compounded per year of the horizon.
    pub annual_growth_rate: f64,
    /// Month-of-year (1..=12) to multiplier; months not listed use 1.0.
    pub seasonal_table: HashMap<u32, f64>,
    pub shock_windows: Vec<ShockWindow>,
    /// Uniform noise band (low, high), applied per record.
    pub noise_band: (f64, f64),
    pub random_seed: u64,
}

impl Default for GeneratorConfig {
    /// The reference dataset: Jan 2020 through Dec 2024, the Indian 2W/3W/4W
    /// market roster, 8% secular growth, festival/monsoon seasonality, and
    /// the 2020 lockdown shock with gradual 2021 recovery.
    fn default() -> Self {
        let roster = vec![
            CategoryRoster::new(
                Category::TwoWheeler,
                vec![
                    ("Hero MotoCorp", 0.35),
                    ("Honda", 0.25),
                    ("TVS", 0.15),
                    ("Bajaj", 0.12),
                    ("Yamaha", 0.08),
                    ("Royal Enfield", 0.05),
                ],
            ),
            CategoryRoster::new(
                Category::ThreeWheeler,
                vec![
                    ("Bajaj", 0.45),
                    ("Mahindra", 0.25),
                    ("TVS", 0.15),
                    ("Piaggio", 0.10),
                    ("Atul Auto", 0.05),
                ],
            ),
            CategoryRoster::new(
                Category::FourWheeler,
                vec![
                    ("Maruti Suzuki", 0.40),
                    ("Hyundai", 0.18),
                    ("Tata", 0.12),
                    ("Mahindra", 0.10),
                    ("Kia", 0.08),
                    ("Toyota", 0.07),
                    ("MG Motor", 0.05),
                ],
            ),
        ];

        let base_volumes = HashMap::from([
            (Category::TwoWheeler, 1_200_000.0),
            (Category::ThreeWheeler, 25_000.0),
            (Category::FourWheeler, 280_000.0),
        ]);

        // Oct/Nov festival season, Mar/Apr fiscal year-end, Jul/Aug monsoon.
        let seasonal_table = HashMap::from([
            (10, 1.3),
            (11, 1.3),
            (3, 1.1),
            (4, 1.1),
            (7, 0.8),
            (8, 0.8),
        ]);

        let month = |y, m| Month::new(y, m).unwrap();

        GeneratorConfig {
            start: month(2020, 1),
            end: month(2024, 12),
            roster,
            base_volumes,
            annual_growth_rate: 0.08,
            seasonal_table,
            shock_windows: vec![
                ShockWindow {
                    start: month(2020, 3),
                    end: month(2020, 12),
                    multiplier: 0.6,
                },
                ShockWindow {
                    start: month(2021, 1),
                    end: month(2021, 6),
                    multiplier: 0.75,
                },
            ],
            noise_band: (0.85, 1.15),
            random_seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, AnalyticsError> {
        let raw = fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&raw).map_err(|e| {
            AnalyticsError::Configuration(format!("malformed config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every structural invariant the generator relies on.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.end < self.start {
            return Err(AnalyticsError::Configuration(format!(
                "date range is inverted: {} > {}",
                self.start, self.end
            )));
        }

        if self.roster.is_empty() {
            return Err(AnalyticsError::Configuration(
                "roster is empty, no records can be produced".to_string(),
            ));
        }

        for category_roster in &self.roster {
            let category = category_roster.category;

            if category_roster.entries.is_empty() {
                return Err(AnalyticsError::Configuration(format!(
                    "category {} has no manufacturers",
                    category
                )));
            }

            let weight_sum: f64 = category_roster.entries.iter().map(|e| e.weight).sum();
            if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(AnalyticsError::Configuration(format!(
                    "category {} weights sum to {} instead of 1.0",
                    category, weight_sum
                )));
            }

            for entry in &category_roster.entries {
                if entry.weight <= 0.0 {
                    return Err(AnalyticsError::Configuration(format!(
                        "{} ({}) has non-positive weight {}",
                        entry.manufacturer, category, entry.weight
                    )));
                }
            }

            match self.base_volumes.get(&category) {
                Some(volume) if *volume > 0.0 => {}
                Some(volume) => {
                    return Err(AnalyticsError::Configuration(format!(
                        "category {} has non-positive base volume {}",
                        category, volume
                    )))
                }
                None => {
                    return Err(AnalyticsError::Configuration(format!(
                        "category {} has no base volume",
                        category
                    )))
                }
            }
        }

        let (low, high) = self.noise_band;
        if low <= 0.0 || low > high {
            return Err(AnalyticsError::Configuration(format!(
                "noise band ({}, {}) is invalid: low must be positive and <= high",
                low, high
            )));
        }

        for (month, multiplier) in &self.seasonal_table {
            if !(1..=12).contains(month) || *multiplier <= 0.0 {
                return Err(AnalyticsError::Configuration(format!(
                    "seasonal entry {} -> {} is invalid",
                    month, multiplier
                )));
            }
        }

        for window in &self.shock_windows {
            if window.end < window.start || window.multiplier <= 0.0 {
                return Err(AnalyticsError::Configuration(format!(
                    "shock window {}..{} x{} is invalid",
                    window.start, window.end, window.multiplier
                )));
            }
        }

        Ok(())
    }

    /// Seasonal multiplier for a month; 1.0 when the table has no entry.
    pub fn seasonal_factor(&self, month: &Month) -> f64 {
        self.seasonal_table.get(&month.month()).copied().unwrap_or(1.0)
    }

    /// Product of all shock multipliers whose window contains the month.
    pub fn shock_factor(&self, month: &Month) -> f64 {
        self.shock_windows
            .iter()
            .filter(|w| w.start <= *month && *month <= w.end)
            .map(|w| w.multiplier)
            .product()
    }

    /// Compounding secular growth relative to the horizon start year.
    pub fn growth_factor(&self, month: &Month) -> f64 {
        let years = (month.year() - self.start.year()) as f64;
        (1.0 + self.annual_growth_rate).powf(years)
    }
}
