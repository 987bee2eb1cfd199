// Vahan Insights - Core Library
// Synthetic vehicle-registration series, growth derivation, and the
// analytical query layer. Presentation (charts, dashboards) lives outside
// this crate and consumes the Analytics facade only.

pub mod config;
pub mod errors;
pub mod export;
pub mod generator;
pub mod growth;
pub mod queries;
pub mod store;
pub mod temporal;

// Re-export commonly used types
pub use config::{Category, CategoryRoster, GeneratorConfig, RosterEntry, ShockWindow};
pub use errors::AnalyticsError;
pub use export::write_csv;
pub use generator::{RawRecord, SeriesGenerator};
pub use growth::{derive_growth, Record, QOQ_LAG_MONTHS, YOY_LAG_MONTHS};
pub use queries::{
    Analytics, CategorySummary, GrowthLeader, GrowthMetric, ManufacturerSummary, MarketShareRow,
    TrendPoint, GROWTH_LEADERS_LIMIT, GROWTH_LEADERS_MIN_VOLUME,
};
pub use store::{RecordFilter, Store};
pub use temporal::Month;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
