use std::io;

use thiserror::Error;

/// Error taxonomy for generation, derivation, and store operations.
///
/// Generation and derivation errors are fatal to the batch: no partial
/// dataset is ever loaded. Query-side problems that amount to "this filter
/// matches nothing" (an unknown manufacturer name, a category with no rows)
/// are NOT errors — they yield empty result sets by design.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Invalid generation parameters: empty roster, inverted date range,
    /// non-positive base volume, weights not summing to 1.0, bad noise band.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The dataset violated a structural invariant, e.g. a duplicate
    /// (period, category, manufacturer) record.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
