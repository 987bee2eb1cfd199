// Synthetic registration series generator
//
// Produces one raw record per period x category x roster manufacturer:
//
//   count = round(base_volume * weight * seasonal * growth * shock * noise)
//
// All factors are positive, so counts are non-negative; the product is still
// clamped at zero before rounding to keep pathological configs safe.
//
// Reproducibility: a single RNG stream seeded from the config, consumed in a
// fixed iteration order (months ascending, then roster order). Equal config
// and seed give byte-identical output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{Category, GeneratorConfig};
use crate::errors::AnalyticsError;
use crate::temporal::Month;

/// A registration count before growth metrics are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub period: Month,
    pub category: Category,
    pub manufacturer: String,
    pub count: i64,
}

pub struct SeriesGenerator {
    config: GeneratorConfig,
}

impl SeriesGenerator {
    /// Validates the config up front; an invalid config never produces a
    /// partial dataset.
    pub fn new(config: GeneratorConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(SeriesGenerator { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the full series. Callers must not rely on output ordering.
    pub fn generate(&self) -> Result<Vec<RawRecord>, AnalyticsError> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let (noise_low, noise_high) = config.noise_band;

        let mut records = Vec::new();

        for period in Month::range(config.start, config.end) {
            let seasonal = config.seasonal_factor(&period);
            let growth = config.growth_factor(&period);
            let shock = config.shock_factor(&period);

            for category_roster in &config.roster {
                let category = category_roster.category;
                // validate() guarantees presence
                let base_volume = config.base_volumes[&category];

                for entry in &category_roster.entries {
                    let noise: f64 = rng.gen_range(noise_low..=noise_high);
                    let value =
                        base_volume * entry.weight * seasonal * growth * shock * noise;
                    let count = value.max(0.0).round() as i64;

                    records.push(RawRecord {
                        period,
                        category,
                        manufacturer: entry.manufacturer.clone(),
                        count,
                    });
                }
            }
        }

        Ok(records)
    }
}
