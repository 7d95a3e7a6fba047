//! # Scale Reader
//!
//! Wraps a [`WeightSensor`] with the configured freshness window. Stale
//! readings are discarded here and logged, so terminals only ever see a
//! weight that is safe to price.
//!
//! ```text
//!   sensor.read() ──► None                    → None  (debug!)
//!                 └─► Some(reading)
//!                       check_fresh(now, window)
//!                       ├── Ok(weight)        → Some(weight)
//!                       └── Err(StaleReading) → None  (warn!)
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use caixa_core::{CoreError, Weight, WeightSensor};

use crate::config::CaixaConfig;

/// A scale whose readings are filtered by age.
#[derive(Debug, Clone)]
pub struct ScaleReader<S> {
    sensor: S,
    freshness: Duration,
}

impl<S: WeightSensor> ScaleReader<S> {
    pub fn new(sensor: S, freshness: Duration) -> Self {
        ScaleReader { sensor, freshness }
    }

    /// Uses the `[scale]` freshness window from configuration.
    pub fn from_config(sensor: S, config: &CaixaConfig) -> Self {
        ScaleReader::new(sensor, config.weight_freshness())
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Latest fresh weight, or `None` when the attendant must weigh again.
    pub fn read_weight(&self) -> Option<Weight> {
        self.read_weight_at(Utc::now())
    }

    pub fn read_weight_at(&self, now: DateTime<Utc>) -> Option<Weight> {
        let Some(reading) = self.sensor.read() else {
            debug!("Scale reported no reading");
            return None;
        };

        match reading.check_fresh(now, self.freshness) {
            Ok(weight) => Some(weight),
            Err(CoreError::StaleReading { age_ms, window_ms }) => {
                warn!(
                    grams = reading.weight.grams(),
                    age_ms,
                    window_ms,
                    "Discarded stale scale reading"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Discarded scale reading");
                None
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use caixa_core::WeightReading;
    use chrono::Duration as ChronoDuration;

    struct FixedScale(Option<WeightReading>);

    impl WeightSensor for FixedScale {
        fn read(&self) -> Option<WeightReading> {
            self.0
        }
    }

    fn reading_aged(now: DateTime<Utc>, millis: i64) -> FixedScale {
        FixedScale(Some(WeightReading::new(
            Weight::from_grams(300),
            now - ChronoDuration::milliseconds(millis),
        )))
    }

    #[test]
    fn test_fresh_reading_is_returned() {
        let now = Utc::now();
        let scale = ScaleReader::new(reading_aged(now, 3_000), Duration::from_secs(4));
        assert_eq!(scale.read_weight_at(now), Some(Weight::from_grams(300)));
    }

    #[test]
    fn test_stale_reading_is_discarded() {
        let now = Utc::now();
        let scale = ScaleReader::new(reading_aged(now, 4_001), Duration::from_secs(4));
        assert_eq!(scale.read_weight_at(now), None);
    }

    #[test]
    fn test_window_edge_is_fresh() {
        let now = Utc::now();
        let scale = ScaleReader::new(reading_aged(now, 4_000), Duration::from_secs(4));
        assert_eq!(scale.read_weight_at(now), Some(Weight::from_grams(300)));
    }

    #[test]
    fn test_missing_reading() {
        let scale = ScaleReader::new(FixedScale(None), Duration::from_secs(4));
        assert_eq!(scale.read_weight(), None);
    }

    #[test]
    fn test_window_comes_from_config() {
        let mut config = CaixaConfig::default();
        config.scale.freshness_secs = 2;

        let now = Utc::now();
        let scale = ScaleReader::from_config(reading_aged(now, 3_000), &config);
        assert_eq!(scale.freshness(), Duration::from_secs(2));
        assert_eq!(scale.read_weight_at(now), None);
    }
}
