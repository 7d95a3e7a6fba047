//! # Weight Readings
//!
//! Weighable products are priced from a scale reading. The scale driver lives
//! outside this crate; it is modeled as a [`WeightSensor`] that returns the
//! latest reading on demand.
//!
//! ## Freshness
//! ```text
//!   reading.taken_at          now
//!        │◄──── age ────────►│
//!        │                   │
//!   age <= window  → Ok(weight)
//!   age >  window  → Err(StaleReading)
//! ```
//! A stale reading is never fatal: the reader discards it and the attendant
//! weighs again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A weight in whole grams.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams)
    }

    /// Converts a kilogram reading, rounding to the nearest gram.
    pub fn from_kg(kg: f64) -> Self {
        Weight((kg * 1000.0).round() as i64)
    }

    #[inline]
    pub const fn grams(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl std::ops::Add for Weight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

/// A single reading reported by the scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    pub weight: Weight,
    pub taken_at: DateTime<Utc>,
}

impl WeightReading {
    pub fn new(weight: Weight, taken_at: DateTime<Utc>) -> Self {
        WeightReading { weight, taken_at }
    }

    /// Returns the weight if the reading is within `window` of `now`.
    ///
    /// Readings stamped in the future (clock skew) count as age zero.
    pub fn check_fresh(&self, now: DateTime<Utc>, window: Duration) -> CoreResult<Weight> {
        let age_ms = (now - self.taken_at).num_milliseconds().max(0);
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        if age_ms > window_ms {
            return Err(CoreError::StaleReading { age_ms, window_ms });
        }

        Ok(self.weight)
    }
}

/// Provider of scale readings.
pub trait WeightSensor {
    /// Latest reading, or `None` if the scale has nothing to report.
    fn read(&self) -> Option<WeightReading>;
}

// =============================================================================
// Unit Tests
// =============================================================================
