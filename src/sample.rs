//! Point samples of activity within the appraised area and their summary statistics.
use crate::geometry::Location;
use crate::units::Money;
use chrono::{DateTime, Utc};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The kind of day on which a mobility sample was recorded
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum, SerializeLabeledStringEnum,
)]
pub enum DayType {
    /// Monday to Friday
    #[string = "weekday"]
    Weekday,
    /// Saturday or Sunday
    #[string = "weekend"]
    Weekend,
    /// A public holiday
    #[string = "holiday"]
    Holiday,
}

/// Foot traffic observed at a location
#[derive(Debug, Clone, PartialEq)]
pub struct MobilitySample {
    /// Where the sample was taken
    pub location: Location,
    /// Number of people passing by
    pub foot_traffic: u32,
    /// Average dwell time
    pub dwell_time_minutes: u32,
    /// The kind of day the sample was taken on
    pub day_type: DayType,
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

/// A single e-wallet transaction made near the appraised site
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSample {
    /// Where the transaction happened
    pub location: Location,
    /// Transaction amount. Always positive.
    pub amount: Money,
    /// Spending category (e.g. "Food & Dining")
    pub category: String,
    /// Type of merchant (e.g. "cafe")
    pub merchant_type: String,
    /// When the transaction happened
    pub timestamp: DateTime<Utc>,
}

/// Summary statistics over a non-empty set of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Number of values
    pub count: usize,
    /// Sum of values
    pub total: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Largest value
    pub max: f64,
    /// Population variance
    pub variance: f64,
}

impl SampleSummary {
    /// Summarise the values in a single pass.
    ///
    /// Returns `None` if there are no values, as the statistics are undefined.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        // Welford's online algorithm
        let mut count = 0usize;
        let mut total = 0.0;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            total += value;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
            max = max.max(value);
        }

        (count > 0).then(|| Self {
            count,
            total,
            mean,
            max,
            variance: m2 / count as f64,
        })
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Summarise the foot traffic of mobility samples
pub fn summarise_foot_traffic(samples: &[MobilitySample]) -> Option<SampleSummary> {
    SampleSummary::from_values(samples.iter().map(|s| f64::from(s.foot_traffic)))
}

/// Summarise the amounts of transaction samples
pub fn summarise_amounts(samples: &[TransactionSample]) -> Option<SampleSummary> {
    SampleSummary::from_values(samples.iter().map(|s| s.amount.value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_from_values_empty() {
        assert_eq!(SampleSummary::from_values([]), None);
    }

    #[test]
    fn test_from_values() {
        let summary = SampleSummary::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.count, 8);
        assert_approx_eq!(f64, summary.total, 40.0);
        assert_approx_eq!(f64, summary.mean, 5.0);
        assert_approx_eq!(f64, summary.max, 9.0);
        assert_approx_eq!(f64, summary.variance, 4.0, epsilon = 1e-12);
        assert_approx_eq!(f64, summary.std_dev(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_values_single() {
        let summary = SampleSummary::from_values([300.0]).unwrap();
        assert_approx_eq!(f64, summary.mean, 300.0);
        assert_approx_eq!(f64, summary.max, 300.0);
        assert_eq!(summary.variance, 0.0);
    }
}
