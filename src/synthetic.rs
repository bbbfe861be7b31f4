//! Generation of synthetic samples for demonstrations and testing.
//!
//! The distributions mimic activity in a mixed commercial/residential district: most locations
//! see commercial levels of foot traffic, the rest residential levels. Site conditions are drawn
//! uniformly over the usual agronomic ranges.
use crate::agriculture::{ClimateContext, ClimateZone, SoilProfile};
use crate::geometry::{GeoBounds, Location};
use crate::input::SiteConditions;
use crate::sample::{DayType, MobilitySample, TransactionSample};
use crate::units::Money;
use chrono::{DateTime, Duration, Utc};
use rand::seq::{IndexedRandom, IteratorRandom};
use rand::{Rng, RngCore};
use strum::IntoEnumIterator;

/// Transaction categories
const CATEGORIES: [&str; 5] = [
    "Food & Dining",
    "Shopping",
    "Entertainment",
    "Services",
    "Transport",
];

/// Merchant types
const MERCHANT_TYPES: [&str; 5] = ["restaurant", "cafe", "retail", "grocery", "service"];

/// Soil texture classes
const SOIL_TYPES: [&str; 4] = ["clay", "sandy", "loam", "silt"];

/// Samples are spread over this many days before the reference time
const HISTORY_DAYS: i64 = 30;

/// Draw a random location within the bounds
fn random_location(bounds: &GeoBounds, rng: &mut dyn RngCore) -> Location {
    Location::new(
        rng.random_range(bounds.west..bounds.east),
        rng.random_range(bounds.south..bounds.north),
    )
}

/// Draw a random time within the history window before `now`
fn random_timestamp(now: DateTime<Utc>, rng: &mut dyn RngCore) -> DateTime<Utc> {
    let seconds = rng.random_range(0..HISTORY_DAYS * 24 * 60 * 60);
    now - Duration::seconds(seconds)
}

/// Generate mobility samples timestamped relative to `now`
pub fn generate_mobility_samples_at(
    bounds: &GeoBounds,
    count: usize,
    now: DateTime<Utc>,
    rng: &mut dyn RngCore,
) -> Vec<MobilitySample> {
    (0..count)
        .map(|_| {
            let location = random_location(bounds, rng);

            // 60% of locations are commercial
            let foot_traffic = if rng.random_bool(0.6) {
                rng.random_range(200..700)
            } else {
                rng.random_range(20..120)
            };

            MobilitySample {
                location,
                foot_traffic,
                dwell_time_minutes: rng.random_range(5..125),
                day_type: if rng.random_bool(0.7) {
                    DayType::Weekday
                } else {
                    DayType::Weekend
                },
                timestamp: random_timestamp(now, rng),
            }
        })
        .collect()
}

/// Generate transaction samples timestamped relative to `now`
pub fn generate_transaction_samples_at(
    bounds: &GeoBounds,
    count: usize,
    now: DateTime<Utc>,
    rng: &mut dyn RngCore,
) -> Vec<TransactionSample> {
    (0..count)
        .map(|_| TransactionSample {
            location: random_location(bounds, rng),
            amount: Money(rng.random_range(10.0..500.0)),
            category: (*CATEGORIES.choose(rng).unwrap_or(&CATEGORIES[0])).to_string(),
            merchant_type: (*MERCHANT_TYPES.choose(rng).unwrap_or(&MERCHANT_TYPES[0]))
                .to_string(),
            timestamp: random_timestamp(now, rng),
        })
        .collect()
}

/// Generate mobility samples from the last 30 days
pub fn generate_mobility_samples(
    bounds: &GeoBounds,
    count: usize,
    rng: &mut dyn RngCore,
) -> Vec<MobilitySample> {
    generate_mobility_samples_at(bounds, count, Utc::now(), rng)
}

/// Generate transaction samples from the last 30 days
pub fn generate_transaction_samples(
    bounds: &GeoBounds,
    count: usize,
    rng: &mut dyn RngCore,
) -> Vec<TransactionSample> {
    generate_transaction_samples_at(bounds, count, Utc::now(), rng)
}

/// Generate soil and climate data for an agricultural site
pub fn generate_site_conditions(rng: &mut dyn RngCore) -> SiteConditions {
    let soil = SoilProfile {
        soil_type: (*SOIL_TYPES.choose(rng).unwrap_or(&SOIL_TYPES[0])).to_string(),
        ph: rng.random_range(5.5..8.0),
        organic_matter_pct: rng.random_range(0.0..5.0),
        nitrogen: rng.random_range(0.0..100.0),
        phosphorus: rng.random_range(0.0..50.0),
        potassium: rng.random_range(0.0..200.0),
    };
    let zone = ClimateZone::iter()
        .choose(rng)
        .unwrap_or(ClimateZone::Temperate);

    SiteConditions {
        soil,
        climate: ClimateContext { zone },
    }
}
