//! Fixtures for tests

use crate::agriculture::{AgriculturalRequest, ClimateContext, ClimateZone, SoilProfile};
use crate::analysis::Analyser;
use crate::calibration::Calibration;
use crate::geometry::{GeoBounds, Location};
use crate::sample::{DayType, MobilitySample, TransactionSample};
use crate::units::Money;
use crate::urban::{InvestmentType, UrbanRequest};
use chrono::{DateTime, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A fixed point in time for samples
fn sample_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

/// A location in the middle of the default bounds
fn sample_location() -> Location {
    Location::new(55.25, 25.2)
}

/// A single mobility sample
pub fn mobility_sample() -> MobilitySample {
    MobilitySample {
        location: sample_location(),
        foot_traffic: 400,
        dwell_time_minutes: 30,
        day_type: DayType::Weekday,
        timestamp: sample_time(),
    }
}

/// A single transaction sample
pub fn transaction_sample() -> TransactionSample {
    TransactionSample {
        location: sample_location(),
        amount: Money(80.0),
        category: "Food & Dining".into(),
        merchant_type: "cafe".into(),
        timestamp: sample_time(),
    }
}

#[fixture]
pub fn rng() -> SmallRng {
    SmallRng::seed_from_u64(42)
}

#[fixture]
pub fn analyser() -> Analyser {
    Analyser::new(Calibration::default()).unwrap()
}

/// A shop with enough samples that no data-related risks are raised
#[fixture]
pub fn urban_request() -> UrbanRequest {
    let mobility_samples = (0..60u32)
        .map(|i| MobilitySample {
            foot_traffic: 300 + 10 * (i % 10),
            ..mobility_sample()
        })
        .collect();
    let transaction_samples = (0..40u32)
        .map(|i| TransactionSample {
            amount: Money(50.0 + 5.0 * f64::from(i % 8)),
            ..transaction_sample()
        })
        .collect();

    UrbanRequest {
        bounds: GeoBounds::default(),
        investment_type: InvestmentType::Shop,
        amount: Money(100_000.0),
        mobility_samples,
        transaction_samples,
    }
}

#[fixture]
pub fn soil() -> SoilProfile {
    SoilProfile {
        soil_type: "loam".into(),
        ph: 7.0,
        organic_matter_pct: 3.0,
        nitrogen: 45.0,
        phosphorus: 25.0,
        potassium: 180.0,
    }
}

#[fixture]
pub fn agricultural_request(soil: SoilProfile) -> AgriculturalRequest {
    AgriculturalRequest {
        bounds: GeoBounds::default(),
        crops: vec!["corn".into()],
        amount: Money(100_000.0),
        soil,
        climate: ClimateContext {
            zone: ClimateZone::Temperate,
        },
    }
}
