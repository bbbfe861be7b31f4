//! Crop yield forecasting for agricultural investments.
use crate::calibration::AgricultureCalibration;
use crate::error::{Result, ensure_valid};
use crate::estimator::uniform;
use crate::geometry::GeoBounds;
use crate::id::CropID;
use crate::risk::crop_risk_factors;
use crate::units::{Dimensionless, Money, TonnesPerHectare};
use indexmap::IndexMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

/// The climate zone of the appraised area
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum ClimateZone {
    /// Hot and humid all year
    #[string = "tropical"]
    Tropical,
    /// Hot summers and mild winters
    #[string = "subtropical"]
    Subtropical,
    /// Distinct seasons
    #[string = "temperate"]
    Temperate,
    /// Little rainfall
    #[string = "arid"]
    Arid,
}

/// Climate information for the appraised area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateContext {
    /// The climate zone
    pub zone: ClimateZone,
}

/// Soil chemistry of the appraised area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    /// Soil texture class (e.g. "loam")
    pub soil_type: String,
    /// Soil pH
    pub ph: f64,
    /// Organic matter content (percent)
    pub organic_matter_pct: f64,
    /// Available nitrogen (kg/ha)
    pub nitrogen: f64,
    /// Available phosphorus (kg/ha)
    pub phosphorus: f64,
    /// Available potassium (kg/ha)
    pub potassium: f64,
}

impl SoilProfile {
    /// Check that the soil measurements are physically plausible
    pub fn validate(&self) -> Result<()> {
        ensure_valid!(
            (0.0..=14.0).contains(&self.ph),
            "Soil pH must be between 0 and 14, got {}",
            self.ph
        );
        ensure_valid!(
            (0.0..=100.0).contains(&self.organic_matter_pct),
            "Organic matter must be a percentage, got {}",
            self.organic_matter_pct
        );
        for (name, value) in [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
        ] {
            ensure_valid!(
                value.is_finite() && value >= 0.0,
                "Soil {name} must be a finite, non-negative number, got {value}"
            );
        }

        Ok(())
    }
}

/// A request to appraise an agricultural investment
#[derive(Debug, Clone, PartialEq)]
pub struct AgriculturalRequest {
    /// Area being appraised
    pub bounds: GeoBounds,
    /// Crops to be planted. Order is preserved in the output.
    pub crops: Vec<CropID>,
    /// Capital invested
    pub amount: Money,
    /// Soil in the area
    pub soil: SoilProfile,
    /// Climate of the area
    pub climate: ClimateContext,
}

impl AgriculturalRequest {
    /// Check that the request can be analysed
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        ensure_valid!(
            self.amount.is_finite() && self.amount > Money(0.0),
            "Investment amount must be a finite number greater than zero, got {}",
            self.amount
        );
        ensure_valid!(
            !self.crops.is_empty(),
            "At least one crop must be requested"
        );
        self.soil.validate()
    }
}

/// The forecast for one crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldForecast {
    /// Expected harvest
    pub predicted_yield_per_hectare: TonnesPerHectare,
    /// Confidence in the forecast
    pub confidence: Dimensionless,
    /// Best month (1-12) to plant
    pub optimal_planting_month: u32,
    /// Risks specific to this crop in this area
    pub risk_factors: Vec<String>,
}

/// Forecasts keyed by crop, in request order
pub type YieldForecastMap = IndexMap<CropID, YieldForecast>;

/// Map `value` onto [0.5, 1.0] relative to a calibrated range.
///
/// Values outside the range are clamped rather than extrapolated.
pub fn normalise(value: f64, range: (f64, f64)) -> f64 {
    let (min, max) = range;
    if value < min {
        0.5
    } else if value > max {
        1.0
    } else {
        0.5 + (value - min) / (max - min) * 0.5
    }
}

/// How much the soil raises or lowers yields, in [0.5, 1.0]
pub fn soil_multiplier(soil: &SoilProfile, calibration: &AgricultureCalibration) -> Dimensionless {
    let ph = normalise(soil.ph, calibration.ph_range);
    let organic_matter = normalise(soil.organic_matter_pct, calibration.organic_matter_range);
    let nitrogen = normalise(soil.nitrogen, calibration.nitrogen_range);

    Dimensionless((ph + organic_matter + nitrogen) / 3.0)
}

/// Forecast the yield of a single crop
pub fn forecast_crop(
    crop: &CropID,
    request: &AgriculturalRequest,
    calibration: &AgricultureCalibration,
    rng: &mut dyn RngCore,
) -> YieldForecast {
    let base_yield = calibration.base_yield(crop, request.climate.zone);
    let multiplier = soil_multiplier(&request.soil, calibration);
    let (noise_lower, noise_upper) = calibration.yield_noise;
    let noise = Dimensionless(uniform(rng, noise_lower, noise_upper));
    let (confidence_lower, confidence_upper) = calibration.forecast_confidence;

    YieldForecast {
        predicted_yield_per_hectare: base_yield * multiplier * noise,
        confidence: Dimensionless(uniform(rng, confidence_lower, confidence_upper)),
        optimal_planting_month: calibration.planting_month(crop),
        risk_factors: crop_risk_factors(crop, request.climate.zone, calibration),
    }
}

/// Forecast yields for every requested crop.
///
/// A crop listed more than once is only forecast once.
pub fn forecast_yields(
    request: &AgriculturalRequest,
    calibration: &AgricultureCalibration,
    rng: &mut dyn RngCore,
) -> YieldForecastMap {
    let mut forecasts = YieldForecastMap::new();
    for crop in &request.crops {
        if forecasts.contains_key(crop) {
            continue;
        }

        let forecast = forecast_crop(crop, request, calibration, rng);
        forecasts.insert(crop.clone(), forecast);
    }

    forecasts
}

/// Expected annual return, net of operating costs, from one hectare of each forecast crop.
///
/// May be zero or negative if the harvest does not cover operating costs.
pub fn annual_return(
    forecasts: &YieldForecastMap,
    amount: Money,
    calibration: &AgricultureCalibration,
) -> Dimensionless {
    let total_value: Money = forecasts
        .values()
        .map(|forecast| forecast.predicted_yield_per_hectare * calibration.price_per_tonne)
        .sum();
    let operating_costs = amount * calibration.operating_cost_ratio;

    (total_value - operating_costs) / amount
}

/// Mean confidence over all forecasts
pub fn mean_confidence(forecasts: &YieldForecastMap) -> Dimensionless {
    if forecasts.is_empty() {
        return Dimensionless(0.0);
    }

    let total: f64 = forecasts.values().map(|f| f.confidence.value()).sum();
    Dimensionless(total / forecasts.len() as f64)
}
