//! Defines the `Calibration` struct, which represents the contents of `calibration.toml`.
//!
//! Every constant the engine scores against lives here so that it can be retuned for a new
//! deployment region without code changes. Any field left out of the file takes its default.
use crate::agriculture::ClimateZone;
use crate::error::{Result, ensure_valid};
use crate::id::CropID;
use crate::input::{input_err_msg, read_toml};
use crate::units::{Dimensionless, Money, MoneyPerTonne, TonnesPerHectare};
use crate::urban::InvestmentType;
use anyhow::Context;
use indexmap::{IndexMap, indexmap};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// The file name for calibration files in a request directory
pub const CALIBRATION_FILE_NAME: &str = "calibration.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

/// Implement `Default` by deserialising an empty table
macro_rules! impl_default_from_serde {
    ($t:ty) => {
        impl Default for $t {
            fn default() -> Self {
                toml::from_str("").expect("Calibration defaults must deserialise from empty TOML")
            }
        }
    };
}

define_param_default!(default_typical_foot_traffic, f64, 500.0);
define_param_default!(default_excellent_foot_traffic, f64, 1000.0);
define_unit_param_default!(default_reference_total_spending, Money, 100_000.0);
define_unit_param_default!(default_reference_average_spending, Money, 100.0);
define_param_default!(default_reference_daily_transactions, f64, 50.0);
define_param_default!(default_observation_window_days, f64, 30.0);
define_unit_param_default!(default_high_value_threshold, Money, 100.0);
define_unit_param_default!(default_confidence_baseline, Dimensionless, 0.85);
define_unit_param_default!(default_confidence_jitter, Dimensionless, 0.1);
define_unit_param_default!(default_fallback_yield, TonnesPerHectare, 3.0);
define_param_default!(default_fallback_planting_month, u32, 3);
define_unit_param_default!(default_price_per_tonne, MoneyPerTonne, 500.0);
define_unit_param_default!(default_operating_cost_ratio, Dimensionless, 0.3);
define_param_default!(default_yield_noise, (f64, f64), (0.9, 1.2));
define_param_default!(default_forecast_confidence, (f64, f64), (0.95, 0.975));
define_param_default!(default_ph_range, (f64, f64), (6.5, 7.5));
define_param_default!(default_organic_matter_range, (f64, f64), (2.0, 4.0));
define_param_default!(default_nitrogen_range, (f64, f64), (30.0, 60.0));
define_unit_param_default!(default_pessimistic_multiplier, Dimensionless, 0.7);
define_unit_param_default!(default_optimistic_multiplier, Dimensionless, 1.3);
define_param_default!(default_horizon_years, u32, 5);
define_unit_param_default!(default_minimum_annual_roi, Dimensionless, 0.001);
define_param_default!(default_min_mobility_samples, usize, 50);
define_param_default!(default_min_transaction_samples, usize, 30);
define_unit_param_default!(default_high_capital_threshold, Money, 500_000.0);
define_unit_param_default!(default_excellent_location, Dimensionless, 0.8);
define_unit_param_default!(default_good_location, Dimensionless, 0.6);

/// Represents the contents of the entire calibration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Reference levels for scoring foot traffic
    #[serde(default)]
    pub mobility: MobilityCalibration,
    /// Reference levels for scoring spending
    #[serde(default)]
    pub spending: SpendingCalibration,
    /// Returns and confidence for urban investments
    #[serde(default)]
    pub urban: UrbanCalibration,
    /// Yield tables and costs for agricultural investments
    #[serde(default)]
    pub agriculture: AgricultureCalibration,
    /// How single returns are expanded into scenarios
    #[serde(default)]
    pub scenarios: ScenarioCalibration,
    /// Thresholds for risk factors and recommendations
    #[serde(default)]
    pub risk: RiskCalibration,
}

/// Reference foot traffic levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityCalibration {
    /// Average foot traffic considered typical for the region
    #[serde(default = "default_typical_foot_traffic")]
    pub typical_foot_traffic: f64,
    /// Peak foot traffic considered excellent for the region
    #[serde(default = "default_excellent_foot_traffic")]
    pub excellent_foot_traffic: f64,
}
impl_default_from_serde!(MobilityCalibration);

/// Reference spending levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingCalibration {
    /// Total spending over the observation window which earns full marks
    #[serde(default = "default_reference_total_spending")]
    pub reference_total: Money,
    /// Average transaction value which earns full marks
    #[serde(default = "default_reference_average_spending")]
    pub reference_average: Money,
    /// Transactions per day which earn full marks
    #[serde(default = "default_reference_daily_transactions")]
    pub reference_daily_transactions: f64,
    /// Length of the period transactions were collected over
    #[serde(default = "default_observation_window_days")]
    pub observation_window_days: f64,
    /// Transactions above this amount count as high value
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Money,
}
impl_default_from_serde!(SpendingCalibration);

/// Typical annual returns for each urban investment type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseReturns {
    /// Retail
    pub shop: Dimensionless,
    /// Food service
    pub restaurant: Dimensionless,
    /// Services
    pub service: Dimensionless,
}

impl Default for BaseReturns {
    fn default() -> Self {
        Self {
            shop: Dimensionless(0.15),
            restaurant: Dimensionless(0.12),
            service: Dimensionless(0.18),
        }
    }
}

impl BaseReturns {
    /// The base annual return for the given investment type
    pub fn for_type(&self, investment_type: InvestmentType) -> Dimensionless {
        match investment_type {
            InvestmentType::Shop => self.shop,
            InvestmentType::Restaurant => self.restaurant,
            InvestmentType::Service => self.service,
        }
    }
}

/// Urban investment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanCalibration {
    /// Base annual return by investment type
    #[serde(default)]
    pub base_returns: BaseReturns,
    /// Confidence reported before uncertainty is added
    #[serde(default = "default_confidence_baseline")]
    pub confidence_baseline: Dimensionless,
    /// Upper limit of the uncertainty added to the confidence baseline
    #[serde(default = "default_confidence_jitter")]
    pub confidence_jitter: Dimensionless,
}
impl_default_from_serde!(UrbanCalibration);

/// Yield of a crop in each climate zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneYields {
    /// Yield in tropical climates
    pub tropical: TonnesPerHectare,
    /// Yield in subtropical climates
    pub subtropical: TonnesPerHectare,
    /// Yield in temperate climates
    pub temperate: TonnesPerHectare,
    /// Yield in arid climates
    pub arid: TonnesPerHectare,
}

impl ZoneYields {
    /// Create a table row from yields in zone order (tropical, subtropical, temperate, arid)
    const fn new(tropical: f64, subtropical: f64, temperate: f64, arid: f64) -> Self {
        Self {
            tropical: TonnesPerHectare(tropical),
            subtropical: TonnesPerHectare(subtropical),
            temperate: TonnesPerHectare(temperate),
            arid: TonnesPerHectare(arid),
        }
    }

    /// The yield for the given zone
    pub fn for_zone(&self, zone: ClimateZone) -> TonnesPerHectare {
        match zone {
            ClimateZone::Tropical => self.tropical,
            ClimateZone::Subtropical => self.subtropical,
            ClimateZone::Temperate => self.temperate,
            ClimateZone::Arid => self.arid,
        }
    }

    fn iter(&self) -> impl Iterator<Item = TonnesPerHectare> {
        [self.tropical, self.subtropical, self.temperate, self.arid].into_iter()
    }
}

fn default_base_yields() -> IndexMap<CropID, ZoneYields> {
    indexmap! {
        "wheat".into() => ZoneYields::new(2.5, 3.2, 4.1, 1.8),
        "corn".into() => ZoneYields::new(5.2, 6.8, 8.1, 3.2),
        "rice".into() => ZoneYields::new(4.8, 5.5, 6.2, 2.1),
        "vegetables".into() => ZoneYields::new(15.2, 18.5, 22.1, 8.5),
        "fruits".into() => ZoneYields::new(12.8, 16.2, 19.5, 7.2),
    }
}

fn default_planting_months() -> IndexMap<CropID, u32> {
    indexmap! {
        "wheat".into() => 10,
        "corn".into() => 4,
        "rice".into() => 6,
        "vegetables".into() => 3,
        "fruits".into() => 2,
    }
}

fn default_perennial_crops() -> Vec<CropID> {
    vec!["fruits".into()]
}

/// Agricultural forecasting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgricultureCalibration {
    /// Base yield for each crop and climate zone
    #[serde(default = "default_base_yields")]
    pub base_yields: IndexMap<CropID, ZoneYields>,
    /// Yield used for crops missing from `base_yields`
    #[serde(default = "default_fallback_yield")]
    pub fallback_yield: TonnesPerHectare,
    /// Best month (1-12) to plant each crop
    #[serde(default = "default_planting_months")]
    pub planting_months: IndexMap<CropID, u32>,
    /// Planting month used for crops missing from `planting_months`
    #[serde(default = "default_fallback_planting_month")]
    pub fallback_planting_month: u32,
    /// Crops which take several seasons to bear produce
    #[serde(default = "default_perennial_crops")]
    pub perennial_crops: Vec<CropID>,
    /// Average sale price of produce
    #[serde(default = "default_price_per_tonne")]
    pub price_per_tonne: MoneyPerTonne,
    /// Annual operating costs as a proportion of the investment
    #[serde(default = "default_operating_cost_ratio")]
    pub operating_cost_ratio: Dimensionless,
    /// Range of the random factor applied to predicted yields
    #[serde(default = "default_yield_noise")]
    pub yield_noise: (f64, f64),
    /// Range of the confidence reported for each forecast
    #[serde(default = "default_forecast_confidence")]
    pub forecast_confidence: (f64, f64),
    /// Calibrated soil pH range
    #[serde(default = "default_ph_range")]
    pub ph_range: (f64, f64),
    /// Calibrated organic matter range (percent)
    #[serde(default = "default_organic_matter_range")]
    pub organic_matter_range: (f64, f64),
    /// Calibrated nitrogen range
    #[serde(default = "default_nitrogen_range")]
    pub nitrogen_range: (f64, f64),
}
impl_default_from_serde!(AgricultureCalibration);

impl AgricultureCalibration {
    /// Base yield of a crop in a zone, or the fallback yield for unknown crops
    pub fn base_yield(&self, crop: &CropID, zone: ClimateZone) -> TonnesPerHectare {
        self.base_yields
            .get(crop)
            .map_or(self.fallback_yield, |yields| yields.for_zone(zone))
    }

    /// Best planting month for a crop, or the fallback month for unknown crops
    pub fn planting_month(&self, crop: &CropID) -> u32 {
        self.planting_months
            .get(crop)
            .copied()
            .unwrap_or(self.fallback_planting_month)
    }

    /// Whether the crop is perennial
    pub fn is_perennial(&self, crop: &CropID) -> bool {
        self.perennial_crops.contains(crop)
    }
}

/// Scenario expansion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCalibration {
    /// Multiplier applied to the expected return for the pessimistic scenario
    #[serde(default = "default_pessimistic_multiplier")]
    pub pessimistic_multiplier: Dimensionless,
    /// Multiplier applied to the expected return for the optimistic scenario
    #[serde(default = "default_optimistic_multiplier")]
    pub optimistic_multiplier: Dimensionless,
    /// Number of years of annual compounding for the long-run return
    #[serde(default = "default_horizon_years")]
    pub horizon_years: u32,
    /// Returns below this are raised to it before projection
    #[serde(default = "default_minimum_annual_roi")]
    pub minimum_annual_roi: Dimensionless,
}
impl_default_from_serde!(ScenarioCalibration);

/// Risk and recommendation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCalibration {
    /// Fewer mobility samples than this are flagged as limited data
    #[serde(default = "default_min_mobility_samples")]
    pub min_mobility_samples: usize,
    /// Fewer transaction samples than this are flagged as insufficient history
    #[serde(default = "default_min_transaction_samples")]
    pub min_transaction_samples: usize,
    /// Investments above this amount are flagged as high capital
    #[serde(default = "default_high_capital_threshold")]
    pub high_capital_threshold: Money,
    /// Location multiplier above which a location is rated excellent
    #[serde(default = "default_excellent_location")]
    pub excellent_location: Dimensionless,
    /// Location multiplier above which a location is rated good
    #[serde(default = "default_good_location")]
    pub good_location: Dimensionless,
}
impl_default_from_serde!(RiskCalibration);

fn check_positive(value: f64, name: &str) -> Result<()> {
    ensure_valid!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero"
    );

    Ok(())
}

fn check_proportion(value: Dimensionless, name: &str) -> Result<()> {
    ensure_valid!(
        (0.0..=1.0).contains(&value.value()),
        "{name} must be between 0 and 1"
    );

    Ok(())
}

fn check_range(range: (f64, f64), name: &str) -> Result<()> {
    let (lower, upper) = range;
    ensure_valid!(
        lower.is_finite() && upper.is_finite() && lower < upper,
        "{name} must be a finite range with its lower limit below its upper limit"
    );

    Ok(())
}

fn check_month(month: u32, name: &str) -> Result<()> {
    const MONTHS: RangeInclusive<u32> = 1..=12;
    ensure_valid!(MONTHS.contains(&month), "{name} must be between 1 and 12");

    Ok(())
}

impl Calibration {
    /// Read a calibration file from the specified path.
    ///
    /// # Returns
    ///
    /// The file contents as a [`Calibration`] struct or an error if the file is invalid
    pub fn from_path(file_path: &Path) -> anyhow::Result<Calibration> {
        let calibration: Calibration = read_toml(file_path)?;
        calibration
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(calibration)
    }

    /// Read `calibration.toml` from a request directory, falling back to defaults if absent
    pub fn from_dir(dir: &Path) -> anyhow::Result<Calibration> {
        let file_path = dir.join(CALIBRATION_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Calibration::default());
        }

        Self::from_path(&file_path)
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> Result<()> {
        let mobility = &self.mobility;
        check_positive(mobility.typical_foot_traffic, "typical_foot_traffic")?;
        check_positive(mobility.excellent_foot_traffic, "excellent_foot_traffic")?;

        let spending = &self.spending;
        check_positive(spending.reference_total.value(), "reference_total")?;
        check_positive(spending.reference_average.value(), "reference_average")?;
        check_positive(
            spending.reference_daily_transactions,
            "reference_daily_transactions",
        )?;
        check_positive(spending.observation_window_days, "observation_window_days")?;
        ensure_valid!(
            spending.high_value_threshold.is_finite(),
            "high_value_threshold must be finite"
        );

        let urban = &self.urban;
        for (name, value) in [
            ("shop", urban.base_returns.shop),
            ("restaurant", urban.base_returns.restaurant),
            ("service", urban.base_returns.service),
        ] {
            check_positive(value.value(), &format!("Base return for {name}"))?;
        }
        check_proportion(urban.confidence_baseline, "confidence_baseline")?;
        check_proportion(urban.confidence_jitter, "confidence_jitter")?;
        ensure_valid!(
            urban.confidence_baseline.value() + urban.confidence_jitter.value() <= 1.0,
            "confidence_baseline plus confidence_jitter cannot exceed 1"
        );

        let agriculture = &self.agriculture;
        for (crop, yields) in &agriculture.base_yields {
            for value in yields.iter() {
                check_positive(value.value(), &format!("Base yield for {crop}"))?;
            }
        }
        check_positive(agriculture.fallback_yield.value(), "fallback_yield")?;
        for (crop, month) in &agriculture.planting_months {
            check_month(*month, &format!("Planting month for {crop}"))?;
        }
        check_month(
            agriculture.fallback_planting_month,
            "fallback_planting_month",
        )?;
        check_positive(agriculture.price_per_tonne.value(), "price_per_tonne")?;
        check_proportion(agriculture.operating_cost_ratio, "operating_cost_ratio")?;
        check_range(agriculture.yield_noise, "yield_noise")?;
        check_positive(agriculture.yield_noise.0, "Lower limit of yield_noise")?;
        check_range(agriculture.forecast_confidence, "forecast_confidence")?;
        ensure_valid!(
            agriculture.forecast_confidence.0 >= 0.0 && agriculture.forecast_confidence.1 <= 1.0,
            "forecast_confidence must lie between 0 and 1"
        );
        check_range(agriculture.ph_range, "ph_range")?;
        check_range(agriculture.organic_matter_range, "organic_matter_range")?;
        check_range(agriculture.nitrogen_range, "nitrogen_range")?;

        let scenarios = &self.scenarios;
        check_positive(
            scenarios.pessimistic_multiplier.value(),
            "pessimistic_multiplier",
        )?;
        ensure_valid!(
            scenarios.pessimistic_multiplier.value() <= 1.0
                && scenarios.optimistic_multiplier.value() >= 1.0
                && scenarios.optimistic_multiplier.is_finite(),
            "Scenario multipliers must satisfy pessimistic <= 1 <= optimistic"
        );
        ensure_valid!(scenarios.horizon_years > 0, "horizon_years cannot be zero");
        check_positive(scenarios.minimum_annual_roi.value(), "minimum_annual_roi")?;

        let risk = &self.risk;
        ensure_valid!(
            risk.high_capital_threshold.is_finite(),
            "high_capital_threshold must be finite"
        );
        check_proportion(risk.excellent_location, "excellent_location")?;
        check_proportion(risk.good_location, "good_location")?;
        ensure_valid!(
            risk.good_location <= risk.excellent_location,
            "good_location cannot be greater than excellent_location"
        );

        Ok(())
    }
}
