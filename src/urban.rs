//! Scoring of urban sites from foot traffic and spending samples.
use crate::calibration::{MobilityCalibration, SpendingCalibration};
use crate::error::{Result, ensure_valid};
use crate::geometry::GeoBounds;
use crate::sample::{MobilitySample, TransactionSample, summarise_amounts, summarise_foot_traffic};
use crate::units::{Dimensionless, Money};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The score given to a signal when there are no samples to judge it by
pub const NEUTRAL_SCORE: Dimensionless = Dimensionless(0.5);

/// The kind of business being invested in
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum InvestmentType {
    /// Retail
    #[string = "shop"]
    Shop,
    /// Food service
    #[string = "restaurant"]
    Restaurant,
    /// Services
    #[string = "service"]
    Service,
}

/// A request to appraise an urban investment
#[derive(Debug, Clone, PartialEq)]
pub struct UrbanRequest {
    /// Area being appraised
    pub bounds: GeoBounds,
    /// Kind of business
    pub investment_type: InvestmentType,
    /// Capital invested
    pub amount: Money,
    /// Foot traffic observed in the area
    pub mobility_samples: Vec<MobilitySample>,
    /// Transactions made in the area
    pub transaction_samples: Vec<TransactionSample>,
}

impl UrbanRequest {
    /// Check that the request can be analysed
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        ensure_valid!(
            self.amount.is_finite() && self.amount > Money(0.0),
            "Investment amount must be a finite number greater than zero, got {}",
            self.amount
        );
        ensure_valid!(
            self.transaction_samples
                .iter()
                .all(|s| s.amount.is_finite() && s.amount > Money(0.0)),
            "Transaction amounts must be finite numbers greater than zero"
        );

        Ok(())
    }
}

/// Score foot traffic in [0, 1].
///
/// Average volume dominates, with peak traffic and day-to-day consistency as secondary signals.
/// Returns [`NEUTRAL_SCORE`] if there are no samples.
pub fn mobility_score(
    samples: &[MobilitySample],
    calibration: &MobilityCalibration,
) -> Dimensionless {
    let Some(summary) = summarise_foot_traffic(samples) else {
        return NEUTRAL_SCORE;
    };

    let consistency = if summary.mean > 0.0 {
        (1.0 - summary.std_dev() / summary.mean).max(0.0)
    } else {
        0.0
    };
    let score = 0.5 * (summary.mean / calibration.typical_foot_traffic)
        + 0.3 * (summary.max / calibration.excellent_foot_traffic)
        + 0.2 * consistency;

    Dimensionless(score.clamp(0.0, 1.0))
}

/// Score spending in [0, 1].
///
/// Combines total and average spend, transaction frequency and the share of high-value
/// transactions. Returns [`NEUTRAL_SCORE`] if there are no samples.
pub fn spending_score(
    samples: &[TransactionSample],
    calibration: &SpendingCalibration,
) -> Dimensionless {
    let Some(summary) = summarise_amounts(samples) else {
        return NEUTRAL_SCORE;
    };

    let count = summary.count as f64;
    let frequency = count / calibration.observation_window_days;
    let high_value = samples
        .iter()
        .filter(|s| s.amount > calibration.high_value_threshold)
        .count();
    let high_value_ratio = high_value as f64 / count;

    let score = 0.4 * (summary.total / calibration.reference_total.value())
        + 0.3 * (summary.mean / calibration.reference_average.value())
        + 0.2 * (frequency / calibration.reference_daily_transactions)
        + 0.1 * high_value_ratio;

    Dimensionless(score.clamp(0.0, 1.0))
}

/// How much the location scales the typical return for the investment type
pub fn location_multiplier(mobility: Dimensionless, spending: Dimensionless) -> Dimensionless {
    Dimensionless(f64::midpoint(mobility.value(), spending.value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{mobility_sample, transaction_sample, urban_request};
    use crate::synthetic::{generate_mobility_samples, generate_transaction_samples};
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rstest::rstest;

    #[rstest]
    #[case("shop", InvestmentType::Shop)]
    #[case("Restaurant", InvestmentType::Restaurant)]
    #[case("SERVICE", InvestmentType::Service)]
    fn test_parse_investment_type(#[case] label: &str, #[case] expected: InvestmentType) {
        assert_eq!(label.parse::<InvestmentType>(), Ok(expected));
        assert_eq!(expected.to_string(), label.to_lowercase());
    }

    #[test]
    fn test_parse_investment_type_unknown() {
        assert!("factory".parse::<InvestmentType>().is_err());
    }

    fn mobility_with_traffic(traffic: &[u32]) -> Vec<MobilitySample> {
        traffic
            .iter()
            .map(|&foot_traffic| MobilitySample {
                foot_traffic,
                ..mobility_sample()
            })
            .collect()
    }

    fn transactions_with_amounts(amounts: &[f64]) -> Vec<TransactionSample> {
        amounts
            .iter()
            .map(|&amount| TransactionSample {
                amount: Money(amount),
                ..transaction_sample()
            })
            .collect()
    }

    #[test]
    fn test_mobility_score_empty() {
        assert_eq!(
            mobility_score(&[], &MobilityCalibration::default()),
            NEUTRAL_SCORE
        );
    }

    #[test]
    fn test_mobility_score_uniform_traffic() {
        // avg = 250, peak = 250, consistency = 1
        // 0.5 * 0.5 + 0.3 * 0.25 + 0.2 * 1 = 0.525
        let samples = mobility_with_traffic(&[250, 250, 250, 250]);
        assert_approx_eq!(
            Dimensionless,
            mobility_score(&samples, &MobilityCalibration::default()),
            Dimensionless(0.525)
        );
    }

    #[test]
    fn test_mobility_score_variable_traffic() {
        // avg = 200, peak = 300, std dev = 100, consistency = 0.5
        // 0.5 * 0.4 + 0.3 * 0.3 + 0.2 * 0.5 = 0.39
        let samples = mobility_with_traffic(&[100, 300]);
        assert_approx_eq!(
            Dimensionless,
            mobility_score(&samples, &MobilityCalibration::default()),
            Dimensionless(0.39)
        );
    }

    #[test]
    fn test_mobility_score_zero_traffic() {
        let samples = mobility_with_traffic(&[0, 0, 0]);
        assert_eq!(
            mobility_score(&samples, &MobilityCalibration::default()),
            Dimensionless(0.0)
        );
    }

    #[test]
    fn test_mobility_score_capped() {
        let samples = mobility_with_traffic(&[5000, 5000]);
        assert_eq!(
            mobility_score(&samples, &MobilityCalibration::default()),
            Dimensionless(1.0)
        );
    }

    #[test]
    fn test_mobility_score_custom_calibration() {
        let calibration = MobilityCalibration {
            typical_foot_traffic: 250.0,
            excellent_foot_traffic: 500.0,
        };
        // 0.5 * 1 + 0.3 * 0.5 + 0.2 * 1 = 0.85
        let samples = mobility_with_traffic(&[250, 250]);
        assert_approx_eq!(
            Dimensionless,
            mobility_score(&samples, &calibration),
            Dimensionless(0.85)
        );
    }

    #[test]
    fn test_spending_score_empty() {
        assert_eq!(
            spending_score(&[], &SpendingCalibration::default()),
            NEUTRAL_SCORE
        );
    }

    #[test]
    fn test_spending_score() {
        // total = 300, avg = 150, frequency = 2/30, high value ratio = 0.5
        let samples = transactions_with_amounts(&[50.0, 250.0]);
        let expected = 0.4 * 0.003 + 0.3 * 1.5 + 0.2 * (2.0 / 30.0 / 50.0) + 0.1 * 0.5;
        assert_approx_eq!(
            Dimensionless,
            spending_score(&samples, &SpendingCalibration::default()),
            Dimensionless(expected)
        );
    }

    #[test]
    fn test_spending_score_capped() {
        let samples = transactions_with_amounts(&[10_000.0; 20]);
        assert_eq!(
            spending_score(&samples, &SpendingCalibration::default()),
            Dimensionless(1.0)
        );
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    fn test_scores_in_unit_interval(#[case] seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let bounds = GeoBounds::default();
        let mobility = generate_mobility_samples(&bounds, 200, &mut rng);
        let transactions = generate_transaction_samples(&bounds, 100, &mut rng);

        for score in [
            mobility_score(&mobility, &MobilityCalibration::default()),
            spending_score(&transactions, &SpendingCalibration::default()),
        ] {
            assert!(
                (0.0..=1.0).contains(&score.value()),
                "score {score} out of range"
            );
        }
    }

    #[rstest]
    fn test_scores_idempotent(urban_request: UrbanRequest) {
        let mobility = MobilityCalibration::default();
        let spending = SpendingCalibration::default();
        assert_eq!(
            mobility_score(&urban_request.mobility_samples, &mobility),
            mobility_score(&urban_request.mobility_samples, &mobility)
        );
        assert_eq!(
            spending_score(&urban_request.transaction_samples, &spending),
            spending_score(&urban_request.transaction_samples, &spending)
        );
    }

    #[test]
    fn test_location_multiplier() {
        assert_approx_eq!(
            Dimensionless,
            location_multiplier(Dimensionless(0.5), Dimensionless(0.9)),
            Dimensionless(0.7)
        );
    }

    #[rstest]
    fn test_validate(mut urban_request: UrbanRequest) {
        urban_request.validate().unwrap();

        urban_request.amount = Money(-1.0);
        assert!(urban_request.validate().is_err());
    }

    #[rstest]
    fn test_validate_bad_transaction(mut urban_request: UrbanRequest) {
        urban_request.transaction_samples = transactions_with_amounts(&[10.0, 0.0]);
        assert!(urban_request.validate().is_err());
    }
}
