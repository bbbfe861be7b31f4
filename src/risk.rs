//! Rule-based risk factors and recommendations.
//!
//! Rules are evaluated in the order they are listed and their messages are emitted in that same
//! order, so output is reproducible.
use crate::agriculture::ClimateZone;
use crate::calibration::{AgricultureCalibration, RiskCalibration};
use crate::id::CropID;
use crate::units::Dimensionless;
use crate::urban::{InvestmentType, UrbanRequest};

/// A predicate over a request paired with the message it emits
type Rule<T> = (fn(&T, &RiskCalibration) -> bool, &'static str);

/// Emitted when a projected return had to be raised to the minimum floor
pub const RETURN_FLOORED_RISK: &str = "Projected returns do not cover operating costs";

/// Fixed advice for agricultural investments
pub const AGRICULTURAL_RECOMMENDATIONS: [&str; 4] = [
    "Implement precision agriculture techniques",
    "Consider crop rotation for soil health",
    "Invest in efficient irrigation systems",
    "Monitor market prices for optimal selling time",
];

fn urban_risk_rules() -> [Rule<UrbanRequest>; 4] {
    [
        (
            |request, risk| request.mobility_samples.len() < risk.min_mobility_samples,
            "Limited mobility data available",
        ),
        (
            |request, risk| request.transaction_samples.len() < risk.min_transaction_samples,
            "Insufficient transaction history",
        ),
        (
            |request, risk| request.amount > risk.high_capital_threshold,
            "High capital investment increases risk",
        ),
        (
            |request, _| request.investment_type == InvestmentType::Restaurant,
            "Seasonal demand fluctuations",
        ),
    ]
}

/// Apply each rule in turn, collecting the messages of those which fire
fn apply_rules<T>(rules: &[Rule<T>], subject: &T, risk: &RiskCalibration) -> Vec<String> {
    rules
        .iter()
        .filter(|(applies, _)| applies(subject, risk))
        .map(|(_, message)| (*message).to_string())
        .collect()
}

/// Risk factors for an urban investment
pub fn urban_risk_factors(request: &UrbanRequest, risk: &RiskCalibration) -> Vec<String> {
    apply_rules(&urban_risk_rules(), request, risk)
}

/// Recommendations for an urban investment, given the location multiplier
pub fn urban_recommendations(
    investment_type: InvestmentType,
    location_multiplier: Dimensionless,
    risk: &RiskCalibration,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let location_advice = if location_multiplier > risk.excellent_location {
        "Excellent location with high foot traffic and spending"
    } else if location_multiplier > risk.good_location {
        "Good location with moderate activity levels"
    } else {
        "Consider marketing strategies to increase visibility"
    };
    recommendations.push(location_advice);

    match investment_type {
        InvestmentType::Restaurant => recommendations.extend([
            "Focus on delivery and takeout options",
            "Consider lunch specials for office workers",
        ]),
        InvestmentType::Shop => recommendations.extend([
            "Optimize store layout for impulse purchases",
            "Consider online presence and e-commerce",
        ]),
        InvestmentType::Service => {}
    }

    recommendations.into_iter().map(String::from).collect()
}

/// Risk factors for growing a single crop in the given zone
pub fn crop_risk_factors(
    crop: &CropID,
    zone: ClimateZone,
    calibration: &AgricultureCalibration,
) -> Vec<String> {
    let mut risks = Vec::new();
    if zone == ClimateZone::Arid {
        risks.push("Water scarcity risk");
    }
    if calibration.is_perennial(crop) {
        risks.push("Longer time to profitability");
    }
    risks.extend(["Weather dependency", "Market price fluctuations"]);

    risks.into_iter().map(String::from).collect()
}

/// Recommendations for an agricultural investment
pub fn agricultural_recommendations() -> Vec<String> {
    AGRICULTURAL_RECOMMENDATIONS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::urban_request;
    use crate::units::Money;
    use rstest::rstest;

    #[rstest]
    fn test_urban_risk_factors_empty_restaurant(mut urban_request: UrbanRequest) {
        urban_request.investment_type = InvestmentType::Restaurant;
        urban_request.mobility_samples.clear();
        urban_request.transaction_samples.clear();
        urban_request.amount = Money(50_000.0);

        assert_eq!(
            urban_risk_factors(&urban_request, &RiskCalibration::default()),
            [
                "Limited mobility data available",
                "Insufficient transaction history",
                "Seasonal demand fluctuations"
            ]
        );
    }

    #[rstest]
    fn test_urban_risk_factors_high_capital(mut urban_request: UrbanRequest) {
        urban_request.amount = Money(600_000.0);
        let risks = urban_risk_factors(&urban_request, &RiskCalibration::default());
        assert!(risks.contains(&"High capital investment increases risk".to_string()));
    }

    #[rstest]
    fn test_urban_risk_factors_threshold_is_exclusive(mut urban_request: UrbanRequest) {
        urban_request.amount = Money(500_000.0);
        let risks = urban_risk_factors(&urban_request, &RiskCalibration::default());
        assert!(!risks.contains(&"High capital investment increases risk".to_string()));
    }

    #[rstest]
    #[case(0.9, InvestmentType::Service, &["Excellent location with high foot traffic and spending"])]
    #[case(0.8, InvestmentType::Service, &["Good location with moderate activity levels"])]
    #[case(0.6, InvestmentType::Service, &["Consider marketing strategies to increase visibility"])]
    #[case(
        0.7,
        InvestmentType::Restaurant,
        &[
            "Good location with moderate activity levels",
            "Focus on delivery and takeout options",
            "Consider lunch specials for office workers"
        ]
    )]
    #[case(
        0.1,
        InvestmentType::Shop,
        &[
            "Consider marketing strategies to increase visibility",
            "Optimize store layout for impulse purchases",
            "Consider online presence and e-commerce"
        ]
    )]
    fn test_urban_recommendations(
        #[case] multiplier: f64,
        #[case] investment_type: InvestmentType,
        #[case] expected: &[&str],
    ) {
        let recommendations = urban_recommendations(
            investment_type,
            Dimensionless(multiplier),
            &RiskCalibration::default(),
        );
        assert_eq!(recommendations, expected);
    }

    #[rstest]
    #[case("corn", ClimateZone::Temperate, &["Weather dependency", "Market price fluctuations"])]
    #[case(
        "fruits",
        ClimateZone::Arid,
        &[
            "Water scarcity risk",
            "Longer time to profitability",
            "Weather dependency",
            "Market price fluctuations"
        ]
    )]
    fn test_crop_risk_factors(
        #[case] crop: &str,
        #[case] zone: ClimateZone,
        #[case] expected: &[&str],
    ) {
        let risks = crop_risk_factors(&crop.into(), zone, &AgricultureCalibration::default());
        assert_eq!(risks, expected);
    }
}
