//! General functions related to finance.
use crate::calibration::ScenarioCalibration;
use crate::error::{AnalysisError, Result};
use crate::units::{Dimensionless, Money};
use serde::Serialize;

/// The projected performance of an investment under one scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiProjection {
    /// Annual return on investment
    pub annual_roi: Dimensionless,
    /// Months until the investment has paid for itself (at least 1)
    pub breakeven_months: u32,
    /// Profit after compounding the annual return over the projection horizon
    pub five_year_return: Money,
}

/// Pessimistic, realistic and optimistic projections for an investment.
///
/// The annual returns are always ordered pessimistic <= realistic <= optimistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoiScenarios {
    /// Returns are worse than expected
    pub pessimistic: RoiProjection,
    /// Returns are as expected
    pub realistic: RoiProjection,
    /// Returns are better than expected
    pub optimistic: RoiProjection,
}

impl RoiScenarios {
    /// Iterate over the scenarios with their names, from worst to best
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RoiProjection)> {
        [
            ("pessimistic", &self.pessimistic),
            ("realistic", &self.realistic),
            ("optimistic", &self.optimistic),
        ]
        .into_iter()
    }
}

/// Check that an annual return can be projected
fn check_annual_roi(annual_roi: Dimensionless) -> Result<()> {
    if annual_roi.is_finite() && annual_roi > Dimensionless(0.0) {
        Ok(())
    } else {
        Err(AnalysisError::NonPositiveReturn(annual_roi.value()))
    }
}

/// Calculates the number of whole months needed to recover the principal.
///
/// The annual return must be finite and greater than zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn breakeven_months(annual_roi: Dimensionless) -> Result<u32> {
    check_annual_roi(annual_roi)?;

    let months = (12.0 / annual_roi.value()).ceil();
    Ok(months.clamp(1.0, f64::from(u32::MAX)) as u32)
}

/// Calculates the profit from compounding the principal annually over `years`.
pub fn compound_return(principal: Money, annual_roi: Dimensionless, years: u32) -> Money {
    let years = i32::try_from(years).unwrap_or(i32::MAX);
    let growth = (Dimensionless(1.0) + annual_roi).powi(years);
    principal * growth - principal
}

/// Project a single scenario
fn project_scenario(
    annual_roi: Dimensionless,
    principal: Money,
    horizon_years: u32,
) -> Result<RoiProjection> {
    Ok(RoiProjection {
        annual_roi,
        breakeven_months: breakeven_months(annual_roi)?,
        five_year_return: compound_return(principal, annual_roi, horizon_years),
    })
}

/// Expand an expected annual return into pessimistic, realistic and optimistic scenarios.
///
/// # Arguments
///
/// * `annual_roi` - The expected (realistic) annual return; must be finite and positive
/// * `principal` - The amount invested
/// * `calibration` - Scenario multipliers and projection horizon
pub fn project(
    annual_roi: Dimensionless,
    principal: Money,
    calibration: &ScenarioCalibration,
) -> Result<RoiScenarios> {
    check_annual_roi(annual_roi)?;

    let horizon = calibration.horizon_years;
    Ok(RoiScenarios {
        pessimistic: project_scenario(
            annual_roi * calibration.pessimistic_multiplier,
            principal,
            horizon,
        )?,
        realistic: project_scenario(annual_roi, principal, horizon)?,
        optimistic: project_scenario(
            annual_roi * calibration.optimistic_multiplier,
            principal,
            horizon,
        )?,
    })
}

/// Raise a return to the minimum floor if it falls below it.
///
/// Returns the (possibly raised) value and whether the floor was applied.
pub fn floor_annual_roi(
    annual_roi: Dimensionless,
    minimum: Dimensionless,
) -> (Dimensionless, bool) {
    if annual_roi.is_finite() && annual_roi >= minimum {
        (annual_roi, false)
    } else {
        (minimum, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.12, 100)]
    #[case(0.15, 80)]
    #[case(0.084, 143)] // 142.857... rounds up
    #[case(12.0, 1)]
    #[case(50.0, 1)] // Never less than one month
    fn test_breakeven_months(#[case] annual_roi: f64, #[case] expected: u32) {
        assert_eq!(breakeven_months(Dimensionless(annual_roi)).unwrap(), expected);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.05)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_breakeven_months_invalid(#[case] annual_roi: f64) {
        assert!(matches!(
            breakeven_months(Dimensionless(annual_roi)),
            Err(AnalysisError::NonPositiveReturn(_))
        ));
    }

    #[rstest]
    #[case(100_000.0, 0.12, 5, 76_234.168_32)]
    #[case(1000.0, 0.1, 1, 100.0)]
    #[case(1000.0, 0.0, 5, 0.0)]
    fn test_compound_return(
        #[case] principal: f64,
        #[case] annual_roi: f64,
        #[case] years: u32,
        #[case] expected: f64,
    ) {
        let result = compound_return(Money(principal), Dimensionless(annual_roi), years);
        assert_approx_eq!(Money, result, Money(expected), epsilon = 1e-4);
    }

    #[test]
    fn test_project() {
        let scenarios = project(
            Dimensionless(0.12),
            Money(100_000.0),
            &ScenarioCalibration::default(),
        )
        .unwrap();

        assert_eq!(scenarios.realistic.annual_roi, Dimensionless(0.12));
        assert_eq!(scenarios.realistic.breakeven_months, 100);
        assert_approx_eq!(
            Money,
            scenarios.realistic.five_year_return,
            Money(76_234.168_32),
            epsilon = 1e-4
        );
        assert_approx_eq!(
            Dimensionless,
            scenarios.pessimistic.annual_roi,
            Dimensionless(0.084)
        );
        assert_eq!(scenarios.pessimistic.breakeven_months, 143);
        assert_approx_eq!(
            Dimensionless,
            scenarios.optimistic.annual_roi,
            Dimensionless(0.156)
        );
        assert_eq!(scenarios.optimistic.breakeven_months, 77);
    }

    #[rstest]
    #[case(0.001)]
    #[case(0.05)]
    #[case(0.5)]
    #[case(3.0)]
    fn test_project_ordering(#[case] annual_roi: f64) {
        let scenarios = project(
            Dimensionless(annual_roi),
            Money(50_000.0),
            &ScenarioCalibration::default(),
        )
        .unwrap();

        let returns: Vec<_> = scenarios.iter().map(|(_, p)| p.annual_roi).collect();
        assert!(returns[0] <= returns[1] && returns[1] <= returns[2]);

        let months: Vec<_> = scenarios.iter().map(|(_, p)| p.breakeven_months).collect();
        assert!(months[0] >= months[1] && months[1] >= months[2]);
    }

    #[test]
    fn test_project_non_positive() {
        assert_eq!(
            project(
                Dimensionless(-0.1),
                Money(1000.0),
                &ScenarioCalibration::default()
            ),
            Err(AnalysisError::NonPositiveReturn(-0.1))
        );
    }

    #[rstest]
    #[case(0.12, 0.12, false)]
    #[case(0.001, 0.001, false)]
    #[case(0.0, 0.001, true)]
    #[case(-0.5, 0.001, true)]
    #[case(f64::NAN, 0.001, true)]
    fn test_floor_annual_roi(#[case] value: f64, #[case] expected: f64, #[case] floored: bool) {
        assert_eq!(
            floor_annual_roi(Dimensionless(value), Dimensionless(0.001)),
            (Dimensionless(expected), floored)
        );
    }
}
