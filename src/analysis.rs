//! The analysis engine, which turns a request into scores, projections and advice.
//!
//! Urban and agricultural analyses produce different information, so they are kept as separate
//! variants of [`AnalysisOutcome`]. Consumers which only need one schema can use
//! [`AnalysisOutcome::summary`] to get an [`AnalysisResult`].
use crate::agriculture::{
    AgriculturalRequest, YieldForecastMap, annual_return, forecast_yields, mean_confidence,
};
use crate::calibration::Calibration;
use crate::error::Result;
use crate::estimator::{
    CompetitionModel, RandomCompetition, RandomSustainability, RuralCompetition,
    SustainabilityModel, uniform,
};
use crate::finance::{RoiScenarios, floor_annual_roi, project};
use crate::risk::{
    RETURN_FLOORED_RISK, agricultural_recommendations, urban_recommendations, urban_risk_factors,
};
use crate::units::{Dimensionless, Money};
use crate::urban::{
    InvestmentType, UrbanRequest, location_multiplier, mobility_score, spending_score,
};
use itertools::Itertools;
use log::{debug, warn};
use rand::RngCore;
use serde::Serialize;
use std::fmt;

/// Sub-scores and overall score for a site, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSet {
    /// Foot traffic score (always 0 for agricultural sites)
    pub mobility: Dimensionless,
    /// Spending score (always 0 for agricultural sites)
    pub spending: Dimensionless,
    /// Competition score; higher means less competition
    pub competition: Dimensionless,
    /// Overall score
    pub overall: Dimensionless,
}

/// A coarse rating of an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum ScoreRating {
    /// Overall score of at least 0.8
    #[display("good")]
    Good,
    /// Overall score of at least 0.6
    #[display("fair")]
    Fair,
    /// Anything lower
    #[display("poor")]
    Poor,
}

impl ScoreRating {
    /// Rate an overall score
    pub fn from_score(score: Dimensionless) -> Self {
        if score >= Dimensionless(0.8) {
            Self::Good
        } else if score >= Dimensionless(0.6) {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// The summary shared by all kinds of analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Site scores
    pub scores: ScoreSet,
    /// Financial scenarios
    pub roi_projections: RoiScenarios,
    /// Risks, in the order they were identified
    pub risk_factors: Vec<String>,
    /// Advice, in the order it was generated
    pub recommendations: Vec<String>,
    /// Confidence in the analysis, in [0, 1]
    pub confidence: Dimensionless,
}

impl AnalysisResult {
    /// Rating of the overall score
    pub fn rating(&self) -> ScoreRating {
        ScoreRating::from_score(self.scores.overall)
    }
}

/// The full result of analysing an urban site
#[derive(Debug, Clone, PartialEq)]
pub struct UrbanAnalysis {
    /// Kind of business appraised
    pub investment_type: InvestmentType,
    /// Site scores
    pub scores: ScoreSet,
    /// How much the location scales the typical return
    pub location_multiplier: Dimensionless,
    /// Expected annual return, after any flooring
    pub annual_roi: Dimensionless,
    /// Financial scenarios
    pub roi_projections: RoiScenarios,
    /// Risks, in the order they were identified
    pub risk_factors: Vec<String>,
    /// Advice, in the order it was generated
    pub recommendations: Vec<String>,
    /// Confidence in the analysis
    pub confidence: Dimensionless,
}

/// The full result of analysing an agricultural site
#[derive(Debug, Clone, PartialEq)]
pub struct AgriculturalAnalysis {
    /// Forecast for each requested crop
    pub yield_forecasts: YieldForecastMap,
    /// Expected annual return, after any flooring
    pub annual_roi: Dimensionless,
    /// Financial scenarios
    pub roi_projections: RoiScenarios,
    /// Risks not tied to a particular crop
    pub general_risk_factors: Vec<String>,
    /// Advice
    pub recommendations: Vec<String>,
    /// Sustainability of the investment, in [0, 1]
    pub sustainability_score: Dimensionless,
    /// Competition score; higher means less competition
    pub competition_score: Dimensionless,
}

impl AgriculturalAnalysis {
    /// All risk factors: each crop's in request order, then general ones
    pub fn risk_factors(&self) -> Vec<String> {
        self.yield_forecasts
            .values()
            .flat_map(|forecast| forecast.risk_factors.iter().cloned())
            .chain(self.general_risk_factors.iter().cloned())
            .collect()
    }
}

/// A request for either kind of analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisRequest {
    /// An urban business
    Urban(UrbanRequest),
    /// A farm
    Agricultural(AgriculturalRequest),
}

impl AnalysisRequest {
    /// Check that the request can be analysed
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Urban(request) => request.validate(),
            Self::Agricultural(request) => request.validate(),
        }
    }

    /// The amount invested
    pub fn amount(&self) -> Money {
        match self {
            Self::Urban(request) => request.amount,
            Self::Agricultural(request) => request.amount,
        }
    }
}

/// The result of either kind of analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Result for an urban business
    Urban(UrbanAnalysis),
    /// Result for a farm
    Agricultural(AgriculturalAnalysis),
}

impl AnalysisOutcome {
    /// Convert into the shared summary shape.
    ///
    /// Agricultural analyses have no mobility or spending signals, so those scores are reported as
    /// zero and the sustainability score is reported as the overall score.
    pub fn summary(&self) -> AnalysisResult {
        match self {
            Self::Urban(analysis) => AnalysisResult {
                scores: analysis.scores,
                roi_projections: analysis.roi_projections,
                risk_factors: analysis.risk_factors.clone(),
                recommendations: analysis.recommendations.clone(),
                confidence: analysis.confidence,
            },
            Self::Agricultural(analysis) => AnalysisResult {
                scores: ScoreSet {
                    mobility: Dimensionless(0.0),
                    spending: Dimensionless(0.0),
                    competition: analysis.competition_score,
                    overall: analysis.sustainability_score,
                },
                roi_projections: analysis.roi_projections,
                risk_factors: analysis.risk_factors(),
                recommendations: analysis.recommendations.clone(),
                confidence: mean_confidence(&analysis.yield_forecasts),
            },
        }
    }
}

impl fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Urban(analysis) => write!(f, "urban ({})", analysis.investment_type),
            Self::Agricultural(analysis) => {
                let crops = analysis.yield_forecasts.keys().join(", ");
                write!(f, "agricultural ({crops})")
            }
        }
    }
}

/// Appraises investments against a fixed calibration.
///
/// The analyser holds no mutable state, so one instance can serve any number of requests,
/// including from several threads at once. Randomness is supplied per call.
pub struct Analyser {
    calibration: Calibration,
    urban_competition: Box<dyn CompetitionModel>,
    rural_competition: Box<dyn CompetitionModel>,
    sustainability: Box<dyn SustainabilityModel>,
}

impl Analyser {
    /// Create an analyser using the placeholder estimators
    pub fn new(calibration: Calibration) -> Result<Self> {
        calibration.validate()?;

        Ok(Self {
            calibration,
            urban_competition: Box::new(RandomCompetition::default()),
            rural_competition: Box::new(RuralCompetition::default()),
            sustainability: Box::new(RandomSustainability::default()),
        })
    }

    /// Replace the competition estimator for urban sites
    pub fn with_urban_competition<M: CompetitionModel + 'static>(mut self, model: M) -> Self {
        self.urban_competition = Box::new(model);
        self
    }

    /// Replace the competition estimator for agricultural sites
    pub fn with_rural_competition<M: CompetitionModel + 'static>(mut self, model: M) -> Self {
        self.rural_competition = Box::new(model);
        self
    }

    /// Replace the sustainability estimator
    pub fn with_sustainability<M: SustainabilityModel + 'static>(mut self, model: M) -> Self {
        self.sustainability = Box::new(model);
        self
    }

    /// Analyse either kind of request
    pub fn analyse(
        &self,
        request: &AnalysisRequest,
        rng: &mut dyn RngCore,
    ) -> Result<AnalysisOutcome> {
        Ok(match request {
            AnalysisRequest::Urban(request) => {
                AnalysisOutcome::Urban(self.analyse_urban(request, rng)?)
            }
            AnalysisRequest::Agricultural(request) => {
                AnalysisOutcome::Agricultural(self.analyse_agricultural(request, rng)?)
            }
        })
    }

    /// Project scenarios for a return, raising it to the minimum floor if needed.
    ///
    /// Returns the return actually projected along with the scenarios. If the floor was applied,
    /// a risk factor is appended to `risks`.
    fn project_floored(
        &self,
        annual_roi: Dimensionless,
        amount: Money,
        risks: &mut Vec<String>,
    ) -> Result<(Dimensionless, RoiScenarios)> {
        let scenarios = &self.calibration.scenarios;
        let (annual_roi_floored, floored) =
            floor_annual_roi(annual_roi, scenarios.minimum_annual_roi);
        if floored {
            warn!(
                "Annual return of {annual_roi} is below the minimum of {}; projecting the minimum \
                instead",
                scenarios.minimum_annual_roi
            );
            risks.push(RETURN_FLOORED_RISK.to_string());
        }

        let projections = project(annual_roi_floored, amount, scenarios)?;
        Ok((annual_roi_floored, projections))
    }

    /// Analyse an urban investment
    pub fn analyse_urban(
        &self,
        request: &UrbanRequest,
        rng: &mut dyn RngCore,
    ) -> Result<UrbanAnalysis> {
        request.validate()?;
        let calibration = &self.calibration;

        let mobility = mobility_score(&request.mobility_samples, &calibration.mobility);
        let spending = spending_score(&request.transaction_samples, &calibration.spending);
        let competition = self
            .urban_competition
            .competition_score(&request.bounds, rng);
        let total = mobility.value() + spending.value() + competition.value();
        let overall = Dimensionless(total / 3.0);
        debug!(
            "Urban scores: mobility={mobility:.3}, spending={spending:.3}, \
            competition={competition:.3}, overall={overall:.3}"
        );

        let multiplier = location_multiplier(mobility, spending);
        let base_roi = calibration
            .urban
            .base_returns
            .for_type(request.investment_type);
        let adjusted_roi = base_roi * multiplier;
        debug!("Base return {base_roi} scaled by location multiplier {multiplier:.3}");

        let mut risk_factors = urban_risk_factors(request, &calibration.risk);
        let (annual_roi, roi_projections) =
            self.project_floored(adjusted_roi, request.amount, &mut risk_factors)?;

        let recommendations =
            urban_recommendations(request.investment_type, multiplier, &calibration.risk);
        let confidence = calibration.urban.confidence_baseline
            + Dimensionless(uniform(
                rng,
                0.0,
                calibration.urban.confidence_jitter.value(),
            ));

        Ok(UrbanAnalysis {
            investment_type: request.investment_type,
            scores: ScoreSet {
                mobility,
                spending,
                competition,
                overall,
            },
            location_multiplier: multiplier,
            annual_roi,
            roi_projections,
            risk_factors,
            recommendations,
            confidence,
        })
    }

    /// Analyse an agricultural investment
    pub fn analyse_agricultural(
        &self,
        request: &AgriculturalRequest,
        rng: &mut dyn RngCore,
    ) -> Result<AgriculturalAnalysis> {
        request.validate()?;
        let calibration = &self.calibration;

        let yield_forecasts = forecast_yields(request, &calibration.agriculture, rng);
        for (crop, forecast) in &yield_forecasts {
            debug!(
                "Forecast for {crop}: {:.2} t/ha (confidence {:.3})",
                forecast.predicted_yield_per_hectare.value(),
                forecast.confidence.value()
            );
        }

        let mut general_risk_factors = Vec::new();
        let raw_roi = annual_return(&yield_forecasts, request.amount, &calibration.agriculture);
        let (annual_roi, roi_projections) =
            self.project_floored(raw_roi, request.amount, &mut general_risk_factors)?;

        let sustainability_score = self.sustainability.sustainability_score(request, rng);
        let competition_score = self
            .rural_competition
            .competition_score(&request.bounds, rng);

        Ok(AgriculturalAnalysis {
            yield_forecasts,
            annual_roi,
            roi_projections,
            general_risk_factors,
            recommendations: agricultural_recommendations(),
            sustainability_score,
            competition_score,
        })
    }
}
