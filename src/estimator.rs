//! Pluggable estimators for signals which have no real data source yet.
//!
//! The engine only sees the [`CompetitionModel`] and [`SustainabilityModel`] traits, so a real
//! point-of-interest density provider or sustainability model can be swapped in without touching
//! the scoring code. All randomness comes from the generator passed in by the caller, which makes
//! results reproducible for a fixed seed.
use crate::agriculture::AgriculturalRequest;
use crate::geometry::GeoBounds;
use crate::units::Dimensionless;
use rand::{Rng, RngCore};

/// Draw a value uniformly from `[lower, upper)`.
///
/// Returns `lower` if the range is empty, so that a zero-width range can be used to switch the
/// noise off.
pub fn uniform(rng: &mut dyn RngCore, lower: f64, upper: f64) -> f64 {
    if upper > lower {
        rng.random_range(lower..upper)
    } else {
        lower
    }
}

/// Estimates how favourable the competitive landscape of an area is
pub trait CompetitionModel: Send + Sync {
    /// Score in [0, 1]; higher means less competition
    fn competition_score(&self, bounds: &GeoBounds, rng: &mut dyn RngCore) -> Dimensionless;
}

/// Estimates the sustainability of an agricultural investment
pub trait SustainabilityModel: Send + Sync {
    /// Score in [0, 1]; higher is more sustainable
    fn sustainability_score(
        &self,
        request: &AgriculturalRequest,
        rng: &mut dyn RngCore,
    ) -> Dimensionless;
}

/// Competition score derived from a randomly drawn competitor density.
///
/// **PLACEHOLDER**: stands in for a point-of-interest density model. Density is drawn from
/// `density_range` and the score is `1 - density`.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomCompetition {
    /// Range of the simulated competitor density
    pub density_range: (f64, f64),
}

impl Default for RandomCompetition {
    fn default() -> Self {
        Self {
            density_range: (0.1, 0.9),
        }
    }
}

impl CompetitionModel for RandomCompetition {
    fn competition_score(&self, _bounds: &GeoBounds, rng: &mut dyn RngCore) -> Dimensionless {
        let (lower, upper) = self.density_range;
        let density = uniform(rng, lower, upper);
        Dimensionless(1.0 - density)
    }
}

/// Competition score for farmland.
///
/// **PLACEHOLDER**: agriculture is assumed to face less competition than urban retail, so the
/// score is `1 - U(0, max_penalty)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuralCompetition {
    /// Largest amount that can be subtracted from a perfect score
    pub max_penalty: f64,
}

impl Default for RuralCompetition {
    fn default() -> Self {
        Self { max_penalty: 0.3 }
    }
}

impl CompetitionModel for RuralCompetition {
    fn competition_score(&self, _bounds: &GeoBounds, rng: &mut dyn RngCore) -> Dimensionless {
        Dimensionless(1.0 - uniform(rng, 0.0, self.max_penalty))
    }
}

/// Sustainability score drawn at random.
///
/// **PLACEHOLDER**: stands in for a real sustainability model.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSustainability {
    /// Range the score is drawn from
    pub score_range: (f64, f64),
}

impl Default for RandomSustainability {
    fn default() -> Self {
        Self {
            score_range: (0.7, 1.0),
        }
    }
}

impl SustainabilityModel for RandomSustainability {
    fn sustainability_score(
        &self,
        _request: &AgriculturalRequest,
        rng: &mut dyn RngCore,
    ) -> Dimensionless {
        let (lower, upper) = self.score_range;
        Dimensionless(uniform(rng, lower, upper))
    }
}
