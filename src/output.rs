//! The module responsible for writing output data to disk.
use crate::analysis::{AnalysisOutcome, AnalysisResult, ScoreRating, ScoreSet};
use crate::finance::RoiScenarios;
use crate::id::CropID;
use crate::input::{
    MOBILITY_FILE_NAME, MobilityRecord, REQUEST_FILE_NAME, RequestFile, SITE_FILE_NAME,
    SiteConditions, TRANSACTIONS_FILE_NAME, TransactionRecord,
};
use crate::sample::{MobilitySample, TransactionSample};
use crate::units::{Dimensionless, Money, TonnesPerHectare};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which request-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "siteval_results";

/// The output file name for the analysis summary
pub const ANALYSIS_FILE_NAME: &str = "analysis.toml";

/// The output file name for ROI scenarios
pub const ROI_PROJECTIONS_FILE_NAME: &str = "roi_projections.csv";

/// The output file name for crop forecasts
pub const YIELD_FORECASTS_FILE_NAME: &str = "yield_forecasts.csv";

/// Get the output folder for the request in the specified directory
pub fn get_output_dir(request_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let request_dir = request_dir
        .canonicalize()
        .context("Could not resolve path to request")?;

    let request_name = request_dir
        .file_name()
        .context("Request cannot be in root folder")?
        .to_str()
        .context("Invalid chars in request dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, request_name].iter().collect())
}

/// Create a new output directory, clearing out an existing one if allowed.
///
/// # Returns
///
/// Whether an existing, non-empty folder was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Rerun with --overwrite to replace it."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The contents of the analysis summary file.
///
/// Plain values come before tables so that the TOML stays flat at the top.
#[derive(Serialize)]
struct AnalysisFile<'a> {
    kind: &'a str,
    rating: ScoreRating,
    confidence: Dimensionless,
    risk_factors: &'a [String],
    recommendations: &'a [String],
    scores: &'a ScoreSet,
    roi_projections: &'a RoiScenarios,
}

/// Represents a row in the ROI projections CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RoiProjectionRow {
    scenario: String,
    annual_roi: Dimensionless,
    breakeven_months: u32,
    five_year_return: Money,
}

/// Represents a row in the yield forecasts CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct YieldForecastRow {
    crop: CropID,
    predicted_yield_per_hectare: TonnesPerHectare,
    confidence: Dimensionless,
    optimal_planting_month: u32,
    risk_factors: String,
}

/// Write the analysis summary as TOML
fn write_summary(output_path: &Path, kind: &str, result: &AnalysisResult) -> Result<()> {
    let file = AnalysisFile {
        kind,
        rating: result.rating(),
        confidence: result.confidence,
        risk_factors: &result.risk_factors,
        recommendations: &result.recommendations,
        scores: &result.scores,
        roi_projections: &result.roi_projections,
    };
    let file_path = output_path.join(ANALYSIS_FILE_NAME);
    fs::write(&file_path, toml::to_string(&file)?)?;

    Ok(())
}

/// Write one row per ROI scenario
fn write_roi_projections(output_path: &Path, scenarios: &RoiScenarios) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(ROI_PROJECTIONS_FILE_NAME))?;
    for (scenario, projection) in scenarios.iter() {
        writer.serialize(RoiProjectionRow {
            scenario: scenario.to_string(),
            annual_roi: projection.annual_roi,
            breakeven_months: projection.breakeven_months,
            five_year_return: projection.five_year_return,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write all results of an analysis to the output folder
pub fn write_results(output_path: &Path, outcome: &AnalysisOutcome) -> Result<()> {
    let result = outcome.summary();
    let kind = match outcome {
        AnalysisOutcome::Urban(_) => "urban",
        AnalysisOutcome::Agricultural(_) => "agricultural",
    };
    write_summary(output_path, kind, &result)?;
    write_roi_projections(output_path, &result.roi_projections)?;

    if let AnalysisOutcome::Agricultural(analysis) = outcome {
        let mut writer = csv::Writer::from_path(output_path.join(YIELD_FORECASTS_FILE_NAME))?;
        for (crop, forecast) in &analysis.yield_forecasts {
            writer.serialize(YieldForecastRow {
                crop: crop.clone(),
                predicted_yield_per_hectare: forecast.predicted_yield_per_hectare,
                confidence: forecast.confidence,
                optimal_planting_month: forecast.optimal_planting_month,
                risk_factors: forecast.risk_factors.join("; "),
            })?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Write samples to CSV files in the format read back by the request loader
pub fn write_samples(
    dir: &Path,
    mobility_samples: &[MobilitySample],
    transaction_samples: &[TransactionSample],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(dir.join(MOBILITY_FILE_NAME))?;
    for sample in mobility_samples {
        writer.serialize(MobilityRecord::from(sample))?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(dir.join(TRANSACTIONS_FILE_NAME))?;
    for sample in transaction_samples {
        writer.serialize(TransactionRecord::from(sample))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a `request.toml` file to the request directory
pub fn write_request(dir: &Path, request: &RequestFile) -> Result<()> {
    let file_path = dir.join(REQUEST_FILE_NAME);
    fs::write(&file_path, toml::to_string(request)?)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

/// Write soil and climate data for an agricultural request
pub fn write_site_conditions(dir: &Path, conditions: &SiteConditions) -> Result<()> {
    let file_path = dir.join(SITE_FILE_NAME);
    fs::write(&file_path, toml::to_string(conditions)?)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agriculture::AgriculturalRequest;
    use crate::analysis::{Analyser, AnalysisRequest};
    use crate::fixture::{agricultural_request, analyser, rng, urban_request};
    use crate::geometry::GeoBounds;
    use crate::input::{
        AgriculturalRequestFile, DirectorySource, SampleSource, SiteConditionsSource,
        UrbanRequestFile, load_request,
    };
    use crate::synthetic::{
        generate_mobility_samples, generate_site_conditions, generate_transaction_samples,
    };
    use crate::urban::{InvestmentType, UrbanRequest};
    use itertools::Itertools;
    use rand::rngs::SmallRng;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory_new() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("a").join("b");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty() {
        let dir = tempdir().unwrap();
        assert!(!create_output_directory(dir.path(), false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing_non_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "contents").unwrap();

        assert!(create_output_directory(dir.path(), false).is_err());
        assert!(file_path.is_file());

        assert!(create_output_directory(dir.path(), true).unwrap());
        assert!(dir.path().is_dir());
        assert!(!file_path.exists());
    }

    #[rstest]
    fn test_write_results_urban(
        analyser: Analyser,
        urban_request: UrbanRequest,
        mut rng: SmallRng,
    ) {
        let analysis = analyser.analyse_urban(&urban_request, &mut rng).unwrap();
        let outcome = AnalysisOutcome::Urban(analysis);
        let dir = tempdir().unwrap();
        write_results(dir.path(), &outcome).unwrap();

        let summary: toml::Table =
            toml::from_str(&fs::read_to_string(dir.path().join(ANALYSIS_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(summary["kind"].as_str(), Some("urban"));
        assert!(summary["scores"].get("overall").is_some());
        assert!(summary["roi_projections"].get("realistic").is_some());

        let rows: Vec<RoiProjectionRow> =
            csv::Reader::from_path(dir.path().join(ROI_PROJECTIONS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        let scenarios: Vec<_> = rows.iter().map(|row| row.scenario.as_str()).collect();
        assert_eq!(scenarios, ["pessimistic", "realistic", "optimistic"]);
        assert!(!dir.path().join(YIELD_FORECASTS_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_results_agricultural(
        analyser: Analyser,
        mut agricultural_request: AgriculturalRequest,
        mut rng: SmallRng,
    ) {
        agricultural_request.crops = vec!["rice".into(), "corn".into()];
        let outcome = AnalysisOutcome::Agricultural(
            analyser
                .analyse_agricultural(&agricultural_request, &mut rng)
                .unwrap(),
        );
        let dir = tempdir().unwrap();
        write_results(dir.path(), &outcome).unwrap();

        let rows: Vec<YieldForecastRow> =
            csv::Reader::from_path(dir.path().join(YIELD_FORECASTS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        let crops: Vec<_> = rows.iter().map(|row| row.crop.as_str()).collect();
        assert_eq!(crops, ["rice", "corn"]);
        assert_eq!(
            rows[1].risk_factors,
            "Weather dependency; Market price fluctuations"
        );
    }

    #[rstest]
    fn test_write_samples(mut rng: SmallRng) {
        let bounds = GeoBounds::default();
        let mobility = generate_mobility_samples(&bounds, 20, &mut rng);
        let transactions = generate_transaction_samples(&bounds, 10, &mut rng);
        let dir = tempdir().unwrap();
        write_samples(dir.path(), &mobility, &transactions).unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.mobility_samples(&bounds).unwrap(), mobility);
        assert_eq!(source.transaction_samples(&bounds).unwrap(), transactions);
    }

    #[test]
    fn test_write_request_urban() {
        let dir = tempdir().unwrap();
        let request = RequestFile::Urban(UrbanRequestFile {
            investment_type: InvestmentType::Restaurant,
            amount: Money(75_000.0),
        });
        write_request(dir.path(), &request).unwrap();

        let AnalysisRequest::Urban(loaded) = load_request(dir.path()).unwrap() else {
            panic!("Expected an urban request");
        };
        assert_eq!(loaded.investment_type, InvestmentType::Restaurant);
        assert_eq!(loaded.amount, Money(75_000.0));
    }

    #[rstest]
    fn test_write_request_agricultural(mut rng: SmallRng) {
        let dir = tempdir().unwrap();
        let conditions = generate_site_conditions(&mut rng);
        write_site_conditions(dir.path(), &conditions).unwrap();
        let request = RequestFile::Agricultural(AgriculturalRequestFile {
            crops: vec!["wheat".into(), "fruits".into()],
            amount: Money(20_000.0),
            soil: None,
            climate: None,
        });
        write_request(dir.path(), &request).unwrap();

        // Soil and climate are left to the site file
        let contents = fs::read_to_string(dir.path().join(REQUEST_FILE_NAME)).unwrap();
        assert!(!contents.contains("soil"));

        let source = DirectorySource::new(dir.path());
        let bounds = GeoBounds::default();
        assert_eq!(source.site_conditions(&bounds).unwrap(), conditions);

        let AnalysisRequest::Agricultural(loaded) = load_request(dir.path()).unwrap() else {
            panic!("Expected an agricultural request");
        };
        assert_eq!(
            loaded.crops,
            [CropID::from("wheat"), CropID::from("fruits")]
        );
        assert_eq!(loaded.soil, conditions.soil);
        assert_eq!(loaded.climate, conditions.climate);
    }
}
