//! Common routines for loading analysis requests from a directory of input files.
use crate::agriculture::{AgriculturalRequest, ClimateContext, SoilProfile};
use crate::analysis::AnalysisRequest;
use crate::geometry::{GeoBounds, Location};
use crate::id::CropID;
use crate::sample::{DayType, MobilitySample, TransactionSample};
use crate::units::Money;
use crate::urban::{InvestmentType, UrbanRequest};
use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, Utc};
use geo::Geometry;
use geojson::GeoJson;
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The main request file
pub const REQUEST_FILE_NAME: &str = "request.toml";

/// Optional polygon for the appraised area
pub const GEOMETRY_FILE_NAME: &str = "geometry.geojson";

/// Optional foot traffic samples
pub const MOBILITY_FILE_NAME: &str = "mobility.csv";

/// Optional transaction samples
pub const TRANSACTIONS_FILE_NAME: &str = "transactions.csv";

/// Optional soil and climate data, for agricultural requests which do not give them inline
pub const SITE_FILE_NAME: &str = "site.toml";

/// Get the message to attach to errors about a particular input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().to_string_lossy())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read all records from a CSV file.
///
/// A missing file is treated as having no records.
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    if !file_path.is_file() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| input_err_msg(file_path))?;

    Ok(records)
}

/// A row of a sample file
pub trait SampleRecord: DeserializeOwned {
    /// Where the sample was taken
    fn location(&self) -> Location;
}

/// A row of `mobility.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityRecord {
    lng: f64,
    lat: f64,
    foot_traffic: u32,
    dwell_time_minutes: u32,
    day_type: DayType,
    timestamp: DateTime<Utc>,
}

impl SampleRecord for MobilityRecord {
    fn location(&self) -> Location {
        Location::new(self.lng, self.lat)
    }
}

impl From<MobilityRecord> for MobilitySample {
    fn from(record: MobilityRecord) -> Self {
        Self {
            location: Location::new(record.lng, record.lat),
            foot_traffic: record.foot_traffic,
            dwell_time_minutes: record.dwell_time_minutes,
            day_type: record.day_type,
            timestamp: record.timestamp,
        }
    }
}

impl From<&MobilitySample> for MobilityRecord {
    fn from(sample: &MobilitySample) -> Self {
        Self {
            lng: sample.location.lng,
            lat: sample.location.lat,
            foot_traffic: sample.foot_traffic,
            dwell_time_minutes: sample.dwell_time_minutes,
            day_type: sample.day_type,
            timestamp: sample.timestamp,
        }
    }
}

/// A row of `transactions.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    lng: f64,
    lat: f64,
    amount: Money,
    category: String,
    merchant_type: String,
    timestamp: DateTime<Utc>,
}

impl SampleRecord for TransactionRecord {
    fn location(&self) -> Location {
        Location::new(self.lng, self.lat)
    }
}

impl From<TransactionRecord> for TransactionSample {
    fn from(record: TransactionRecord) -> Self {
        Self {
            location: Location::new(record.lng, record.lat),
            amount: record.amount,
            category: record.category,
            merchant_type: record.merchant_type,
            timestamp: record.timestamp,
        }
    }
}

impl From<&TransactionSample> for TransactionRecord {
    fn from(sample: &TransactionSample) -> Self {
        Self {
            lng: sample.location.lng,
            lat: sample.location.lat,
            amount: sample.amount,
            category: sample.category.clone(),
            merchant_type: sample.merchant_type.clone(),
            timestamp: sample.timestamp,
        }
    }
}

/// Soil and climate for an area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConditions {
    /// Soil in the area
    pub soil: SoilProfile,
    /// Climate of the area
    pub climate: ClimateContext,
}

/// A provider of geolocated samples for an area
pub trait SampleSource {
    /// Foot traffic samples within the bounds
    fn mobility_samples(&self, bounds: &GeoBounds) -> Result<Vec<MobilitySample>>;

    /// Transaction samples within the bounds
    fn transaction_samples(&self, bounds: &GeoBounds) -> Result<Vec<TransactionSample>>;
}

/// A provider of soil and climate data for an area
pub trait SiteConditionsSource {
    /// The conditions prevailing within the bounds
    fn site_conditions(&self, bounds: &GeoBounds) -> Result<SiteConditions>;
}

/// Reads samples and site conditions from files in a request directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source backed by the given directory
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Read samples from a CSV file, keeping only those within the bounds
    fn read_samples<R, S>(&self, file_name: &str, bounds: &GeoBounds) -> Result<Vec<S>>
    where
        R: SampleRecord,
        S: From<R>,
    {
        let file_path = self.dir.join(file_name);
        let records: Vec<R> = read_csv_optional(&file_path)?;
        let total = records.len();
        let samples: Vec<S> = records
            .into_iter()
            .filter(|record| bounds.contains(&record.location()))
            .map(S::from)
            .collect();

        if samples.len() < total {
            info!(
                "Ignoring {} of {total} samples in {file_name} which lie outside the area",
                total - samples.len()
            );
        }

        Ok(samples)
    }
}

impl SampleSource for DirectorySource {
    fn mobility_samples(&self, bounds: &GeoBounds) -> Result<Vec<MobilitySample>> {
        self.read_samples::<MobilityRecord, _>(MOBILITY_FILE_NAME, bounds)
    }

    fn transaction_samples(&self, bounds: &GeoBounds) -> Result<Vec<TransactionSample>> {
        self.read_samples::<TransactionRecord, _>(TRANSACTIONS_FILE_NAME, bounds)
    }
}

impl SiteConditionsSource for DirectorySource {
    fn site_conditions(&self, _bounds: &GeoBounds) -> Result<SiteConditions> {
        let file_path = self.dir.join(SITE_FILE_NAME);
        ensure!(
            file_path.is_file(),
            "No soil and climate data: give [soil] and [climate] in {REQUEST_FILE_NAME} or \
            provide {SITE_FILE_NAME}"
        );

        read_toml(&file_path)
    }
}

/// The contents of `request.toml`, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequestFile {
    /// An urban business
    Urban(UrbanRequestFile),
    /// A farm
    Agricultural(AgriculturalRequestFile),
}

/// The fields of an urban `request.toml`. Samples come from separate files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanRequestFile {
    /// Kind of business
    pub investment_type: InvestmentType,
    /// Capital invested
    pub amount: Money,
}

/// The fields of an agricultural `request.toml`.
///
/// Soil and climate are either both given here or both read from [`SITE_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgriculturalRequestFile {
    /// Crops to be planted
    pub crops: Vec<CropID>,
    /// Capital invested
    pub amount: Money,
    /// Soil in the area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil: Option<SoilProfile>,
    /// Climate of the area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimateContext>,
}

/// Read a `Polygon` or `MultiPolygon` from a GeoJSON file.
///
/// The file may hold a bare geometry, a feature or a collection with a single feature.
pub fn read_geometry(file_path: &Path) -> Result<Geometry<f64>> {
    let geojson_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let geojson: GeoJson = geojson_str
        .parse()
        .with_context(|| input_err_msg(file_path))?;

    let geometry = match geojson {
        GeoJson::Geometry(geometry) => Some(geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::FeatureCollection(collection) => {
            ensure!(
                collection.features.len() == 1,
                "{}: Expected exactly one feature, found {}",
                input_err_msg(file_path),
                collection.features.len()
            );
            collection
                .features
                .into_iter()
                .next()
                .and_then(|feature| feature.geometry)
        }
    };
    let Some(geometry) = geometry else {
        bail!("{}: Feature has no geometry", input_err_msg(file_path));
    };

    let geometry: Geometry<f64> = geometry
        .try_into()
        .with_context(|| input_err_msg(file_path))?;
    ensure!(
        matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)),
        "{}: Geometry must be a Polygon or MultiPolygon",
        input_err_msg(file_path)
    );

    Ok(geometry)
}

/// Get the bounds of the area described in the request directory.
///
/// Uses the geometry file if present, otherwise the default bounds.
fn read_bounds(dir: &Path) -> Result<GeoBounds> {
    let file_path = dir.join(GEOMETRY_FILE_NAME);
    if !file_path.is_file() {
        info!("No {GEOMETRY_FILE_NAME} found; using default bounds");
        return Ok(GeoBounds::default());
    }

    let geometry = read_geometry(&file_path)?;
    let bounds = GeoBounds::from_geometry(&geometry).with_context(|| input_err_msg(&file_path))?;
    Ok(bounds)
}

/// Load a request from a directory, using files in the directory as the data sources.
///
/// # Arguments
///
/// * `dir` - Folder containing request files
///
/// # Returns
///
/// The validated request or an error.
pub fn load_request(dir: &Path) -> Result<AnalysisRequest> {
    let source = DirectorySource::new(dir);
    load_request_with_sources(dir, &source, &source)
}

/// Load a request from a directory, fetching samples and site conditions from the given sources
pub fn load_request_with_sources(
    dir: &Path,
    samples: &dyn SampleSource,
    conditions: &dyn SiteConditionsSource,
) -> Result<AnalysisRequest> {
    ensure!(dir.is_dir(), "{} is not a directory", dir.to_string_lossy());

    let request_path = dir.join(REQUEST_FILE_NAME);
    let request_file: RequestFile = read_toml(&request_path)?;
    let bounds = read_bounds(dir)?;

    let request = match request_file {
        RequestFile::Urban(file) => AnalysisRequest::Urban(UrbanRequest {
            bounds,
            investment_type: file.investment_type,
            amount: file.amount,
            mobility_samples: samples.mobility_samples(&bounds)?,
            transaction_samples: samples.transaction_samples(&bounds)?,
        }),
        RequestFile::Agricultural(file) => {
            let SiteConditions { soil, climate } = match (file.soil, file.climate) {
                (Some(soil), Some(climate)) => SiteConditions { soil, climate },
                (None, None) => conditions.site_conditions(&bounds)?,
                _ => bail!(
                    "{}: soil and climate must either both be given or both be omitted",
                    input_err_msg(&request_path)
                ),
            };
            AnalysisRequest::Agricultural(AgriculturalRequest {
                bounds,
                crops: file.crops,
                amount: file.amount,
                soil,
                climate,
            })
        }
    };

    request
        .validate()
        .with_context(|| input_err_msg(&request_path))?;

    Ok(request)
}
