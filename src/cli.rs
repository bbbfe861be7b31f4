//! The command line interface for the analysis engine.
use crate::analysis::{AnalysisOutcome, Analyser};
use crate::calibration::Calibration;
use crate::geometry::GeoBounds;
use crate::id::CropID;
use crate::input::{AgriculturalRequestFile, RequestFile, UrbanRequestFile, load_request};
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{
    create_output_directory, get_output_dir, write_request, write_results, write_samples,
    write_site_conditions,
};
use crate::settings::Settings;
use crate::synthetic::{
    generate_mobility_samples, generate_site_conditions, generate_transaction_samples,
};
use crate::units::Money;
use crate::urban::InvestmentType;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs;
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the analysis engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Seed for the random number generator, for reproducible results
    #[arg(long)]
    pub seed: Option<u64>,
    /// Calibration file to use instead of the one in the request directory
    #[arg(long)]
    pub calibration: Option<PathBuf>,
}

/// The kind of request created by the generate command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RequestKind {
    /// A business in a city, with foot traffic and transaction samples
    Urban,
    /// A farm, with soil and climate data
    Agricultural,
}

/// Options for the generate command
#[derive(Args)]
pub struct GenerateOpts {
    /// Kind of request to create
    #[arg(long, value_enum, default_value_t = RequestKind::Urban)]
    pub kind: RequestKind,
    /// Kind of business to appraise (urban requests)
    #[arg(long, default_value = "shop")]
    pub investment_type: InvestmentType,
    /// Comma-separated crops to plant (agricultural requests)
    #[arg(long, value_delimiter = ',', default_value = "corn")]
    pub crops: Vec<CropID>,
    /// Amount to invest
    #[arg(long, default_value_t = 100_000.0)]
    pub amount: f64,
    /// Number of foot traffic samples to generate (urban requests)
    #[arg(long, default_value_t = 200)]
    pub mobility: usize,
    /// Number of transaction samples to generate (urban requests)
    #[arg(long, default_value_t = 100)]
    pub transactions: usize,
    /// Seed for the random number generator
    #[arg(long)]
    pub seed: Option<u64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Analyse an investment request.
    Run {
        /// Path to the request directory.
        request_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example requests.
    Example {
        /// The available subcommands for managing example requests.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a request without analysing it.
    Validate {
        /// The path to the request directory.
        request_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
    /// Create a request with synthetic data.
    Generate {
        /// The directory to create.
        request_dir: PathBuf,
        /// Other generation options
        #[command(flatten)]
        opts: GenerateOpts,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { request_dir, opts } => handle_run_command(&request_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { request_dir } => handle_validate_command(&request_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
            Self::Generate { request_dir, opts } => handle_generate_command(&request_dir, &opts),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Initialise the logger, unless an earlier command in this process already did
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Handle the `run` command.
pub fn handle_run_command(
    request_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(request_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(output_path))?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let calibration = if let Some(path) = opts.calibration.as_deref() {
        Calibration::from_path(path)
    } else {
        Calibration::from_dir(request_path)
    }
    .context("Failed to load calibration.")?;

    let request = load_request(request_path).context("Failed to load request.")?;
    info!(
        "Loaded request from {} (amount invested: {})",
        request_path.display(),
        request.amount()
    );
    info!("Output folder: {}", output_path.display());

    // A seed given on the command line takes precedence over the settings file
    let seed = opts.seed.or(settings.seed).unwrap_or_else(rand::random);
    info!("Random seed: {seed}");
    let mut rng = SmallRng::seed_from_u64(seed);

    let analyser = Analyser::new(calibration).context("Invalid calibration.")?;
    let outcome = analyser.analyse(&request, &mut rng)?;
    log_outcome(&outcome);

    write_results(output_path, &outcome)?;
    write_metadata(output_path, request_path, Some(seed))?;
    info!("Analysis complete!");

    Ok(())
}

/// Log the headline results of an analysis
fn log_outcome(outcome: &AnalysisOutcome) {
    let result = outcome.summary();
    info!(
        "Analysed {outcome}: overall score {:.2} ({}), confidence {:.2}",
        result.scores.overall.value(),
        result.rating(),
        result.confidence.value()
    );
    for (scenario, projection) in result.roi_projections.iter() {
        info!(
            "{scenario}: annual return {:.1}%, breakeven after {} months",
            projection.annual_roi.value() * 100.0,
            projection.breakeven_months
        );
    }
    for risk in &result.risk_factors {
        warn!("Risk: {risk}");
    }
}

/// Handle the `validate` command.
pub fn handle_validate_command(request_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // We don't save log files when running the validate command
    init_logger(&settings, None)?;

    let calibration =
        Calibration::from_dir(request_path).context("Failed to validate calibration.")?;
    calibration.validate().context("Invalid calibration.")?;
    load_request(request_path).context("Failed to validate request.")?;
    info!("Request validation successful!");

    Ok(())
}

/// Handle the `generate` command.
pub fn handle_generate_command(request_path: &Path, opts: &GenerateOpts) -> Result<()> {
    ensure!(
        opts.amount.is_finite() && opts.amount > 0.0,
        "Investment amount must be greater than zero"
    );
    ensure!(
        opts.kind == RequestKind::Urban || !opts.crops.is_empty(),
        "At least one crop must be given"
    );
    ensure!(
        !request_path.exists(),
        "Destination directory {} already exists",
        request_path.display()
    );

    let seed = opts.seed.unwrap_or_else(rand::random);
    let mut rng = SmallRng::seed_from_u64(seed);
    fs::create_dir_all(request_path)?;

    let request = match opts.kind {
        RequestKind::Urban => {
            let bounds = GeoBounds::default();
            let mobility = generate_mobility_samples(&bounds, opts.mobility, &mut rng);
            let transactions = generate_transaction_samples(&bounds, opts.transactions, &mut rng);
            write_samples(request_path, &mobility, &transactions)?;

            RequestFile::Urban(UrbanRequestFile {
                investment_type: opts.investment_type,
                amount: Money(opts.amount),
            })
        }
        RequestKind::Agricultural => {
            write_site_conditions(request_path, &generate_site_conditions(&mut rng))?;

            RequestFile::Agricultural(AgriculturalRequestFile {
                crops: opts.crops.clone(),
                amount: Money(opts.amount),
                soil: None,
                climate: None,
            })
        }
    };
    write_request(request_path, &request)?;

    println!(
        "Created request in {} (seed {seed})",
        request_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse the options for generating a request in folder `x`
    fn parse_generate_opts(args: &[&str]) -> Result<GenerateOpts, clap::Error> {
        let cli = Cli::try_parse_from(["siteval", "generate", "x"].iter().chain(args))?;
        match cli.command {
            Some(Commands::Generate { opts, .. }) => Ok(opts),
            _ => panic!("Expected the generate command"),
        }
    }

    #[test]
    fn test_parse_generate_defaults() {
        let opts = parse_generate_opts(&[]).unwrap();
        assert_eq!(opts.kind, RequestKind::Urban);
        assert_eq!(opts.investment_type, InvestmentType::Shop);
        assert_eq!(opts.crops, [CropID::from("corn")]);
    }

    #[test]
    fn test_parse_generate_agricultural() {
        let opts = parse_generate_opts(&["--kind", "agricultural", "--crops", "corn,fruits"]);
        let opts = opts.unwrap();
        assert_eq!(opts.kind, RequestKind::Agricultural);
        assert_eq!(opts.crops, [CropID::from("corn"), CropID::from("fruits")]);
    }

    #[test]
    fn test_parse_generate_investment_type() {
        let opts = parse_generate_opts(&["--investment-type", "service"]).unwrap();
        assert_eq!(opts.investment_type, InvestmentType::Service);

        assert!(parse_generate_opts(&["--investment-type", "factory"]).is_err());
        assert!(parse_generate_opts(&["--kind", "industrial"]).is_err());
    }
}
