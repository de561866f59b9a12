//! Command-line interface for `mwqm`, a thin layer over Google Earth Engine and the
//! USGS Network Linked Data Index for watershed-scale water quality modelling.
//!
//! This binary provides a user-friendly CLI to interact with the [`mwqm_core`] library.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! It parses arguments, configures logging, and delegates to command handlers; every handler
//! returns a [`mwqm_core::Result`] so failures are reported with their user message and
//! recovery suggestion.
//!
//! # Available Commands
//!
//! - `watershed` - Fetch the basin boundary of a hydrologic unit from the NLDI
//! - `zonal` - Compute zonal statistics of an Earth Engine image over features
//! - `to-fc` - Reproject local features and build a remote feature collection

mod display;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use mwqm_core::config::{DEFAULT_EARTH_ENGINE_URL, DEFAULT_NLDI_URL};
use mwqm_core::error::IoErrorExt;
use mwqm_core::expression::Expression;
use mwqm_core::{
    EarthEngine, EarthEngineConfig, FeatureConverter, MwqmError, NldiConfig, ReqwestTransport,
    WatershedFetcher, ZonalInput, ZonalRetriever, ZonalTask,
};
use mwqm_csv::{CsvWriterOptions, write_table};
use mwqm_geojson::{GeoJsonWriterOptions, parse_geojson_bytes, write_geojson};

/// Environment variable consulted when `--access-token` is not given.
const ACCESS_TOKEN_ENV: &str = "EARTHENGINE_TOKEN";

/// Rows printed for a zonal table when no output file is given.
const PREVIEW_ROWS: usize = 20;

#[derive(Parser)]
#[command(
    name = "mwqm",
    version,
    about = "Watershed boundaries and Earth Engine zonal statistics",
    long_about = "mwqm fetches watershed boundaries from the USGS NLDI and computes zonal\n\
                  statistics of Google Earth Engine imagery over vector features."
)]
/// Command-line arguments and options for the `mwqm` CLI.
///
/// This struct defines the top-level CLI interface, including global flags for
/// logging verbosity and the subcommand to execute.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `mwqm` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Fetches the basin boundary of a hydrologic unit code (HUC8, HUC10 or HUC12).
    ///
    /// Failures are diagnosed with an existence probe and reported; they never
    /// abort the command.
    Watershed {
        /// The hydrologic unit code, with leading zeros.
        #[arg(value_name = "HUC")]
        huc: String,

        /// Write the boundary as `GeoJSON` to this path.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Pretty-print the `GeoJSON` output.
        #[arg(long)]
        pretty: bool,

        /// Base URL of the NLDI hydrologic unit endpoints.
        #[arg(long, value_name = "URL", default_value = DEFAULT_NLDI_URL)]
        nldi_url: String,
    },

    /// Computes zonal statistics of an Earth Engine image over vector features.
    ///
    /// The features are a `GeoJSON` `FeatureCollection`, a serialized expression
    /// graph or `{"asset": "<table id>"}`; the task is a JSON object with `label`,
    /// `band`, `image_id`, `stat` and `is_group` keys.
    Zonal {
        /// Path to the features JSON document.
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the task JSON document.
        #[arg(short, long, value_name = "FILE")]
        task: PathBuf,

        /// Write the statistics table as CSV to this path.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory for the intermediate CSV file.
        #[arg(long, value_name = "DIR", default_value = ".")]
        tmp_dir: PathBuf,

        /// Google Cloud project registered with Earth Engine.
        #[arg(long)]
        project: String,

        /// `OAuth2` access token (default: the `EARTHENGINE_TOKEN` variable).
        #[arg(long, value_name = "TOKEN")]
        access_token: Option<String>,

        /// Base URL of the Earth Engine REST API.
        #[arg(long, value_name = "URL", default_value = DEFAULT_EARTH_ENGINE_URL)]
        earthengine_url: String,
    },

    /// Reprojects local features to EPSG:4326 and builds a remote feature collection.
    ///
    /// Features that cannot be converted are dropped and listed.
    ToFc {
        /// Path to the input `GeoJSON` dataset.
        #[arg(value_name = "DATASET")]
        input: PathBuf,

        /// Write the feature collection expression as JSON to this path.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Entry point for the `mwqm` command-line interface.
///
/// # Errors
///
/// Returns an error if the logging system cannot be initialized. Command
/// failures are printed and end the process with exit code 1.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true) // Show module paths for better context
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let outcome = match cli.command {
        Commands::Watershed {
            huc,
            output,
            pretty,
            nldi_url,
        } => {
            info!("Fetching watershed for HUC {huc}");
            handle_watershed(&huc, output.as_deref(), pretty, nldi_url)
        },
        Commands::Zonal {
            input,
            task,
            output,
            tmp_dir,
            project,
            access_token,
            earthengine_url,
        } => {
            info!("Computing zonal statistics for {}", input.display());
            let config = EarthEngineConfig::new(project).with_base_url(earthengine_url);
            let config = match access_token.or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok()) {
                Some(token) => config.with_access_token(token),
                None => config,
            };
            handle_zonal(&input, &task, output.as_deref(), &tmp_dir, config)
        },
        Commands::ToFc { input, output } => {
            info!("Converting {}", input.display());
            handle_to_fc(&input, output.as_deref())
        },
    };

    if let Err(err) = outcome {
        report(&err);
        std::process::exit(1);
    }

    Ok(())
}

fn report(err: &MwqmError) {
    eprintln!("Error: {}", err.user_message());
    if let Some(suggestion) = err.recovery_suggestion() {
        eprintln!("Hint: {suggestion}");
    }
}

fn handle_watershed(
    huc: &str,
    output: Option<&Path>,
    pretty: bool,
    nldi_url: String,
) -> mwqm_core::Result<()> {
    let config = NldiConfig::default().with_base_url(nldi_url);
    config.validate()?;

    let fetcher = WatershedFetcher::new(config, ReqwestTransport::new());
    let lookup = fetcher.lookup(huc)?;
    display::display_watershed(huc, &lookup);

    if let Some(path) = output {
        if !lookup.is_found() {
            warn!("Writing an empty boundary for HUC {huc}");
        }
        let boundary = lookup.into_boundary();
        let mut file = File::create(path).with_write_context("GeoJSON", path)?;
        write_geojson(
            &mut file,
            &boundary,
            &GeoJsonWriterOptions::new().with_pretty_print(pretty),
        )?;
        info!("Boundary written to {}", path.display());
    }
    Ok(())
}

fn handle_zonal(
    input: &Path,
    task: &Path,
    output: Option<&Path>,
    tmp_dir: &Path,
    config: EarthEngineConfig,
) -> mwqm_core::Result<()> {
    let features: serde_json::Value = read_json(input)?;
    let features = ZonalInput::try_from(features)?;
    let task: ZonalTask = read_json(task)?;
    config.validate()?;

    let earth_engine = EarthEngine::new(config, ReqwestTransport::new());
    let retriever = ZonalRetriever::new(&earth_engine, &earth_engine);
    let table = retriever.retrieve(features, &task, tmp_dir)?;

    match output {
        Some(path) => {
            let mut file = File::create(path).with_write_context("CSV", path)?;
            write_table(&mut file, &table, &CsvWriterOptions::default())?;
            info!("Statistics written to {}", path.display());
        },
        None => display::display_table(&table, PREVIEW_ROWS),
    }
    Ok(())
}

fn handle_to_fc(input: &Path, output: Option<&Path>) -> mwqm_core::Result<()> {
    let bytes = fs::read(input).with_read_context("GeoJSON", input)?;
    let features = parse_geojson_bytes(&bytes, input.display().to_string())?;

    let report = FeatureConverter::default().convert(&features)?;
    display::display_conversion(report.features.len(), &report.diagnostics);

    if let Some(path) = output {
        let expression = Expression::from_node(report.into_collection().to_node()?);
        let file = File::create(path).with_write_context("JSON", path)?;
        serde_json::to_writer_pretty(file, &expression).with_write_context("JSON", path)?;
        info!("Feature collection written to {}", path.display());
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> mwqm_core::Result<T> {
    let bytes = fs::read(path).with_read_context("JSON", path)?;
    serde_json::from_slice(&bytes).with_read_context("JSON", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwqm_core::error::InputError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_handle_watershed_rejects_short_huc() {
        let result = handle_watershed("0102", None, false, DEFAULT_NLDI_URL.to_string());
        assert!(matches!(
            result,
            Err(MwqmError::Input(InputError::InvalidHucLength { length: 4, .. }))
        ));
    }

    #[test]
    fn test_handle_watershed_rejects_bad_url() {
        let result = handle_watershed("01020003", None, false, "not a url".to_string());
        assert!(matches!(result, Err(MwqmError::Config(_))));
    }

    #[test]
    fn test_handle_zonal_rejects_task_without_image() {
        let features = json_file(r#"{"type": "FeatureCollection", "features": []}"#);
        let task = json_file(r#"{"label": "water", "band": "occurrence"}"#);
        let dir = tempfile::tempdir().unwrap();

        let result = handle_zonal(
            features.path(),
            task.path(),
            None,
            dir.path(),
            EarthEngineConfig::new("demo"),
        );
        assert!(matches!(
            result,
            Err(MwqmError::Input(InputError::MissingImageReference { .. }))
        ));
    }

    #[test]
    fn test_handle_zonal_rejects_sequence_input() {
        let features = json_file("[[0.0, 0.0], [1.0, 1.0]]");
        let task = json_file(r#"{"label": "water", "band": "occurrence", "image_id": "x"}"#);
        let dir = tempfile::tempdir().unwrap();

        let result = handle_zonal(
            features.path(),
            task.path(),
            None,
            dir.path(),
            EarthEngineConfig::new("demo"),
        );
        assert!(matches!(
            result,
            Err(MwqmError::Input(InputError::InvalidInputKind { .. }))
        ));
    }

    #[test]
    fn test_handle_to_fc_writes_expression() {
        let input = json_file(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"id": 1},
                 "geometry": {"type": "Point", "coordinates": [-70.0, 43.0]}},
                {"type": "Feature", "properties": {"id": 2}, "geometry": null}
            ]}"#,
        );
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("fc.json");

        handle_to_fc(input.path(), Some(&output)).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["result"], "0");
        let text = written.to_string();
        assert!(text.contains("GeometryConstructors.Point"));
    }

    #[test]
    fn test_handle_to_fc_refuses_unreadable_crs() {
        let input = json_file(
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "ESRI:102003"}},
                "features": [{"type": "Feature", "properties": {"id": 1},
                  "geometry": {"type": "Point", "coordinates": [1500000.0, 2000000.0]}}]}"#,
        );
        let result = handle_to_fc(input.path(), None);
        assert!(matches!(result, Err(MwqmError::Format(_))));
    }

    #[test]
    fn test_handle_to_fc_missing_file() {
        let result = handle_to_fc(Path::new("does-not-exist.geojson"), None);
        assert!(matches!(result, Err(MwqmError::Io(_))));
    }
}
