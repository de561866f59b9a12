//! Custom error types for `mwqm` operations.
//!
//! Validation failures at call entry (bad input kind, missing image, bad HUC
//! length) are fatal and surface as [`MwqmError`]. Per-row conversion
//! failures are collected as [`FeatureConversionError`] diagnostics instead,
//! and watershed lookups fold transport failures into their outcome.

use std::path::PathBuf;

use mwqm_core_common::TableError;
use mwqm_formats_shared::FormatReadError;
use thiserror::Error;

use crate::transport::TransportError;

/// Main error type for `mwqm` operations.
#[derive(Debug, Error)]
pub enum MwqmError {
    /// Caller supplied arguments that can never succeed
    #[error(transparent)]
    Input(#[from] InputError),

    /// Remote service failures (network, HTTP status, response shape)
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Coordinate reprojection failures
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// File I/O errors around the staged CSV file
    #[error(transparent)]
    Io(#[from] IoError),

    /// CSV / `GeoJSON` parsing and encoding errors
    #[error(transparent)]
    Format(#[from] FormatReadError),

    /// Table shape errors (duplicate or ragged columns)
    #[error(transparent)]
    Table(#[from] TableError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid arguments, detected before any remote call.
#[derive(Debug, Error)]
pub enum InputError {
    /// Retrieval input is neither a local feature set nor a remote collection
    #[error("features must be a GeoJSON FeatureCollection or a remote feature collection, found {found}")]
    InvalidInputKind {
        /// Description of what was supplied
        found: String,
    },

    /// Task names neither `image` nor `image_id`
    #[error("task '{label}' must contain either an 'image' or 'image_id' key")]
    MissingImageReference {
        /// The task label
        label: String,
    },

    /// Task names both `image` and `image_id`
    #[error("task '{label}' must contain only one of 'image' and 'image_id'")]
    ConflictingImageReference {
        /// The task label
        label: String,
    },

    /// HUC code length outside the configured set
    #[error("HUC '{huc}' has length {length}; expected one of {allowed}")]
    InvalidHucLength {
        /// The rejected HUC
        huc: String,
        /// Its length in characters
        length: usize,
        /// Comma-separated allowed lengths
        allowed: String,
    },

    /// Statistic name not understood for the requested aggregation mode
    #[error("unknown {mode} statistic '{stat}'; expected one of {expected}")]
    UnknownStatistic {
        /// The rejected name
        stat: String,
        /// "grouped" or "ungrouped"
        mode: &'static str,
        /// Comma-separated accepted names
        expected: String,
    },
}

/// Failures talking to a remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// The underlying transport failure
        #[source]
        source: TransportError,
    },

    /// The service answered with a non-success status
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body did not have the expected shape
    #[error("unexpected response from {url}: {message}")]
    Parse {
        /// Requested URL
        url: String,
        /// What was wrong
        message: String,
    },

    /// A serialized expression graph could not be resolved
    #[error("invalid expression: {message}")]
    Expression {
        /// What was wrong
        message: String,
    },
}

/// Reprojection failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// No PROJ definition is known for the code
    #[error("EPSG:{epsg} is not in the crs-definitions database")]
    UnknownCrs {
        /// The EPSG code
        epsg: u16,
    },

    /// A PROJ definition could not be instantiated
    #[error("invalid projection EPSG:{epsg}: {message}")]
    InvalidDefinition {
        /// The EPSG code
        epsg: u16,
        /// Reported problem
        message: String,
    },

    /// A coordinate could not be transformed
    #[error("transform from EPSG:{from} to EPSG:{to} failed for ({x}, {y}): {message}")]
    Transform {
        /// Source EPSG code
        from: u16,
        /// Target EPSG code
        to: u16,
        /// Input x
        x: f64,
        /// Input y
        y: f64,
        /// Reported problem
        message: String,
    },
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g., "CSV", "`GeoJSON`")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to delete a staged file
    #[error("Failed to remove '{path}': {source}")]
    Remove {
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },
}

/// A single input row that could not become a remote feature.
///
/// These are diagnostics, not failures: the row is dropped and conversion
/// carries on with the rest.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("feature {index} is invalid: {message}")]
pub struct FeatureConversionError {
    /// Position of the row in the input set
    pub index: usize,
    /// What went wrong
    pub message: String,
}

/// Type alias for Results using `MwqmError`.
pub type Result<T> = std::result::Result<T, MwqmError>;

impl MwqmError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(e) => format!("Invalid input: {e}"),
            Self::Remote(e) => format!("Remote service error: {e}"),
            Self::Projection(e) => format!("Projection error: {e}"),
            Self::Io(e) => e.user_message(),
            Self::Format(e) => format!("Format error: {e}"),
            Self::Table(e) => format!("Table error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Input(InputError::InvalidHucLength { allowed, .. }) => Some(format!(
                "HUC codes are {allowed} digits long; check for dropped leading zeros."
            )),
            Self::Input(InputError::MissingImageReference { .. }) => {
                Some("Add an 'image_id' such as \"JRC/GSW1_4/GlobalSurfaceWater\".".to_string())
            },
            Self::Remote(RemoteError::Status { status: 401 | 403, .. }) => {
                Some("Check the access token and the Earth Engine project.".to_string())
            },
            Self::Projection(ProjectionError::UnknownCrs { .. }) => {
                Some("Reproject the input to a common EPSG code before loading it.".to_string())
            },
            Self::Io(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::Write { format, path, .. } => {
                format!("Failed to write {} file: {}", format, path.display())
            },
            Self::Remove { path, .. } => format!("Failed to remove file: {}", path.display()),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Write { .. } | Self::Remove { .. } => {
                Some("Check that the temporary directory exists and is writable.".to_string())
            },
            Self::Read { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
        }
    }
}

/// Extension trait for adding I/O context to errors.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            MwqmError::Io(IoError::Read {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_write_context(self, format: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            MwqmError::Io(IoError::Write {
                format: format.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}
