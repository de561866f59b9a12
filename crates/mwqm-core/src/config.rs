//! Immutable configuration values handed to each component at construction.

use std::collections::BTreeSet;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};

/// Default NLDI hydrologic unit endpoint.
pub const DEFAULT_NLDI_URL: &str = "https://api.water.usgs.gov/nldi/linked-data/huc";

/// Default Earth Engine REST root.
pub const DEFAULT_EARTH_ENGINE_URL: &str = "https://earthengine.googleapis.com/v1";

/// EPSG code of geographic WGS 84.
pub const GEOGRAPHIC_EPSG: u16 = 4326;

/// Settings for the watershed boundary fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NldiConfig {
    /// Prefix to which `{len}pp/{huc}` is appended
    pub base_url: String,
    /// CRS the returned boundaries are tagged with
    pub crs_epsg: u16,
    /// Accepted HUC lengths
    pub huc_lengths: BTreeSet<usize>,
}

impl Default for NldiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NLDI_URL.to_string(),
            crs_epsg: GEOGRAPHIC_EPSG,
            huc_lengths: [8, 10, 12].into_iter().collect(),
        }
    }
}

impl NldiConfig {
    /// Replace the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Comma-separated accepted lengths, for messages.
    #[must_use]
    pub fn allowed_lengths(&self) -> String {
        self.huc_lengths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check that the base URL parses and at least one HUC length is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        validate_url("nldi base_url", &self.base_url)?;
        if self.huc_lengths.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "huc_lengths".to_string(),
                message: "at least one HUC length must be allowed".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Settings for the Earth Engine REST collaborator.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EarthEngineConfig {
    /// REST root, e.g. `https://earthengine.googleapis.com/v1`
    pub base_url: String,
    /// Cloud project billed for the computation
    pub project: String,
    /// Bearer token sent as-is
    pub access_token: Option<String>,
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EARTH_ENGINE_URL.to_string(),
            project: String::new(),
            access_token: None,
        }
    }
}

// Keep the token out of debug logs.
impl std::fmt::Debug for EarthEngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthEngineConfig")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EarthEngineConfig {
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// `{base_url}/projects/{project}/table:computeFeatures`
    #[must_use]
    pub fn compute_features_url(&self) -> String {
        format!(
            "{}/projects/{}/table:computeFeatures",
            self.base_url.trim_end_matches('/'),
            self.project
        )
    }

    /// # Errors
    ///
    /// Returns a config error for an unparsable base URL or an empty project.
    pub fn validate(&self) -> Result<()> {
        validate_url("earth engine base_url", &self.base_url)?;
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                option: "project".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Settings for the feature converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// CRS every converted geometry is expressed in
    pub target_epsg: u16,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            target_epsg: GEOGRAPHIC_EPSG,
        }
    }
}

fn validate_url(option: &str, value: &str) -> Result<()> {
    Url::parse(value).map_err(|err| ConfigError::InvalidOption {
        option: option.to_string(),
        message: format!("'{value}' is not a valid URL: {err}"),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nldi_defaults() {
        let config = NldiConfig::default();
        assert_eq!(config.base_url, DEFAULT_NLDI_URL);
        assert_eq!(config.crs_epsg, 4326);
        assert_eq!(config.allowed_lengths(), "8, 10, 12");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nldi_rejects_bad_url() {
        let config = NldiConfig::default().with_base_url("not a url");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nldi base_url"));
    }

    #[test]
    fn nldi_rejects_empty_lengths() {
        let config = NldiConfig {
            huc_lengths: BTreeSet::new(),
            ..NldiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nldi_partial_json_keeps_defaults() {
        let config: NldiConfig =
            serde_json::from_str(r#"{"base_url": "http://localhost:8080/huc"}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/huc");
        assert_eq!(config.huc_lengths.len(), 3);
    }

    #[test]
    fn earth_engine_url_and_redaction() {
        let config = EarthEngineConfig::new("my-project")
            .with_base_url("https://ee.example/v1/")
            .with_access_token("secret");
        assert_eq!(
            config.compute_features_url(),
            "https://ee.example/v1/projects/my-project/table:computeFeatures"
        );
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn earth_engine_requires_project() {
        let err = EarthEngineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("project"));
    }
}
