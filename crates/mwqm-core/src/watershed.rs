//! Watershed Boundary Fetcher backed by the USGS NLDI API.
//!
//! `lookup` reports exactly why a boundary could not be returned, `fetch`
//! collapses every failure into an empty feature set. Only an invalid HUC
//! length is an error.

use log::{info, warn};
use mwqm_core_common::{Crs, VectorFeatureSet};
use mwqm_geojson::parse_feature_collection;

use crate::config::NldiConfig;
use crate::error::{InputError, Result};
use crate::transport::HttpTransport;

/// Outcome of one boundary lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum WatershedLookup {
    /// The basin was returned and parsed
    Found(VectorFeatureSet),
    /// The HUC is known but the basin request failed
    BasinUnavailable {
        /// Why the basin request failed
        reason: String,
    },
    /// The probe did not find the HUC
    NotFound {
        /// Why the basin request failed
        reason: String,
        /// Status of the probe request
        status: u16,
    },
    /// The probe itself got no response
    ProbeFailed {
        /// Why the basin request failed
        reason: String,
        /// Why the probe failed
        error: String,
    },
    /// The basin response was not a usable feature collection
    ParseFailed {
        /// Parser message
        error: String,
    },
}

impl WatershedLookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The boundary, or an empty set for every failure.
    #[must_use]
    pub fn into_boundary(self) -> VectorFeatureSet {
        match self {
            Self::Found(set) => set,
            _ => VectorFeatureSet::empty(),
        }
    }
}

/// Fetches basin polygons for hydrologic unit codes.
#[derive(Debug, Clone)]
pub struct WatershedFetcher<T> {
    config: NldiConfig,
    transport: T,
}

impl<T: HttpTransport> WatershedFetcher<T> {
    pub fn new(config: NldiConfig, transport: T) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &NldiConfig {
        &self.config
    }

    /// `{base}{len}pp/{huc}/basin`
    #[must_use]
    pub fn basin_url(&self, huc: &str) -> String {
        format!("{}/basin", self.probe_url(huc))
    }

    /// `{base}{len}pp/{huc}`
    #[must_use]
    pub fn probe_url(&self, huc: &str) -> String {
        format!("{}{}pp/{huc}", self.config.base_url, huc.chars().count())
    }

    /// Check the HUC length against the configured set.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidHucLength`].
    pub fn check_huc(&self, huc: &str) -> Result<usize> {
        let length = huc.chars().count();
        if self.config.huc_lengths.contains(&length) {
            Ok(length)
        } else {
            Err(InputError::InvalidHucLength {
                huc: huc.to_string(),
                length,
                allowed: self.config.allowed_lengths(),
            }
            .into())
        }
    }

    /// Request the basin for `huc`, probing the HUC itself on failure.
    ///
    /// # Errors
    ///
    /// Only for an invalid HUC length; network and parse failures are
    /// reported through the returned [`WatershedLookup`].
    pub fn lookup(&self, huc: &str) -> Result<WatershedLookup> {
        self.check_huc(huc)?;
        let url = self.basin_url(huc);
        info!("Requesting: {url}");

        let reason = match self.transport.get(&url) {
            Ok(response) if response.is_success() => {
                return Ok(self.parse_basin(huc, &url, &response.body));
            },
            Ok(response) => format!("HTTP {} from {url}", response.status),
            Err(err) => err.to_string(),
        };
        warn!("Error making request for HUC {huc}: {reason}");
        Ok(self.probe(huc, reason))
    }

    /// [`WatershedFetcher::lookup`] with failures collapsed to an empty set.
    ///
    /// # Errors
    ///
    /// Only for an invalid HUC length.
    pub fn fetch(&self, huc: &str) -> Result<VectorFeatureSet> {
        self.lookup(huc).map(WatershedLookup::into_boundary)
    }

    fn parse_basin(&self, huc: &str, url: &str, body: &[u8]) -> WatershedLookup {
        match parse_feature_collection(body, url) {
            Ok(mut set) => {
                set.set_crs(Crs::epsg(self.config.crs_epsg));
                info!("HUC {huc}: {} boundary feature(s)", set.len());
                WatershedLookup::Found(set)
            },
            Err(err) => {
                warn!("Error parsing response for HUC {huc}: {err}");
                WatershedLookup::ParseFailed {
                    error: err.to_string(),
                }
            },
        }
    }

    fn probe(&self, huc: &str, reason: String) -> WatershedLookup {
        match self.transport.get(&self.probe_url(huc)) {
            Ok(response) if response.status == 200 => {
                warn!("HUC {huc} exists in the system, but basin data is not available");
                WatershedLookup::BasinUnavailable { reason }
            },
            Ok(response) => {
                warn!(
                    "HUC {huc} does not exist in the NLDI system (status code: {})",
                    response.status
                );
                WatershedLookup::NotFound {
                    reason,
                    status: response.status,
                }
            },
            Err(err) => {
                warn!("Error checking HUC existence: {err}");
                WatershedLookup::ProbeFailed {
                    reason,
                    error: err.to_string(),
                }
            },
        }
    }
}
