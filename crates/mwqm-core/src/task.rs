//! Zonal task descriptors and the statistics they request.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{InputError, MwqmError, Result};
use crate::remote::RemoteImage;

/// Statistic used when a task names none.
pub const DEFAULT_STAT: &str = "mean";

/// One aggregation per feature over the selected band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    Median,
    Min,
    Max,
    Sum,
    StdDev,
    Variance,
    Count,
    MinMax,
}

impl Statistic {
    const NAMES: &'static str =
        "mean, median, min, minimum, max, maximum, sum, std, stddev, variance, count, min_max";

    /// Server-side reducer constructor.
    #[must_use]
    pub fn reducer_function(self) -> &'static str {
        match self {
            Self::Mean => "Reducer.mean",
            Self::Median => "Reducer.median",
            Self::Min => "Reducer.min",
            Self::Max => "Reducer.max",
            Self::Sum => "Reducer.sum",
            Self::StdDev => "Reducer.stdDev",
            Self::Variance => "Reducer.variance",
            Self::Count => "Reducer.count",
            Self::MinMax => "Reducer.minMax",
        }
    }
}

impl FromStr for Statistic {
    type Err = MwqmError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Self::Mean,
            "median" => Self::Median,
            "min" | "minimum" => Self::Min,
            "max" | "maximum" => Self::Max,
            "sum" => Self::Sum,
            "std" | "stddev" | "std_dev" => Self::StdDev,
            "variance" => Self::Variance,
            "count" => Self::Count,
            "min_max" | "minmax" => Self::MinMax,
            _ => {
                return Err(InputError::UnknownStatistic {
                    stat: s.to_string(),
                    mode: "ungrouped",
                    expected: Self::NAMES.to_string(),
                }
                .into());
            },
        })
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::StdDev => "stddev",
            Self::Variance => "variance",
            Self::Count => "count",
            Self::MinMax => "min_max",
        };
        f.write_str(name)
    }
}

/// How per-class pixel tallies are reported in grouped mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupStatistic {
    /// Pixel count per class
    Sum,
    /// Share of the feature's pixels per class
    Percentage,
}

impl FromStr for GroupStatistic {
    type Err = MwqmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "percentage" => Ok(Self::Percentage),
            _ => Err(InputError::UnknownStatistic {
                stat: s.to_string(),
                mode: "grouped",
                expected: "sum, percentage".to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for GroupStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sum => "sum",
            Self::Percentage => "percentage",
        })
    }
}

/// Grouped or ungrouped aggregation, with its statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    Ungrouped(Statistic),
    Grouped(GroupStatistic),
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ungrouped(stat) => write!(f, "{stat}"),
            Self::Grouped(stat) => write!(f, "grouped {stat}"),
        }
    }
}

/// What to compute for each feature and how to name the result columns.
///
/// Exactly one of `image` and `image_id` must be set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZonalTask {
    /// Output column prefix and temp file stem
    pub label: String,
    /// Band to aggregate
    pub band: String,
    /// Prebuilt image expression
    #[serde(default)]
    pub image: Option<RemoteImage>,
    /// Image asset id, e.g. `JRC/GSW1_4/GlobalSurfaceWater`
    #[serde(default)]
    pub image_id: Option<String>,
    /// Statistic name; "mean" when ungrouped, "sum" when grouped
    #[serde(default)]
    pub stat: Option<String>,
    /// Tally pixels per class value instead of reducing them
    #[serde(default)]
    pub is_group: bool,
    /// Nominal scale in metres
    #[serde(default)]
    pub scale: Option<f64>,
}

impl ZonalTask {
    #[must_use]
    pub fn new(label: impl Into<String>, band: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            band: band.into(),
            image: None,
            image_id: None,
            stat: None,
            is_group: false,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_image_id(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: RemoteImage) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_stat(mut self, stat: impl Into<String>) -> Self {
        self.stat = Some(stat.into());
        self
    }

    #[must_use]
    pub fn grouped(mut self, is_group: bool) -> Self {
        self.is_group = is_group;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// The image to aggregate, before clipping and band selection.
    ///
    /// # Errors
    ///
    /// [`InputError::MissingImageReference`] when neither field is set,
    /// [`InputError::ConflictingImageReference`] when both are.
    pub fn image_reference(&self) -> Result<RemoteImage> {
        match (&self.image, &self.image_id) {
            (Some(image), None) => Ok(image.clone()),
            (None, Some(id)) => Ok(RemoteImage::load(id.as_str())),
            (None, None) => Err(InputError::MissingImageReference {
                label: self.label.clone(),
            }
            .into()),
            (Some(_), Some(_)) => Err(InputError::ConflictingImageReference {
                label: self.label.clone(),
            }
            .into()),
        }
    }

    /// # Errors
    ///
    /// Returns [`InputError::UnknownStatistic`] for a name the selected mode
    /// does not support.
    pub fn aggregation(&self) -> Result<Aggregation> {
        if self.is_group {
            let stat = self.stat.as_deref().unwrap_or("sum");
            Ok(Aggregation::Grouped(stat.parse()?))
        } else {
            let stat = self.stat.as_deref().unwrap_or(DEFAULT_STAT);
            Ok(Aggregation::Ungrouped(stat.parse()?))
        }
    }
}
