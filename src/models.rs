//! Data types and associated functions and methods

use crate::error::DataServerError;
use crate::feature::{Feature, FeatureToken};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Variable served when a request does not name one.
pub const DEFAULT_VARIABLE: &str = "mean_values";

fn default_variable() -> String {
    DEFAULT_VARIABLE.to_string()
}

/// Spatial selection for a time series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    /// The grid cell nearest to a point
    Point { lon: f64, lat: f64 },
    /// All grid cells within a longitude/latitude box
    BoundingBox {
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
    },
}

/// Request for a 2-D map of one feature at one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct MapRequest {
    pub variable: String,
    pub feature: Option<FeatureToken>,
    /// 0-based time ordinal
    pub time: usize,
}

/// Request for a time series of one feature at a point or over a region.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesRequest {
    pub variable: String,
    pub feature: Option<FeatureToken>,
    pub selection: Selection,
    /// First 0-based time ordinal of the window
    pub start_time: i64,
    /// Last 0-based time ordinal of the window, inclusive. Defaults to the last time step.
    pub end_time: Option<i64>,
}

/// Request for the list of features of a variable.
#[derive(Clone, Debug, PartialEq)]
pub struct FeaturesRequest {
    pub variable: String,
}

/// Requests that name a dataset variable.
pub trait VariableRequest {
    fn variable(&self) -> &str;
}

impl VariableRequest for MapRequest {
    fn variable(&self) -> &str {
        &self.variable
    }
}

impl VariableRequest for SeriesRequest {
    fn variable(&self) -> &str {
        &self.variable
    }
}

impl VariableRequest for FeaturesRequest {
    fn variable(&self) -> &str {
        &self.variable
    }
}

/// A 2-D map ready for transport.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MapResult {
    /// Latitudes, strictly ascending
    pub lats: Vec<f64>,
    /// Longitudes in storage order
    pub lons: Vec<f64>,
    /// Rows follow `lats`, columns follow `lons`
    pub grid: Vec<Vec<Option<f64>>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Resolved feature name
    pub feature: String,
}

/// A time series ready for transport.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResult {
    pub times: Vec<i64>,
    pub values: Vec<Option<f64>>,
    /// `None` only for region steps without finite cells
    pub standard_error: Vec<Option<f64>>,
    pub trend: Vec<Option<f64>>,
    /// Resolved feature name
    pub feature: String,
}

/// Features of a variable, serialised as an ordered `name -> display name` map.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureList(pub Vec<Feature>);

impl Serialize for FeatureList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for feature in &self.0 {
            map.serialize_entry(&feature.name, &feature.name)?;
        }
        map.end()
    }
}

/// Query parameters of the map endpoints.
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct MapQuery {
    /// Variable name
    #[serde(default = "default_variable")]
    #[validate(length(min = 1, message = "variable must not be empty"))]
    pub variable: String,
    /// 0-based month index
    #[serde(default, alias = "timeIndex")]
    pub time: usize,
    /// Feature name or 0-based index
    pub feature: Option<FeatureToken>,
}

impl From<MapQuery> for MapRequest {
    fn from(query: MapQuery) -> Self {
        Self {
            variable: query.variable,
            feature: query.feature,
            time: query.time,
        }
    }
}

/// Query parameters of the line (time series) endpoint.
///
/// Coordinates follow the client's convention of `x` for longitude and `y` for latitude.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_series_query"))]
pub struct SeriesQuery {
    /// Variable name
    #[serde(default = "default_variable")]
    #[validate(length(min = 1, message = "variable must not be empty"))]
    pub variable: String,
    /// Feature name or 0-based index
    pub feature: Option<FeatureToken>,
    /// Point longitude
    pub x: Option<f64>,
    /// Point latitude
    pub y: Option<f64>,
    #[serde(rename = "xMin")]
    pub x_min: Option<f64>,
    #[serde(rename = "xMax")]
    pub x_max: Option<f64>,
    #[serde(rename = "yMin")]
    pub y_min: Option<f64>,
    #[serde(rename = "yMax")]
    pub y_max: Option<f64>,
    /// First 0-based month of the window
    #[serde(rename = "startMonth", default)]
    pub start_month: i64,
    /// Last 0-based month of the window, inclusive
    #[serde(rename = "endMonth")]
    pub end_month: Option<i64>,
}

impl SeriesQuery {
    /// The spatial selection, if one is complete. A point takes precedence over a box.
    pub fn selection(&self) -> Option<Selection> {
        match (self.x, self.y, self.x_min, self.x_max, self.y_min, self.y_max) {
            (Some(lon), Some(lat), ..) => Some(Selection::Point { lon, lat }),
            (_, _, Some(lon_min), Some(lon_max), Some(lat_min), Some(lat_max)) => {
                Some(Selection::BoundingBox {
                    lon_min,
                    lon_max,
                    lat_min,
                    lat_max,
                })
            }
            _ => None,
        }
    }
}

impl TryFrom<SeriesQuery> for SeriesRequest {
    type Error = DataServerError;

    fn try_from(query: SeriesQuery) -> Result<Self, Self::Error> {
        let selection = query.selection().ok_or_else(|| {
            DataServerError::invalid_range(
                "Must provide either a point (x,y) or an area (xMin,xMax,yMin,yMax)",
            )
        })?;
        Ok(Self {
            variable: query.variable,
            feature: query.feature,
            selection,
            start_time: query.start_month,
            end_time: query.end_month,
        })
    }
}

/// Validate that all supplied coordinates are finite numbers.
fn validate_series_query(query: &SeriesQuery) -> Result<(), ValidationError> {
    let coords = [
        ("x", query.x),
        ("y", query.y),
        ("xMin", query.x_min),
        ("xMax", query.x_max),
        ("yMin", query.y_min),
        ("yMax", query.y_max),
    ];
    for (name, value) in coords {
        if let Some(value) = value {
            if !value.is_finite() {
                let mut error = ValidationError::new("Coordinates must be finite numbers");
                error.add_param(name.into(), &value.to_string());
                return Err(error);
            }
        }
    }
    Ok(())
}

/// Query parameters of the features endpoint.
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct FeaturesQuery {
    /// Variable name
    #[serde(default = "default_variable")]
    #[validate(length(min = 1, message = "variable must not be empty"))]
    pub variable: String,
}

impl From<FeaturesQuery> for FeaturesRequest {
    fn from(query: FeaturesQuery) -> Self {
        Self {
            variable: query.variable,
        }
    }
}
