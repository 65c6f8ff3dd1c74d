//! Data extraction operations.
//!
//! Each operation is implemented as a struct that implements the
//! [Operation](crate::operation::Operation) trait.

use std::ops::Range;

use crate::array::{self, FiniteStats};
use crate::dataset::{
    Dataset, DimSelection, VariableInfo, FEATURE, LATITUDE, LONGITUDE, TIME,
};
use crate::error::DataServerError;
use crate::feature::FeatureCatalog;
use crate::models::{self, Selection};
use crate::operation::Operation;
use crate::transport::{self, MAP_DECIMALS, SERIES_DECIMALS};
use crate::trend;

use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_stats::QuantileExt;

/// Delta degrees of freedom of the spatial standard deviation of a region.
const REGION_DDOF: f64 = 0.0;

/// Returns the values of a coordinate, checking that they match the variable's dimension.
fn coordinate_for(
    dataset: &dyn Dataset,
    info: &VariableInfo,
    name: &str,
) -> Result<Vec<f64>, DataServerError> {
    let len = info.require_dimension(name)?;
    let coords = dataset.coordinate(name)?;
    if coords.len() != len {
        return Err(DataServerError::malformed(format!(
            "coordinate '{}' has {} values but variable '{}' has {} along it",
            name,
            coords.len(),
            info.name,
            len
        )));
    }
    Ok(coords)
}

/// Resolve a requested time window against the number of time steps.
///
/// The end defaults to, and is clamped to, the last time step. Returns the half-open range of
/// time indices.
fn time_window(
    start: i64,
    end: Option<i64>,
    len: usize,
) -> Result<Range<usize>, DataServerError> {
    let last = len as i64 - 1;
    let end = match end {
        Some(end) if end < last => end,
        _ => last,
    };
    if start < 0 || start > end {
        return Err(DataServerError::invalid_range(format!(
            "Invalid startMonth/endMonth range: start {}, end {}",
            start, end
        )));
    }
    Ok(start as usize..end as usize + 1)
}

/// Return a latitude x longitude map of one feature at one time step.
///
/// Rows are reordered so that latitudes ascend.
pub struct GetMap {}

impl Operation for GetMap {
    type Request = models::MapRequest;
    type Response = models::MapResult;
    const NAME: &'static str = "map";

    fn execute(
        dataset: &dyn Dataset,
        request: &Self::Request,
    ) -> Result<Self::Response, DataServerError> {
        let info = dataset.variable(&request.variable)?;
        let feature = FeatureCatalog::from_variable(&info).resolve(request.feature.as_ref())?;
        let lats = coordinate_for(dataset, &info, LATITUDE)?;
        let lons = coordinate_for(dataset, &info, LONGITUDE)?;

        let slice: Array2<f64> = dataset
            .read(
                &request.variable,
                &[
                    (FEATURE, DimSelection::Index(feature.index)),
                    (TIME, DimSelection::Index(request.time)),
                ],
            )?
            .into_order(&[LATITUDE, LONGITUDE])?;
        let masked = array::apply_mask(&slice, &info.mask);

        let order = array::ascending_order(&lats);
        let grid = masked.select(Axis(0), &order);
        let lats = order.iter().map(|index| lats[*index]).collect();

        Ok(models::MapResult {
            lats,
            lons,
            grid: grid
                .outer_iter()
                .map(|row| transport::rounded_all(row.iter().copied(), MAP_DECIMALS))
                .collect(),
            min: transport::rounded(*grid.min_skipnan(), MAP_DECIMALS),
            max: transport::rounded(*grid.max_skipnan(), MAP_DECIMALS),
            feature: feature.name,
        })
    }
}

/// Compute per time step statistics of the cells of a region.
///
/// `lat_indices` and `lon_indices` are storage indices of the selected cells.
fn region_stats(
    dataset: &dyn Dataset,
    info: &VariableInfo,
    feature: usize,
    window: Range<usize>,
    lat_indices: &[usize],
    lon_indices: &[usize],
) -> Result<Vec<FiniteStats>, DataServerError> {
    let (lat_lo, lat_hi, lon_lo, lon_hi) = match (
        lat_indices.iter().min(),
        lat_indices.iter().max(),
        lon_indices.iter().min(),
        lon_indices.iter().max(),
    ) {
        (Some(lat_lo), Some(lat_hi), Some(lon_lo), Some(lon_hi)) => {
            (*lat_lo, *lat_hi, *lon_lo, *lon_hi)
        }
        // Empty region.
        _ => {
            let empty = FiniteStats {
                mean: f64::NAN,
                std: f64::NAN,
            };
            return Ok(vec![empty; window.len()]);
        }
    };
    let region: Array3<f64> = dataset
        .read(
            &info.name,
            &[
                (FEATURE, DimSelection::Index(feature)),
                (TIME, DimSelection::Range(window)),
                (LATITUDE, DimSelection::Range(lat_lo..lat_hi + 1)),
                (LONGITUDE, DimSelection::Range(lon_lo..lon_hi + 1)),
            ],
        )?
        .into_order(&[TIME, LATITUDE, LONGITUDE])?;
    let lat_offsets: Vec<usize> = lat_indices.iter().map(|index| index - lat_lo).collect();
    let lon_offsets: Vec<usize> = lon_indices.iter().map(|index| index - lon_lo).collect();
    let region = region
        .select(Axis(1), &lat_offsets)
        .select(Axis(2), &lon_offsets);
    let region = array::apply_mask(&region, &info.mask);
    Ok(array::finite_stats_axis(&region, Axis(0), REGION_DDOF))
}

/// Return a time series of one feature at the grid cell nearest to a point, or aggregated over
/// a bounding box, with standard error and linear trend.
pub struct GetSeries {}

impl Operation for GetSeries {
    type Request = models::SeriesRequest;
    type Response = models::SeriesResult;
    const NAME: &'static str = "series";

    fn execute(
        dataset: &dyn Dataset,
        request: &Self::Request,
    ) -> Result<Self::Response, DataServerError> {
        let info = dataset.variable(&request.variable)?;
        let feature = FeatureCatalog::from_variable(&info).resolve(request.feature.as_ref())?;
        let window = time_window(
            request.start_time,
            request.end_time,
            info.require_dimension(TIME)?,
        )?;
        let lats = coordinate_for(dataset, &info, LATITUDE)?;
        let lons = coordinate_for(dataset, &info, LONGITUDE)?;
        let steps = window.len();

        let (values, std): (Vec<f64>, Vec<f64>) = match request.selection {
            Selection::Point { lon, lat } => {
                let empty = || DataServerError::malformed("empty coordinate");
                let lat_index = array::nearest_index(&lats, lat).ok_or_else(empty)?;
                let lon_index = array::nearest_index(&lons, lon).ok_or_else(empty)?;
                let series: Array1<f64> = dataset
                    .read(
                        &request.variable,
                        &[
                            (FEATURE, DimSelection::Index(feature.index)),
                            (TIME, DimSelection::Range(window.clone())),
                            (LATITUDE, DimSelection::Index(lat_index)),
                            (LONGITUDE, DimSelection::Index(lon_index)),
                        ],
                    )?
                    .into_order(&[TIME])?;
                let series = array::apply_mask(&series, &info.mask);
                (series.to_vec(), vec![0.0; steps])
            }
            Selection::BoundingBox {
                lon_min,
                lon_max,
                lat_min,
                lat_max,
            } => {
                let lat_indices =
                    array::indices_within(&lats, lat_min.min(lat_max), lat_min.max(lat_max));
                let lon_indices = array::indices_within(&lons, lon_min, lon_max);
                region_stats(
                    dataset,
                    &info,
                    feature.index,
                    window.clone(),
                    &lat_indices,
                    &lon_indices,
                )?
                .into_iter()
                .map(|stats| (stats.mean, stats.std))
                .unzip()
            }
        };

        let times: Vec<i64> = window.map(|t| t as i64).collect();
        // The trend is fitted on the values as returned to the client.
        let values = transport::rounded_all(values, SERIES_DECIMALS);
        let trend = trend::fit_trend(&times, &values)
            .into_iter()
            .map(|value| value.and_then(|value| transport::rounded(value, SERIES_DECIMALS)))
            .collect();
        let sqrt_steps = (steps as f64).sqrt();

        Ok(models::SeriesResult {
            times,
            values,
            standard_error: transport::rounded_all(
                std.into_iter().map(|std| std / sqrt_steps),
                SERIES_DECIMALS,
            ),
            trend,
            feature: feature.name,
        })
    }
}

/// Return the features of a variable in metadata order.
pub struct ListFeatures {}

impl Operation for ListFeatures {
    type Request = models::FeaturesRequest;
    type Response = models::FeatureList;
    const NAME: &'static str = "features";

    fn execute(
        dataset: &dyn Dataset,
        request: &Self::Request,
    ) -> Result<Self::Response, DataServerError> {
        let info = dataset.variable(&request.variable)?;
        Ok(models::FeatureList(
            FeatureCatalog::from_variable(&info).features(),
        ))
    }
}
