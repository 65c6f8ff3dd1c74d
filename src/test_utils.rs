use crate::dataset::{MemoryDataset, FEATURE, LATITUDE, LONGITUDE, TIME};
use crate::types::Mask;

use ndarray::{Array, IxDyn};

/// Fill sentinel of the test variables.
pub(crate) const FILL_VALUE: f64 = -9999.0;
/// Number of time steps in the test dataset.
pub(crate) const TIMES: usize = 12;
/// Longitudes of the test dataset.
pub(crate) const LONS: [f64; 4] = [0.0, 10.0, 20.0, 30.0];

/// Value of a cell of the test variables.
///
/// `100 * feature + time + lat / 10 + lon / 100`, except for feature 1 at time 0 where the cell at
/// (30, 10) holds the fill sentinel and the cell at (40, 30) holds NaN.
pub(crate) fn cell_value(feature: usize, time: usize, lat: f64, lon: f64) -> f64 {
    if feature == 1 && time == 0 && lat == 30.0 && lon == 10.0 {
        return FILL_VALUE;
    }
    if feature == 1 && time == 0 && lat == 40.0 && lon == 30.0 {
        return f64::NAN;
    }
    100.0 * feature as f64 + time as f64 + lat / 10.0 + lon / 100.0
}

/// Create a test dataset with the given latitudes in storage order.
///
/// `mean_values` is stored as (feature, time, latitude, longitude) with features "a,b,c".
/// `sd_values` holds the same values stored as (time, latitude, longitude, feature) with no
/// feature names.
pub(crate) fn dataset_with_lats(lats: &[f64]) -> MemoryDataset {
    let shape = [3, TIMES, lats.len(), LONS.len()];
    let mean = Array::from_shape_fn(IxDyn(&shape), |ix| {
        cell_value(ix[0], ix[1], lats[ix[2]], LONS[ix[3]])
    });
    let sd = mean.clone().permuted_axes(IxDyn(&[1, 2, 3, 0]));
    MemoryDataset::new()
        .with_coordinate(LATITUDE, lats.to_vec())
        .with_coordinate(LONGITUDE, LONS.to_vec())
        .with_coordinate(TIME, (0..TIMES).map(|t| t as f64).collect())
        .with_variable(
            "mean_values",
            &[FEATURE, TIME, LATITUDE, LONGITUDE],
            mean,
            Mask::fill_value(FILL_VALUE),
            Some("a, b, c"),
        )
        .and_then(|dataset| {
            dataset.with_variable(
                "sd_values",
                &[TIME, LATITUDE, LONGITUDE, FEATURE],
                sd,
                Mask::fill_value(FILL_VALUE),
                None,
            )
        })
        .unwrap()
}

/// Create the default test dataset, with latitudes stored descending.
pub(crate) fn test_dataset() -> MemoryDataset {
    dataset_with_lats(&[40.0, 30.0, 20.0])
}
