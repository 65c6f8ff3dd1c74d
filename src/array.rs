//! Functions and utilities for working with coordinate vectors and [ndarray] objects.

use crate::types::Mask;

use ndarray::prelude::*;
use ndarray::{Data, RemoveAxis};
use std::cmp::Ordering;

/// Returns the index of the coordinate nearest to `target`.
///
/// Ties resolve to the first such coordinate. Returns `None` for empty coordinates.
pub fn nearest_index(coords: &[f64], target: f64) -> Option<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_nan())
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .abs()
                .partial_cmp(&(*b - target).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(index, _)| index)
}

/// Returns the indices of the coordinates within the closed interval `[lo, hi]`, in storage
/// order.
///
/// The result is empty if `lo > hi`.
pub fn indices_within(coords: &[f64], lo: f64, hi: f64) -> Vec<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, c)| lo <= **c && **c <= hi)
        .map(|(index, _)| index)
        .collect()
}

/// Returns the permutation that sorts the coordinates in ascending order.
pub fn ascending_order(coords: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..coords.len()).collect();
    order.sort_by(|a, b| coords[*a].total_cmp(&coords[*b]));
    order
}

/// Replace masked values with NaN.
pub fn apply_mask<S, D>(array: &ArrayBase<S, D>, mask: &Mask) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    array.mapv(|x| mask.apply(x))
}

/// Mean and standard deviation of the finite values of one subview.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FiniteStats {
    pub mean: f64,
    pub std: f64,
}

/// Compute [FiniteStats] for each index along `axis`, reducing over all other axes.
///
/// `ddof` is the delta degrees of freedom of the standard deviation. The mean is NaN without
/// finite values; the standard deviation is NaN unless there are more than `ddof` of them.
pub fn finite_stats_axis<S, D>(array: &ArrayBase<S, D>, axis: Axis, ddof: f64) -> Vec<FiniteStats>
where
    S: Data<Elem = f64>,
    D: Dimension + RemoveAxis,
{
    array
        .axis_iter(axis)
        .map(|subview| {
            let finite: Array1<f64> = subview.iter().copied().filter(|x| x.is_finite()).collect();
            let count = finite.len();
            let mean = finite.mean().unwrap_or(f64::NAN);
            let std = if (count as f64) > ddof {
                finite.std(ddof)
            } else {
                f64::NAN
            };
            FiniteStats { mean, std }
        })
        .collect()
}
