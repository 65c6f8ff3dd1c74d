//! Conversion of floating point results into a transport-safe form.
//!
//! JSON has no representation for NaN or infinity, and the fill sentinel must never leak to
//! clients. Every value leaving the core is either a finite number rounded to a fixed number of
//! decimals or `None`, which serialises as `null`.

/// Decimals used for map grids and their extrema.
pub const MAP_DECIMALS: i32 = 3;
/// Decimals used for series, standard error and trend values.
pub const SERIES_DECIMALS: i32 = 2;

/// Round `x` to `decimals` decimal digits.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    let scaled = x * scale;
    // Already coarser than the requested precision.
    if !scaled.is_finite() {
        return x;
    }
    let rounded = scaled.round() / scale;
    // Avoid emitting -0.0.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Returns the rounded value if `x` is finite, or `None`.
pub fn rounded(x: f64, decimals: i32) -> Option<f64> {
    if x.is_finite() {
        Some(round_to(x, decimals))
    } else {
        None
    }
}

/// Apply [rounded] to each value.
pub fn rounded_all<I>(values: I, decimals: i32) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().map(|x| rounded(x, decimals)).collect()
}
