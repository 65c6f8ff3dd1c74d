//! Missing data descriptors
//!
//! Gridded products mark cells without data in several ways. Currently we support the CF
//! conventions used in NetCDF files:
//!
//! * A single missing value (`_FillValue`, `missing_value`)
//! * Multiple missing values (`missing_value` given as an array)
//! * A valid minimum value (`valid_min`)
//! * A valid maximum value (`valid_max`)
//! * A valid range of values (`valid_range`)
//!
//! Not-a-number and infinite values are always treated as missing, whatever the descriptors say.

use crate::error::DataServerError;

/// Missing data
///
/// This enum can represent all known descriptions of missing data used in NetCDF files.
#[derive(Clone, Debug, PartialEq)]
pub enum Missing {
    /// A single missing value
    MissingValue(f64),
    /// Multple missing values
    MissingValues(Vec<f64>),
    /// Valid minimum
    ValidMin(f64),
    /// Valid maxiumum
    ValidMax(f64),
    /// Valid range
    ValidRange(f64, f64),
}

impl Missing {
    /// Check whether the provided value is described as 'missing'.
    pub fn is_missing(&self, x: f64) -> bool {
        match self {
            Missing::MissingValue(value) => x == *value,
            Missing::MissingValues(values) => values.contains(&x),
            Missing::ValidMin(min) => x < *min,
            Missing::ValidMax(max) => x > *max,
            Missing::ValidRange(min, max) => x < *min || x > *max,
        }
    }

    /// Build a [Missing::ValidRange] from a two element `valid_range` attribute.
    pub fn valid_range(values: &[f64]) -> Result<Self, DataServerError> {
        match values {
            [min, max] if min < max => Ok(Missing::ValidRange(*min, *max)),
            _ => Err(DataServerError::malformed(format!(
                "valid_range must hold two increasing values, got {:?}",
                values
            ))),
        }
    }
}

/// The set of missing data descriptors that apply to one variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mask {
    descriptors: Vec<Missing>,
}

impl Mask {
    /// Return a new Mask built from the provided descriptors.
    pub fn new(descriptors: Vec<Missing>) -> Self {
        Self { descriptors }
    }

    /// Return a Mask for a single fill sentinel.
    pub fn fill_value(value: f64) -> Self {
        Self::new(vec![Missing::MissingValue(value)])
    }

    /// Add a descriptor to the mask.
    pub fn push(&mut self, missing: Missing) {
        self.descriptors.push(missing)
    }

    /// Returns true if no descriptors are present. Non-finite values are still masked.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns true if `x` should be treated as missing.
    pub fn is_masked(&self, x: f64) -> bool {
        !x.is_finite() || self.descriptors.iter().any(|missing| missing.is_missing(x))
    }

    /// Returns `x`, or NaN if it is masked.
    pub fn apply(&self, x: f64) -> f64 {
        if self.is_masked(x) {
            f64::NAN
        } else {
            x
        }
    }
}
