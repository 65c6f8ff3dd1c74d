//! Read-only access to the gridded dataset.
//!
//! Variables are addressed by dimension *name*, never by position, since the storage order of
//! dimensions may differ between variables and between files. [Dataset::read] returns a
//! [LabelledArray] which callers rearrange into the order they need with
//! [LabelledArray::into_order].

use crate::error::DataServerError;
use crate::types::Mask;

use ndarray::prelude::*;
use ndarray::Slice;
use std::collections::HashMap;
use std::ops::Range;

/// Name of the feature dimension.
pub const FEATURE: &str = "feature";
/// Name of the time dimension.
pub const TIME: &str = "time";
/// Name of the latitude dimension and coordinate variable.
pub const LATITUDE: &str = "latitude";
/// Name of the longitude dimension and coordinate variable.
pub const LONGITUDE: &str = "longitude";

/// A named dimension of a variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }
}

/// Metadata describing a variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableInfo {
    /// Variable name
    pub name: String,
    /// Dimensions in storage order
    pub dimensions: Vec<Dimension>,
    /// Missing data descriptors
    pub mask: Mask,
    /// Feature display names from the comma-separated `feature_names` attribute
    pub feature_names: Vec<String>,
}

impl VariableInfo {
    /// Returns the length of the named dimension, if the variable has it.
    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|dim| dim.name == name)
            .map(|dim| dim.len)
    }

    /// Returns the length of the named dimension, or an error if the variable does not have it.
    pub fn require_dimension(&self, name: &str) -> Result<usize, DataServerError> {
        self.dimension_len(name).ok_or_else(|| {
            DataServerError::malformed(format!(
                "variable '{}' has no dimension '{}'",
                self.name, name
            ))
        })
    }
}

/// Split a comma-separated `feature_names` attribute into trimmed names.
pub fn parse_feature_names(attribute: &str) -> Vec<String> {
    if attribute.trim().is_empty() {
        return vec![];
    }
    attribute.split(',').map(|s| s.trim().to_string()).collect()
}

/// Selection along a single named dimension.
#[derive(Clone, Debug, PartialEq)]
pub enum DimSelection {
    /// A single index. The dimension is dropped from the result.
    Index(usize),
    /// A half-open index range. The dimension is kept.
    Range(Range<usize>),
}

/// An array together with the names of its axes.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledArray {
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
}

impl LabelledArray {
    /// Rearrange the axes into the given named order and fix the dimensionality.
    ///
    /// `order` must name every axis of the array exactly once.
    pub fn into_order<D: ndarray::Dimension>(
        self,
        order: &[&str],
    ) -> Result<Array<f64, D>, DataServerError> {
        if order.len() != self.dims.len() {
            return Err(DataServerError::malformed(format!(
                "expected dimensions {:?}, found {:?}",
                order, self.dims
            )));
        }
        let axes = order
            .iter()
            .map(|name| {
                self.dims.iter().position(|dim| dim == name).ok_or_else(|| {
                    DataServerError::malformed(format!(
                        "expected dimensions {:?}, found {:?}",
                        order, self.dims
                    ))
                })
            })
            .collect::<Result<Vec<usize>, _>>()?;
        Ok(self.data.permuted_axes(axes).into_dimensionality::<D>()?)
    }
}

/// A read-only handle to an open dataset.
pub trait Dataset {
    /// Returns metadata for the named variable, or [DataServerError::UnknownVariable].
    fn variable(&self, name: &str) -> Result<VariableInfo, DataServerError>;

    /// Returns the values of a one dimensional coordinate variable.
    fn coordinate(&self, name: &str) -> Result<Vec<f64>, DataServerError>;

    /// Read a subset of a variable.
    ///
    /// Dimensions not named in `selection` are read in full.
    fn read(
        &self,
        variable: &str,
        selection: &[(&str, DimSelection)],
    ) -> Result<LabelledArray, DataServerError>;
}

/// Opens a fresh [Dataset] handle for each request.
pub trait DatasetSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn Dataset>, DataServerError>;
}

/// Apply a name-addressed selection to an array with the given dimensions.
///
/// Shared by all backends once the raw values have been loaded.
pub fn select_labelled(
    info: &VariableInfo,
    data: ArrayViewD<f64>,
    selection: &[(&str, DimSelection)],
) -> Result<LabelledArray, DataServerError> {
    if data.ndim() != info.dimensions.len() {
        return Err(DataServerError::malformed(format!(
            "variable '{}' has {} dimensions but data has {}",
            info.name,
            info.dimensions.len(),
            data.ndim()
        )));
    }
    for (name, _) in selection {
        info.require_dimension(name)?;
    }

    let mut view = data;
    let mut dims = vec![];
    let mut axis = 0;
    for dim in &info.dimensions {
        let selected = selection.iter().find(|(name, _)| *name == dim.name);
        match selected.map(|(_, sel)| sel) {
            Some(DimSelection::Index(index)) => {
                if *index >= dim.len {
                    return Err(DataServerError::invalid_range(format!(
                        "index {} out of range for dimension '{}' of length {}",
                        index, dim.name, dim.len
                    )));
                }
                view = view.index_axis_move(Axis(axis), *index);
            }
            Some(DimSelection::Range(range)) => {
                if range.start > range.end || range.end > dim.len {
                    return Err(DataServerError::invalid_range(format!(
                        "range {:?} out of bounds for dimension '{}' of length {}",
                        range, dim.name, dim.len
                    )));
                }
                view.slice_axis_inplace(Axis(axis), Slice::from(range.clone()));
                dims.push(dim.name.clone());
                axis += 1;
            }
            None => {
                dims.push(dim.name.clone());
                axis += 1;
            }
        }
    }
    Ok(LabelledArray {
        dims,
        data: view.to_owned(),
    })
}

/// A variable held in memory.
#[derive(Clone, Debug)]
struct MemoryVariable {
    info: VariableInfo,
    data: ArrayD<f64>,
}

/// A dataset held entirely in memory.
///
/// Used for fixtures and benchmarks, and as a reference for the NetCDF backend.
#[derive(Clone, Debug, Default)]
pub struct MemoryDataset {
    coordinates: HashMap<String, Vec<f64>>,
    variables: HashMap<String, MemoryVariable>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a one dimensional coordinate variable.
    pub fn with_coordinate(mut self, name: &str, values: Vec<f64>) -> Self {
        self.coordinates.insert(name.to_string(), values);
        self
    }

    /// Add a data variable.
    ///
    /// # Arguments
    ///
    /// * `name`: Variable name
    /// * `dims`: Dimension names in the storage order of `data`
    /// * `data`: Variable values
    /// * `mask`: Missing data descriptors
    /// * `feature_names`: Optional comma-separated feature names attribute
    pub fn with_variable(
        mut self,
        name: &str,
        dims: &[&str],
        data: ArrayD<f64>,
        mask: Mask,
        feature_names: Option<&str>,
    ) -> Result<Self, DataServerError> {
        if dims.len() != data.ndim() {
            return Err(DataServerError::malformed(format!(
                "variable '{}' has {} dimension names but data has {} axes",
                name,
                dims.len(),
                data.ndim()
            )));
        }
        let dimensions = dims
            .iter()
            .zip(data.shape())
            .map(|(dim, len)| Dimension::new(*dim, *len))
            .collect();
        let info = VariableInfo {
            name: name.to_string(),
            dimensions,
            mask,
            feature_names: feature_names.map(parse_feature_names).unwrap_or_default(),
        };
        self.variables
            .insert(name.to_string(), MemoryVariable { info, data });
        Ok(self)
    }

    fn memory_variable(&self, name: &str) -> Result<&MemoryVariable, DataServerError> {
        self.variables
            .get(name)
            .ok_or_else(|| DataServerError::UnknownVariable {
                variable: name.to_string(),
            })
    }
}

impl Dataset for MemoryDataset {
    fn variable(&self, name: &str) -> Result<VariableInfo, DataServerError> {
        Ok(self.memory_variable(name)?.info.clone())
    }

    fn coordinate(&self, name: &str) -> Result<Vec<f64>, DataServerError> {
        self.coordinates
            .get(name)
            .cloned()
            .ok_or_else(|| DataServerError::malformed(format!("no coordinate variable '{}'", name)))
    }

    fn read(
        &self,
        variable: &str,
        selection: &[(&str, DimSelection)],
    ) -> Result<LabelledArray, DataServerError> {
        let variable = self.memory_variable(variable)?;
        select_labelled(&variable.info, variable.data.view(), selection)
    }
}

impl DatasetSource for MemoryDataset {
    fn open(&self) -> Result<Box<dyn Dataset>, DataServerError> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    fn dataset() -> MemoryDataset {
        // dims (time, latitude, longitude) with value = 100 * t + 10 * y + x
        let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
            (100 * ix[0] + 10 * ix[1] + ix[2]) as f64
        });
        MemoryDataset::new()
            .with_coordinate(LATITUDE, vec![0.0, 1.0, 2.0])
            .with_variable(
                "v",
                &[TIME, LATITUDE, LONGITUDE],
                data,
                Mask::default(),
                Some("a, b ,c"),
            )
            .unwrap()
    }

    #[test]
    fn parse_feature_names_trims() {
        assert_eq!(vec!["a", "b", "c"], parse_feature_names(" a,b , c"));
        assert!(parse_feature_names("").is_empty());
        assert!(parse_feature_names("  ").is_empty());
    }

    #[test]
    fn variable_info() {
        let info = dataset().variable("v").unwrap();
        assert_eq!(Some(2), info.dimension_len(TIME));
        assert_eq!(None, info.dimension_len(FEATURE));
        assert_eq!(vec!["a", "b", "c"], info.feature_names);
        assert_eq!(
            ErrorKind::DatasetUnavailable,
            info.require_dimension(FEATURE).unwrap_err().kind()
        );
    }

    #[test]
    fn unknown_variable() {
        let error = dataset().variable("w").unwrap_err();
        assert_eq!(ErrorKind::UnknownVariable, error.kind());
        let error = dataset().read("w", &[]).unwrap_err();
        assert_eq!(ErrorKind::UnknownVariable, error.kind());
    }

    #[test]
    fn read_index_drops_dimension() {
        let array = dataset().read("v", &[(TIME, DimSelection::Index(1))]).unwrap();
        assert_eq!(vec![LATITUDE, LONGITUDE], array.dims);
        assert_eq!(&[3, 4], array.data.shape());
        assert_eq!(123.0, array.data[[2, 3]]);
    }

    #[test]
    fn read_selection_order_is_irrelevant() {
        let a = dataset()
            .read(
                "v",
                &[
                    (LONGITUDE, DimSelection::Index(2)),
                    (TIME, DimSelection::Index(1)),
                ],
            )
            .unwrap();
        let b = dataset()
            .read(
                "v",
                &[
                    (TIME, DimSelection::Index(1)),
                    (LONGITUDE, DimSelection::Index(2)),
                ],
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(vec![102.0, 112.0, 122.0], a.data.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn read_range_keeps_dimension() {
        let array = dataset()
            .read(
                "v",
                &[
                    (TIME, DimSelection::Index(0)),
                    (LATITUDE, DimSelection::Range(1..3)),
                ],
            )
            .unwrap();
        assert_eq!(&[2, 4], array.data.shape());
        assert_eq!(10.0, array.data[[0, 0]]);
    }

    #[test]
    fn read_index_out_of_range() {
        let error = dataset()
            .read("v", &[(TIME, DimSelection::Index(2))])
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidRange, error.kind());
    }

    #[test]
    fn read_range_out_of_range() {
        let error = dataset()
            .read("v", &[(LATITUDE, DimSelection::Range(1..4))])
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidRange, error.kind());
    }

    #[test]
    fn read_unknown_dimension() {
        let error = dataset()
            .read("v", &[(FEATURE, DimSelection::Index(0))])
            .unwrap_err();
        assert_eq!(ErrorKind::DatasetUnavailable, error.kind());
    }

    #[test]
    fn into_order_permutes_axes() {
        let array = dataset().read("v", &[(TIME, DimSelection::Index(0))]).unwrap();
        let transposed: Array2<f64> = array.into_order(&[LONGITUDE, LATITUDE]).unwrap();
        assert_eq!(&[4, 3], transposed.shape());
        assert_eq!(21.0, transposed[[1, 2]]);
    }

    #[test]
    fn into_order_rejects_wrong_names() {
        let array = dataset().read("v", &[(TIME, DimSelection::Index(0))]).unwrap();
        let error = array.into_order::<Ix2>(&[LATITUDE, TIME]).unwrap_err();
        assert_eq!(ErrorKind::DatasetUnavailable, error.kind());
    }

    #[test]
    fn coordinate() {
        assert_eq!(vec![0.0, 1.0, 2.0], dataset().coordinate(LATITUDE).unwrap());
        assert!(dataset().coordinate(LONGITUDE).is_err());
    }

    #[test]
    fn with_variable_rejects_mismatched_dims() {
        let result = MemoryDataset::new().with_variable(
            "v",
            &[TIME],
            ArrayD::zeros(IxDyn(&[2, 2])),
            Mask::default(),
            None,
        );
        assert!(result.is_err());
    }
}
