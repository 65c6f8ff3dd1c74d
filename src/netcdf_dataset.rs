//! NetCDF dataset backend.
//!
//! Wraps the [netcdf] crate (libnetcdf/HDF5). A file is opened per request by [NetcdfSource] and
//! dropped when the request's data has been materialised.

use crate::dataset::{self, Dataset, DatasetSource, DimSelection, LabelledArray, VariableInfo};
use crate::error::DataServerError;
use crate::types::{Mask, Missing};

use ndarray::{ArrayD, IxDyn};
use netcdf::AttributeValue;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Opens the NetCDF file at a fixed path.
#[derive(Clone, Debug)]
pub struct NetcdfSource {
    path: PathBuf,
}

impl NetcdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for NetcdfSource {
    fn open(&self) -> Result<Box<dyn Dataset>, DataServerError> {
        Ok(Box::new(NetcdfDataset::open(&self.path)?))
    }
}

/// An open NetCDF file.
pub struct NetcdfDataset {
    file: netcdf::File,
}

impl NetcdfDataset {
    /// Open the file at `path` read-only.
    pub fn open(path: &Path) -> Result<Self, DataServerError> {
        if !path.exists() {
            return Err(DataServerError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }
        debug!("opening dataset {}", path.display());
        Ok(Self {
            file: netcdf::open(path)?,
        })
    }

    fn netcdf_variable(&self, name: &str) -> Result<netcdf::Variable<'_>, DataServerError> {
        self.file
            .variable(name)
            .ok_or_else(|| DataServerError::UnknownVariable {
                variable: name.to_string(),
            })
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Read a numeric attribute as a list of f64 values.
fn numeric_attr(var: &netcdf::Variable, name: &str) -> Result<Option<Vec<f64>>, DataServerError> {
    if !has_attr(var, name) {
        return Ok(None);
    }
    let value = match var.attribute_value(name) {
        Some(value) => value?,
        None => return Ok(None),
    };
    let values = match value {
        AttributeValue::Uchar(x) => vec![x as f64],
        AttributeValue::Schar(x) => vec![x as f64],
        AttributeValue::Ushort(x) => vec![x as f64],
        AttributeValue::Short(x) => vec![x as f64],
        AttributeValue::Uint(x) => vec![x as f64],
        AttributeValue::Int(x) => vec![x as f64],
        AttributeValue::Ulonglong(x) => vec![x as f64],
        AttributeValue::Longlong(x) => vec![x as f64],
        AttributeValue::Float(x) => vec![x as f64],
        AttributeValue::Double(x) => vec![x],
        AttributeValue::Uchars(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Schars(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Ushorts(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Shorts(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Uints(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Ints(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Ulonglongs(x) => x.into_iter().map(|v| v as f64).collect(),
        AttributeValue::Longlongs(x) => x.into_iter().map(|v| v as f64).collect(),
        AttributeValue::Floats(x) => x.into_iter().map(f64::from).collect(),
        AttributeValue::Doubles(x) => x,
        _ => {
            return Err(DataServerError::malformed(format!(
                "attribute '{}' of '{}' is not numeric",
                name,
                var.name()
            )))
        }
    };
    Ok(Some(values))
}

/// Read a string attribute.
fn string_attr(var: &netcdf::Variable, name: &str) -> Result<Option<String>, DataServerError> {
    if !has_attr(var, name) {
        return Ok(None);
    }
    match var.attribute_value(name) {
        Some(value) => match value? {
            AttributeValue::Str(s) => Ok(Some(s)),
            _ => Err(DataServerError::malformed(format!(
                "attribute '{}' of '{}' is not a string",
                name,
                var.name()
            ))),
        },
        None => Ok(None),
    }
}

/// Collect the CF missing data attributes of a variable into a [Mask].
fn read_mask(var: &netcdf::Variable) -> Result<Mask, DataServerError> {
    let mut mask = Mask::default();
    if let Some(fill) = numeric_attr(var, "_FillValue")? {
        mask.push(Missing::MissingValues(fill));
    }
    if let Some(missing) = numeric_attr(var, "missing_value")? {
        mask.push(Missing::MissingValues(missing));
    }
    if let Some(range) = numeric_attr(var, "valid_range")? {
        mask.push(Missing::valid_range(&range)?);
    }
    if let Some([min]) = numeric_attr(var, "valid_min")?.as_deref() {
        mask.push(Missing::ValidMin(*min));
    }
    if let Some([max]) = numeric_attr(var, "valid_max")?.as_deref() {
        mask.push(Missing::ValidMax(*max));
    }
    Ok(mask)
}

/// Read a numeric attribute that must hold a single value.
fn scalar_attr(var: &netcdf::Variable, name: &str) -> Result<Option<f64>, DataServerError> {
    match numeric_attr(var, name)?.as_deref() {
        None => Ok(None),
        Some([value]) => Ok(Some(*value)),
        Some(_) => Err(DataServerError::malformed(format!(
            "attribute '{}' of '{}' must hold a single value",
            name,
            var.name()
        ))),
    }
}

/// CF encoding of stored values: missing data in packed units, then `scale_factor` and
/// `add_offset`.
#[derive(Clone, Debug, PartialEq)]
struct Encoding {
    mask: Mask,
    scale_factor: f64,
    add_offset: f64,
}

impl Encoding {
    fn read(var: &netcdf::Variable) -> Result<Self, DataServerError> {
        Ok(Self {
            mask: read_mask(var)?,
            scale_factor: scalar_attr(var, "scale_factor")?.unwrap_or(1.0),
            add_offset: scalar_attr(var, "add_offset")?.unwrap_or(0.0),
        })
    }

    /// Unpack a stored value, or NaN if it is missing.
    fn decode(&self, raw: f64) -> f64 {
        self.mask.apply(raw) * self.scale_factor + self.add_offset
    }

    fn decode_all(&self, raw: Vec<f64>) -> Vec<f64> {
        raw.into_iter().map(|x| self.decode(x)).collect()
    }
}

/// Values are decoded by [Dataset::read], so the reported mask only covers non-finite values.
fn variable_info(var: &netcdf::Variable) -> Result<VariableInfo, DataServerError> {
    let dimensions = var
        .dimensions()
        .iter()
        .map(|dim| dataset::Dimension::new(dim.name().to_string(), dim.len()))
        .collect();
    let feature_names = string_attr(var, "feature_names")?
        .map(|names| dataset::parse_feature_names(&names))
        .unwrap_or_default();
    Ok(VariableInfo {
        name: var.name().to_string(),
        dimensions,
        mask: Mask::default(),
        feature_names,
    })
}

impl Dataset for NetcdfDataset {
    fn variable(&self, name: &str) -> Result<VariableInfo, DataServerError> {
        variable_info(&self.netcdf_variable(name)?)
    }

    fn coordinate(&self, name: &str) -> Result<Vec<f64>, DataServerError> {
        let var = self.file.variable(name).ok_or_else(|| {
            DataServerError::malformed(format!("no coordinate variable '{}'", name))
        })?;
        let encoding = Encoding::read(&var)?;
        Ok(encoding.decode_all(var.get_values::<f64, _>(..)?))
    }

    fn read(
        &self,
        variable: &str,
        selection: &[(&str, DimSelection)],
    ) -> Result<LabelledArray, DataServerError> {
        let var = self.netcdf_variable(variable)?;
        let info = variable_info(&var)?;
        let encoding = Encoding::read(&var)?;
        let shape: Vec<usize> = info.dimensions.iter().map(|dim| dim.len).collect();
        // TODO: Pass the selection to libnetcdf as extents instead of reading the whole variable.
        let values = encoding.decode_all(var.get_values::<f64, _>(..)?);
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        dataset::select_labelled(&info, data.view(), selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dataset::{FEATURE, LATITUDE, LONGITUDE, TIME};
    use crate::error::ErrorKind;
    use crate::feature::FeatureToken;
    use crate::models::{MapRequest, Selection, SeriesRequest};
    use crate::operation::Operation;
    use crate::operations::{GetMap, GetSeries};

    const FILL_VALUE: f64 = -9999.0;

    /// Write a small file with latitudes stored descending and dimensions in
    /// (time, latitude, longitude, feature) order.
    ///
    /// `mean_values` holds `100 * feature + time + latitude / 10` with one fill cell, `packed`
    /// holds the same values for feature 0 as shorts scaled by 0.5.
    fn create_dataset(path: &Path) -> Result<(), netcdf::Error> {
        let lats = [40.0, 30.0, 20.0];
        let mut file = netcdf::create(path)?;
        file.add_dimension(TIME, 2)?;
        file.add_dimension(LATITUDE, lats.len())?;
        file.add_dimension(LONGITUDE, 2)?;
        file.add_dimension(FEATURE, 3)?;
        {
            let mut var = file.add_variable::<f64>(TIME, &[TIME])?;
            var.put_values(&[0.0, 1.0], ..)?;
        }
        {
            let mut var = file.add_variable::<f64>(LATITUDE, &[LATITUDE])?;
            var.put_values(&lats, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>(LONGITUDE, &[LONGITUDE])?;
            var.put_values(&[0.0, 10.0], ..)?;
        }
        {
            let mut var =
                file.add_variable::<f64>("mean_values", &[TIME, LATITUDE, LONGITUDE, FEATURE])?;
            var.set_fill_value(FILL_VALUE)?;
            var.put_attribute("feature_names", "a,b,c")?;
            let mut values = Vec::new();
            for t in 0..2 {
                for lat in lats {
                    for lon in 0..2 {
                        for f in 0..3 {
                            if (t, lat, lon, f) == (0, 30.0, 1, 1) {
                                values.push(FILL_VALUE);
                            } else {
                                values.push((100 * f + t) as f64 + lat / 10.0);
                            }
                        }
                    }
                }
            }
            var.put_values(&values, ..)?;
        }
        {
            let mut var =
                file.add_variable::<i16>("packed", &[FEATURE, TIME, LATITUDE, LONGITUDE])?;
            var.set_fill_value(-1i16)?;
            var.put_attribute("scale_factor", 0.5f64)?;
            var.put_attribute("add_offset", 1.0f64)?;
            let mut values: Vec<i16> = Vec::new();
            for _ in 0..3 {
                for t in 0..2 {
                    for lat in lats {
                        for lon in 0..2 {
                            if (t, lat, lon) == (1, 20.0, 0) {
                                values.push(-1);
                            } else {
                                values.push(2 * t as i16 + lat as i16);
                            }
                        }
                    }
                }
            }
            var.put_values(&values, ..)?;
        }
        Ok(())
    }

    fn open_dataset() -> (tempfile::TempDir, NetcdfDataset) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diversity.nc");
        create_dataset(&path).unwrap();
        let dataset = NetcdfDataset::open(&path).unwrap();
        (dir, dataset)
    }

    #[test]
    fn open_missing_file() {
        let source = NetcdfSource::new("/nonexistent/diversity.nc");
        let error = source.open().err().unwrap();
        assert_eq!(ErrorKind::DatasetUnavailable, error.kind());
        assert_eq!(
            "dataset /nonexistent/diversity.nc not found",
            error.to_string()
        );
    }

    #[test]
    fn variable_metadata() {
        let (_dir, dataset) = open_dataset();
        let info = dataset.variable("mean_values").unwrap();
        let dims: Vec<(&str, usize)> = info
            .dimensions
            .iter()
            .map(|dim| (dim.name.as_str(), dim.len))
            .collect();
        assert_eq!(
            vec![(TIME, 2), (LATITUDE, 3), (LONGITUDE, 2), (FEATURE, 3)],
            dims
        );
        assert_eq!(vec!["a", "b", "c"], info.feature_names);
        assert_eq!(
            vec![40.0, 30.0, 20.0],
            dataset.coordinate(LATITUDE).unwrap()
        );
    }

    #[test]
    fn fill_value_read_into_encoding() {
        let (_dir, dataset) = open_dataset();
        let var = dataset.netcdf_variable("mean_values").unwrap();
        let encoding = Encoding::read(&var).unwrap();
        assert!(encoding.mask.is_masked(FILL_VALUE));
        assert!(!encoding.mask.is_masked(3.0));
        assert_eq!(1.0, encoding.scale_factor);
        assert_eq!(0.0, encoding.add_offset);
    }

    #[test]
    fn unknown_variable() {
        let (_dir, dataset) = open_dataset();
        let error = dataset.variable("nope").unwrap_err();
        assert_eq!(ErrorKind::UnknownVariable, error.kind());
    }

    #[test]
    fn map_from_file() {
        let (_dir, dataset) = open_dataset();
        let request = MapRequest {
            variable: "mean_values".to_string(),
            feature: Some(FeatureToken::parse("b")),
            time: 0,
        };
        let result = GetMap::execute(&dataset, &request).unwrap();
        assert_eq!("b", result.feature);
        assert_eq!(vec![20.0, 30.0, 40.0], result.lats);
        assert_eq!(vec![0.0, 10.0], result.lons);
        assert_eq!(
            vec![
                vec![Some(102.0), Some(102.0)],
                vec![Some(103.0), None],
                vec![Some(104.0), Some(104.0)],
            ],
            result.grid
        );
        assert_eq!(Some(102.0), result.min);
        assert_eq!(Some(104.0), result.max);
    }

    #[test]
    fn packed_values_unpacked() {
        let (_dir, dataset) = open_dataset();
        let request = SeriesRequest {
            variable: "packed".to_string(),
            feature: None,
            selection: Selection::Point {
                lon: 0.0,
                lat: 20.0,
            },
            start_time: 0,
            end_time: None,
        };
        let result = GetSeries::execute(&dataset, &request).unwrap();
        // Stored 20 unpacks to 20 * 0.5 + 1, the stored fill value stays missing.
        assert_eq!(vec![Some(11.0), None], result.values);

        let request = MapRequest {
            variable: "packed".to_string(),
            feature: None,
            time: 1,
        };
        let result = GetMap::execute(&dataset, &request).unwrap();
        assert_eq!(
            vec![
                vec![None, Some(12.0)],
                vec![Some(17.0), Some(17.0)],
                vec![Some(22.0), Some(22.0)],
            ],
            result.grid
        );
        assert_eq!("feature_0", result.feature);
    }
}
