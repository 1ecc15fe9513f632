//! # Archive Loader
//!
//! Opens a netCDF archive from a local path or an HTTP(S) URL and exposes it
//! through the [`Dataset`] trait.
//!
//! Resolution order: a local file is opened in place; when no local file
//! matches, the location is downloaded into a temporary file and opened from
//! there. A local file that exists but cannot be opened is an error in its own
//! right and is never retried remotely. A download that is not a readable
//! archive (an HTML error page served with status 200, say) counts as an
//! unavailable source.
//!
//! Element typing mirrors the usual netCDF reading conventions:
//!
//! - `NC_CHAR` arrays collapse their last dimension into byte strings
//! - `NC_STRING` values are handed over as UTF-8 bytes
//! - `_FillValue` / `missing_value` elements become NaN, and
//!   `scale_factor` / `add_offset` are applied
//! - time variables are left as raw numeric offsets

use crate::dataset::{parse_coordinates_attribute, Catalog, Dataset, VariableLayout};
use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::storage::{LocalStorage, StorageBackend, StorageFactory};
use crate::value::{ArrayData, Element, FieldValue, Scalar, Values};
use log::debug;
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use std::io::Write;
use tempfile::NamedTempFile;

/// An opened netCDF archive.
///
/// The handle owns the libnetcdf file and, for remote archives, the downloaded
/// temporary copy. [`NetCdfDataset::close`] releases both; dropping the handle
/// releases them as well, so an early return never leaks either.
pub struct NetCdfDataset {
    location: String,
    file: netcdf::File,
    catalog: Catalog,
    download: Option<NamedTempFile>,
}

/// Opens `location`, showing download progress when info logging is on.
pub fn open(location: &str) -> Nc2JsonResult<NetCdfDataset> {
    open_with_progress(location, log::max_level() >= log::LevelFilter::Info)
}

/// Opens `location`, trying the local filesystem first and HTTP(S) second.
///
/// # Errors
///
/// - [`Nc2JsonError::SourceUnavailable`] if there is no local file and the
///   location cannot be downloaded, or the download is not a netCDF archive
/// - [`Nc2JsonError::NetCdf`] if an existing local file is not a readable archive
pub fn open_with_progress(location: &str, show_progress: bool) -> Nc2JsonResult<NetCdfDataset> {
    let is_remote = StorageFactory::is_remote_path(location);
    let is_local = match LocalStorage.exists(location) {
        Ok(found) => found,
        // e.g. ENAMETOOLONG on a signed URL
        Err(e) if is_remote => {
            debug!("Local lookup of {} failed ({}), treating it as remote", location, e);
            false
        }
        Err(e) => return Err(e.into()),
    };

    if is_local {
        debug!("Opening local NetCDF file: {}", location);
        let file = netcdf::open(location)?;
        return NetCdfDataset::from_file(location, file, None);
    }

    if !is_remote {
        return Err(Nc2JsonError::source_unavailable(
            location,
            "no such local file and not an http(s) URL",
        ));
    }

    debug!("No local file at {}, fetching remotely", location);
    let storage = StorageFactory::from_path_with_progress(location, show_progress)?;
    let data = storage
        .read(location)
        .map_err(|e| Nc2JsonError::source_unavailable(location, e.to_string()))?;

    let mut download = tempfile::Builder::new()
        .prefix("nc2json-")
        .suffix(".nc")
        .tempfile()?;
    download.write_all(&data)?;
    download.flush()?;

    debug!("Opening downloaded copy: {:?}", download.path());
    let file = netcdf::open(download.path())
        .map_err(|e| Nc2JsonError::source_unavailable(location, format!("not a netCDF archive: {}", e)))?;
    NetCdfDataset::from_file(location, file, Some(download))
}

impl NetCdfDataset {
    fn from_file(
        location: &str,
        file: netcdf::File,
        download: Option<NamedTempFile>,
    ) -> Nc2JsonResult<Self> {
        let mut variables = Vec::new();
        let mut references = Vec::new();
        for var in file.variables() {
            let mut dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
            // The string-length dimension is folded into the elements
            if var.vartype() == NcVariableType::Char {
                dimensions.pop();
            }
            variables.push(VariableLayout {
                name: var.name().to_string(),
                dimensions,
            });
            if let Some(Ok(AttributeValue::Str(coords))) = var.attribute_value("coordinates") {
                references.extend(parse_coordinates_attribute(&coords));
            }
        }

        let catalog = Catalog::new(variables, &references);
        Ok(NetCdfDataset {
            location: location.to_string(),
            file,
            catalog,
            download,
        })
    }

    /// The path or URL this dataset was opened from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the archive was downloaded rather than opened in place.
    pub fn is_remote(&self) -> bool {
        self.download.is_some()
    }

    /// Closes the netCDF handle and removes any downloaded copy.
    pub fn close(self) -> Nc2JsonResult<()> {
        let NetCdfDataset {
            location,
            file,
            download,
            ..
        } = self;

        file.close()?;
        if let Some(download) = download {
            download.close()?;
        }
        debug!("Closed {}", location);
        Ok(())
    }
}

impl Dataset for NetCdfDataset {
    fn dimensions(&self) -> Vec<String> {
        self.catalog.dimensions().to_vec()
    }

    fn coordinates_of(&self, dimension: &str) -> Vec<String> {
        self.catalog.coordinates_of(dimension)
    }

    fn data_variable_names(&self) -> Vec<String> {
        self.catalog.data_variable_names()
    }

    fn coordinate_names(&self) -> Vec<String> {
        self.catalog.coordinate_names()
    }

    fn read_variable(&self, name: &str) -> Nc2JsonResult<ArrayData> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| Nc2JsonError::MissingVariable(name.to_string()))?;
        read_variable_array(&var)
    }

    fn attributes(&self) -> Nc2JsonResult<Vec<(String, FieldValue)>> {
        let mut attributes = Vec::new();
        for attr in self.file.attributes() {
            let value = attr.value()?;
            attributes.push((attr.name().to_string(), attribute_to_field(value)));
        }
        Ok(attributes)
    }
}

fn read_variable_array(var: &netcdf::Variable<'_>) -> Nc2JsonResult<ArrayData> {
    let name = var.name().to_string();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let numeric = match var.vartype() {
        NcVariableType::Char => return read_char_array(var, &name, shape),
        NcVariableType::String => return read_string_array(var, &name, shape),
        NcVariableType::Float(FloatType::F64) => {
            let values: Vec<f64> = var.get_values(..)?;
            Values::Float(values)
        }
        NcVariableType::Float(FloatType::F32) => {
            let values: Vec<f32> = var.get_values(..)?;
            Values::Float(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::I64) => {
            let values: Vec<i64> = var.get_values(..)?;
            Values::Integer(values)
        }
        NcVariableType::Int(IntType::I32) => {
            let values: Vec<i32> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::I16) => {
            let values: Vec<i16> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::I8) => {
            let values: Vec<i8> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::U64) => {
            let values: Vec<u64> = var.get_values(..)?;
            match values.iter().map(|v| i64::try_from(*v)).collect::<Result<Vec<_>, _>>() {
                Ok(ints) => Values::Integer(ints),
                Err(_) => Values::Float(values.into_iter().map(|v| v as f64).collect()),
            }
        }
        NcVariableType::Int(IntType::U32) => {
            let values: Vec<u32> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::U16) => {
            let values: Vec<u16> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        NcVariableType::Int(IntType::U8) => {
            let values: Vec<u8> = var.get_values(..)?;
            Values::Integer(values.into_iter().map(i64::from).collect())
        }
        other => {
            return Err(Nc2JsonError::unsupported_variable(
                name,
                format!("type {:?} is not supported", other),
            ));
        }
    };

    let values = mask_and_scale(var, numeric);
    ArrayData::new(shape, values)
        .ok_or_else(|| Nc2JsonError::unsupported_variable(name, "element count does not match shape"))
}

/// Applies `_FillValue`/`missing_value` masking and `scale_factor`/`add_offset`
/// unpacking. Untouched variables keep their element kind.
fn mask_and_scale(var: &netcdf::Variable<'_>, values: Values) -> Values {
    let fill = numeric_attribute(var, "_FillValue").or_else(|| numeric_attribute(var, "missing_value"));
    let scale = numeric_attribute(var, "scale_factor");
    let offset = numeric_attribute(var, "add_offset");

    if fill.is_none() && scale.is_none() && offset.is_none() {
        return values;
    }

    let raw: Vec<f64> = match values {
        Values::Float(v) => v,
        Values::Integer(v) => v.into_iter().map(|x| x as f64).collect(),
        bytes @ Values::Bytes(_) => return bytes,
    };

    let scale = scale.unwrap_or(1.0);
    let offset = offset.unwrap_or(0.0);
    Values::Float(
        raw.into_iter()
            .map(|v| match fill {
                Some(f) if v == f => f64::NAN,
                _ => v * scale + offset,
            })
            .collect(),
    )
}

fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Uchar(x) => Some(f64::from(x)),
            AttributeValue::Schar(x) => Some(f64::from(x)),
            AttributeValue::Ushort(x) => Some(f64::from(x)),
            AttributeValue::Short(x) => Some(f64::from(x)),
            AttributeValue::Uint(x) => Some(f64::from(x)),
            AttributeValue::Int(x) => Some(f64::from(x)),
            AttributeValue::Ulonglong(x) => Some(x as f64),
            AttributeValue::Longlong(x) => Some(x as f64),
            AttributeValue::Float(x) => Some(f64::from(x)),
            AttributeValue::Double(x) => Some(x),
            _ => None,
        })
}

/// Reads an `NC_CHAR` variable as byte strings along its last dimension.
fn read_char_array(var: &netcdf::Variable<'_>, name: &str, shape: Vec<usize>) -> Nc2JsonResult<ArrayData> {
    let raw = var.get_raw_values(..)?;

    let Some((&width, outer)) = shape.split_last() else {
        // A dimensionless char variable holds a single character
        return Ok(ArrayData::scalar(Element::Bytes(strip_nul_padding(&raw))));
    };

    let count: usize = outer.iter().product();
    let strings: Vec<Vec<u8>> = if width == 0 {
        vec![Vec::new(); count]
    } else {
        raw.chunks(width).map(strip_nul_padding).collect()
    };

    ArrayData::new(outer.to_vec(), Values::Bytes(strings))
        .ok_or_else(|| Nc2JsonError::unsupported_variable(name, "character data does not match shape"))
}

fn strip_nul_padding(chunk: &[u8]) -> Vec<u8> {
    let end = chunk.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    chunk[..end].to_vec()
}

/// Reads an `NC_STRING` variable; scalars and vectors only.
fn read_string_array(var: &netcdf::Variable<'_>, name: &str, shape: Vec<usize>) -> Nc2JsonResult<ArrayData> {
    match shape.as_slice() {
        [] => {
            let value = var.get_string(..)?;
            Ok(ArrayData::scalar(Element::Bytes(value.into_bytes())))
        }
        [len] => {
            let mut strings = Vec::with_capacity(*len);
            for i in 0..*len {
                strings.push(var.get_string(i)?.into_bytes());
            }
            Ok(ArrayData::byte_strings(strings))
        }
        _ => Err(Nc2JsonError::unsupported_variable(
            name,
            "multi-dimensional string variables are not supported",
        )),
    }
}

/// Maps a global attribute onto the output value model.
fn attribute_to_field(value: AttributeValue) -> FieldValue {
    fn ints<T: Into<i64>>(v: Vec<T>) -> FieldValue {
        FieldValue::Array(v.into_iter().map(|x| Scalar::Integer(x.into())).collect())
    }

    match value {
        AttributeValue::Str(s) => FieldValue::Scalar(Scalar::Text(s)),
        AttributeValue::Strs(v) => FieldValue::Array(v.into_iter().map(Scalar::Text).collect()),
        AttributeValue::Uchar(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Schar(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Ushort(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Short(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Uint(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Int(x) => FieldValue::Scalar(Scalar::Integer(x.into())),
        AttributeValue::Ulonglong(x) => FieldValue::Scalar(unsigned_scalar(x)),
        AttributeValue::Longlong(x) => FieldValue::Scalar(Scalar::Integer(x)),
        AttributeValue::Float(x) => FieldValue::Scalar(Scalar::Float(x.into())),
        AttributeValue::Double(x) => FieldValue::Scalar(Scalar::Float(x)),
        AttributeValue::Uchars(v) => ints(v),
        AttributeValue::Schars(v) => ints(v),
        AttributeValue::Ushorts(v) => ints(v),
        AttributeValue::Shorts(v) => ints(v),
        AttributeValue::Uints(v) => ints(v),
        AttributeValue::Ints(v) => ints(v),
        AttributeValue::Longlongs(v) => ints(v),
        AttributeValue::Ulonglongs(v) => FieldValue::Array(v.into_iter().map(unsigned_scalar).collect()),
        AttributeValue::Floats(v) => FieldValue::Array(v.into_iter().map(|x| Scalar::Float(x.into())).collect()),
        AttributeValue::Doubles(v) => FieldValue::Array(v.into_iter().map(Scalar::Float).collect()),
    }
}

fn unsigned_scalar(x: u64) -> Scalar {
    match i64::try_from(x) {
        Ok(v) => Scalar::Integer(v),
        Err(_) => Scalar::Float(x as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_nul_padding() {
        assert_eq!(strip_nul_padding(b"SLOCUM\0\0\0"), b"SLOCUM".to_vec());
        assert_eq!(strip_nul_padding(b"\0\0"), Vec::<u8>::new());
        assert_eq!(strip_nul_padding(b"a\0b"), b"a\0b".to_vec());
    }

    #[test]
    fn test_attribute_mapping() {
        assert_eq!(
            attribute_to_field(AttributeValue::Str("EGO glider time-series data".into())),
            FieldValue::Scalar(Scalar::Text("EGO glider time-series data".into()))
        );
        assert_eq!(
            attribute_to_field(AttributeValue::Double(45.25)),
            FieldValue::Scalar(Scalar::Float(45.25))
        );
        assert_eq!(
            attribute_to_field(AttributeValue::Shorts(vec![1, 2])),
            FieldValue::Array(vec![Scalar::Integer(1), Scalar::Integer(2)])
        );
        assert_eq!(
            attribute_to_field(AttributeValue::Ulonglong(u64::MAX)),
            FieldValue::Scalar(Scalar::Float(u64::MAX as f64))
        );
    }

    #[test]
    fn test_open_missing_local_path_is_unavailable() {
        let result = open_with_progress("/nonexistent/dir/sea017_20230613_R.nc", false);
        assert!(matches!(result, Err(Nc2JsonError::SourceUnavailable { .. })));
    }
}
