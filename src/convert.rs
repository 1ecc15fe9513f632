//! # Converter
//!
//! Turns an opened [`Dataset`] into a [`Document`].
//!
//! ## Sections
//!
//! - **dimensions / dimensions_without_coords**: every dimension lands in
//!   exactly one of the two lists, in order of first use
//! - **variables**: data variables only; scalars as bare values, arrays capped
//!   at [`MAX_ARRAY_SIZE`] elements with empty strings dropped
//! - **attributes**: global attributes copied verbatim
//! - **bounding_box**: extent of the quality-controlled GPS fixes

use crate::dataset::Dataset;
use crate::decode::decode_bytes;
use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::input::BoundingBoxConfig;
use crate::value::{BoundingBox, Document, Element, FieldValue, Scalar};
use log::{debug, warn};

/// Maximum number of elements emitted per array-valued variable.
pub const MAX_ARRAY_SIZE: usize = 15;

/// Splits the dimensions into those with and those without coordinates.
pub fn classify_dimensions(dataset: &dyn Dataset) -> (Vec<String>, Vec<String>) {
    dataset
        .dimensions()
        .into_iter()
        .partition(|dim| !dataset.coordinates_of(dim).is_empty())
}

/// Extracts every data variable in file order.
///
/// # Errors
///
/// Fails on the first variable that cannot be read or whose text cannot be
/// repaired.
pub fn extract_variables(dataset: &dyn Dataset) -> Nc2JsonResult<Vec<(String, FieldValue)>> {
    let mut variables = Vec::new();

    for name in dataset.data_variable_names() {
        let data = dataset.read_variable(&name)?;

        let value = if data.is_scalar() {
            let element = data
                .item(0)
                .ok_or_else(|| Nc2JsonError::unsupported_variable(&name, "scalar holds no element"))?;
            FieldValue::Scalar(element_to_scalar(element)?)
        } else {
            let mut items = Vec::new();
            for i in 0..data.size().min(MAX_ARRAY_SIZE) {
                let Some(element) = data.item(i) else { break };
                match element_to_scalar(element)? {
                    Scalar::Text(text) if text.is_empty() => {}
                    scalar => items.push(scalar),
                }
            }
            FieldValue::Array(items)
        };

        debug!("Extracted variable {} (shape {:?})", name, data.shape());
        variables.push((name, value));
    }

    Ok(variables)
}

fn element_to_scalar(element: Element) -> Nc2JsonResult<Scalar> {
    Ok(match element {
        Element::Float(v) => Scalar::Float(v),
        Element::Integer(v) => Scalar::Integer(v),
        Element::Bytes(raw) => Scalar::Text(decode_bytes(&raw)?),
    })
}

/// Copies the global attributes unchanged.
pub fn extract_attributes(dataset: &dyn Dataset) -> Nc2JsonResult<Vec<(String, FieldValue)>> {
    dataset.attributes()
}

/// Computes the time range and lat/lon rectangle of the GPS fixes whose
/// quality-control flag is set.
///
/// # Errors
///
/// - [`Nc2JsonError::MissingVariable`] if a configured variable is absent
/// - [`Nc2JsonError::QcLengthMismatch`] if flags and values differ in length
/// - [`Nc2JsonError::EmptyQualityControlledSet`] if no finite value survives
///   the mask
pub fn compute_bounding_box(dataset: &dyn Dataset, config: &BoundingBoxConfig) -> Nc2JsonResult<BoundingBox> {
    let (time_min, time_max) = qc_range(dataset, &config.time_variable, &config.time_qc_variable)?;
    let (lat_min, lat_max) = qc_range(dataset, &config.latitude_variable, &config.position_qc_variable)?;
    let (lon_min, lon_max) = qc_range(dataset, &config.longitude_variable, &config.position_qc_variable)?;

    Ok(BoundingBox {
        time_gps_min: time_min,
        time_gps_max: time_max,
        lower_left: (lat_min, lon_min),
        upper_right: (lat_max, lon_max),
    })
}

/// (min, max) of the finite values of `variable` whose flag in `qc_variable`
/// is truthy.
fn qc_range(dataset: &dyn Dataset, variable: &str, qc_variable: &str) -> Nc2JsonResult<(f64, f64)> {
    let values = dataset
        .read_variable(variable)?
        .to_f64_vec()
        .ok_or_else(|| Nc2JsonError::NonNumericVariable(variable.to_string()))?;
    let flags = dataset.read_variable(qc_variable)?.truthiness();

    if flags.len() != values.len() {
        return Err(Nc2JsonError::QcLengthMismatch {
            variable: variable.to_string(),
            values: values.len(),
            flags: flags.len(),
        });
    }

    let kept = values
        .into_iter()
        .zip(flags)
        .filter_map(|(v, keep)| keep.then_some(v))
        .filter(|v| !v.is_nan());

    let range = kept.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
    });

    range.ok_or_else(|| Nc2JsonError::EmptyQualityControlledSet {
        variable: variable.to_string(),
    })
}

/// Assembles the full document for `dataset`.
///
/// An empty quality-controlled set leaves `bounding_box` unset; every other
/// failure is returned.
pub fn build_document(dataset: &dyn Dataset, config: &BoundingBoxConfig) -> Nc2JsonResult<Document> {
    let (dimensions, dimensions_without_coords) = classify_dimensions(dataset);
    let variables = extract_variables(dataset)?;
    let attributes = extract_attributes(dataset)?;

    let bounding_box = match compute_bounding_box(dataset, config) {
        Ok(bb) => Some(bb),
        Err(Nc2JsonError::EmptyQualityControlledSet { variable }) => {
            warn!("No quality-controlled samples for {}, bounding box left empty", variable);
            None
        }
        Err(e) => return Err(e),
    };

    debug!(
        "Document: {} dimensions, {} without coords, {} variables, {} attributes",
        dimensions.len(),
        dimensions_without_coords.len(),
        variables.len(),
        attributes.len()
    );

    Ok(Document {
        dimensions,
        dimensions_without_coords,
        variables,
        attributes,
        bounding_box,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::value::{ArrayData, Values};

    fn gps_dataset(time_qc: Vec<i64>, lat: Vec<f64>, lon: Vec<f64>, position_qc: Vec<i64>) -> MemoryDataset {
        let n = lat.len();
        MemoryDataset::new()
            .with_variable(
                "TIME_GPS",
                &["TIME_GPS"],
                ArrayData::floats((0..n).map(|i| 1.686e9 + 60.0 * i as f64).collect()),
            )
            .with_variable("TIME_GPS_QC", &["TIME_GPS"], ArrayData::integers(time_qc))
            .with_variable("LATITUDE_GPS", &["TIME_GPS"], ArrayData::floats(lat))
            .with_variable("LONGITUDE_GPS", &["TIME_GPS"], ArrayData::floats(lon))
            .with_variable("POSITION_GPS_QC", &["TIME_GPS"], ArrayData::integers(position_qc))
    }

    #[test]
    fn test_scalar_byte_variable_is_decoded_text() {
        let ds = MemoryDataset::new().with_variable(
            "PLATFORM_TYPE",
            &[],
            ArrayData::scalar(Element::Bytes(b"  SLOCUM G2 \n".to_vec())),
        );

        let variables = extract_variables(&ds).unwrap();
        assert_eq!(
            variables,
            vec![(
                "PLATFORM_TYPE".to_string(),
                FieldValue::Scalar(Scalar::Text("SLOCUM G2".into()))
            )]
        );
    }

    #[test]
    fn test_scalar_empty_text_is_kept() {
        let ds = MemoryDataset::new().with_variable("COMMENT", &[], ArrayData::scalar(Element::Bytes(b"   ".to_vec())));
        let variables = extract_variables(&ds).unwrap();
        assert_eq!(variables[0].1, FieldValue::Scalar(Scalar::Text(String::new())));
    }

    #[test]
    fn test_scalar_nan_is_preserved() {
        let ds = MemoryDataset::new().with_variable("DEPLOYMENT_DEPTH", &[], ArrayData::scalar(Element::Float(f64::NAN)));
        let variables = extract_variables(&ds).unwrap();
        match &variables[0].1 {
            FieldValue::Scalar(Scalar::Float(v)) => assert!(v.is_nan()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_array_truncated_to_first_fifteen() {
        let values: Vec<f64> = (0..40).map(|i| i as f64 * 0.5).collect();
        let ds = MemoryDataset::new()
            .with_variable("TEMP", &["TIME"], ArrayData::floats(values.clone()));

        let variables = extract_variables(&ds).unwrap();
        let items = variables[0].1.as_array().unwrap();
        assert_eq!(items.len(), MAX_ARRAY_SIZE);
        let expected: Vec<Scalar> = values[..MAX_ARRAY_SIZE].iter().map(|v| Scalar::Float(*v)).collect();
        assert_eq!(items, expected.as_slice());
    }

    #[test]
    fn test_multidimensional_array_uses_linear_order() {
        let data = ArrayData::new(vec![4, 5], Values::Integer((0..20).collect())).unwrap();
        let ds = MemoryDataset::new()
            .with_variable("CALIB", &["N_PARAM", "N_CALIB"], data);

        let variables = extract_variables(&ds).unwrap();
        let expected: Vec<Scalar> = (0..15).map(Scalar::Integer).collect();
        assert_eq!(variables[0].1.as_array().unwrap(), expected.as_slice());
    }

    #[test]
    fn test_array_drops_empty_strings_and_repairs_bytes() {
        let ds = MemoryDataset::new().with_variable(
            "SENSOR",
            &["N_PARAM"],
            ArrayData::byte_strings(vec![
                b"CTD_TEMP".to_vec(),
                b"   ".to_vec(),
                b"ab\xc3(cd".to_vec(),
                Vec::new(),
            ]),
        );

        let variables = extract_variables(&ds).unwrap();
        assert_eq!(
            variables[0].1,
            FieldValue::Array(vec![Scalar::Text("CTD_TEMP".into()), Scalar::Text("ab?(cd".into())])
        );
    }

    #[test]
    fn test_truncated_utf8_is_fatal() {
        let ds = MemoryDataset::new().with_variable("PI_NAME", &[], ArrayData::scalar(Element::Bytes(b"abc\xe2\x82".to_vec())));
        assert!(matches!(
            extract_variables(&ds),
            Err(Nc2JsonError::MalformedByteSequence(_))
        ));
    }

    #[test]
    fn test_coordinates_are_not_variables() {
        let ds = MemoryDataset::new()
            .with_variable("TIME", &["TIME"], ArrayData::floats(vec![0.0, 1.0]))
            .with_variable("TEMP", &["TIME"], ArrayData::floats(vec![12.1, 12.4]));

        let names: Vec<String> = extract_variables(&ds).unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["TEMP"]);
    }

    #[test]
    fn test_dimension_partition_is_total_and_disjoint() {
        let ds = MemoryDataset::new()
            .with_variable("TIME", &["TIME"], ArrayData::floats(vec![0.0, 1.0, 2.0]))
            .with_variable("TIME_GPS", &["TIME_GPS"], ArrayData::floats(vec![0.0, 1.0]))
            .with_variable("SENSOR", &["N_PARAM"], ArrayData::integers(vec![1, 2, 3, 4]))
            .with_variable(
                "CALIB",
                &["N_PARAM", "N_CALIB"],
                ArrayData::new(vec![4, 2], Values::Integer(vec![0; 8])).unwrap(),
            );

        let (with, without) = classify_dimensions(&ds);
        assert_eq!(with, vec!["TIME", "TIME_GPS"]);
        assert_eq!(without, vec!["N_PARAM", "N_CALIB"]);
    }

    #[test]
    fn test_bounding_box_single_valid_latitude() {
        let ds = gps_dataset(
            vec![1, 1, 1],
            vec![41.0, 42.5, 43.0],
            vec![8.0, 9.0, 10.0],
            vec![0, 1, 0],
        );

        let bb = compute_bounding_box(&ds, &BoundingBoxConfig::default()).unwrap();
        assert_eq!(bb.lower_left.0, 42.5);
        assert_eq!(bb.upper_right.0, 42.5);
        assert_eq!(bb.lower_left.1, 9.0);
        assert_eq!(bb.time_gps_min, 1.686e9);
        assert_eq!(bb.time_gps_max, 1.686e9 + 120.0);
    }

    #[test]
    fn test_bounding_box_is_ordered() {
        let ds = gps_dataset(
            vec![1, 0, 1, 1],
            vec![43.7, 43.1, f64::NAN, 42.9],
            vec![7.4, 7.9, 7.0, 7.6],
            vec![1, 1, 1, 1],
        );

        let bb = compute_bounding_box(&ds, &BoundingBoxConfig::default()).unwrap();
        assert!(bb.lower_left.0 <= bb.upper_right.0);
        assert!(bb.lower_left.1 <= bb.upper_right.1);
        assert!(bb.time_gps_min <= bb.time_gps_max);
        assert_eq!(bb.lower_left, (42.9, 7.0));
        assert_eq!(bb.upper_right, (43.7, 7.9));
        assert_eq!(bb.time_gps_max, 1.686e9 + 180.0);
    }

    #[test]
    fn test_bounding_box_empty_mask() {
        let ds = gps_dataset(vec![1, 1], vec![42.0, 42.1], vec![8.0, 8.1], vec![0, 0]);

        let err = compute_bounding_box(&ds, &BoundingBoxConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Nc2JsonError::EmptyQualityControlledSet { ref variable } if variable == "LATITUDE_GPS"
        ));

        let doc = build_document(&ds, &BoundingBoxConfig::default()).unwrap();
        assert!(doc.bounding_box.is_none());
    }

    #[test]
    fn test_bounding_box_qc_length_mismatch() {
        let ds = gps_dataset(vec![1], vec![42.0, 42.1], vec![8.0, 8.1], vec![1, 1]);
        assert!(matches!(
            compute_bounding_box(&ds, &BoundingBoxConfig::default()),
            Err(Nc2JsonError::QcLengthMismatch { values: 2, flags: 1, .. })
        ));
    }

    #[test]
    fn test_bounding_box_missing_variable_is_fatal() {
        let ds = MemoryDataset::new().with_variable("TIME", &["TIME"], ArrayData::floats(vec![0.0]));
        assert!(matches!(
            build_document(&ds, &BoundingBoxConfig::default()),
            Err(Nc2JsonError::MissingVariable(ref name)) if name == "TIME_GPS"
        ));
    }

    #[test]
    fn test_bounding_box_custom_names() {
        let ds = MemoryDataset::new()
            .with_variable("t", &["t"], ArrayData::floats(vec![5.0, 6.0]))
            .with_variable("t_qc", &["t"], ArrayData::integers(vec![1, 1]))
            .with_variable("lat", &["t"], ArrayData::floats(vec![1.0, 2.0]))
            .with_variable("lon", &["t"], ArrayData::floats(vec![3.0, 4.0]))
            .with_variable("pos_qc", &["t"], ArrayData::integers(vec![1, 1]));
        let config = BoundingBoxConfig {
            time_variable: "t".into(),
            time_qc_variable: "t_qc".into(),
            latitude_variable: "lat".into(),
            longitude_variable: "lon".into(),
            position_qc_variable: "pos_qc".into(),
        };

        let bb = compute_bounding_box(&ds, &config).unwrap();
        assert_eq!(bb.lower_left, (1.0, 3.0));
        assert_eq!(bb.upper_right, (2.0, 4.0));
    }

    #[test]
    fn test_document_sections() {
        let ds = gps_dataset(vec![1, 1], vec![42.0, 42.1], vec![8.0, 8.1], vec![1, 1])
            .with_variable("SENSOR_ID", &["N_PARAM"], ArrayData::integers(vec![101, 102]))
            .with_variable(
                "PLATFORM_TYPE",
                &[],
                ArrayData::scalar(Element::Bytes(b"SLOCUM".to_vec())),
            )
            .with_attribute("title", FieldValue::Scalar(Scalar::Text("sea017 mission".into())));

        let doc = build_document(&ds, &BoundingBoxConfig::default()).unwrap();
        assert_eq!(doc.dimensions, vec!["TIME_GPS"]);
        assert_eq!(doc.dimensions_without_coords, vec!["N_PARAM"]);
        assert_eq!(
            doc.variable("PLATFORM_TYPE"),
            Some(&FieldValue::Scalar(Scalar::Text("SLOCUM".into())))
        );
        assert_eq!(
            doc.attribute("title"),
            Some(&FieldValue::Scalar(Scalar::Text("sea017 mission".into())))
        );
        assert!(doc.variable("TIME_GPS").is_none());
        assert!(doc.bounding_box.is_some());
    }
}
