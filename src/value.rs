//! # Value Model
//!
//! Types shared by the loader, the converter and the writer.
//!
//! - [`Element`]: one raw item as it comes out of an array (numbers or bytes)
//! - [`Scalar`]: one JSON-safe value after byte strings have been decoded
//! - [`ArrayData`]: an in-memory variable with its shape
//! - [`FieldValue`], [`BoundingBox`], [`Document`]: the output document

/// A raw element read from a variable, before any byte-string decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Float(f64),
    Integer(i64),
    Bytes(Vec<u8>),
}

/// A single JSON-safe value.
///
/// `Float` may hold NaN or infinities; the writer emits them as the
/// non-standard literals `NaN`, `Infinity` and `-Infinity`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Float(f64),
    Integer(i64),
    Text(String),
}

/// Element storage of an [`ArrayData`], one vector per element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Float(Vec<f64>),
    Integer(Vec<i64>),
    Bytes(Vec<Vec<u8>>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Float(v) => v.len(),
            Values::Integer(v) => v.len(),
            Values::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An array-like variable: a shape plus its elements in row-major order.
///
/// A zero-dimensional variable has an empty shape and exactly one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    shape: Vec<usize>,
    values: Values,
}

impl ArrayData {
    /// Builds an array, checking that the element count matches the shape.
    pub fn new(shape: Vec<usize>, values: Values) -> Option<Self> {
        let expected: usize = shape.iter().product();
        (expected == values.len()).then_some(ArrayData { shape, values })
    }

    pub fn scalar(element: Element) -> Self {
        let values = match element {
            Element::Float(v) => Values::Float(vec![v]),
            Element::Integer(v) => Values::Integer(vec![v]),
            Element::Bytes(v) => Values::Bytes(vec![v]),
        };
        ArrayData {
            shape: Vec::new(),
            values,
        }
    }

    pub fn floats(values: Vec<f64>) -> Self {
        ArrayData {
            shape: vec![values.len()],
            values: Values::Float(values),
        }
    }

    pub fn integers(values: Vec<i64>) -> Self {
        ArrayData {
            shape: vec![values.len()],
            values: Values::Integer(values),
        }
    }

    pub fn byte_strings(values: Vec<Vec<u8>>) -> Self {
        ArrayData {
            shape: vec![values.len()],
            values: Values::Bytes(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements (1 for a scalar).
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Element at a linear (row-major) index.
    pub fn item(&self, index: usize) -> Option<Element> {
        match &self.values {
            Values::Float(v) => v.get(index).map(|x| Element::Float(*x)),
            Values::Integer(v) => v.get(index).map(|x| Element::Integer(*x)),
            Values::Bytes(v) => v.get(index).map(|x| Element::Bytes(x.clone())),
        }
    }

    /// All elements as `f64`, or `None` for byte strings.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match &self.values {
            Values::Float(v) => Some(v.clone()),
            Values::Integer(v) => Some(v.iter().map(|x| *x as f64).collect()),
            Values::Bytes(_) => None,
        }
    }

    /// Truth value of every element: non-zero numbers (NaN included) and
    /// non-empty byte strings are true.
    pub fn truthiness(&self) -> Vec<bool> {
        match &self.values {
            Values::Float(v) => v.iter().map(|x| *x != 0.0).collect(),
            Values::Integer(v) => v.iter().map(|x| *x != 0).collect(),
            Values::Bytes(v) => v.iter().map(|x| !x.is_empty()).collect(),
        }
    }
}

/// A value in the `variables` or `attributes` section.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

impl FieldValue {
    pub fn as_array(&self) -> Option<&[Scalar]> {
        match self {
            FieldValue::Array(items) => Some(items),
            FieldValue::Scalar(_) => None,
        }
    }
}

/// Time range and lat/lon rectangle of the quality-controlled GPS fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub time_gps_min: f64,
    pub time_gps_max: f64,
    /// `(lat_min, lon_min)`
    pub lower_left: (f64, f64),
    /// `(lat_max, lon_max)`
    pub upper_right: (f64, f64),
}

/// The JSON document produced for one archive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub dimensions: Vec<String>,
    pub dimensions_without_coords: Vec<String>,
    pub variables: Vec<(String, FieldValue)>,
    pub attributes: Vec<(String, FieldValue)>,
    /// `None` when no quality-controlled GPS fix survived the mask.
    pub bounding_box: Option<BoundingBox>,
}

impl Document {
    pub fn variable(&self, name: &str) -> Option<&FieldValue> {
        self.variables.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}
