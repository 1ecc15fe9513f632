//! # JSON Output Module
//!
//! Encodes a [`Document`] as indented JSON and writes it to disk.
//!
//! ## Encoding
//!
//! - 4-space indentation, `": "` between keys and values
//! - non-ASCII text is written literally, not `\u`-escaped
//! - NaN and infinities are written as the bare literals `NaN`, `Infinity`
//!   and `-Infinity`, which most JSON readers accept in lenient mode
//!
//! `serde_json` cannot produce those literals (it maps non-finite floats to
//! `null`), so the layout is emitted here and `serde_json` is only used to
//! escape strings.

use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::storage::{StorageBackend, StorageError, StorageFactory};
use crate::value::{BoundingBox, Document, FieldValue, Scalar};
use log::{debug, info};
use std::path::Path;

const INDENT: &str = "    ";

/// Intermediate JSON tree borrowing from the document.
enum Json<'a> {
    Null,
    Float(f64),
    Integer(i64),
    Text(&'a str),
    Array(Vec<Json<'a>>),
    Object(Vec<(&'a str, Json<'a>)>),
}

impl<'a> Json<'a> {
    fn from_scalar(scalar: &'a Scalar) -> Self {
        match scalar {
            Scalar::Float(v) => Json::Float(*v),
            Scalar::Integer(v) => Json::Integer(*v),
            Scalar::Text(s) => Json::Text(s),
        }
    }

    fn from_field(field: &'a FieldValue) -> Self {
        match field {
            FieldValue::Scalar(s) => Json::from_scalar(s),
            FieldValue::Array(items) => Json::Array(items.iter().map(Json::from_scalar).collect()),
        }
    }

    fn from_fields(fields: &'a [(String, FieldValue)]) -> Self {
        Json::Object(fields.iter().map(|(k, v)| (k.as_str(), Json::from_field(v))).collect())
    }

    fn from_names(names: &'a [String]) -> Self {
        Json::Array(names.iter().map(|n| Json::Text(n)).collect())
    }

    fn from_bounding_box(bb: &BoundingBox) -> Self {
        Json::Object(vec![
            ("TIME_GPS_MIN", Json::Float(bb.time_gps_min)),
            ("TIME_GPS_MAX", Json::Float(bb.time_gps_max)),
            (
                "LOWER_LEFT_LATLON_GPS",
                Json::Array(vec![Json::Float(bb.lower_left.0), Json::Float(bb.lower_left.1)]),
            ),
            (
                "UPPER_RIGHT_LATLON_GPS",
                Json::Array(vec![Json::Float(bb.upper_right.0), Json::Float(bb.upper_right.1)]),
            ),
        ])
    }

    fn emit(&self, out: &mut String, depth: usize) {
        match self {
            Json::Null => out.push_str("null"),
            Json::Float(v) => out.push_str(&format_float(*v)),
            Json::Integer(v) => out.push_str(&v.to_string()),
            Json::Text(s) => out.push_str(&quote(s)),
            Json::Array(items) if items.is_empty() => out.push_str("[]"),
            Json::Object(entries) if entries.is_empty() => out.push_str("{}"),
            Json::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    newline(out, depth + 1);
                    item.emit(out, depth + 1);
                }
                newline(out, depth);
                out.push(']');
            }
            Json::Object(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    newline(out, depth + 1);
                    out.push_str(&quote(key));
                    out.push_str(": ");
                    value.emit(out, depth + 1);
                }
                newline(out, depth);
                out.push('}');
            }
        }
    }
}

fn newline(out: &mut String, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "Infinity".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        // Debug keeps a trailing ".0" on whole numbers
        format!("{:?}", v)
    }
}

/// Encodes `document` as indented JSON.
///
/// # Examples
///
/// ```rust
/// use nc2json::output::serialize_document;
/// use nc2json::value::Document;
///
/// let json = serialize_document(&Document::default());
/// assert!(json.ends_with("\"bounding_box\": null\n}"));
/// ```
pub fn serialize_document(document: &Document) -> String {
    let bounding_box = match &document.bounding_box {
        Some(bb) => Json::from_bounding_box(bb),
        None => Json::Null,
    };

    let root = Json::Object(vec![
        ("dimensions", Json::from_names(&document.dimensions)),
        (
            "dimensions_without_coords",
            Json::from_names(&document.dimensions_without_coords),
        ),
        ("variables", Json::from_fields(&document.variables)),
        ("attributes", Json::from_fields(&document.attributes)),
        ("bounding_box", bounding_box),
    ]);

    let mut out = String::new();
    root.emit(&mut out, 0);
    out
}

/// Replaces `\uD800`-`\uDFFF` escapes that do not form a high/low pair with
/// U+FFFD.
///
/// Escaped backslashes are skipped, so a literal `\\uD800` in the text is not
/// touched.
pub fn repair_unpaired_surrogates(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos..];

        match surrogate_escape(escape) {
            Some(high) if is_high_surrogate(high) => {
                if let Some(low) = surrogate_escape(&escape[6..])
                    && is_low_surrogate(low)
                {
                    out.push_str(&escape[..12]);
                    rest = &escape[12..];
                } else {
                    out.push('\u{fffd}');
                    rest = &escape[6..];
                }
            }
            Some(_) => {
                out.push('\u{fffd}');
                rest = &escape[6..];
            }
            None => {
                let len = escape[1..].chars().next().map_or(1, |c| 1 + c.len_utf8());
                out.push_str(&escape[..len]);
                rest = &escape[len..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Code unit of a `\uXXXX` escape at the start of `s`, if it is a surrogate.
fn surrogate_escape(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("\\u")?.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let unit = u16::from_str_radix(hex, 16).ok()?;
    (0xD800..=0xDFFF).contains(&unit).then_some(unit)
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Encodes `document`, writes it to `destination` and optionally echoes it to
/// stdout.
///
/// Parent directories of `destination` are created as needed. Only local
/// destinations are writable; the HTTP backend is read-only.
///
/// # Errors
///
/// Returns [`Nc2JsonError::OutputPathUnwritable`] if the file cannot be
/// created or written.
pub fn write_document(document: &Document, destination: &Path, echo_to_stdout: bool) -> Nc2JsonResult<()> {
    let text = repair_unpaired_surrogates(&serialize_document(document));
    debug!("Encoded document: {} bytes", text.len());

    let path = destination.to_string_lossy();
    let storage = StorageFactory::from_path(&path)?;
    storage.write(&path, text.as_bytes()).map_err(|e| match e {
        StorageError::Io(source) => Nc2JsonError::output_unwritable(destination, source),
        StorageError::PermissionDenied(_) => Nc2JsonError::output_unwritable(
            destination,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        ),
        StorageError::Unsupported(reason) => Nc2JsonError::output_unwritable(
            destination,
            std::io::Error::new(std::io::ErrorKind::Unsupported, reason),
        ),
        other => Nc2JsonError::Storage(other),
    })?;
    info!("Wrote {}", destination.display());

    if echo_to_stdout {
        println!("{}", text);
    }
    Ok(())
}
