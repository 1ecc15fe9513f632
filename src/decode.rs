//! # Byte-String Repair
//!
//! Glider archives mix legacy 8-bit text with structurally invalid UTF-8. Text
//! fields are recovered on a best-effort basis: every invalid byte sequence is
//! overwritten with `?` and the whole buffer is decoded again, so the valid
//! portion of a field always survives.
//!
//! Only two failure categories are repairable: an invalid start byte and an
//! invalid continuation byte. A multi-byte sequence cut short by the end of the
//! buffer is reported as [`DecodeError`] instead of being guessed at.

use log::trace;
use thiserror::Error;

/// Byte written over every invalid sequence.
pub const REPLACEMENT_BYTE: u8 = b'?';

/// An undecodable byte string whose failure is not a recoverable category.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed byte sequence at offset {offset}: unexpected end of data")]
pub struct DecodeError {
    /// Offset of the truncated sequence in the buffer.
    pub offset: usize,
}

/// Decodes `raw` as UTF-8, repairing invalid bytes, and trims surrounding whitespace.
///
/// # Examples
///
/// ```rust
/// use nc2json::decode::decode_bytes;
///
/// assert_eq!(decode_bytes(b"  slocum glider \n").unwrap(), "slocum glider");
/// assert_eq!(decode_bytes(b"Br\xe9st").unwrap(), "Br?st");
/// ```
///
/// # Errors
///
/// Returns [`DecodeError`] when the buffer ends in the middle of a multi-byte
/// sequence.
pub fn decode_bytes(raw: &[u8]) -> Result<String, DecodeError> {
    repair(raw).map(|(text, _)| text)
}

/// Runs the repair loop and reports how many passes rewrote bytes.
fn repair(raw: &[u8]) -> Result<(String, usize), DecodeError> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Ok((trim(text), 0));
    }

    let mut buffer = raw.to_vec();
    let mut passes = 0;

    // Each pass turns at least one byte into ASCII, so the loop runs at most
    // raw.len() times.
    loop {
        match std::str::from_utf8(&buffer) {
            Ok(text) => return Ok((trim(text), passes)),
            Err(err) => {
                let start = err.valid_up_to();
                let len = err.error_len().ok_or(DecodeError { offset: start })?;
                trace!("Replacing {} invalid byte(s) at offset {}", len, start);
                buffer[start..start + len].fill(REPLACEMENT_BYTE);
                passes += 1;
                debug_assert!(passes <= raw.len());
            }
        }
    }
}

/// Strips leading and trailing whitespace, counting the ASCII information
/// separators (U+001C..U+001F) as whitespace.
fn trim(text: &str) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c))
        .to_string()
}
