//! Encoded polyline codec (precision 5).
//!
//! Each coordinate is scaled by 1e5, rounded, and delta-encoded against the
//! previous point. Deltas are zig-zag encoded and emitted as 5-bit groups with a
//! continuation bit, offset into the printable range starting at `'?'`.

use thiserror::Error;

use crate::spatial::Coordinate;

const FACTOR: f64 = 1e5;
const CHAR_OFFSET: u8 = 63;
const CONTINUATION: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;
const MAX_SHIFT: u32 = 60;

/// Errors returned while decoding a polyline string. Indices are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("invalid character {byte:#04x} at byte {index}")]
    InvalidCharacter { index: usize, byte: u8 },

    #[error("value starting at byte {index} is truncated")]
    TruncatedValue { index: usize },

    #[error("latitude without longitude at byte {index}")]
    MissingLongitude { index: usize },

    #[error("value starting at byte {index} overflows")]
    Overflow { index: usize },
}

/// Decode an encoded polyline into coordinates. An empty string decodes to an
/// empty path.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let (dlat, next) = decode_value(bytes, index)?;
        if next >= bytes.len() {
            return Err(PolylineError::MissingLongitude { index: next });
        }
        let (dlng, next) = decode_value(bytes, next)?;

        lat = lat
            .checked_add(dlat)
            .ok_or(PolylineError::Overflow { index })?;
        lng = lng
            .checked_add(dlng)
            .ok_or(PolylineError::Overflow { index })?;
        points.push(Coordinate::new(lat as f64 / FACTOR, lng as f64 / FACTOR));
        index = next;
    }

    Ok(points)
}

/// Encode coordinates into a polyline string.
///
/// Non-finite components encode as zero.
pub fn encode(coordinates: &[Coordinate]) -> String {
    let mut out = String::with_capacity(coordinates.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for coordinate in coordinates {
        let lat = scale(coordinate.lat);
        let lng = scale(coordinate.lng);
        encode_value(lat.wrapping_sub(prev_lat), &mut out);
        encode_value(lng.wrapping_sub(prev_lng), &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn scale(value: f64) -> i64 {
    // `round` is half away from zero; the saturating cast maps NaN to 0.
    (value * FACTOR).round() as i64
}

fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut index = start;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or(PolylineError::TruncatedValue { index: start })?;
        if !(CHAR_OFFSET..=b'~').contains(&byte) {
            return Err(PolylineError::InvalidCharacter { index, byte });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow { index: start });
        }

        let chunk = u64::from(byte - CHAR_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;
        index += 1;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    let value = ((result >> 1) as i64) ^ -((result & 1) as i64);
    Ok((value, index))
}

fn encode_value(value: i64, out: &mut String) {
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    while zigzag >= CONTINUATION {
        out.push(char::from(
            ((CONTINUATION | (zigzag & CHUNK_MASK)) as u8) + CHAR_OFFSET,
        ));
        zigzag >>= 5;
    }
    out.push(char::from(zigzag as u8 + CHAR_OFFSET));
}
