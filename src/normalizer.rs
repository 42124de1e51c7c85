//! Sample normalization
//!
//! This module turns raw records into typed gaze samples.
//! - Coordinates must be finite, otherwise the row is rejected
//! - Integer fields that fail to parse pass through as `None`
//! - Text fields are copied verbatim
//!
//! Numeric parsing is prefix-based and never fails: leading whitespace is
//! skipped and the longest numeric prefix is used, so `"12px"` reads as 12 and
//! `"abc"` reads as not-a-number.

use crate::config::ColumnMap;
use crate::schema::RawRecord;
use crate::types::GazeSample;

/// Normalizer for converting raw records to gaze samples
#[derive(Debug, Clone, Default)]
pub struct SampleNormalizer {
    columns: ColumnMap,
}

impl SampleNormalizer {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Normalize one record, or `None` when its coordinates are not plottable
    pub fn normalize(&self, record: &RawRecord) -> Option<GazeSample> {
        let x = parse_float(record.get(&self.columns.x).unwrap_or_default());
        let y = parse_float(record.get(&self.columns.y).unwrap_or_default());

        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        Some(GazeSample {
            timestamp: record.get(&self.columns.timestamp).and_then(parse_int),
            participant: text_field(record, &self.columns.participant),
            x,
            y,
            fixation_duration: record
                .get(&self.columns.fixation_duration)
                .and_then(parse_int),
            aoi_name: text_field(record, &self.columns.aoi_name),
        })
    }
}

fn text_field(record: &RawRecord, column: &str) -> String {
    record.get(column).unwrap_or_default().to_string()
}

/// Parse the leading base-10 integer of `input`.
///
/// Returns `None` when there are no leading digits or the value does not fit
/// in an `i64`.
pub fn parse_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();

    let sign_len = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digit_len = count_digits(&bytes[sign_len..]);

    if digit_len == 0 {
        return None;
    }

    trimmed[..sign_len + digit_len].parse().ok()
}

/// Parse the leading decimal number of `input`.
///
/// Accepts an optional sign, digits with an optional fraction, an optional
/// exponent and the literal `Infinity`. Returns `NaN` when no number leads.
pub fn parse_float(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();

    let negative = bytes.first() == Some(&b'-');
    let sign_len = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if trimmed[sign_len..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let mut end = sign_len;
    let int_len = count_digits(&bytes[end..]);
    end += int_len;

    let mut frac_len = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_len = count_digits(&bytes[end + 1..]);
        if int_len > 0 || frac_len > 0 {
            end += 1 + frac_len;
        }
    }

    if int_len == 0 && frac_len == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exp_sign_len = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = count_digits(&bytes[(end + 1 + exp_sign_len).min(bytes.len())..]);
        if exp_digits > 0 {
            end += 1 + exp_sign_len + exp_digits;
        }
    }

    trimmed[..end].parse().unwrap_or(f64::NAN)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
