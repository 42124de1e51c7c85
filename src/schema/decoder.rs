//! Header-keyed decoding of comma-delimited text
//!
//! Deliberately minimal: lines split on `\n`, fields split on `,`, no quoting.
//! A comma inside a value is indistinguishable from a separator.

use crate::schema::raw_record::RawRecord;

const FIELD_SEPARATOR: char = ',';
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Result of decoding a whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFile {
    /// Trimmed header names in column order
    pub headers: Vec<String>,
    /// One record per line after the header
    pub records: Vec<RawRecord>,
}

/// Decoder from file text to raw records
pub struct RecordDecoder;

impl RecordDecoder {
    /// Decode the full file text.
    ///
    /// Rows are zipped positionally against the header: short rows leave the
    /// trailing keys absent and surplus fields are dropped. Column-count
    /// mismatches are never reported.
    pub fn decode(text: &str) -> DecodedFile {
        let mut lines = text.split('\n').map(strip_carriage_return);

        let headers: Vec<String> = lines
            .next()
            .unwrap_or_default()
            .split(FIELD_SEPARATOR)
            .map(|header| {
                header
                    .trim_matches(|c: char| c.is_whitespace() || c == BYTE_ORDER_MARK)
                    .to_string()
            })
            .collect();

        let records = lines.map(|line| decode_row(&headers, line)).collect();

        DecodedFile { headers, records }
    }
}

fn decode_row(headers: &[String], line: &str) -> RawRecord {
    headers
        .iter()
        .zip(line.split(FIELD_SEPARATOR))
        .map(|(header, value)| (header.as_str(), value))
        .collect()
}

fn strip_carriage_return(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_basic() {
        let decoded = RecordDecoder::decode("timestamp,x,y\n1,2.0,3.0");

        assert_eq!(decoded.headers, vec!["timestamp", "x", "y"]);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].get("timestamp"), Some("1"));
        assert_eq!(decoded.records[0].get("x"), Some("2.0"));
        assert_eq!(decoded.records[0].get("y"), Some("3.0"));
    }

    #[test]
    fn test_header_fields_are_trimmed() {
        let decoded = RecordDecoder::decode("\u{feff} timestamp , x ,y \n1, 2 ,3");

        assert_eq!(decoded.headers, vec!["timestamp", "x", "y"]);
        // Values are not trimmed
        assert_eq!(decoded.records[0].get("x"), Some(" 2 "));
    }

    #[test]
    fn test_short_row_leaves_keys_absent() {
        let decoded = RecordDecoder::decode("a,b,c\n1,2");
        let record = &decoded.records[0];

        assert_eq!(record.get("a"), Some("1"));
        assert_eq!(record.get("b"), Some("2"));
        assert!(!record.contains("c"));
    }

    #[test]
    fn test_long_row_drops_surplus_fields() {
        let decoded = RecordDecoder::decode("a,b\n1,2,3,4");
        assert_eq!(decoded.records[0].len(), 2);
    }

    #[test]
    fn test_trailing_newline_yields_empty_record() {
        let decoded = RecordDecoder::decode("a,b\n1,2\n");

        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[1].get("a"), Some(""));
        assert!(!decoded.records[1].contains("b"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let decoded = RecordDecoder::decode("a,b\r\n1,2\r\n3,4");

        assert_eq!(decoded.headers, vec!["a", "b"]);
        assert_eq!(decoded.records[0].get("b"), Some("2"));
        assert_eq!(decoded.records[1].get("b"), Some("4"));
    }

    #[test]
    fn test_header_only_and_empty_text() {
        assert!(RecordDecoder::decode("timestamp,x,y").records.is_empty());

        let empty = RecordDecoder::decode("");
        assert_eq!(empty.headers, vec![""]);
        assert!(empty.records.is_empty());
    }

    #[test]
    fn test_quoted_comma_is_a_separator() {
        let decoded = RecordDecoder::decode("name,x\n\"a,b\",1");
        assert_eq!(decoded.records[0].get("name"), Some("\"a"));
        assert_eq!(decoded.records[0].get("x"), Some("b\""));
    }
}
