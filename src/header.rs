//! Header presence detection.
//!
//! Each value gets a one-byte signature: `D` for all digits, `d` for
//! mostly digits, `?` for anything else. A first row of text labels sitting
//! above numeric columns is a header; a first row with an all-digit value
//! never is.

use encoding_rs::Encoding;
use log::debug;

use crate::encoding::{decode_bytes, skip_bom};
use crate::error::Result;
use crate::metadata::{Dialect, NONE};

/// Default number of rows parsed for header detection.
pub const DEFAULT_HEADER_ROWS: usize = 100;

/// Share of data rows that must be numeric for a column to count as numeric.
const NUMERIC_RATIO: f64 = 0.9;

/// All ASCII digits, non-empty.
pub const DIGITS: u8 = b'D';
/// At least one digit, and at least four digits per letter.
pub const MOSTLY_DIGITS: u8 = b'd';
/// Anything else.
pub const TEXT: u8 = b'?';

/// Classify one value.
pub fn signature(value: &str) -> u8 {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return DIGITS;
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let letters = value.chars().filter(|c| c.is_alphabetic()).count();
    if digits > 0 && digits >= 4 * letters {
        MOSTLY_DIGITS
    } else {
        TEXT
    }
}

/// Signature of every value in a row.
pub fn row_signature(row: &[String]) -> Vec<u8> {
    row.iter().map(|value| signature(value)).collect()
}

/// Column signature over `rows`: [`MOSTLY_DIGITS`] where more than 90% of
/// the rows are numeric in that column, [`TEXT`] elsewhere.
///
/// Rows too short to reach a column count against it.
pub fn aggregate_signature(rows: &[Vec<String>], width: usize) -> Vec<u8> {
    let mut numeric = vec![0usize; width];
    for row in rows {
        for (col, value) in row.iter().take(width).enumerate() {
            if matches!(signature(value), DIGITS | MOSTLY_DIGITS) {
                numeric[col] += 1;
            }
        }
    }
    let needed = rows.len() as f64 * NUMERIC_RATIO;
    numeric
        .into_iter()
        .map(|count| if count as f64 > needed { MOSTLY_DIGITS } else { TEXT })
        .collect()
}

/// Decide whether `rows[0]` is a header.
///
/// Ambiguous samples are reported as headerless, so a real data row is
/// never swallowed.
pub fn has_header(rows: &[Vec<String>]) -> bool {
    let Some((first, rest)) = rows.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }

    let head = row_signature(first);
    if head.contains(&DIGITS) {
        return false;
    }
    let body = aggregate_signature(rest, head.len());
    head.iter()
        .zip(&body)
        .any(|(&h, &b)| h == TEXT && b == MOSTLY_DIGITS)
}

/// Parse up to `max_rows` records of `data` with `dialect`, decoding values
/// with `encoding`.
pub fn parse_rows(
    data: &[u8],
    dialect: &Dialect,
    encoding: &'static Encoding,
    max_rows: usize,
) -> Result<Vec<Vec<String>>> {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(dialect.delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(dialect.quote != NONE);
    if dialect.quote != NONE {
        builder.quote(dialect.quote);
    }
    if dialect.doubles_quotes() {
        builder.double_quote(true);
    } else {
        builder.double_quote(false).escape(dialect.escape_char());
    }

    let mut reader = builder.from_reader(skip_bom(data));
    let mut rows = Vec::new();
    for record in reader.byte_records().take(max_rows) {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| decode_bytes(field, encoding).into_owned())
                .collect(),
        );
    }
    Ok(rows)
}

/// Most common number of fields per row; ties go to the wider row.
pub fn modal_field_count(rows: &[Vec<String>]) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for row in rows {
        match counts.iter_mut().find(|(width, _)| *width == row.len()) {
            Some((_, n)) => *n += 1,
            None => counts.push((row.len(), 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|&(width, n)| (n, width))
        .map_or(0, |(width, _)| width)
}

/// Result of header detection over a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderReport {
    /// First row as strings, when it is a header.
    pub header: Option<Vec<String>>,
    /// Modal field count of the parsed rows.
    pub num_fields: usize,
    /// Rows parsed.
    pub rows: usize,
}

/// Parse the sample and report whether it starts with a header.
pub fn detect_header(
    data: &[u8],
    dialect: &Dialect,
    encoding: &'static Encoding,
    max_rows: usize,
) -> Result<HeaderReport> {
    let mut rows = parse_rows(data, dialect, encoding, max_rows)?;
    let num_fields = modal_field_count(&rows);
    let present = has_header(&rows);
    debug!(
        "header {} ({} rows, {num_fields} fields)",
        if present { "present" } else { "absent" },
        rows.len()
    );

    let parsed = rows.len();
    let header = if present {
        Some(rows.swap_remove(0))
    } else {
        None
    };
    Ok(HeaderReport {
        header,
        num_fields,
        rows: parsed,
    })
}
