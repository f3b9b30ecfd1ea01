use std::fmt;

use encoding_rs::Encoding;
use serde::{Serialize, Serializer};

/// Sentinel byte meaning "no quote/escape character was detected".
pub const NONE: u8 = 0x00;

/// Metadata about a sniffed CSV source.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// The detected CSV dialect.
    pub dialect: Dialect,
    /// Character set classification of the sample.
    pub charset: Charset,
    /// Encoding used to decode header values.
    #[serde(serialize_with = "serialize_encoding")]
    pub encoding: &'static Encoding,
    /// Header row, if the first record looks like one.
    pub header: Option<Vec<String>>,
    /// Modal number of fields per record in the sample.
    pub num_fields: usize,
    /// Average record length in bytes.
    pub avg_record_len: usize,
    /// Number of bytes that were sampled.
    pub sample_len: usize,
}

impl Metadata {
    /// Returns true if a header row was detected.
    #[inline]
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }
}

fn serialize_encoding<S: Serializer>(
    encoding: &&'static Encoding,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(encoding.name())
}

/// CSV dialect: how fields and quoting are encoded.
///
/// `quote` and `escape` hold [`NONE`] when no character was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dialect {
    /// Field delimiter byte.
    #[serde(serialize_with = "serialize_byte")]
    pub delimiter: u8,
    /// Quote byte, or [`NONE`].
    #[serde(serialize_with = "serialize_byte")]
    pub quote: u8,
    /// Escape byte, or [`NONE`]. Equal to `quote` for doubled-quote escaping.
    #[serde(serialize_with = "serialize_byte")]
    pub escape: u8,
}

/// Bytes serialize as one-character strings; the sentinel as null.
fn serialize_byte<S: Serializer>(byte: &u8, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match *byte {
        NONE => serializer.serialize_none(),
        b => serializer.serialize_some(&char::from(b).to_string()),
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
        }
    }
}

impl Dialect {
    /// Create a new Dialect with the given bytes.
    pub const fn new(delimiter: u8, quote: u8, escape: u8) -> Self {
        Self {
            delimiter,
            quote,
            escape,
        }
    }

    /// Returns the quote character if one was detected.
    #[inline]
    pub const fn quote_char(&self) -> Option<u8> {
        if self.quote == NONE {
            None
        } else {
            Some(self.quote)
        }
    }

    /// Returns the escape character if one was detected.
    #[inline]
    pub const fn escape_char(&self) -> Option<u8> {
        if self.escape == NONE {
            None
        } else {
            Some(self.escape)
        }
    }

    /// Returns true if quotes are escaped by doubling them.
    #[inline]
    pub const fn doubles_quotes(&self) -> bool {
        self.quote != NONE && self.escape == self.quote
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delimiter={} quote={} escape={}",
            printable(self.delimiter),
            printable(self.quote),
            printable(self.escape)
        )
    }
}

/// Render a dialect byte for humans; the sentinel prints as `none`.
pub fn printable(byte: u8) -> String {
    match byte {
        NONE => "none".to_string(),
        b'\t' => "\\t".to_string(),
        b' ' => "space".to_string(),
        b if b.is_ascii_graphic() => (b as char).to_string(),
        b => format!("0x{b:02X}"),
    }
}

/// Character set classification produced by the encoding sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// Only 7-bit bytes were seen.
    #[default]
    Ascii,
    /// Valid UTF-8 with at least one multi-byte code point, or a UTF-8 BOM.
    Utf8,
    /// Not valid UTF-8: some single-byte 8-bit charset, to be decided elsewhere.
    Unknown,
}

impl Charset {
    /// Returns true if the sample can be read as UTF-8.
    #[inline]
    pub fn is_utf8(&self) -> bool {
        matches!(self, Charset::Ascii | Charset::Utf8)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Ascii => write!(f, "ASCII"),
            Charset::Utf8 => write!(f, "UTF-8"),
            Charset::Unknown => write!(f, "unknown"),
        }
    }
}
