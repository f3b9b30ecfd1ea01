//! Charset classification and decoding of sampled bytes.
//!
//! The classification runs the strict [`Utf8Decoder`] over a code point
//! budget. When the sample is not UTF-8, `chardetng` guesses which 8-bit
//! encoding to use for turning header values into strings.

use std::borrow::Cow;
use std::io::Read;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, trace};
use simdutf8::basic::from_utf8;

use crate::error::Result;
use crate::metadata::Charset;
use crate::utf8::{BOM, EncodingError, Utf8Decoder};

/// Classify up to `budget` code points read from `source`.
///
/// Starts at [`Charset::Ascii`]. A leading BOM or any code point at or
/// above `0x80` escalates to [`Charset::Utf8`]; the first malformed
/// sequence yields [`Charset::Unknown`]. Read failures are propagated.
pub fn sniff_charset<R: Read>(source: R, budget: usize) -> Result<Charset> {
    let mut decoder = Utf8Decoder::new(source);
    let mut charset = Charset::Ascii;

    if decoder.gobble_bom()? {
        trace!("UTF-8 BOM found");
        charset = Charset::Utf8;
    }

    let mut decoded = 0;
    while decoded < budget {
        match decoder.read_code_point() {
            Ok(Some(cp)) => {
                if cp >= 0x80 {
                    charset = Charset::Utf8;
                }
                decoded += 1;
            }
            Ok(None) => break,
            Err(EncodingError::Io(e)) => return Err(e.into()),
            Err(e) => {
                debug!(
                    "not UTF-8 at byte {} after {decoded} code points: {e}",
                    decoder.position()
                );
                return Ok(Charset::Unknown);
            }
        }
    }

    debug!("charset {charset} after {decoded} code points");
    Ok(charset)
}

/// Classify up to `budget` code points of `data`.
pub fn sniff_charset_bytes(data: &[u8], budget: usize) -> Charset {
    // A byte slice cannot fail to read.
    sniff_charset(data, budget).unwrap_or(Charset::Unknown)
}

/// Check if the data starts with a UTF-8 BOM (Byte Order Mark).
pub fn has_utf8_bom(data: &[u8]) -> bool {
    data.starts_with(&BOM)
}

/// Skip the UTF-8 BOM if present and return the remaining data.
pub fn skip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&BOM[..]).unwrap_or(data)
}

/// Pick the encoding used to decode text from a sample.
///
/// ASCII and UTF-8 samples decode as UTF-8. For [`Charset::Unknown`] the
/// caller's `hint` label wins when it names a known encoding, otherwise
/// `chardetng` guesses from the sample.
pub fn resolve_encoding(charset: Charset, data: &[u8], hint: Option<&str>) -> &'static Encoding {
    if charset.is_utf8() {
        return UTF_8;
    }

    if let Some(label) = hint {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => return encoding,
            None => debug!("ignoring unknown encoding label '{label}'"),
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(data, true);
    let encoding = detector.guess(None, true);
    debug!("guessed single-byte encoding {}", encoding.name());
    encoding
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
pub fn decode_bytes<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    if encoding == UTF_8 {
        if let Ok(text) = from_utf8(bytes) {
            return Cow::Borrowed(text);
        }
        return String::from_utf8_lossy(bytes);
    }
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_ascii() {
        assert_eq!(sniff_charset_bytes(b"a,b,c\n1,2,3\n", 1024), Charset::Ascii);
        assert_eq!(sniff_charset_bytes(b"", 1024), Charset::Ascii);
    }

    #[test]
    fn test_utf8() {
        let data = "name,city\nAlice,\u{6771}\u{4eac}\n".as_bytes();
        assert_eq!(sniff_charset_bytes(data, 1024), Charset::Utf8);
    }

    #[test]
    fn test_bom_forces_utf8() {
        let mut data = BOM.to_vec();
        data.extend_from_slice(b"a,b\n1,2\n");
        assert_eq!(sniff_charset_bytes(&data, 1024), Charset::Utf8);
    }

    #[test]
    fn test_latin1_is_unknown() {
        // "caf\xe9" in Windows-1252
        assert_eq!(sniff_charset_bytes(b"name\ncaf\xe9\n", 1024), Charset::Unknown);
    }

    #[test]
    fn test_budget_stops_before_bad_bytes() {
        let data = b"abcdef\xff";
        assert_eq!(sniff_charset_bytes(data, 6), Charset::Ascii);
        assert_eq!(sniff_charset_bytes(data, 7), Charset::Unknown);
    }

    #[test]
    fn test_idempotent() {
        let data = b"x,\xc3\xa9\n\xff";
        assert_eq!(sniff_charset_bytes(data, 64), sniff_charset_bytes(data, 64));
    }

    #[test]
    fn test_io_error_propagates() {
        assert!(sniff_charset(FailingReader, 10).is_err());
    }

    #[test]
    fn test_utf8_bom() {
        let with_bom = [0xEF, 0xBB, 0xBF, b'a', b'b', b'c'];
        let without_bom = b"abc";

        assert!(has_utf8_bom(&with_bom));
        assert!(!has_utf8_bom(without_bom));

        assert_eq!(skip_bom(&with_bom), b"abc");
        assert_eq!(skip_bom(without_bom), b"abc");
    }

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(resolve_encoding(Charset::Ascii, b"abc", Some("latin1")), UTF_8);
        assert_eq!(
            resolve_encoding(Charset::Unknown, b"caf\xe9", Some("windows-1252")),
            encoding_rs::WINDOWS_1252
        );
        assert_ne!(resolve_encoding(Charset::Unknown, b"caf\xe9", None), UTF_8);
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(decode_bytes(b"plain", UTF_8), "plain");
        assert_eq!(decode_bytes(b"caf\xe9", encoding_rs::WINDOWS_1252), "caf\u{e9}");
        assert_eq!(decode_bytes(b"bad\xff", UTF_8), "bad\u{fffd}");
    }
}
