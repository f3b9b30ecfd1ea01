//! Strict, byte-at-a-time UTF-8 decoder.
//!
//! The decoder reads from a [`PushbackReader`]. When a code point fails to
//! decode, every byte of that code point is pushed back, so a fallback
//! decoder can resume from exactly the byte where the failure started.

use std::io::{self, BufRead, BufReader, Read};

use thiserror::Error;

/// The UTF-8 byte order mark.
pub const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Largest Unicode scalar value.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Malformed UTF-8 input.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// The byte cannot start a UTF-8 sequence.
    #[error("invalid leading byte 0x{0:02X}")]
    InvalidLeadingByte(u8),

    /// A trailing byte does not match `10xxxxxx`.
    #[error("invalid continuation byte 0x{byte:02X} at offset {offset} of a {len}-byte sequence")]
    InvalidContinuation { byte: u8, offset: usize, len: usize },

    /// The sequence encodes a value that has a shorter encoding.
    #[error("overlong encoding")]
    Overlong,

    /// The sequence encodes a UTF-16 surrogate.
    #[error("surrogate code point")]
    Surrogate,

    /// The sequence encodes a value above U+10FFFF.
    #[error("code point above U+10FFFF")]
    OutOfRange,

    /// End of input in the middle of a sequence.
    #[error("incomplete sequence: expected {expected} bytes, found {found}")]
    Incomplete { expected: usize, found: usize },

    /// The underlying source failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Buffered byte source that can push bytes back.
#[derive(Debug)]
pub struct PushbackReader<R> {
    inner: BufReader<R>,
    /// Pushed-back bytes, next byte last.
    pushed: Vec<u8>,
    consumed: u64,
}

impl<R: Read> PushbackReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: BufReader::new(source),
            pushed: Vec::new(),
            consumed: 0,
        }
    }

    /// Read one byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pushed.pop() {
            return Ok(Some(b));
        }
        loop {
            match self.inner.fill_buf() {
                Ok([]) => return Ok(None),
                Ok(buf) => {
                    let b = buf[0];
                    self.inner.consume(1);
                    self.consumed += 1;
                    return Ok(Some(b));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        let next = self.read_byte()?;
        if let Some(b) = next {
            self.pushed.push(b);
        }
        Ok(next)
    }

    /// Push `bytes` back; they are read again in their original order.
    pub fn unread(&mut self, bytes: &[u8]) {
        self.pushed.extend(bytes.iter().rev());
    }

    /// Offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.consumed.saturating_sub(self.pushed.len() as u64)
    }
}

/// Validating UTF-8 decoder over a byte source.
#[derive(Debug)]
pub struct Utf8Decoder<R> {
    source: PushbackReader<R>,
    at_start: bool,
}

impl<R: Read> Utf8Decoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: PushbackReader::new(source),
            at_start: true,
        }
    }

    /// Consume a UTF-8 BOM if it is the first thing in the stream.
    ///
    /// Returns false, consuming nothing, anywhere else or when the first
    /// bytes only partially match the BOM.
    pub fn gobble_bom(&mut self) -> io::Result<bool> {
        if !self.at_start {
            return Ok(false);
        }
        self.at_start = false;

        let mut seen = Vec::with_capacity(BOM.len());
        for expected in BOM {
            match self.source.read_byte()? {
                Some(b) => {
                    seen.push(b);
                    if b != expected {
                        break;
                    }
                }
                None => break,
            }
        }
        if seen == BOM {
            return Ok(true);
        }
        self.source.unread(&seen);
        Ok(false)
    }

    /// Decode the next code point, or `None` at end of input.
    pub fn read_code_point(&mut self) -> Result<Option<u32>, EncodingError> {
        let Some(lead) = self.source.read_byte()? else {
            return Ok(None);
        };
        self.at_start = false;

        let (len, bits) = match lead {
            0x00..=0x7F => return Ok(Some(u32::from(lead))),
            0xC2..=0xDF => (2, lead & 0x1F),
            0xE0..=0xEF => (3, lead & 0x0F),
            0xF0..=0xF4 => (4, lead & 0x07),
            _ => {
                self.source.unread(&[lead]);
                return Err(EncodingError::InvalidLeadingByte(lead));
            }
        };

        let mut seq = [lead, 0, 0, 0];
        let mut code_point = u32::from(bits);
        for offset in 1..len {
            let b = match self.source.read_byte() {
                Ok(Some(b)) => b,
                Ok(None) => {
                    self.source.unread(&seq[..offset]);
                    return Err(EncodingError::Incomplete {
                        expected: len,
                        found: offset,
                    });
                }
                Err(e) => {
                    self.source.unread(&seq[..offset]);
                    return Err(EncodingError::Io(e));
                }
            };
            seq[offset] = b;

            if b & 0xC0 != 0x80 {
                self.source.unread(&seq[..=offset]);
                return Err(EncodingError::InvalidContinuation {
                    byte: b,
                    offset,
                    len,
                });
            }
            if offset == 1
                && let Some(err) = second_byte_error(lead, b)
            {
                self.source.unread(&seq[..=offset]);
                return Err(err);
            }
            code_point = (code_point << 6) | u32::from(b & 0x3F);
        }
        Ok(Some(code_point))
    }

    /// Offset of the next byte to be decoded.
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Hand the byte source to a fallback decoder.
    pub fn into_inner(self) -> PushbackReader<R> {
        self.source
    }
}

/// Second-byte restrictions from the Unicode well-formed byte sequence table.
fn second_byte_error(lead: u8, b: u8) -> Option<EncodingError> {
    match lead {
        0xE0 if b < 0xA0 => Some(EncodingError::Overlong),
        0xED if b > 0x9F => Some(EncodingError::Surrogate),
        0xF0 if b < 0x90 => Some(EncodingError::Overlong),
        0xF4 if b > 0x8F => Some(EncodingError::OutOfRange),
        _ => None,
    }
}

/// Append the UTF-8 encoding of `code_point` to `out`.
pub fn encode_code_point(code_point: u32, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    match code_point {
        0..=0x7F => out.push(code_point as u8),
        0x80..=0x7FF => {
            out.push(0xC0 | (code_point >> 6) as u8);
            out.push(0x80 | (code_point & 0x3F) as u8);
        }
        0xD800..=0xDFFF => return Err(EncodingError::Surrogate),
        0x800..=0xFFFF => {
            out.push(0xE0 | (code_point >> 12) as u8);
            out.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
            out.push(0x80 | (code_point & 0x3F) as u8);
        }
        0x10000..=MAX_CODE_POINT => {
            out.push(0xF0 | (code_point >> 18) as u8);
            out.push(0x80 | ((code_point >> 12) & 0x3F) as u8);
            out.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
            out.push(0x80 | (code_point & 0x3F) as u8);
        }
        _ => return Err(EncodingError::OutOfRange),
    }
    Ok(())
}
