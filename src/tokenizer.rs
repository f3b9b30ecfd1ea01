//! Byte-level line and part tokenizer.
//!
//! Lines are owned byte buffers with their terminator stripped. Splitting a
//! line produces [`Field`]s, which are views into the line and never copy.

use std::io::{self, BufRead, BufReader, Read};

use crate::metadata::NONE;

const SPACE: u8 = b' ';

/// One record's raw bytes, terminator stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
}

impl Line {
    /// Create an empty line.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Returns the raw bytes of the line.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Count occurrences of `byte` in the line.
    #[inline]
    pub fn count(&self, byte: u8) -> usize {
        bytecount::count(&self.bytes, byte)
    }

    /// Split the line on `delimiter`, ignoring quoting.
    ///
    /// Every delimiter ends a field, so `n` delimiters always yield `n + 1`
    /// fields. A delimiter at position 0 yields a leading empty field, and
    /// adjacent delimiters yield an empty field between them.
    pub fn split(&self, delimiter: u8) -> Vec<Field> {
        let mut fields = Vec::with_capacity(self.count(delimiter) + 1);
        let mut start = 0;
        for (i, &b) in self.bytes.iter().enumerate() {
            if b == delimiter {
                fields.push(Field::span(start, i));
                start = i + 1;
            }
        }
        fields.push(Field::span(start, self.bytes.len()));
        fields
    }

    /// Split the line on `delimiter`, honouring `quote` and `escape`.
    ///
    /// A field is quoted only when `quote` is its first non-space byte.
    /// Inside a quoted span delimiters do not split, and a doubled quote is
    /// literal when `escape == quote`. When `escape` is a distinct byte it
    /// makes the following byte literal anywhere in the line. Each field is
    /// trimmed of surrounding spaces and one layer of quotes; escape bytes
    /// are kept in the view.
    pub fn split_quoted(&self, delimiter: u8, quote: u8, escape: u8) -> Vec<Field> {
        let bytes = &self.bytes;
        let n = bytes.len();
        let mut fields = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;
        let mut leading = true;
        let mut i = 0;

        while i < n {
            let b = bytes[i];
            if escape != NONE && escape != quote && b == escape {
                leading = false;
                i += 2;
                continue;
            }
            if quote != NONE && b == quote {
                if in_quotes {
                    if escape == quote && i + 1 < n && bytes[i + 1] == quote {
                        i += 2;
                        continue;
                    }
                    in_quotes = false;
                } else if leading {
                    in_quotes = true;
                }
                leading = false;
                i += 1;
                continue;
            }
            if b == delimiter && !in_quotes {
                fields.push(Field::span(start, i));
                start = i + 1;
                leading = true;
            } else if b != SPACE {
                leading = false;
            }
            i += 1;
        }
        fields.push(Field::span(start, n));

        for field in &mut fields {
            field.trim_spaces(self);
            if quote != NONE {
                field.trim_if_quoted(self, quote);
            }
        }
        fields
    }
}

impl From<&[u8]> for Line {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl From<Vec<u8>> for Line {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// A non-empty view `(from, to)` into a [`Line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    from: usize,
    to: usize,
}

impl Part {
    /// Returns `None` for an empty range.
    #[inline]
    pub const fn new(from: usize, to: usize) -> Option<Self> {
        if from < to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    #[inline]
    pub const fn from(&self) -> usize {
        self.from
    }

    #[inline]
    pub const fn to(&self) -> usize {
        self.to
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.to - self.from
    }

    #[inline]
    pub fn bytes<'a>(&self, line: &'a Line) -> &'a [u8] {
        &line.as_bytes()[self.from..self.to]
    }
}

/// A delimiter-separated span of a line: either empty or a [`Part`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Zero-width span at offset `at`.
    Empty { at: usize },
    /// At least one byte.
    Part(Part),
}

impl Field {
    #[inline]
    fn span(from: usize, to: usize) -> Self {
        match Part::new(from, to) {
            Some(part) => Field::Part(part),
            None => Field::Empty { at: from },
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Field::Empty { .. })
    }

    /// Returns the bytes covered by this field.
    #[inline]
    pub fn bytes<'a>(&self, line: &'a Line) -> &'a [u8] {
        match self {
            Field::Empty { .. } => &[],
            Field::Part(part) => part.bytes(line),
        }
    }

    #[inline]
    pub fn starts_with(&self, line: &Line, byte: u8) -> bool {
        self.bytes(line).first() == Some(&byte)
    }

    #[inline]
    pub fn ends_with(&self, line: &Line, byte: u8) -> bool {
        self.bytes(line).last() == Some(&byte)
    }

    /// Returns true if the field is at least two bytes long and starts and
    /// ends with `quote`.
    pub fn is_quoted(&self, line: &Line, quote: u8) -> bool {
        let bytes = self.bytes(line);
        bytes.len() >= 2 && bytes[0] == quote && bytes[bytes.len() - 1] == quote
    }

    /// Shrink the field past leading and trailing spaces.
    pub fn trim_spaces(&mut self, line: &Line) {
        if let Field::Part(part) = *self {
            let bytes = line.as_bytes();
            let mut from = part.from;
            let mut to = part.to;
            while from < to && bytes[from] == SPACE {
                from += 1;
            }
            while to > from && bytes[to - 1] == SPACE {
                to -= 1;
            }
            *self = Field::span(from, to);
        }
    }

    /// Strip one leading and one trailing `quote`, each independently.
    ///
    /// Returns true if anything was stripped.
    pub fn trim_if_quoted(&mut self, line: &Line, quote: u8) -> bool {
        let Field::Part(part) = *self else {
            return false;
        };
        let bytes = line.as_bytes();
        let mut from = part.from;
        let mut to = part.to;
        if bytes[from] == quote {
            from += 1;
        }
        if to > from && bytes[to - 1] == quote {
            to -= 1;
        }
        *self = Field::span(from, to);
        from != part.from || to != part.to
    }
}

/// Reads [`Line`]s from a byte source.
///
/// CR, LF and CRLF each terminate one line, including a CRLF split across
/// two buffer fills.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    skip_lf: bool,
    lines_read: usize,
    bytes_read: u64,
}

impl<R: Read> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            inner: BufReader::new(source),
            skip_lf: false,
            lines_read: 0,
            bytes_read: 0,
        }
    }

    /// Number of lines returned so far.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Number of bytes consumed from the source so far, terminators included.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read the next line, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<Line>> {
        let mut line = Line::new();
        let mut pending = false;

        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                if pending {
                    self.lines_read += 1;
                    return Ok(Some(line));
                }
                return Ok(None);
            }

            let mut consumed = 0;
            let mut terminated = false;
            for &b in buf {
                consumed += 1;
                if self.skip_lf {
                    self.skip_lf = false;
                    if b == b'\n' {
                        continue;
                    }
                }
                match b {
                    b'\r' => {
                        self.skip_lf = true;
                        terminated = true;
                        break;
                    }
                    b'\n' => {
                        terminated = true;
                        break;
                    }
                    _ => {
                        line.push(b);
                        pending = true;
                    }
                }
            }
            self.inner.consume(consumed);
            self.bytes_read += consumed as u64;

            if terminated {
                self.lines_read += 1;
                return Ok(Some(line));
            }
        }
    }

    /// Collect up to `max_lines` non-empty lines.
    ///
    /// Blank lines carry no field structure and are skipped.
    pub fn sample(&mut self, max_lines: usize) -> io::Result<Vec<Line>> {
        let mut lines = Vec::new();
        while lines.len() < max_lines {
            match self.next_line()? {
                Some(line) if line.is_empty() => {}
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines)
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
