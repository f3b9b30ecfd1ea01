//! Main Sniffer builder and sniff methods.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::dialect::format::{DEFAULT_MAX_LINES, DEFAULT_MIN_FIELDS, FormatSniffer};
use crate::dialect::scoring::{BasicScoring, ScoreModel};
use crate::encoding::{has_utf8_bom, resolve_encoding, sniff_charset};
use crate::error::{Result, SnifferError};
use crate::fanout::{DEFAULT_PIPE_CAPACITY, FanOut, FanOutReport};
use crate::header::{DEFAULT_HEADER_ROWS, detect_header};
use crate::metadata::{Charset, Dialect, Metadata, NONE};
use crate::sample::{SampleSize, read_sample};
use crate::tokenizer::LineReader;

/// What a fan-out worker found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finding {
    Dialect(Dialect),
    Charset(Charset),
}

/// CSV dialect and encoding sniffer.
///
/// The sample is buffered once. Dialect and charset are inferred in
/// parallel over that buffer, then a second pass over the same bytes
/// decides whether the first record is a header.
///
/// # Example
///
/// ```no_run
/// use csv_whiff::{SampleSize, Sniffer};
///
/// let mut sniffer = Sniffer::new();
/// sniffer.sample_size(SampleSize::Records(500));
///
/// let metadata = sniffer.sniff_path("data.csv").unwrap();
/// println!("{}", metadata.dialect);
/// println!("Header: {:?}", metadata.header);
/// ```
#[derive(Clone)]
pub struct Sniffer {
    sample_size: SampleSize,
    max_lines: usize,
    min_fields: usize,
    min_occurrences: u64,
    scoring: Arc<dyn ScoreModel>,
    forced_delimiter: Option<u8>,
    forced_quote: Option<u8>,
    encoding_hint: Option<String>,
    pipe_capacity: usize,
    header_rows: usize,
}

impl fmt::Debug for Sniffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sniffer")
            .field("sample_size", &self.sample_size)
            .field("max_lines", &self.max_lines)
            .field("min_fields", &self.min_fields)
            .field("min_occurrences", &self.min_occurrences)
            .field("scoring", &self.scoring.name())
            .field("forced_delimiter", &self.forced_delimiter)
            .field("forced_quote", &self.forced_quote)
            .field("encoding_hint", &self.encoding_hint)
            .field("pipe_capacity", &self.pipe_capacity)
            .field("header_rows", &self.header_rows)
            .finish()
    }
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sniffer {
    /// Create a new Sniffer with default settings.
    pub fn new() -> Self {
        Self {
            sample_size: SampleSize::default(),
            max_lines: DEFAULT_MAX_LINES,
            min_fields: DEFAULT_MIN_FIELDS,
            min_occurrences: 1,
            scoring: Arc::new(BasicScoring::default()),
            forced_delimiter: None,
            forced_quote: None,
            encoding_hint: None,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            header_rows: DEFAULT_HEADER_ROWS,
        }
    }

    /// Set how much of the source is buffered.
    pub fn sample_size(&mut self, sample_size: SampleSize) -> &mut Self {
        self.sample_size = sample_size;
        self
    }

    /// The configured sample size.
    pub fn sample_budget(&self) -> SampleSize {
        self.sample_size
    }

    /// Set the number of lines used for dialect inference.
    pub fn max_lines(&mut self, max_lines: usize) -> &mut Self {
        self.max_lines = max_lines;
        self
    }

    /// Set the minimum number of fields a delimiter must produce per line.
    pub fn min_fields(&mut self, min_fields: usize) -> &mut Self {
        self.min_fields = min_fields;
        self
    }

    /// Set how many escaped quotes an escape character needs.
    pub fn min_occurrences(&mut self, min_occurrences: u64) -> &mut Self {
        self.min_occurrences = min_occurrences;
        self
    }

    /// Replace the candidate score tables.
    pub fn scoring(&mut self, model: impl ScoreModel + 'static) -> &mut Self {
        self.scoring = Arc::new(model);
        self
    }

    /// Force a specific delimiter (skip delimiter detection).
    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.forced_delimiter = Some(delimiter);
        self
    }

    /// Force a specific quote character; [`NONE`] disables quoting.
    pub fn quote(&mut self, quote: u8) -> &mut Self {
        self.forced_quote = Some(quote);
        self
    }

    /// Encoding label used when the sample is not UTF-8.
    pub fn encoding_hint(&mut self, label: impl Into<String>) -> &mut Self {
        self.encoding_hint = Some(label.into());
        self
    }

    /// Set the fan-out pipe capacity, in chunks.
    pub fn pipe_capacity(&mut self, capacity: usize) -> &mut Self {
        self.pipe_capacity = capacity;
        self
    }

    /// Set the number of rows parsed for header detection.
    pub fn header_rows(&mut self, rows: usize) -> &mut Self {
        self.header_rows = rows;
        self
    }

    /// Sniff a CSV file at the given path.
    pub fn sniff_path<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let file = File::open(path.as_ref())?;
        self.sniff_reader(file)
    }

    /// Sniff CSV data from a reader.
    pub fn sniff_reader<R: Read>(&self, reader: R) -> Result<Metadata> {
        self.validate()?;
        let sample = read_sample(reader, self.sample_size)?;
        self.sniff_sample(&sample)
    }

    /// Sniff CSV data from bytes. The sample size still applies.
    pub fn sniff_bytes(&self, data: &[u8]) -> Result<Metadata> {
        self.sniff_reader(data)
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        self.sample_size.validate()?;
        if self.max_lines == 0 {
            return Err(invalid("max_lines must be positive"));
        }
        if self.header_rows == 0 {
            return Err(invalid("header_rows must be positive"));
        }
        if self.pipe_capacity == 0 {
            return Err(invalid("pipe_capacity must be positive"));
        }
        if let Some(delimiter) = self.forced_delimiter
            && matches!(delimiter, NONE | b'\r' | b'\n')
        {
            return Err(invalid("forced delimiter cannot be NUL, CR or LF"));
        }
        if let Some(quote) = self.forced_quote {
            if matches!(quote, b'\r' | b'\n') {
                return Err(invalid("forced quote cannot be CR or LF"));
            }
            if quote != NONE && self.forced_delimiter == Some(quote) {
                return Err(invalid("forced quote equals the forced delimiter"));
            }
        }
        Ok(())
    }

    fn format_sniffer(&self) -> FormatSniffer {
        let mut format = FormatSniffer::with_thresholds(
            self.scoring.as_ref(),
            self.min_fields,
            self.min_occurrences,
        )
        .max_lines(self.max_lines);
        if let Some(delimiter) = self.forced_delimiter {
            format = format.force_delimiter(delimiter);
        }
        if let Some(quote) = self.forced_quote {
            format = format.force_quote(quote);
        }
        format
    }

    /// Run every analysis over an already buffered sample.
    fn sniff_sample(&self, sample: &[u8]) -> Result<Metadata> {
        if !sample.iter().any(|&b| b != b'\r' && b != b'\n') {
            return Err(SnifferError::EmptyData);
        }

        let format = self.format_sniffer();
        let budget = sample.len();
        let report = FanOut::new()
            .capacity(self.pipe_capacity)
            .worker("format", |pipe| {
                Ok(Finding::Dialect(format.sniff_reader(without_bom(pipe)?)?))
            })
            .worker("encoding", move |pipe| {
                Ok(Finding::Charset(sniff_charset(pipe, budget)?))
            })
            .run(sample)?;
        let (dialect, charset) = collect_findings(report)?;

        let encoding = resolve_encoding(charset, sample, self.encoding_hint.as_deref());
        let header = detect_header(sample, &dialect, encoding, self.header_rows)?;

        let records = LineReader::new(sample)
            .filter(|line| line.as_ref().is_ok_and(|line| !line.is_empty()))
            .count();
        let avg_record_len = if records == 0 { 0 } else { sample.len() / records };

        debug!(
            "sniffed {dialect}, charset {charset}, encoding {}, header {} over {} rows",
            encoding.name(),
            if header.header.is_some() { "present" } else { "absent" },
            header.rows
        );

        Ok(Metadata {
            dialect,
            charset,
            encoding,
            header: header.header,
            num_fields: header.num_fields,
            avg_record_len,
            sample_len: sample.len(),
        })
    }
}

fn invalid(message: &str) -> SnifferError {
    SnifferError::InvalidConfig(message.to_string())
}

/// Drop a leading UTF-8 BOM so it never sticks to the first field.
fn without_bom<R: Read>(mut source: R) -> io::Result<impl Read> {
    let mut head = Vec::with_capacity(3);
    (&mut source).take(3).read_to_end(&mut head)?;
    if has_utf8_bom(&head) {
        head.clear();
    }
    Ok(Cursor::new(head).chain(source))
}

/// A single failed worker surfaces its own error; several are reported
/// together.
fn collect_findings(mut report: FanOutReport<Finding>) -> Result<(Dialect, Charset)> {
    let failed = report.outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed == 1
        && let Some(idx) = report.outcomes.iter().position(|o| o.result.is_err())
        && let Err(e) = report.outcomes.swap_remove(idx).result
    {
        return Err(e);
    }

    let mut dialect = None;
    let mut charset = None;
    for finding in report.into_results()? {
        match finding {
            Finding::Dialect(d) => dialect = Some(d),
            Finding::Charset(c) => charset = Some(c),
        }
    }
    match (dialect, charset) {
        (Some(dialect), Some(charset)) => Ok((dialect, charset)),
        _ => Err(SnifferError::EmptyData),
    }
}
