//! Orchestration of the dialect stages.

use std::io::Read;

use log::debug;

use super::delimiter::DelimiterComputer;
use super::escape::EscapeComputer;
use super::quote::QuoteComputer;
use super::scoring::ScoreModel;
use super::{ByteComputer, DialectDraft, NONE};
use crate::error::{Result, SnifferError, Stage};
use crate::metadata::Dialect;
use crate::tokenizer::{Line, LineReader};

/// Default number of lines sampled for dialect inference.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Default minimum number of fields per line.
pub const DEFAULT_MIN_FIELDS: usize = 2;

/// A dialect stage, built once from the score model.
#[derive(Debug, Clone)]
pub enum Computer {
    Delimiter(DelimiterComputer),
    Quote(QuoteComputer),
    Escape(EscapeComputer),
}

impl ByteComputer for Computer {
    fn stage(&self) -> Stage {
        match self {
            Computer::Delimiter(c) => c.stage(),
            Computer::Quote(c) => c.stage(),
            Computer::Escape(c) => c.stage(),
        }
    }

    fn compute(&self, lines: &[Line], draft: &DialectDraft) -> Result<u8> {
        match self {
            Computer::Delimiter(c) => c.compute(lines, draft),
            Computer::Quote(c) => c.compute(lines, draft),
            Computer::Escape(c) => c.compute(lines, draft),
        }
    }
}

/// Runs delimiter, quote and escape inference in order, without
/// backtracking.
///
/// # Example
///
/// ```
/// use csv_whiff::dialect::format::FormatSniffer;
/// use csv_whiff::dialect::scoring::BasicScoring;
///
/// let sniffer = FormatSniffer::new(&BasicScoring::default());
/// let dialect = sniffer.sniff_reader(&b"a;b\n1;2\n"[..]).unwrap();
/// assert_eq!(dialect.delimiter, b';');
/// ```
#[derive(Debug, Clone)]
pub struct FormatSniffer {
    stages: [Computer; 3],
    max_lines: usize,
    forced: DialectDraft,
}

impl FormatSniffer {
    /// Build the stages from `model` with default thresholds.
    pub fn new(model: &dyn ScoreModel) -> Self {
        Self::with_thresholds(model, DEFAULT_MIN_FIELDS, 1)
    }

    /// Build the stages from `model`.
    ///
    /// `min_fields` bounds the delimiter stage, `min_occurrences` the
    /// escape stage.
    pub fn with_thresholds(
        model: &dyn ScoreModel,
        min_fields: usize,
        min_occurrences: u64,
    ) -> Self {
        debug!("building format sniffer from the {} score model", model.name());
        Self {
            stages: [
                Computer::Delimiter(DelimiterComputer::new(model.delimiters().clone(), min_fields)),
                Computer::Quote(QuoteComputer::new(model.quotes().clone())),
                Computer::Escape(EscapeComputer::new(model.escapes().clone(), min_occurrences)),
            ],
            max_lines: DEFAULT_MAX_LINES,
            forced: DialectDraft::default(),
        }
    }

    /// Number of lines read by [`FormatSniffer::sniff_reader`].
    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Use `delimiter` instead of inferring it.
    pub fn force_delimiter(mut self, delimiter: u8) -> Self {
        self.forced.delimiter = Some(delimiter);
        self
    }

    /// Use `quote` instead of inferring it. [`NONE`] disables quoting, and
    /// with it escape inference.
    pub fn force_quote(mut self, quote: u8) -> Self {
        self.forced.quote = Some(quote);
        if quote == NONE {
            self.forced.escape = Some(NONE);
        }
        self
    }

    /// Sample lines from `source` and infer the dialect.
    pub fn sniff_reader<R: Read>(&self, source: R) -> Result<Dialect> {
        let mut reader = LineReader::new(source);
        let lines = reader.sample(self.max_lines)?;
        debug!(
            "sampled {} lines ({} bytes) for dialect inference",
            lines.len(),
            reader.bytes_read()
        );
        self.sniff_lines(&lines)
    }

    /// Infer the dialect of already sampled lines.
    pub fn sniff_lines(&self, lines: &[Line]) -> Result<Dialect> {
        if lines.is_empty() {
            return Err(SnifferError::EmptyData);
        }

        let mut draft = self.forced;
        for computer in &self.stages {
            let stage = computer.stage();
            if draft.slot(stage).is_some() {
                debug!("{stage} is fixed by configuration");
                continue;
            }
            if stage == Stage::Escape && draft.quote == Some(NONE) {
                draft.fill(stage, NONE);
                continue;
            }
            let byte = computer.compute(lines, &draft)?;
            draft.fill(stage, byte);
        }

        Ok(Dialect::new(
            draft.delimiter.unwrap_or(b','),
            draft.quote.unwrap_or(NONE),
            draft.escape.unwrap_or(NONE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::scoring::{BasicScoring, WeightedScoring};

    #[test]
    fn test_stage_order() {
        let sniffer = FormatSniffer::new(&BasicScoring::default());
        let stages: Vec<Stage> = sniffer.stages.iter().map(ByteComputer::stage).collect();
        assert_eq!(stages, vec![Stage::Delimiter, Stage::Quote, Stage::Escape]);
    }

    #[test]
    fn test_sniff_quoted_semicolons() {
        let data = b"\"a\";\"b\"\n\"c \"\"x\"\"\";\"d\"\n";
        let dialect = FormatSniffer::new(&BasicScoring::default())
            .sniff_reader(&data[..])
            .unwrap();
        assert_eq!(dialect, Dialect::new(b';', b'"', b'"'));
    }

    #[test]
    fn test_delimiter_failure_names_stage() {
        let result = FormatSniffer::new(&BasicScoring::default()).sniff_reader(&b"abc\ndef\n"[..]);
        assert!(matches!(result, Err(SnifferError::NoCandidate(Stage::Delimiter))));
    }

    #[test]
    fn test_empty_input() {
        let result = FormatSniffer::new(&BasicScoring::default()).sniff_reader(&b"\n\n"[..]);
        assert!(matches!(result, Err(SnifferError::EmptyData)));
    }

    #[test]
    fn test_forced_bytes_skip_stages() {
        let data = b"a;b,c\n1;2,3\n";
        let sniffer = FormatSniffer::new(&BasicScoring::default())
            .force_delimiter(b',')
            .force_quote(NONE);
        let dialect = sniffer.sniff_reader(&data[..]).unwrap();
        assert_eq!(dialect, Dialect::new(b',', NONE, NONE));
    }

    #[test]
    fn test_weighted_model_is_pluggable() {
        let data = b"a;b|c\n1;2|3\n";
        let basic = FormatSniffer::new(&BasicScoring::default())
            .sniff_reader(&data[..])
            .unwrap();
        assert_eq!(basic.delimiter, b';');

        let model = WeightedScoring::default().delimiter(b'|', 9).unwrap();
        let weighted = FormatSniffer::new(&model).sniff_reader(&data[..]).unwrap();
        assert_eq!(weighted.delimiter, b'|');
    }

    #[test]
    fn test_max_lines() {
        // Only the first two lines are consistent.
        let data = b"a,b\nc,d\ne,f,g,h,i,j,k,l,m\n";
        let dialect = FormatSniffer::new(&BasicScoring::default())
            .max_lines(2)
            .sniff_reader(&data[..])
            .unwrap();
        assert_eq!(dialect.delimiter, b',');
    }
}
