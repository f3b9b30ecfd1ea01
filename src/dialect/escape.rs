//! Escape inference from the byte in front of embedded quotes.

use log::{debug, trace};

use super::scoring::ByteTable;
use super::{ByteComputer, DialectDraft};
use crate::error::{Result, SnifferError, Stage};
use crate::metadata::NONE;
use crate::tokenizer::Line;

/// Picks the escape character once delimiter and quote are known.
#[derive(Debug, Clone)]
pub struct EscapeComputer {
    table: ByteTable,
    min_occurrences: u64,
}

impl EscapeComputer {
    pub fn new(table: ByteTable, min_occurrences: u64) -> Self {
        Self {
            table,
            min_occurrences,
        }
    }

    /// Count, per byte, how often it directly precedes an embedded quote.
    ///
    /// Parts are space-trimmed and lose one layer of quotes first, so any
    /// quote left inside is one the writer had to escape. A doubled quote
    /// counts once, for the quote itself.
    pub fn tally(&self, lines: &[Line], delimiter: u8, quote: u8) -> [u64; 256] {
        let mut tally = [0u64; 256];
        for line in lines {
            for mut field in line.split(delimiter) {
                field.trim_spaces(line);
                field.trim_if_quoted(line, quote);
                let bytes = field.bytes(line);

                let mut i = 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        let prev = bytes[i - 1];
                        if prev == quote {
                            tally[usize::from(quote)] += 1;
                            i += 1;
                        } else if self.table.allows(prev) {
                            tally[usize::from(prev)] += 1;
                        }
                    }
                    i += 1;
                }
            }
        }
        tally
    }

    /// Best candidate, or [`NONE`] when fewer than `min_occurrences`
    /// escaped quotes back it.
    pub fn best(&self, lines: &[Line], delimiter: u8, quote: u8) -> u8 {
        if quote == NONE {
            return NONE;
        }
        let tally = self.tally(lines, delimiter, quote);

        let mut best: Option<(u8, u64, i64)> = None;
        for byte in 0..=u8::MAX {
            let count = tally[usize::from(byte)];
            if count == 0 {
                continue;
            }
            let weight = if byte == quote {
                self.table.score(byte).max(1)
            } else {
                self.table.score(byte)
            };
            let weighted = count as i64 * i64::from(weight);
            trace!("escape {:?}: {count} occurrences, weighted {weighted}", byte as char);
            if best.is_none_or(|(_, _, top)| weighted > top) {
                best = Some((byte, count, weighted));
            }
        }

        match best {
            Some((byte, count, _)) if count >= self.min_occurrences => {
                debug!("escape {:?} ({count} escaped quotes)", byte as char);
                byte
            }
            _ => {
                debug!("no escaped quotes found");
                NONE
            }
        }
    }
}

impl ByteComputer for EscapeComputer {
    fn stage(&self) -> Stage {
        Stage::Escape
    }

    fn compute(&self, lines: &[Line], draft: &DialectDraft) -> Result<u8> {
        let delimiter = draft
            .delimiter
            .ok_or(SnifferError::NoCandidate(Stage::Delimiter))?;
        let quote = draft.quote.ok_or(SnifferError::NoCandidate(Stage::Quote))?;
        Ok(self.best(lines, delimiter, quote))
    }
}
