//! Quote inference from how parts begin and end.

use log::{debug, trace};

use super::scoring::ByteTable;
use super::{ByteComputer, DialectDraft};
use crate::error::{Result, SnifferError, Stage};
use crate::metadata::NONE;
use crate::tokenizer::{Field, Line};

/// Bonus for a part wrapped in the candidate on both ends.
pub const BOTH_ENDS_BONUS: u64 = 5;

/// Bonus for a part with the candidate on one end only.
pub const ONE_END_BONUS: u64 = 1;

/// Raw bonuses gathered over a sample.
#[derive(Debug, Clone)]
pub struct QuoteScores {
    bonus: [u64; 256],
    /// Number of parts seen, empty ones included.
    pub total_parts: u64,
}

impl QuoteScores {
    #[inline]
    pub fn bonus(&self, byte: u8) -> u64 {
        self.bonus[usize::from(byte)]
    }
}

/// Picks the quote character once the delimiter is known.
#[derive(Debug, Clone)]
pub struct QuoteComputer {
    table: ByteTable,
}

impl QuoteComputer {
    pub fn new(table: ByteTable) -> Self {
        Self { table }
    }

    /// Sum the per-part bonuses of every admitted byte.
    pub fn scores(&self, lines: &[Line], delimiter: u8) -> QuoteScores {
        let mut scores = QuoteScores {
            bonus: [0; 256],
            total_parts: 0,
        };
        let allowed: Vec<u8> = self.table.allowed().collect();
        for line in lines {
            for mut field in line.split(delimiter) {
                field.trim_spaces(line);
                scores.total_parts += 1;
                let Field::Part(_) = field else {
                    continue;
                };
                for &byte in &allowed {
                    scores.bonus[usize::from(byte)] += part_bonus(&field, line, byte);
                }
            }
        }
        scores
    }

    /// Best admitted byte, or [`NONE`] when no candidate is convincing.
    ///
    /// The weighted bonus picks the winner; its raw bonus must reach a fifth
    /// of the part count, i.e. the equivalent of one fully quoted part in
    /// five.
    pub fn best(&self, lines: &[Line], delimiter: u8) -> u8 {
        let scores = self.scores(lines, delimiter);
        let mut best: Option<(u8, i64)> = None;
        for byte in self.table.allowed() {
            let raw = scores.bonus(byte);
            if raw == 0 {
                continue;
            }
            let weighted = raw as i64 * i64::from(self.table.score(byte));
            trace!("quote {:?}: bonus {raw}, weighted {weighted}", byte as char);
            if best.is_none_or(|(_, top)| weighted > top) {
                best = Some((byte, weighted));
            }
        }

        match best {
            Some((byte, _)) if BOTH_ENDS_BONUS * scores.bonus(byte) >= scores.total_parts => {
                debug!(
                    "quote {:?} (bonus {} over {} parts)",
                    byte as char,
                    scores.bonus(byte),
                    scores.total_parts
                );
                byte
            }
            Some((byte, _)) => {
                debug!(
                    "no reliable quote: best {:?} has bonus {} over {} parts",
                    byte as char,
                    scores.bonus(byte),
                    scores.total_parts
                );
                NONE
            }
            None => {
                debug!("no quote candidates found");
                NONE
            }
        }
    }
}

fn part_bonus(field: &Field, line: &Line, byte: u8) -> u64 {
    if field.is_quoted(line, byte) {
        BOTH_ENDS_BONUS
    } else if field.starts_with(line, byte) || field.ends_with(line, byte) {
        ONE_END_BONUS
    } else {
        0
    }
}

impl ByteComputer for QuoteComputer {
    fn stage(&self) -> Stage {
        Stage::Quote
    }

    fn compute(&self, lines: &[Line], draft: &DialectDraft) -> Result<u8> {
        let delimiter = draft
            .delimiter
            .ok_or(SnifferError::NoCandidate(Stage::Delimiter))?;
        Ok(self.best(lines, delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::scoring::QUOTES;

    fn lines(data: &[u8]) -> Vec<Line> {
        crate::tokenizer::LineReader::new(data).sample(100).unwrap()
    }

    fn computer() -> QuoteComputer {
        QuoteComputer::new(ByteTable::allow_list(QUOTES).unwrap())
    }

    #[test]
    fn test_fully_quoted() {
        let sample = lines(b"\"a\",\"b\"\n\"c\", \"d\" \n");
        let scores = computer().scores(&sample, b',');
        assert_eq!(scores.total_parts, 4);
        assert_eq!(scores.bonus(b'"'), 20);
        assert_eq!(computer().best(&sample, b','), b'"');
    }

    #[test]
    fn test_one_sided_bonus() {
        let sample = lines(b"'abc,def'\n");
        let scores = computer().scores(&sample, b',');
        assert_eq!(scores.bonus(b'\''), 2);
        assert_eq!(scores.total_parts, 2);
        assert_eq!(computer().best(&sample, b','), b'\'');
    }

    #[test]
    fn test_unquoted_returns_sentinel() {
        let sample = lines(b"a\tb\tc\n1\t2\t3\n");
        assert_eq!(computer().best(&sample, b'\t'), NONE);
    }

    #[test]
    fn test_low_confidence_returns_sentinel() {
        // One apostrophe-ending word among many parts.
        let sample = lines(b"a,b,c,d,e,f\ng,h,i,j,k,l'\nm,n,o,p,q,r\n");
        assert_eq!(computer().best(&sample, b','), NONE);
    }

    #[test]
    fn test_weights_pick_the_winner() {
        let sample = lines(b"'a',\"b\"\n'c',\"d\"\n");
        let mut table = ByteTable::allow_list(QUOTES).unwrap();
        table.set(b'\'', 3).unwrap();
        assert_eq!(QuoteComputer::new(table).best(&sample, b','), b'\'');

        // Equal weights: the lower byte wins the tie.
        assert_eq!(computer().best(&sample, b','), b'"');
    }
}
