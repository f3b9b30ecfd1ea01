//! Delimiter inference from per-line byte counts.
//!
//! CSV data has a near-constant number of fields per line, so the right
//! delimiter occurs about as often on every line. Candidates are ranked by
//! the population variance of their per-line counts.

use log::{debug, trace};

use super::scoring::ByteTable;
use super::{ByteComputer, DialectDraft};
use crate::error::{Result, SnifferError, Stage};
use crate::tokenizer::Line;

/// Candidates whose per-line count varies more than this are discarded.
pub const MAX_VARIANCE: f64 = 4.0;

/// Variances closer than this are considered equal.
pub const VARIANCE_TIE: f64 = 1e-3;

/// Share of the parts containing a byte that must be bracketed by it for
/// the byte to count as a quote rather than a delimiter.
const BRACKETED_RATIO: f64 = 0.9;

/// A delimiter that survived filtering, with its statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelimiterCandidate {
    pub byte: u8,
    /// Score from the table; the tie-breaker after variance.
    pub score: i32,
    /// Mean occurrences per line.
    pub mean: f64,
    /// Population variance of occurrences per line.
    pub variance: f64,
}

impl DelimiterCandidate {
    fn ranks_above(&self, other: &DelimiterCandidate) -> bool {
        if (self.variance - other.variance).abs() >= VARIANCE_TIE {
            return self.variance < other.variance;
        }
        if self.score != other.score {
            return self.score > other.score;
        }
        if self.mean != other.mean {
            return self.mean > other.mean;
        }
        self.byte < other.byte
    }
}

/// Picks the delimiter from the table's admitted bytes.
#[derive(Debug, Clone)]
pub struct DelimiterComputer {
    table: ByteTable,
    min_fields: usize,
}

impl DelimiterComputer {
    pub fn new(table: ByteTable, min_fields: usize) -> Self {
        Self { table, min_fields }
    }

    /// Surviving candidates, best first.
    pub fn candidates(&self, lines: &[Line]) -> Vec<DelimiterCandidate> {
        if lines.is_empty() {
            return Vec::new();
        }
        let min_mean = self.min_fields.saturating_sub(1) as f64;
        let n = lines.len() as f64;

        let mut survivors = Vec::new();
        for byte in self.table.allowed() {
            let counts: Vec<usize> = lines.iter().map(|line| line.count(byte)).collect();
            let total: usize = counts.iter().sum();
            if total == 0 {
                continue;
            }
            let mean = total as f64 / n;
            let variance = counts
                .iter()
                .map(|&c| {
                    let diff = c as f64 - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n;

            trace!("delimiter {:?}: mean {mean:.3}, variance {variance:.3}", byte as char);
            if mean.round() < min_mean || variance > MAX_VARIANCE {
                continue;
            }
            survivors.push(DelimiterCandidate {
                byte,
                score: self.table.score(byte),
                mean,
                variance,
            });
        }

        let mut ranked = rank(survivors);
        if ranked.len() >= 2 && brackets_parts(lines, ranked[0].byte, ranked[1].byte) {
            debug!(
                "{:?} brackets fields split on {:?}; treating it as a quote",
                ranked[0].byte as char, ranked[1].byte as char
            );
            ranked.swap(0, 1);
        }
        ranked
    }
}

impl ByteComputer for DelimiterComputer {
    fn stage(&self) -> Stage {
        Stage::Delimiter
    }

    fn compute(&self, lines: &[Line], _draft: &DialectDraft) -> Result<u8> {
        let best = self
            .candidates(lines)
            .into_iter()
            .next()
            .ok_or(SnifferError::NoCandidate(Stage::Delimiter))?;
        debug!(
            "delimiter {:?} (mean {:.3}, variance {:.3})",
            best.byte as char, best.mean, best.variance
        );
        Ok(best.byte)
    }
}

/// Selection ranking; the variance tie makes the order non-transitive, so
/// it is applied pairwise instead of through a sort.
fn rank(mut pool: Vec<DelimiterCandidate>) -> Vec<DelimiterCandidate> {
    let mut ranked = Vec::with_capacity(pool.len());
    while !pool.is_empty() {
        let mut best = 0;
        for i in 1..pool.len() {
            if pool[i].ranks_above(&pool[best]) {
                best = i;
            }
        }
        ranked.push(pool.remove(best));
    }
    ranked
}

/// Returns true if `quote_like` consistently wraps the space-trimmed parts
/// of each line split on `delimiter`.
fn brackets_parts(lines: &[Line], quote_like: u8, delimiter: u8) -> bool {
    let mut containing = 0usize;
    let mut bracketed = 0usize;
    for line in lines {
        for mut field in line.split(delimiter) {
            field.trim_spaces(line);
            if !field.bytes(line).contains(&quote_like) {
                continue;
            }
            containing += 1;
            if field.is_quoted(line, quote_like) {
                bracketed += 1;
            }
        }
    }
    containing > 0 && bracketed as f64 >= containing as f64 * BRACKETED_RATIO
}
