//! Per-byte score tables and the models that produce them.
//!
//! A [`ByteTable`] maps every byte to a signed score. A positive score
//! admits the byte as a candidate; the magnitude weights it against other
//! candidates. [`BasicScoring`] only uses weights 0 and 1, which makes the
//! tables plain allow-lists. [`WeightedScoring`] lets callers tune them.

use std::fmt;

use crate::error::{Result, SnifferError};
use crate::metadata::printable;

/// Delimiters tried by default.
///
/// Space and `.` are left out: both occur in free text and numbers far
/// more often than they delimit fields.
pub const DELIMITERS: &[u8] = b",;\t|^~#&:";

/// Quote characters tried by default.
pub const QUOTES: &[u8] = b"\"'`";

/// Escape characters tried by default. The detected quote is always a
/// candidate as well.
pub const ESCAPES: &[u8] = b"\\\"'`^~!#%&*|/";

/// Signed score for every byte value.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteTable {
    scores: [i32; 256],
}

impl ByteTable {
    /// A table that admits nothing.
    pub const fn empty() -> Self {
        Self { scores: [0; 256] }
    }

    /// A table giving weight 1 to each byte of `allowed`.
    pub fn allow_list(allowed: &[u8]) -> Result<Self> {
        let mut table = Self::empty();
        for &byte in allowed {
            table.set(byte, 1)?;
        }
        Ok(table)
    }

    /// Set the score of `byte`.
    ///
    /// Letters, digits, CR, LF and NUL can never be dialect bytes; giving
    /// them a positive score is a configuration error.
    pub fn set(&mut self, byte: u8, score: i32) -> Result<()> {
        if score > 0 && !is_admissible(byte) {
            return Err(SnifferError::InvalidConfig(format!(
                "{} cannot be a dialect character",
                printable(byte)
            )));
        }
        self.scores[usize::from(byte)] = score;
        Ok(())
    }

    /// Build from bytes known to be admissible.
    fn trusted(weights: &[(u8, i32)]) -> Self {
        let mut table = Self::empty();
        for &(byte, score) in weights {
            debug_assert!(is_admissible(byte));
            table.scores[usize::from(byte)] = score;
        }
        table
    }

    #[inline]
    pub fn score(&self, byte: u8) -> i32 {
        self.scores[usize::from(byte)]
    }

    #[inline]
    pub fn allows(&self, byte: u8) -> bool {
        self.score(byte) > 0
    }

    /// Admitted bytes in ascending order.
    pub fn allowed(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |&b| self.allows(b))
    }
}

impl Default for ByteTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ByteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                (0..=u8::MAX)
                    .filter(|&b| self.score(b) != 0)
                    .map(|b| (printable(b), self.score(b))),
            )
            .finish()
    }
}

fn is_admissible(byte: u8) -> bool {
    !(byte.is_ascii_alphanumeric() || matches!(byte, b'\r' | b'\n' | 0x00))
}

/// Source of the score tables used by the dialect computers.
///
/// Each computer clones the table it needs, so a model can be shared
/// between threads while every computer owns its scores outright.
pub trait ScoreModel: fmt::Debug + Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    fn delimiters(&self) -> &ByteTable;

    fn quotes(&self) -> &ByteTable;

    fn escapes(&self) -> &ByteTable;
}

/// Binary allow-lists: a byte is either a candidate or it is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicScoring {
    delimiters: ByteTable,
    quotes: ByteTable,
    escapes: ByteTable,
}

impl BasicScoring {
    pub fn new(delimiters: &[u8], quotes: &[u8], escapes: &[u8]) -> Result<Self> {
        Ok(Self {
            delimiters: ByteTable::allow_list(delimiters)?,
            quotes: ByteTable::allow_list(quotes)?,
            escapes: ByteTable::allow_list(escapes)?,
        })
    }
}

fn unit_weights(bytes: &[u8]) -> Vec<(u8, i32)> {
    bytes.iter().map(|&b| (b, 1)).collect()
}

impl Default for BasicScoring {
    fn default() -> Self {
        Self {
            delimiters: ByteTable::trusted(&unit_weights(DELIMITERS)),
            quotes: ByteTable::trusted(&unit_weights(QUOTES)),
            escapes: ByteTable::trusted(&unit_weights(ESCAPES)),
        }
    }
}

impl ScoreModel for BasicScoring {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn delimiters(&self) -> &ByteTable {
        &self.delimiters
    }

    fn quotes(&self) -> &ByteTable {
        &self.quotes
    }

    fn escapes(&self) -> &ByteTable {
        &self.escapes
    }
}

/// Tunable per-byte weights. Non-positive weights exclude a byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedScoring {
    delimiters: ByteTable,
    quotes: ByteTable,
    escapes: ByteTable,
}

impl WeightedScoring {
    /// Start from the weights of a basic model.
    pub fn from_basic(basic: &BasicScoring) -> Self {
        Self {
            delimiters: basic.delimiters.clone(),
            quotes: basic.quotes.clone(),
            escapes: basic.escapes.clone(),
        }
    }

    pub fn delimiter(mut self, byte: u8, weight: i32) -> Result<Self> {
        self.delimiters.set(byte, weight)?;
        Ok(self)
    }

    pub fn quote(mut self, byte: u8, weight: i32) -> Result<Self> {
        self.quotes.set(byte, weight)?;
        Ok(self)
    }

    pub fn escape(mut self, byte: u8, weight: i32) -> Result<Self> {
        self.escapes.set(byte, weight)?;
        Ok(self)
    }
}

impl Default for WeightedScoring {
    /// Basic candidates with the common conventions weighted up.
    fn default() -> Self {
        let mut delimiters = unit_weights(DELIMITERS);
        delimiters.extend([(b',', 3), (b';', 3), (b'\t', 3), (b'|', 2)]);
        let mut quotes = unit_weights(QUOTES);
        quotes.push((b'"', 2));
        let mut escapes = unit_weights(ESCAPES);
        escapes.extend([(b'\\', 2), (b'"', 2)]);

        Self {
            delimiters: ByteTable::trusted(&delimiters),
            quotes: ByteTable::trusted(&quotes),
            escapes: ByteTable::trusted(&escapes),
        }
    }
}

impl ScoreModel for WeightedScoring {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn delimiters(&self) -> &ByteTable {
        &self.delimiters
    }

    fn quotes(&self) -> &ByteTable {
        &self.quotes
    }

    fn escapes(&self) -> &ByteTable {
        &self.escapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let table = ByteTable::allow_list(b",;").unwrap();
        assert!(table.allows(b','));
        assert!(!table.allows(b'|'));
        assert_eq!(table.allowed().collect::<Vec<_>>(), vec![b',', b';']);
    }

    #[test]
    fn test_rejects_inadmissible_bytes() {
        for byte in [b'a', b'Z', b'7', b'\r', b'\n', 0x00] {
            assert!(ByteTable::allow_list(&[byte]).is_err());
        }
        // Excluding them is fine.
        let mut table = ByteTable::empty();
        assert!(table.set(b'a', -5).is_ok());
        assert!(!table.allows(b'a'));
    }

    #[test]
    fn test_default_models() {
        let basic = BasicScoring::default();
        assert_eq!(basic.delimiters().allowed().count(), DELIMITERS.len());
        assert!(!basic.delimiters().allows(b' '));

        let weighted = WeightedScoring::default();
        assert_eq!(weighted.delimiters().score(b','), 3);
        assert_eq!(weighted.delimiters().score(b'^'), 1);
        assert_eq!(weighted.quotes().score(b'"'), 2);
    }

    #[test]
    fn test_negative_weight_excludes() {
        let weighted = WeightedScoring::default().delimiter(b'#', -10).unwrap();
        assert!(!weighted.delimiters().allows(b'#'));
        assert_eq!(weighted.delimiters().score(b'#'), -10);
    }
}
