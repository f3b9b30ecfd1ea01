//! Dialect inference: delimiter, then quote, then escape.
//!
//! Each stage is a [`ByteComputer`] over the same sampled lines. A stage
//! sees the bytes chosen by the stages before it through a
//! [`DialectDraft`].

pub mod delimiter;
pub mod escape;
pub mod format;
pub mod quote;
pub mod scoring;

use crate::error::{Result, Stage};
use crate::tokenizer::Line;

pub use crate::metadata::NONE;

/// The dialect as far as it has been decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialectDraft {
    pub delimiter: Option<u8>,
    pub quote: Option<u8>,
    pub escape: Option<u8>,
}

impl DialectDraft {
    /// Returns the slot a stage fills.
    pub fn slot(&self, stage: Stage) -> Option<u8> {
        match stage {
            Stage::Delimiter => self.delimiter,
            Stage::Quote => self.quote,
            Stage::Escape => self.escape,
        }
    }

    pub fn fill(&mut self, stage: Stage, byte: u8) {
        match stage {
            Stage::Delimiter => self.delimiter = Some(byte),
            Stage::Quote => self.quote = Some(byte),
            Stage::Escape => self.escape = Some(byte),
        }
    }
}

/// One dialect stage: choose a byte from the sampled lines.
///
/// Quote and escape stages return [`NONE`] when nothing is convincing;
/// only the delimiter stage fails outright.
pub trait ByteComputer {
    fn stage(&self) -> Stage;

    fn compute(&self, lines: &[Line], draft: &DialectDraft) -> Result<u8>;
}
