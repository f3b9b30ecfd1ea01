use std::io::Read;

use log::debug;

use crate::error::{Result, SnifferError};

/// Default sniff budget: 64 KiB.
pub const DEFAULT_SAMPLE_BYTES: usize = 64 * 1024;

/// How much of the source is buffered for sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSize {
    /// Sample a specific number of records.
    Records(usize),
    /// Sample a specific number of bytes.
    Bytes(usize),
    /// Read the entire source.
    ///
    /// # Warning
    ///
    /// This loads the entire source into memory. For large files prefer
    /// [`SampleSize::Bytes`] with a reasonable limit.
    All,
}

impl Default for SampleSize {
    fn default() -> Self {
        SampleSize::Bytes(DEFAULT_SAMPLE_BYTES)
    }
}

impl SampleSize {
    /// Returns the number of records to sample, or None for other modes.
    pub fn records(&self) -> Option<usize> {
        match self {
            SampleSize::Records(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number of bytes to sample, or None for other modes.
    pub fn bytes(&self) -> Option<usize> {
        match self {
            SampleSize::Bytes(n) => Some(*n),
            _ => None,
        }
    }

    /// Rejects zero budgets.
    pub fn validate(&self) -> Result<()> {
        match self {
            SampleSize::Records(0) | SampleSize::Bytes(0) => Err(SnifferError::InvalidConfig(
                format!("sample size must be positive, got {self:?}"),
            )),
            _ => Ok(()),
        }
    }
}

const READ_CHUNK: usize = 8 * 1024;

/// Buffer the part of `source` covered by `size`.
///
/// When the budget stops short of the end of the source, the buffer is cut
/// back to its last line terminator so no partial record reaches the
/// sniffers. A budget that holds no complete line is cut back to its last
/// complete UTF-8 code point instead.
pub fn read_sample<R: Read>(mut source: R, size: SampleSize) -> Result<Vec<u8>> {
    size.validate()?;
    let mut buffer = Vec::new();

    match size {
        SampleSize::All => {
            source.read_to_end(&mut buffer)?;
        }
        SampleSize::Bytes(n) => {
            // One extra byte tells a cut from an exact fit.
            (&mut source)
                .take((n as u64).saturating_add(1))
                .read_to_end(&mut buffer)?;
            if buffer.len() > n {
                buffer.truncate(n);
                cut_sample(&mut buffer);
            }
        }
        SampleSize::Records(n) => {
            let mut chunk = vec![0u8; READ_CHUNK];
            let mut scanner = RecordScanner::default();
            loop {
                if let Some(end) = scanner.scan(&buffer, n) {
                    buffer.truncate(end);
                    break;
                }
                let read = source.read(&mut chunk)?;
                if read == 0 {
                    break;
                }
                buffer.extend_from_slice(&chunk[..read]);
            }
        }
    }

    debug!("buffered {} bytes for {size:?}", buffer.len());
    Ok(buffer)
}

/// Counts line terminators across reads without rescanning.
#[derive(Debug, Default)]
struct RecordScanner {
    pos: usize,
    seen: usize,
}

impl RecordScanner {
    /// Offset just past the `n`th line terminator, once it is known to be
    /// complete. A trailing CR is only final when a byte follows it.
    fn scan(&mut self, buffer: &[u8], n: usize) -> Option<usize> {
        while self.pos < buffer.len() {
            match buffer[self.pos] {
                b'\n' => self.seen += 1,
                b'\r' => {
                    let next = buffer.get(self.pos + 1).copied()?;
                    if next == b'\n' {
                        self.pos += 1;
                    }
                    self.seen += 1;
                }
                _ => {}
            }
            self.pos += 1;
            if self.seen == n {
                return Some(self.pos);
            }
        }
        None
    }
}

/// Cut a sample that was stopped by its byte budget: back to the last line
/// terminator, or failing that to the last complete UTF-8 code point.
pub(crate) fn cut_sample(buffer: &mut Vec<u8>) {
    if cut_to_last_terminator(buffer) {
        return;
    }
    let complete = match simdutf8::compat::from_utf8(buffer) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => return,
    };
    if complete > 0 {
        buffer.truncate(complete);
    }
}

/// Drop everything after the last CR or LF, if there is one.
fn cut_to_last_terminator(buffer: &mut Vec<u8>) -> bool {
    match buffer.iter().rposition(|&b| b == b'\n' || b == b'\r') {
        Some(pos) => {
            buffer.truncate(pos + 1);
            true
        }
        None => false,
    }
}
