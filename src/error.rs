use std::fmt;
use std::io;
use thiserror::Error;

use crate::utf8::EncodingError;

/// Dialect inference stage, reported when a stage finds no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Delimiter,
    Quote,
    Escape,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Delimiter => write!(f, "delimiter"),
            Stage::Quote => write!(f, "quote"),
            Stage::Escape => write!(f, "escape"),
        }
    }
}

/// A fan-out worker that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    /// Name the worker was registered under.
    pub name: String,
    /// Rendered error or panic message.
    pub message: String,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Error type for CSV sniffing operations.
#[derive(Error, Debug)]
pub enum SnifferError {
    /// IO error while reading the byte source.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed UTF-8 byte sequence.
    #[error("UTF-8 decoding error: {0}")]
    Decode(#[from] EncodingError),

    /// CSV parsing error while extracting rows for header detection.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A dialect stage found no viable byte.
    #[error("Could not detect CSV {0}: no viable candidate")]
    NoCandidate(Stage),

    /// Empty file or no data.
    #[error("Empty file or no data to analyze")]
    EmptyData,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fan-out worker panicked.
    #[error("Sniffer worker '{name}' failed: {message}")]
    Worker { name: String, message: String },

    /// One or more fan-out workers failed.
    #[error("{} sniffer worker(s) failed: {}", .0.len(), join_failures(.0))]
    Workers(Vec<WorkerFailure>),

    /// HTTP error while fetching a remote sample.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] crate::http::HttpError),
}

fn join_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for sniffing operations.
pub type Result<T> = std::result::Result<T, SnifferError>;
