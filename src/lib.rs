//! csv-whiff: CSV dialect and encoding sniffer
//!
//! Infers how a CSV file of unknown provenance is written: its delimiter,
//! quote and escape characters, whether it is ASCII, UTF-8 or some 8-bit
//! charset, and whether the first record is a header.
//!
//! # Quick Start
//!
//! ```no_run
//! use csv_whiff::{SampleSize, Sniffer};
//!
//! // Create a sniffer with default settings
//! let mut sniffer = Sniffer::new();
//!
//! // Optionally configure sampling
//! sniffer.sample_size(SampleSize::Records(100));
//!
//! // Sniff a file
//! let metadata = sniffer.sniff_path("data.csv").unwrap();
//!
//! println!("Delimiter: {}", metadata.dialect.delimiter as char);
//! println!("Charset: {}", metadata.charset);
//! println!("Header: {:?}", metadata.header);
//! ```
//!
//! # How it works
//!
//! The sample is buffered once and fed to two analyses running on their
//! own threads:
//!
//! 1. The format sniffer tokenizes lines at the byte level and picks the
//!    delimiter by the variance of per-line counts, then the quote by how
//!    parts begin and end, then the escape by what precedes embedded quotes.
//! 2. The encoding sniffer runs a strict UTF-8 decoder over the sample.
//!
//! A second pass over the same bytes, with the chosen dialect, decides
//! whether the first record is a header by comparing value signatures.
//!
//! The lower-level pieces ([`dialect::format::FormatSniffer`],
//! [`encoding::sniff_charset`], [`fanout::FanOut`], [`header`]) are public
//! for callers that need only part of the pipeline.

pub mod dialect;
pub mod encoding;
mod error;
pub mod fanout;
pub mod header;
#[cfg(feature = "http")]
pub mod http;
mod metadata;
mod sample;
mod sniffer;
pub mod tokenizer;
pub mod utf8;

pub use dialect::scoring::{BasicScoring, ScoreModel, WeightedScoring};
pub use error::{Result, SnifferError, Stage, WorkerFailure};
pub use metadata::{Charset, Dialect, Metadata, NONE, printable};
pub use sample::{DEFAULT_SAMPLE_BYTES, SampleSize};
pub use sniffer::Sniffer;

// Re-export for advanced usage
pub use encoding::{has_utf8_bom, resolve_encoding, skip_bom, sniff_charset_bytes};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api() {
        let _sniffer = Sniffer::new();
        let _sample = SampleSize::Records(100);
        let _dialect = Dialect::new(b';', NONE, NONE);
        let _charset = Charset::Unknown;
        let _scoring = WeightedScoring::default();
    }

    #[test]
    fn test_sniff_simple_csv() {
        let data = b"a,b,c\n1,2,3\n4,5,6\n";
        let metadata = Sniffer::new().sniff_bytes(data).unwrap();

        assert_eq!(metadata.dialect.delimiter, b',');
        assert_eq!(metadata.num_fields, 3);
    }

    #[test]
    fn test_builder_pattern() {
        let mut sniffer = Sniffer::new();
        sniffer
            .sample_size(SampleSize::Bytes(4096))
            .delimiter(b';')
            .quote(NONE)
            .header_rows(10)
            .pipe_capacity(4);

        let metadata = sniffer.sniff_bytes(b"x;y\n1;2\n").unwrap();
        assert_eq!(metadata.dialect, Dialect::new(b';', NONE, NONE));
    }
}
