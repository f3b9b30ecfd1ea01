//! HTTP Range request support for sniffing remote CSV files.

use std::io::Read;
use std::time::Duration;

use log::debug;
use thiserror::Error;

use crate::error::Result;
use crate::metadata::Metadata;
use crate::sample::{DEFAULT_SAMPLE_BYTES, SampleSize, cut_sample};
use crate::sniffer::Sniffer;

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during HTTP fetching.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for HttpError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => HttpError::HttpStatus {
                status: code,
                message: format!("Server returned status {code}"),
            },
            _ => HttpError::Network(err.to_string()),
        }
    }
}

/// The start of a remote file.
#[derive(Debug, Clone)]
pub struct RemoteSample {
    pub data: Vec<u8>,
    /// The server answered the Range request with 206.
    pub range_supported: bool,
    /// Total size of the remote file, if the server reported it.
    pub content_length: Option<u64>,
}

impl RemoteSample {
    /// Returns true if the sample stops before the end of the remote file.
    pub fn is_truncated(&self) -> bool {
        self.content_length
            .is_some_and(|total| (self.data.len() as u64) < total)
    }
}

fn agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(DEFAULT_TIMEOUT))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Fetch at most `max_bytes` from the start of `url`.
///
/// Asks for a byte range first. A server that ignores the range sends the
/// whole body, which is cut at `max_bytes` while reading. A 416 answer
/// (file smaller than the range) falls back to a plain request.
pub fn fetch_sample(url: &str, max_bytes: usize) -> std::result::Result<RemoteSample, HttpError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(HttpError::InvalidUrl(format!(
            "URL must start with http:// or https://: {url}"
        )));
    }

    match fetch_range(url, max_bytes) {
        Err(HttpError::HttpStatus { status: 416, .. }) => {
            debug!("range not satisfiable for {url}, fetching without range");
            fetch_plain(url, max_bytes)
        }
        other => other,
    }
}

fn fetch_range(url: &str, max_bytes: usize) -> std::result::Result<RemoteSample, HttpError> {
    let range_header = format!("bytes=0-{}", max_bytes.saturating_sub(1));
    let response = agent().get(url).header("Range", &range_header).call()?;

    let range_supported = response.status() == 206;
    let content_length = response
        .headers()
        .get("Content-Range")
        .and_then(|h| {
            // "bytes 0-N/TOTAL"
            let s = h.to_str().ok()?;
            s.split('/').next_back()?.parse::<u64>().ok()
        })
        .or_else(|| {
            response
                .headers()
                .get("Content-Length")
                .and_then(|h| h.to_str().ok()?.parse::<u64>().ok())
        });

    let mut data = Vec::with_capacity(max_bytes.min(DEFAULT_SAMPLE_BYTES));
    response
        .into_body()
        .into_reader()
        .take(max_bytes as u64)
        .read_to_end(&mut data)?;
    debug!(
        "fetched {} bytes from {url} (range supported: {range_supported})",
        data.len()
    );

    Ok(RemoteSample {
        data,
        range_supported,
        content_length,
    })
}

fn fetch_plain(url: &str, max_bytes: usize) -> std::result::Result<RemoteSample, HttpError> {
    let response = agent().get(url).call()?;
    let content_length = response
        .headers()
        .get("Content-Length")
        .and_then(|h| h.to_str().ok()?.parse::<u64>().ok());

    let mut data = Vec::with_capacity(max_bytes.min(DEFAULT_SAMPLE_BYTES));
    response
        .into_body()
        .into_reader()
        .take(max_bytes as u64)
        .read_to_end(&mut data)?;

    Ok(RemoteSample {
        data,
        range_supported: false,
        content_length,
    })
}

impl Sniffer {
    /// Sniff the start of a remote CSV file.
    ///
    /// `SampleSize::Bytes(n)` fetches `n` bytes; other sample sizes fetch
    /// the default byte budget and then apply the sample size to it.
    pub fn sniff_url(&self, url: &str) -> Result<Metadata> {
        let max_bytes = match self.sample_budget() {
            SampleSize::Bytes(n) => n,
            _ => DEFAULT_SAMPLE_BYTES,
        };
        let mut remote = fetch_sample(url, max_bytes)?;
        if !remote.range_supported {
            debug!("{url} ignored the range request, body cut at {max_bytes} bytes");
        }
        let filled = remote.content_length.is_none() && remote.data.len() >= max_bytes;
        if remote.is_truncated() || filled {
            cut_sample(&mut remote.data);
        }
        self.sniff_bytes(&remote.data)
    }
}
