//! csv-whiff CLI - CSV dialect and encoding sniffer

use std::process::ExitCode;

use clap::{ArgAction, Parser};
use csv_whiff::{Metadata, NONE, SampleSize, Sniffer, printable};
use log::LevelFilter;
use rayon::prelude::*;
use serde::Serialize;

/// CSV dialect and encoding sniffer.
///
/// Detects the delimiter, quote and escape characters, the character set
/// and the presence of a header row.
#[derive(Parser, Debug)]
#[command(name = "csv-whiff")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input CSV file(s) to sniff
    #[arg(required = true)]
    files: Vec<String>,

    /// Number of bytes to sample (default: 65536)
    #[arg(short = 'b', long, conflicts_with_all = ["records", "all"])]
    bytes: Option<usize>,

    /// Number of records to sample
    #[arg(short = 'n', long, conflicts_with = "all")]
    records: Option<usize>,

    /// Read entire file instead of sampling
    #[arg(short = 'a', long)]
    all: bool,

    /// Force specific delimiter (single character)
    #[arg(short = 'd', long, value_parser = parse_byte)]
    delimiter: Option<u8>,

    /// Force specific quote character (single character, or 'none')
    #[arg(short = 'q', long, value_parser = parse_quote)]
    quote: Option<u8>,

    /// Encoding label to use when the file is not UTF-8 (e.g. latin1)
    #[arg(short = 'e', long)]
    encoding: Option<String>,

    /// Output format
    #[arg(short = 'f', long, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_byte(value: &str) -> Result<u8, String> {
    let value = match value {
        "\\t" | "tab" => "\t",
        "space" => " ",
        other => other,
    };
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("expected a single ASCII character, got '{value}'")),
    }
}

fn parse_quote(value: &str) -> Result<u8, String> {
    if value.eq_ignore_ascii_case("none") {
        Ok(NONE)
    } else {
        parse_byte(value)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let sniffer = build_sniffer(&args);
    let results: Vec<_> = args
        .files
        .par_iter()
        .map(|file| sniff_source(&sniffer, file))
        .collect();

    let mut exit_code = ExitCode::SUCCESS;
    for (file, result) in args.files.iter().zip(results) {
        match result {
            Ok(metadata) => match args.format {
                OutputFormat::Text => print_text_output(file, &metadata),
                OutputFormat::Json => print_json_output(file, &metadata),
            },
            Err(e) => {
                eprintln!("Error processing {file}: {e}");
                exit_code = ExitCode::FAILURE;
            }
        }
    }

    exit_code
}

fn build_sniffer(args: &Args) -> Sniffer {
    let mut sniffer = Sniffer::new();

    if args.all {
        sniffer.sample_size(SampleSize::All);
    } else if let Some(records) = args.records {
        sniffer.sample_size(SampleSize::Records(records));
    } else if let Some(bytes) = args.bytes {
        sniffer.sample_size(SampleSize::Bytes(bytes));
    }
    if let Some(delimiter) = args.delimiter {
        sniffer.delimiter(delimiter);
    }
    if let Some(quote) = args.quote {
        sniffer.quote(quote);
    }
    if let Some(label) = &args.encoding {
        sniffer.encoding_hint(label.as_str());
    }
    sniffer
}

#[cfg(feature = "http")]
fn sniff_source(sniffer: &Sniffer, source: &str) -> csv_whiff::Result<Metadata> {
    if source.starts_with("http://") || source.starts_with("https://") {
        sniffer.sniff_url(source)
    } else {
        sniffer.sniff_path(source)
    }
}

#[cfg(not(feature = "http"))]
fn sniff_source(sniffer: &Sniffer, source: &str) -> csv_whiff::Result<Metadata> {
    sniffer.sniff_path(source)
}

fn print_text_output(file: &str, metadata: &Metadata) {
    println!("File: {file}");
    println!("  Delimiter: {}", printable(metadata.dialect.delimiter));
    println!("  Quote: {}", printable(metadata.dialect.quote));
    println!("  Escape: {}", printable(metadata.dialect.escape));
    println!("  Charset: {}", metadata.charset);
    println!("  Encoding: {}", metadata.encoding.name());
    match &metadata.header {
        Some(header) => println!("  Header: {}", header.join(" | ")),
        None => println!("  Header: none"),
    }
    println!("  Fields: {}", metadata.num_fields);
    println!("  Avg record length: {} bytes", metadata.avg_record_len);
    println!("  Sampled: {} bytes", metadata.sample_len);
    println!();
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    metadata: &'a Metadata,
}

fn print_json_output(file: &str, metadata: &Metadata) {
    let report = JsonReport { file, metadata };
    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing {file}: {e}"),
    }
}
