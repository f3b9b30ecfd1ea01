//! Integration tests for csv-whiff

use csv_whiff::dialect::format::FormatSniffer;
use csv_whiff::tokenizer::Line;
use csv_whiff::{
    BasicScoring, Charset, Dialect, NONE, SampleSize, Sniffer, SnifferError, Stage,
    WeightedScoring, sniff_charset_bytes,
};
use std::io::Write;
use tempfile::NamedTempFile;

const WIKIPEDIA: &[u8] = b"Year,Make,Model,Description,Price\n\
1997,Ford,E350,\"ac, abs, moon\",3000.00\n\
1999,Chevy,\"Venture \"\"Extended Edition\"\"\",\"\",4900.00\n\
1999,Chevy,\"Venture \"\"Extended Edition, Very Large\"\"\",,5000.00\n\
1996,Jeep,Grand Cherokee,\"MUST SELL!\n\
air, moon roof, loaded\",4799.00\n";

const TABS_WITH_COMMAS: &[u8] = b"name\tnotes\tprice\n\
Alice\thello, world\t10\n\
Bob\tfoo\t20\n\
Carol\ta, b, c\t30\n";

fn header(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

#[test]
fn test_wikipedia_example() {
    let metadata = Sniffer::new().sniff_bytes(WIKIPEDIA).unwrap();

    assert_eq!(metadata.dialect, Dialect::new(b',', b'"', b'"'));
    assert!(metadata.dialect.doubles_quotes());
    assert_eq!(metadata.charset, Charset::Ascii);
    assert_eq!(
        metadata.header,
        header(&["Year", "Make", "Model", "Description", "Price"])
    );
    assert_eq!(metadata.num_fields, 5);
}

#[test]
fn test_wikipedia_example_weighted() {
    let mut sniffer = Sniffer::new();
    sniffer.scoring(WeightedScoring::default());
    let metadata = sniffer.sniff_bytes(WIKIPEDIA).unwrap();
    assert_eq!(metadata.dialect, Dialect::new(b',', b'"', b'"'));
}

#[test]
fn test_tabs_with_stray_commas() {
    let metadata = Sniffer::new().sniff_bytes(TABS_WITH_COMMAS).unwrap();

    assert_eq!(metadata.dialect, Dialect::new(b'\t', NONE, NONE));
    assert_eq!(metadata.dialect.quote_char(), None);
    assert_eq!(metadata.header, header(&["name", "notes", "price"]));
}

#[test]
fn test_format_sniffer_alone() {
    let sniffer = FormatSniffer::new(&BasicScoring::default());
    assert_eq!(
        sniffer.sniff_reader(WIKIPEDIA).unwrap(),
        Dialect::new(b',', b'"', b'"')
    );
    assert_eq!(
        sniffer.sniff_reader(TABS_WITH_COMMAS).unwrap(),
        Dialect::new(b'\t', NONE, NONE)
    );
}

#[test]
fn test_escaped_pipe_tokenizes_verbatim() {
    let line = Line::from(&b"'a' | 'b \\| c'"[..]);
    let parts: Vec<&[u8]> = line
        .split_quoted(b'|', b'\'', b'\\')
        .iter()
        .map(|field| field.bytes(&line))
        .collect();
    assert_eq!(parts, vec![&b"a"[..], &b"b \\| c"[..]]);
}

#[test]
fn test_single_quotes_with_backslash_escapes() {
    let data = b"'id'|'name'\n'1'|'O\\'Brien'\n'2'|'D\\'Arcy'\n'3'|'Smith'\n";
    let metadata = Sniffer::new().sniff_bytes(data).unwrap();

    assert_eq!(metadata.dialect, Dialect::new(b'|', b'\'', b'\\'));
    assert_eq!(metadata.header, header(&["id", "name"]));
}

#[test]
fn test_bom_forces_utf8() {
    let data = b"\xEF\xBB\xBFa,b\n1,2\n";
    assert_eq!(sniff_charset_bytes(data, 1024), Charset::Utf8);
    assert_eq!(sniff_charset_bytes(b"a,b\n1,2\n", 1024), Charset::Ascii);

    let metadata = Sniffer::new().sniff_bytes(data).unwrap();
    assert_eq!(metadata.charset, Charset::Utf8);
    assert_eq!(metadata.encoding, encoding_rs::UTF_8);
    assert_eq!(metadata.header, header(&["a", "b"]));
}

#[test]
fn test_header_present_and_absent() {
    let with_header = b"Year,Make,Model\n1997,Ford,E350\n2000,Mercury,Cougar\n";
    let metadata = Sniffer::new().sniff_bytes(with_header).unwrap();
    assert_eq!(metadata.header, header(&["Year", "Make", "Model"]));

    let without = b"1997,Ford,E350\n1999,Chevy,Venture\n2000,Mercury,Cougar\n";
    let metadata = Sniffer::new().sniff_bytes(without).unwrap();
    assert_eq!(metadata.header, None);
    assert_eq!(metadata.num_fields, 3);
}

#[test]
fn test_multibyte_utf8() {
    let data = "Stadt;Einwohner\nMünchen;1488202\nKöln;1073096\n".as_bytes();
    let metadata = Sniffer::new().sniff_bytes(data).unwrap();

    assert_eq!(metadata.dialect.delimiter, b';');
    assert_eq!(metadata.charset, Charset::Utf8);
    assert_eq!(metadata.header, header(&["Stadt", "Einwohner"]));
}

#[test]
fn test_latin1_with_hint() {
    let data = b"Stra\xdfe;Nr\nHaupt;12\nNeben;7\n";
    let mut sniffer = Sniffer::new();
    sniffer.encoding_hint("latin1");
    let metadata = sniffer.sniff_bytes(data).unwrap();

    assert_eq!(metadata.charset, Charset::Unknown);
    assert_eq!(metadata.encoding, encoding_rs::WINDOWS_1252);
    assert_eq!(metadata.header, header(&["Straße", "Nr"]));
}

#[test]
fn test_latin1_without_hint_is_still_sniffed() {
    let data = b"Stra\xdfe;Nr\nHaupt;12\nNeben;7\n";
    let metadata = Sniffer::new().sniff_bytes(data).unwrap();

    assert_eq!(metadata.charset, Charset::Unknown);
    assert_ne!(metadata.encoding, encoding_rs::UTF_8);
    assert_eq!(metadata.dialect.delimiter, b';');
}

#[test]
fn test_sniff_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(WIKIPEDIA).unwrap();
    file.flush().unwrap();

    let metadata = Sniffer::new().sniff_path(file.path()).unwrap();
    assert_eq!(metadata.dialect, Dialect::new(b',', b'"', b'"'));
    assert_eq!(metadata.sample_len, WIKIPEDIA.len());
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Sniffer::new().sniff_path("/definitely/not/here.csv");
    assert!(matches!(result, Err(SnifferError::Io(_))));
}

#[test]
fn test_sample_budget_cuts_at_line() {
    let mut data = Vec::new();
    for i in 0..1000 {
        writeln!(data, "{i};item {i};{}", i * 3).unwrap();
    }
    let mut sniffer = Sniffer::new();
    sniffer.sample_size(SampleSize::Bytes(1000));
    let metadata = sniffer.sniff_bytes(&data).unwrap();

    assert!(metadata.sample_len <= 1000);
    assert_eq!(data[metadata.sample_len - 1], b'\n');
    assert_eq!(metadata.dialect.delimiter, b';');
    assert_eq!(metadata.num_fields, 3);
}

#[test]
fn test_sample_by_records() {
    let mut sniffer = Sniffer::new();
    sniffer.sample_size(SampleSize::Records(2));
    let metadata = sniffer.sniff_bytes(WIKIPEDIA).unwrap();
    assert_eq!(metadata.dialect.delimiter, b',');
    let second_newline = WIKIPEDIA
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'\n')
        .nth(1)
        .unwrap()
        .0;
    assert_eq!(metadata.sample_len, second_newline + 1);
}

#[test]
fn test_forced_delimiter_and_quote() {
    let mut sniffer = Sniffer::new();
    sniffer.delimiter(b',').quote(NONE);
    let metadata = sniffer.sniff_bytes(TABS_WITH_COMMAS).unwrap();
    assert_eq!(metadata.dialect, Dialect::new(b',', NONE, NONE));
}

#[test]
fn test_no_delimiter_is_reported() {
    let result = Sniffer::new().sniff_bytes(b"just\nsome\nwords\n");
    match result {
        Err(SnifferError::NoCandidate(stage)) => assert_eq!(stage, Stage::Delimiter),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_empty_input() {
    assert!(matches!(Sniffer::new().sniff_bytes(b""), Err(SnifferError::EmptyData)));
}

#[test]
fn test_idempotent() {
    let sniffer = Sniffer::new();
    let first = sniffer.sniff_bytes(WIKIPEDIA).unwrap();
    let second = sniffer.sniff_bytes(WIKIPEDIA).unwrap();
    assert_eq!(first.dialect, second.dialect);
    assert_eq!(first.charset, second.charset);
    assert_eq!(first.header, second.header);
    assert_eq!(first.num_fields, second.num_fields);
    assert_eq!(first.avg_record_len, second.avg_record_len);
}

#[test]
fn test_metadata_serializes_to_json() {
    let metadata = Sniffer::new().sniff_bytes(TABS_WITH_COMMAS).unwrap();
    let json = serde_json::to_value(&metadata).unwrap();

    assert_eq!(json["dialect"]["delimiter"], "\t");
    assert!(json["dialect"]["quote"].is_null());
    assert_eq!(json["charset"], "ascii");
    assert_eq!(json["encoding"], "UTF-8");
    assert_eq!(json["header"][0], "name");
}
