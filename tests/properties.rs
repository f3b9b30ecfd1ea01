//! Property tests for the dialect computers, the UTF-8 decoder and the facade.

use csv_whiff::dialect::delimiter::DelimiterComputer;
use csv_whiff::dialect::quote::QuoteComputer;
use csv_whiff::dialect::scoring::{DELIMITERS, QUOTES};
use csv_whiff::tokenizer::Line;
use csv_whiff::utf8::{Utf8Decoder, encode_code_point};
use csv_whiff::{BasicScoring, NONE, ScoreModel, Sniffer};
use proptest::prelude::*;

fn table_of(rows: &[Vec<String>], join: impl Fn(&[String]) -> String) -> Vec<Line> {
    rows.iter()
        .map(|row| Line::from(join(row).into_bytes()))
        .collect()
}

fn rows_strategy(width: usize, min_len: usize) -> impl Strategy<Value = Vec<Vec<String>>> {
    let cell = proptest::string::string_regex(&format!("[a-z0-9]{{{min_len},6}}"))
        .expect("valid regex");
    proptest::collection::vec(proptest::collection::vec(cell, width), 1..20)
}

proptest! {
    #[test]
    fn constant_width_recovers_delimiter(
        (width, rows) in (2usize..7).prop_flat_map(|w| (Just(w), rows_strategy(w, 1))),
        delimiter in proptest::sample::select(DELIMITERS.to_vec()),
    ) {
        let sep = (delimiter as char).to_string();
        let lines = table_of(&rows, |row| row.join(&sep));
        let model = BasicScoring::default();
        let candidates = DelimiterComputer::new(model.delimiters().clone(), 2).candidates(&lines);

        prop_assert_eq!(candidates.len(), 1);
        prop_assert_eq!(candidates[0].byte, delimiter);
        prop_assert_eq!(candidates[0].mean, (width - 1) as f64);
        prop_assert_eq!(candidates[0].variance, 0.0);
    }

    #[test]
    fn fully_quoted_is_always_accepted(
        (_, rows) in (1usize..6).prop_flat_map(|w| (Just(w), rows_strategy(w, 0))),
        quote in proptest::sample::select(QUOTES.to_vec()),
    ) {
        let q = (quote as char).to_string();
        let lines = table_of(&rows, |row| {
            row.iter().map(|v| format!("{q}{v}{q}")).collect::<Vec<_>>().join(",")
        });
        let model = BasicScoring::default();
        let computer = QuoteComputer::new(model.quotes().clone());
        let scores = computer.scores(&lines, b',');

        prop_assert_eq!(scores.bonus(quote), 5 * scores.total_parts);
        let best = computer.best(&lines, b',');
        prop_assert_ne!(best, NONE);
        prop_assert_eq!(best, quote);
    }

    #[test]
    fn utf8_round_trip(c in any::<char>()) {
        let mut bytes = Vec::new();
        encode_code_point(c as u32, &mut bytes).unwrap();
        let mut expected = [0u8; 4];
        prop_assert_eq!(&bytes[..], c.encode_utf8(&mut expected).as_bytes());

        let mut decoder = Utf8Decoder::new(&bytes[..]);
        prop_assert_eq!(decoder.read_code_point().unwrap(), Some(c as u32));
        prop_assert_eq!(decoder.read_code_point().unwrap(), None);
    }

    #[test]
    fn sniffing_is_idempotent(data in proptest::collection::vec(
        proptest::sample::select(b"ab1 ,;\t|\"'\\\n\r\xe9".to_vec()),
        0..400,
    )) {
        let sniffer = Sniffer::new();
        let first = sniffer.sniff_bytes(&data);
        let second = sniffer.sniff_bytes(&data);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.dialect, b.dialect);
                prop_assert_eq!(a.charset, b.charset);
                prop_assert_eq!(a.encoding, b.encoding);
                prop_assert_eq!(a.header, b.header);
                prop_assert_eq!(a.num_fields, b.num_fields);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a, b),
        }
    }
}

#[test]
fn every_scalar_value_round_trips() {
    let mut bytes = Vec::new();
    let scalars: Vec<u32> = (0..=0x10FFFF)
        .filter(|cp| !(0xD800..=0xDFFF).contains(cp))
        .collect();
    for &cp in &scalars {
        encode_code_point(cp, &mut bytes).unwrap();
    }

    let mut decoder = Utf8Decoder::new(&bytes[..]);
    for &cp in &scalars {
        assert_eq!(decoder.read_code_point().unwrap(), Some(cp));
    }
    assert_eq!(decoder.read_code_point().unwrap(), None);
}

#[test]
fn surrogates_are_not_encodable() {
    let mut bytes = Vec::new();
    assert!(encode_code_point(0xD800, &mut bytes).is_err());
    assert!(encode_code_point(0x110000, &mut bytes).is_err());
    assert!(bytes.is_empty());
}
