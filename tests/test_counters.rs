mod common;

use common::counter_log;
use papito_metrics::{CounterBlockParser, CounterValue, PairingPolicy};

#[test]
fn test_parse_block() {
    let parser = CounterBlockParser::default();
    let text = counter_log(&["PAPI_TOT_INS", "PAPI_TOT_CYC"], &["1000", "500"]);
    let parsed = parser.parse_text(&text);

    assert_eq!(parsed.counters.len(), 2);
    assert_eq!(parsed.counters.get("PAPI_TOT_INS"), Some(&CounterValue::Int(1000)));
    assert_eq!(parsed.counters.value_of("PAPI_TOT_CYC"), Some(500.0));
    assert_eq!(parsed.summary, None);
}

#[test]
fn test_value_coercion() {
    assert_eq!(CounterValue::parse("42"), CounterValue::Int(42));
    assert_eq!(CounterValue::parse("-7"), CounterValue::Int(-7));
    assert_eq!(CounterValue::parse("1.5e3"), CounterValue::Float(1500.0));
    assert_eq!(CounterValue::parse("abc"), CounterValue::Missing);
    assert_eq!(CounterValue::parse("nan"), CounterValue::Missing);
    assert_eq!(CounterValue::parse("inf"), CounterValue::Missing);
    assert!(CounterValue::parse("").is_missing());
}

#[test]
fn test_unparsable_token_is_missing_but_kept() {
    let parser = CounterBlockParser::default();
    let text = counter_log(&["A", "B", "C"], &["1", "oops", "2.5"]);
    let parsed = parser.parse_text(&text);

    assert_eq!(parsed.counters.len(), 3);
    assert_eq!(parsed.counters.get("B"), Some(&CounterValue::Missing));
    assert_eq!(parsed.counters.value_of("B"), None);
    assert_eq!(parsed.counters.value_of("C"), Some(2.5));
}

#[test]
fn test_no_markers_yields_empty() {
    let parser = CounterBlockParser::default();
    assert!(parser.parse_text("").counters.is_empty());
    assert!(parser.parse_text("hello\nworld\n").counters.is_empty());
    assert!(parser
        .parse_text("PAPITO_COUNTERS\tA\tB\n")
        .counters
        .is_empty());
    assert!(parser.parse_text("PAPITO_VALUES\t1\t2\n").counters.is_empty());
}

#[test]
fn test_marker_must_be_whole_token() {
    let parser = CounterBlockParser::default();
    let text = "PAPITO_COUNTERSX\tA\nPAPITO_VALUES\t1\n";
    assert!(parser.parse_text(text).counters.is_empty());
}

#[test]
fn test_last_block_wins() {
    let parser = CounterBlockParser::default();
    let text = format!(
        "{}{}",
        counter_log(&["A", "B"], &["1", "2"]),
        counter_log(&["C"], &["3"])
    );
    let parsed = parser.parse_text(&text);

    assert_eq!(parsed.counters.len(), 1);
    assert_eq!(parsed.counters.value_of("C"), Some(3.0));
}

#[test]
fn test_trailing_counters_line_does_not_steal_values() {
    let parser = CounterBlockParser::default();
    let text = "PAPITO_COUNTERS\tA\tB\nPAPITO_VALUES\t1\t2\nPAPITO_COUNTERS\tC\tD\n";
    let parsed = parser.parse_text(text);

    assert_eq!(parsed.counters.len(), 2);
    assert_eq!(parsed.counters.value_of("A"), Some(1.0));
    assert_eq!(parsed.counters.value_of("B"), Some(2.0));
    assert!(!parsed.counters.contains_key("C"));
}

#[test]
fn test_values_line_before_counters_line_is_ignored() {
    let parser = CounterBlockParser::default();
    let text = "PAPITO_VALUES\t1\t2\nPAPITO_COUNTERS\tA\tB\n";
    assert!(parser.parse_text(text).counters.is_empty());

    let text = "PAPITO_VALUES\t9\t9\nPAPITO_COUNTERS\tA\tB\nPAPITO_VALUES\t1\t2\n";
    let parsed = parser.parse_text(text);
    assert_eq!(parsed.counters.value_of("A"), Some(1.0));
    assert_eq!(parsed.counters.value_of("B"), Some(2.0));
}

#[test]
fn test_length_mismatch_strict() {
    let parser = CounterBlockParser::default();
    assert_eq!(parser.pairing(), PairingPolicy::Strict);

    let text = counter_log(&["A", "B", "C"], &["1", "2"]);
    assert!(parser.parse_text(&text).counters.is_empty());
}

#[test]
fn test_length_mismatch_truncate() {
    let parser = CounterBlockParser::default().with_pairing(PairingPolicy::Truncate);

    let text = counter_log(&["A", "B", "C"], &["1", "2"]);
    let parsed = parser.parse_text(&text);
    assert_eq!(parsed.counters.len(), 2);
    assert_eq!(parsed.counters.value_of("B"), Some(2.0));
    assert!(!parsed.counters.contains_key("C"));

    let text = counter_log(&["A"], &["1", "2", "3"]);
    let parsed = parser.parse_text(&text);
    assert_eq!(parsed.counters.len(), 1);
    assert_eq!(parsed.counters.value_of("A"), Some(1.0));
}

#[test]
fn test_custom_markers() {
    let parser = CounterBlockParser::default().with_markers("CTRS", "VALS");
    let parsed = parser.parse_text("CTRS A B\nVALS 4 5\n");
    assert_eq!(parsed.counters.value_of("A"), Some(4.0));
    assert_eq!(parsed.counters.value_of("B"), Some(5.0));

    let parsed = parser.parse_text(&counter_log(&["A"], &["1"]));
    assert!(parsed.counters.is_empty());
}

#[test]
fn test_summary_line() {
    let parser = CounterBlockParser::default();
    let text = "SUMMARY\tN=512\tBS=64\tmode=avx\tseed=1\tseconds=0.0421\tchecksum=3.1e+07\n";
    let summary = parser.parse_text(text).summary.expect("summary present");

    assert_eq!(summary.seconds, Some(0.0421));
    assert_eq!(summary.checksum, Some(3.1e7));
}

#[test]
fn test_summary_line_with_bad_fields() {
    let parser = CounterBlockParser::default();
    let summary = parser
        .parse_text("SUMMARY\tseconds=fast\n")
        .summary
        .expect("summary present");

    assert_eq!(summary.seconds, None);
    assert_eq!(summary.checksum, None);
}

#[test]
fn test_invalid_utf8_is_dropped() {
    let parser = CounterBlockParser::default();
    let mut bytes = b"PAPITO_COUNTERS\tA\tB\n".to_vec();
    bytes.extend_from_slice(b"garbage \xff\xfe line\n");
    bytes.extend_from_slice(b"PAPITO_VALUES\t10\t20\n");

    let parsed = parser.parse_bytes(&bytes);
    assert_eq!(parsed.counters.value_of("A"), Some(10.0));
    assert_eq!(parsed.counters.value_of("B"), Some(20.0));
}

#[test]
fn test_literal_replacement_char_is_kept() {
    let parser = CounterBlockParser::default();
    let mut bytes = "PAPITO_COUNTERS\tX\u{FFFD}Y\n".as_bytes().to_vec();
    bytes.extend_from_slice(b"noise \xc3\n");
    bytes.extend_from_slice(b"PAPITO_VALUES\t7\n");

    let parsed = parser.parse_bytes(&bytes);
    assert_eq!(parsed.counters.value_of("X\u{FFFD}Y"), Some(7.0));
}

#[test]
fn test_missing_file_yields_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let parsed = CounterBlockParser::default().parse_file(&dir.path().join("nope.log"));
    assert!(parsed.counters.is_empty());
    assert_eq!(parsed.summary, None);
}
