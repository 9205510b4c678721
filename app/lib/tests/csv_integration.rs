//! Integration tests for the CSV compression pipeline.

use als_codec::convert::csv::parse_csv;
use als_codec::{AlsCompressor, AlsError, AlsParser, BodyKind, CompressorConfig, SourceKind};

fn round_trip(csv: &str) -> String {
    let als = AlsCompressor::new().compress_csv(csv).unwrap();
    AlsParser::new().to_csv(&als).unwrap()
}

#[test]
fn test_csv_compression_basic() {
    let compressor = AlsCompressor::new();
    let als = compressor.compress_csv("id,name\n1,Alice\n2,Alice\n3,Alice").unwrap();
    assert_eq!(als, "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n3 _0\n");
}

#[test]
fn test_csv_round_trip_basic() {
    let original = "id,name\n1,Alice\n2,Bob\n3,Charlie\n";
    assert_eq!(round_trip(original), original);
}

#[test]
fn test_csv_round_trip_normalizes_trailing_newline() {
    let original = "id,name\n1,Alice\n2,Bob";
    let result = round_trip(original);
    assert_eq!(parse_csv(&result).unwrap(), parse_csv(original).unwrap());
}

#[test]
fn test_csv_row_segments() {
    let places = [
        "Springfield,Illinois,United States",
        "Portland,Oregon,United States",
        "Toronto,Ontario,Canada",
    ];
    let mut csv = String::from("id,city,state,country\n");
    for i in 0..30 {
        csv.push_str(&format!("{},{}\n", i, places[i % 3]));
    }
    let (als, report) = AlsCompressor::new()
        .compress_with_report(SourceKind::Csv, csv.as_bytes())
        .unwrap();
    assert_eq!(report.dictionary.row_segments, 3);
    assert_eq!(report.dictionary.total(), 3);
    assert!(als.contains("\n>30 0 _"));
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), csv);
}

#[test]
fn test_csv_column_runs() {
    let csv = "id,status\n1,open\n2,open\n3,open\n4,open\n5,open\n6,open\n";
    let (als, report) = AlsCompressor::new()
        .compress_with_report(SourceKind::Csv, csv.as_bytes())
        .unwrap();
    assert_eq!(als, "!v1 csv\n#id #status\n>6 1 *6 open\n\n\n\n\n\n");
    assert_eq!(report.column_runs, 2);
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), csv);
}

#[test]
fn test_csv_runs_of_three_cells() {
    let config = CompressorConfig::new().with_min_run_length(3);
    let compressor = AlsCompressor::with_config(config).unwrap();
    let csv = "id,flag,step\n1,yes,100\n2,no,200\n3,yes,300\n4,x,7\n";
    let als = compressor.compress_csv(csv).unwrap();
    assert_eq!(als, "!v1 csv\n#id #flag #step\n>4 1 ~3 yes no >3:100 100\n\n\nx 7\n");
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), csv);
}

#[test]
fn test_csv_runs_stop_at_changes() {
    let mut csv = String::from("day,state\n");
    for i in 0..40 {
        let state = if (i / 10) % 2 == 0 { "up" } else { "down" };
        csv.push_str(&format!("{},{}\n", 100 - i * 5, state));
    }
    let (als, report) = AlsCompressor::new()
        .compress_with_report(SourceKind::Csv, csv.as_bytes())
        .unwrap();
    assert_eq!(report.column_runs, 5);
    assert!(als.contains(">40:-5 100 *10 up\n"));
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), csv);
}

#[test]
fn test_csv_quoting_survives() {
    let original = "id,note\n1,\"hello, world\"\n2,\"say \"\"hi\"\"\"\n3,\"line\nbreak\"\n";
    assert_eq!(round_trip(original), original);
}

#[test]
fn test_csv_special_tokens_survive() {
    // Cells that look like ALS syntax must come back as plain strings.
    let mut csv = String::from("a,b,c\n");
    for _ in 0..5 {
        csv.push_str("_0,=true,\\e\n");
        csv.push_str("$x|y,#z,[ ]\n");
        csv.push_str(",  ,!v1\n");
    }
    assert_eq!(round_trip(&csv), csv);
}

#[test]
fn test_csv_unicode() {
    let mut csv = String::from("name,city\n");
    for i in 0..10 {
        csv.push_str(&format!("用户{},東京\n", i));
        csv.push_str(&format!("Zoë {},Zürich 🇨🇭\n", i));
    }
    let als = AlsCompressor::new().compress_csv(&csv).unwrap();
    assert!(als.starts_with("!v1 csv\n"));
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), csv);
}

#[test]
fn test_csv_header_only() {
    let als = AlsCompressor::new().compress_csv("id,name\n").unwrap();
    assert_eq!(als, "!v1 csv\n#id #name\n");
    assert_eq!(AlsParser::new().to_csv(&als).unwrap(), "id,name\n");
}

#[test]
fn test_csv_empty_input_is_malformed() {
    let err = AlsCompressor::new().compress_csv("").unwrap_err();
    assert!(matches!(err, AlsError::MalformedCsv { line: 1, .. }));
}

#[test]
fn test_csv_ragged_row_reports_line() {
    let err = AlsCompressor::new()
        .compress_csv("a,b\n1,2\n3,4\n5\n")
        .unwrap_err();
    assert!(matches!(err, AlsError::MalformedCsv { line: 4, .. }));
}

#[test]
fn test_csv_duplicate_header() {
    let err = AlsCompressor::new().compress_csv("a,a\n1,2").unwrap_err();
    assert!(matches!(err, AlsError::MalformedCsv { .. }));
}

#[test]
fn test_csv_decode_as_json_is_kind_mismatch() {
    let als = AlsCompressor::new().compress_csv("id\n1\n").unwrap();
    let err = AlsParser::new().to_json(&als).unwrap_err();
    assert!(matches!(
        err,
        AlsError::KindMismatch {
            requested: SourceKind::Json,
            found: SourceKind::Csv
        }
    ));
}

#[test]
fn test_csv_report() {
    let mut csv = String::from("id,status\n");
    for i in 0..100 {
        csv.push_str(&format!("{},{}\n", i, if i % 3 == 0 { "pending" } else { "complete" }));
    }
    let (als, report) = AlsCompressor::new()
        .compress_with_report(SourceKind::Csv, csv.as_bytes())
        .unwrap();
    assert_eq!(report.body_kind, BodyKind::Structural);
    assert_eq!(report.input_bytes, csv.len());
    assert_eq!(report.output_bytes, als.len());
    assert_eq!(report.dictionary.literals, 2);
    assert!(report.compression_ratio() > 1.0);
}
