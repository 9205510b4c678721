//! Property tests: every accepted input decodes back to an equal document.

use als_codec::convert::csv::parse_csv;
use als_codec::{escape_als_string, unescape_als_string, AlsCompressor, AlsParser, CompressorConfig, Tree};
use proptest::prelude::*;

/// Cell text drawn from a small alphabet so values repeat and patterns form,
/// mixed with characters that need ALS escaping.
fn cell() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => prop::sample::select(vec!["red", "green", "blue", "north-east", "Alice", ""]).prop_map(String::from),
        1 => "[a-z0-9 _=|\\\\#$!\\[\\]{}:+*~>-]{0,8}",
        1 => (-3i64..4).prop_map(|n| n.to_string()),
        1 => "\\PC{0,6}",
    ]
}

fn table() -> impl Strategy<Value = String> {
    (1usize..5, 0usize..40).prop_flat_map(|(width, height)| {
        prop::collection::vec(prop::collection::vec(cell(), width), height).prop_map(move |rows| {
            let mut writer = csv::Writer::from_writer(Vec::new());
            let header: Vec<String> = (0..width).map(|i| format!("c{}", i)).collect();
            writer.write_record(&header).unwrap();
            for row in rows {
                writer.write_record(&row).unwrap();
            }
            String::from_utf8(writer.into_inner().unwrap()).unwrap()
        })
    })
}

fn json_leaf() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| serde_json::json!(f)),
        cell().prop_map(serde_json::Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = serde_json::Value> {
    json_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
            prop::collection::btree_map(
                prop::sample::select(vec!["id", "name", "tags", "meta", "x y", "_k"]),
                inner,
                0..5
            )
            .prop_map(|map| {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_escape_round_trip(s in "\\PC{0,32}") {
        prop_assert_eq!(unescape_als_string(&escape_als_string(&s)).unwrap(), s);
    }

    #[test]
    fn prop_control_characters_round_trip(s in "[\\x00-\\x1f\\x7fa-z ]{0,24}") {
        let escaped = escape_als_string(&s);
        prop_assert!(!escaped.bytes().any(|b| b.is_ascii_control()));
        prop_assert_eq!(unescape_als_string(&escaped).unwrap(), s);
    }

    #[test]
    fn prop_csv_round_trip_with_short_runs(csv in table()) {
        let config = CompressorConfig::new().with_min_run_length(2);
        let als = AlsCompressor::with_config(config).unwrap().compress_csv(&csv).unwrap();
        let back = AlsParser::new().to_csv(&als).unwrap();
        prop_assert_eq!(parse_csv(&back).unwrap(), parse_csv(&csv).unwrap());
    }

    #[test]
    fn prop_csv_round_trip(csv in table()) {
        let als = AlsCompressor::new().compress_csv(&csv).unwrap();
        let back = AlsParser::new().to_csv(&als).unwrap();
        prop_assert_eq!(parse_csv(&back).unwrap(), parse_csv(&csv).unwrap());
    }

    #[test]
    fn prop_json_round_trip(value in json_value()) {
        let json = serde_json::to_string(&value).unwrap();
        let als = AlsCompressor::new().compress_json(&json).unwrap();
        let back = AlsParser::new().to_json(&als).unwrap();
        let expected: Tree = serde_json::from_str(&json).unwrap();
        let actual: Tree = serde_json::from_str(&back).unwrap();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_structural_body_at_threshold_one(csv in table()) {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(1.0);
        let als = AlsCompressor::with_config(config).unwrap().compress_csv(&csv).unwrap();
        prop_assert!(als.starts_with("!v1 csv\n"));
    }

    #[test]
    fn prop_worker_count_does_not_change_output(csv in table(), workers in 2usize..6) {
        let sequential = AlsCompressor::with_config(CompressorConfig::new().with_parallelism(1))
            .unwrap()
            .compress_csv(&csv)
            .unwrap();
        let parallel = AlsCompressor::with_config(CompressorConfig::new().with_parallelism(workers))
            .unwrap()
            .compress_csv(&csv)
            .unwrap();
        prop_assert_eq!(sequential, parallel);
    }
}
