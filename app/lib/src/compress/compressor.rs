//! Main ALS compressor implementation.
//!
//! This module provides the `AlsCompressor` struct which turns CSV or JSON
//! text into ALS text. Every call parses the input into a structural model,
//! discovers repeated patterns, encodes the model against them and keeps the
//! structural body only when it compresses well enough; otherwise the
//! canonical rendering goes through the generic fallback compressor.

use crate::als::{AlsDocument, AlsSerializer, Dictionary};
use crate::config::CompressorConfig;
use crate::convert::{SourceKind, StructuralModel};
use crate::error::{AlsError, Result};
use crate::pattern::PatternEngine;

use super::dictionary::DictionaryEntry;
use super::encoder::{encode_literal, encode_with_entries, Encoding};
use super::fallback;
use super::stats::CompressionReport;

/// Main entry point for ALS compression.
///
/// The compressor holds a validated configuration and no mutable state.
///
/// # Thread Safety
///
/// `AlsCompressor` is `Send + Sync`, meaning it can be safely shared across
/// threads. Each compression operation is independent and doesn't modify
/// shared state, making it safe to use the same compressor instance from
/// multiple threads concurrently.
///
/// ```
/// use als_codec::AlsCompressor;
/// use std::sync::Arc;
/// use std::thread;
///
/// let compressor = Arc::new(AlsCompressor::new());
///
/// let handles: Vec<_> = (0..4).map(|i| {
///     let compressor = Arc::clone(&compressor);
///     thread::spawn(move || {
///         let csv = format!("id,value\n{},{}", i, i * 10);
///         compressor.compress_csv(&csv)
///     })
/// }).collect();
///
/// for handle in handles {
///     handle.join().unwrap().unwrap();
/// }
/// ```
///
/// # Adaptive Fallback
///
/// The structural ratio is `baseline / structural_payload`, where the
/// baseline is the larger of the canonical rendering and the reference-free
/// token stream. A ratio below [`CompressorConfig::ctx_fallback_threshold`]
/// selects the fallback body.
///
/// The two sides are not framed alike. The canonical rendering of a table
/// includes its CSV header row, while the payload leaves out the `!v1`
/// header and the `#` schema line. On small tables the ratio can therefore
/// exceed 1 while the ALS text is longer than the input: three rows of
/// `id,name` with a repeated `Alice` report a ratio of 32/22 (about 1.45)
/// even though 31 input bytes become 40 bytes of ALS. Use
/// [`CompressionReport::compression_ratio`] for the end-to-end size change.
#[derive(Debug, Clone)]
pub struct AlsCompressor {
    /// Compression configuration.
    config: CompressorConfig,
    /// Pattern discovery engine.
    pattern_engine: PatternEngine,
}

/// Outcome of encoding one model.
struct Outcome {
    doc: AlsDocument,
    structural_ratio: Option<f64>,
    partitions: usize,
}

impl AlsCompressor {
    /// Create a new compressor with default configuration.
    pub fn new() -> Self {
        Self {
            config: CompressorConfig::default(),
            pattern_engine: PatternEngine::new(),
        }
    }

    /// Create a new compressor with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::InvalidConfig`] if the configuration is invalid.
    pub fn with_config(config: CompressorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pattern_engine: PatternEngine::with_config(config.clone()),
            config,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Compress raw input bytes of the given kind to ALS text.
    ///
    /// # Errors
    ///
    /// - [`AlsError::InvalidUtf8`] if the input is not UTF-8
    /// - [`AlsError::MalformedCsv`] or [`AlsError::MalformedJson`] if it does
    ///   not parse as `kind`
    /// - [`AlsError::EncodingFailure`] if the fallback compressor fails
    pub fn compress(&self, kind: SourceKind, input: &[u8]) -> Result<String> {
        self.compress_with_report(kind, input).map(|(text, _)| text)
    }

    /// Compress CSV text to ALS format.
    ///
    /// # Examples
    ///
    /// ```
    /// use als_codec::AlsCompressor;
    ///
    /// let compressor = AlsCompressor::new();
    /// let als = compressor.compress_csv("id,name\n1,Alice\n2,Alice\n3,Alice").unwrap();
    /// assert_eq!(als, "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n3 _0\n");
    /// ```
    pub fn compress_csv(&self, input: &str) -> Result<String> {
        self.compress(SourceKind::Csv, input.as_bytes())
    }

    /// Compress JSON text to ALS format.
    ///
    /// # Examples
    ///
    /// ```
    /// use als_codec::AlsCompressor;
    ///
    /// let compressor = AlsCompressor::new();
    /// let json = r#"[{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]"#;
    /// let als = compressor.compress_json(json).unwrap();
    /// assert!(als.ends_with('\n'));
    /// ```
    pub fn compress_json(&self, input: &str) -> Result<String> {
        self.compress(SourceKind::Json, input.as_bytes())
    }

    /// Compress input and report on the decision.
    pub fn compress_with_report(
        &self,
        kind: SourceKind,
        input: &[u8],
    ) -> Result<(String, CompressionReport)> {
        let text = std::str::from_utf8(input)?;
        let model = StructuralModel::parse(kind, text)?;
        let outcome = self.encode_model(&model)?;
        let output = AlsSerializer::new().serialize(&outcome.doc);
        let report = CompressionReport::new(
            &outcome.doc,
            input.len(),
            output.len(),
            outcome.structural_ratio,
            outcome.partitions,
        );
        log::debug!(
            "compressed {} bytes of {} into {} bytes ({})",
            report.input_bytes,
            kind,
            report.output_bytes,
            report.body_kind
        );
        Ok((output, report))
    }

    /// Compress an already-parsed model to an ALS document.
    pub fn compress_model(&self, model: &StructuralModel) -> Result<AlsDocument> {
        self.encode_model(model).map(|outcome| outcome.doc)
    }

    fn encode_model(&self, model: &StructuralModel) -> Result<Outcome> {
        let serializer = AlsSerializer::new();
        let canonical = model.render()?;
        let discovery = self.pattern_engine.discover(model)?;

        let literal = Encoding {
            dictionary: Dictionary::new(),
            body: encode_literal(model),
        };
        let literal_size = serializer.payload_size(&literal.dictionary, &literal.body);
        let baseline = canonical.len().max(literal_size);

        let entries = discovery
            .candidates
            .into_iter()
            .map(DictionaryEntry::from)
            .collect();
        let attempt = encode_with_entries(
            model,
            entries,
            self.config.max_dictionary_entries,
            self.config.min_run_length,
        )
        .map(|encoding| {
            let size = serializer.payload_size(&encoding.dictionary, &encoding.body);
            // Ties go to the reference-free body.
            if size < literal_size {
                encoding
            } else {
                literal
            }
        });

        let structural_ratio = match attempt {
            Ok(encoding) => {
                let size = serializer.payload_size(&encoding.dictionary, &encoding.body);
                let ratio = if size == 0 {
                    f64::INFINITY
                } else {
                    baseline as f64 / size as f64
                };
                if ratio >= self.config.ctx_fallback_threshold {
                    log::debug!(
                        "structural body: ratio {:.3}, {} dictionary entries",
                        ratio,
                        encoding.dictionary.len()
                    );
                    return Ok(Outcome {
                        doc: AlsDocument::structural(model.kind(), encoding.dictionary, encoding.body),
                        structural_ratio: Some(ratio),
                        partitions: discovery.partitions,
                    });
                }
                log::debug!(
                    "structural ratio {:.3} below threshold {}, using fallback",
                    ratio,
                    self.config.ctx_fallback_threshold
                );
                Some(ratio)
            }
            Err(AlsError::EncodingFailure(reason)) => {
                log::warn!("structural encoding abandoned: {}", reason);
                None
            }
            Err(e) => return Err(e),
        };

        let payload = fallback::encode_payload(&canonical, self.config.fallback_level)?;
        Ok(Outcome {
            doc: AlsDocument::fallback(model.kind(), payload),
            structural_ratio,
            partitions: discovery.partitions,
        })
    }
}

impl Default for AlsCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::als::{AlsBody, AlsParser, BodyKind};

    fn csv_with_patterns() -> String {
        let mut input = String::from("id,status,region\n");
        for i in 0..50 {
            let status = if i % 2 == 0 { "active" } else { "inactive" };
            input.push_str(&format!("{},{},north-east\n", i, status));
        }
        input
    }

    #[test]
    fn test_compressor_new() {
        let compressor = AlsCompressor::new();
        assert_eq!(compressor.config().ctx_fallback_threshold, 1.2);
    }

    #[test]
    fn test_compressor_with_config() {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(2.0);
        let compressor = AlsCompressor::with_config(config).unwrap();
        assert_eq!(compressor.config().ctx_fallback_threshold, 2.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CompressorConfig::new().with_min_pattern_length(0);
        assert!(matches!(
            AlsCompressor::with_config(config),
            Err(AlsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_repeated_name_stays_structural() {
        let compressor = AlsCompressor::new();
        let (als, report) = compressor
            .compress_with_report(SourceKind::Csv, b"id,name\n1,Alice\n2,Alice\n3,Alice")
            .unwrap();
        assert_eq!(als, "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n3 _0\n");
        assert_eq!(report.body_kind, BodyKind::Structural);
        let ratio = report.structural_ratio.unwrap();
        assert!((ratio - 32.0 / 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_leaves_schema_out_of_payload() {
        let (als, report) = AlsCompressor::new()
            .compress_with_report(SourceKind::Csv, b"id,name\n1,Alice\n2,Alice\n3,Alice")
            .unwrap();
        // The header row counts toward the baseline but the schema line is
        // not part of the payload, so a small table can report a ratio
        // above 1 while its ALS text is longer than the input.
        assert!(report.structural_ratio.unwrap() > 1.4);
        assert_eq!(report.input_bytes, 31);
        assert_eq!(report.output_bytes, als.len());
        assert!(report.output_bytes > report.input_bytes);
    }

    #[test]
    fn test_short_columns_stay_out_of_runs() {
        let config = CompressorConfig::new().with_min_run_length(3);
        let als = AlsCompressor::with_config(config)
            .unwrap()
            .compress_csv("id,name\n1,Alice\n2,Alice\n3,Alice")
            .unwrap();
        assert_eq!(als, "!v1 csv\n#id #name\n>3 1 *3 Alice\n\n\n");

        let config = CompressorConfig::new().with_min_run_length(0);
        let als = AlsCompressor::with_config(config)
            .unwrap()
            .compress_csv("id,name\n1,Alice\n2,Alice\n3,Alice\n4,Alice\n5,Alice")
            .unwrap();
        assert!(!als.contains('*'));
    }

    #[test]
    fn test_compress_with_patterns() {
        let input = csv_with_patterns();
        let compressor = AlsCompressor::new();
        let als = compressor.compress_csv(&input).unwrap();
        assert!(als.starts_with("!v1 csv\n#id #status #region\n>50 0 ~50 active inactive *50 north-east\n"));
        assert!(als.len() < input.len());
        assert_eq!(AlsParser::new().to_csv(&als).unwrap(), input);
    }

    #[test]
    fn test_empty_array_falls_back() {
        let compressor = AlsCompressor::new();
        let (als, report) = compressor.compress_with_report(SourceKind::Json, b"[]").unwrap();
        assert!(als.starts_with("!ctx json\n"));
        assert!(report.used_fallback());
        assert_eq!(report.structural_ratio, Some(1.0));
        assert_eq!(AlsParser::new().to_json(&als).unwrap(), "[]");
    }

    #[test]
    fn test_threshold_of_one_keeps_structural() {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(1.0);
        let compressor = AlsCompressor::with_config(config).unwrap();
        let als = compressor.compress_json("[]").unwrap();
        assert_eq!(als, "!v1 json\n[ ]\n");
    }

    #[test]
    fn test_high_threshold_forces_fallback() {
        let config = CompressorConfig::new().with_ctx_fallback_threshold(1000.0);
        let compressor = AlsCompressor::with_config(config).unwrap();
        let input = csv_with_patterns();
        let als = compressor.compress_csv(&input).unwrap();
        assert!(als.starts_with("!ctx csv\n"));
        assert_eq!(AlsParser::new().to_csv(&als).unwrap(), input);
    }

    #[test]
    fn test_header_only_table_is_structural() {
        let als = AlsCompressor::new().compress_csv("id,name").unwrap();
        assert_eq!(als, "!v1 csv\n#id #name\n");
    }

    #[test]
    fn test_dictionary_limit_triggers_fallback() {
        let config = CompressorConfig::new().with_max_dictionary_entries(1);
        let compressor = AlsCompressor::with_config(config).unwrap();
        let mut input = String::from("a,b\n");
        for i in 0..20 {
            input.push_str(&format!("{},{}\n", ["red", "green", "blue"][i % 3], i));
        }
        let (als, report) = compressor
            .compress_with_report(SourceKind::Csv, input.as_bytes())
            .unwrap();
        assert!(report.used_fallback());
        assert_eq!(report.structural_ratio, None);
        assert_eq!(AlsParser::new().to_csv(&als).unwrap(), input);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = AlsCompressor::new()
            .compress(SourceKind::Csv, b"id\n\xff\xfe")
            .unwrap_err();
        assert!(matches!(err, AlsError::InvalidUtf8 { valid_up_to: 3 }));
    }

    #[test]
    fn test_malformed_inputs() {
        let compressor = AlsCompressor::new();
        assert!(matches!(
            compressor.compress_csv("a,b\n1,2,3"),
            Err(AlsError::MalformedCsv { .. })
        ));
        assert!(matches!(
            compressor.compress_json("{\"a\": }"),
            Err(AlsError::MalformedJson { .. })
        ));
    }

    #[test]
    fn test_compress_model() {
        let model = StructuralModel::parse(SourceKind::Csv, "id,name\n1,Alice\n2,Alice\n3,Alice").unwrap();
        let doc = AlsCompressor::new().compress_model(&model).unwrap();
        assert_eq!(doc.dictionary.len(), 1);
        assert!(matches!(doc.body, AlsBody::Table { .. }));
    }

    #[test]
    fn test_output_is_identical_across_worker_counts() {
        let mut input = String::from("id,team,office,level\n");
        for i in 0..2000 {
            input.push_str(&format!("{},team-{},office-{},L{}\n", i, i % 11, i % 5, i % 4));
        }
        let reference = AlsCompressor::with_config(CompressorConfig::new().with_parallelism(1))
            .unwrap()
            .compress_csv(&input)
            .unwrap();
        for workers in [0, 2, 4, 7] {
            let compressor =
                AlsCompressor::with_config(CompressorConfig::new().with_parallelism(workers)).unwrap();
            assert_eq!(compressor.compress_csv(&input).unwrap(), reference);
        }
    }

    #[test]
    fn test_compressor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AlsCompressor>();
    }
}
