//! Compression statistics.
//!
//! A [`CompressionReport`] describes one compression call: what came in,
//! what went out, which body was chosen and how the dictionary is composed.
//! Reports are immutable values and can be shared across threads.

use std::fmt;

use serde::Serialize;

use crate::als::{AlsBody, AlsDocument, BodyKind, Dictionary, PatternKind, Token};
use crate::convert::SourceKind;

/// Dictionary composition by pattern kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DictionaryStats {
    /// Literal scalar entries
    pub literals: usize,
    /// Key set entries
    pub key_sets: usize,
    /// Row segment entries
    pub row_segments: usize,
    /// Subtree entries
    pub subtrees: usize,
}

impl DictionaryStats {
    /// Count the entries of a dictionary by kind.
    pub fn of(dictionary: &Dictionary) -> Self {
        Self {
            literals: dictionary.count_of(PatternKind::Literal),
            key_sets: dictionary.count_of(PatternKind::KeySet),
            row_segments: dictionary.count_of(PatternKind::RowSegment),
            subtrees: dictionary.count_of(PatternKind::Subtree),
        }
    }

    /// Total number of entries.
    pub fn total(&self) -> usize {
        self.literals + self.key_sets + self.row_segments + self.subtrees
    }
}

/// Report on a single compression call.
///
/// # Example
///
/// ```
/// use als_codec::{AlsCompressor, BodyKind, SourceKind};
///
/// let compressor = AlsCompressor::new();
/// let (_, report) = compressor
///     .compress_with_report(SourceKind::Csv, b"id,name\n1,Alice\n2,Alice\n3,Alice")
///     .unwrap();
/// assert_eq!(report.body_kind, BodyKind::Structural);
/// assert_eq!(report.dictionary.literals, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    /// Source format of the input
    pub source: SourceKind,
    /// Body kind of the emitted document
    pub body_kind: BodyKind,
    /// Input size in bytes
    pub input_bytes: usize,
    /// ALS output size in bytes
    pub output_bytes: usize,
    /// Structural ratio that drove the decision, if a structural encoding
    /// was attempted
    pub structural_ratio: Option<f64>,
    /// Dictionary composition of the emitted document
    pub dictionary: DictionaryStats,
    /// Column runs written in a table body
    pub column_runs: usize,
    /// Number of partitions pattern discovery scanned
    pub partitions: usize,
}

impl CompressionReport {
    /// Build a report for an emitted document.
    pub fn new(
        doc: &AlsDocument,
        input_bytes: usize,
        output_bytes: usize,
        structural_ratio: Option<f64>,
        partitions: usize,
    ) -> Self {
        Self {
            source: doc.source,
            body_kind: doc.body_kind(),
            input_bytes,
            output_bytes,
            structural_ratio,
            dictionary: DictionaryStats::of(&doc.dictionary),
            column_runs: count_runs(&doc.body),
            partitions,
        }
    }

    /// Overall ratio of input size to ALS output size.
    pub fn compression_ratio(&self) -> f64 {
        if self.output_bytes == 0 {
            return 1.0;
        }
        self.input_bytes as f64 / self.output_bytes as f64
    }

    /// Check if the fallback compressor was used.
    pub fn used_fallback(&self) -> bool {
        self.body_kind == BodyKind::Fallback
    }
}

fn count_runs(body: &AlsBody) -> usize {
    match body {
        AlsBody::Table { rows, .. } => rows
            .iter()
            .flatten()
            .filter(|token| matches!(token, Token::Run(_)))
            .count(),
        _ => 0,
    }
}

impl fmt::Display for CompressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "source:       {}", self.source)?;
        writeln!(f, "body:         {}", self.body_kind)?;
        writeln!(f, "input bytes:  {}", self.input_bytes)?;
        writeln!(f, "output bytes: {}", self.output_bytes)?;
        writeln!(f, "ratio:        {:.2}", self.compression_ratio())?;
        match self.structural_ratio {
            Some(ratio) if ratio.is_finite() => writeln!(f, "structural:   {:.2}", ratio)?,
            Some(_) => writeln!(f, "structural:   inf")?,
            None => writeln!(f, "structural:   n/a")?,
        }
        writeln!(
            f,
            "dictionary:   {} entries ({} literals, {} key sets, {} row segments, {} subtrees)",
            self.dictionary.total(),
            self.dictionary.literals,
            self.dictionary.key_sets,
            self.dictionary.row_segments,
            self.dictionary.subtrees
        )?;
        writeln!(f, "column runs:  {}", self.column_runs)?;
        write!(f, "partitions:   {}", self.partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::als::{Pattern, RunMarker};
    use crate::convert::Scalar;

    #[test]
    fn test_dictionary_stats() {
        let dictionary: Dictionary = vec![
            Pattern::Literal(Scalar::from("a")),
            Pattern::Literal(Scalar::from("b")),
            Pattern::KeySet(vec!["id".into()]),
        ]
        .into_iter()
        .collect();
        let stats = DictionaryStats::of(&dictionary);
        assert_eq!(stats.literals, 2);
        assert_eq!(stats.key_sets, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_report_ratio() {
        let doc = AlsDocument::fallback(SourceKind::Json, "abc".into());
        let report = CompressionReport::new(&doc, 100, 25, Some(1.1), 1);
        assert_eq!(report.compression_ratio(), 4.0);
        assert!(report.used_fallback());

        let empty = CompressionReport::new(&doc, 0, 0, None, 0);
        assert_eq!(empty.compression_ratio(), 1.0);
    }

    #[test]
    fn test_report_display() {
        let doc = AlsDocument::structural(
            SourceKind::Csv,
            Dictionary::new(),
            AlsBody::Table {
                columns: vec!["a".into()],
                rows: Vec::new(),
            },
        );
        let text = CompressionReport::new(&doc, 10, 8, None, 0).to_string();
        assert!(text.contains("body:         structural"));
        assert!(text.contains("structural:   n/a"));
    }

    #[test]
    fn test_report_counts_column_runs() {
        let doc = AlsDocument::structural(
            SourceKind::Csv,
            Dictionary::new(),
            AlsBody::Table {
                columns: vec!["a".into(), "b".into()],
                rows: vec![
                    vec![
                        Token::Run(RunMarker::Repeat(2)),
                        Token::Scalar(Scalar::from("x")),
                        Token::Scalar(Scalar::from("y")),
                    ],
                    vec![Token::Scalar(Scalar::from("z"))],
                ],
            },
        );
        let report = CompressionReport::new(&doc, 10, 8, None, 1);
        assert_eq!(report.column_runs, 1);
        assert!(report.to_string().contains("column runs:  1"));
    }

    #[test]
    fn test_report_serializes() {
        let doc = AlsDocument::fallback(SourceKind::Csv, "abc".into());
        let report = CompressionReport::new(&doc, 10, 8, Some(1.0), 1);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["body_kind"], "fallback");
        assert_eq!(json["source"], "csv");
    }
}
