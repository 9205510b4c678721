//! Dictionary index for ALS encoding.
//!
//! This module provides the [`DictionaryIndex`], which maps the entry text of
//! every selected pattern to its id so the encoder can replace occurrences
//! with references, and the accounting used to prune entries that do not pay
//! for themselves.

use std::collections::HashMap;

use crate::als::{parse_entry_text, split_unescaped, Dictionary, PatternKind};
use crate::error::{AlsError, Result};
use crate::pattern::Candidate;

/// A selected pattern awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// Kind of pattern
    pub kind: PatternKind,
    /// Dictionary entry text
    pub text: String,
    /// Body bytes one reference replaces
    pub span: usize,
}

impl DictionaryEntry {
    /// Net bytes saved by this entry when referenced `uses` times as id `id`.
    ///
    /// Every use replaces `span` bytes with a reference; the entry text and
    /// its separator are paid once.
    pub fn bytes_saved(&self, uses: usize, id: usize) -> i64 {
        let per_use = self.span as i64 - reference_length(id) as i64;
        per_use * uses as i64 - (self.text.len() as i64 + 1)
    }
}

impl From<Candidate> for DictionaryEntry {
    fn from(candidate: Candidate) -> Self {
        Self {
            kind: candidate.kind,
            text: candidate.text,
            span: candidate.span,
        }
    }
}

/// Length of the `_N` reference to entry `id`.
pub fn reference_length(id: usize) -> usize {
    let mut digits = 1;
    let mut rest = id / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    1 + digits
}

/// Lookup tables from entry text to id, one per pattern kind.
#[derive(Debug, Clone, Default)]
pub struct DictionaryIndex {
    literals: HashMap<String, usize>,
    segments: HashMap<String, usize>,
    shapes: HashMap<String, usize>,
    subtrees: HashMap<String, usize>,
    longest_segment: usize,
}

impl DictionaryIndex {
    /// Index with no entries; encoding against it yields literal tokens only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index `entries`, assigning ids by position.
    pub fn build(entries: &[DictionaryEntry]) -> Self {
        let mut index = Self::default();
        for (id, entry) in entries.iter().enumerate() {
            let text = entry.text.clone();
            match entry.kind {
                PatternKind::Literal => {
                    index.literals.insert(text, id);
                }
                PatternKind::KeySet => {
                    index.shapes.insert(text, id);
                }
                PatternKind::RowSegment => {
                    // `+` marker followed by one token per cell.
                    let cells = split_unescaped(&entry.text, b' ').len().saturating_sub(1);
                    index.longest_segment = index.longest_segment.max(cells);
                    index.segments.insert(text, id);
                }
                PatternKind::Subtree => {
                    index.subtrees.insert(text, id);
                }
            }
        }
        index
    }

    /// Id of a literal token.
    pub fn literal(&self, token: &str) -> Option<usize> {
        self.literals.get(token).copied()
    }

    /// Id of a row segment entry text.
    pub fn segment(&self, text: &str) -> Option<usize> {
        self.segments.get(text).copied()
    }

    /// Id of a key set entry text.
    pub fn shape(&self, text: &str) -> Option<usize> {
        self.shapes.get(text).copied()
    }

    /// Id of a subtree entry text.
    pub fn subtree(&self, text: &str) -> Option<usize> {
        self.subtrees.get(text).copied()
    }

    /// Cell count of the longest indexed row segment.
    pub fn longest_segment(&self) -> usize {
        self.longest_segment
    }

    /// Check if any key set is indexed.
    pub fn has_shapes(&self) -> bool {
        !self.shapes.is_empty()
    }

    /// Check if any subtree is indexed.
    pub fn has_subtrees(&self) -> bool {
        !self.subtrees.is_empty()
    }
}

/// Build the dictionary for `entries`, in id order.
pub fn build_dictionary(entries: &[DictionaryEntry]) -> Result<Dictionary> {
    entries
        .iter()
        .map(|entry| {
            parse_entry_text(&entry.text).map_err(|e| {
                AlsError::Internal(format!("selected pattern '{}' does not parse: {}", entry.text, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::als::Pattern;
    use crate::convert::Scalar;

    fn entry(kind: PatternKind, text: &str, span: usize) -> DictionaryEntry {
        DictionaryEntry {
            kind,
            text: text.into(),
            span,
        }
    }

    #[test]
    fn test_reference_length() {
        assert_eq!(reference_length(0), 2);
        assert_eq!(reference_length(9), 2);
        assert_eq!(reference_length(10), 3);
        assert_eq!(reference_length(999), 4);
        assert_eq!(reference_length(1000), 5);
    }

    #[test]
    fn test_bytes_saved() {
        let alice = entry(PatternKind::Literal, "Alice", 5);
        assert_eq!(alice.bytes_saved(3, 0), 3);
        assert_eq!(alice.bytes_saved(2, 0), 0);
        assert_eq!(alice.bytes_saved(3, 10), 0);
    }

    #[test]
    fn test_index_by_kind() {
        let entries = vec![
            entry(PatternKind::Literal, "Alice", 5),
            entry(PatternKind::RowSegment, "+ NY USA", 6),
            entry(PatternKind::KeySet, ": id name", 10),
            entry(PatternKind::Subtree, "[ =1 ]", 6),
        ];
        let index = DictionaryIndex::build(&entries);
        assert_eq!(index.literal("Alice"), Some(0));
        assert_eq!(index.segment("+ NY USA"), Some(1));
        assert_eq!(index.shape(": id name"), Some(2));
        assert_eq!(index.subtree("[ =1 ]"), Some(3));
        assert_eq!(index.literal("+ NY USA"), None);
        assert_eq!(index.longest_segment(), 2);
    }

    #[test]
    fn test_segment_cells_ignore_escaped_spaces() {
        let index = DictionaryIndex::build(&[entry(
            PatternKind::RowSegment,
            "+ New\\ York United\\ States",
            24,
        )]);
        assert_eq!(index.longest_segment(), 2);
    }

    #[test]
    fn test_build_dictionary() {
        let dictionary = build_dictionary(&[
            entry(PatternKind::Literal, "Alice", 5),
            entry(PatternKind::KeySet, ": id name", 10),
        ])
        .unwrap();
        assert_eq!(dictionary.get(0), Some(&Pattern::Literal(Scalar::from("Alice"))));
        assert_eq!(
            dictionary.get(1),
            Some(&Pattern::KeySet(vec!["id".into(), "name".into()]))
        );
    }
}
