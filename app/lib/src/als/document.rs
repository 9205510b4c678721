//! ALS document structure.
//!
//! An [`AlsDocument`] is the in-memory form of ALS text: the header facts
//! (source kind and body kind), the dictionary, and the body.

use std::fmt;

use serde::Serialize;

use crate::convert::{Scalar, SourceKind, Tree};

use super::tokenizer::Token;

/// Whether a document body is dictionary-backed or generic-compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// Dictionary-backed token stream (`!v1` header)
    Structural,
    /// Generic-compressed payload (`!ctx` header)
    Fallback,
}

impl BodyKind {
    /// Header tag following `!`.
    pub fn header_tag(&self) -> &'static str {
        match self {
            BodyKind::Structural => "v1",
            BodyKind::Fallback => "ctx",
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Structural => f.write_str("structural"),
            BodyKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Kind of content a dictionary entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternKind {
    /// A single scalar value
    Literal,
    /// Ordered key list shared by several objects
    KeySet,
    /// Run of adjacent cells within a table row
    RowSegment,
    /// Whole array or object
    Subtree,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::Literal => "literal",
            PatternKind::KeySet => "key set",
            PatternKind::RowSegment => "row segment",
            PatternKind::Subtree => "subtree",
        };
        f.write_str(name)
    }
}

/// Content of one dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Repeated scalar value
    Literal(Scalar),
    /// Repeated ordered key list
    KeySet(Vec<String>),
    /// Repeated run of cells
    RowSegment(Vec<Scalar>),
    /// Repeated array or object
    Subtree(Tree),
}

impl Pattern {
    /// Kind of this pattern.
    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Literal(_) => PatternKind::Literal,
            Pattern::KeySet(_) => PatternKind::KeySet,
            Pattern::RowSegment(_) => PatternKind::RowSegment,
            Pattern::Subtree(_) => PatternKind::Subtree,
        }
    }
}

/// Dictionary of patterns indexed by dense id.
///
/// The id of an entry is its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<Pattern>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its id.
    pub fn push(&mut self, pattern: Pattern) -> usize {
        self.entries.push(pattern);
        self.entries.len() - 1
    }

    /// Look up an entry by id.
    pub fn get(&self, id: usize) -> Option<&Pattern> {
        self.entries.get(id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.entries.iter()
    }

    /// Number of entries of the given kind.
    pub fn count_of(&self, kind: PatternKind) -> usize {
        self.entries.iter().filter(|p| p.kind() == kind).count()
    }
}

impl FromIterator<Pattern> for Dictionary {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Body of an ALS document.
#[derive(Debug, Clone, PartialEq)]
pub enum AlsBody {
    /// Tabular body: schema plus one token line per row
    Table {
        /// Column names
        columns: Vec<String>,
        /// Row token streams
        rows: Vec<Vec<Token>>,
    },
    /// Hierarchical body: a single pre-order token stream
    Tree(Vec<Token>),
    /// Base64 text of the fallback-compressed canonical rendering
    Fallback(String),
}

/// Represents a complete ALS document.
///
/// # Thread Safety
///
/// `AlsDocument` is `Send + Sync`. Documents are built per call and never
/// shared between calls by the codec itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AlsDocument {
    /// ALS format version (currently 1).
    pub version: u8,
    /// Format the document was encoded from
    pub source: SourceKind,
    /// Dictionary (always empty for fallback bodies)
    pub dictionary: Dictionary,
    /// Document body
    pub body: AlsBody,
}

impl AlsDocument {
    /// Current ALS format version.
    pub const CURRENT_VERSION: u8 = 1;

    /// Create a structural document.
    pub fn structural(source: SourceKind, dictionary: Dictionary, body: AlsBody) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            source,
            dictionary,
            body,
        }
    }

    /// Create a fallback document around a base64 payload.
    pub fn fallback(source: SourceKind, payload: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            source,
            dictionary: Dictionary::new(),
            body: AlsBody::Fallback(payload),
        }
    }

    /// Kind of body this document carries.
    pub fn body_kind(&self) -> BodyKind {
        match self.body {
            AlsBody::Fallback(_) => BodyKind::Fallback,
            _ => BodyKind::Structural,
        }
    }

    /// Check if the body is a fallback payload.
    pub fn is_fallback(&self) -> bool {
        self.body_kind() == BodyKind::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_kind() {
        let doc = AlsDocument::fallback(SourceKind::Csv, "abc".into());
        assert_eq!(doc.body_kind(), BodyKind::Fallback);
        assert!(doc.is_fallback());
        assert!(doc.dictionary.is_empty());

        let doc = AlsDocument::structural(
            SourceKind::Json,
            Dictionary::new(),
            AlsBody::Tree(vec![Token::OpenArray, Token::CloseArray]),
        );
        assert_eq!(doc.body_kind(), BodyKind::Structural);
        assert_eq!(doc.version, AlsDocument::CURRENT_VERSION);
    }

    #[test]
    fn test_dictionary_ids_are_positions() {
        let mut dictionary = Dictionary::new();
        assert_eq!(dictionary.push(Pattern::Literal(Scalar::from("a"))), 0);
        assert_eq!(dictionary.push(Pattern::KeySet(vec!["id".into()])), 1);
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get(1).map(Pattern::kind), Some(PatternKind::KeySet));
        assert_eq!(dictionary.count_of(PatternKind::Literal), 1);
        assert!(dictionary.get(2).is_none());
    }

    #[test]
    fn test_header_tags() {
        assert_eq!(BodyKind::Structural.header_tag(), "v1");
        assert_eq!(BodyKind::Fallback.header_tag(), "ctx");
        assert_eq!(BodyKind::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_document_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AlsDocument>();
    }
}
