//! ALS format serializer.
//!
//! Turns an [`AlsDocument`] into ALS text. Every line ends with `\n`:
//!
//! ```text
//! !v1 csv
//! $Alice|+ NY USA
//! #id #name #city #country
//! 1 _0 _1
//! 2 Bob _1
//! ```
//!
//! The text builders at the bottom of this module are shared with pattern
//! discovery and the encoder, so dictionary lookups and the serialized
//! dictionary always agree byte for byte.

use crate::convert::Tree;

use super::document::{AlsBody, AlsDocument, Dictionary, Pattern};
use super::escape::{encode_bool, encode_number, encode_scalar, encode_string, NULL_TOKEN};
use super::tokenizer::Token;

/// Serializer for ALS documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlsSerializer;

impl AlsSerializer {
    /// Create a new serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize a document to ALS text.
    ///
    /// # Examples
    ///
    /// ```
    /// use als_codec::als::{AlsBody, AlsDocument, AlsSerializer, Dictionary};
    /// use als_codec::SourceKind;
    ///
    /// let doc = AlsDocument::structural(
    ///     SourceKind::Csv,
    ///     Dictionary::new(),
    ///     AlsBody::Table { columns: vec!["id".into()], rows: Vec::new() },
    /// );
    /// assert_eq!(AlsSerializer::new().serialize(&doc), "!v1 csv\n#id\n");
    /// ```
    pub fn serialize(&self, doc: &AlsDocument) -> String {
        let mut out = String::new();
        out.push('!');
        out.push_str(doc.body_kind().header_tag());
        out.push(' ');
        out.push_str(doc.source.as_str());
        out.push('\n');

        let schema = match &doc.body {
            AlsBody::Table { columns, .. } => Some(columns.as_slice()),
            _ => None,
        };
        self.write_payload(&mut out, &doc.dictionary, &doc.body, schema);
        out
    }

    /// Byte size of the dictionary line plus body lines.
    ///
    /// Header and schema lines are excluded; they are framing shared by every
    /// encoding of the same model.
    pub fn payload_size(&self, dictionary: &Dictionary, body: &AlsBody) -> usize {
        let mut out = String::new();
        self.write_payload(&mut out, dictionary, body, None);
        out.len()
    }

    fn write_payload(
        &self,
        out: &mut String,
        dictionary: &Dictionary,
        body: &AlsBody,
        schema: Option<&[String]>,
    ) {
        if !dictionary.is_empty() {
            out.push('$');
            for (i, pattern) in dictionary.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                out.push_str(&pattern_text(pattern));
            }
            out.push('\n');
        }

        if let Some(columns) = schema {
            for (i, name) in columns.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push('#');
                out.push_str(&encode_string(name));
            }
            out.push('\n');
        }

        match body {
            AlsBody::Table { rows, .. } => {
                for row in rows {
                    write_tokens(out, row);
                    out.push('\n');
                }
            }
            AlsBody::Tree(tokens) => {
                write_tokens(out, tokens);
                out.push('\n');
            }
            AlsBody::Fallback(payload) => {
                out.push_str(payload);
                out.push('\n');
            }
        }
    }
}

fn write_tokens(out: &mut String, tokens: &[Token]) {
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_token(out, token);
    }
}

/// Append the text of one token.
pub fn write_token(out: &mut String, token: &Token) {
    match token {
        Token::Scalar(value) => out.push_str(&encode_scalar(value)),
        Token::Ref(id) => {
            out.push('_');
            out.push_str(&id.to_string());
        }
        Token::ShapeRef(id) => {
            out.push_str("{_");
            out.push_str(&id.to_string());
        }
        Token::OpenArray => out.push('['),
        Token::CloseArray => out.push(']'),
        Token::OpenObject => out.push('{'),
        Token::CloseObject => out.push('}'),
        Token::KeySetMarker => out.push(':'),
        Token::SegmentMarker => out.push('+'),
        Token::Run(marker) => out.push_str(&marker.to_string()),
    }
}

/// Dictionary entry text of a pattern.
pub fn pattern_text(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Literal(value) => encode_scalar(value),
        Pattern::KeySet(keys) => keyset_text(keys.iter().map(|k| encode_string(k))),
        Pattern::RowSegment(cells) => {
            let tokens: Vec<String> = cells.iter().map(encode_scalar).collect();
            segment_text(&tokens)
        }
        Pattern::Subtree(tree) => tree_text(tree),
    }
}

/// Entry text of a key set given already-encoded key tokens.
pub fn keyset_text<I, S>(keys: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from(":");
    for key in keys {
        out.push(' ');
        out.push_str(key.as_ref());
    }
    out
}

/// Entry text of a row segment given already-encoded cell tokens.
pub fn segment_text<S: AsRef<str>>(cells: &[S]) -> String {
    let mut out = String::from("+");
    for cell in cells {
        out.push(' ');
        out.push_str(cell.as_ref());
    }
    out
}

/// Token of a leaf node, or `None` for arrays and objects.
pub fn leaf_token(tree: &Tree) -> Option<String> {
    match tree {
        Tree::Null => Some(NULL_TOKEN.to_string()),
        Tree::Bool(b) => Some(encode_bool(*b).to_string()),
        Tree::Number(n) => Some(encode_number(n)),
        Tree::String(s) => Some(encode_string(s)),
        Tree::Array(_) | Tree::Object(_) => None,
    }
}

/// Literal token text of a whole subtree, with no dictionary references.
pub fn tree_text(tree: &Tree) -> String {
    let mut out = String::new();
    write_tree_text(&mut out, tree);
    out
}

fn write_tree_text(out: &mut String, tree: &Tree) {
    match tree {
        Tree::Array(items) => {
            out.push('[');
            for item in items {
                out.push(' ');
                write_tree_text(out, item);
            }
            out.push_str(" ]");
        }
        Tree::Object(entries) => {
            out.push('{');
            for (key, value) in entries {
                out.push(' ');
                out.push_str(&encode_string(key));
                out.push(' ');
                write_tree_text(out, value);
            }
            out.push_str(" }");
        }
        leaf => {
            if let Some(token) = leaf_token(leaf) {
                out.push_str(&token);
            }
        }
    }
}
