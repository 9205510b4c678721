//! ALS format types and operations.
//!
//! This module contains the document model, the token-level encoding of
//! scalars, and the serializer and parser that move between documents and
//! ALS text.

mod document;
pub mod escape;
mod parser;
mod run;
pub mod serializer;
mod tokenizer;

pub use document::{AlsBody, AlsDocument, BodyKind, Dictionary, Pattern, PatternKind};
pub use escape::{
    decode_scalar, encode_scalar, escape_als_string, unescape_als_string, EMPTY_TOKEN, NULL_TOKEN,
};
pub use parser::AlsParser;
pub use run::{canonical_integer, ColumnRun, RunMarker};
pub(crate) use parser::parse_entry_text;
pub use serializer::AlsSerializer;
pub use tokenizer::{split_unescaped, tokenize, Spanned, Token, Tokenizer};
