//! Compression components for ALS format.
//!
//! This module contains the dictionary index, the structural encoder, the
//! generic fallback compressor, and the adaptive compressor that chooses
//! between them.

mod compressor;
mod dictionary;
mod encoder;
pub mod fallback;
mod stats;

pub use compressor::AlsCompressor;
pub use dictionary::{reference_length, DictionaryEntry, DictionaryIndex};
pub use encoder::{encode_literal, encode_with_entries, Encoding, StructuralEncoder};
pub use stats::{CompressionReport, DictionaryStats};
