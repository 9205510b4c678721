//! # ALS Codec
//!
//! Adaptive structural codec for CSV and JSON.
//!
//! The codec parses its input into a structural model (a table for CSV, a
//! tree for JSON), discovers repeated substructures, and writes ALS text: a
//! dictionary of those substructures followed by a body that references
//! them. When the structural encoding does not compress well enough, the
//! canonical rendering is compressed with zstd instead and carried as a
//! base64 payload. Either way the ALS text decodes back to a document equal
//! to the input.
//!
//! ## Features
//!
//! - **Pattern discovery**: repeated values, row segments, key sets and subtrees
//! - **Adaptive fallback**: generic compression below a configurable ratio
//! - **Parallel discovery**: scans partitions on several cores with
//!   byte-identical output for every worker count
//! - **Thread-safe**: all public types implement `Send + Sync`
//!
//! ## Quick Start
//!
//! ### Compression
//!
//! ```rust
//! use als_codec::AlsCompressor;
//!
//! let compressor = AlsCompressor::new();
//!
//! let als = compressor.compress_csv("id,name\n1,Alice\n2,Alice\n3,Alice")?;
//! assert_eq!(als, "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n3 _0\n");
//!
//! let json = r#"[{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]"#;
//! let als = compressor.compress_json(json)?;
//! # Ok::<(), als_codec::AlsError>(())
//! ```
//!
//! ### Decompression
//!
//! ```rust
//! use als_codec::AlsParser;
//!
//! let parser = AlsParser::new();
//!
//! let als = "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n";
//! assert_eq!(parser.to_csv(als)?, "id,name\n1,Alice\n2,Alice\n");
//!
//! let als = "!v1 json\n$: id name\n[ {_0 =1 Alice {_0 =2 Bob ]\n";
//! assert_eq!(parser.to_json(als)?, r#"[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]"#);
//! # Ok::<(), als_codec::AlsError>(())
//! ```
//!
//! ### Configuration
//!
//! ```rust
//! use als_codec::{AlsCompressor, CompressorConfig};
//!
//! let config = CompressorConfig::default()
//!     .with_ctx_fallback_threshold(1.5)
//!     .with_min_pattern_length(4)
//!     .with_parallelism(4);
//!
//! let compressor = AlsCompressor::with_config(config)?;
//! # Ok::<(), als_codec::AlsError>(())
//! ```
//!
//! ### Error Handling
//!
//! ```rust
//! use als_codec::{AlsError, AlsParser};
//!
//! let parser = AlsParser::new();
//! match parser.to_csv("!v1 csv\n#id\n_7\n") {
//!     Err(AlsError::MalformedAlsStream { position, message }) => {
//!         assert_eq!(position, 12);
//!         assert!(message.contains("_7"));
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod als;
pub mod compress;
pub mod config;
pub mod convert;
pub mod error;
pub mod pattern;

// C FFI bindings (optional)
#[cfg(feature = "ffi")]
pub mod ffi;

// Re-exports for convenience
pub use als::{
    escape_als_string, unescape_als_string, AlsBody, AlsDocument, AlsParser, AlsSerializer,
    BodyKind, Dictionary, Pattern, PatternKind, Token, Tokenizer, EMPTY_TOKEN, NULL_TOKEN,
};
pub use compress::{AlsCompressor, CompressionReport, DictionaryStats};
pub use config::CompressorConfig;
pub use convert::{Scalar, SourceKind, StructuralModel, Table, Tree};
pub use error::{AlsError, Result};
pub use pattern::{Candidate, Discovery, PatternEngine};
