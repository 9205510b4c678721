//! JSON parsing and rendering.
//!
//! Parsing goes through `serde_json` straight into a [`Tree`], keeping key
//! order and rejecting duplicate keys. Rendering is compact with no
//! insignificant whitespace.

use crate::convert::Tree;
use crate::error::{AlsError, Result};

/// Parse JSON text into a [`Tree`].
///
/// # Errors
///
/// Returns [`AlsError::MalformedJson`] with the byte offset of the first
/// syntax error.
///
/// # Examples
///
/// ```
/// use als_codec::convert::json::parse_json;
/// use als_codec::AlsError;
///
/// let tree = parse_json(r#"[{"id": 1}]"#).unwrap();
/// assert_eq!(tree.node_count(), 3);
///
/// let err = parse_json("[1, 2,]").unwrap_err();
/// assert!(matches!(err, AlsError::MalformedJson { .. }));
/// ```
pub fn parse_json(input: &str) -> Result<Tree> {
    serde_json::from_str(input).map_err(|e| AlsError::MalformedJson {
        offset: byte_offset(input, e.line(), e.column()),
        message: e.to_string(),
    })
}

/// Render a [`Tree`] as canonical compact JSON.
///
/// Object keys keep their stored order; numbers use `serde_json`'s
/// formatting.
pub fn render_json(tree: &Tree) -> Result<String> {
    serde_json::to_string(tree).map_err(|e| AlsError::Internal(format!("JSON output: {}", e)))
}

/// Convert serde_json's 1-based line and column into a byte offset.
fn byte_offset(input: &str, line: usize, column: usize) -> usize {
    let line_start: usize = input
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(input.len())
}
