//! Scalar token encoding for the ALS format.
//!
//! Every scalar in an ALS body or dictionary is written as one
//! space-free token. Separators are escaped wherever they occur; sigil
//! characters are escaped only in leading position, where they would
//! otherwise be read as structure.
//!
//! # Reserved Tokens
//!
//! - `\0` - null
//! - `\e` - empty string
//! - `=true`, `=false` - booleans
//! - `=<number>` - a number in JSON syntax
//!
//! # Escape Sequences
//!
//! | Character | Escape | Where |
//! |-----------|--------|-------|
//! | `\` | `\\` | anywhere |
//! | space | `\ ` | anywhere |
//! | `|` | `\|` | anywhere |
//! | newline | `\n` | anywhere |
//! | tab | `\t` | anywhere |
//! | carriage return | `\r` | anywhere |
//! | other C0 controls and DEL | `\xHH` | anywhere |
//! | `_ = [ ] { } : + $ # ! * ~ >` | `\` + char | first character only |
//!
//! ALS text therefore never holds a raw control character other than the
//! line feeds that end lines, and never a NUL byte.

use serde_json::Number;

use crate::convert::Scalar;
use crate::error::{AlsError, Result};

/// Reserved token representing a null value.
///
/// # Example
///
/// ```
/// use als_codec::als::escape::NULL_TOKEN;
/// assert_eq!(NULL_TOKEN, "\\0");
/// ```
pub const NULL_TOKEN: &str = "\\0";

/// Reserved token representing an empty string.
///
/// # Example
///
/// ```
/// use als_codec::als::escape::EMPTY_TOKEN;
/// assert_eq!(EMPTY_TOKEN, "\\e");
/// ```
pub const EMPTY_TOKEN: &str = "\\e";

/// Prefix of typed literals (booleans and numbers).
pub const TYPED_PREFIX: char = '=';

const TRUE_TOKEN: &str = "=true";
const FALSE_TOKEN: &str = "=false";

/// Characters that carry structure when they start a token.
const LEADING_SIGILS: [char; 14] = [
    '_', '=', '[', ']', '{', '}', ':', '+', '$', '#', '!', '*', '~', '>',
];

/// Escape a string so it forms a single ALS token.
///
/// The empty string is not handled here; use [`encode_string`] to get
/// [`EMPTY_TOKEN`] for it.
///
/// # Example
///
/// ```
/// use als_codec::als::escape::escape_als_string;
///
/// assert_eq!(escape_als_string("New York"), "New\\ York");
/// assert_eq!(escape_als_string("_id"), "\\_id");
/// assert_eq!(escape_als_string("user_id"), "user_id");
/// assert_eq!(escape_als_string("a\u{0}b"), "a\\x00b");
/// ```
pub fn escape_als_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 4);

    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => result.push_str("\\\\"),
            ' ' => result.push_str("\\ "),
            '|' => result.push_str("\\|"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            c if c.is_ascii_control() => {
                result.push_str(&format!("\\x{:02X}", c as u32));
            }
            c if i == 0 && LEADING_SIGILS.contains(&c) => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Reverse [`escape_als_string`].
///
/// # Errors
///
/// Returns [`AlsError::MalformedAlsStream`] for an unknown escape or a
/// trailing backslash. The position is relative to the start of `s`.
pub fn unescape_als_string(s: &str) -> Result<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => result.push('\n'),
            Some((_, 't')) => result.push('\t'),
            Some((_, 'r')) => result.push('\r'),
            Some((_, 'x')) => result.push(unescape_control(&mut chars, i)?),
            Some((_, c @ ('\\' | ' ' | '|'))) => result.push(c),
            Some((_, c)) if LEADING_SIGILS.contains(&c) => result.push(c),
            Some((_, c)) => {
                return Err(AlsError::malformed(i, format!("unknown escape '\\{}'", c)));
            }
            None => return Err(AlsError::malformed(i, "trailing backslash")),
        }
    }

    Ok(result)
}

/// Read the two hex digits of a `\xHH` escape starting at byte `at`.
///
/// Only control characters are accepted.
fn unescape_control(chars: &mut std::str::CharIndices<'_>, at: usize) -> Result<char> {
    let digits: String = chars.by_ref().take(2).map(|(_, c)| c).collect();
    u8::from_str_radix(&digits, 16)
        .ok()
        .filter(|_| digits.len() == 2 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
        .map(char::from)
        .filter(char::is_ascii_control)
        .ok_or_else(|| AlsError::malformed(at, format!("invalid control escape '\\x{}'", digits)))
}

/// Encode a string value as a token.
pub fn encode_string(s: &str) -> String {
    if s.is_empty() {
        EMPTY_TOKEN.to_string()
    } else {
        escape_als_string(s)
    }
}

/// Encode a number as a typed token.
pub fn encode_number(n: &Number) -> String {
    format!("{}{}", TYPED_PREFIX, n)
}

/// Encode a boolean as a typed token.
pub fn encode_bool(b: bool) -> &'static str {
    if b {
        TRUE_TOKEN
    } else {
        FALSE_TOKEN
    }
}

/// Encode any scalar as a token.
///
/// # Example
///
/// ```
/// use als_codec::als::escape::encode_scalar;
/// use als_codec::convert::Scalar;
///
/// assert_eq!(encode_scalar(&Scalar::Null), "\\0");
/// assert_eq!(encode_scalar(&Scalar::Number(7.into())), "=7");
/// assert_eq!(encode_scalar(&Scalar::from("=7")), "\\=7");
/// ```
pub fn encode_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Null => NULL_TOKEN.to_string(),
        Scalar::Bool(b) => encode_bool(*b).to_string(),
        Scalar::Number(n) => encode_number(n),
        Scalar::String(s) => encode_string(s),
    }
}

/// Decode a single scalar token.
///
/// Positions in errors are relative to the start of `token`.
pub fn decode_scalar(token: &str) -> Result<Scalar> {
    match token {
        "" => Err(AlsError::malformed(0, "empty token")),
        NULL_TOKEN => Ok(Scalar::Null),
        EMPTY_TOKEN => Ok(Scalar::String(String::new())),
        TRUE_TOKEN => Ok(Scalar::Bool(true)),
        FALSE_TOKEN => Ok(Scalar::Bool(false)),
        _ => match token.strip_prefix(TYPED_PREFIX) {
            Some(literal) => serde_json::from_str::<Number>(literal)
                .map(Scalar::Number)
                .map_err(|_| AlsError::malformed(0, format!("invalid typed literal '{}'", token))),
            None => unescape_als_string(token).map(Scalar::String),
        },
    }
}
