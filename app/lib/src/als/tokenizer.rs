//! ALS format tokenizer.
//!
//! Splits one line of ALS text into tokens. Tokens are separated by single
//! unescaped spaces; an empty token (double or trailing space) is an error.
//!
//! # Token Types
//!
//! - Structure: `[`, `]`, `{`, `}`
//! - Dictionary entry markers: `:` (key set), `+` (row segment)
//! - Dictionary reference: `_0`, `_1`, ...
//! - Shape reference: `{_0`, `{_1`, ... (object whose keys come from a key set)
//! - Column run markers: `*N`, `~N`, `>N`, `>N:d`, see [`crate::als::RunMarker`]
//! - Scalars, see [`crate::als::escape`]

use crate::convert::Scalar;
use crate::error::{AlsError, Result};

use super::escape::decode_scalar;
use super::run::RunMarker;

/// Token types produced by the ALS tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal scalar value
    Scalar(Scalar),
    /// Dictionary reference: `_N`
    Ref(usize),
    /// Object opened with the keys of key-set entry N: `{_N`
    ShapeRef(usize),
    /// `[`
    OpenArray,
    /// `]`
    CloseArray,
    /// `{`
    OpenObject,
    /// `}`
    CloseObject,
    /// `:` introducing a key-set entry
    KeySetMarker,
    /// `+` introducing a row-segment entry
    SegmentMarker,
    /// Column run opened in a table row
    Run(RunMarker),
}

/// A token together with its byte position in the ALS text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// Byte offset of the token's first character
    pub position: usize,
}

/// ALS tokenizer over a single line.
///
/// Yields `Result<Spanned>`; positions are absolute when the tokenizer is
/// created with the line's offset in the full document.
pub struct Tokenizer<'a> {
    input: &'a str,
    base: usize,
    offset: usize,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer for `input`, which starts at byte `base` of the
    /// document.
    pub fn new(input: &'a str, base: usize) -> Self {
        Self {
            input,
            base,
            offset: 0,
            finished: input.is_empty(),
        }
    }

    fn classify(raw: &str, position: usize) -> Result<Token> {
        let token = match raw {
            "" => return Err(AlsError::malformed(position, "empty token")),
            "[" => Token::OpenArray,
            "]" => Token::CloseArray,
            "{" => Token::OpenObject,
            "}" => Token::CloseObject,
            ":" => Token::KeySetMarker,
            "+" => Token::SegmentMarker,
            _ => {
                if let Some(id) = raw.strip_prefix("{_") {
                    Token::ShapeRef(parse_id(id, position)?)
                } else if let Some(id) = raw.strip_prefix('_') {
                    Token::Ref(parse_id(id, position)?)
                } else if raw.starts_with(['*', '~', '>']) {
                    Token::Run(parse_run(raw, position)?)
                } else {
                    Token::Scalar(decode_scalar(raw).map_err(|e| shift(e, position))?)
                }
            }
        };
        Ok(token)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Spanned>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let start = self.offset;
        let end = match find_unescaped(self.input, start, b' ') {
            Some(end) => {
                self.offset = end + 1;
                end
            }
            None => {
                self.finished = true;
                self.input.len()
            }
        };
        let position = self.base + start;
        Some(Self::classify(&self.input[start..end], position).map(|token| Spanned {
            token,
            position,
        }))
    }
}

/// Collect every token of a line.
pub fn tokenize(input: &str, base: usize) -> Result<Vec<Spanned>> {
    Tokenizer::new(input, base).collect()
}

/// Split `input` on every unescaped `sep`, returning each piece with its
/// byte offset relative to `input`.
pub fn split_unescaped(input: &str, sep: u8) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(end) = find_unescaped(input, start, sep) {
        pieces.push((start, &input[start..end]));
        start = end + 1;
    }
    pieces.push((start, &input[start..]));
    pieces
}

/// Byte index of the first `sep` at or after `from` not preceded by an
/// escaping backslash. `sep` must be ASCII.
fn find_unescaped(input: &str, from: usize, sep: u8) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == sep => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn parse_id(digits: &str, position: usize) -> Result<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AlsError::malformed(
            position,
            format!("invalid dictionary reference '_{}'", digits),
        ));
    }
    digits
        .parse()
        .map_err(|_| AlsError::malformed(position, "dictionary reference out of range"))
}

fn parse_run(raw: &str, position: usize) -> Result<RunMarker> {
    let invalid = || AlsError::malformed(position, format!("invalid column run '{}'", raw));
    let count = |digits: &str| -> Result<usize> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.parse().ok().filter(|n| *n >= 2).ok_or_else(invalid)
    };

    let (sigil, rest) = raw.split_at(1);
    let marker = match sigil {
        "*" => RunMarker::Repeat(count(rest)?),
        "~" => RunMarker::Toggle(count(rest)?),
        _ => match rest.split_once(':') {
            None => RunMarker::Range {
                count: count(rest)?,
                step: 1,
            },
            Some((n, step)) => {
                let step = step
                    .parse::<i64>()
                    .ok()
                    .filter(|d| *d != 0 && d.to_string() == step)
                    .ok_or_else(invalid)?;
                RunMarker::Range {
                    count: count(n)?,
                    step,
                }
            }
        },
    };
    Ok(marker)
}

/// Move a token-relative error position to an absolute one.
fn shift(err: AlsError, by: usize) -> AlsError {
    match err {
        AlsError::MalformedAlsStream { position, message } => AlsError::MalformedAlsStream {
            position: position + by,
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input, 0)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_structure_and_refs() {
        assert_eq!(
            tokens("[ {_0 =1 _3 { k \\0 } ]"),
            vec![
                Token::OpenArray,
                Token::ShapeRef(0),
                Token::Scalar(Scalar::Number(1.into())),
                Token::Ref(3),
                Token::OpenObject,
                Token::Scalar(Scalar::from("k")),
                Token::Scalar(Scalar::Null),
                Token::CloseObject,
                Token::CloseArray,
            ]
        );
    }

    #[test]
    fn test_escaped_space_stays_in_token() {
        assert_eq!(
            tokens("New\\ York x"),
            vec![Token::Scalar(Scalar::from("New York")), Token::Scalar(Scalar::from("x"))]
        );
    }

    #[test]
    fn test_escaped_sigils_are_strings() {
        assert_eq!(tokens("\\_1"), vec![Token::Scalar(Scalar::from("_1"))]);
        assert_eq!(tokens("\\["), vec![Token::Scalar(Scalar::from("["))]);
    }

    #[test]
    fn test_markers() {
        assert_eq!(
            tokens(": a +"),
            vec![Token::KeySetMarker, Token::Scalar(Scalar::from("a")), Token::SegmentMarker]
        );
    }

    #[test]
    fn test_run_markers() {
        assert_eq!(
            tokens("*12 a ~4 >3 >5:-2 \\*3"),
            vec![
                Token::Run(RunMarker::Repeat(12)),
                Token::Scalar(Scalar::from("a")),
                Token::Run(RunMarker::Toggle(4)),
                Token::Run(RunMarker::Range { count: 3, step: 1 }),
                Token::Run(RunMarker::Range { count: 5, step: -2 }),
                Token::Scalar(Scalar::from("*3")),
            ]
        );
    }

    #[test]
    fn test_bad_run_markers() {
        for input in ["*", "*1", "*0", "~x", ">3:", ">3:0", ">3:+2", ">:2", "*-3", ">3:1:1"] {
            assert!(
                matches!(tokenize(input, 0), Err(AlsError::MalformedAlsStream { .. })),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn test_positions_are_absolute() {
        let spans = tokenize("ab _1", 10).unwrap();
        assert_eq!(spans[0].position, 10);
        assert_eq!(spans[1].position, 13);
    }

    #[test]
    fn test_empty_line_has_no_tokens() {
        assert!(tokenize("", 0).unwrap().is_empty());
    }

    #[test]
    fn test_double_space_is_an_error() {
        let err = tokenize("a  b", 0).unwrap_err();
        assert!(matches!(err, AlsError::MalformedAlsStream { position: 2, .. }));
        assert!(tokenize("a ", 0).is_err());
    }

    #[test]
    fn test_bad_reference() {
        assert!(tokenize("_x", 0).is_err());
        assert!(tokenize("_", 0).is_err());
        assert!(tokenize("{_", 0).is_err());
    }

    #[test]
    fn test_split_unescaped() {
        assert_eq!(
            split_unescaped("a|b\\|c|", b'|'),
            vec![(0, "a"), (2, "b\\|c"), (7, "")]
        );
    }
}
