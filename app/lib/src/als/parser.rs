//! ALS format parser and decoder.
//!
//! [`AlsParser::parse`] reads ALS text into an [`AlsDocument`];
//! [`AlsParser::decode`] goes further and replays the body against the
//! dictionary to rebuild the [`StructuralModel`].

use std::collections::HashSet;

use crate::compress::fallback;
use crate::convert::{Scalar, SourceKind, StructuralModel, Table, Tree};
use crate::error::{AlsError, Result};

use super::document::{AlsBody, AlsDocument, BodyKind, Dictionary, Pattern};
use super::escape::decode_scalar;
use super::run::{canonical_integer, ColumnRun, RunMarker};
use super::tokenizer::{split_unescaped, tokenize, Spanned, Token};

/// Deepest nesting accepted in a tree body, matching serde_json's default.
const MAX_DEPTH: usize = 128;

/// ALS format parser.
///
/// Stateless: every call works only on its input, so one parser can be
/// shared freely between threads.
///
/// # Examples
///
/// ```
/// use als_codec::{AlsParser, SourceKind};
///
/// let parser = AlsParser::new();
/// let csv = parser.decode_to(SourceKind::Csv, "!v1 csv\n$Alice\n#id #name\n1 _0\n2 _0\n").unwrap();
/// assert_eq!(csv, "id,name\n1,Alice\n2,Alice\n");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AlsParser;

/// One line of input with its starting byte offset.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    position: usize,
}

/// Parsed body that still remembers token positions.
enum SpannedBody {
    Table {
        columns: Vec<String>,
        rows: Vec<(usize, Vec<Spanned>)>,
    },
    Tree {
        end: usize,
        tokens: Vec<Spanned>,
    },
    Fallback {
        position: usize,
        payload: String,
    },
}

struct SpannedDocument {
    source: SourceKind,
    dictionary: Dictionary,
    body: SpannedBody,
}

impl AlsParser {
    /// Highest ALS version this parser reads.
    pub const MAX_SUPPORTED_VERSION: u8 = 1;

    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Read just the header line.
    ///
    /// Returns the body kind and the source kind the document was encoded
    /// from.
    pub fn header(&self, input: &str) -> Result<(BodyKind, SourceKind)> {
        if input.is_empty() {
            return Err(AlsError::malformed(0, "missing header"));
        }
        let text = input.split('\n').next().unwrap_or_default();
        let text = text.strip_suffix('\r').unwrap_or(text);
        parse_header(Line { text, position: 0 })
    }

    /// Parse ALS text into an [`AlsDocument`] without resolving references.
    pub fn parse(&self, input: &str) -> Result<AlsDocument> {
        let doc = self.parse_spanned(input)?;
        let body = match doc.body {
            SpannedBody::Table { columns, rows } => AlsBody::Table {
                columns,
                rows: rows.into_iter().map(|(_, row)| strip(row)).collect(),
            },
            SpannedBody::Tree { tokens, .. } => AlsBody::Tree(strip(tokens)),
            SpannedBody::Fallback { payload, .. } => AlsBody::Fallback(payload),
        };
        Ok(AlsDocument {
            version: AlsDocument::CURRENT_VERSION,
            source: doc.source,
            dictionary: doc.dictionary,
            body,
        })
    }

    /// Decode ALS text back into the structural model it was encoded from.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::MalformedAlsStream`] for an unrecognized header,
    /// a reference to a non-existent dictionary id, a fallback payload that
    /// does not decompress, or any other syntax problem.
    pub fn decode(&self, input: &str) -> Result<StructuralModel> {
        let doc = self.parse_spanned(input)?;
        replay(doc)
    }

    /// Decode ALS text and render it as `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::KindMismatch`] if the document was encoded from
    /// the other source kind; no conversion between kinds is attempted.
    pub fn decode_to(&self, kind: SourceKind, input: &str) -> Result<String> {
        let (_, found) = self.header(input)?;
        if found != kind {
            return Err(AlsError::KindMismatch {
                requested: kind,
                found,
            });
        }
        self.decode(input)?.render()
    }

    /// Byte-oriented form of [`AlsParser::decode_to`].
    ///
    /// Fails with [`AlsError::InvalidUtf8`] before any parsing if `input` is
    /// not UTF-8.
    pub fn decode_bytes_to(&self, kind: SourceKind, input: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(input)?;
        self.decode_to(kind, text)
    }

    /// Decode a CSV-sourced document to CSV text.
    pub fn to_csv(&self, input: &str) -> Result<String> {
        self.decode_to(SourceKind::Csv, input)
    }

    /// Decode a JSON-sourced document to JSON text.
    pub fn to_json(&self, input: &str) -> Result<String> {
        self.decode_to(SourceKind::Json, input)
    }

    fn parse_spanned(&self, input: &str) -> Result<SpannedDocument> {
        let mut lines = split_lines(input).into_iter().peekable();
        let header = lines
            .next()
            .ok_or_else(|| AlsError::malformed(0, "missing header"))?;
        let (body_kind, source) = parse_header(header)?;

        let (dictionary, body) = match body_kind {
            BodyKind::Fallback => {
                let line = lines
                    .next()
                    .ok_or_else(|| AlsError::malformed(input.len(), "missing fallback payload"))?;
                let body = SpannedBody::Fallback {
                    position: line.position,
                    payload: line.text.to_string(),
                };
                (Dictionary::new(), body)
            }
            BodyKind::Structural => {
                let dictionary = match lines.next_if(|line| line.text.starts_with('$')) {
                    Some(line) => parse_dictionary(line)?,
                    None => Dictionary::new(),
                };
                let body = match source {
                    SourceKind::Csv => {
                        let schema = lines
                            .next()
                            .ok_or_else(|| AlsError::malformed(input.len(), "missing schema"))?;
                        let columns = parse_schema(schema)?;
                        let mut rows = Vec::new();
                        for line in lines.by_ref() {
                            rows.push((line.position, tokenize(line.text, line.position)?));
                        }
                        SpannedBody::Table { columns, rows }
                    }
                    SourceKind::Json => {
                        let line = lines
                            .next()
                            .ok_or_else(|| AlsError::malformed(input.len(), "missing body"))?;
                        SpannedBody::Tree {
                            end: line.position + line.text.len(),
                            tokens: tokenize(line.text, line.position)?,
                        }
                    }
                };
                (dictionary, body)
            }
        };

        if let Some(extra) = lines.next() {
            return Err(AlsError::malformed(extra.position, "unexpected trailing line"));
        }
        Ok(SpannedDocument {
            source,
            dictionary,
            body,
        })
    }
}

/// Split into lines, dropping the `\n` (and a preceding `\r`) terminator.
fn split_lines(input: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut position = 0;
    for raw in input.split_inclusive('\n') {
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        lines.push(Line { text, position });
        position += raw.len();
    }
    lines
}

fn strip(tokens: Vec<Spanned>) -> Vec<Token> {
    tokens.into_iter().map(|s| s.token).collect()
}

fn parse_header(line: Line<'_>) -> Result<(BodyKind, SourceKind)> {
    let unrecognized = || AlsError::malformed(line.position, format!("unrecognized header '{}'", line.text));

    let rest = line.text.strip_prefix('!').ok_or_else(unrecognized)?;
    let (tag, source) = rest.split_once(' ').ok_or_else(unrecognized)?;
    let source: SourceKind = source.parse().map_err(|_| unrecognized())?;

    let body_kind = match tag {
        "ctx" => BodyKind::Fallback,
        _ => {
            let version: u8 = tag
                .strip_prefix('v')
                .and_then(|v| v.parse().ok())
                .ok_or_else(unrecognized)?;
            if version == 0 || version > AlsParser::MAX_SUPPORTED_VERSION {
                return Err(AlsError::malformed(
                    line.position,
                    format!(
                        "unsupported ALS version {} (expected <= {})",
                        version,
                        AlsParser::MAX_SUPPORTED_VERSION
                    ),
                ));
            }
            BodyKind::Structural
        }
    };
    Ok((body_kind, source))
}

fn parse_dictionary(line: Line<'_>) -> Result<Dictionary> {
    let content = &line.text[1..];
    let base = line.position + 1;
    split_unescaped(content, b'|')
        .into_iter()
        .map(|(offset, entry)| {
            let position = base + offset;
            let tokens = tokenize(entry, position)?;
            parse_entry(&tokens, position)
        })
        .collect()
}

/// Parse the text of a single dictionary entry.
pub(crate) fn parse_entry_text(text: &str) -> Result<Pattern> {
    let tokens = tokenize(text, 0)?;
    parse_entry(&tokens, 0)
}

/// Parse one dictionary entry. Entries are always literal: references are
/// rejected inside them.
fn parse_entry(tokens: &[Spanned], position: usize) -> Result<Pattern> {
    let (first, rest) = tokens
        .split_first()
        .ok_or_else(|| AlsError::malformed(position, "empty dictionary entry"))?;

    match &first.token {
        Token::KeySetMarker => {
            let mut seen = HashSet::new();
            let mut keys = Vec::with_capacity(rest.len());
            for spanned in rest {
                let key = match &spanned.token {
                    Token::Scalar(Scalar::String(key)) => key.clone(),
                    _ => return Err(AlsError::malformed(spanned.position, "key set entries must be strings")),
                };
                if !seen.insert(key.clone()) {
                    return Err(AlsError::malformed(spanned.position, format!("duplicate key '{}' in key set", key)));
                }
                keys.push(key);
            }
            if keys.is_empty() {
                return Err(AlsError::malformed(position, "key set has no keys"));
            }
            Ok(Pattern::KeySet(keys))
        }
        Token::SegmentMarker => {
            let cells = rest
                .iter()
                .map(|spanned| match &spanned.token {
                    Token::Scalar(value) => Ok(value.clone()),
                    _ => Err(AlsError::malformed(spanned.position, "row segment cells must be literal")),
                })
                .collect::<Result<Vec<_>>>()?;
            if cells.is_empty() {
                return Err(AlsError::malformed(position, "row segment has no cells"));
            }
            Ok(Pattern::RowSegment(cells))
        }
        Token::OpenArray | Token::OpenObject => {
            let end = tokens.last().map(|s| s.position).unwrap_or(position);
            let mut reader = TreeReader::new(tokens, None, end);
            let tree = reader.read_root()?;
            Ok(Pattern::Subtree(tree))
        }
        Token::Scalar(value) if rest.is_empty() => Ok(Pattern::Literal(value.clone())),
        _ => Err(AlsError::malformed(first.position, "invalid dictionary entry")),
    }
}

fn parse_schema(line: Line<'_>) -> Result<Vec<String>> {
    if !line.text.starts_with('#') {
        return Err(AlsError::malformed(line.position, "expected schema line"));
    }
    let mut columns = Vec::new();
    for (offset, piece) in split_unescaped(line.text, b' ') {
        let position = line.position + offset;
        let token = piece
            .strip_prefix('#')
            .ok_or_else(|| AlsError::malformed(position, "schema column must start with '#'"))?;
        match decode_scalar(token) {
            Ok(Scalar::String(name)) => columns.push(name),
            _ => return Err(AlsError::malformed(position, "invalid schema column name")),
        }
    }
    // Reuse the table's own checks for duplicate names.
    Table::new(columns.clone())
        .map_err(|e| AlsError::malformed(line.position, format!("invalid schema: {}", e)))?;
    Ok(columns)
}

fn resolve(dictionary: &Dictionary, id: usize, position: usize) -> Result<&Pattern> {
    dictionary.get(id).ok_or_else(|| {
        AlsError::malformed(
            position,
            format!(
                "reference _{} to non-existent dictionary id (dictionary has {} entries)",
                id,
                dictionary.len()
            ),
        )
    })
}

fn replay(doc: SpannedDocument) -> Result<StructuralModel> {
    let dictionary = &doc.dictionary;
    match doc.body {
        SpannedBody::Table { columns, rows } => {
            replay_table(dictionary, columns, rows).map(StructuralModel::Table)
        }
        SpannedBody::Tree { end, tokens } => {
            let mut reader = TreeReader::new(&tokens, Some(dictionary), end);
            reader.read_root().map(StructuralModel::Tree)
        }
        SpannedBody::Fallback { position, payload } => {
            let text = fallback::decode_payload(&payload, position)?;
            StructuralModel::parse(doc.source, &text)
                .map_err(|e| AlsError::malformed(position, format!("fallback payload: {}", e)))
        }
    }
}

/// A column run still producing cells for later rows.
struct ActiveRun {
    run: ColumnRun,
    next: usize,
    position: usize,
}

/// Next cell of the run in `slot`, clearing the slot after its last cell.
fn next_run_cell(slot: &mut Option<ActiveRun>) -> Option<Scalar> {
    let active = slot.as_mut()?;
    let value = active.run.value_at(active.next);
    active.next += 1;
    if active.next >= active.run.len() {
        *slot = None;
    }
    value
}

fn replay_table(
    dictionary: &Dictionary,
    columns: Vec<String>,
    rows: Vec<(usize, Vec<Spanned>)>,
) -> Result<Table> {
    let width = columns.len();
    let mut table = Table::new(columns)
        .map_err(|e| AlsError::malformed(0, format!("invalid schema: {}", e)))?;
    let mut active: Vec<Option<ActiveRun>> = (0..width).map(|_| None).collect();

    for (line_position, tokens) in rows {
        let mut cells = Vec::with_capacity(width);
        let mut tokens = tokens.into_iter();
        while cells.len() < width {
            let column = cells.len();
            if let Some(value) = next_run_cell(&mut active[column]) {
                cells.push(value);
                continue;
            }
            let Some(spanned) = tokens.next() else {
                break;
            };
            match spanned.token {
                Token::Scalar(value) => cells.push(value),
                Token::Ref(id) => match resolve(dictionary, id, spanned.position)? {
                    Pattern::Literal(value) => cells.push(value.clone()),
                    Pattern::RowSegment(segment) => {
                        let end = column + segment.len();
                        if end > width || active[column..end].iter().any(Option::is_some) {
                            return Err(AlsError::malformed(
                                spanned.position,
                                format!("row segment _{} overlaps a column run or the row end", id),
                            ));
                        }
                        cells.extend(segment.iter().cloned());
                    }
                    other => {
                        return Err(AlsError::malformed(
                            spanned.position,
                            format!("{} entry _{} cannot appear in a table row", other.kind(), id),
                        ))
                    }
                },
                Token::Run(marker) => {
                    let run = read_run(dictionary, marker, spanned.position, &mut tokens)?;
                    cells.extend(run.value_at(0));
                    active[column] = Some(ActiveRun {
                        run,
                        next: 1,
                        position: spanned.position,
                    });
                }
                _ => {
                    return Err(AlsError::malformed(spanned.position, "unexpected token in table row"))
                }
            }
        }
        if let Some(extra) = tokens.next() {
            return Err(AlsError::malformed(
                extra.position,
                format!("row has more than {} cells", width),
            ));
        }
        if cells.len() != width {
            return Err(AlsError::malformed(
                line_position,
                format!("row has {} cells, schema has {}", cells.len(), width),
            ));
        }
        table
            .push_row(cells)
            .map_err(|e| AlsError::malformed(line_position, e))?;
    }

    if let Some(run) = active.iter().flatten().next() {
        return Err(AlsError::malformed(run.position, "column run extends past the last row"));
    }
    Ok(table)
}

/// Read the operands of a column run opened at `position`.
fn read_run(
    dictionary: &Dictionary,
    marker: RunMarker,
    position: usize,
    tokens: &mut impl Iterator<Item = Spanned>,
) -> Result<ColumnRun> {
    let mut operand = || {
        tokens
            .next()
            .ok_or_else(|| AlsError::malformed(position, format!("column run '{}' is missing operands", marker)))
    };
    match marker {
        RunMarker::Repeat(count) => Ok(ColumnRun::Repeat {
            value: run_value(dictionary, operand()?)?,
            count,
        }),
        RunMarker::Toggle(count) => {
            let first = run_value(dictionary, operand()?)?;
            let second = run_value(dictionary, operand()?)?;
            Ok(ColumnRun::Toggle {
                first,
                second,
                count,
            })
        }
        RunMarker::Range { count, step } => {
            let spanned = operand()?;
            let start = match &spanned.token {
                Token::Scalar(value) => canonical_integer(value),
                _ => None,
            }
            .ok_or_else(|| AlsError::malformed(spanned.position, "range start must be an integer"))?;
            ColumnRun::range(start, step, count)
                .ok_or_else(|| AlsError::malformed(position, "range leaves the 64-bit integer domain"))
        }
    }
}

/// Cell value named by a run operand: a scalar or a literal reference.
fn run_value(dictionary: &Dictionary, spanned: Spanned) -> Result<Scalar> {
    match spanned.token {
        Token::Scalar(value) => Ok(value),
        Token::Ref(id) => match resolve(dictionary, id, spanned.position)? {
            Pattern::Literal(value) => Ok(value.clone()),
            other => Err(AlsError::malformed(
                spanned.position,
                format!("{} entry _{} cannot be a column run value", other.kind(), id),
            )),
        },
        _ => Err(AlsError::malformed(spanned.position, "column run operand must be a value")),
    }
}

/// Recursive reader over a pre-order tree token stream.
///
/// With no dictionary, references are rejected.
struct TreeReader<'a> {
    tokens: &'a [Spanned],
    index: usize,
    dictionary: Option<&'a Dictionary>,
    end: usize,
}

impl<'a> TreeReader<'a> {
    fn new(tokens: &'a [Spanned], dictionary: Option<&'a Dictionary>, end: usize) -> Self {
        Self {
            tokens,
            index: 0,
            dictionary,
            end,
        }
    }

    fn read_root(&mut self) -> Result<Tree> {
        let tree = self.read_value(0)?;
        if let Some(extra) = self.tokens.get(self.index) {
            return Err(AlsError::malformed(extra.position, "unexpected trailing tokens"));
        }
        Ok(tree)
    }

    fn next(&mut self) -> Result<&'a Spanned> {
        let spanned = self
            .tokens
            .get(self.index)
            .ok_or_else(|| AlsError::malformed(self.end, "unexpected end of body"))?;
        self.index += 1;
        Ok(spanned)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.tokens.get(self.index).map(|s| &s.token) == Some(token)
    }

    fn lookup(&self, id: usize, position: usize) -> Result<&'a Pattern> {
        match self.dictionary {
            Some(dictionary) => resolve(dictionary, id, position),
            None => Err(AlsError::malformed(position, "references are not allowed here")),
        }
    }

    fn read_value(&mut self, depth: usize) -> Result<Tree> {
        let spanned = self.next()?;
        if depth > MAX_DEPTH {
            return Err(AlsError::malformed(spanned.position, "nesting too deep"));
        }
        match &spanned.token {
            Token::Scalar(value) => Ok(Tree::from(value.clone())),
            Token::Ref(id) => match self.lookup(*id, spanned.position)? {
                Pattern::Literal(value) => Ok(Tree::from(value.clone())),
                Pattern::Subtree(tree) => Ok(tree.clone()),
                other => Err(AlsError::malformed(
                    spanned.position,
                    format!("{} entry _{} cannot be used as a value", other.kind(), id),
                )),
            },
            Token::OpenArray => {
                let mut items = Vec::new();
                while !self.peek_is(&Token::CloseArray) {
                    items.push(self.read_value(depth + 1)?);
                }
                self.index += 1;
                Ok(Tree::Array(items))
            }
            Token::OpenObject => {
                let mut entries: Vec<(String, Tree)> = Vec::new();
                let mut seen = HashSet::new();
                while !self.peek_is(&Token::CloseObject) {
                    let (key, position) = self.read_key()?;
                    if !seen.insert(key.clone()) {
                        return Err(AlsError::malformed(position, format!("duplicate key '{}'", key)));
                    }
                    let value = self.read_value(depth + 1)?;
                    entries.push((key, value));
                }
                self.index += 1;
                Ok(Tree::Object(entries))
            }
            Token::ShapeRef(id) => match self.lookup(*id, spanned.position)? {
                Pattern::KeySet(keys) => {
                    let mut entries = Vec::with_capacity(keys.len());
                    for key in keys {
                        let value = self.read_value(depth + 1)?;
                        entries.push((key.clone(), value));
                    }
                    Ok(Tree::Object(entries))
                }
                other => Err(AlsError::malformed(
                    spanned.position,
                    format!("{} entry _{} cannot open an object", other.kind(), id),
                )),
            },
            _ => Err(AlsError::malformed(spanned.position, "unexpected token")),
        }
    }

    fn read_key(&mut self) -> Result<(String, usize)> {
        let spanned = self.next()?;
        let key = match &spanned.token {
            Token::Scalar(Scalar::String(key)) => key.clone(),
            Token::Ref(id) => match self.lookup(*id, spanned.position)? {
                Pattern::Literal(Scalar::String(key)) => key.clone(),
                _ => return Err(AlsError::malformed(spanned.position, "object key must be a string")),
            },
            _ => return Err(AlsError::malformed(spanned.position, "object key must be a string")),
        };
        Ok((key, spanned.position))
    }
}
