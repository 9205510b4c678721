//! Structural encoder.
//!
//! Walks a [`StructuralModel`] and emits the ALS token body, replacing every
//! occurrence of an indexed pattern with a reference. Tables are encoded
//! left to right: a planned column run is written where it starts and its
//! later cells are skipped, and the remaining cells prefer the longest row
//! segment at each column. Trees
//! are encoded top-down, so a repeated subtree is referenced as a whole
//! before its parts are considered.

use crate::als::escape::encode_string;
use crate::als::serializer::{keyset_text, leaf_token, segment_text, tree_text};
use crate::als::{encode_scalar, AlsBody, ColumnRun, Dictionary, Token};
use crate::convert::{Scalar, StructuralModel, Table, Tree};
use crate::error::{AlsError, Result};
use crate::pattern::RunPlan;

use super::dictionary::{build_dictionary, DictionaryEntry, DictionaryIndex};

/// Upper bound on prune-and-re-encode passes.
pub const MAX_COMPACTION_ROUNDS: usize = 4;

/// A structural encoding: dictionary plus body.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    /// Dictionary referenced by the body
    pub dictionary: Dictionary,
    /// Token body
    pub body: AlsBody,
}

/// Encoder for one index of selected patterns.
///
/// Counts how often each id is referenced so unprofitable entries can be
/// pruned after a pass.
pub struct StructuralEncoder<'a> {
    index: &'a DictionaryIndex,
    runs: &'a RunPlan,
    uses: Vec<usize>,
}

impl<'a> StructuralEncoder<'a> {
    /// Create an encoder over `index` with `entries` ids, writing the column
    /// runs in `runs`.
    pub fn new(index: &'a DictionaryIndex, runs: &'a RunPlan, entries: usize) -> Self {
        Self {
            index,
            runs,
            uses: vec![0; entries],
        }
    }

    /// Reference counts per id from the last encoding.
    pub fn uses(&self) -> &[usize] {
        &self.uses
    }

    /// Encode a model into a token body.
    pub fn encode(&mut self, model: &StructuralModel) -> AlsBody {
        match model {
            StructuralModel::Table(table) => self.encode_table(table),
            StructuralModel::Tree(root) => {
                let mut tokens = Vec::new();
                self.encode_tree(root, true, &mut tokens);
                AlsBody::Tree(tokens)
            }
        }
    }

    fn reference(&mut self, id: usize) -> Token {
        if let Some(count) = self.uses.get_mut(id) {
            *count += 1;
        }
        Token::Ref(id)
    }

    fn encode_table(&mut self, table: &Table) -> AlsBody {
        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| self.encode_row(index, row))
            .collect();
        AlsBody::Table {
            columns: table.columns().to_vec(),
            rows,
        }
    }

    /// Token for one cell value: a literal reference if indexed.
    fn cell(&mut self, value: &Scalar) -> Token {
        match self.index.literal(&encode_scalar(value)) {
            Some(id) => self.reference(id),
            None => Token::Scalar(value.clone()),
        }
    }

    fn write_run(&mut self, run: &ColumnRun, tokens: &mut Vec<Token>) {
        tokens.push(Token::Run(run.marker()));
        match run {
            ColumnRun::Repeat { value, .. } => {
                let token = self.cell(value);
                tokens.push(token);
            }
            ColumnRun::Toggle { first, second, .. } => {
                let first = self.cell(first);
                let second = self.cell(second);
                tokens.push(first);
                tokens.push(second);
            }
            ColumnRun::Range { start, .. } => {
                tokens.push(Token::Scalar(Scalar::String(start.to_string())));
            }
        }
    }

    fn encode_row(&mut self, index: usize, row: &[Scalar]) -> Vec<Token> {
        let cells: Vec<String> = row.iter().map(encode_scalar).collect();
        let width = cells.len();
        let longest = self.index.longest_segment();
        let runs = self.runs;
        let mut tokens = Vec::with_capacity(width);
        let mut column = 0;

        'cells: while column < width {
            if runs.is_covered(index, column) {
                column += 1;
                continue;
            }
            if let Some(run) = runs.start(index, column) {
                self.write_run(run, &mut tokens);
                column += 1;
                continue;
            }

            let free = (column..width)
                .take_while(|&c| runs.is_free(index, c))
                .count();
            let reach = longest.min(free);
            for len in (2..=reach).rev() {
                let text = segment_text(&cells[column..column + len]);
                if let Some(id) = self.index.segment(&text) {
                    tokens.push(self.reference(id));
                    column += len;
                    continue 'cells;
                }
            }

            let token = match self.index.literal(&cells[column]) {
                Some(id) => self.reference(id),
                None => Token::Scalar(row[column].clone()),
            };
            tokens.push(token);
            column += 1;
        }
        tokens
    }

    fn encode_tree(&mut self, node: &Tree, is_root: bool, out: &mut Vec<Token>) {
        if node.is_container() && !is_root && self.index.has_subtrees() {
            if let Some(id) = self.index.subtree(&tree_text(node)) {
                out.push(self.reference(id));
                return;
            }
        }

        match node {
            Tree::Array(items) => {
                out.push(Token::OpenArray);
                for item in items {
                    self.encode_tree(item, false, out);
                }
                out.push(Token::CloseArray);
            }
            Tree::Object(entries) => {
                let keys: Vec<String> = entries.iter().map(|(key, _)| encode_string(key)).collect();
                let shape = if !keys.is_empty() && self.index.has_shapes() {
                    self.index.shape(&keyset_text(&keys))
                } else {
                    None
                };

                match shape {
                    Some(id) => {
                        if let Some(count) = self.uses.get_mut(id) {
                            *count += 1;
                        }
                        out.push(Token::ShapeRef(id));
                        for (_, value) in entries {
                            self.encode_tree(value, false, out);
                        }
                    }
                    None => {
                        out.push(Token::OpenObject);
                        for ((key, value), token) in entries.iter().zip(&keys) {
                            let key_token = match self.index.literal(token) {
                                Some(id) => self.reference(id),
                                None => Token::Scalar(Scalar::String(key.clone())),
                            };
                            out.push(key_token);
                            self.encode_tree(value, false, out);
                        }
                        out.push(Token::CloseObject);
                    }
                }
            }
            leaf => {
                let id = leaf_token(leaf).and_then(|token| self.index.literal(&token));
                let token = match id {
                    Some(id) => self.reference(id),
                    None => Token::Scalar(leaf_scalar(leaf)),
                };
                out.push(token);
            }
        }
    }
}

/// Scalar value of a leaf node.
fn leaf_scalar(leaf: &Tree) -> Scalar {
    match leaf {
        Tree::Bool(b) => Scalar::Bool(*b),
        Tree::Number(n) => Scalar::Number(n.clone()),
        Tree::String(s) => Scalar::String(s.clone()),
        _ => Scalar::Null,
    }
}

/// Encode a model with no dictionary and no column runs.
pub fn encode_literal(model: &StructuralModel) -> AlsBody {
    let index = DictionaryIndex::empty();
    let runs = RunPlan::default();
    StructuralEncoder::new(&index, &runs, 0).encode(model)
}

/// Encode a model against ranked candidate entries, writing column runs of
/// at least `min_run_length` cells (0 disables them).
///
/// Entries whose references do not pay for the entry are pruned and the
/// model is re-encoded until every entry pays, for at most
/// [`MAX_COMPACTION_ROUNDS`] passes. Every id in the result is compact and
/// in the candidates' canonical order.
///
/// # Errors
///
/// Returns [`AlsError::EncodingFailure`] if more than `max_entries` entries
/// survive pruning.
pub fn encode_with_entries(
    model: &StructuralModel,
    mut entries: Vec<DictionaryEntry>,
    max_entries: usize,
    min_run_length: usize,
) -> Result<Encoding> {
    let runs = RunPlan::for_model(model, min_run_length);
    let mut rounds = 0;
    let body = loop {
        let index = DictionaryIndex::build(&entries);
        let mut encoder = StructuralEncoder::new(&index, &runs, entries.len());
        let body = encoder.encode(model);
        rounds += 1;

        let keep: Vec<bool> = entries
            .iter()
            .zip(encoder.uses())
            .enumerate()
            .map(|(id, (entry, &uses))| uses > 0 && entry.bytes_saved(uses, id) > 0)
            .collect();
        if keep.iter().all(|&k| k) || rounds >= MAX_COMPACTION_ROUNDS {
            break body;
        }

        let mut flags = keep.into_iter();
        entries.retain(|_| flags.next().unwrap_or(false));
        log::trace!("compaction round {}: {} entries kept", rounds, entries.len());
    };

    if entries.len() > max_entries {
        return Err(AlsError::EncodingFailure(format!(
            "dictionary needs {} entries, limit is {}",
            entries.len(),
            max_entries
        )));
    }

    Ok(Encoding {
        dictionary: build_dictionary(&entries)?,
        body,
    })
}
