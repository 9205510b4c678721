//! Candidate scanning for tabular models.
//!
//! Literals are counted column by column, since categorical values tend to
//! repeat down a column. Row segments are counted row by row: every run of
//! 2 to [`MAX_SEGMENT_CELLS`] adjacent cells is a candidate.

use crate::als::{encode_scalar, PatternKind};
use crate::convert::Scalar;

use super::candidate::Tally;
use super::scanner::StructureScanner;

/// Longest run of adjacent cells considered as one row segment.
pub const MAX_SEGMENT_CELLS: usize = 8;

/// Scanner over table rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableScanner;

impl TableScanner {
    /// Create a new table scanner.
    pub fn new() -> Self {
        Self
    }
}

impl StructureScanner<Vec<Scalar>> for TableScanner {
    fn scan(&self, rows: &[Vec<Scalar>], tally: &mut Tally) {
        let tokens: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(encode_scalar).collect())
            .collect();
        let width = tokens.first().map_or(0, Vec::len);

        for column in 0..width {
            for row in &tokens {
                let token = &row[column];
                tally.record(PatternKind::Literal, token, token.len(), token.len());
            }
        }

        if width < 2 {
            return;
        }
        for row in &tokens {
            for start in 0..width - 1 {
                // Same text as `segment_text(&row[start..=end])`, built incrementally.
                let mut text = String::from("+ ");
                text.push_str(&row[start]);
                for end in start + 1..width.min(start + MAX_SEGMENT_CELLS) {
                    text.push(' ');
                    text.push_str(&row[end]);
                    let span = text.len() - 2;
                    tally.record(PatternKind::RowSegment, &text, span, span);
                }
            }
        }
    }
}
