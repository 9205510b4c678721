//! Column run detection for tabular models.
//!
//! Each column is scanned top to bottom for the longest run starting at
//! the current row: one value repeated, two values alternating, or an
//! arithmetic sequence of integers. A run is kept when it spans at least
//! the configured number of cells and its marker and operands are shorter
//! than the cells they replace; scanning then resumes after it.
//!
//! Runs are found on the whole table, never per partition, so the plan is
//! the same for every worker count.

use std::collections::HashMap;

use crate::als::{canonical_integer, encode_scalar, ColumnRun};
use crate::convert::{Scalar, StructuralModel, Table};

/// Column runs chosen for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPlan {
    width: usize,
    starts: HashMap<(usize, usize), ColumnRun>,
    covered: Vec<bool>,
}

impl RunPlan {
    /// Plan runs for a model. Trees, and any model when `min_cells` is 0,
    /// get an empty plan.
    pub fn for_model(model: &StructuralModel, min_cells: usize) -> Self {
        match model {
            StructuralModel::Table(table) => Self::for_table(table, min_cells),
            StructuralModel::Tree(_) => Self::default(),
        }
    }

    /// Plan runs of at least `min_cells` cells for every column of `table`.
    pub fn for_table(table: &Table, min_cells: usize) -> Self {
        let width = table.column_count();
        let rows = table.rows();
        let mut plan = Self::default();
        if min_cells < 2 || rows.len() < min_cells {
            return plan;
        }
        plan.width = width;
        plan.covered = vec![false; width * rows.len()];

        for column in 0..width {
            let cells: Vec<&Scalar> = rows.iter().map(|row| &row[column]).collect();
            let mut row = 0;
            while row < cells.len() {
                let run = longest_run(&cells[row..])
                    .filter(|run| run.len() >= min_cells && pays_off(run, &cells[row..]));
                match run {
                    Some(run) => {
                        let len = run.len();
                        for covered in row + 1..row + len {
                            plan.covered[covered * width + column] = true;
                        }
                        plan.starts.insert((row, column), run);
                        row += len;
                    }
                    None => row += 1,
                }
            }
        }

        log::debug!("column runs: {} selected", plan.starts.len());
        plan
    }

    /// Run starting at `(row, column)`.
    pub fn start(&self, row: usize, column: usize) -> Option<&ColumnRun> {
        self.starts.get(&(row, column))
    }

    /// Whether the cell is produced by a run that started in an earlier row.
    pub fn is_covered(&self, row: usize, column: usize) -> bool {
        self.covered
            .get(row * self.width + column)
            .copied()
            .unwrap_or(false)
    }

    /// Whether the cell is neither covered nor the start of a run.
    pub fn is_free(&self, row: usize, column: usize) -> bool {
        !self.is_covered(row, column) && self.start(row, column).is_none()
    }

    /// Number of runs in the plan.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Whether the plan has no runs.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Longest run starting at `cells[0]`, if at least two cells form one.
///
/// Ties go to a repeat, then a range, then a toggle.
pub fn longest_run(cells: &[&Scalar]) -> Option<ColumnRun> {
    let (first, second) = match cells {
        [first, second, ..] => (*first, *second),
        _ => return None,
    };

    let repeat = cells.iter().take_while(|cell| **cell == first).count();
    let range = integer_run(cells);
    let toggle = if first != second {
        cells
            .iter()
            .enumerate()
            .take_while(|(i, cell)| **cell == (if i % 2 == 0 { first } else { second }))
            .count()
    } else {
        0
    };

    let best = repeat.max(toggle).max(range.as_ref().map_or(0, ColumnRun::len));
    if best < 2 {
        None
    } else if repeat == best {
        Some(ColumnRun::Repeat {
            value: first.clone(),
            count: repeat,
        })
    } else if let Some(range) = range.filter(|r| r.len() == best) {
        Some(range)
    } else {
        Some(ColumnRun::Toggle {
            first: first.clone(),
            second: second.clone(),
            count: toggle,
        })
    }
}

/// Arithmetic integer sequence starting at `cells[0]`.
fn integer_run(cells: &[&Scalar]) -> Option<ColumnRun> {
    let start = canonical_integer(cells.first()?)?;
    let step = canonical_integer(cells.get(1)?)?.checked_sub(start)?;
    if step == 0 {
        return None;
    }
    let mut previous = start;
    let mut count = 1;
    for cell in &cells[1..] {
        match (canonical_integer(cell), previous.checked_add(step)) {
            (Some(value), Some(expected)) if value == expected => {
                previous = value;
                count += 1;
            }
            _ => break,
        }
    }
    ColumnRun::range(start, step, count)
}

/// Whether writing `run` takes fewer bytes than writing its cells, counting
/// one separator per token.
fn pays_off(run: &ColumnRun, cells: &[&Scalar]) -> bool {
    let marker = run.marker().to_string().len() + 1;
    let operands = match run {
        ColumnRun::Repeat { value, .. } => encode_scalar(value).len() + 1,
        ColumnRun::Toggle { first, second, .. } => {
            encode_scalar(first).len() + encode_scalar(second).len() + 2
        }
        ColumnRun::Range { start, .. } => start.to_string().len() + 1,
    };
    let replaced: usize = cells[..run.len()]
        .iter()
        .map(|cell| encode_scalar(cell).len() + 1)
        .sum();
    marker + operands < replaced
}
