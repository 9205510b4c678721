//! Column runs.
//!
//! A column run replaces a vertical stretch of cells in one table column
//! with a single marker token and its operands, written where the run
//! starts. The rows it covers afterwards carry no token for that column.
//!
//! | Marker | Operands | Cells |
//! |--------|----------|-------|
//! | `*N` | `v` | `v` repeated N times |
//! | `~N` | `a b` | `a b a b ...`, N cells |
//! | `>N` | `s` | integers `s, s+1, ...`, N cells |
//! | `>N:d` | `s` | integers `s, s+d, ...`, N cells |
//!
//! Range cells are the decimal text of each integer, so only columns
//! holding canonical integer strings (`7`, `-3`, never `07` or `+3`) form
//! ranges.

use std::fmt;

use crate::convert::Scalar;

/// Opening token of a column run, as it appears in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMarker {
    /// `*N`
    Repeat(usize),
    /// `~N`
    Toggle(usize),
    /// `>N` or `>N:d`
    Range {
        /// Number of cells
        count: usize,
        /// Difference between neighbouring cells, never zero
        step: i64,
    },
}

impl RunMarker {
    /// Number of cells the run covers.
    pub fn count(&self) -> usize {
        match *self {
            RunMarker::Repeat(count) | RunMarker::Toggle(count) => count,
            RunMarker::Range { count, .. } => count,
        }
    }

    /// Number of operand tokens following the marker.
    pub fn operands(&self) -> usize {
        match self {
            RunMarker::Toggle(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for RunMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RunMarker::Repeat(count) => write!(f, "*{}", count),
            RunMarker::Toggle(count) => write!(f, "~{}", count),
            RunMarker::Range { count, step: 1 } => write!(f, ">{}", count),
            RunMarker::Range { count, step } => write!(f, ">{}:{}", count, step),
        }
    }
}

/// A decoded column run.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRun {
    /// One value repeated
    Repeat {
        /// Repeated value
        value: Scalar,
        /// Number of cells
        count: usize,
    },
    /// Two distinct values alternating, starting with `first`
    Toggle {
        /// Value of even cells
        first: Scalar,
        /// Value of odd cells
        second: Scalar,
        /// Number of cells
        count: usize,
    },
    /// Arithmetic sequence of integers
    Range {
        /// First integer
        start: i64,
        /// Difference between neighbouring cells
        step: i64,
        /// Number of cells
        count: usize,
    },
}

impl ColumnRun {
    /// Build a range, or `None` if it would leave the `i64` domain or has a
    /// zero step or fewer than two cells.
    pub fn range(start: i64, step: i64, count: usize) -> Option<Self> {
        if step == 0 || count < 2 {
            return None;
        }
        let last = i64::try_from(count - 1).ok()?;
        step.checked_mul(last)?.checked_add(start)?;
        Some(ColumnRun::Range { start, step, count })
    }

    /// Number of cells the run covers.
    pub fn len(&self) -> usize {
        match *self {
            ColumnRun::Repeat { count, .. }
            | ColumnRun::Toggle { count, .. }
            | ColumnRun::Range { count, .. } => count,
        }
    }

    /// Whether the run covers no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marker token opening this run.
    pub fn marker(&self) -> RunMarker {
        match *self {
            ColumnRun::Repeat { count, .. } => RunMarker::Repeat(count),
            ColumnRun::Toggle { count, .. } => RunMarker::Toggle(count),
            ColumnRun::Range { step, count, .. } => RunMarker::Range { count, step },
        }
    }

    /// Value of cell `index`, or `None` past the end of the run.
    pub fn value_at(&self, index: usize) -> Option<Scalar> {
        if index >= self.len() {
            return None;
        }
        let value = match self {
            ColumnRun::Repeat { value, .. } => value.clone(),
            ColumnRun::Toggle { first, second, .. } => {
                if index % 2 == 0 {
                    first.clone()
                } else {
                    second.clone()
                }
            }
            ColumnRun::Range { start, step, .. } => {
                // In range: `ColumnRun::range` checked the last cell.
                let offset = i64::try_from(index).ok()?;
                Scalar::String(step.checked_mul(offset)?.checked_add(*start)?.to_string())
            }
        };
        Some(value)
    }
}

/// Integer a cell holds when it is written in canonical decimal form.
pub fn canonical_integer(value: &Scalar) -> Option<i64> {
    match value {
        Scalar::String(text) => text.parse::<i64>().ok().filter(|n| n.to_string() == *text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(run: &ColumnRun) -> Vec<Scalar> {
        (0..run.len()).filter_map(|i| run.value_at(i)).collect()
    }

    #[test]
    fn test_marker_text() {
        assert_eq!(RunMarker::Repeat(4).to_string(), "*4");
        assert_eq!(RunMarker::Toggle(6).to_string(), "~6");
        assert_eq!(RunMarker::Range { count: 5, step: 1 }.to_string(), ">5");
        assert_eq!(RunMarker::Range { count: 5, step: -10 }.to_string(), ">5:-10");
    }

    #[test]
    fn test_expansion() {
        let toggle = ColumnRun::Toggle {
            first: Scalar::from("T"),
            second: Scalar::from("F"),
            count: 3,
        };
        assert_eq!(cells(&toggle), vec![Scalar::from("T"), Scalar::from("F"), Scalar::from("T")]);

        let range = ColumnRun::range(10, -5, 4).unwrap();
        assert_eq!(
            cells(&range),
            vec![Scalar::from("10"), Scalar::from("5"), Scalar::from("0"), Scalar::from("-5")]
        );
        assert_eq!(range.value_at(4), None);
    }

    #[test]
    fn test_range_bounds() {
        assert!(ColumnRun::range(i64::MAX - 2, 1, 3).is_some());
        assert!(ColumnRun::range(i64::MAX - 2, 1, 4).is_none());
        assert!(ColumnRun::range(0, 0, 4).is_none());
        assert!(ColumnRun::range(0, 1, 1).is_none());
    }

    #[test]
    fn test_canonical_integer() {
        assert_eq!(canonical_integer(&Scalar::from("42")), Some(42));
        assert_eq!(canonical_integer(&Scalar::from("-7")), Some(-7));
        for text in ["07", "+3", "-0", "1.0", "", "x"] {
            assert_eq!(canonical_integer(&Scalar::from(text)), None, "{:?}", text);
        }
        assert_eq!(canonical_integer(&Scalar::Number(3.into())), None);
    }
}
