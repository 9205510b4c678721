//! Tabular data model.
//!
//! This module defines [`Table`], the structural model produced from CSV
//! input, and [`Scalar`], the value stored in each cell.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde_json::Number;

use crate::error::{AlsError, Result};

/// A single scalar value.
///
/// CSV parsing only ever produces [`Scalar::String`]; the other variants
/// exist so JSON leaves and table cells share one token encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number, kept in JSON number form
    Number(Number),
    /// String value
    String(String),
}

impl Scalar {
    /// Text form of this value as it appears in a CSV field.
    ///
    /// Null renders as an empty field.
    pub fn as_field(&self) -> Cow<'_, str> {
        match self {
            Scalar::Null => Cow::Borrowed(""),
            Scalar::Bool(true) => Cow::Borrowed("true"),
            Scalar::Bool(false) => Cow::Borrowed("false"),
            Scalar::Number(n) => Cow::Owned(n.to_string()),
            Scalar::String(s) => Cow::Borrowed(s),
        }
    }

    /// Returns the string content if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_field())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

/// Row-oriented table with a fixed, ordered set of uniquely named columns.
///
/// Every row holds exactly one value per column, in column order. The
/// constructors enforce this, so a `Table` never holds a ragged row.
///
/// # Examples
///
/// ```
/// use als_codec::convert::{Scalar, Table};
///
/// let mut table = Table::new(vec!["id".into(), "name".into()]).unwrap();
/// table.push_row(vec![Scalar::from("1"), Scalar::from("Alice")]).unwrap();
///
/// assert_eq!(table.row_count(), 1);
/// assert_eq!(table.get(0, "name"), Some(&Scalar::from("Alice")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// Create an empty table with the given column names.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::MalformedCsv`] if there are no columns or a name
    /// appears twice.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(AlsError::MalformedCsv {
                line: 1,
                message: "header row has no columns".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(AlsError::MalformedCsv {
                    line: 1,
                    message: format!("duplicate column name '{}'", name),
                });
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`AlsError::MalformedCsv`] if the row length differs from the
    /// column count. The reported line assumes one header line.
    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(AlsError::MalformedCsv {
                line: self.rows.len() + 2,
                message: format!(
                    "expected {} fields, found {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in declared order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in stored order.
    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Scalar> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[index])
    }
}
