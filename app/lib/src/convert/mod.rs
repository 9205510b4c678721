//! Structural models and the CSV/JSON parsers and renderers that produce
//! and consume them.
//!
//! A [`StructuralModel`] is built fresh for each call: CSV text becomes a
//! [`Table`], JSON text becomes a [`Tree`].

pub mod csv;
pub mod json;
mod tabular;
mod tree;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AlsError, Result};

pub use tabular::{Scalar, Table};
pub use tree::Tree;

/// Source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Comma-separated values
    Csv,
    /// JSON text
    Json,
}

impl SourceKind {
    /// Lowercase name used in ALS headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Json => "json",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AlsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(SourceKind::Csv),
            "json" => Ok(SourceKind::Json),
            other => Err(AlsError::InvalidConfig(format!(
                "unknown source kind '{}'",
                other
            ))),
        }
    }
}

/// In-memory structure of a parsed input.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralModel {
    /// Tabular model from CSV input
    Table(Table),
    /// Hierarchical model from JSON input
    Tree(Tree),
}

impl StructuralModel {
    /// Parse text of the given kind into a model.
    pub fn parse(kind: SourceKind, input: &str) -> Result<Self> {
        match kind {
            SourceKind::Csv => csv::parse_csv(input).map(StructuralModel::Table),
            SourceKind::Json => json::parse_json(input).map(StructuralModel::Tree),
        }
    }

    /// Source kind this model renders back to.
    pub fn kind(&self) -> SourceKind {
        match self {
            StructuralModel::Table(_) => SourceKind::Csv,
            StructuralModel::Tree(_) => SourceKind::Json,
        }
    }

    /// Render the model in its canonical text form.
    pub fn render(&self) -> Result<String> {
        match self {
            StructuralModel::Table(table) => csv::render_csv(table),
            StructuralModel::Tree(tree) => json::render_json(tree),
        }
    }
}
