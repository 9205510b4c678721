//! CSV parsing and rendering.
//!
//! The first record is the header. Fields are kept as strings; no type
//! inference happens here.

use crate::convert::{Scalar, Table};
use crate::error::{AlsError, Result};

/// Parse CSV text into a [`Table`].
///
/// # Errors
///
/// Returns [`AlsError::MalformedCsv`] if the input is empty, the header has
/// no columns or a duplicate name, or any data row has a different field
/// count than the header.
///
/// # Examples
///
/// ```
/// use als_codec::convert::csv::parse_csv;
///
/// let table = parse_csv("id,name\n1,Alice\n2,Bob").unwrap();
/// assert_eq!(table.column_count(), 2);
/// assert_eq!(table.row_count(), 2);
/// ```
pub fn parse_csv(input: &str) -> Result<Table> {
    if input.is_empty() {
        return Err(AlsError::MalformedCsv {
            line: 1,
            message: "input is empty".to_string(),
        });
    }

    // Field counts are checked below so the error carries our line numbers.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| csv_error(&e, "failed to read header"))?;
    let mut table = Table::new(headers.iter().map(String::from).collect())?;

    for result in reader.records() {
        let record = result.map_err(|e| csv_error(&e, "failed to read record"))?;
        if record.len() != table.column_count() {
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            return Err(AlsError::MalformedCsv {
                line,
                message: format!(
                    "expected {} fields, found {}",
                    table.column_count(),
                    record.len()
                ),
            });
        }
        table.push_row(record.iter().map(Scalar::from).collect())?;
    }

    Ok(table)
}

/// Render a [`Table`] as CSV text.
///
/// Emits the header followed by every row in stored order. Quoting is
/// applied only where a field needs it, and every record ends with `\n`.
///
/// # Examples
///
/// ```
/// use als_codec::convert::csv::{parse_csv, render_csv};
///
/// let table = parse_csv("id,note\n1,\"a, b\"").unwrap();
/// assert_eq!(render_csv(&table).unwrap(), "id,note\n1,\"a, b\"\n");
/// ```
pub fn render_csv(table: &Table) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(table.columns())
        .map_err(|e| AlsError::Internal(format!("failed to write CSV header: {}", e)))?;

    for row in table.rows() {
        let fields: Vec<_> = row.iter().map(Scalar::as_field).collect();
        writer
            .write_record(fields.iter().map(|f| f.as_bytes()))
            .map_err(|e| AlsError::Internal(format!("failed to write CSV record: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AlsError::Internal(format!("failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AlsError::Internal(format!("CSV output: {}", e)))
}

fn csv_error(err: &csv::Error, context: &str) -> AlsError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(1);
    AlsError::MalformedCsv {
        line,
        message: format!("{}: {}", context, err),
    }
}
