//! In-memory table model for spreadsheet imports.
//!
//! The workbook is decoded once with `calamine` into a [`Sheet`]: a trimmed header
//! row plus data rows of [`Cell`]s. Everything downstream (row parsing, structural
//! checks) works on this model, so it can be exercised without an `.xlsx` file.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use thiserror::Error;

/// Cell
///
/// A single decoded spreadsheet value. Dates and formula errors are kept as text.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// Empty cells and whitespace-only strings count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display form used in messages and for non-text cells in text columns.
    /// Whole floats lose their fractional part (`12345.0` -> `12345`).
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            Cell::Float(v) => v.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(v) => v.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => Cell::Empty,
            Data::Int(v) => Cell::Int(*v),
            Data::Float(v) => Cell::Float(*v),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(v) => Cell::Bool(*v),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

/// Sheet
///
/// Header row plus data rows. Columns are addressed by header name.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    index: HashMap<String, usize>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let mut index = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if !header.is_empty() {
                // First occurrence wins for duplicated headers.
                index.entry(header.clone()).or_insert(i);
            }
        }
        Self {
            headers,
            rows,
            index,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Required columns absent from the header row, in the order given.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.has_column(name))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Failed to read Excel file: {0}")]
    Unreadable(String),

    #[error("Excel file has no worksheets")]
    NoWorksheet,

    #[error("Excel file is empty")]
    NoHeaderRow,
}

/// read_workbook
///
/// Decodes `.xlsx`/`.xls` bytes and returns the first worksheet as a [`Sheet`].
/// The first non-empty row of the used range is the header row.
pub fn read_workbook(bytes: &[u8]) -> Result<Sheet, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::NoWorksheet)?;

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(SheetError::NoHeaderRow)?;
    let headers = header_row
        .iter()
        .map(|cell| Cell::from(cell).render())
        .collect();

    let data = rows
        .map(|row| row.iter().map(Cell::from).collect())
        .collect();

    Ok(Sheet::new(headers, data))
}
