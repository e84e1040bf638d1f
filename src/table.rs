//! # Tabular input
//!
//! A [`Table`] is the immutable, column-oriented view of one uploaded CSV
//! file.  Every cell is classified once at load time into a [`Datum`] so the
//! comparison code never re-parses text:
//!
//! * empty cells and the usual spreadsheet NA spellings become
//!   [`Datum::Missing`];
//! * anything that parses as a finite `f64` becomes [`Datum::Number`];
//! * everything else is kept verbatim as [`Datum::Text`].
//!
//! Column names come from the header row.  A UTF-8 byte-order mark in front of
//! the header is dropped (spreadsheet exports on Windows add one).

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info};

/// Tokens read as a missing value, in addition to the empty string.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors raised while turning a CSV file into a [`Table`].
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("the file has no header row")]
    NoHeader,

    #[error("column `{0}` appears more than once in the header")]
    DuplicateColumn(String),

    #[error("column `{name}` has {got} values, expected {expected}")]
    RaggedColumn {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("the file contains a header but no data rows")]
    Empty,
}

/// One classified cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Missing,
    Number(f64),
    Text(String),
}

impl Datum {
    /// Classifies a raw (already trimmed) CSV field.
    pub fn parse(raw: &str) -> Datum {
        let raw = raw.trim();
        if raw.is_empty() || NA_TOKENS.contains(&raw) {
            return Datum::Missing;
        }
        match raw.parse::<f64>() {
            // `-0` and `0` must label the same group.
            Ok(v) if v == 0.0 => Datum::Number(0.0),
            Ok(v) if v.is_finite() => Datum::Number(v),
            _ => Datum::Text(raw.to_string()),
        }
    }

    /// The numeric value, if this cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The cell rendered as a group label; `None` for missing cells.
    pub fn label(&self) -> Option<String> {
        match self {
            Datum::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Missing => write!(f, ""),
            Datum::Number(v) => write!(f, "{}", v),
            Datum::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named column of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    cells: Vec<Datum>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Datum>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Datum] {
        &self.cells
    }

    /// Finite numeric values of the column in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.cells.iter().filter_map(Datum::as_f64).collect()
    }
}

/// An ordered collection of equal-length named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Builds a table from already classified columns.
    ///
    /// Column names must be unique and every column must have the same
    /// length.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let n_rows = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
            if col.cells.len() != n_rows {
                return Err(TableError::RaggedColumn {
                    name: col.name.clone(),
                    got: col.cells.len(),
                    expected: n_rows,
                });
            }
        }
        Ok(Table { columns, n_rows })
    }

    /// Parses CSV from any reader.  The first record is the header.
    pub fn from_reader<R: Read>(mut reader: R, delimiter: u8) -> Result<Self, TableError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(body);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(TableError::NoHeader);
        }

        let mut cells: Vec<Vec<Datum>> = vec![Vec::new(); headers.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (col, field) in cells.iter_mut().zip(record.iter()) {
                col.push(Datum::parse(field));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::new(name, cells))
            .collect();
        let table = Table::new(columns)?;
        if table.n_rows == 0 {
            return Err(TableError::Empty);
        }
        debug!(
            "parsed table with {} columns and {} rows",
            table.n_columns(),
            table.n_rows
        );
        Ok(table)
    }

    /// Opens and parses a CSV file.
    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, TableError> {
        let path = path.as_ref();
        let table = Self::from_reader(File::open(path)?, delimiter)?;
        info!(
            "loaded {} ({} rows, columns: {})",
            path.display(),
            table.n_rows,
            table.column_names().collect::<Vec<_>>().join(", ")
        );
        Ok(table)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Cells of row `idx` across all columns, or `None` past the end.
    pub fn row(&self, idx: usize) -> Option<Vec<&Datum>> {
        if idx >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[idx]).collect())
    }
}
