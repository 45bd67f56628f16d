//! Backends that hold the raw cell grid. Everything here is untyped: a store
//! is a set of named sheets of string cells addressed with A1 ranges.

pub mod auth;
pub mod local;
#[cfg(test)]
pub mod memory;
pub mod sheets;

use std::collections::BTreeMap;

use crate::a1::{Bounds, CellRange, InvalidRange};
use crate::schema::SchemaError;

pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSheet {
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

pub trait Grid: Send + Sync {
    /// Creates an empty store and returns its identifier.
    fn create_store(&self, title: &str) -> Result<String, GridError>;

    fn sheet_titles(&self, store_id: &str) -> Result<Vec<String>, GridError>;

    fn add_sheets(&self, store_id: &str, sheets: &[NewSheet]) -> Result<(), GridError>;

    /// Rows inside `range`, starting at its first row. Trailing empty cells
    /// and rows are dropped, so rows come back with varying lengths.
    fn read(&self, store_id: &str, range: &CellRange) -> Result<Vec<Row>, GridError>;

    /// Adds `rows` below the last non-empty row of the sheet.
    fn append(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError>;

    /// Writes `rows` starting at the top-left corner of `range`.
    fn write(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("grid store is not initialized")]
    Uninitialized,
    #[error("backing store rejected the request (status {status}): {message}")]
    Backend { status: u16, message: String },
    #[error("backing store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("credentials at '{path}' are unusable: {reason}")]
    Credentials { path: String, reason: String },
    #[error("access token error: {0}")]
    Token(String),
    #[error("unexpected response from backing store: {0}")]
    Decode(String),
    #[error("local grid error: {0}")]
    Local(#[from] rusqlite::Error),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl GridError {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, GridError::Uninitialized)
    }

    /// True when the remote side answered and refused.
    #[cfg(test)]
    pub fn is_backend(&self) -> bool {
        matches!(self, GridError::Backend { .. })
    }
}

/// Builds the dense, right-trimmed row list a read of `bounds` returns.
pub(crate) fn materialize<'a>(
    bounds: &Bounds,
    cells: impl IntoIterator<Item = (u32, u32, &'a str)>,
) -> Vec<Row> {
    let mut by_row: BTreeMap<u32, BTreeMap<u32, &str>> = BTreeMap::new();
    for (row, col, value) in cells {
        if value.is_empty() || !bounds.contains(row, col) {
            continue;
        }
        by_row.entry(row).or_default().insert(col, value);
    }

    let Some(last_row) = by_row.keys().next_back().copied() else {
        return Vec::new();
    };

    (bounds.first_row..=last_row)
        .map(|row| match by_row.get(&row) {
            Some(cols) => {
                let last_col = cols.keys().next_back().copied().unwrap_or(bounds.first_col);
                (bounds.first_col..=last_col)
                    .map(|col| cols.get(&col).map(|value| value.to_string()).unwrap_or_default())
                    .collect()
            }
            None => Vec::new(),
        })
        .collect()
}

/// Cell writes for `rows` placed at `(first_row, first_col)`.
pub(crate) fn placements(
    first_row: u32,
    first_col: u32,
    rows: &[Row],
) -> impl Iterator<Item = (u32, u32, &str)> {
    rows.iter().enumerate().flat_map(move |(row_offset, values)| {
        values.iter().enumerate().map(move |(col_offset, value)| {
            (
                first_row + row_offset as u32,
                first_col + col_offset as u32,
                value.as_str(),
            )
        })
    })
}
