//! Entity operations over the grid client. Every operation reads the live
//! table, resolves columns by header name and writes back the narrowest range
//! it can.

mod config;
mod feedback;
mod materials;
mod profiles;
mod quizzes;
mod scores;
mod sessions;
mod users;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::a1::CellRange;
use crate::client::GridClient;
use crate::grid::{GridError, Row};
use crate::schema::{cell, ColumnMap, SchemaError, Table};

pub use feedback::{NewCorrection, NewRecommendation};
pub use materials::NewMaterial;
pub use profiles::{ListField, MentorPatch, StudentPatch};
pub use quizzes::NewQuiz;
pub use scores::{NewScore, ScoreOutcome};
pub use sessions::NewSession;
pub use users::{NewUser, UserPatch};

/// One row projected to named fields.
pub type Record = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RepoError {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, RepoError::Grid(err) if err.is_uninitialized())
    }

    #[cfg(test)]
    pub fn is_backend(&self) -> bool {
        matches!(self, RepoError::Grid(err) if err.is_backend())
    }
}

/// Config-backed ID sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    User,
    Session,
    Material,
    Quiz,
    Score,
    Correction,
    Recommendation,
}

impl Counter {
    pub fn key(self) -> &'static str {
        match self {
            Counter::User => "USER_COUNTER",
            Counter::Session => "SESSION_COUNTER",
            Counter::Material => "MATERIAL_COUNTER",
            Counter::Quiz => "QUIZ_COUNTER",
            Counter::Score => "SCORE_COUNTER",
            Counter::Correction => "CORRECTION_COUNTER",
            Counter::Recommendation => "RECOMMENDATION_COUNTER",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Counter::User => "U_",
            Counter::Session => "S_",
            Counter::Material => "M_",
            Counter::Quiz => "Q_",
            Counter::Score => "SC_",
            Counter::Correction => "AC_",
            Counter::Recommendation => "R_",
        }
    }
}

/// A table as read by one `get_rows` call. Row 0 of `rows` is the header.
pub(crate) struct Snapshot {
    table: Table,
    key: String,
    columns: ColumnMap,
    rows: Vec<Row>,
}

impl Snapshot {
    /// Data rows with their 1-based sheet row number.
    fn data(&self) -> impl Iterator<Item = (u32, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, row)| (sheet_row(index), row))
    }

    /// First data row whose `field` equals `value`.
    fn locate(&self, field: &str, value: &str) -> Result<Option<(u32, &Row)>, SchemaError> {
        let index = self.columns.index(field)?;
        Ok(self.data().find(|(_, row)| cell(row, index) == value))
    }

    fn locate_key(&self, key: &str) -> Result<Option<(u32, &Row)>, SchemaError> {
        self.locate(&self.key, key)
    }

    fn matching(&self, field: &str, value: &str) -> Result<Vec<&Row>, SchemaError> {
        let index = self.columns.index(field)?;
        Ok(self
            .data()
            .filter(|(_, row)| cell(row, index) == value)
            .map(|(_, row)| row)
            .collect())
    }

    fn project_each(&self, rows: &[&Row], fields: &[&str]) -> Result<Vec<Record>, SchemaError> {
        rows.iter()
            .map(|row| self.columns.project(row, fields))
            .collect()
    }
}

fn sheet_row(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn column_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

pub struct Repository<'a> {
    client: &'a GridClient,
}

impl<'a> Repository<'a> {
    pub fn new(client: &'a GridClient) -> Self {
        Self { client }
    }

    pub(crate) fn snapshot(&self, table: Table) -> Result<Snapshot, RepoError> {
        let rows = self.client.get_rows(table, None)?;
        let header = rows.first().map(Vec::as_slice).unwrap_or_default();
        let columns = self.client.columns(table, header)?;
        Ok(Snapshot {
            table,
            key: self.client.schema().table(table).key().to_string(),
            columns,
            rows,
        })
    }

    /// Cached column map, for writes that do not read the table first.
    fn columns(&self, table: Table) -> Result<ColumnMap, RepoError> {
        Ok(self.client.columns(table, &[])?)
    }

    /// Writes one cell of an existing row.
    fn write_cell(
        &self,
        table: Table,
        row_number: u32,
        index: usize,
        value: &str,
    ) -> Result<(), RepoError> {
        let range = CellRange::cell(table.title(), column_number(index), row_number);
        self.client
            .update_range(table, &range, &[vec![value.to_string()]])?;
        Ok(())
    }

    /// Rewrites `row` in place from column A over its full length.
    fn rewrite_row(&self, table: Table, row_number: u32, row: Row) -> Result<(), RepoError> {
        let last = column_number(row.len().saturating_sub(1));
        let range = CellRange::row_span(table.title(), row_number, 1, last);
        self.client.update_range(table, &range, &[row])?;
        Ok(())
    }

    /// Appends a header-width row with `values` placed by column name and
    /// every other cell empty.
    fn append_fields(
        &self,
        columns: &ColumnMap,
        values: &[(&str, String)],
    ) -> Result<Row, RepoError> {
        let mut row = vec![String::new(); columns.width()];
        for (field, value) in values {
            row[columns.index(field)?] = value.clone();
        }
        self.client.append_row(columns.table(), row.clone())?;
        Ok(row)
    }

    /// Locate-or-Append on the key column. Found rows are rewritten over
    /// `max(row length, header length)` with only the `Some` fields replaced;
    /// otherwise a new row holds the key and the `Some` fields. Caller holds
    /// the table lock.
    fn upsert_locked(
        &self,
        table: Table,
        key: &str,
        fields: &[(&str, Option<String>)],
    ) -> Result<Row, RepoError> {
        let snapshot = self.snapshot(table)?;
        match snapshot.locate_key(key)? {
            Some((row_number, existing)) => {
                let mut row = existing.clone();
                row.resize(existing.len().max(snapshot.columns.width()), String::new());
                for (field, value) in fields {
                    if let Some(value) = value {
                        row[snapshot.columns.index(field)?] = value.clone();
                    }
                }
                debug!(table = table.title(), key, row = row_number, "rewriting row");
                self.rewrite_row(table, row_number, row.clone())?;
                Ok(row)
            }
            None => {
                let mut values = vec![(snapshot.key.as_str(), key.to_string())];
                values.extend(
                    fields
                        .iter()
                        .filter_map(|(field, value)| value.clone().map(|value| (*field, value))),
                );
                debug!(table = table.title(), key, "appending new row");
                self.append_fields(&snapshot.columns, &values)
            }
        }
    }

    /// Sets one field of the row keyed by `key`, touching only that cell.
    /// A missing row is appended with just the key and the field. Caller
    /// holds the table lock.
    fn set_field_locked(
        &self,
        snapshot: &Snapshot,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<(), RepoError> {
        let index = snapshot.columns.index(field)?;
        match snapshot.locate_key(key)? {
            Some((row_number, _)) => self.write_cell(snapshot.table, row_number, index, value),
            None => {
                self.append_fields(
                    &snapshot.columns,
                    &[(snapshot.key.as_str(), key.to_string()), (field, value.to_string())],
                )?;
                Ok(())
            }
        }
    }

    /// Next ID from a Config counter. A missing or non-numeric counter counts
    /// as 0.
    pub fn next_id(&self, counter: Counter) -> Result<String, RepoError> {
        let _config = self.client.lock(Table::Config);
        let snapshot = self.snapshot(Table::Config)?;
        let value_index = snapshot.columns.index("value")?;
        let current = match snapshot.locate("key", counter.key())? {
            Some((_, row)) => parse_counter(counter, cell(row, value_index)),
            None => 0,
        };
        let Some(next) = current.checked_add(1) else {
            warn!(counter = counter.key(), value = current, "counter is exhausted");
            return Err(RepoError::InvalidArgument(format!(
                "{} cannot advance past {current}",
                counter.key()
            )));
        };
        self.set_config_locked(&snapshot, counter.key(), &next.to_string())?;
        Ok(format!("{}{}", counter.prefix(), next))
    }
}

/// Blank lookup values are rejected; they would match every row whose cell
/// is missing.
fn require_value(field: &str, value: &str) -> Result<(), RepoError> {
    if value.trim().is_empty() {
        return Err(RepoError::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_counter(counter: Counter, raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    match raw.parse::<u64>() {
        Ok(value) => value,
        Err(err) => {
            warn!(counter = counter.key(), value = raw, error = %err, "counter is not a number; restarting from 0");
            0
        }
    }
}

/// Fields of `row` named in `fields`, reading absent cells as "".
fn project(columns: &ColumnMap, row: &[String], fields: &[&str]) -> Result<Record, RepoError> {
    Ok(columns.project(row, fields)?)
}
