use tracing::info;

use crate::clock::now_utc_rfc3339;
use crate::schema::{cell, Table};

use super::{project, Record, RepoError, Repository, Snapshot};

const CONFIG_FIELDS: [&str; 4] = ["key", "value", "description", "updated_at"];

impl Repository<'_> {
    /// Value stored for `key`, or `None` when Config has no such row.
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, RepoError> {
        let snapshot = self.snapshot(Table::Config)?;
        let value_index = snapshot.columns.index("value")?;
        Ok(snapshot
            .locate_key(key)?
            .map(|(_, row)| cell(row, value_index).to_string()))
    }

    pub fn set_config_value(&self, key: &str, value: &str) -> Result<Record, RepoError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepoError::InvalidArgument("config key must not be empty".to_string()));
        }
        let _config = self.client.lock(Table::Config);
        let snapshot = self.snapshot(Table::Config)?;
        let row = self.set_config_locked(&snapshot, key, value)?;
        info!(key, "config value updated");
        project(&snapshot.columns, &row, &CONFIG_FIELDS)
    }

    pub fn list_config(&self) -> Result<Vec<Record>, RepoError> {
        let snapshot = self.snapshot(Table::Config)?;
        let rows: Vec<_> = snapshot.data().map(|(_, row)| row).collect();
        Ok(snapshot.project_each(&rows, &CONFIG_FIELDS)?)
    }

    /// Overwrites `value` and `updated_at` of the row for `key`, keeping its
    /// description, or appends a new row. Caller holds the Config lock.
    pub(super) fn set_config_locked(
        &self,
        snapshot: &Snapshot,
        key: &str,
        value: &str,
    ) -> Result<Vec<String>, RepoError> {
        let columns = &snapshot.columns;
        let stamp = now_utc_rfc3339();
        match snapshot.locate_key(key)? {
            Some((row_number, existing)) => {
                let mut row = existing.clone();
                row.resize(existing.len().max(columns.width()), String::new());
                row[columns.index("value")?] = value.to_string();
                row[columns.index("updated_at")?] = stamp;
                self.rewrite_row(Table::Config, row_number, row.clone())?;
                Ok(row)
            }
            None => self.append_fields(
                columns,
                &[
                    ("key", key.to_string()),
                    ("value", value.to_string()),
                    ("updated_at", stamp),
                ],
            ),
        }
    }
}
