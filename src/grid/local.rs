use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Transaction};
use tracing::debug;

use crate::a1::CellRange;
use crate::clock::now_utc_rfc3339;

use super::{materialize, placements, Grid, GridError, NewSheet, Row};

/// A local grid file holds exactly one store.
pub const LOCAL_STORE_ID: &str = "local";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS store (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sheet (
    store_id TEXT NOT NULL,
    title TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    column_count INTEGER NOT NULL,
    PRIMARY KEY (store_id, title)
);

CREATE TABLE IF NOT EXISTS cell (
    store_id TEXT NOT NULL,
    sheet TEXT NOT NULL,
    row INTEGER NOT NULL,
    col INTEGER NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (store_id, sheet, row, col)
);
"#;

/// Grid persisted in a SQLite file, for running without a remote service.
pub struct LocalGrid {
    conn: Mutex<Connection>,
}

impl LocalGrid {
    pub fn open(path: &Path) -> Result<Self, GridError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| GridError::Credentials {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        }
        let conn = Connection::open(path)?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA_SQL)?;
        debug!(path = %path.display(), "opened local grid");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn require_sheet(conn: &Connection, store_id: &str, sheet: &str) -> Result<(), GridError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sheet WHERE store_id = ?1 AND title = ?2",
            params![store_id, sheet],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(GridError::Backend {
            status: 400,
            message: format!("Unable to parse range: sheet '{sheet}' not found"),
        }),
    }
}

fn last_used_row(tx: &Transaction<'_>, store_id: &str, sheet: &str) -> rusqlite::Result<u32> {
    tx.query_row(
        "SELECT COALESCE(MAX(row), 0) FROM cell WHERE store_id = ?1 AND sheet = ?2",
        params![store_id, sheet],
        |row| row.get(0),
    )
}

fn put_cells(
    tx: &Transaction<'_>,
    store_id: &str,
    sheet: &str,
    first_row: u32,
    first_col: u32,
    rows: &[Row],
) -> rusqlite::Result<()> {
    let mut upsert = tx.prepare(
        r#"
INSERT INTO cell (store_id, sheet, row, col, value)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(store_id, sheet, row, col) DO UPDATE SET value = excluded.value
"#,
    )?;
    let mut clear = tx.prepare(
        "DELETE FROM cell WHERE store_id = ?1 AND sheet = ?2 AND row = ?3 AND col = ?4",
    )?;
    for (row, col, value) in placements(first_row, first_col, rows) {
        if value.is_empty() {
            clear.execute(params![store_id, sheet, row, col])?;
        } else {
            upsert.execute(params![store_id, sheet, row, col, value])?;
        }
    }
    Ok(())
}

impl Grid for LocalGrid {
    fn create_store(&self, title: &str) -> Result<String, GridError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO store (id, title, created_at) VALUES (?1, ?2, ?3) ON CONFLICT(id) DO NOTHING",
            params![LOCAL_STORE_ID, title, now_utc_rfc3339()],
        )?;
        Ok(LOCAL_STORE_ID.to_string())
    }

    fn sheet_titles(&self, store_id: &str) -> Result<Vec<String>, GridError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT title FROM sheet WHERE store_id = ?1 ORDER BY title")?;
        let mut rows = stmt.query(params![store_id])?;
        let mut titles = Vec::new();
        while let Some(row) = rows.next()? {
            titles.push(row.get(0)?);
        }
        Ok(titles)
    }

    fn add_sheets(&self, store_id: &str, sheets: &[NewSheet]) -> Result<(), GridError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for sheet in sheets {
            tx.execute(
                "INSERT INTO sheet (store_id, title, row_count, column_count) VALUES (?1, ?2, ?3, ?4)",
                params![store_id, sheet.title, sheet.row_count, sheet.column_count],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn read(&self, store_id: &str, range: &CellRange) -> Result<Vec<Row>, GridError> {
        let conn = self.conn();
        require_sheet(&conn, store_id, &range.sheet)?;
        let bounds = range.bounds();
        let mut stmt = conn.prepare(
            r#"
SELECT row, col, value
FROM cell
WHERE store_id = ?1 AND sheet = ?2 AND row >= ?3 AND col >= ?4
ORDER BY row, col
"#,
        )?;
        let mut rows = stmt.query(params![store_id, range.sheet, bounds.first_row, bounds.first_col])?;
        let mut cells: Vec<(u32, u32, String)> = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push((row.get(0)?, row.get(1)?, row.get(2)?));
        }
        Ok(materialize(
            &bounds,
            cells.iter().map(|(row, col, value)| (*row, *col, value.as_str())),
        ))
    }

    fn append(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let mut conn = self.conn();
        require_sheet(&conn, store_id, &range.sheet)?;
        let bounds = range.bounds();
        let tx = conn.transaction()?;
        let next_row = (last_used_row(&tx, store_id, &range.sheet)? + 1).max(bounds.first_row);
        put_cells(&tx, store_id, &range.sheet, next_row, bounds.first_col, rows)?;
        tx.commit()?;
        Ok(())
    }

    fn write(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let mut conn = self.conn();
        require_sheet(&conn, store_id, &range.sheet)?;
        let bounds = range.bounds();
        let tx = conn.transaction()?;
        put_cells(&tx, store_id, &range.sheet, bounds.first_row, bounds.first_col, rows)?;
        tx.commit()?;
        Ok(())
    }
}
