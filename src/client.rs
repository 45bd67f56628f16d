use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::a1::CellRange;
use crate::clock::now_utc_rfc3339;
use crate::grid::local::LocalGrid;
use crate::grid::sheets::SheetsGrid;
use crate::grid::{Grid, GridError, NewSheet, Row};
use crate::schema::{ColumnMap, SchemaError, SchemaRegistry, Table, DEFAULT_ROW_CAPACITY};
use crate::settings::{Backend, Settings};

/// Right-most column a default table read covers (`A1:Z`).
pub const DEFAULT_READ_COLUMNS: u32 = 26;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InitOutcome {
    Ready { store_id: String, created: bool },
    Skipped,
}

struct Session {
    grid: Arc<dyn Grid>,
    store_id: String,
    columns: RwLock<BTreeMap<Table, ColumnMap>>,
}

/// Owns the connection to the grid store. Connects at most once per process;
/// every data operation before that fails with `GridError::Uninitialized`.
pub struct GridClient {
    settings: Settings,
    schema: SchemaRegistry,
    session: OnceLock<Session>,
    /// Store this process created but has not finished provisioning.
    pending_store: Mutex<Option<String>>,
    table_locks: [Mutex<()>; Table::COUNT],
}

impl GridClient {
    pub fn new(settings: Settings, schema: SchemaRegistry) -> Self {
        Self {
            settings,
            schema,
            session: OnceLock::new(),
            pending_store: Mutex::new(None),
            table_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn is_initialized(&self) -> bool {
        self.session.get().is_some()
    }

    pub fn store_id(&self) -> Result<&str, GridError> {
        Ok(&self.session()?.store_id)
    }

    /// Connects with the configured backend and provisions the store.
    /// Returns `Skipped` when no credential location is configured.
    pub fn initialize(&self) -> Result<InitOutcome, GridError> {
        if let Some(session) = self.session.get() {
            return self.reprovision(session);
        }

        let Some(credentials) = self.settings.credentials.as_deref() else {
            warn!("no credential location configured; grid client not initialized");
            return Ok(InitOutcome::Skipped);
        };
        let grid: Arc<dyn Grid> = match self.settings.backend {
            Backend::Sheets => Arc::new(SheetsGrid::connect(credentials)?),
            Backend::Local => Arc::new(LocalGrid::open(credentials)?),
        };
        self.initialize_with(grid)
    }

    /// Like `initialize` over an already connected grid. `grid` is dropped
    /// unused when another caller finished connecting first.
    pub fn initialize_with(&self, grid: Arc<dyn Grid>) -> Result<InitOutcome, GridError> {
        let mut pending = self.pending_store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = self.session.get() {
            return self.reprovision(session);
        }
        self.start(&mut pending, grid)
    }

    fn reprovision(&self, session: &Session) -> Result<InitOutcome, GridError> {
        self.provision(session)?;
        Ok(InitOutcome::Ready {
            store_id: session.store_id.clone(),
            created: false,
        })
    }

    /// Initialization boundary that never fails the caller. Failures are
    /// logged and leave the client uninitialized.
    pub fn initialize_or_log(&self) -> bool {
        match self.initialize() {
            Ok(InitOutcome::Ready { .. }) => true,
            Ok(InitOutcome::Skipped) => false,
            Err(err) => {
                error!(error = %err, backend = ?self.settings.backend, "grid store initialization failed");
                false
            }
        }
    }

    fn start(
        &self,
        pending: &mut Option<String>,
        grid: Arc<dyn Grid>,
    ) -> Result<InitOutcome, GridError> {
        let (store_id, created) = match (&self.settings.store_id, pending.as_ref()) {
            (Some(configured), _) => (configured.clone(), false),
            (None, Some(earlier)) => (earlier.clone(), true),
            (None, None) => {
                let store_id = grid.create_store(&self.settings.store_title)?;
                info!(store_id = %store_id, title = %self.settings.store_title, "created grid store");
                *pending = Some(store_id.clone());
                (store_id, true)
            }
        };

        let session = Session {
            grid,
            store_id,
            columns: RwLock::new(BTreeMap::new()),
        };
        self.provision(&session)?;
        let store_id = session.store_id.clone();
        if self.session.set(session).is_err() {
            debug!("grid session already set");
        }
        Ok(InitOutcome::Ready { store_id, created })
    }

    fn provision(&self, session: &Session) -> Result<(), GridError> {
        let store_id = session.store_id.as_str();
        let existing: BTreeSet<String> = session.grid.sheet_titles(store_id)?.into_iter().collect();
        let missing: Vec<NewSheet> = self
            .schema
            .tables()
            .filter(|(_, schema)| !existing.contains(&schema.title))
            .map(|(_, schema)| NewSheet {
                title: schema.title.clone(),
                row_count: DEFAULT_ROW_CAPACITY,
                column_count: schema.column_capacity(),
            })
            .collect();
        if !missing.is_empty() {
            session.grid.add_sheets(store_id, &missing)?;
            for sheet in &missing {
                info!(table = %sheet.title, columns = sheet.column_count, "added table");
            }
        }

        let mut resolved = BTreeMap::new();
        for (table, schema) in self.schema.tables() {
            let mut header = session
                .grid
                .read(store_id, &CellRange::whole_row(&schema.title, 1))?
                .into_iter()
                .next()
                .unwrap_or_default();
            if header.iter().all(|cell| cell.trim().is_empty()) {
                let last_col = u32::try_from(schema.width()).unwrap_or(u32::MAX);
                let range = CellRange::row_span(&schema.title, 1, 1, last_col);
                session
                    .grid
                    .write(store_id, &range, std::slice::from_ref(&schema.headers))?;
                info!(table = %schema.title, "wrote header row");
                header = schema.headers.clone();
            }
            resolved.insert(table, ColumnMap::resolve(table, schema, &header)?);
        }

        self.seed_config(session, &resolved[&Table::Config])?;
        *session.columns.write().unwrap_or_else(PoisonError::into_inner) = resolved;
        Ok(())
    }

    fn seed_config(&self, session: &Session, columns: &ColumnMap) -> Result<(), GridError> {
        let title = Table::Config.title();
        let first_data = CellRange::parse_in(title, "A2:D2")?;
        let existing = session.grid.read(&session.store_id, &first_data)?;
        if existing.iter().any(|row| row.iter().any(|cell| !cell.is_empty())) {
            return Ok(());
        }
        let seeds = self.schema.config_seeds();
        if seeds.is_empty() {
            return Ok(());
        }

        let stamp = now_utc_rfc3339();
        let mut rows = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let mut row = vec![String::new(); columns.width()];
            row[columns.index("key")?] = seed.key.clone();
            row[columns.index("value")?] = seed.value.clone();
            row[columns.index("description")?] = seed.description.clone();
            row[columns.index("updated_at")?] = stamp.clone();
            rows.push(row);
        }
        session
            .grid
            .append(&session.store_id, &CellRange::parse_in(title, "A2")?, &rows)?;
        info!(entries = rows.len(), "seeded default config");
        Ok(())
    }

    fn session(&self) -> Result<&Session, GridError> {
        self.session.get().ok_or(GridError::Uninitialized)
    }

    /// Serializes read-modify-write sequences on one table. Callers that need
    /// Config and another table take Config first.
    pub fn lock(&self, table: Table) -> MutexGuard<'_, ()> {
        self.table_locks[table.ordinal()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_row(&self, table: Table, row: Row) -> Result<(), GridError> {
        let session = self.session()?;
        let range = CellRange::whole_column(table.title(), 1);
        debug!(table = table.title(), range = %range, width = row.len(), "append row");
        session
            .grid
            .append(&session.store_id, &range, &[row])
            .inspect_err(|err| error!(table = table.title(), error = %err, "append failed"))
    }

    /// Rows of `table` from row 1, header first. `range` overrides the
    /// default `A1:Z`.
    pub fn get_rows(&self, table: Table, range: Option<&CellRange>) -> Result<Vec<Row>, GridError> {
        let session = self.session()?;
        let default_range;
        let range = match range {
            Some(range) => range,
            None => {
                default_range = CellRange::columns_from_top(table.title(), DEFAULT_READ_COLUMNS);
                &default_range
            }
        };
        debug!(table = table.title(), range = %range, "read rows");
        session
            .grid
            .read(&session.store_id, range)
            .inspect_err(|err| error!(table = table.title(), range = %range, error = %err, "read failed"))
    }

    pub fn update_range(&self, table: Table, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let session = self.session()?;
        debug!(table = table.title(), range = %range, "update range");
        session
            .grid
            .write(&session.store_id, range, rows)
            .inspect_err(|err| error!(table = table.title(), range = %range, error = %err, "update failed"))
    }

    /// Column map for `table`, re-resolved when the live header row no longer
    /// matches the cached one. An empty live header keeps the cached map.
    pub fn columns(&self, table: Table, live_header: &[String]) -> Result<ColumnMap, GridError> {
        let session = self.session()?;
        {
            let cached = session.columns.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(columns) = cached.get(&table) {
                if live_header.is_empty() || header_matches(columns.header(), live_header) {
                    return Ok(columns.clone());
                }
            }
        }

        let schema = self.schema.table(table);
        let header = if live_header.is_empty() {
            schema.headers.as_slice()
        } else {
            live_header
        };
        let columns = ColumnMap::resolve(table, schema, header).map_err(|err: SchemaError| {
            error!(table = table.title(), error = %err, "header row no longer matches table definition");
            err
        })?;
        warn!(table = table.title(), "header row changed; column positions re-resolved");
        session
            .columns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table, columns.clone());
        Ok(columns)
    }
}

/// Default reads stop at column Z, so only that prefix of the cached header
/// is visible to them.
fn header_matches(cached: &[String], live: &[String]) -> bool {
    let visible = cached.len().min(DEFAULT_READ_COLUMNS as usize);
    cached == live || cached[..visible] == *live
}

#[cfg(test)]
mod tests;
