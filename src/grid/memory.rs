use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::a1::CellRange;

use super::{materialize, placements, Grid, GridError, NewSheet, Row};

/// Sparse cells of one sheet keyed by 1-based `(row, col)`. Empty values are
/// never stored.
type CellMap = BTreeMap<(u32, u32), String>;

fn apply_placements<'a>(cells: &mut CellMap, writes: impl IntoIterator<Item = (u32, u32, &'a str)>) {
    for (row, col, value) in writes {
        if value.is_empty() {
            cells.remove(&(row, col));
        } else {
            cells.insert((row, col), value.to_string());
        }
    }
}

fn last_used_row(cells: &CellMap) -> u32 {
    cells.keys().map(|(row, _)| *row).max().unwrap_or(0)
}

/// Remote call as seen by the grid, with the range rendered in A1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCall {
    CreateStore(String),
    SheetTitles,
    AddSheets(Vec<String>),
    Read(String),
    Append(String, Vec<Row>),
    Write(String, Vec<Row>),
}

#[derive(Debug, Default)]
struct State {
    stores: BTreeMap<String, BTreeMap<String, CellMap>>,
    calls: Vec<GridCall>,
    fail_with: Option<(u16, String)>,
    created: usize,
}

/// In-process grid used by unit tests. Records every call and can be told to
/// reject requests like a remote service would.
#[derive(Debug, Default)]
pub struct MemoryGrid {
    state: Mutex<State>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store_id: &str) -> Self {
        let grid = Self::new();
        grid.lock().stores.insert(store_id.to_string(), BTreeMap::new());
        grid
    }

    pub fn calls(&self) -> Vec<GridCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn fail_requests(&self, status: u16, message: &str) {
        self.lock().fail_with = Some((status, message.to_string()));
    }

    pub fn stores_created(&self) -> usize {
        self.lock().created
    }

    /// Direct sheet access that bypasses the call log.
    pub fn sheet_rows(&self, store_id: &str, sheet: &str) -> Vec<Row> {
        let state = self.lock();
        let Some(cells) = state.stores.get(store_id).and_then(|store| store.get(sheet)) else {
            return Vec::new();
        };
        let range = CellRange::parse_in(sheet, "A1:ZZ").expect("static range should parse");
        materialize(
            &range.bounds(),
            cells.iter().map(|((row, col), value)| (*row, *col, value.as_str())),
        )
    }

    pub fn put_rows(&self, store_id: &str, sheet: &str, rows: &[Row]) {
        let mut state = self.lock();
        let store = state.stores.entry(store_id.to_string()).or_default();
        let cells = store.entry(sheet.to_string()).or_default();
        cells.clear();
        apply_placements(cells, placements(1, 1, rows));
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, call: GridCall) -> Result<MutexGuard<'_, State>, GridError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some((status, message)) = state.fail_with.clone() {
            return Err(GridError::Backend { status, message });
        }
        Ok(state)
    }
}

fn sheet_mut<'a>(
    state: &'a mut State,
    store_id: &str,
    sheet: &str,
) -> Result<&'a mut CellMap, GridError> {
    state
        .stores
        .get_mut(store_id)
        .ok_or_else(|| not_found(&format!("store {store_id}")))?
        .get_mut(sheet)
        .ok_or_else(|| not_found(&format!("sheet {sheet}")))
}

fn not_found(what: &str) -> GridError {
    GridError::Backend {
        status: 404,
        message: format!("{what} not found"),
    }
}

impl Grid for MemoryGrid {
    fn create_store(&self, title: &str) -> Result<String, GridError> {
        let mut state = self.begin(GridCall::CreateStore(title.to_string()))?;
        state.created += 1;
        let id = format!("mem-{}", state.created);
        state.stores.entry(id.clone()).or_default();
        Ok(id)
    }

    fn sheet_titles(&self, store_id: &str) -> Result<Vec<String>, GridError> {
        let state = self.begin(GridCall::SheetTitles)?;
        let store = state
            .stores
            .get(store_id)
            .ok_or_else(|| not_found(&format!("store {store_id}")))?;
        Ok(store.keys().cloned().collect())
    }

    fn add_sheets(&self, store_id: &str, sheets: &[NewSheet]) -> Result<(), GridError> {
        let titles = sheets.iter().map(|sheet| sheet.title.clone()).collect();
        let mut state = self.begin(GridCall::AddSheets(titles))?;
        let store = state
            .stores
            .get_mut(store_id)
            .ok_or_else(|| not_found(&format!("store {store_id}")))?;
        for sheet in sheets {
            if store.contains_key(&sheet.title) {
                return Err(GridError::Backend {
                    status: 400,
                    message: format!("sheet {} already exists", sheet.title),
                });
            }
            store.insert(sheet.title.clone(), CellMap::new());
        }
        Ok(())
    }

    fn read(&self, store_id: &str, range: &CellRange) -> Result<Vec<Row>, GridError> {
        let mut state = self.begin(GridCall::Read(range.to_string()))?;
        let cells = sheet_mut(&mut state, store_id, &range.sheet)?;
        Ok(materialize(
            &range.bounds(),
            cells.iter().map(|((row, col), value)| (*row, *col, value.as_str())),
        ))
    }

    fn append(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let mut state = self.begin(GridCall::Append(range.to_string(), rows.to_vec()))?;
        let cells = sheet_mut(&mut state, store_id, &range.sheet)?;
        let bounds = range.bounds();
        let next_row = (last_used_row(cells) + 1).max(bounds.first_row);
        apply_placements(cells, placements(next_row, bounds.first_col, rows));
        Ok(())
    }

    fn write(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let mut state = self.begin(GridCall::Write(range.to_string(), rows.to_vec()))?;
        let cells = sheet_mut(&mut state, store_id, &range.sheet)?;
        let bounds = range.bounds();
        apply_placements(cells, placements(bounds.first_row, bounds.first_col, rows));
        Ok(())
    }
}
