use std::path::PathBuf;
use std::sync::Arc;

use super::{GridClient, InitOutcome};
use crate::a1::CellRange;
use crate::grid::memory::{GridCall, MemoryGrid};
use crate::grid::Row;
use crate::schema::{SchemaRegistry, Table};
use crate::settings::Settings;

fn row(values: &[&str]) -> Row {
    values.iter().map(|value| value.to_string()).collect()
}

fn client_for(store_id: Option<&str>) -> GridClient {
    let schema = SchemaRegistry::builtin().expect("embedded schema should parse");
    GridClient::new(
        Settings::sheets(None, store_id.map(str::to_string)),
        schema,
    )
}

fn count_calls(grid: &MemoryGrid, wanted: fn(&GridCall) -> bool) -> usize {
    grid.calls().iter().filter(|call| wanted(call)).count()
}

#[test]
fn bootstrap_creates_store_tables_headers_and_seeds() {
    let grid = Arc::new(MemoryGrid::new());
    let client = client_for(None);
    let outcome = client
        .initialize_with(grid.clone())
        .expect("bootstrap should succeed");
    assert_eq!(
        outcome,
        InitOutcome::Ready {
            store_id: "mem-1".to_string(),
            created: true,
        }
    );
    assert_eq!(client.store_id().expect("store id"), "mem-1");

    let users = grid.sheet_rows("mem-1", "Users");
    assert_eq!(users, vec![client.schema().table(Table::Users).headers.clone()]);

    let config = grid.sheet_rows("mem-1", "Config");
    assert_eq!(config.len(), 7);
    assert_eq!(config[0], row(&["key", "value", "description", "updated_at"]));
    assert_eq!(config[5][0], "quiz_performance_thresholds");
    assert_eq!(config[5][1], "excellent>=0.85|good>=0.70");
    assert_eq!(config[2][1], "");
    assert!(!config[2][3].is_empty(), "seed rows carry a timestamp");
}

#[test]
fn second_initialize_never_duplicates_anything() {
    let grid = Arc::new(MemoryGrid::new());
    let client = client_for(None);
    client.initialize_with(grid.clone()).expect("first");
    let tables_before: Vec<Vec<Row>> = Table::ALL
        .iter()
        .map(|table| grid.sheet_rows("mem-1", table.title()))
        .collect();
    grid.clear_calls();

    let outcome = client.initialize_with(grid.clone()).expect("second");
    assert_eq!(
        outcome,
        InitOutcome::Ready {
            store_id: "mem-1".to_string(),
            created: false,
        }
    );
    let tables_after: Vec<Vec<Row>> = Table::ALL
        .iter()
        .map(|table| grid.sheet_rows("mem-1", table.title()))
        .collect();
    assert_eq!(tables_before, tables_after);
    assert_eq!(grid.stores_created(), 1);
    assert_eq!(
        count_calls(&grid, |call| matches!(
            call,
            GridCall::Write(..) | GridCall::Append(..) | GridCall::AddSheets(_) | GridCall::CreateStore(_)
        )),
        0
    );
}

#[test]
fn configured_store_is_reused_and_existing_rows_are_kept() {
    let grid = Arc::new(MemoryGrid::with_store("sheet-42"));
    grid.put_rows(
        "sheet-42",
        "Config",
        &[
            row(&["key", "value", "description", "updated_at"]),
            row(&["USER_COUNTER", "7"]),
        ],
    );
    let client = client_for(Some("sheet-42"));
    client.initialize_with(grid.clone()).expect("bootstrap");

    assert_eq!(grid.stores_created(), 0);
    assert_eq!(
        grid.sheet_rows("sheet-42", "Config"),
        vec![
            row(&["key", "value", "description", "updated_at"]),
            row(&["USER_COUNTER", "7"]),
        ]
    );
    let added: Vec<String> = grid
        .calls()
        .into_iter()
        .find_map(|call| match call {
            GridCall::AddSheets(titles) => Some(titles),
            _ => None,
        })
        .expect("missing tables should be added");
    assert_eq!(added.len(), 9);
    assert!(!added.contains(&"Config".to_string()));
}

#[test]
fn operations_before_initialize_report_uninitialized() {
    let client = client_for(None);
    assert!(!client.is_initialized());
    let err = client
        .get_rows(Table::Users, None)
        .expect_err("reads need a session");
    assert!(err.is_uninitialized());
    let err = client
        .append_row(Table::Users, row(&["U_1"]))
        .expect_err("appends need a session");
    assert!(err.is_uninitialized());
    assert!(client.store_id().is_err());
}

#[test]
fn missing_credentials_skip_initialization() {
    let client = client_for(None);
    assert_eq!(client.initialize().expect("skip is not an error"), InitOutcome::Skipped);
    assert!(!client.initialize_or_log());
    assert!(!client.is_initialized());
}

#[test]
fn unreadable_credentials_leave_client_uninitialized() {
    let schema = SchemaRegistry::builtin().expect("schema");
    let missing = PathBuf::from("/nonexistent/edumind/service-account.json");
    let client = GridClient::new(Settings::sheets(Some(missing), None), schema);
    assert!(!client.initialize_or_log());
    let err = client
        .get_rows(Table::Config, None)
        .expect_err("still uninitialized");
    assert!(err.is_uninitialized());
}

#[test]
fn renamed_header_is_a_startup_error() {
    let grid = Arc::new(MemoryGrid::with_store("s1"));
    grid.put_rows(
        "s1",
        "Sessions",
        &[row(&["session_id", "mentor", "student_id", "date", "time", "topic"])],
    );
    let client = client_for(Some("s1"));
    let err = client
        .initialize_with(grid)
        .expect_err("header mismatch should fail");
    assert!(err.to_string().contains("mentor_id"), "{err}");
    assert!(!client.is_initialized());
}

#[test]
fn failed_provisioning_does_not_create_a_second_store() {
    let grid = Arc::new(MemoryGrid::new());
    let client = client_for(None);
    // The next store id the grid hands out already holds a bad header.
    grid.put_rows("mem-1", "Users", &[row(&["wrong"])]);
    let first = client.initialize_with(grid.clone());
    assert!(first.is_err());
    assert_eq!(grid.stores_created(), 1);

    let retry = client.initialize_with(grid.clone());
    assert!(retry.is_err());
    assert_eq!(grid.stores_created(), 1);
}

#[test]
fn data_plane_uses_expected_ranges() {
    let grid = Arc::new(MemoryGrid::with_store("s1"));
    let client = client_for(Some("s1"));
    client.initialize_with(grid.clone()).expect("bootstrap");
    grid.clear_calls();

    client
        .append_row(Table::Users, row(&["U_1", "Ada"]))
        .expect("append");
    let rows = client.get_rows(Table::Users, None).expect("read");
    assert_eq!(rows.len(), 2);
    client
        .update_range(Table::Users, &CellRange::cell("Users", 2, 2), &[row(&["Ada L."])])
        .expect("update");
    let override_range = CellRange::parse_in("Users", "A2:B2").expect("range");
    let rows = client
        .get_rows(Table::Users, Some(&override_range))
        .expect("bounded read");
    assert_eq!(rows, vec![row(&["U_1", "Ada L."])]);

    assert_eq!(
        grid.calls(),
        vec![
            GridCall::Append("Users!A:A".to_string(), vec![row(&["U_1", "Ada"])]),
            GridCall::Read("Users!A1:Z".to_string()),
            GridCall::Write("Users!B2".to_string(), vec![row(&["Ada L."])]),
            GridCall::Read("Users!A2:B2".to_string()),
        ]
    );
}

#[test]
fn column_map_follows_header_drift() {
    let grid = Arc::new(MemoryGrid::with_store("s1"));
    let client = client_for(Some("s1"));
    client.initialize_with(grid.clone()).expect("bootstrap");

    let cached = client.columns(Table::Config, &[]).expect("cached map");
    assert_eq!(cached.index("value").expect("value"), 1);

    let moved = row(&["value", "key", "description", "updated_at"]);
    let columns = client.columns(Table::Config, &moved).expect("re-resolved");
    assert_eq!(columns.index("value").expect("value"), 0);
    assert_eq!(client.columns(Table::Config, &[]).expect("cache").header(), moved.as_slice());

    let broken = row(&["key", "value"]);
    assert!(client.columns(Table::Config, &broken).is_err());
}

#[test]
fn wide_header_is_not_re_resolved_by_default_reads() {
    let grid = Arc::new(MemoryGrid::with_store("s1"));
    let mut header = row(&["key", "value", "description", "updated_at"]);
    header.extend((1..=26).map(|n| format!("extra_{n}")));
    grid.put_rows("s1", "Config", &[header.clone()]);
    let client = client_for(Some("s1"));
    client.initialize_with(grid.clone()).expect("bootstrap");

    let read = client.get_rows(Table::Config, None).expect("default read");
    assert_eq!(read[0].len(), 26);

    let columns = client.columns(Table::Config, &read[0]).expect("columns");
    assert_eq!(columns.header(), header.as_slice());
}
