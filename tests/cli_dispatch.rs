use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

const SCRUBBED_ENV: [&str; 7] = [
    "EDUMIND_BACKEND",
    "EDUMIND_LOCAL_DB",
    "EDUMIND_STORE_TITLE",
    "EDUMIND_LOG",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_SHEETS_SPREADSHEET_ID",
    "RUST_LOG",
];

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn edumind(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_edumind"));
    command.current_dir(cwd);
    for key in SCRUBBED_ENV {
        command.env_remove(key);
    }
    command
}

fn run_local(workspace: &Path, args: &[&str]) -> Output {
    edumind(workspace)
        .arg("--backend")
        .arg("local")
        .arg("--local-db")
        .arg(workspace.join("grid.sqlite"))
        .args(args)
        .output()
        .expect("edumind command should run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn parse_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn init_twice_seeds_config_once() {
    let root = unique_workspace("edumind-cli-init");

    let first = run_local(&root, &["init"]);
    assert_success(&first);
    assert_eq!(parse_json(&first)["status"], "ready");
    assert_eq!(parse_json(&first)["store_id"], "local");
    assert_success(&run_local(&root, &["init"]));

    let listed = run_local(&root, &["config", "list"]);
    assert_success(&listed);
    let config = parse_json(&listed);
    let entries = config.as_array().expect("config list should be an array");
    for key in [
        "google_oauth_scopes",
        "last_sync_timestamp",
        "calendar_default_timezone",
        "default_session_duration_minutes",
        "quiz_performance_thresholds",
        "app_version",
    ] {
        let rows = entries.iter().filter(|entry| entry["key"] == key).count();
        assert_eq!(rows, 1, "seed '{key}' should appear exactly once");
    }
    assert_eq!(entries.len(), 6);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn users_receive_sequential_ids_across_processes() {
    let root = unique_workspace("edumind-cli-users");
    assert_success(&run_local(&root, &["init"]));

    let ada = run_local(
        &root,
        &["user", "create", "--name", "Ada", "--email", "ada@example.org"],
    );
    assert_success(&ada);
    assert_eq!(parse_json(&ada)["user_id"], "U_1");
    assert_eq!(parse_json(&ada)["role"], "student");

    let grace = run_local(
        &root,
        &[
            "user", "create", "--name", "Grace", "--email", "grace@example.org", "--role", "mentor",
        ],
    );
    assert_success(&grace);
    assert_eq!(parse_json(&grace)["user_id"], "U_2");

    let found = run_local(&root, &["user", "find", "--email", "grace@example.org"]);
    assert_success(&found);
    assert_eq!(parse_json(&found)["role"], "mentor");
    assert!(parse_json(&found).get("password").is_none());

    let missing = run_local(&root, &["user", "find", "--id", "U_99"]);
    assert_failure(&missing);
    assert!(String::from_utf8_lossy(&missing.stderr).contains("not found"));

    let counter = run_local(&root, &["config", "get", "USER_COUNTER"]);
    assert_success(&counter);
    assert_eq!(String::from_utf8_lossy(&counter.stdout).trim(), "2");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn interest_add_ignores_case_duplicates() {
    let root = unique_workspace("edumind-cli-interests");
    assert_success(&run_local(&root, &["init"]));

    assert_success(&run_local(&root, &["student", "interests", "add", "U_1", "Math"]));
    let again = run_local(&root, &["student", "interests", "add", "U_1", "math"]);
    assert_success(&again);
    assert_eq!(parse_json(&again), serde_json::json!(["Math"]));

    let added = run_local(&root, &["student", "interests", "add", "U_1", "Art"]);
    assert_eq!(parse_json(&added), serde_json::json!(["Math", "Art"]));

    let profile = run_local(&root, &["student", "show", "U_1"]);
    assert_success(&profile);
    assert_eq!(parse_json(&profile)["interests"], "Math; Art");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sessions_list_by_mentor() {
    let root = unique_workspace("edumind-cli-sessions");
    assert_success(&run_local(&root, &["init"]));

    for (mentor, student) in [("M_1", "U_1"), ("M_2", "U_1"), ("M_1", "U_2")] {
        assert_success(&run_local(
            &root,
            &[
                "session", "schedule", "--mentor", mentor, "--student", student, "--date",
                "2025-03-01", "--time", "10:00",
            ],
        ));
    }

    let listed = run_local(&root, &["session", "list", "--mentor", "M_1"]);
    assert_success(&listed);
    let sessions = parse_json(&listed);
    let ids: Vec<&str> = sessions
        .as_array()
        .expect("sessions should be an array")
        .iter()
        .filter_map(|session| session["session_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["S_1", "S_3"]);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn score_record_reports_band() {
    let root = unique_workspace("edumind-cli-scores");
    assert_success(&run_local(&root, &["init"]));

    let strong = run_local(
        &root,
        &["score", "record", "--student", "U_1", "--quiz", "Q_1", "--score", "9", "--total", "10"],
    );
    assert_success(&strong);
    assert_eq!(parse_json(&strong)["performance_level"], "excellent");
    assert_eq!(parse_json(&strong)["ratio"], 0.9);

    let weak = run_local(
        &root,
        &["score", "record", "--student", "U_1", "--quiz", "Q_2", "--score", "3", "--total", "10"],
    );
    assert_eq!(parse_json(&weak)["performance_level"], "needs_improvement");

    let listed = run_local(&root, &["score", "list", "--student", "U_1"]);
    assert_eq!(
        parse_json(&listed).as_array().map(Vec::len),
        Some(2),
        "both scores should be listed"
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sheets_backend_without_credentials_is_not_initialized() {
    let root = unique_workspace("edumind-cli-sheets");

    let listed = edumind(&root)
        .args(["config", "list"])
        .output()
        .expect("edumind command should run");
    assert_failure(&listed);
    let stderr = String::from_utf8_lossy(&listed.stderr);
    assert!(stderr.contains("grid store is not initialized"));
    assert!(stderr.contains("hint: pass --credentials"));

    let init = edumind(&root)
        .arg("init")
        .output()
        .expect("edumind command should run");
    assert_failure(&init);
    assert!(String::from_utf8_lossy(&init.stderr).contains("no credential location"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completions_print_for_named_shell() {
    let root = unique_workspace("edumind-cli-completions");
    let output = edumind(&root)
        .args(["completions", "bash"])
        .output()
        .expect("edumind command should run");
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("edumind"));
    let _ = std::fs::remove_dir_all(root);
}
