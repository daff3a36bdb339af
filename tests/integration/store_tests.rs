//! Integration tests for the snapshot store commands

use crate::common::{sample_data, CliTestRunner};
use std::fs;
use tabdelta::store::{SnapshotStore, WorkspaceStore};
use tabdelta::TabdeltaError;

#[test]
fn test_load_previous_without_snapshot_fails() {
    let runner = CliTestRunner::new().unwrap();
    let error = runner.expect_failure(&["load-previous"]);
    assert!(matches!(error, TabdeltaError::SnapshotNotFound { .. }));
}

#[test]
fn test_save_then_load_previous_to_file() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let input = fixture
        .create_csv("previous.csv", &sample_data::previous_csv_data())
        .unwrap();

    runner.expect_success(&["save", "previous.csv"]);
    runner.expect_success(&["load-previous", "-o", "exported/previous.csv"]);

    let exported = fixture.root().join("exported").join("previous.csv");
    assert_eq!(fs::read(&exported).unwrap(), fs::read(&input).unwrap());

    let store = WorkspaceStore::for_workspace(&fixture.workspace);
    assert_eq!(store.latest_name().unwrap().as_deref(), Some("previous"));
}

#[test]
fn test_save_with_explicit_name() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("latest.csv", &sample_data::latest_csv_data())
        .unwrap();

    runner.expect_success(&["save", "latest.csv", "--name", "april run"]);

    let store = WorkspaceStore::for_workspace(&fixture.workspace);
    let names: Vec<String> = store.list().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["april_run".to_string()]);
}

#[test]
fn test_save_rejects_unreadable_table() {
    let runner = CliTestRunner::new().unwrap();
    runner.fixture().create_corrupted_file("broken.csv").unwrap();

    let error = runner.expect_failure(&["save", "broken.csv"]);
    assert!(matches!(error, TabdeltaError::UnrecognizedEncoding { .. }));

    let store = WorkspaceStore::for_workspace(&runner.fixture().workspace);
    assert!(store.load_previous().unwrap().is_none());
}

#[test]
fn test_process_saves_result_then_diffs_against_it() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("first.csv", &sample_data::previous_csv_data())
        .unwrap();
    fixture
        .create_csv("second.csv", &sample_data::latest_csv_data())
        .unwrap();

    // First run has nothing stored: every row is kept and saved
    runner.expect_success(&[
        "process",
        "first.csv",
        "--from-store",
        "--save-as",
        "run1",
        "-o",
        "out1.csv",
    ]);
    assert_eq!(
        fixture.read_output(&fixture.root().join("out1.csv")),
        "id,name,date\n1,Apple,2024-01-01\n2,Banana,2024-02-01\n"
    );

    runner.expect_success(&[
        "process",
        "second.csv",
        "--from-store",
        "--save-as",
        "run2",
        "-o",
        "out2.csv",
    ]);
    assert_eq!(
        fixture.read_output(&fixture.root().join("out2.csv")),
        "id,name,date\n3,Cherry,2024-03-01\n"
    );

    let store = WorkspaceStore::for_workspace(&fixture.workspace);
    assert_eq!(store.latest_name().unwrap().as_deref(), Some("run2"));
    assert_eq!(store.list().unwrap().len(), 2);

    // Stored bytes are the processed result, byte-order marker included
    let stored = store.load_previous().unwrap().unwrap();
    assert!(stored.bytes.starts_with(b"\xEF\xBB\xBF"));
}

#[test]
fn test_previous_and_from_store_conflict() {
    let runner = CliTestRunner::new().unwrap();
    let error = runner.expect_failure(&["process", "a.csv", "--previous", "b.csv", "--from-store"]);
    assert!(matches!(error, TabdeltaError::InvalidInput { .. }));
}

#[test]
fn test_status_after_saves() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("previous.csv", &sample_data::previous_csv_data())
        .unwrap();
    runner.expect_success(&["save", "previous.csv"]);

    runner.expect_success(&["status"]);
    runner.expect_success(&["status", "--format", "json"]);

    let stats = WorkspaceStore::for_workspace(&fixture.workspace).stats().unwrap();
    assert_eq!(stats.snapshot_count, 1);
    assert!(stats.total_body_size > 0);
    assert_eq!(stats.latest.as_deref(), Some("previous"));
}
