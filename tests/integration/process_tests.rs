//! Integration tests for the process command

use crate::common::{sample_data, CliTestRunner, MockTransformer};
use serde_json::json;
use std::sync::Arc;
use tabdelta::TabdeltaError;

#[test]
fn test_process_diff_to_output_file() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let latest = fixture.create_csv("latest.csv", &sample_data::latest_csv_data()).unwrap();
    let previous = fixture.create_csv("previous.csv", &sample_data::previous_csv_data()).unwrap();

    // Relative paths resolve against the workspace root
    runner.expect_success(&[
        "process",
        "latest.csv",
        "--previous",
        "previous.csv",
        "-o",
        "results/new.csv",
    ]);

    let output = fixture.root().join("results").join("new.csv");
    assert_eq!(fixture.read_output(&output), "id,name,date\n3,Cherry,2024-03-01\n");
    assert!(latest.exists() && previous.exists());
}

#[test]
fn test_process_json_format() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("latest.csv", &sample_data::latest_csv_data()).unwrap();

    runner.expect_success(&["process", "latest.csv", "--format", "json"]);

    let error = runner.expect_failure(&["process", "latest.csv", "--format", "xml"]);
    assert!(matches!(error, TabdeltaError::InvalidInput { .. }));
}

#[test]
fn test_process_no_common_columns_fails() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv_raw("latest.csv", "id,name\n1,A\n").unwrap();
    fixture.create_csv_raw("previous.csv", "code,title\n1,A\n").unwrap();
    let output = fixture.root().join("out.csv");

    let error = runner.expect_failure(&[
        "process",
        "latest.csv",
        "--previous",
        "previous.csv",
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(matches!(error, TabdeltaError::ProcessingFailed(_)));
    assert!(error.to_string().contains("share no columns"));
    assert!(!output.exists());
}

#[test]
fn test_process_keywords_from_options_and_file() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("tenders.csv", &sample_data::tender_csv_data()).unwrap();
    fixture.create_csv_raw("keywords.txt", "\n保守\n\n").unwrap();
    let output = fixture.root().join("out.csv");

    runner.expect_success(&[
        "process",
        "tenders.csv",
        "--keyword-column",
        "案件名",
        "--keyword",
        "工事",
        "--keywords-file",
        "keywords.txt",
        "-o",
        output.to_str().unwrap(),
    ]);

    let content = fixture.read_output(&output);
    assert!(content.contains("T-001"));
    assert!(content.contains("T-004"));
    assert!(!content.contains("T-002"));
    assert!(!content.contains("T-003"));
}

#[test]
fn test_process_and_search() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("tenders.csv", &sample_data::tender_csv_data()).unwrap();
    let output = fixture.root().join("out.csv");

    runner.expect_success(&[
        "process",
        "tenders.csv",
        "--keyword-column",
        "案件名",
        "--keyword",
        "業務",
        "--keyword",
        "橋梁",
        "--search-type",
        "and",
        "-o",
        output.to_str().unwrap(),
    ]);

    let content = fixture.read_output(&output);
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("T-002"));
}

#[test]
fn test_process_with_params_file() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("tenders.csv", &sample_data::tender_csv_data()).unwrap();
    fixture
        .create_json(
            "params.json",
            &json!({
                "filter_date_column": "公告日",
                "filter_date_value": "2024-04-01",
                "keyword_column": "地域",
                "keywords": "東京\n名古屋",
                "search_type": "OR"
            }),
        )
        .unwrap();
    let output = fixture.root().join("out.csv");

    runner.expect_success(&[
        "process",
        "tenders.csv",
        "--params",
        "params.json",
        "-o",
        output.to_str().unwrap(),
    ]);

    let content = fixture.read_output(&output);
    let ids: Vec<&str> = content
        .lines()
        .skip(1)
        .filter_map(|l| l.split(',').next())
        .collect();
    assert_eq!(ids, vec!["T-001", "T-004"]);
}

#[test]
fn test_process_invalid_params_date_rejected() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("tenders.csv", &sample_data::tender_csv_data()).unwrap();
    fixture
        .create_json(
            "params.json",
            &json!({"filter_date_column": "公告日", "filter_date_value": "tomorrow"}),
        )
        .unwrap();

    let error = runner.expect_failure(&["process", "tenders.csv", "--params", "params.json"]);
    assert!(matches!(error, TabdeltaError::InvalidInput { .. }));
}

#[test]
fn test_process_ai_steps_with_injected_transformer() {
    let transformer = Arc::new(MockTransformer::scripted(vec![
        Ok(r#"{"R6.5.10": "2024-05-10", "令和6年5月20日": "2024-05-20", "2024/5/31": "2024-05-31"}"#.to_string()),
        Ok("[0, 3]".to_string()),
    ]));
    let runner = CliTestRunner::with_transformer(transformer.clone()).unwrap();
    let fixture = runner.fixture();
    fixture.create_csv("tenders.csv", &sample_data::tender_csv_data()).unwrap();
    let output = fixture.root().join("out.csv");

    runner.expect_success(&[
        "process",
        "tenders.csv",
        "--normalize-column",
        "締切",
        "--select",
        "projects due in May",
        "-o",
        output.to_str().unwrap(),
        "--no-progress",
    ]);

    assert_eq!(transformer.calls(), 2);
    assert_eq!(
        fixture.read_output(&output),
        "案件番号,案件名,地域,公告日,締切\n\
         T-001,道路補修工事,東京,2024-04-01,2024-05-10\n\
         T-004,システム保守,名古屋,2024/04/10,2024-05-31\n"
    );
}
