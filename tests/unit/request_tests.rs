//! Unit tests for translating form fields into typed requests

use chrono::NaiveDate;
use std::collections::HashMap;
use tabdelta::filter::SearchMode;
use tabdelta::{ProcessRequest, ProcessingLog, TabdeltaError, TabularDataset};

fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_blank_fields_are_absent() {
    let request = ProcessRequest::from_form_fields(&form(&[
        ("filter_date_column", "  "),
        ("filter_date_value", ""),
        ("keyword_column", ""),
        ("keywords", "a"),
        ("ai_instruction", "   "),
    ]))
    .unwrap();

    assert!(request.filter_chain().is_empty());
    assert!(request.instruction().is_none());
}

#[test]
fn test_lenient_filter_date_value() {
    let request = ProcessRequest::from_form_fields(&form(&[
        ("filter_date_column", "公告日"),
        ("filter_date_value", "2024年4月1日"),
    ]))
    .unwrap();
    assert_eq!(
        request.date_filters[0].min_date,
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    );
}

#[test]
fn test_invalid_filter_date_value_is_boundary_error() {
    let err = ProcessRequest::from_form_fields(&form(&[
        ("filter_date_column", "date"),
        ("filter_date_value", "2024-13-45"),
    ]))
    .unwrap_err();
    assert!(matches!(err, TabdeltaError::InvalidInput { .. }));
}

#[test]
fn test_keyword_blob_and_lowercase_and() {
    let request = ProcessRequest::from_form_fields(&form(&[
        ("keyword_column", "name"),
        ("keywords", "Apple\r\nCherry\r\n"),
        ("search_type", "and"),
    ]))
    .unwrap();

    let filter = request.keyword_filter.unwrap();
    assert_eq!(filter.keywords, vec!["Apple", "Cherry"]);
    assert_eq!(filter.mode, SearchMode::And);
}

#[test]
fn test_request_chain_applies_dates_then_keywords() {
    let request = ProcessRequest::from_form_fields(&form(&[
        ("filter_date_column", "date"),
        ("filter_date_value", "2024-02-01"),
        ("keyword_column", "name"),
        ("keywords", "Apple\nCherry"),
    ]))
    .unwrap();

    let dataset = TabularDataset::from_text_rows(
        &["name", "date"],
        &[
            vec!["Apple", "2024-01-01"],
            vec!["Banana", "2024-02-01"],
            vec!["Cherry", "2024-03-01"],
        ],
    )
    .unwrap();

    let mut log = ProcessingLog::new();
    let result = request.filter_chain().apply(dataset, &mut log);
    assert_eq!(result.ids(), vec![2]);
    assert_eq!(log.len(), 2);
    assert!(log.entries()[0].starts_with("Date filter"));
    assert!(log.entries()[1].starts_with("Keyword filter"));
}

#[test]
fn test_request_serializes() {
    let request = ProcessRequest::from_form_fields(&form(&[
        ("normalize_date_column", "due"),
        ("save_result_as", "weekly"),
    ]))
    .unwrap();
    let json = serde_json::to_string(&request).unwrap();
    let back: ProcessRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}
