//! Invariants that must hold across many inputs

use crate::common::{column_of, MockTransformer};
use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashSet;
use tabdelta::dataset::Cell;
use tabdelta::filter::{DateRangeFilter, FilterSpec, KeywordFilter, SearchMode};
use tabdelta::{
    BatchNormalizer, DiffEngine, ProcessingLog, SemanticRowSelector, TabdeltaError,
    TabularDataset,
};

// -- Strategy helpers --

/// Short cell text over a small alphabet so rows collide often
fn arb_text() -> impl Strategy<Value = String> {
    "[ab東道]{1,2}"
}

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        1 => Just(None),
        5 => arb_text().prop_map(Some),
    ]
}

fn arb_dataset(columns: &'static [&'static str], max_rows: usize) -> impl Strategy<Value = TabularDataset> {
    prop::collection::vec(prop::collection::vec(arb_cell(), columns.len()), 0..max_rows).prop_map(
        move |rows| {
            TabularDataset::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
                .expect("rows match the column count")
        },
    )
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2023i32..=2025, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day 28 exists in every month"))
}

/// Date cells in several spellings, plus missing and garbage values
fn arb_date_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some("not a date".to_string())),
        3 => arb_date().prop_map(|d| Some(d.format("%Y-%m-%d").to_string())),
        2 => arb_date().prop_map(|d| Some(d.format("%Y/%-m/%-d").to_string())),
    ]
}

fn arb_dated_dataset() -> impl Strategy<Value = TabularDataset> {
    prop::collection::vec(arb_date_cell(), 0..30).prop_map(|dates| {
        let rows = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| vec![Some(i.to_string()), date])
            .collect();
        TabularDataset::from_rows(vec!["id".to_string(), "date".to_string()], rows)
            .expect("two cells per row")
    })
}

/// Reorder columns by name, keeping rows in place
fn permute_columns(dataset: &TabularDataset, order: &[&str]) -> TabularDataset {
    let indices: Vec<usize> = order.iter().map(|c| dataset.column_index(c).unwrap()).collect();
    let rows = dataset
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row.get(i).map(str::to_string)).collect())
        .collect();
    TabularDataset::from_rows(order.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

fn rows_as_text(dataset: &TabularDataset) -> Vec<Vec<Option<String>>> {
    dataset.rows().iter().map(|r| r.cells().to_vec()).collect()
}

fn date_filter(min_date: NaiveDate) -> FilterSpec {
    FilterSpec::DateRange(DateRangeFilter {
        column: "date".to_string(),
        min_date,
    })
}

fn keyword_ids(dataset: &TabularDataset, keywords: &[String], mode: SearchMode) -> HashSet<usize> {
    let filter = FilterSpec::Keyword(KeywordFilter {
        column: "name".to_string(),
        keywords: keywords.to_vec(),
        mode,
    });
    let mut log = ProcessingLog::new();
    filter.apply(dataset, &mut log).ids().into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn diff_disjoint_is_identity(
        latest in arb_dataset(&["a", "b"], 20),
        previous_rows in prop::collection::vec(
            prop::collection::vec("[xyz]{1,3}".prop_map(Some), 3),
            1..8,
        ),
    ) {
        // Previous cells are never missing and use an alphabet latest never does
        let previous = TabularDataset::from_rows(
            vec!["b".to_string(), "a".to_string(), "extra".to_string()],
            previous_rows,
        )
        .unwrap();

        let mut log = ProcessingLog::new();
        let diff = DiffEngine::diff(&latest, &previous, &mut log).unwrap();
        prop_assert_eq!(diff, latest);
    }

    #[test]
    fn diff_identical_is_empty(latest in arb_dataset(&["a", "b", "c"], 15)) {
        let previous = permute_columns(&latest, &["c", "a", "b"]);

        let mut log = ProcessingLog::new();
        let diff = DiffEngine::diff(&latest, &previous, &mut log).unwrap();
        prop_assert!(diff.is_empty());
        prop_assert_eq!(diff.columns(), latest.columns());
    }

    #[test]
    fn diff_column_order_independent_and_row_order_preserving(
        latest in arb_dataset(&["a", "b", "c"], 20),
        previous in arb_dataset(&["a", "b", "d"], 20),
    ) {
        let mut log = ProcessingLog::new();
        let base = DiffEngine::diff(&latest, &previous, &mut log).unwrap();
        let permuted = DiffEngine::diff(
            &latest,
            &permute_columns(&previous, &["d", "b", "a"]),
            &mut log,
        )
        .unwrap();
        prop_assert_eq!(&base, &permuted);

        let latest_permuted = permute_columns(&latest, &["c", "a", "b"]);
        let other = DiffEngine::diff(&latest_permuted, &previous, &mut log).unwrap();
        prop_assert_eq!(
            rows_as_text(&permute_columns(&other, &["a", "b", "c"])),
            rows_as_text(&base)
        );

        // Result rows appear as a subsequence of latest
        let latest_rows = rows_as_text(&latest);
        let mut cursor = 0;
        for row in rows_as_text(&base) {
            let found = latest_rows[cursor..].iter().position(|r| *r == row);
            prop_assert!(found.is_some(), "diff row out of order");
            cursor += found.unwrap_or(0) + 1;
        }
    }

    #[test]
    fn date_filter_monotonic(
        dataset in arb_dated_dataset(),
        first in arb_date(),
        second in arb_date(),
    ) {
        let (earlier, later) = if first <= second { (first, second) } else { (second, first) };

        let mut log = ProcessingLog::new();
        let loose: HashSet<usize> =
            date_filter(earlier).apply(&dataset, &mut log).ids().into_iter().collect();
        let strict: HashSet<usize> =
            date_filter(later).apply(&dataset, &mut log).ids().into_iter().collect();
        prop_assert!(strict.is_subset(&loose));
    }

    #[test]
    fn keyword_and_subset_of_or(
        dataset in arb_dataset(&["name"], 30),
        keywords in prop::collection::vec(arb_text(), 1..4),
    ) {
        let and_ids = keyword_ids(&dataset, &keywords, SearchMode::And);
        let or_ids = keyword_ids(&dataset, &keywords, SearchMode::Or);
        prop_assert!(and_ids.is_subset(&or_ids));
    }

    #[test]
    fn normalizer_preserves_rows_and_other_columns(
        dataset in arb_dataset(&["key", "date", "note"], 25),
        batch_size in 1usize..6,
    ) {
        let transformer = MockTransformer::always(r#"{"a": "2024-01-01", "東": ""}"#);

        let mut log = ProcessingLog::new();
        let result = BatchNormalizer::new(&transformer, batch_size).normalize(&dataset, "date", &mut log);

        prop_assert_eq!(result.ids(), dataset.ids());
        prop_assert_eq!(result.columns(), dataset.columns());
        prop_assert_eq!(column_of(&result, "key"), column_of(&dataset, "key"));
        prop_assert_eq!(column_of(&result, "note"), column_of(&dataset, "note"));

        for (before, after) in column_of(&dataset, "date").iter().zip(column_of(&result, "date")) {
            match before.as_deref() {
                None => prop_assert_eq!(after, None),
                Some("a") => prop_assert_eq!(after.as_deref(), Some("2024-01-01")),
                Some("東") => prop_assert_eq!(after.as_deref(), Some("")),
                Some(other) => prop_assert_eq!(after.as_deref(), Some(other)),
            }
        }
    }

    #[test]
    fn normalizer_unreachable_is_identity(
        dataset in arb_dataset(&["key", "date"], 20),
        batch_size in 1usize..6,
    ) {
        let transformer = MockTransformer::unreachable();
        let mut log = ProcessingLog::new();
        let result = BatchNormalizer::new(&transformer, batch_size).normalize(&dataset, "date", &mut log);
        prop_assert_eq!(result, dataset);
    }

    #[test]
    fn selector_never_invents_ids(
        dataset in arb_dataset(&["name"], 12),
        keep_even in any::<bool>(),
        answer in prop::collection::vec(0u64..30, 0..10),
    ) {
        let dataset = dataset.retain_rows(|r| !keep_even || r.id() % 2 == 0);
        let transformer = MockTransformer::always(&serde_json::to_string(&answer).unwrap());

        let mut log = ProcessingLog::new();
        let result = SemanticRowSelector::new(&transformer).select(&dataset, "pick", &mut log);

        let input: HashSet<usize> = dataset.ids().into_iter().collect();
        prop_assert!(result.ids().iter().all(|id| input.contains(id)));
        prop_assert!(result.ids().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn selector_answer_without_array_is_identity(
        dataset in arb_dataset(&["name"], 10),
        answer in "[^\\[]{0,40}",
    ) {
        let transformer = MockTransformer::always(&answer);
        let mut log = ProcessingLog::new();
        let result = SemanticRowSelector::new(&transformer).select(&dataset, "pick", &mut log);
        prop_assert_eq!(result, dataset);
    }
}

#[test]
fn test_diff_without_shared_columns_fails() {
    let latest = TabularDataset::from_text_rows(&["a"], &[vec!["1"]]).unwrap();
    let previous = TabularDataset::from_text_rows(&["b"], &[vec!["1"]]).unwrap();
    let mut log = ProcessingLog::new();
    let err = DiffEngine::diff(&latest, &previous, &mut log).unwrap_err();
    assert!(matches!(err, TabdeltaError::NoCommonColumns { .. }));
}

#[test]
fn test_selector_malformed_arrays_are_identity() {
    let dataset = TabularDataset::from_text_rows(&["name"], &[vec!["a"], vec!["b"]]).unwrap();
    for answer in ["{\"rows\": 1}", "[1, \"x\"]", "[-1]", "[0.5]"] {
        let transformer = MockTransformer::always(answer);
        let mut log = ProcessingLog::new();
        let result = SemanticRowSelector::new(&transformer).select(&dataset, "pick", &mut log);
        assert_eq!(result, dataset, "answer {:?}", answer);
    }
}
