//! Deterministic row filters: date range and keyword match

use crate::dataset::TabularDataset;
use crate::dates::parse_lenient_date;
use crate::processing_log::ProcessingLog;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How keywords combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Every keyword must appear
    And,
    /// At least one keyword must appear
    #[default]
    Or,
}

impl SearchMode {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(format!("Invalid search type: {}. Use 'and' or 'or'", s)),
        }
    }

    /// Form-field semantics: anything other than `AND` searches with OR
    pub fn from_form_value(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("and") {
            Self::And
        } else {
            Self::Or
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Keep rows whose date in `column` is on or after `min_date`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeFilter {
    pub column: String,
    pub min_date: NaiveDate,
}

/// Keep rows whose `column` contains the keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFilter {
    pub column: String,
    pub keywords: Vec<String>,
    pub mode: SearchMode,
}

impl KeywordFilter {
    /// Build from a newline-separated keyword blob; blank lines are dropped
    pub fn from_blob(column: impl Into<String>, blob: &str, mode: SearchMode) -> Self {
        Self {
            column: column.into(),
            keywords: split_keywords(blob),
            mode,
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self.mode {
            SearchMode::And => self.keywords.iter().all(|kw| text.contains(kw.as_str())),
            SearchMode::Or => self.keywords.iter().any(|kw| text.contains(kw.as_str())),
        }
    }
}

/// One filter step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSpec {
    DateRange(DateRangeFilter),
    Keyword(KeywordFilter),
}

impl FilterSpec {
    pub fn column(&self) -> &str {
        match self {
            Self::DateRange(f) => &f.column,
            Self::Keyword(f) => &f.column,
        }
    }

    /// Apply this filter, logging the row counts before and after.
    ///
    /// A missing target column makes the filter a logged no-op.
    pub fn apply(&self, dataset: &TabularDataset, log: &mut ProcessingLog) -> TabularDataset {
        let Some(index) = dataset.column_index(self.column()) else {
            log.warn(format!(
                "Filter column '{}' does not exist in the data; filter skipped.",
                self.column()
            ));
            return dataset.clone();
        };

        let before = dataset.len();
        match self {
            Self::DateRange(filter) => {
                let result = dataset.retain_rows(|row| {
                    row.get(index)
                        .and_then(parse_lenient_date)
                        .map(|date| date >= filter.min_date)
                        .unwrap_or(false)
                });
                log.info(format!(
                    "Date filter: kept rows where '{}' is on or after {} ({} rows -> {} rows)",
                    filter.column,
                    filter.min_date.format("%Y-%m-%d"),
                    before,
                    result.len()
                ));
                result
            }
            Self::Keyword(filter) => {
                if filter.keywords.is_empty() {
                    log.info(format!(
                        "Keyword filter on '{}': no keywords given, filter skipped.",
                        filter.column
                    ));
                    return dataset.clone();
                }
                let result =
                    dataset.retain_rows(|row| filter.matches(row.get(index).unwrap_or("")));
                log.info(format!(
                    "Keyword filter: {} search on '{}' for {} keyword(s) ({} rows -> {} rows)",
                    filter.mode.as_str(),
                    filter.column,
                    filter.keywords.len(),
                    before,
                    result.len()
                ));
                result
            }
        }
    }
}

/// Ordered filters: every date-range filter first, then the keyword filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    date_filters: Vec<DateRangeFilter>,
    keyword_filter: Option<KeywordFilter>,
}

impl FilterChain {
    pub fn new(date_filters: Vec<DateRangeFilter>, keyword_filter: Option<KeywordFilter>) -> Self {
        Self {
            date_filters,
            keyword_filter,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date_filters.is_empty() && self.keyword_filter.is_none()
    }

    /// Filters in application order
    pub fn specs(&self) -> Vec<FilterSpec> {
        self.date_filters
            .iter()
            .cloned()
            .map(FilterSpec::DateRange)
            .chain(self.keyword_filter.iter().cloned().map(FilterSpec::Keyword))
            .collect()
    }

    pub fn apply(&self, dataset: TabularDataset, log: &mut ProcessingLog) -> TabularDataset {
        self.specs()
            .iter()
            .fold(dataset, |current, spec| spec.apply(&current, log))
    }
}

/// Split a multi-line keyword blob into trimmed, non-blank keywords
pub fn split_keywords(blob: &str) -> Vec<String> {
    blob.lines()
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(str::to_string)
        .collect()
}
