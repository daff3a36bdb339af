//! Typed processing requests and the boundary that builds them from form fields

use crate::dates::parse_lenient_date;
use crate::error::{Result, TabdeltaError};
use crate::filter::{DateRangeFilter, FilterChain, KeywordFilter, SearchMode};
use crate::normalize::NormalizationRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything one pipeline run needs to know besides the input tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub date_filters: Vec<DateRangeFilter>,
    #[serde(default)]
    pub keyword_filter: Option<KeywordFilter>,
    #[serde(default)]
    pub normalization: Option<NormalizationRequest>,
    #[serde(default)]
    pub selection_instruction: Option<String>,
    #[serde(default)]
    pub previous_from_store: bool,
    /// Name under which to save the result in the snapshot store
    #[serde(default)]
    pub save_result: Option<String>,
}

impl ProcessRequest {
    /// Translate loosely-typed form fields into a request.
    ///
    /// Blank fields count as absent. A date filter needs both its column and
    /// its value; a value that is not a recognisable date is rejected.
    pub fn from_form_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let field = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let mut request = Self::default();

        if let (Some(column), Some(value)) =
            (field("filter_date_column"), field("filter_date_value"))
        {
            let min_date = parse_lenient_date(value).ok_or_else(|| {
                TabdeltaError::invalid_input(format!(
                    "filter_date_value '{}' is not a recognisable date",
                    value
                ))
            })?;
            request.date_filters.push(DateRangeFilter {
                column: column.to_string(),
                min_date,
            });
        }

        if let (Some(column), Some(blob)) = (field("keyword_column"), fields.get("keywords")) {
            let mode = field("search_type")
                .map(SearchMode::from_form_value)
                .unwrap_or_default();
            request.keyword_filter = Some(KeywordFilter::from_blob(column, blob, mode));
        }

        if let Some(column) = field("normalize_date_column") {
            request.normalization = Some(NormalizationRequest {
                column: column.to_string(),
                enabled: field("normalize_dates").map(is_truthy).unwrap_or(true),
            });
        }

        request.selection_instruction = field("ai_instruction").map(str::to_string);
        request.previous_from_store = field("use_stored_previous")
            .map(is_truthy)
            .unwrap_or(false);
        request.save_result = field("save_result_as").map(str::to_string);

        Ok(request)
    }

    /// Deterministic filters in application order
    pub fn filter_chain(&self) -> FilterChain {
        FilterChain::new(self.date_filters.clone(), self.keyword_filter.clone())
    }

    /// Normalization target, when requested and switched on
    pub fn normalization_column(&self) -> Option<&str> {
        self.normalization
            .as_ref()
            .filter(|n| n.enabled)
            .map(|n| n.column.as_str())
    }

    /// Selection instruction, when present and not blank
    pub fn instruction(&self) -> Option<&str> {
        self.selection_instruction
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
