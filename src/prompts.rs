//! Fixed rule prompts sent to the transformer

/// Header of the identifier column shown to the model during selection
pub const ROW_ID_COLUMN: &str = "row_id";

const DATE_NORMALIZATION_RULES: &str = r#"You convert free-form date expressions into the format YYYY-MM-DD.

Rules:
- The input is a JSON array of distinct strings.
- Answer with a single JSON object. Each key is one input string, copied exactly. Each value is the converted date as "YYYY-MM-DD".
- Convert Japanese era dates (for example 令和6年4月1日 or R6.4.1) to the Gregorian calendar.
- If a value contains several dates or a range, use the chronologically latest date.
- If a value contains no date, use an empty string "".
- Do not add explanations, comments, or markdown. Output the JSON object only."#;

const ROW_SELECTION_RULES: &str = r#"You select rows from a table according to an instruction.

Rules:
- The table is CSV. Its first column, "{id}", identifies each row.
- Answer with a JSON array of the {id} values of every row that satisfies the instruction, for example [0, 3, 7].
- Use only {id} values that appear in the table.
- If no row satisfies the instruction, answer [].
- Do not add explanations, comments, or markdown. Output the JSON array only."#;

/// Prompt for one date-normalization batch
pub fn date_normalization_prompt(values: &[&str]) -> String {
    let payload = serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string());
    format!("{}\n\nInput:\n{}", DATE_NORMALIZATION_RULES, payload)
}

/// Prompt for natural-language row selection over a CSV rendering whose
/// first column, `id_column`, holds the row ids
pub fn row_selection_prompt(table_csv: &str, id_column: &str, instruction: &str) -> String {
    format!(
        "{}\n\nGiven data:\n{}\nInstruction:\n{}",
        ROW_SELECTION_RULES.replace("{id}", id_column),
        table_csv,
        instruction.trim()
    )
}
