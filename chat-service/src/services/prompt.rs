//! Prompt construction for table questions.

use crate::models::{ColumnDescriptor, SampleRow, TableContext};

/// Render the schema snapshot the way it appears in prompts.
pub fn render_schema(columns: &[ColumnDescriptor]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(columns)
}

/// Render the sample rows the way they appear in prompts.
pub fn render_rows(rows: &[SampleRow]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

/// Build the model prompt for `question` about the table in `context`.
///
/// The question is embedded verbatim; callers pass it already trimmed.
pub fn build_prompt(context: &TableContext, question: &str) -> Result<String, serde_json::Error> {
    let schema = render_schema(&context.columns)?;
    let rows = render_rows(&context.rows)?;

    Ok(format!(
        r#"
You are a helpful assistant. Answer questions about the '{table}' table.

TABLE SCHEMA:
{schema}

SAMPLE DATA:
{rows}

USER QUESTION:
"{question}"

Respond in a clear, user-friendly way without showing SQL code.
"#,
        table = context.table,
    ))
}
