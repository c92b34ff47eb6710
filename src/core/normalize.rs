use crate::domain::model::Table;
use crate::domain::value::Value;
use crate::utils::error::{PrepError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Exactly the 32 ASCII punctuation characters.
static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[[:punct:]]").unwrap());
static NON_ASCII_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]").unwrap());

/// Normalizes one piece of free text through five ordered stages: lowercase,
/// trim, drop ASCII spaces, drop ASCII punctuation, drop non-ASCII.
///
/// Other whitespace such as tabs survives; only the literal space character
/// is removed.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = lowered.trim();
    let without_spaces = stripped.replace(' ', "");
    let without_punct = PUNCT_RE.replace_all(&without_spaces, "");
    NON_ASCII_RE.replace_all(&without_punct, "").into_owned()
}

/// Returns a copy of the table with [`clean_text`] applied to the named
/// column. The input table is left untouched.
///
/// The column must be present in every row and hold string cells; an empty
/// table has no columns at all, so it reports the column as missing.
pub fn normalize_text_column(table: &Table, column: &str) -> Result<Table> {
    if table.is_empty() {
        return Err(PrepError::MissingColumnError {
            column: column.to_string(),
        });
    }

    let mut out = Table::new();
    for (index, row) in table.iter().enumerate() {
        let cell = row.get(column).ok_or_else(|| PrepError::MissingColumnError {
            column: column.to_string(),
        })?;
        let text = cell.as_str().ok_or_else(|| PrepError::TypeMismatchError {
            context: format!("column '{}' in row {}", column, index),
            expected: "str".to_string(),
            found: cell.type_name().to_string(),
        })?;
        let cleaned = clean_text(text);
        let mut new_row = row.clone();
        new_row.cells.insert(column.to_string(), Value::Str(cleaned));
        out.push(new_row);
    }

    tracing::debug!(column, rows = out.len(), "normalized text column");
    Ok(out)
}
