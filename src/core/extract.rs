use crate::domain::model::Table;
use crate::domain::value::Value;
use crate::utils::error::{PrepError, Result};
use std::collections::HashSet;

/// Collects the distinct elements found across a column of lists, flattening
/// one level. The typical use is pulling the vocabulary of genres or tags
/// out of a catalog table.
///
/// Every row must carry the column and the cell must be a list; an empty
/// table reports the column as missing.
pub fn unique_column_values(table: &Table, column: &str) -> Result<HashSet<Value>> {
    if table.is_empty() {
        return Err(PrepError::MissingColumnError {
            column: column.to_string(),
        });
    }

    let mut values = HashSet::new();
    for (index, row) in table.iter().enumerate() {
        let cell = row.get(column).ok_or_else(|| PrepError::MissingColumnError {
            column: column.to_string(),
        })?;
        let items = cell.as_list().ok_or_else(|| PrepError::TypeMismatchError {
            context: format!("column '{}' in row {}", column, index),
            expected: "list".to_string(),
            found: cell.type_name().to_string(),
        })?;
        for item in items {
            values.insert(item.clone());
        }
    }

    tracing::debug!(column, unique = values.len(), "collected unique column values");
    Ok(values)
}
