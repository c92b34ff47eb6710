use crate::domain::value::Value;
use crate::utils::error::{PrepError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io;

/// One flat output row, column name to cell value in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    pub cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            cells: iter.into_iter().collect(),
        }
    }
}

/// An ordered collection of rows, the working shape between the flattening
/// and cleaning steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Column names in the order of the first row. Empty for an empty table.
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.cells.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// True when the table is non-empty and every row carries the column.
    pub fn has_column(&self, column: &str) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.cells.contains_key(column))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }

    /// Writes the table as CSV with a header line taken from the first row's
    /// column order. An empty table writes nothing. A row missing one of the
    /// header columns is an error.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let columns = self.columns();
        if columns.is_empty() {
            return Ok(());
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&columns)?;
        for row in &self.rows {
            let mut record = Vec::with_capacity(columns.len());
            for column in &columns {
                let cell = row.get(column).ok_or_else(|| PrepError::MissingColumnError {
                    column: (*column).to_string(),
                })?;
                record.push(csv_field(cell)?);
            }
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Table {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn csv_field(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        other => serde_json::to_string(other)?,
    })
}

/// One owned item inside a user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub item_name: String,
    pub playtime_forever: u64,
    pub playtime_2weeks: u64,
}

impl ItemRecord {
    pub fn from_value(value: &Value, context: &str) -> Result<Self> {
        let map = require_map(value, context)?;
        Ok(ItemRecord {
            item_id: require_str(map, "item_id", context)?,
            item_name: require_str(map, "item_name", context)?,
            playtime_forever: require_count(map, "playtime_forever", context)?,
            playtime_2weeks: require_count(map, "playtime_2weeks", context)?,
        })
    }
}

/// One user profile with its item library, as carried by a single input
/// record. Fields the downstream steps do not key on stay in `extra` in
/// record order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub steam_id: String,
    pub items_count: u64,
    pub user_url: String,
    pub extra: IndexMap<String, Value>,
    pub items: Vec<ItemRecord>,
}

impl UserRecord {
    pub fn from_value(value: &Value) -> Result<Self> {
        let context = "user record";
        let map = require_map(value, context)?;

        let steam_id = require_str(map, "steam_id", context)?;
        let items_count = require_count(map, "items_count", context)?;
        let user_url = require_str(map, "user_url", context)?;

        let raw_items = require(map, "items", context)?;
        let entries = raw_items.as_list().ok_or_else(|| PrepError::TypeMismatchError {
            context: field_context(context, "items"),
            expected: "list".to_string(),
            found: raw_items.type_name().to_string(),
        })?;
        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            items.push(ItemRecord::from_value(entry, &format!("items[{}]", index))?);
        }

        let mut extra = IndexMap::new();
        for (key, cell) in map {
            if matches!(key.as_str(), "steam_id" | "items_count" | "user_url" | "items") {
                continue;
            }
            if !cell.is_scalar() {
                return Err(PrepError::TypeMismatchError {
                    context: field_context(context, key),
                    expected: "scalar".to_string(),
                    found: cell.type_name().to_string(),
                });
            }
            extra.insert(key.clone(), cell.clone());
        }

        if items_count != items.len() as u64 {
            tracing::debug!(
                steam_id = %steam_id,
                declared = items_count,
                actual = items.len(),
                "items_count does not match the item list length"
            );
        }

        Ok(UserRecord {
            steam_id,
            items_count,
            user_url,
            extra,
            items,
        })
    }
}

fn field_context(context: &str, key: &str) -> String {
    format!("{} field '{}'", context, key)
}

fn require_map<'a>(value: &'a Value, context: &str) -> Result<&'a IndexMap<String, Value>> {
    value.as_map().ok_or_else(|| PrepError::TypeMismatchError {
        context: context.to_string(),
        expected: "map".to_string(),
        found: value.type_name().to_string(),
    })
}

fn require<'a>(
    map: &'a IndexMap<String, Value>,
    key: &str,
    context: &str,
) -> Result<&'a Value> {
    map.get(key).ok_or_else(|| PrepError::MissingKeyError {
        key: key.to_string(),
        context: context.to_string(),
    })
}

fn require_str(map: &IndexMap<String, Value>, key: &str, context: &str) -> Result<String> {
    let value = require(map, key, context)?;
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| PrepError::TypeMismatchError {
            context: field_context(context, key),
            expected: "str".to_string(),
            found: value.type_name().to_string(),
        })
}

fn require_count(map: &IndexMap<String, Value>, key: &str, context: &str) -> Result<u64> {
    let value = require(map, key, context)?;
    value.as_u64().ok_or_else(|| PrepError::TypeMismatchError {
        context: field_context(context, key),
        expected: "non-negative int".to_string(),
        found: value.type_name().to_string(),
    })
}
