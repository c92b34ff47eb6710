use crate::domain::model::{Row, Table, UserRecord};
use crate::domain::value::Value;

/// Expands one user into a table with one row per owned item.
///
/// Identity fields consumed upstream (`steam_id`, `items_count`, `user_url`)
/// are dropped; every remaining profile field repeats on each row, followed
/// by the four item columns. A user with no items produces an empty table.
pub fn flatten_user(user: &UserRecord) -> Table {
    let mut table = Table::new();
    for item in &user.items {
        let mut row = Row::new();
        for (column, value) in &user.extra {
            row.insert(column.clone(), value.clone());
        }
        row.insert("item_id", Value::from(item.item_id.as_str()));
        row.insert("item_name", Value::from(item.item_name.as_str()));
        row.insert("playtime_forever", Value::from(item.playtime_forever));
        row.insert("playtime_2weeks", Value::from(item.playtime_2weeks));
        table.push(row);
    }
    tracing::debug!(
        steam_id = %user.steam_id,
        rows = table.len(),
        "flattened user library"
    );
    table
}
