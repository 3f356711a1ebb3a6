//! Item type table maintained alongside the index

use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;

use super::occurrences::IndexDbError;
use crate::models::{ItemId, ItemType};

/// Record the type of an item, replacing any earlier one
pub fn set_item_type(
    conn: &Connection,
    item_id: ItemId,
    item_type: ItemType,
) -> Result<(), IndexDbError> {
    conn.execute(
        "INSERT INTO search_item_types (item_id, item_type) VALUES (?1, ?2)
         ON CONFLICT(item_id) DO UPDATE SET item_type = excluded.item_type",
        params![item_id, item_type],
    )?;
    Ok(())
}

pub fn delete_item_type(conn: &Connection, item_id: ItemId) -> Result<bool, IndexDbError> {
    let rows_affected = conn.execute(
        "DELETE FROM search_item_types WHERE item_id = ?1",
        params![item_id],
    )?;
    Ok(rows_affected > 0)
}

/// Look up the recorded types of a set of items.
///
/// Issues one statement for the whole slice; callers keep the slice below
/// SQLite's bound-parameter limit.
pub fn get_item_types(
    conn: &Connection,
    item_ids: &[ItemId],
) -> Result<HashMap<ItemId, ItemType>, IndexDbError> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; item_ids.len()].join(", ");
    let sql = format!(
        "SELECT item_id, item_type FROM search_item_types WHERE item_id IN ({})",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let types = stmt
        .query_map(params_from_iter(item_ids.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(types)
}

/// Get every item recorded with one of the given types
pub fn get_items_of_types(
    conn: &Connection,
    item_types: &[ItemType],
) -> Result<Vec<(ItemId, ItemType)>, IndexDbError> {
    if item_types.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; item_types.len()].join(", ");
    let sql = format!(
        "SELECT item_id, item_type FROM search_item_types
         WHERE item_type IN ({})
         ORDER BY item_id",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(item_types.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

pub fn count_items(conn: &Connection) -> Result<i64, IndexDbError> {
    let count = conn.query_row("SELECT COUNT(*) FROM search_item_types", [], |row| row.get(0))?;
    Ok(count)
}
