use rusqlite::Connection;
use std::collections::HashMap;

use crate::db::item_types;
use crate::db::occurrences::IndexDbError;
use crate::models::{ItemId, ItemType};

/// Memoized item type lookups, fetched from the item type table in chunks
#[derive(Debug, Default)]
pub struct ItemTypeCache {
    types: HashMap<ItemId, ItemType>,
}

impl ItemTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Types of the given items. Items with no recorded type are absent
    /// from the result.
    pub fn types_for<'a>(
        &mut self,
        conn: &Connection,
        item_ids: impl IntoIterator<Item = &'a ItemId>,
        batch_size: usize,
    ) -> Result<HashMap<ItemId, ItemType>, IndexDbError> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();

        for id in item_ids {
            match self.types.get(id) {
                Some(item_type) => {
                    found.insert(*id, *item_type);
                }
                None => missing.push(*id),
            }
        }

        for chunk in missing.chunks(batch_size.max(1)) {
            let fetched = item_types::get_item_types(conn, chunk)?;
            self.types.extend(fetched.iter().map(|(id, t)| (*id, *t)));
            found.extend(fetched);
        }

        Ok(found)
    }

    pub fn insert(&mut self, item_id: ItemId, item_type: ItemType) {
        self.types.insert(item_id, item_type);
    }

    pub fn remove(&mut self, item_id: ItemId) {
        self.types.remove(&item_id);
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
