//! Writes an item's fielded content into the weighted index
//!
//! Each distinct term of a content string adds 1 to the word's row for the
//! field. Its stem, when different, gets half of that (rounded up). Fields in
//! keyword search also write the keyword pseudo-field, weighted by the
//! field's relevance weight, so keyword scores scale with the source field.

use rusqlite::Connection;

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::db::item_types;
use crate::db::occurrences::{self, add_occurrence};
use crate::error::Result;
use crate::fields::{Field, FieldRegistry};
use crate::lexicon::Lexicon;
use crate::models::{FieldId, ItemId, ItemType, Logic, TermId, KEYWORD_FIELD_ID};
use crate::normalizer::{is_numeric, normalize_terms};
use crate::stemmer::distinct_stem;
use crate::type_cache::ItemTypeCache;

/// Weight of the next derivation step: half, rounded up
pub fn halve(weight: i64) -> i64 {
    (weight + 1) / 2
}

pub struct Indexer<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) registry: &'a FieldRegistry,
    pub(crate) backend: &'a dyn SearchBackend,
    pub(crate) config: &'a SearchConfig,
    pub(crate) lexicon: &'a mut Lexicon,
    pub(crate) type_cache: &'a mut ItemTypeCache,
}

impl<'a> Indexer<'a> {
    /// Rebuild the index rows of one item. Returns the number of row writes.
    pub fn update_for_item(&mut self, item_id: ItemId, item_type: ItemType) -> Result<usize> {
        self.drop_item(item_id)?;
        item_types::set_item_type(self.conn, item_id, item_type)?;
        self.type_cache.insert(item_id, item_type);

        let registry = self.registry;
        let mut written = 0;
        for field in registry.indexed_fields_for(item_type) {
            let content = self.backend.field_content(item_id, field)?;
            for text in content.strings() {
                let terms = normalize_terms(text, Logic::Or, true);
                for word in terms.word_texts() {
                    written += self.index_term(item_id, field, word)?;
                }
            }
        }

        log::debug!(
            "Indexed item {} (type {}) with {} row writes",
            item_id,
            item_type,
            written
        );
        Ok(written)
    }

    /// Index up to `count` items starting at `start_id`, in id order.
    /// Returns the last id processed, or `None` if no items were found.
    pub fn update_for_items(&mut self, start_id: ItemId, count: usize) -> Result<Option<ItemId>> {
        let items = self.backend.items_from(start_id, count)?;
        let mut last = None;

        for (item_id, item_type) in &items {
            self.update_for_item(*item_id, *item_type)?;
            last = Some(*item_id);
        }

        match last {
            Some(last_id) => log::info!(
                "Indexed {} items from {} through {}",
                items.len(),
                start_id,
                last_id
            ),
            None => log::info!("No items found from {}", start_id),
        }
        Ok(last)
    }

    /// Remove an item's rows and its recorded type
    pub fn drop_item(&mut self, item_id: ItemId) -> Result<usize> {
        let removed = occurrences::delete_item_occurrences(self.conn, item_id)?;
        item_types::delete_item_type(self.conn, item_id)?;
        self.type_cache.remove(item_id);
        Ok(removed)
    }

    pub fn drop_field(&mut self, field_id: FieldId) -> Result<usize> {
        let removed = occurrences::delete_field_occurrences(self.conn, field_id)?;
        log::info!("Dropped {} index rows of field {}", removed, field_id);
        Ok(removed)
    }

    fn index_term(&mut self, item_id: ItemId, field: &Field, word: &str) -> Result<usize> {
        let word_id = TermId::Word(self.lexicon.get_or_create_word_id(self.conn, word)?);
        let stem_id = match self.stemmed(word) {
            Some(stem) => Some(TermId::Stem(
                self.lexicon.get_or_create_stem_id(self.conn, &stem)?,
            )),
            None => None,
        };

        let mut writes = Vec::with_capacity(4);
        writes.push((word_id, field.id, 1));
        if let Some(stem_id) = stem_id {
            writes.push((stem_id, field.id, halve(1)));
        }
        if field.in_keyword_search {
            writes.push((word_id, KEYWORD_FIELD_ID, field.weight));
            if let Some(stem_id) = stem_id {
                writes.push((stem_id, KEYWORD_FIELD_ID, halve(field.weight)));
            }
        }

        for (term, field_id, count) in &writes {
            add_occurrence(self.conn, *term, item_id, *field_id, *count)?;
        }
        Ok(writes.len())
    }

    fn stemmed(&self, word: &str) -> Option<String> {
        if !self.config.stemming || is_numeric(word) {
            return None;
        }
        distinct_stem(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, ComparisonClause, FieldContent};
    use crate::db::connection::init_test_pool;
    use crate::db::occurrences::{get_item_occurrences, Occurrence};
    use crate::fields::FieldType;

    struct Titles(Vec<(ItemId, &'static str)>);

    impl SearchBackend for Titles {
        fn field_content(&self, item_id: ItemId, field: &Field) -> Result<FieldContent, BackendError> {
            if field.id != 1 {
                return Ok(FieldContent::None);
            }
            Ok(self
                .0
                .iter()
                .find(|(id, _)| *id == item_id)
                .map(|(_, title)| FieldContent::from(*title))
                .unwrap_or_default())
        }

        fn search_field_for_phrase(&self, _: &Field, _: &str) -> Result<Vec<ItemId>, BackendError> {
            Ok(Vec::new())
        }

        fn search_fields_for_comparison_matches(
            &self,
            _: &[ComparisonClause],
            _: Logic,
        ) -> Result<Vec<ItemId>, BackendError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .add_field(Field::new(1, "Title", FieldType::Text, 10, [1]).in_keyword_search())
            .unwrap()
            .add_field(Field::new(2, "Notes", FieldType::Text, 0, [1]))
            .unwrap();
        registry
    }

    #[test]
    fn test_halve_rounds_up() {
        assert_eq!(halve(1), 1);
        assert_eq!(halve(10), 5);
        assert_eq!(halve(7), 4);
    }

    #[test]
    fn test_update_for_item_writes_word_stem_and_keyword_rows() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let registry = registry();
        let backend = Titles(vec![(7, "Running running")]);
        let config = SearchConfig::default();
        let mut lexicon = Lexicon::new();
        let mut type_cache = ItemTypeCache::new();

        let mut indexer = Indexer {
            conn: &conn,
            registry: &registry,
            backend: &backend,
            config: &config,
            lexicon: &mut lexicon,
            type_cache: &mut type_cache,
        };
        assert_eq!(indexer.update_for_item(7, 1).unwrap(), 4);
        // Re-indexing replaces rows instead of adding to them
        assert_eq!(indexer.update_for_item(7, 1).unwrap(), 4);

        let word = lexicon.lookup_word_id(&conn, "running").unwrap().unwrap();
        let stem = lexicon.lookup_stem_id(&conn, "run").unwrap().unwrap();
        let rows = get_item_occurrences(&conn, 7).unwrap();
        let row = |term, field_id, count| Occurrence {
            term,
            item_id: 7,
            field_id,
            count,
        };
        assert_eq!(
            rows,
            vec![
                row(TermId::Word(word), KEYWORD_FIELD_ID, 10),
                row(TermId::Stem(stem), KEYWORD_FIELD_ID, 5),
                row(TermId::Word(word), 1, 1),
                row(TermId::Stem(stem), 1, 1),
            ]
        );
        assert_eq!(type_cache.len(), 1);
    }

    #[test]
    fn test_drop_item_clears_rows_and_type() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let registry = registry();
        let backend = Titles(vec![(1, "Red Fox"), (2, "Red Dog")]);
        let config = SearchConfig {
            stemming: false,
            ..SearchConfig::default()
        };
        let mut lexicon = Lexicon::new();
        let mut type_cache = ItemTypeCache::new();

        let mut indexer = Indexer {
            conn: &conn,
            registry: &registry,
            backend: &backend,
            config: &config,
            lexicon: &mut lexicon,
            type_cache: &mut type_cache,
        };
        indexer.update_for_item(1, 1).unwrap();
        indexer.update_for_item(2, 1).unwrap();

        assert_eq!(indexer.drop_item(1).unwrap(), 4);
        assert!(get_item_occurrences(&conn, 1).unwrap().is_empty());
        assert_eq!(item_types::count_items(&conn).unwrap(), 1);
        assert_eq!(indexer.drop_field(KEYWORD_FIELD_ID).unwrap(), 2);
    }

    #[test]
    fn test_update_for_items_without_catalog_support() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let registry = registry();
        let backend = Titles(Vec::new());
        let config = SearchConfig::default();
        let mut lexicon = Lexicon::new();
        let mut type_cache = ItemTypeCache::new();

        let mut indexer = Indexer {
            conn: &conn,
            registry: &registry,
            backend: &backend,
            config: &config,
            lexicon: &mut lexicon,
            type_cache: &mut type_cache,
        };
        assert!(indexer.update_for_items(1, 10).is_err());
    }
}
