//! Memoized term id resolution
//!
//! The same term is resolved many times within one query (once per field,
//! again through synonym and stem expansion), so hits are cached for the
//! engine's lifetime. Misses are not cached: another indexer may create the
//! term later.

use rusqlite::Connection;
use std::collections::HashMap;

use crate::db::lexicon::{self as lexicon_db, LexiconDbError};
use crate::models::TermId;

#[derive(Debug, Default)]
pub struct Lexicon {
    word_ids: HashMap<String, i64>,
    stem_ids: HashMap<String, i64>,
    texts: HashMap<TermId, String>,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_word_id(
        &mut self,
        conn: &Connection,
        text: &str,
    ) -> Result<i64, LexiconDbError> {
        let text = normalize(text);
        if let Some(id) = self.word_ids.get(&text) {
            return Ok(*id);
        }
        let id = lexicon_db::find_or_create_word(conn, &text)?;
        self.remember(TermId::Word(id), text);
        Ok(id)
    }

    pub fn lookup_word_id(
        &mut self,
        conn: &Connection,
        text: &str,
    ) -> Result<Option<i64>, LexiconDbError> {
        let text = normalize(text);
        if let Some(id) = self.word_ids.get(&text) {
            return Ok(Some(*id));
        }
        let id = lexicon_db::find_word_id(conn, &text)?;
        if let Some(id) = id {
            self.remember(TermId::Word(id), text);
        }
        Ok(id)
    }

    pub fn get_or_create_stem_id(
        &mut self,
        conn: &Connection,
        text: &str,
    ) -> Result<i64, LexiconDbError> {
        let text = normalize(text);
        if let Some(id) = self.stem_ids.get(&text) {
            return Ok(*id);
        }
        let id = lexicon_db::find_or_create_stem(conn, &text)?;
        self.remember(TermId::Stem(id), text);
        Ok(id)
    }

    pub fn lookup_stem_id(
        &mut self,
        conn: &Connection,
        text: &str,
    ) -> Result<Option<i64>, LexiconDbError> {
        let text = normalize(text);
        if let Some(id) = self.stem_ids.get(&text) {
            return Ok(Some(*id));
        }
        let id = lexicon_db::find_stem_id(conn, &text)?;
        if let Some(id) = id {
            self.remember(TermId::Stem(id), text);
        }
        Ok(id)
    }

    pub fn text_for_id(
        &mut self,
        conn: &Connection,
        term: TermId,
    ) -> Result<Option<String>, LexiconDbError> {
        if let Some(text) = self.texts.get(&term) {
            return Ok(Some(text.clone()));
        }
        let text = lexicon_db::get_term_text(conn, term)?;
        if let Some(text) = &text {
            self.remember(term, text.clone());
        }
        Ok(text)
    }

    pub fn clear(&mut self) {
        self.word_ids.clear();
        self.stem_ids.clear();
        self.texts.clear();
    }

    fn remember(&mut self, term: TermId, text: String) {
        match term {
            TermId::Word(id) => self.word_ids.insert(text.clone(), id),
            TermId::Stem(id) => self.stem_ids.insert(text.clone(), id),
        };
        self.texts.insert(term, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::init_test_pool;

    #[test]
    fn test_lookup_normalizes_text() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        let id = lexicon.get_or_create_word_id(&conn, " Fox ").unwrap();
        assert_eq!(lexicon.lookup_word_id(&conn, "FOX").unwrap(), Some(id));
        assert_eq!(
            lexicon.text_for_id(&conn, TermId::Word(id)).unwrap().as_deref(),
            Some("fox")
        );
    }

    #[test]
    fn test_misses_are_not_cached() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        assert!(lexicon.lookup_word_id(&conn, "late").unwrap().is_none());
        let id = lexicon_db::find_or_create_word(&conn, "late").unwrap();
        assert_eq!(lexicon.lookup_word_id(&conn, "late").unwrap(), Some(id));
    }

    #[test]
    fn test_stem_cache_is_separate() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        let stem = lexicon.get_or_create_stem_id(&conn, "run").unwrap();
        assert!(lexicon.lookup_word_id(&conn, "run").unwrap().is_none());
        assert_eq!(lexicon.lookup_stem_id(&conn, "run").unwrap(), Some(stem));
        assert_eq!(
            lexicon.text_for_id(&conn, TermId::Stem(stem)).unwrap().as_deref(),
            Some("run")
        );
    }

    #[test]
    fn test_cached_ids_survive_until_cleared() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        let id = lexicon.get_or_create_word_id(&conn, "fox").unwrap();
        conn.execute("DELETE FROM search_words", []).unwrap();
        assert_eq!(lexicon.lookup_word_id(&conn, "fox").unwrap(), Some(id));

        lexicon.clear();
        assert!(lexicon.lookup_word_id(&conn, "fox").unwrap().is_none());
    }
}
